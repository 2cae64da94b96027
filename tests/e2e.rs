//! End-to-end integration tests for edgequake-thesis.
//!
//! The offline tests build small `.pptx` decks in memory and answer model
//! calls from a keyword-driven backend, so they exercise the whole public API
//! without network access.
//!
//! The live tests call the real completion endpoint and bind pdfium. They are
//! gated behind the `E2E_ENABLED` environment variable so they do not run in
//! CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GROQ_API_KEY=gsk_... cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   cargo test --test e2e test_full_pipeline_offline -- --nocapture

use edgequake_thesis::taxonomy::SCORING_WEIGHTS;
use edgequake_thesis::{
    assess, assess_from_bytes, assess_sync, assess_to_file, classify_deck,
    classify_stream_from_bytes, extract, inspect, render_report, AssessmentProgressCallback,
    Category, CompletionBackend, Recommendation, ThesisConfig, ThesisError,
};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// Route library logs to the test output (`RUST_LOG=edgequake_thesis=debug`).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a `.pptx` with one text box per slide.
fn build_pptx(slides: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = SimpleFileOptions::default();

        let ids: String = (1..=slides.len())
            .map(|i| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 255 + i, i + 1))
            .collect();
        zip.start_file("ppt/presentation.xml", opts).unwrap();
        write!(
            zip,
            "<?xml version=\"1.0\"?><p:presentation \
             xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
             <p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"
        )
        .unwrap();

        let rels: String = (1..=slides.len())
            .map(|i| {
                format!(
                    "<Relationship Id=\"rId{}\" \
                     Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide\" \
                     Target=\"slides/slide{i}.xml\"/>",
                    i + 1
                )
            })
            .collect();
        zip.start_file("ppt/_rels/presentation.xml.rels", opts)
            .unwrap();
        write!(
            zip,
            "<?xml version=\"1.0\"?><Relationships \
             xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{rels}\
             </Relationships>"
        )
        .unwrap();

        for (i, text) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), opts)
                .unwrap();
            write!(
                zip,
                "<?xml version=\"1.0\"?><p:sld \
                 xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
                 xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
                 <p:cSld><p:spTree><p:sp><p:txBody><a:bodyPr/>\
                 <a:p><a:r><a:t>{text}</a:t></a:r></a:p>\
                 </p:txBody></p:sp></p:spTree></p:cSld></p:sld>"
            )
            .unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn words(n: usize) -> String {
    vec!["detail"; n].join(" ")
}

/// A thesis JSON that validates cleanly, wrapped the way models often wrap it.
fn fenced_thesis_json() -> String {
    let categories: Vec<serde_json::Value> = SCORING_WEIGHTS
        .iter()
        .map(|(name, weight)| {
            serde_json::json!({
                "name": name,
                "score": 6,
                "weight": weight,
                "feedback": words(60),
            })
        })
        .collect();
    let thesis = serde_json::json!({
        "recommendation": "Hold",
        "overall_score": 64,
        "processing_date": "16-10-2026 10:00:00 UTC",
        "confidence_score": 70,
        "strengths": ["Clear problem", "Large market", "Strong team"],
        "weaknesses": ["No traction", "Thin financials", "Crowded space"],
        "recommendations": words(130),
        "categories": categories,
    });
    format!("Here is the analysis:\n```json\n{thesis:#}\n```")
}

/// Answers classification prompts by keyword and the analysis prompt with
/// a fixed thesis.
#[derive(Default)]
struct KeywordBackend {
    calls: AtomicUsize,
    analysis_prompts: Mutex<Vec<String>>,
}

impl KeywordBackend {
    fn answer(&self, prompt: &str) -> Result<String, ThesisError> {
        if prompt.contains("Classified Slides:") {
            self.analysis_prompts
                .lock()
                .unwrap()
                .push(prompt.to_string());
            return Ok(fenced_thesis_json());
        }
        let content = prompt
            .split("Slide Content:")
            .nth(1)
            .and_then(|rest| rest.split("Instructions:").next())
            .unwrap_or_default()
            .to_lowercase();
        let label = [
            ("problem", "Problem"),
            ("solution", "Solution"),
            ("market", "Market"),
            ("revenue", "business model"),
            ("team", "Team"),
            ("raising", "Funding Ask"),
            ("outage", "__fail__"),
        ]
        .iter()
        .find(|(kw, _)| content.contains(kw))
        .map(|(_, label)| *label)
        .unwrap_or("Thank you");

        if label == "__fail__" {
            return Err(ThesisError::Transport {
                detail: "HTTP 503: upstream unavailable".into(),
            });
        }
        Ok(label.to_string())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionBackend for KeywordBackend {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        _max_tokens: u32,
    ) -> BoxFuture<'a, Result<String, ThesisError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer(prompt);
        Box::pin(async move { answer })
    }
}

fn offline_config(backend: Arc<KeywordBackend>) -> ThesisConfig {
    ThesisConfig::builder()
        .backend(backend as Arc<dyn CompletionBackend>)
        .build()
        .expect("valid config")
}

const GOOD_DECK: [&str; 7] = [
    "Acme Robotics",
    "The problem: warehouses lose 30% of picks",
    "Our solution: autonomous picking arms",
    "Market size: $40B by 2030",
    "Revenue from robot leasing per month",
    "Our team: ex-Amazon robotics leads",
    "We are raising $3M seed",
];

fn write_deck(dir: &tempfile::TempDir, name: &str, slides: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, build_pptx(slides)).unwrap();
    path
}

// ── Offline pipeline tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_full_pipeline_offline() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = write_deck(&dir, "acme.pptx", &GOOD_DECK);
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let assessment = assess(path.to_str().unwrap(), &config)
        .await
        .expect("assess() should succeed");

    // 7 classification calls + 1 analysis call
    assert_eq!(backend.calls(), 8);
    assert_eq!(assessment.metadata.slide_count, 7);
    assert_eq!(assessment.slides[0].category, Category::Unclassified);
    assert_eq!(assessment.slides[4].category, Category::BusinessModel);
    assert_eq!(assessment.slides[6].category, Category::FundingAsk);
    assert_eq!(
        assessment.categories_found,
        vec![
            Category::Problem,
            Category::Solution,
            Category::Market,
            Category::BusinessModel,
            Category::Team,
            Category::FundingAsk,
        ]
    );
    assert_eq!(assessment.stats.unclassified_slides, 1);

    let thesis = &assessment.thesis;
    assert_eq!(thesis.recommendation, Recommendation::Hold);
    assert_eq!(thesis.overall_score, 64);
    assert_eq!(thesis.categories.len(), 9);
    assert!(
        assessment.warnings.is_empty(),
        "unexpected warnings: {:?}",
        assessment.warnings
    );
    assert!(assessment.raw_analysis.starts_with("Here is the analysis:"));

    let prompts = backend.analysis_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Category: Funding Ask\nWe are raising $3M seed"));
    assert!(!prompts[0].contains("Acme Robotics"));
}

#[tokio::test]
async fn test_failed_slide_degrades_to_unclassified() {
    init_logging();
    let mut slides = GOOD_DECK.to_vec();
    slides.insert(1, "Status page during the outage");
    let deck = build_pptx(&slides);
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let assessment = assess_from_bytes(&deck, "acme.pptx", &config)
        .await
        .expect("a failed classification call is not fatal");

    assert_eq!(assessment.slides[1].category, Category::Unclassified);
    assert_eq!(assessment.stats.unclassified_slides, 2);
    assert_eq!(backend.calls(), 9);
}

#[tokio::test]
async fn test_insufficient_categories_skips_analysis() {
    let deck = build_pptx(&[
        "Welcome",
        "The problem with invoices",
        "Meet the team",
        "Thank you",
        "Questions?",
    ]);
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let err = assess_from_bytes(&deck, "thin.pptx", &config)
        .await
        .unwrap_err();

    match err {
        ThesisError::InsufficientCategories { found, required } => {
            assert_eq!(found, vec!["Problem".to_string(), "Team".to_string()]);
            assert_eq!(required, 3);
        }
        other => panic!("expected InsufficientCategories, got {other:?}"),
    }
    assert_eq!(backend.calls(), 5, "no analysis call after the gate fails");
}

#[tokio::test]
async fn test_slide_count_checked_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let slides: Vec<String> = (1..=21).map(|i| format!("Slide {i}")).collect();
    let refs: Vec<&str> = slides.iter().map(String::as_str).collect();
    let path = write_deck(&dir, "long.pptx", &refs);
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let err = assess(path.to_str().unwrap(), &config).await.unwrap_err();
    assert!(matches!(
        err,
        ThesisError::SlideCountOutOfRange { count: 21, min: 5, max: 20 }
    ));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_rejects_non_pptx_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.pdf");
    std::fs::write(&path, b"%PDF-1.7").unwrap();
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let err = assess(path.to_str().unwrap(), &config).await.unwrap_err();
    assert!(matches!(err, ThesisError::NotAPptx { .. }), "got {err:?}");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_inspect_and_extract_need_no_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_deck(&dir, "acme.pptx", &GOOD_DECK);
    let config = ThesisConfig::builder().build().unwrap();

    let meta = inspect(path.to_str().unwrap(), &config).await.unwrap();
    assert_eq!(meta.slide_count, 7);
    assert!(meta.file_size > 0);

    let (_, slides) = extract(path.to_str().unwrap(), &config).await.unwrap();
    assert_eq!(slides.len(), 7);
    assert_eq!(slides[3].index, 4);
    assert_eq!(slides[3].raw_text, "Market size: $40B by 2030");
}

#[tokio::test]
async fn test_classify_deck_without_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_deck(&dir, "acme.pptx", &GOOD_DECK);
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let (meta, slides) = classify_deck(path.to_str().unwrap(), &config)
        .await
        .unwrap();
    assert_eq!(meta.slide_count, 7);
    assert_eq!(slides.len(), 7);
    assert_eq!(backend.calls(), 7);
    assert!(backend.analysis_prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_reports_each_slide() {
    let deck = build_pptx(&GOOD_DECK);
    let backend = Arc::new(KeywordBackend::default());
    let config = offline_config(backend.clone());

    let stream = classify_stream_from_bytes(&deck, "acme.pptx", &config)
        .await
        .unwrap();
    let results: Vec<_> = stream.collect().await;

    assert_eq!(results.len(), 7);
    assert!(results[0].is_err(), "'Thank you' is outside the taxonomy");
    let labels: Vec<Category> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|s| s.category))
        .collect();
    assert_eq!(labels.len(), 6);
    assert_eq!(labels[0], Category::Problem);
}

#[tokio::test]
async fn test_progress_callback_sees_every_slide() {
    #[derive(Default)]
    struct Counter {
        classified: AtomicUsize,
        unclassified: AtomicUsize,
        analysis_started: AtomicUsize,
    }
    impl AssessmentProgressCallback for Counter {
        fn on_slide_classified(&self, _slide: usize, _total: usize, _category: Category) {
            self.classified.fetch_add(1, Ordering::SeqCst);
        }
        fn on_slide_unclassified(&self, _slide: usize, _total: usize, _reason: &str) {
            self.unclassified.fetch_add(1, Ordering::SeqCst);
        }
        fn on_analysis_start(&self, _categories_found: &[Category]) {
            self.analysis_started.fetch_add(1, Ordering::SeqCst);
        }
    }

    let deck = build_pptx(&GOOD_DECK);
    let counter = Arc::new(Counter::default());
    let config = ThesisConfig::builder()
        .backend(Arc::new(KeywordBackend::default()) as Arc<dyn CompletionBackend>)
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    assess_from_bytes(&deck, "acme.pptx", &config).await.unwrap();

    assert_eq!(counter.classified.load(Ordering::SeqCst), 6);
    assert_eq!(counter.unclassified.load(Ordering::SeqCst), 1);
    assert_eq!(counter.analysis_started.load(Ordering::SeqCst), 1);
}

#[test]
fn test_assess_sync_wrapper() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_deck(&dir, "acme.pptx", &GOOD_DECK);
    let config = offline_config(Arc::new(KeywordBackend::default()));

    let assessment = assess_sync(path.to_str().unwrap(), &config).unwrap();
    assert_eq!(assessment.slides.len(), 7);
}

// ── Live tests (model API and pdfium) ────────────────────────────────────────

#[tokio::test]
async fn test_render_report_with_pdfium() {
    e2e_skip_unless_ready!();
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_deck(&dir, "acme.pptx", &GOOD_DECK);
    let config = offline_config(Arc::new(KeywordBackend::default()));

    let (assessment, report) = assess_to_file(path.to_str().unwrap(), dir.path(), "Acme", &config)
        .await
        .expect("assess_to_file() should succeed");

    let name = report.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Investment_Thesis_Acme_"), "got {name}");
    assert!(name.ends_with(".pdf"));
    let bytes = std::fs::read(&report).unwrap();
    assert!(bytes.starts_with(b"%PDF"), "report is not a PDF");

    let again = render_report(&assessment.thesis, "Acme").await.unwrap();
    assert_eq!(again.filename, name);

    println!("✓ report: {} ({} bytes)", report.display(), bytes.len());
}

#[tokio::test]
async fn test_live_model_assessment() {
    e2e_skip_unless_ready!();
    init_logging();
    if std::env::var("GROQ_API_KEY").is_err() {
        println!("SKIP — GROQ_API_KEY not set");
        return;
    }

    let deck = build_pptx(&[
        "Acme Robotics: picking robots for mid-size warehouses",
        "Problem: warehouses lose 30% of labour hours to manual picking",
        "Solution: autonomous picking arms that retrofit existing shelving",
        "Market: $40B warehouse automation market by 2030, 14% CAGR",
        "Business model: robots leased at $2,500 per month per arm",
        "Team: CEO ex-Amazon Robotics, CTO PhD in grasp planning from ETH",
        "Traction: 3 paid pilots, $180k ARR, 2 LOIs from 3PL operators",
        "Funding ask: raising $3M seed for 18 months of runway",
    ]);
    let config = ThesisConfig::from_env();

    let assessment = assess_from_bytes(&deck, "acme.pptx", &config)
        .await
        .expect("live assessment should succeed");

    assert!(assessment.categories_found.len() >= 3);
    assert!(assessment.thesis.overall_score <= 100);
    assert!(!assessment.thesis.categories.is_empty());
    for w in &assessment.warnings {
        println!("warning: {w}");
    }
    println!(
        "✓ {} ({}/100, confidence {})",
        assessment.thesis.recommendation,
        assessment.thesis.overall_score,
        assessment.thesis.confidence_score
    );
}
