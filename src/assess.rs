//! Eager (whole-deck) assessment entry points.
//!
//! [`assess`] runs the full pipeline and returns only after the thesis is
//! parsed. Use [`crate::stream::classify_stream`] instead when slide labels
//! should be shown as they arrive.
//!
//! Failure policy: a single slide that cannot be classified degrades to
//! `Unclassified` and the run continues. Everything after classification
//! (the coverage gate, the analysis call, the parse) is all-or-nothing.

use crate::config::ThesisConfig;
use crate::error::ThesisError;
use crate::output::{
    Assessment, AssessmentStats, ClassifiedSlide, DeckMetadata, RenderedReport, SlideRecord,
};
use crate::pipeline::input::{self, ResolvedDeck};
use crate::pipeline::llm::{CompletionBackend, CompletionClient};
use crate::pipeline::{analyze, classify, extract, postprocess, render};
use crate::progress::{AssessmentProgressCallback, NoopProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Assess a pitch deck from a local path or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a `.pptx`
/// * `config` — Assessment configuration
///
/// # Returns
/// `Ok(Assessment)` once the thesis parsed, even when some slides ended up
/// `Unclassified` or validation produced warnings (see `assessment.warnings`).
///
/// # Errors
/// - Missing API key (before any network call)
/// - File not found, too large, not a `.pptx`, wrong slide count
/// - Fewer than `min_categories` distinct categories after classification
/// - Analysis call failed or its output is not valid JSON
pub async fn assess(
    input_str: impl AsRef<str>,
    config: &ThesisConfig,
) -> Result<Assessment, ThesisError> {
    let input_str = input_str.as_ref();
    info!("Starting assessment: {}", input_str);

    // ── Step 1: Get/create backend ───────────────────────────────────────
    let backend = resolve_backend(config)?;

    // ── Step 2: Resolve input ────────────────────────────────────────────
    let deck = input::resolve_input(
        input_str,
        config.max_file_size,
        config.download_timeout_secs,
    )
    .await?;

    assess_deck(backend.as_ref(), deck, config).await
}

/// Assess a deck already held in memory.
///
/// `source_name` only labels log lines and error messages.
pub async fn assess_from_bytes(
    bytes: &[u8],
    source_name: &str,
    config: &ThesisConfig,
) -> Result<Assessment, ThesisError> {
    let backend = resolve_backend(config)?;
    let deck = ResolvedDeck::from_bytes(source_name, bytes.to_vec(), config.max_file_size)?;
    assess_deck(backend.as_ref(), deck, config).await
}

/// Assess a deck and write the PDF report into `output_dir`.
///
/// pdfium is bound before the first model call, so a missing library fails
/// the run up front. The file is named by [`render::report_filename`] and
/// written atomically (temp file + rename).
///
/// # Returns
/// The assessment and the path of the written report.
pub async fn assess_to_file(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    startup_name: &str,
    config: &ThesisConfig,
) -> Result<(Assessment, PathBuf), ThesisError> {
    render::check_renderer().await?;
    let assessment = assess(input_str, config).await?;
    let report = render::render_report(&assessment.thesis, startup_name).await?;
    let path = write_report(output_dir, &report).await?;
    Ok((assessment, path))
}

/// Write a rendered report into `output_dir` under its own filename.
pub async fn write_report(
    output_dir: impl AsRef<Path>,
    report: &RenderedReport,
) -> Result<PathBuf, ThesisError> {
    let path = output_dir.as_ref().join(&report.filename);
    write_atomic(&path, &report.bytes).await?;
    info!("Report written to {}", path.display());
    Ok(path)
}

/// Synchronous wrapper around [`assess`].
///
/// Creates a temporary tokio runtime internally.
pub fn assess_sync(
    input_str: impl AsRef<str>,
    config: &ThesisConfig,
) -> Result<Assessment, ThesisError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ThesisError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(assess(input_str, config))
}

/// Read deck facts without extracting text or calling a model.
///
/// Does not require an API key. The slide-count range is *not* enforced so
/// out-of-range decks can still be inspected.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ThesisConfig,
) -> Result<DeckMetadata, ThesisError> {
    let deck = input::resolve_input(
        input_str.as_ref(),
        config.max_file_size,
        config.download_timeout_secs,
    )
    .await?;
    let file_size = deck.file_size();
    let source = deck.source.clone();
    let slide_count = tokio::task::spawn_blocking(move || {
        extract::count_slides(&deck.bytes, &deck.source)
    })
    .await
    .map_err(|e| ThesisError::Internal(format!("Inspect task panicked: {}", e)))??;

    Ok(DeckMetadata {
        source,
        file_size,
        slide_count,
    })
}

/// Extract slide text, enforcing the slide-count range.
///
/// Does not require an API key.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ThesisConfig,
) -> Result<(DeckMetadata, Vec<SlideRecord>), ThesisError> {
    let deck = input::resolve_input(
        input_str.as_ref(),
        config.max_file_size,
        config.download_timeout_secs,
    )
    .await?;
    load_slides(deck, config).await
}

/// Extract and classify without running the analysis.
///
/// No coverage gate is applied; use [`classify::ensure_sufficient`] on the
/// result to check it.
pub async fn classify_deck(
    input_str: impl AsRef<str>,
    config: &ThesisConfig,
) -> Result<(DeckMetadata, Vec<ClassifiedSlide>), ThesisError> {
    let backend = resolve_backend(config)?;
    let (metadata, slides) = extract(input_str, config).await?;
    let progress = progress_of(config);
    progress.on_extraction_complete(slides.len());
    let classified =
        classify::classify_all(backend.as_ref(), slides, config.classify_max_tokens, progress)
            .await;
    Ok((metadata, classified))
}

/// The completion backend for a run.
///
/// A pre-built `config.backend` wins; otherwise an HTTP client is built from
/// the API key, failing with [`ThesisError::Configuration`] when none is set.
pub fn resolve_backend(config: &ThesisConfig) -> Result<Arc<dyn CompletionBackend>, ThesisError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }
    let client = CompletionClient::new(config)?;
    debug!("Using completion client {:?}", client);
    Ok(Arc::new(client))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn progress_of(config: &ThesisConfig) -> &dyn AssessmentProgressCallback {
    match config.progress_callback.as_deref() {
        Some(cb) => cb,
        None => &NoopProgressCallback,
    }
}

/// Extract slide records off the async runtime and check the slide count.
pub(crate) async fn load_slides(
    deck: ResolvedDeck,
    config: &ThesisConfig,
) -> Result<(DeckMetadata, Vec<SlideRecord>), ThesisError> {
    let file_size = deck.file_size();
    let source = deck.source.clone();
    let slides = tokio::task::spawn_blocking(move || {
        extract::extract_slides(&deck.bytes, &deck.source)
    })
    .await
    .map_err(|e| ThesisError::Internal(format!("Extract task panicked: {}", e)))??;

    let count = slides.len();
    if count < config.min_slides || count > config.max_slides {
        return Err(ThesisError::SlideCountOutOfRange {
            count,
            min: config.min_slides,
            max: config.max_slides,
        });
    }

    Ok((
        DeckMetadata {
            source,
            file_size,
            slide_count: count,
        },
        slides,
    ))
}

async fn assess_deck(
    backend: &dyn CompletionBackend,
    deck: ResolvedDeck,
    config: &ThesisConfig,
) -> Result<Assessment, ThesisError> {
    let total_start = Instant::now();
    let progress = progress_of(config);

    // ── Step 3: Extract slide text ───────────────────────────────────────
    let extract_start = Instant::now();
    let (metadata, slides) = load_slides(deck, config).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Deck has {} slides ({} bytes)",
        metadata.slide_count, metadata.file_size
    );
    progress.on_extraction_complete(slides.len());

    // ── Step 4: Classify slides, one call at a time ──────────────────────
    let classify_start = Instant::now();
    let classified =
        classify::classify_all(backend, slides, config.classify_max_tokens, progress).await;
    let classify_duration_ms = classify_start.elapsed().as_millis() as u64;

    // ── Step 5: Coverage gate ────────────────────────────────────────────
    let categories_found = classify::ensure_sufficient(&classified, config.min_categories)?;
    info!(
        "Categories found: {}",
        categories_found
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // ── Step 6: Analysis call ────────────────────────────────────────────
    progress.on_analysis_start(&categories_found);
    let analyze_start = Instant::now();
    let processing_date = analyze::processing_date_now();
    let raw_analysis = analyze::analyze(
        backend,
        &classified,
        &processing_date,
        config.analysis_max_tokens,
    )
    .await?;
    let analyze_duration_ms = analyze_start.elapsed().as_millis() as u64;

    // ── Step 7: Parse and validate ───────────────────────────────────────
    let thesis = postprocess::parse_thesis(&raw_analysis)?;
    let warnings = thesis.validate();
    for w in &warnings {
        warn!("Thesis validation: {}", w);
    }
    progress.on_analysis_complete(warnings.len());

    // ── Step 8: Compute stats ────────────────────────────────────────────
    let classified_slides = classified.iter().filter(|s| s.category.is_known()).count();
    let stats = AssessmentStats {
        total_slides: classified.len(),
        classified_slides,
        unclassified_slides: classified.len() - classified_slides,
        extract_duration_ms,
        classify_duration_ms,
        analyze_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Assessment complete: {} ({}/100), {}ms total",
        thesis.recommendation, thesis.overall_score, stats.total_duration_ms
    );

    Ok(Assessment {
        metadata,
        slides: classified,
        categories_found,
        raw_analysis,
        thesis,
        warnings,
        stats,
    })
}

/// Write `bytes` to `path` via a sibling temp file and rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ThesisError> {
    let write_err = |e: std::io::Error| ThesisError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
