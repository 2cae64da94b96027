//! Report output when no pdfium library can be bound.
//!
//! Kept in its own test binary because it points `PDFIUM_LIB_PATH` at a
//! missing file for the whole process.

use edgequake_thesis::{assess_to_file, CompletionBackend, ThesisConfig, ThesisError};
use futures::future::BoxFuture;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Counts calls; any model call here is already a failure.
#[derive(Default)]
struct CountingBackend {
    calls: AtomicUsize,
}

impl CompletionBackend for CountingBackend {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
        _max_tokens: u32,
    ) -> BoxFuture<'a, Result<String, ThesisError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok("Team".to_string()) })
    }
}

fn five_slide_deck() -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = SimpleFileOptions::default();
        let ids: String = (1..=5)
            .map(|i| format!("<p:sldId id=\"{}\" r:id=\"rId{i}\"/>", 255 + i))
            .collect();
        zip.start_file("ppt/presentation.xml", opts).unwrap();
        write!(zip, "<p:presentation><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>").unwrap();

        let rels: String = (1..=5)
            .map(|i| format!("<Relationship Id=\"rId{i}\" Target=\"slides/slide{i}.xml\"/>"))
            .collect();
        zip.start_file("ppt/_rels/presentation.xml.rels", opts)
            .unwrap();
        write!(zip, "<Relationships>{rels}</Relationships>").unwrap();

        for i in 1..=5 {
            zip.start_file(format!("ppt/slides/slide{i}.xml"), opts)
                .unwrap();
            write!(
                zip,
                "<p:sld><p:sp><p:txBody><a:p><a:r><a:t>Slide {i}</a:t></a:r></a:p>\
                 </p:txBody></p:sp></p:sld>"
            )
            .unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

#[tokio::test]
async fn missing_pdfium_fails_before_any_model_call() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(
        "PDFIUM_LIB_PATH",
        dir.path().join("nonexistent").join("libpdfium.so"),
    );
    let deck = dir.path().join("deck.pptx");
    std::fs::write(&deck, five_slide_deck()).unwrap();

    let backend = Arc::new(CountingBackend::default());
    let config = ThesisConfig::builder()
        .backend(backend.clone() as Arc<dyn CompletionBackend>)
        .build()
        .unwrap();

    let err = assess_to_file(deck.to_str().unwrap(), dir.path(), "Acme", &config)
        .await
        .unwrap_err();

    assert!(
        matches!(err, ThesisError::PdfiumBindingFailed(_)),
        "expected PdfiumBindingFailed, got {err:?}"
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    let pdfs = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .is_ok_and(|e| e.path().extension().is_some_and(|x| x == "pdf"))
        })
        .count();
    assert_eq!(pdfs, 0, "no report may be written");
}
