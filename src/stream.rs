//! Streaming classification API: emit slide labels as they are assigned.
//!
//! Classifying a 20-slide deck is 20 sequential model calls. The eager
//! [`crate::assess::assess`] only returns after all of them and the analysis;
//! [`classify_stream`] yields each slide as soon as its call returns, so a
//! caller can show progress or stop early by dropping the stream.
//!
//! Slides are always emitted in slide order: the stream drives one call at a
//! time, never several in parallel.

use crate::assess::{load_slides, resolve_backend};
use crate::config::ThesisConfig;
use crate::error::{SlideError, ThesisError};
use crate::output::{ClassifiedSlide, SlideRecord};
use crate::pipeline::classify;
use crate::pipeline::input::{self, ResolvedDeck};
use crate::pipeline::llm::CompletionBackend;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of classification results.
///
/// `Err(SlideError)` marks a slide that degraded to `Unclassified`.
pub type SlideStream = Pin<Box<dyn Stream<Item = Result<ClassifiedSlide, SlideError>> + Send>>;

/// Extract a deck and classify its slides, streaming one result per slide.
///
/// # Returns
/// - `Ok(SlideStream)` — a stream of `Result<ClassifiedSlide, SlideError>`
/// - `Err(ThesisError)` — fatal error (no API key, bad input, wrong slide count)
pub async fn classify_stream(
    input_str: impl AsRef<str>,
    config: &ThesisConfig,
) -> Result<SlideStream, ThesisError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming classification: {}", input_str);

    // ── Get backend ──────────────────────────────────────────────────────
    let backend = resolve_backend(config)?;

    // ── Resolve input and extract ────────────────────────────────────────
    let deck = input::resolve_input(
        input_str,
        config.max_file_size,
        config.download_timeout_secs,
    )
    .await?;
    let (_, slides) = load_slides(deck, config).await?;

    Ok(classify_slides_stream(
        slides,
        backend,
        config.classify_max_tokens,
    ))
}

/// Streaming classification of a deck held in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_thesis::{classify_stream_from_bytes, ThesisConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("deck.pptx")?;
/// let config = ThesisConfig::from_env();
/// let mut stream = classify_stream_from_bytes(&bytes, "deck.pptx", &config).await?;
/// while let Some(slide) = stream.next().await {
///     match slide {
///         Ok(s) => println!("Slide {}: {}", s.index, s.category),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn classify_stream_from_bytes(
    bytes: &[u8],
    source_name: &str,
    config: &ThesisConfig,
) -> Result<SlideStream, ThesisError> {
    let backend = resolve_backend(config)?;
    let deck = ResolvedDeck::from_bytes(source_name, bytes.to_vec(), config.max_file_size)?;
    let (_, slides) = load_slides(deck, config).await?;
    Ok(classify_slides_stream(
        slides,
        backend,
        config.classify_max_tokens,
    ))
}

/// Classify already-extracted slides lazily, one call per polled item.
pub fn classify_slides_stream(
    slides: Vec<SlideRecord>,
    backend: Arc<dyn CompletionBackend>,
    max_tokens: u32,
) -> SlideStream {
    let s = stream::iter(slides).then(move |slide| {
        let backend = Arc::clone(&backend);
        async move {
            let result =
                classify::classify_slide(backend.as_ref(), slide.index, &slide.raw_text, max_tokens)
                    .await;
            match result {
                Ok(category) => Ok(ClassifiedSlide::new(slide, category)),
                Err(e) => {
                    warn!("{}", e);
                    Err(e)
                }
            }
        }
    });
    Box::pin(s)
}
