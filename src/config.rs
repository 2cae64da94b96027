//! Configuration types for a pitch-deck assessment run.
//!
//! All behaviour is controlled through [`ThesisConfig`], built via its
//! [`ThesisConfigBuilder`]. The configuration is read once (usually with
//! [`ThesisConfig::from_env`]) and treated as immutable for the rest of the
//! process; the completion client copies what it needs at construction.

use crate::error::ThesisError;
use crate::pipeline::llm::CompletionBackend;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the completion API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable overriding the completion endpoint.
pub const ENDPOINT_ENV: &str = "EDGEQUAKE_THESIS_ENDPOINT";

/// Environment variable overriding the model identifier.
pub const MODEL_ENV: &str = "EDGEQUAKE_THESIS_MODEL";

/// Default OpenAI-compatible chat-completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for a pitch-deck assessment.
///
/// Built via [`ThesisConfig::builder()`], [`ThesisConfig::from_env()`] or
/// [`ThesisConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_thesis::ThesisConfig;
///
/// let config = ThesisConfig::builder()
///     .api_key("gsk_test")
///     .api_timeout_secs(30)
///     .min_categories(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ThesisConfig {
    /// Bearer token for the completion endpoint. Default: None.
    ///
    /// Validated when the completion client is constructed, so a missing key
    /// fails before any network call.
    pub api_key: Option<String>,

    /// Chat-completion endpoint URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Model identifier sent with every request. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Nucleus sampling cut-off. Default: 0.9.
    pub top_p: f32,

    /// Bounded wait for a single completion call, in seconds. Default: 30.
    ///
    /// There is no cancellation once a call is issued and no retry after it
    /// times out.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Token budget of a single-slide classification call. Default: 50.
    ///
    /// The answer is one category name; anything longer is noise.
    pub classify_max_tokens: u32,

    /// Token budget of the analysis call. Default: 3500.
    ///
    /// Nine feedback paragraphs plus a recommendations paragraph comfortably
    /// fit; a smaller budget truncates the JSON mid-object.
    pub analysis_max_tokens: u32,

    /// Fewest slides accepted in a deck. Default: 5.
    pub min_slides: usize,

    /// Most slides accepted in a deck. Default: 20.
    ///
    /// Slides are classified one call at a time, so latency grows linearly
    /// with this bound.
    pub max_slides: usize,

    /// Largest accepted deck in bytes. Default: 50 MiB.
    pub max_file_size: u64,

    /// Distinct known categories required before analysis runs. Default: 3.
    pub min_categories: usize,

    /// Pre-constructed completion backend. Takes precedence over `api_key`.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Optional progress callback for per-slide events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ThesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            top_p: 0.9,
            api_timeout_secs: 30,
            download_timeout_secs: 120,
            classify_max_tokens: 50,
            analysis_max_tokens: 3500,
            min_slides: 5,
            max_slides: 20,
            max_file_size: 50 * 1024 * 1024,
            min_categories: 3,
            backend: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ThesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThesisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("classify_max_tokens", &self.classify_max_tokens)
            .field("analysis_max_tokens", &self.analysis_max_tokens)
            .field("slides", &(self.min_slides..=self.max_slides))
            .field("max_file_size", &self.max_file_size)
            .field("min_categories", &self.min_categories)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AssessmentProgressCallback>"),
            )
            .finish()
    }
}

impl ThesisConfig {
    /// Create a new builder for `ThesisConfig`.
    pub fn builder() -> ThesisConfigBuilder {
        ThesisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overlaid with the process environment.
    ///
    /// Reads [`API_KEY_ENV`], [`ENDPOINT_ENV`] and [`MODEL_ENV`]. Empty
    /// values count as unset. A missing key is not an error here; it becomes
    /// one when the completion client is built.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        config.api_key = var(API_KEY_ENV);
        if let Some(endpoint) = var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }
        if let Some(model) = var(MODEL_ENV) {
            config.model = model;
        }
        config
    }
}

/// Builder for [`ThesisConfig`].
#[derive(Debug)]
pub struct ThesisConfigBuilder {
    config: ThesisConfig,
}

impl ThesisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn classify_max_tokens(mut self, n: u32) -> Self {
        self.config.classify_max_tokens = n;
        self
    }

    pub fn analysis_max_tokens(mut self, n: u32) -> Self {
        self.config.analysis_max_tokens = n;
        self
    }

    pub fn slide_range(mut self, min: usize, max: usize) -> Self {
        self.config.min_slides = min;
        self.config.max_slides = max;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn min_categories(mut self, n: usize) -> Self {
        self.config.min_categories = n.min(crate::taxonomy::Category::TAXONOMY.len());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Set a progress callback to receive per-slide events.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ThesisConfig, ThesisError> {
        let c = &self.config;
        if c.min_slides == 0 || c.min_slides > c.max_slides {
            return Err(ThesisError::InvalidConfig(format!(
                "slide range must be 1 ≤ min ≤ max, got {}–{}",
                c.min_slides, c.max_slides
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ThesisError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.classify_max_tokens == 0 || c.analysis_max_tokens == 0 {
            return Err(ThesisError::InvalidConfig(
                "token budgets must be ≥ 1".into(),
            ));
        }
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(ThesisError::InvalidConfig(format!(
                "endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}
