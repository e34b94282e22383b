//! Session implementation - classify, plot and explain one request at a time

use crate::config::AppConfig;
use graphgen_core::{
    classify, explain, render_with, AxisUnits, Bindings, CompletionRequest, CompletionResponse,
    Figure, LlmProvider, ProviderError, ResultCache, ShapeDescriptor, UsageTracker,
};
use graphgen_error::{Error, Result};
use std::sync::Mutex;

/// Shown after the cache has been emptied
pub const CACHE_CLEARED: &str = "Cache cleared successfully!";

/// Configuration for the session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Memoise explanations per question
    pub cache_enabled: bool,
    /// Parameter values applied to every request
    pub bindings: Bindings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            bindings: Bindings::new(),
        }
    }
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache_enabled: config.cache.enabled,
            bindings: config.params.clone(),
        }
    }
}

/// One search as entered by the user
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub question: String,
    pub units: AxisUnits,
    /// Parameter values for this request only; they win over the session's
    pub bindings: Bindings,
}

impl SearchRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Blank units fall back to "units"
    pub fn with_units(mut self, x_unit: &str, y_unit: &str) -> Self {
        self.units = AxisUnits::or_default(x_unit, y_unit);
        self
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: f64) -> Self {
        self.bindings.insert(name, value);
        self
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings.extend(&bindings);
        self
    }
}

/// Result of a search. The plot and the explanation fail independently.
#[derive(Debug)]
pub struct SearchOutcome {
    /// What the request was understood as, when classification succeeded
    pub shape: Option<ShapeDescriptor>,
    pub plot: Result<Figure>,
    pub explanation: Result<String>,
}

impl SearchOutcome {
    /// The figure, when there is something to display
    pub fn figure(&self) -> Option<&Figure> {
        self.plot.as_ref().ok().filter(|f| !f.is_empty())
    }
}

/// Forwards to a provider and records token usage
struct Metered<'a, P> {
    inner: &'a P,
    usage: &'a Mutex<UsageTracker>,
}

impl<P: LlmProvider> LlmProvider for Metered<'_, P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn models(&self) -> Vec<String> {
        self.inner.models()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
        let response = self.inner.complete(request).await?;
        self.usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .track(&response.model, &response.usage);
        Ok(response)
    }
}

/// The session - owns the oracle, the cache and the usage counters
pub struct Session<P: LlmProvider> {
    provider: P,
    config: SessionConfig,
    cache: ResultCache,
    usage: Mutex<UsageTracker>,
}

impl<P: LlmProvider> Session<P> {
    /// Create a session with an in-memory cache and default configuration
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, SessionConfig::default())
    }

    pub fn with_config(provider: P, config: SessionConfig) -> Self {
        Self {
            provider,
            config,
            cache: ResultCache::memory().with_namespace("explain"),
            usage: Mutex::new(UsageTracker::new()),
        }
    }

    /// Build from the loaded application config; the cache lives on disk
    /// when `cache.dir` is set
    pub fn from_app_config(provider: P, app: &AppConfig) -> Result<Self> {
        let cache = match &app.cache.dir {
            Some(dir) => ResultCache::file(dir)?,
            None => ResultCache::memory(),
        };
        Ok(Self::with_config(provider, SessionConfig::from(app)).with_cache(cache))
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache.with_namespace("explain");
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token usage so far
    pub fn usage(&self) -> UsageTracker {
        self.usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn oracle(&self) -> Metered<'_, P> {
        Metered {
            inner: &self.provider,
            usage: &self.usage,
        }
    }

    /// Classify and plot the question, then explain it.
    ///
    /// Only an empty question is an error here; every other failure lands in
    /// the outcome and is logged.
    pub async fn search(&mut self, request: &SearchRequest) -> Result<SearchOutcome> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(Error::invalid_argument("Please enter a question.")
                .with_operation("session::search"));
        }
        log::info!("Search: {}", question);

        let mut bindings = self.config.bindings.clone();
        bindings.extend(&request.bindings);

        let (shape, plot) = match classify(question, &self.oracle()).await {
            Ok(shape) => {
                log::info!("Classified as {}", shape);
                let plot = render_with(&shape, &request.units, &bindings);
                (Some(shape), plot)
            }
            Err(e) => (None, Err(e)),
        };
        if let Err(e) = &plot {
            log::error!("Plot failed for '{}': {}", question, e);
        }

        let explanation = self.explanation(question).await;
        if let Err(e) = &explanation {
            log::error!("Explanation failed for '{}': {}", question, e);
        }

        Ok(SearchOutcome {
            shape,
            plot,
            explanation,
        })
    }

    /// Explanation for `question`, from the cache when enabled
    pub async fn explanation(&mut self, question: &str) -> Result<String> {
        if self.config.cache_enabled {
            if let Some(text) = self.cache.get_typed::<String>(question) {
                log::debug!("Explanation cache hit: {}", question);
                return Ok(text);
            }
        }

        let text = explain(question, &self.oracle()).await?;

        if self.config.cache_enabled {
            if let Err(e) = self.cache.set_typed(question, &text) {
                log::warn!("Could not cache explanation: {}", e);
            }
        }
        Ok(text)
    }

    /// Empty the cache
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear().map_err(|e| {
            log::error!("Clearing cache failed: {}", e);
            e.with_operation("session::clear_cache")
        })?;
        log::info!("{}", CACHE_CLEARED);
        Ok(())
    }

    /// Number of memoised explanations
    pub fn cached_explanations(&self) -> usize {
        self.cache.len()
    }
}
