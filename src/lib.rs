// Re-export modules
pub mod block;
pub mod config;
pub mod error;
pub mod loaders;
pub mod parsers;
pub mod pipeline;
pub mod results;
pub mod utils;
pub mod workers;

// Re-export commonly used types for convenience
pub use config::{RunInput, ScraperConfig};
pub use error::{ConfigError, InputError};
pub use pipeline::Pipeline;
pub use results::{PageRecord, RunSummary};

use std::sync::Arc;
use tokio::sync::mpsc;
use workers::WorkerOptions;

/// Main builder for converting a list of URLs into Markdown records
pub struct Pages {
    input: RunInput,
    config: ScraperConfig,
    webdriver_url: Option<String>,
}

impl Pages {
    /// Create a new Pages builder for the given run input
    pub fn new(input: RunInput) -> Self {
        Self {
            input,
            config: ScraperConfig::default(),
            webdriver_url: None,
        }
    }

    /// Replace the scraper configuration
    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the scraper configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let config = ScraperConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Set the maximum number of pages processed at once
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Pause this many seconds after each successful page; forces one worker
    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.input.delay_between_requests = Some(seconds);
        self
    }

    /// Process at most this many start URLs
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.input.max_items = Some(max_items);
        self
    }

    /// Enable or disable the plain HTTP attempt before rendering
    pub fn with_fast_path(mut self, enabled: bool) -> Self {
        self.config.fast_path = enabled;
        self
    }

    /// Use this WebDriver endpoint, taking precedence over `WEBDRIVER_URL`
    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = Some(url.into());
        self
    }

    /// Route requests through these proxies, in rotation
    pub fn with_proxies(mut self, proxy_urls: Vec<String>) -> Self {
        self.config.proxy_urls = proxy_urls;
        self
    }

    /// Validate the input, build the pipeline and start processing
    pub async fn generate(self) -> Result<mpsc::Receiver<PageRecord>, InputError> {
        let config = self.resolved_config();
        // fail on bad input before anything is built
        self.input.validate()?;

        let pipeline = Pipeline::from_config(&config)?;
        self.generate_with(Arc::new(pipeline), &config).await
    }

    /// Start processing with an already built pipeline
    pub async fn generate_with(
        self,
        pipeline: Arc<Pipeline>,
        config: &ScraperConfig,
    ) -> Result<mpsc::Receiver<PageRecord>, InputError> {
        let urls = self.input.validate()?;
        let options = WorkerOptions {
            max_concurrency: config.max_concurrency,
            delay: self
                .input
                .delay_between_requests
                .and_then(utils::delay_from_secs),
        };

        ::log::info!("Queued {} start URLs", urls.len());
        let requests = urls.into_iter().map(results::PageRequest::new).collect();
        Ok(workers::start(pipeline, requests, options).await)
    }

    /// Effective configuration: file or defaults, then environment, then explicit overrides
    fn resolved_config(&self) -> ScraperConfig {
        let mut config = self.config.clone();
        config.apply_env();
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if let Some(proxies) = &self.input.proxy_configuration {
            if !proxies.proxy_urls.is_empty() {
                config.proxy_urls = proxies.proxy_urls.clone();
            }
        }
        config
    }
}
