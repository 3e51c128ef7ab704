use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, InputError};

/// Configuration for the page pipeline and its workers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Maximum number of pages processed concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Try a plain HTTP fetch before falling back to the browser
    #[serde(default = "default_fast_path")]
    pub fast_path: bool,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// User agent sent by the fast strategy
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for the fast strategy's request
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Timeout for browser navigation; exceeding it fails the fetch
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Best-effort wait for the page to settle after navigation
    #[serde(default = "default_network_idle_timeout_secs")]
    pub network_idle_timeout_secs: u64,

    /// Upper bound for a single article extraction
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,

    /// Phrases that mark a response as blocked or challenged
    #[serde(default = "default_block_phrases")]
    pub block_phrases: Vec<String>,

    /// How many leading characters of a body are inspected for block phrases
    #[serde(default = "default_block_prefix_chars")]
    pub block_prefix_chars: usize,

    /// Selectors for elements that never carry content
    #[serde(default = "default_noise_selectors")]
    pub noise_selectors: Vec<String>,

    /// Content container selectors, most specific first
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,

    /// Minimum visible text length for a content container to qualify
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Egress proxies, used round-robin
    #[serde(default)]
    pub proxy_urls: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            fast_path: default_fast_path(),
            webdriver_url: default_webdriver_url(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            network_idle_timeout_secs: default_network_idle_timeout_secs(),
            extract_timeout_secs: default_extract_timeout_secs(),
            block_phrases: default_block_phrases(),
            block_prefix_chars: default_block_prefix_chars(),
            noise_selectors: default_noise_selectors(),
            content_selectors: default_content_selectors(),
            min_content_chars: default_min_content_chars(),
            proxy_urls: Vec::new(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override the WebDriver URL with `WEBDRIVER_URL` if it is set
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }
}

/// A single start URL entry of a run's input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartUrl {
    pub url: String,
}

/// Proxy settings supplied with a run's input
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfiguration {
    #[serde(default)]
    pub proxy_urls: Vec<String>,
}

/// Input of a run, e.g. `{"startUrls": [{"url": "https://example.com"}]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(default)]
    pub start_urls: Vec<StartUrl>,

    /// Process at most this many URLs
    #[serde(default)]
    pub max_items: Option<usize>,

    /// Pause after each successfully processed page, in seconds
    #[serde(default)]
    pub delay_between_requests: Option<f64>,

    #[serde(default)]
    pub proxy_configuration: Option<ProxyConfiguration>,
}

impl RunInput {
    /// Build an input from plain URLs
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            start_urls: urls
                .into_iter()
                .map(|url| StartUrl { url: url.into() })
                .collect(),
            ..Self::default()
        }
    }

    /// Load input from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let input: Self = serde_json::from_str(&contents)?;
        Ok(input)
    }

    /// Check the input and return the URLs to process, honoring `max_items`
    pub fn validate(&self) -> Result<Vec<String>, InputError> {
        let mut urls: Vec<String> = self
            .start_urls
            .iter()
            .map(|entry| entry.url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        if urls.is_empty() {
            return Err(InputError::NoUrls);
        }

        if let Some(delay) = self.delay_between_requests {
            if delay < 0.0 || Duration::try_from_secs_f64(delay).is_err() {
                return Err(InputError::InvalidDelay(delay));
            }
        }

        if let Some(max_items) = self.max_items {
            urls.truncate(max_items);
        }

        Ok(urls)
    }
}

/// Default value for max_concurrency
fn default_max_concurrency() -> usize {
    5
}

fn default_fast_path() -> bool {
    true
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_network_idle_timeout_secs() -> u64 {
    15
}

fn default_extract_timeout_secs() -> u64 {
    10
}

fn default_block_phrases() -> Vec<String> {
    [
        "access denied",
        "forbidden",
        "captcha",
        "verify you are human",
        "are you a robot",
        "rate limit",
        "too many requests",
        "checking your browser",
        "cf-browser-verification",
        "cf-chl",
        "challenge-platform",
        "attention required! | cloudflare",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_block_prefix_chars() -> usize {
    2000
}

fn default_noise_selectors() -> Vec<String> {
    let tags = ["nav", "header", "footer", "aside"];
    let tokens = [
        "nav",
        "navbar",
        "navigation",
        "menu",
        "header",
        "footer",
        "sidebar",
        "aside",
        "ad",
        "ads",
        "advert",
        "advertisement",
        "promo",
        "sponsored",
        "newsletter",
        "subscribe",
        "share",
        "sharing",
        "social",
        "breadcrumb",
        "breadcrumbs",
        "comments",
        "comment-section",
        "cookie-banner",
        "cookie-consent",
        "cookie-notice",
        "modal",
        "popup",
        "overlay",
    ];

    let mut selectors: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    selectors.push("[role=navigation]".to_string());
    selectors.push("[role=banner]".to_string());
    selectors.push("[role=contentinfo]".to_string());
    for token in tokens {
        selectors.push(format!(".{token}"));
        selectors.push(format!("#{token}"));
    }
    selectors
}

fn default_content_selectors() -> Vec<String> {
    [
        "article",
        "main",
        "[role='main']",
        ".post-content",
        ".article-content",
        ".entry-content",
        ".markdown-body",
        ".documentation",
        ".content",
        "#content",
        "#main-content",
        ".post",
        ".article",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_content_chars() -> usize {
    120
}
