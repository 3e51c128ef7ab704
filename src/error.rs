use std::time::Duration;
use thiserror::Error;

use crate::loaders::Strategy;

/// Errors raised while retrieving a page with one of the loaders.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request itself failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A navigation or request deadline expired
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// No WebDriver session could be opened
    #[error("Failed to open WebDriver session: {0}")]
    Session(String),
    /// A WebDriver command failed after the session was opened
    #[error("WebDriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),
    /// The response looked like a block or challenge page
    #[error("{strategy} fetch was blocked (status {})", status.map_or_else(|| "unknown".to_string(), |s| s.to_string()))]
    Blocked {
        strategy: Strategy,
        status: Option<u16>,
    },
}

/// Article extraction failed; always absorbed by the pipeline.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Readability failed: {0}")]
    Readability(String),
    #[error("Extractor timed out after {0:?}")]
    Timeout(Duration),
    #[error("Extractor task aborted: {0}")]
    Aborted(String),
}

/// The content normalizer could not rewrite the fragment.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Failed to rewrite HTML: {0}")]
    Rewrite(String),
}

/// The Markdown renderer rejected its input.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to convert HTML to Markdown: {0}")]
    Conversion(String),
    #[error("Failed to canonicalize HTML before conversion: {0}")]
    Preprocess(String),
}

/// Every way a single page can fail; converted into a failure record.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Problems with configuration files or selector/pattern lists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
    #[error("Invalid block phrase list: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
    #[error("Invalid proxy '{url}': {source}")]
    InvalidProxy {
        url: String,
        source: reqwest::Error,
    },
}

/// Fatal run-level problems, reported once before any URL is processed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("No start URLs were supplied")]
    NoUrls,
    #[error("Delay between requests must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
