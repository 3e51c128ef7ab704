use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Title used when no title could be resolved for a page
pub const UNTITLED: &str = "Untitled";

/// Title of the record emitted for a page that could not be processed
pub const ERROR_TITLE: &str = "Error Processing Page";

/// One queued unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL of the page
    pub url: String,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The output record produced for every input URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,

    pub title: String,

    /// The assembled Markdown document
    pub markdown: String,

    /// RFC 3339 timestamp of when the record was created
    pub timestamp: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PageRecord {
    /// Assemble the record for a successfully processed page
    pub fn success(url: &str, title: Option<String>, body: &str) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let markdown = format!(
            "# {}\n\n**URL Source:** {}\n\n---\n\n{}",
            title, url, body
        );

        Self {
            url: url.to_string(),
            title,
            markdown,
            timestamp: now_timestamp(),
            success: true,
            error_message: None,
        }
    }

    /// Build the record for a page that could not be processed
    pub fn failure(url: &str, error_message: impl Into<String>) -> Self {
        let error_message = error_message.into();
        let markdown = format!(
            "# {}\n\n**URL:** {}\n\n**Error:** {}",
            ERROR_TITLE, url, error_message
        );

        Self {
            url: url.to_string(),
            title: ERROR_TITLE.to_string(),
            markdown,
            timestamp: now_timestamp(),
            success: false,
            error_message: Some(error_message),
        }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Observational statistics for a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// Account for one finished record
    pub fn record(&mut self, record: &PageRecord) {
        self.processed += 1;
        if !record.success {
            self.failed += 1;
        }
    }

    pub fn succeeded(&self) -> usize {
        self.processed - self.failed
    }

    /// Share of successful pages, in percent
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.succeeded() as f64 * 100.0 / self.processed as f64
    }

    pub fn average_per_page(&self) -> Duration {
        if self.processed == 0 {
            return Duration::ZERO;
        }
        self.duration / self.processed as u32
    }
}
