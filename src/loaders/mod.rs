use async_trait::async_trait;
use std::fmt;

use crate::error::FetchError;

pub mod browser;
pub mod http;

pub use browser::BrowserLoader;
pub use http::HttpLoader;

/// How a page was retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain HTTP request, no scripts executed
    Fast,
    /// Full browser session that runs page scripts
    Rendered,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Fast => f.write_str("fast"),
            Strategy::Rendered => f.write_str("rendered"),
        }
    }
}

/// Raw outcome of one fetch attempt
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code, when the strategy can observe it
    pub status_code: Option<u16>,
    /// Raw HTML
    pub body: Option<String>,
    pub strategy: Strategy,
    /// Live page title reported by the browser
    pub title: Option<String>,
}

// Base trait for document loaders
#[async_trait]
pub trait Loader: Send + Sync {
    /// Which strategy this loader implements
    fn strategy(&self) -> Strategy;

    /// Retrieve the raw HTML of a page
    async fn load(&self, url: &str) -> Result<FetchResult, FetchError>;
}

/// Round-robin cursor over a fixed list
#[derive(Debug, Default)]
pub(crate) struct Rotation {
    next: std::sync::atomic::AtomicUsize,
}

impl Rotation {
    /// Index of the next slot out of `len`
    pub(crate) fn next_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_cycles() {
        let rotation = Rotation::default();
        let picked: Vec<usize> = (0..5).map(|_| rotation.next_index(3)).collect();
        assert_eq!(picked, vec![0, 1, 2, 0, 1]);
        assert_eq!(rotation.next_index(0), 0);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Fast.to_string(), "fast");
        assert_eq!(Strategy::Rendered.to_string(), "rendered");
    }
}
