use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::config::ScraperConfig;
use crate::utils::char_prefix;

/// Configuration for block detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDetectorConfig {
    /// Phrases that signal a refusal or challenge page, matched case-insensitively
    pub phrases: Vec<String>,

    /// Number of leading characters of the body to inspect
    pub prefix_chars: usize,
}

impl From<&ScraperConfig> for BlockDetectorConfig {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            phrases: config.block_phrases.clone(),
            prefix_chars: config.block_prefix_chars,
        }
    }
}

impl Default for BlockDetectorConfig {
    fn default() -> Self {
        Self::from(&ScraperConfig::default())
    }
}

/// Classifies fetch responses as usable or blocked
///
/// False negatives are expected; a false positive only costs an extra
/// rendered fetch.
#[derive(Debug)]
pub struct BlockDetector {
    phrases: RegexSet,
    prefix_chars: usize,
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::new(BlockDetectorConfig::default()).expect("Default block phrases should be valid")
    }
}

impl BlockDetector {
    /// Create a new block detector from configuration
    pub fn new(config: BlockDetectorConfig) -> Result<Self, regex::Error> {
        let phrases = RegexSetBuilder::new(config.phrases.iter().map(|p| regex::escape(p)))
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            phrases,
            prefix_chars: config.prefix_chars,
        })
    }

    /// Determine if a response should be treated as blocked
    pub fn is_blocked(&self, status_code: Option<u16>, body: Option<&str>) -> bool {
        if let Some(status) = status_code {
            if status >= 400 {
                ::log::debug!("Blocked by status code {}", status);
                return true;
            }
        }

        let body = match body {
            Some(body) if !body.trim().is_empty() => body,
            _ => {
                ::log::debug!("Blocked by empty body");
                return true;
            }
        };

        let prefix = char_prefix(body, self.prefix_chars);
        if self.phrases.is_match(prefix) {
            ::log::debug!("Blocked by block phrase in first {} chars", self.prefix_chars);
            return true;
        }

        false
    }
}
