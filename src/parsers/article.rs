use std::io::Cursor;
use url::Url;

use crate::error::ExtractionError;

/// Title and content found by an article extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: Option<String>,
    /// Article HTML; never empty
    pub content: String,
}

/// Structured article extraction, tried before main-content selection
///
/// `Ok(None)` means the page has no recognizable article. Errors are
/// expected for a fair share of pages and are absorbed by the pipeline.
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &Url) -> Result<Option<Article>, ExtractionError>;
}

/// Article extraction backed by the readability algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor;

impl ArticleExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: &Url) -> Result<Option<Article>, ExtractionError> {
        let mut cursor = Cursor::new(html.as_bytes());
        let product = readability::extractor::extract(&mut cursor, url)
            .map_err(|_| ExtractionError::Readability(format!("no readable content in {}", url)))?;

        if product.text.trim().is_empty() || product.content.trim().is_empty() {
            return Ok(None);
        }

        let title = Some(product.title.trim().to_string()).filter(|t| !t.is_empty());
        Ok(Some(Article {
            title,
            content: product.content,
        }))
    }
}
