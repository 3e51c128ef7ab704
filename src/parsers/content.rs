use scraper::{ElementRef, Html, Selector};
use std::cmp::Reverse;
use std::sync::LazyLock;

use super::{body_or_document_of, visible_text};
use crate::config::ScraperConfig;
use crate::error::ConfigError;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("'title' is a valid selector"));
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("'h1' is a valid selector"));

/// Locates the sub-tree most likely to hold a page's primary content
///
/// Selectors form tiers in priority order. The first tier with any element
/// whose visible text is longer than the threshold wins, and within that tier
/// the element with the most text is chosen. Semantic markup therefore beats
/// raw size, while near-empty wrappers that happen to match are skipped.
#[derive(Debug, Clone)]
pub struct MainContentSelector {
    tiers: Vec<Selector>,
    min_text_chars: usize,
}

impl MainContentSelector {
    pub fn new(selectors: &[String], min_text_chars: usize) -> Result<Self, ConfigError> {
        let tiers = selectors
            .iter()
            .map(|s| Selector::parse(s).map_err(|_| ConfigError::InvalidSelector(s.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tiers,
            min_text_chars,
        })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, ConfigError> {
        Self::new(&config.content_selectors, config.min_content_chars)
    }

    /// Returns the content fragment's HTML and the document's title, if any
    pub fn select(&self, html: &str) -> (String, Option<String>) {
        let doc = Html::parse_document(html);
        let title = title_of(&doc);

        for (tier, selector) in self.tiers.iter().enumerate() {
            if let Some((len, element)) = self.best_in_tier(&doc, selector) {
                ::log::debug!(
                    "Main content found at tier {} with {} visible chars",
                    tier,
                    len
                );
                return (element.html(), title);
            }
        }

        ::log::debug!("No content container qualified, using the whole body");
        (body_or_document_of(&doc), title)
    }

    fn best_in_tier<'a>(
        &self,
        doc: &'a Html,
        selector: &Selector,
    ) -> Option<(usize, ElementRef<'a>)> {
        doc.select(selector)
            .map(|element| (visible_text(&element).chars().count(), element))
            .filter(|(len, _)| *len > self.min_text_chars)
            // first element wins ties
            .min_by_key(|(len, _)| Reverse(*len))
    }
}

/// Title of an HTML document
///
/// Uses the trimmed `<title>`, or the text of the page's only `<h1>`.
pub fn document_title(html: &str) -> Option<String> {
    title_of(&Html::parse_document(html))
}

fn title_of(doc: &Html) -> Option<String> {
    let title = doc
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| visible_text(&el))
        .filter(|t| !t.is_empty());
    if title.is_some() {
        return title;
    }

    let mut headings = doc.select(&H1_SELECTOR);
    match (headings.next(), headings.next()) {
        (Some(only), None) => Some(visible_text(&only)).filter(|t| !t.is_empty()),
        _ => None,
    }
}
