use scraper::{Html, Selector};
use std::sync::LazyLock;

pub mod article;
pub mod content;
pub mod markdown;
pub mod normalize;

#[cfg(test)]
mod tests;

pub use article::{Article, ArticleExtractor, ReadabilityExtractor};
pub use content::MainContentSelector;
pub use markdown::MarkdownRenderer;
pub use normalize::ContentNormalizer;

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("'body' is a valid selector"));

/// Where a content fragment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentSource {
    ArticleExtractor,
    MainContentSelector,
}

/// The part of a page chosen as its primary content
#[derive(Debug, Clone)]
pub struct ContentFragment {
    /// Fragment HTML; never empty when it came from the article extractor
    pub html: String,
    pub title: Option<String>,
    pub source: FragmentSource,
}

/// A fragment after noise removal and reference absolutization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFragment {
    pub html: String,
}

/// Inner HTML of the body element, or the whole document if there is none
pub(crate) fn body_or_document(html: &str) -> String {
    let doc = Html::parse_document(html);
    body_or_document_of(&doc)
}

pub(crate) fn body_or_document_of(doc: &Html) -> String {
    match doc.select(&BODY_SELECTOR).next() {
        Some(body) => body.inner_html(),
        None => doc.root_element().html(),
    }
}

// Elements whose text never reaches the reader
const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Whitespace-collapsed text of an element, text nodes separated by spaces
///
/// Text inside script, style, noscript and template elements is skipped.
pub(crate) fn visible_text(element: &scraper::ElementRef<'_>) -> String {
    let parts: Vec<&str> = element
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| INVISIBLE_TAGS.contains(&el.name()))
                })
        })
        .map(|(_, text)| &**text)
        .collect();

    crate::utils::collapse_whitespace(&parts.join(" "))
}
