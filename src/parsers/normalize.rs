use lol_html::html_content::Element;
use lol_html::{ElementContentHandlers, RewriteStrSettings, Selector, rewrite_str};
use std::borrow::Cow;
use url::Url;

use super::{NormalizedFragment, body_or_document};
use crate::error::{ConfigError, NormalizeError};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Tags that never carry renderable content, removed wherever they appear
pub const ALWAYS_REMOVED: [&str; 5] = ["script", "style", "noscript", "iframe", "template"];

const HREF_SELECTORS: [&str; 3] = ["a[href]", "area[href]", "link[href]"];
const SRC_SELECTORS: [&str; 6] = [
    "img[src]",
    "audio[src]",
    "video[src]",
    "source[src]",
    "track[src]",
    "embed[src]",
];
const SRCSET_SELECTORS: [&str; 2] = ["img[srcset]", "source[srcset]"];

// References that are left exactly as written
const UNRESOLVED_PREFIXES: [&str; 3] = ["mailto:", "javascript:", "tel:"];

/// Strips noise elements from a fragment and makes every reference absolute
#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    noise_selectors: Vec<String>,
}

impl ContentNormalizer {
    /// Create a normalizer; every noise selector must be valid
    pub fn new(noise_selectors: Vec<String>) -> Result<Self, ConfigError> {
        for selector in &noise_selectors {
            if selector.parse::<Selector>().is_err() {
                return Err(ConfigError::InvalidSelector(selector.clone()));
            }
        }
        Ok(Self { noise_selectors })
    }

    /// Clean `html` and absolutize its references against `base`
    ///
    /// The result is the body's inner HTML when the document has a body,
    /// otherwise the whole rewritten document. Normalizing the output again
    /// leaves it unchanged.
    pub fn normalize(&self, html: &str, base: &Url) -> Result<NormalizedFragment, NormalizeError> {
        if html.trim().is_empty() {
            return Ok(NormalizedFragment {
                html: String::new(),
            });
        }

        let rewritten = self.rewrite(html, base)?;
        // leading whitespace would be dropped on a second parse
        Ok(NormalizedFragment {
            html: body_or_document(&rewritten).trim().to_string(),
        })
    }

    fn rewrite(&self, html: &str, base: &Url) -> Result<String, NormalizeError> {
        let removed = parse_selectors(
            ALWAYS_REMOVED
                .iter()
                .copied()
                .chain(self.noise_selectors.iter().map(String::as_str)),
        )?;
        let hrefs = parse_selectors(HREF_SELECTORS.iter().copied())?;
        let srcs = parse_selectors(SRC_SELECTORS.iter().copied())?;
        let srcsets = parse_selectors(SRCSET_SELECTORS.iter().copied())?;

        let mut handlers = Vec::new();
        for selector in &removed {
            handlers.push((
                Cow::Borrowed(selector),
                ElementContentHandlers::default().element(remove_element),
            ));
        }
        for selector in &hrefs {
            handlers.push((
                Cow::Borrowed(selector),
                ElementContentHandlers::default()
                    .element(move |el: &mut Element<'_, '_>| absolutize_attribute(el, "href", base)),
            ));
        }
        for selector in &srcs {
            handlers.push((
                Cow::Borrowed(selector),
                ElementContentHandlers::default()
                    .element(move |el: &mut Element<'_, '_>| absolutize_attribute(el, "src", base)),
            ));
        }
        for selector in &srcsets {
            handlers.push((
                Cow::Borrowed(selector),
                ElementContentHandlers::default()
                    .element(move |el: &mut Element<'_, '_>| absolutize_srcset_attribute(el, base)),
            ));
        }

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: handlers,
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| NormalizeError::Rewrite(e.to_string()))
    }
}

fn parse_selectors<'a>(
    selectors: impl Iterator<Item = &'a str>,
) -> Result<Vec<Selector>, NormalizeError> {
    selectors
        .map(|s| {
            s.parse::<Selector>()
                .map_err(|e| NormalizeError::Rewrite(format!("invalid selector '{}': {}", s, e)))
        })
        .collect()
}

fn remove_element(el: &mut Element<'_, '_>) -> HandlerResult {
    el.remove();
    Ok(())
}

fn absolutize_attribute(el: &mut Element<'_, '_>, name: &str, base: &Url) -> HandlerResult {
    if let Some(value) = el.get_attribute(name) {
        if let Some(resolved) = resolve_reference(&value, base) {
            if resolved != value {
                el.set_attribute(name, &resolved)?;
            }
        }
    }
    Ok(())
}

fn absolutize_srcset_attribute(el: &mut Element<'_, '_>, base: &Url) -> HandlerResult {
    if let Some(value) = el.get_attribute("srcset") {
        let resolved = absolutize_srcset(&value, base);
        if resolved != value {
            el.set_attribute("srcset", &resolved)?;
        }
    }
    Ok(())
}

/// Resolve one reference against `base`
///
/// Returns `None` when the reference must be left as written: empty values,
/// fragments, `mailto:`/`javascript:`/`tel:` links, unparsable references and
/// anything that does not resolve to http or https.
pub fn resolve_reference(value: &str, base: &Url) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let lowered = trimmed.to_ascii_lowercase();
    if UNRESOLVED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let resolved = base.join(trimmed).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Resolve each `srcset` candidate's URL, keeping its descriptor verbatim
pub fn absolutize_srcset(srcset: &str, base: &Url) -> String {
    srcset_candidates(srcset)
        .into_iter()
        .map(|(url, descriptor)| {
            let url = resolve_reference(url, base).unwrap_or_else(|| url.to_string());
            if descriptor.is_empty() {
                url
            } else {
                format!("{} {}", url, descriptor)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a `srcset` value into `(url, descriptor)` candidates
///
/// A URL runs to the next whitespace and may itself contain commas; only
/// trailing commas end it. Descriptors run to the next comma outside
/// parentheses.
fn srcset_candidates(srcset: &str) -> Vec<(&str, &str)> {
    let mut candidates = Vec::new();
    let mut rest = srcset;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (raw_url, after) = rest.split_at(url_end);
        let url = raw_url.trim_end_matches(',');
        if url.len() < raw_url.len() {
            candidates.push((url, ""));
            rest = after;
            continue;
        }

        let mut depth = 0usize;
        let mut descriptor_end = after.len();
        for (idx, c) in after.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    descriptor_end = idx;
                    break;
                }
                _ => {}
            }
        }

        candidates.push((url, after[..descriptor_end].trim()));
        rest = &after[descriptor_end..];
    }

    candidates
}
