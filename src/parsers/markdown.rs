use html_to_markdown_rs::{
    CodeBlockStyle, ConversionOptions, HeadingStyle, PreprocessingOptions, convert,
};
use lol_html::html_content::Element;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::RenderError;

static THEMATIC_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:\* *){3,}|(?:_ *){3,}|(?:- *){3,})$").expect("valid break pattern")
});

/// Converts cleaned HTML into the crate's fixed Markdown dialect
///
/// * ATX headings
/// * `---` horizontal rules
/// * `*` bullets
/// * fenced code blocks
/// * `~~` strikethrough for `del`, `s` and `strike`
/// * pipe tables with a blank line before and after
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> ConversionOptions {
        let mut options = ConversionOptions {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Backticks,
            bullets: "*".to_string(),
            escape_asterisks: false,
            escape_underscores: false,
            ..Default::default()
        };

        // noise is already gone by the time HTML reaches the renderer
        options.preprocessing = PreprocessingOptions {
            enabled: false,
            ..Default::default()
        };
        options
    }

    pub fn render(&self, html: &str) -> Result<String, RenderError> {
        if html.trim().is_empty() {
            return Ok(String::new());
        }

        let canonical = canonicalize_strikethrough(html)?;
        let markdown = convert(&canonical, Some(Self::options()))
            .map_err(|e| RenderError::Conversion(e.to_string()))?;

        Ok(tidy(&pad_tables(&markdown)))
    }
}

/// Rewrite `s` and `strike` to `del` so every strikethrough renders alike
fn canonicalize_strikethrough(html: &str) -> Result<String, RenderError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("s", |el: &mut Element<'_, '_>| {
                    el.set_tag_name("del")?;
                    Ok(())
                }),
                element!("strike", |el: &mut Element<'_, '_>| {
                    el.set_tag_name("del")?;
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| RenderError::Preprocess(e.to_string()))
}

/// Put exactly one blank line before and after every pipe table block
pub fn pad_tables(markdown: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut in_table = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        }

        let is_table_row = !in_fence && trimmed.starts_with('|');
        if is_table_row && !in_table {
            if lines.last().is_some_and(|prev| !prev.trim().is_empty()) {
                lines.push("");
            }
        } else if !is_table_row && in_table && !line.trim().is_empty() {
            lines.push("");
        }

        in_table = is_table_row;
        lines.push(line);
    }

    lines.join("\n")
}

/// Normalize rules to `---`, collapse blank-line runs, trim the ends
///
/// Fenced code is left exactly as converted.
pub fn tidy(markdown: &str) -> String {
    let mut in_fence = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        let is_fence = line.trim_start().starts_with("```");
        if in_fence || is_fence {
            if is_fence {
                in_fence = !in_fence;
            }
            lines.push(line);
        } else if line.trim().is_empty() {
            if lines.last().is_some_and(|prev| !prev.is_empty()) {
                lines.push("");
            }
        } else if THEMATIC_BREAK.is_match(line) {
            lines.push("---");
        } else {
            lines.push(line);
        }
    }

    lines.join("\n").trim().to_string()
}
