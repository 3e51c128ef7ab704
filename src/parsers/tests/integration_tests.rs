use crate::config::ScraperConfig;
use crate::parsers::{ContentNormalizer, MainContentSelector, MarkdownRenderer};
use url::Url;

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_PAGE: &str = r#"<html>
<head><title>Install guide</title></head>
<body>
<nav class="navbar"><a href="/">Docs home</a></nav>
<div class="layout">
  <div class="sidebar"><a href="/other">Other page</a></div>
  <div class="markdown-body">
    <h2>Installing</h2>
    <p>Download the <a href="../files/tool.tar.gz">release archive</a> and unpack it somewhere on your path.
    Then run the installer, which checks your environment and prints what it changed.</p>
    <img src="img/shot.png" alt="screenshot">
    <div class="share">Share this page</div>
  </div>
</div>
<footer>Copyright</footer>
</body>
</html>"#;

    #[test]
    fn test_select_normalize_render() {
        let config = ScraperConfig::default();
        let base = Url::parse("https://docs.example.test/guide/install").unwrap();

        let (fragment, title) = MainContentSelector::from_config(&config)
            .unwrap()
            .select(DOC_PAGE);
        assert_eq!(title.as_deref(), Some("Install guide"));
        assert!(fragment.contains("markdown-body"));
        assert!(!fragment.contains("Docs home"));

        let normalized = ContentNormalizer::new(config.noise_selectors)
            .unwrap()
            .normalize(&fragment, &base)
            .unwrap();
        assert!(!normalized.html.contains("Share this page"));

        let markdown = MarkdownRenderer::new().render(&normalized.html).unwrap();
        assert!(markdown.contains("## Installing"));
        assert!(markdown.contains("(https://docs.example.test/files/tool.tar.gz)"));
        assert!(markdown.contains("https://docs.example.test/guide/img/shot.png"));
        assert!(!markdown.contains("Other page"));
        assert!(!markdown.contains("Copyright"));
    }
}
