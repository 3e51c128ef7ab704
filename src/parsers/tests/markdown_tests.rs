use crate::parsers::markdown::{MarkdownRenderer, pad_tables, tidy};

#[cfg(test)]
mod tests {
    use super::*;

    fn render(html: &str) -> String {
        MarkdownRenderer::new().render(html).unwrap()
    }

    #[test]
    fn test_atx_headings() {
        let md = render("<h1>Title</h1><h2>Section</h2><p>Body</p>");
        assert!(md.contains("# Title"));
        assert!(md.contains("## Section"));
        assert!(!md.contains("====="));
    }

    #[test]
    fn test_asterisk_bullets() {
        let md = render("<ul><li>one</li><li>two</li></ul>");
        assert!(md.contains("* one"));
        assert!(md.contains("* two"));
    }

    #[test]
    fn test_fenced_code_blocks() {
        let md = render("<pre><code>let x = 1;</code></pre>");
        assert!(md.contains("```"));
        assert!(md.contains("let x = 1;"));
        assert!(!md.contains("    let x = 1;"));
    }

    #[test]
    fn test_strikethrough_variants() {
        let md = render("<p><del>alpha</del> <s>beta</s> <strike>gamma</strike></p>");
        assert!(md.contains("~~alpha~~"));
        assert!(md.contains("~~beta~~"));
        assert!(md.contains("~~gamma~~"));
    }

    #[test]
    fn test_horizontal_rule() {
        let md = render("<p>above</p><hr><p>below</p>");
        assert!(md.lines().any(|line| line == "---"));
    }

    #[test]
    fn test_table_is_padded() {
        let md = render(
            "<p>before</p><table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr></tbody></table><p>after</p>",
        );
        let lines: Vec<&str> = md.lines().collect();

        let first = lines.iter().position(|l| l.starts_with('|')).unwrap();
        let last = lines.iter().rposition(|l| l.starts_with('|')).unwrap();
        assert!(first > 0 && last + 1 < lines.len());
        assert_eq!(lines[first - 1], "");
        assert_eq!(lines[last + 1], "");
        assert!(md.contains("before"));
        assert!(md.contains("after"));
    }

    #[test]
    fn test_pad_tables() {
        assert_eq!(
            pad_tables("text\n| a |\n| --- |\nmore"),
            "text\n\n| a |\n| --- |\n\nmore"
        );

        let padded = "text\n\n| a |\n| --- |\n\nmore";
        assert_eq!(pad_tables(padded), padded);

        let fenced = "```\necho hi\n| grep hi\n```";
        assert_eq!(pad_tables(fenced), fenced);
    }

    #[test]
    fn test_collapses_blank_lines() {
        let md = render("\n\n<p>one</p>\n\n\n\n<div></div><div></div>\n\n\n<p>two</p>\n\n");
        assert!(!md.contains("\n\n\n"));
        assert!(!md.starts_with('\n'));
        assert!(!md.ends_with('\n'));
    }

    #[test]
    fn test_tidy_leaves_fenced_code_alone() {
        let markdown = "\n\nintro\n\n\n\ntext\n```\nfirst\n\n\n\nsecond\n***\n```\n\n\n\n* * *\n\n";
        assert_eq!(
            tidy(markdown),
            "intro\n\ntext\n```\nfirst\n\n\n\nsecond\n***\n```\n\n---"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
        assert_eq!(render("  \n "), "");
    }
}
