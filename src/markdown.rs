use pulldown_cmark::{html, Options, Parser};

/// Render markdown source to HTML. The result is stored alongside the source
/// as a cache; callers must re-render whenever the source changes.
pub fn render(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bold_text() {
        let html = render("**bold**");
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn renders_headings_and_lists() {
        let html = render("# Title\n\n- one\n- two\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn renders_links() {
        let html = render("[home](https://example.com)");
        assert!(html.contains("<a href=\"https://example.com\">home</a>"));
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render(""), "");
    }
}
