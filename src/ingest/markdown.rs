use pulldown_cmark::{html, Options, Parser as CmarkParser};

/// Trait for markdown renderers: raw bytes in, HTML out, no state.
pub trait Renderer: Send + Sync {
    fn render(&self, raw: &[u8]) -> String;
}

/// CommonMark renderer with the usual wiki extensions (tables, footnotes,
/// strikethrough, task lists, heading attributes)
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, raw: &[u8]) -> String {
        // Invalid UTF-8 is replaced rather than rejected
        let text = String::from_utf8_lossy(raw);
        let parser = CmarkParser::new_ext(&text, Self::options());

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}
