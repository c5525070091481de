//! Markdown rendering
//!
//! Post bodies are authored in Markdown and stored alongside their rendered
//! HTML. The renderer also derives the plain-text views used for excerpts,
//! meta descriptions and reading time.

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Average adult reading speed used for the reading-time estimate
const WORDS_PER_MINUTE: usize = 200;

/// Markdown to HTML renderer
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Tables, strikethrough, task lists, footnotes and smart punctuation enabled
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        Self { options }
    }

    /// Render Markdown to HTML.
    ///
    /// Fenced code blocks keep their language as a `language-*` class so the
    /// front end can highlight them.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let events = code_blocks_with_language(parser);

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }

    /// Text content only, with block boundaries collapsed to single spaces
    pub fn plain_text(&self, markdown: &str) -> String {
        let mut text = String::new();
        for event in Parser::new_ext(markdown, self.options) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak
                | Event::HardBreak
                | Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::BlockQuote
                    | TagEnd::CodeBlock
                    | TagEnd::TableCell,
                ) => text.push(' '),
                _ => {}
            }
        }
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// First `max_chars` characters of the plain text, cut at a word boundary
    pub fn excerpt(&self, markdown: &str, max_chars: usize) -> String {
        let text = self.plain_text(markdown);
        if text.chars().count() <= max_chars {
            return text;
        }

        let cut: String = text.chars().take(max_chars).collect();
        let trimmed = match cut.rfind(' ') {
            Some(pos) if pos > 0 => &cut[..pos],
            _ => cut.as_str(),
        };
        format!("{}…", trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation()))
    }

    /// Estimated reading time in whole minutes, never less than one
    pub fn reading_minutes(&self, markdown: &str) -> i64 {
        let words = self.plain_text(markdown).split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
    }
}

/// Replace fenced code blocks with escaped `<pre><code>` HTML carrying the language class
fn code_blocks_with_language(parser: Parser<'_>) -> Vec<Event<'_>> {
    let mut events = Vec::new();
    let mut code: Option<(Option<String>, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                };
                code = Some((lang, String::new()));
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, body)) = code.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, body)) = code.take() {
                    let html = match lang {
                        Some(lang) => format!(
                            "<pre><code class=\"language-{}\">{}</code></pre>\n",
                            escape_html(&lang),
                            escape_html(&body)
                        ),
                        None => format!("<pre><code>{}</code></pre>\n", escape_html(&body)),
                    };
                    events.push(Event::Html(html.into()));
                }
            }
            other => events.push(other),
        }
    }

    events
}

/// Escape the five HTML special characters
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
