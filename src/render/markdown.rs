//! Line-oriented Markdown subset to HTML.
//!
//! The renderer is a three-state machine (`Normal`, `CodeBlock`, `List`)
//! driven one line at a time by [`Renderer::step`]. Input is never
//! round-tripped: the output is for display only.
//!
//! Outside code blocks, text is HTML-escaped before inline transforms run, so
//! literal markup in model output is shown rather than interpreted.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Marker appended while a reply is still streaming.
pub const STREAMING_CURSOR: &str = "<span class=\"streaming-cursor\"></span>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Ordered => "ol",
            Self::Unordered => "ul",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Normal,
    CodeBlock { lang: String, lines: Vec<String> },
    List(ListKind),
}

/// Classification of one input line outside a code block.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Fence(&'a str),
    Heading(usize, &'a str),
    Item(ListKind, &'a str),
    Blank,
    Text(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if let Some(lang) = line.strip_prefix("```") {
        return Line::Fence(lang.trim());
    }
    if line.is_empty() {
        return Line::Blank;
    }
    if let Some(heading) = heading(line) {
        return heading;
    }
    if let Some(item) = list_item(line) {
        return item;
    }
    Line::Text(line)
}

fn heading(line: &str) -> Option<Line<'_>> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    rest.starts_with(char::is_whitespace)
        .then(|| Line::Heading(level, rest.trim()))
}

fn list_item(line: &str) -> Option<Line<'_>> {
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        if rest.starts_with(char::is_whitespace) {
            return Some(Line::Item(ListKind::Unordered, rest.trim()));
        }
        return None;
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    rest.starts_with(char::is_whitespace)
        .then(|| Line::Item(ListKind::Ordered, rest.trim()))
}

struct Renderer {
    state: State,
    out: Vec<String>,
}

impl Renderer {
    fn new() -> Self {
        Self {
            state: State::Normal,
            out: Vec::new(),
        }
    }

    /// Consumes one input line and moves to the next state.
    fn step(&mut self, raw: &str) {
        let state = std::mem::replace(&mut self.state, State::Normal);
        self.state = match state {
            State::CodeBlock { lang, mut lines } => {
                if raw.trim_start().starts_with("```") {
                    self.out.push(code_block(&lang, &lines));
                    State::Normal
                } else {
                    lines.push(raw.to_string());
                    State::CodeBlock { lang, lines }
                }
            }
            State::Normal => self.step_outside_code(None, classify(raw)),
            State::List(kind) => self.step_outside_code(Some(kind), classify(raw)),
        };
    }

    fn step_outside_code(&mut self, open_list: Option<ListKind>, line: Line<'_>) -> State {
        if let Line::Item(kind, text) = line {
            match open_list {
                Some(open) if open == kind => {}
                Some(open) => {
                    self.close_list(open);
                    self.out.push(format!("<{}>", kind.tag()));
                }
                None => self.out.push(format!("<{}>", kind.tag())),
            }
            self.out.push(format!("<li>{}</li>", inline(text)));
            return State::List(kind);
        }

        if let Some(open) = open_list {
            self.close_list(open);
        }

        match line {
            Line::Fence(lang) => State::CodeBlock {
                lang: lang.to_string(),
                lines: Vec::new(),
            },
            Line::Heading(level, text) => {
                self.out.push(format!("<h{level}>{}</h{level}>", inline(text)));
                State::Normal
            }
            Line::Text(text) => {
                self.out.push(format!("<p>{}</p>", inline(text)));
                State::Normal
            }
            Line::Blank | Line::Item(..) => State::Normal,
        }
    }

    fn close_list(&mut self, kind: ListKind) {
        self.out.push(format!("</{}>", kind.tag()));
    }

    /// Flushes whatever is still open at end of input.
    fn finish(mut self) -> String {
        match std::mem::replace(&mut self.state, State::Normal) {
            State::CodeBlock { lang, lines } => self.out.push(code_block(&lang, &lines)),
            State::List(kind) => self.close_list(kind),
            State::Normal => {}
        }
        self.out.join("\n")
    }
}

fn code_block(lang: &str, lines: &[String]) -> String {
    let body = escape_html(&lines.join("\n"));
    if lang.is_empty() {
        format!("<pre><code>{body}</code></pre>")
    } else {
        format!(
            "<pre><code class=\"language-{}\">{body}</code></pre>",
            escape_html(lang)
        )
    }
}

fn inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"`([^`]+)`|\*\*(.+?)\*\*|__(.+?)__|\*(.+?)\*|_(.+?)_")
            .expect("inline pattern is valid")
    })
}

/// Escapes `text`, then applies code, bold and italic in one left-to-right
/// pass. Matches never nest or overlap.
fn inline(text: &str) -> String {
    let escaped = escape_html(text);
    inline_pattern()
        .replace_all(&escaped, |caps: &Captures<'_>| {
            if let Some(code) = caps.get(1) {
                format!("<code>{}</code>", code.as_str())
            } else if let Some(bold) = caps.get(2).or_else(|| caps.get(3)) {
                format!("<strong>{}</strong>", bold.as_str())
            } else if let Some(italic) = caps.get(4).or_else(|| caps.get(5)) {
                format!("<em>{}</em>", italic.as_str())
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders chat replies. Stateless; a streaming reply is re-rendered from its
/// full accumulated text after every delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, text: &str) -> String {
        let mut renderer = Renderer::new();
        for line in text.split('\n') {
            renderer.step(line.strip_suffix('\r').unwrap_or(line));
        }
        renderer.finish()
    }

    /// [`render`](Self::render) followed by the in-progress cursor marker.
    pub fn render_streaming(&self, text: &str) -> String {
        let mut html = self.render(text);
        html.push_str(STREAMING_CURSOR);
        html
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn render(text: &str) -> String {
        MarkdownRenderer::new().render(text)
    }

    #[test]
    fn classifies_lines() {
        assert_eq!(classify("```rust "), Line::Fence("rust"));
        assert_eq!(classify("## Title"), Line::Heading(2, "Title"));
        assert_eq!(classify("#hashtag"), Line::Text("#hashtag"));
        assert_eq!(classify("- item"), Line::Item(ListKind::Unordered, "item"));
        assert_eq!(classify("* item"), Line::Item(ListKind::Unordered, "item"));
        assert_eq!(classify("12. item"), Line::Item(ListKind::Ordered, "item"));
        assert_eq!(classify("**bold** start"), Line::Text("**bold** start"));
        assert_eq!(classify("3.14 is pi"), Line::Text("3.14 is pi"));
        assert_eq!(classify("   "), Line::Blank);
    }

    #[test]
    fn paragraphs_get_inline_transforms() {
        assert_eq!(
            render("Use **bold**, *italic*, __strong__, _em_ and `code`."),
            "<p>Use <strong>bold</strong>, <em>italic</em>, <strong>strong</strong>, \
             <em>em</em> and <code>code</code>.</p>"
        );
    }

    #[test]
    fn first_pattern_wins_without_nesting() {
        assert_eq!(render("`**not bold**`"), "<p><code>**not bold**</code></p>");
    }

    #[test]
    fn lists_open_switch_and_close() {
        assert_eq!(
            render("- a\n- b\n1. one\n2. two\n\nafter"),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<ol>\n<li>one</li>\n<li>two</li>\n</ol>\n<p>after</p>"
        );
    }

    #[test]
    fn list_closed_at_end_of_input() {
        assert_eq!(render("* only"), "<ul>\n<li>only</li>\n</ul>");
    }

    #[test]
    fn code_block_is_verbatim_and_escaped() {
        assert_eq!(
            render("- item\n```rust\n**x** <y>\n- not a list\n```\ntail"),
            "<ul>\n<li>item</li>\n</ul>\n\
             <pre><code class=\"language-rust\">**x** &lt;y&gt;\n- not a list</code></pre>\n\
             <p>tail</p>"
        );
    }

    #[test]
    fn unterminated_code_block_is_flushed() {
        assert_eq!(render("```\nlet a = 1;"), "<pre><code>let a = 1;</code></pre>");
    }

    #[test]
    fn headings_close_lists() {
        assert_eq!(
            render("- a\n### Next *step*"),
            "<ul>\n<li>a</li>\n</ul>\n<h3>Next <em>step</em></h3>"
        );
    }

    #[test]
    fn markup_outside_code_is_escaped() {
        assert_eq!(
            render("<script>alert('x')</script> & **b**"),
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; <strong>b</strong></p>"
        );
    }

    #[test]
    fn streaming_appends_cursor() {
        assert_eq!(
            MarkdownRenderer::new().render_streaming("Hi"),
            format!("<p>Hi</p>{STREAMING_CURSOR}")
        );
        assert_eq!(MarkdownRenderer::new().render_streaming(""), STREAMING_CURSOR);
    }
}
