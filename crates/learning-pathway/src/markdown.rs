/// Markdown to HTML for topic bodies.
///
/// `BasicMarkdownRenderer` is a line-based state machine covering the subset topic
/// files use: ATX headings, fenced code, bullet and numbered lists, paragraphs, and
/// inline code, bold, emphasis and links. Anything else passes through as paragraph
/// text, escaped.
use std::sync::LazyLock;

use regex::Regex;

pub trait MarkupRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMarkdownRenderer;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,5})\s+(.+?)\s*#*\s*$").expect("valid regex"));
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```\s*([\w+-]*)\s*$").expect("valid regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+(.*)$").expect("valid regex"));
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").expect("valid regex"));
static CODE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("valid regex"));
static EM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*|\b_([^_]+)_\b").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Bullet => "ul",
            Self::Numbered => "ol",
        }
    }
}

enum Block {
    None,
    Paragraph(Vec<String>),
    List(ListKind, Vec<String>),
    Code { language: String, lines: Vec<String> },
}

impl MarkupRenderer for BasicMarkdownRenderer {
    fn render(&self, source: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut block = Block::None;

        for line in source.lines() {
            if let Block::Code { lines, .. } = &mut block {
                if FENCE_RE.is_match(line) {
                    flush(&mut out, std::mem::replace(&mut block, Block::None));
                } else {
                    lines.push(line.to_string());
                }
                continue;
            }

            if let Some(caps) = FENCE_RE.captures(line) {
                flush(&mut out, std::mem::replace(&mut block, Block::None));
                block = Block::Code {
                    language: caps[1].to_string(),
                    lines: Vec::new(),
                };
                continue;
            }

            if line.trim().is_empty() {
                flush(&mut out, std::mem::replace(&mut block, Block::None));
                continue;
            }

            if let Some(caps) = HEADING_RE.captures(line) {
                flush(&mut out, std::mem::replace(&mut block, Block::None));
                let level = caps[1].len();
                out.push(format!("<h{level}>{}</h{level}>", inline(&caps[2])));
                continue;
            }

            let item = BULLET_RE
                .captures(line)
                .map(|c| (ListKind::Bullet, c[1].to_string()))
                .or_else(|| {
                    NUMBERED_RE
                        .captures(line)
                        .map(|c| (ListKind::Numbered, c[1].to_string()))
                });
            if let Some((kind, text)) = item {
                match &mut block {
                    Block::List(current, items) if *current == kind => items.push(text),
                    _ => {
                        flush(&mut out, std::mem::replace(&mut block, Block::None));
                        block = Block::List(kind, vec![text]);
                    }
                }
                continue;
            }

            match &mut block {
                Block::Paragraph(lines) => lines.push(line.trim().to_string()),
                // Lazy continuation of the previous list item.
                Block::List(_, items) if line.starts_with(char::is_whitespace) => {
                    if let Some(last) = items.last_mut() {
                        last.push(' ');
                        last.push_str(line.trim());
                    }
                }
                _ => {
                    flush(&mut out, std::mem::replace(&mut block, Block::None));
                    block = Block::Paragraph(vec![line.trim().to_string()]);
                }
            }
        }

        // An unterminated fence runs to the end of the document.
        flush(&mut out, block);
        out.join("\n")
    }
}

fn flush(out: &mut Vec<String>, block: Block) {
    match block {
        Block::None => {}
        Block::Paragraph(lines) => out.push(format!("<p>{}</p>", inline(&lines.join("\n")))),
        Block::List(kind, items) => {
            let tag = kind.tag();
            let body: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", inline(item)))
                .collect();
            out.push(format!("<{tag}>{body}</{tag}>"));
        }
        Block::Code { language, lines } => {
            let code = escape_html(&lines.join("\n"));
            if language.is_empty() {
                out.push(format!("<pre><code>{code}</code></pre>"));
            } else {
                out.push(format!(
                    "<pre><code class=\"language-{language}\">{code}</code></pre>"
                ));
            }
        }
    }
}

/// Inline rules. Code spans are cut out first so their contents are never
/// reinterpreted.
fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in CODE_SPAN_RE.find_iter(text) {
        let code = &span.as_str()[1..span.len() - 1];
        out.push_str(&inline_plain(&text[last..span.start()]));
        out.push_str("<code>");
        out.push_str(&escape_html(code));
        out.push_str("</code>");
        last = span.end();
    }
    out.push_str(&inline_plain(&text[last..]));
    out
}

/// Links are cut out like code spans; emphasis applies to the link text only.
fn inline_plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in LINK_RE.captures_iter(text) {
        let (Some(link), Some(label), Some(href)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        out.push_str(&emphasis(&text[last..link.start()]));
        out.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            escape_html(href.as_str()),
            emphasis(label.as_str())
        ));
        last = link.end();
    }
    out.push_str(&emphasis(&text[last..]));
    out
}

fn emphasis(text: &str) -> String {
    let escaped = escape_html(text);
    let bold = BOLD_RE.replace_all(&escaped, |caps: &regex::Captures| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{inner}</strong>")
    });
    EM_RE
        .replace_all(&bold, |caps: &regex::Captures| {
            let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("<em>{inner}</em>")
        })
        .into_owned()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
