//! Markdown-subset formatter for invention documents.
//!
//! Recognizes exactly three line kinds (`* ` list items, `## `/`### `
//! headings, everything else a paragraph) and one inline rule (`**bold**`).
//! Anything richer degrades to plain paragraph text.

use std::iter::Peekable;
use std::sync::LazyLock;

use regex::Regex;

static STRONG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

/// Inline run inside a paragraph or list item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Strong(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Text(t) | Span::Strong(t) => t,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Level is 2 or 3. Heading text is never inline-parsed.
    Heading { level: u8, text: String },
    Paragraph(Vec<Span>),
    List(Vec<Vec<Span>>),
}

impl Block {
    /// Re-render as subset markdown with emphasis markup dropped.
    pub fn to_markdown(&self) -> String {
        match self {
            Block::Heading { level, text } => format!("{} {text}", "#".repeat(*level as usize)),
            Block::Paragraph(spans) => plain(spans),
            Block::List(items) => items
                .iter()
                .map(|item| format!("* {}", plain(item)))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn plain(spans: &[Span]) -> String {
    spans.iter().map(Span::text).collect()
}

/// Split `**text**` runs out of a line.
fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in STRONG.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::Text(line[last..whole.start()].to_string()));
        }
        spans.push(Span::Strong(inner.as_str().to_string()));
        last = whole.end();
    }
    if last < line.len() || spans.is_empty() {
        spans.push(Span::Text(line[last..].to_string()));
    }
    spans
}

/// Lazy, consume-once sequence of blocks. See [`format`].
pub struct Blocks {
    lines: Peekable<std::vec::IntoIter<String>>,
}

impl Iterator for Blocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let line = self.lines.next()?;

        if let Some(item) = line.strip_prefix("* ") {
            let mut items = vec![parse_inline(item)];
            while let Some(next) = self.lines.next_if(|l| l.starts_with("* ")) {
                items.push(parse_inline(&next[2..]));
            }
            return Some(Block::List(items));
        }

        let block = if let Some(text) = line.strip_prefix("### ") {
            Block::Heading {
                level: 3,
                text: text.to_string(),
            }
        } else if let Some(text) = line.strip_prefix("## ") {
            Block::Heading {
                level: 2,
                text: text.to_string(),
            }
        } else {
            Block::Paragraph(parse_inline(&line))
        };
        Some(block)
    }
}

/// Format AI document text into blocks.
/// Literal `\n` escapes become real newlines; blank lines are dropped.
pub fn format(content: &str) -> Blocks {
    let unescaped = content.replace("\\n", "\n");
    let lines: Vec<String> = unescaped
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();
    Blocks {
        lines: lines.into_iter().peekable(),
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn spans_html(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|s| match s {
            Span::Text(t) => escape_html(t),
            Span::Strong(t) => format!("<strong class=\"accent\">{}</strong>", escape_html(t)),
        })
        .collect()
}

/// Render blocks as an HTML fragment. All text is escaped.
pub fn render_html(blocks: impl IntoIterator<Item = Block>) -> String {
    let mut html = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                html.push_str(&format!("<h{level}>{}</h{level}>\n", escape_html(&text)));
            }
            Block::Paragraph(spans) => {
                html.push_str(&format!("<p>{}</p>\n", spans_html(&spans)));
            }
            Block::List(items) => {
                html.push_str("<ul>\n");
                for item in items {
                    html.push_str(&format!("  <li>{}</li>\n", spans_html(&item)));
                }
                html.push_str("</ul>\n");
            }
        }
    }
    html
}

/// Render blocks for a terminal: headings underlined, lists bulleted.
pub fn render_plain(blocks: impl IntoIterator<Item = Block>) -> String {
    let mut out = Vec::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let rule = if level == 2 { '=' } else { '-' };
                let width = text.chars().count();
                out.push(format!("{text}\n{}", rule.to_string().repeat(width)));
            }
            Block::Paragraph(spans) => out.push(plain(&spans)),
            Block::List(items) => out.push(
                items
                    .iter()
                    .map(|i| format!("  • {}", plain(i)))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }
    out.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    fn strong(s: &str) -> Span {
        Span::Strong(s.to_string())
    }

    #[test]
    fn test_heading_list_paragraph_sequence() {
        let blocks: Vec<Block> = format("## Title\n* a\n* b\nplain line").collect();
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 2,
                    text: "Title".into()
                },
                Block::List(vec![vec![text("a")], vec![text("b")]]),
                Block::Paragraph(vec![text("plain line")]),
            ]
        );
    }

    #[test]
    fn test_escaped_newlines_unescaped() {
        let blocks: Vec<Block> = format("## A\\n### B\\nbody").collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[1],
            Block::Heading {
                level: 3,
                text: "B".into()
            }
        );
    }

    #[test]
    fn test_blank_lines_dropped() {
        let blocks: Vec<Block> = format("\n\n   \nonly\n\n").collect();
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("only")])]);
    }

    #[test]
    fn test_heading_interrupts_list() {
        let blocks: Vec<Block> = format("* one\n### Break\n* two").collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::List(vec![vec![text("one")]]));
        assert!(matches!(blocks[1], Block::Heading { level: 3, .. }));
        assert_eq!(blocks[2], Block::List(vec![vec![text("two")]]));
    }

    #[test]
    fn test_paragraph_interrupts_list() {
        let blocks: Vec<Block> = format("* one\nmiddle\n* two\n* three").collect();
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[2], Block::List(items) if items.len() == 2));
    }

    #[test]
    fn test_list_at_end_is_flushed() {
        let blocks: Vec<Block> = format("intro\n* x\n* y").collect();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[1], Block::List(items) if items.len() == 2));
    }

    #[test]
    fn test_strong_spans() {
        let blocks: Vec<Block> = format("The **RTPD** core uses **torsion** fields").collect();
        assert_eq!(
            blocks[0],
            Block::Paragraph(vec![
                text("The "),
                strong("RTPD"),
                text(" core uses "),
                strong("torsion"),
                text(" fields"),
            ])
        );
    }

    #[test]
    fn test_strong_in_list_items() {
        let blocks: Vec<Block> = format("* **Shielding:** active").collect();
        assert_eq!(
            blocks[0],
            Block::List(vec![vec![strong("Shielding:"), text(" active")]])
        );
    }

    #[test]
    fn test_heading_text_not_inline_parsed() {
        let blocks: Vec<Block> = format("## The **Bold** Drive").collect();
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 2,
                text: "The **Bold** Drive".into()
            }
        );
    }

    #[test]
    fn test_unsupported_markdown_is_paragraph() {
        let blocks: Vec<Block> = format("# Top\n- dash item\n#### deep\n*not a list").collect();
        assert_eq!(blocks.len(), 4);
        assert!(blocks.iter().all(|b| matches!(b, Block::Paragraph(_))));
    }

    #[test]
    fn test_unclosed_emphasis_left_alone() {
        let blocks: Vec<Block> = format("a **b c").collect();
        assert_eq!(blocks[0], Block::Paragraph(vec![text("a **b c")]));
    }

    #[test]
    fn test_sequence_is_lazy_and_single_pass() {
        let mut blocks = format("## A\nb\nc");
        assert!(matches!(blocks.next(), Some(Block::Heading { .. })));
        assert_eq!(blocks.by_ref().count(), 2);
        assert!(blocks.next().is_none());
    }

    #[test]
    fn test_to_markdown_strips_emphasis() {
        let block = Block::List(vec![vec![strong("a"), text(" b")], vec![text("c")]]);
        assert_eq!(block.to_markdown(), "* a b\n* c");
    }

    #[test]
    fn test_render_html_escapes() {
        let html = render_html(format("## <T>\n* **x** & y\np"));
        assert!(html.contains("<h2>&lt;T&gt;</h2>"));
        assert!(html.contains("<li><strong class=\"accent\">x</strong> &amp; y</li>"));
        assert!(html.contains("<p>p</p>"));
    }

    #[test]
    fn test_render_plain() {
        let out = render_plain(format("## Ab\n* x\n**y** z"));
        assert_eq!(out, "Ab\n==\n\n  • x\n\ny z");
    }
}
