// ABOUTME: Minimal reStructuredText reader for presentations
// ABOUTME: Splits the source into slides and dispatches directives into document nodes

use crate::diagram::{DiagramContext, ImageOptions, DIAGRAM_DIRECTIVE};
use crate::document::{Document, DocumentSettings, Image, Node, Slide};
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+([A-Za-z0-9_-]+)::\s*(.*)$").expect("valid regex"));

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([^:\s][^:]*):(?:\s+(.*))?$").expect("valid regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*+])(?:\s+(.*))?$").expect("valid regex"));

/// Punctuation characters allowed in section adornments and transitions
const ADORNMENT_CHARS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// A parsed directive occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBlock {
    pub name: String,
    pub argument: String,
    pub options: Vec<(String, String)>,
    pub content: Vec<String>,
}

impl DirectiveBlock {
    pub fn content_text(&self) -> String {
        self.content.join("\n")
    }
}

#[derive(Debug)]
enum Block {
    Transition,
    Fields(Vec<(String, String)>),
    Node(Node),
}

/// Reads one source document. Diagram directives render through the
/// supplied context, which outlives the reader so callers can inspect what
/// was rendered.
pub struct Reader<'a> {
    source: PathBuf,
    diagrams: &'a mut DiagramContext,
    title_styles: Vec<(char, bool)>,
}

impl<'a> Reader<'a> {
    pub fn new(source: &Path, diagrams: &'a mut DiagramContext) -> Self {
        Self {
            source: source.to_path_buf(),
            diagrams,
            title_styles: Vec::new(),
        }
    }

    /// Build the document tree. Content problems become error nodes; the
    /// read itself never fails.
    pub fn read(&mut self, text: &str) -> Document {
        let lines: Vec<String> = text
            .lines()
            .map(|l| l.replace('\t', "        ").trim_end().to_string())
            .collect();
        let blocks = self.blocks(&lines);

        let mut document = Document {
            source: self.source.clone(),
            ..Document::default()
        };
        let mut slide = Slide::default();
        let mut at_document_start = true;

        for block in blocks {
            match block {
                Block::Transition => {
                    document.slides.push(std::mem::take(&mut slide));
                    at_document_start = false;
                }
                Block::Fields(fields) if at_document_start && slide.nodes.is_empty() => {
                    apply_settings(&mut document.settings, fields);
                }
                Block::Fields(fields) if slide.nodes.is_empty() => {
                    slide.attributes.extend(fields);
                }
                Block::Fields(fields) => {
                    slide.nodes.push(Node::Paragraph(
                        fields
                            .iter()
                            .map(|(k, v)| format!("{}: {}", k, v))
                            .collect::<Vec<_>>()
                            .join(" "),
                    ));
                }
                Block::Node(node) => slide.nodes.push(node),
            }
        }
        if !slide.nodes.is_empty() || !slide.attributes.is_empty() || document.slides.is_empty() {
            document.slides.push(slide);
        }

        debug!("Read {} slides from {:?}", document.slides.len(), self.source);
        document
    }

    fn blocks(&mut self, lines: &[String]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];
            if line.is_empty() {
                i += 1;
                continue;
            }

            // Overlined title
            if let Some(c) = adornment_char(line) {
                if i + 2 < lines.len()
                    && !lines[i + 1].trim().is_empty()
                    && adornment_char(&lines[i + 2]) == Some(c)
                {
                    let level = self.title_level(c, true);
                    blocks.push(Block::Node(Node::Title {
                        level,
                        text: lines[i + 1].trim().to_string(),
                    }));
                    i += 3;
                    continue;
                }
                if line.len() >= 4 && next_is_blank(lines, i) {
                    blocks.push(Block::Transition);
                    i += 1;
                    continue;
                }
            }

            // Underlined title
            if !is_indented(line) && i + 1 < lines.len() {
                if let Some(c) = adornment_char(&lines[i + 1]) {
                    if lines[i + 1].chars().count() >= line.trim().chars().count() {
                        let level = self.title_level(c, false);
                        blocks.push(Block::Node(Node::Title {
                            level,
                            text: line.trim().to_string(),
                        }));
                        i += 2;
                        continue;
                    }
                }
            }

            if let Some(caps) = DIRECTIVE.captures(line) {
                let name = caps[1].to_lowercase();
                let argument = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
                let (body, next) = indented_block(lines, i + 1);
                let (options, content) = split_options(&body);
                let directive = DirectiveBlock {
                    name,
                    argument,
                    options,
                    content,
                };
                blocks.push(Block::Node(self.directive(&directive)));
                i = next;
                continue;
            }

            if line.starts_with("..") {
                // Comment
                let (_, next) = indented_block(lines, i + 1);
                i = next;
                continue;
            }

            if FIELD.is_match(line) && !is_indented(line) {
                let mut fields = Vec::new();
                while i < lines.len() {
                    let Some(caps) = FIELD.captures(&lines[i]) else {
                        break;
                    };
                    let mut value = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
                    let (continuation, next) = indented_block(lines, i + 1);
                    for extra in continuation.iter().filter(|l| !l.is_empty()) {
                        value.push(' ');
                        value.push_str(extra.trim());
                    }
                    fields.push((caps[1].trim().to_string(), value));
                    i = next;
                }
                blocks.push(Block::Fields(fields));
                continue;
            }

            if BULLET.is_match(line) {
                let (items, next) = bullet_list(lines, i);
                blocks.push(Block::Node(Node::BulletList(items)));
                i = next;
                continue;
            }

            if is_indented(line) {
                let (body, next) = indented_block(lines, i);
                blocks.push(Block::Node(Node::Paragraph(join_lines(&body))));
                i = next;
                continue;
            }

            // Paragraph, possibly introducing a literal block
            let start = i;
            while i < lines.len() && !lines[i].is_empty() {
                i += 1;
            }
            let mut text = join_lines(&lines[start..i]);
            let literal = text.ends_with("::");
            if literal {
                text.truncate(text.len() - 1);
                if text == ":" {
                    text.clear();
                } else if text.ends_with(" :") {
                    text.truncate(text.len() - 2);
                }
            }
            if !text.is_empty() {
                blocks.push(Block::Node(Node::Paragraph(text)));
            }
            if literal {
                let (body, next) = indented_block(lines, i);
                if !body.is_empty() {
                    blocks.push(Block::Node(Node::LiteralBlock(body.join("\n"))));
                }
                i = next;
            }
        }

        blocks
    }

    fn directive(&mut self, directive: &DirectiveBlock) -> Node {
        match directive.name.as_str() {
            DIAGRAM_DIRECTIVE => {
                let code = directive.content_text();
                self.diagrams.run(&self.source, &code, &directive.options)
            }
            "image" | "figure" => match ImageOptions::parse(&directive.options) {
                Ok(options) => {
                    let mut image = Image::new(directive.argument.clone());
                    options.apply(&mut image);
                    Node::Image(image)
                }
                Err(e) => Node::Error(format!("Error in \"{}\" directive: {}", directive.name, e)),
            },
            "note" | "notes" => {
                let blocks = self.blocks(&directive.content);
                Node::Notes(
                    blocks
                        .into_iter()
                        .filter_map(|b| match b {
                            Block::Node(node) => Some(node),
                            _ => None,
                        })
                        .collect(),
                )
            }
            "math" => {
                let mut text = directive.argument.clone();
                if !directive.content.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&directive.content_text());
                }
                Node::Math(text)
            }
            "code" | "code-block" | "sourcecode" => Node::LiteralBlock(directive.content_text()),
            other => {
                warn!("Unknown directive {:?} in {:?}", other, self.source);
                Node::Error(format!("Unknown directive type \"{}\".", other))
            }
        }
    }

    /// Section levels follow the order in which adornment styles first appear
    fn title_level(&mut self, c: char, overline: bool) -> usize {
        let style = (c, overline);
        match self.title_styles.iter().position(|s| *s == style) {
            Some(index) => index + 1,
            None => {
                self.title_styles.push(style);
                self.title_styles.len()
            }
        }
    }
}

fn apply_settings(settings: &mut DocumentSettings, fields: Vec<(String, String)>) {
    for (name, value) in fields {
        match name.as_str() {
            "title" => settings.title = Some(value),
            "css" => settings.css.extend(value.split_whitespace().map(str::to_string)),
            "js-body" | "js" => settings
                .js_body
                .extend(value.split_whitespace().map(str::to_string)),
            "auto-console" => settings.auto_console = is_true(&value),
            "skip-help" => settings.skip_help = is_true(&value),
            "slide-numbers" => settings.slide_numbers = is_true(&value),
            _ => settings.extra.push((name, value)),
        }
    }
}

fn is_true(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "on" | "1")
}

fn adornment_char(line: &str) -> Option<char> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !ADORNMENT_CHARS.contains(first) || line.chars().count() < 2 {
        return None;
    }
    chars.all(|c| c == first).then_some(first)
}

fn next_is_blank(lines: &[String], i: usize) -> bool {
    lines.get(i + 1).map_or(true, |l| l.trim().is_empty())
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ')
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ').count()
}

fn join_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collect the indented block starting at `start`, dedented, with trailing
/// blank lines removed. Returns the block and the index after it.
fn indented_block(lines: &[String], start: usize) -> (Vec<String>, usize) {
    let mut end = start;
    while end < lines.len() && (lines[end].is_empty() || is_indented(&lines[end])) {
        end += 1;
    }
    let mut block = &lines[start..end];
    while let Some((last, rest)) = block.split_last() {
        if last.is_empty() {
            block = rest;
        } else {
            break;
        }
    }
    while let Some((first, rest)) = block.split_first() {
        if first.is_empty() {
            block = rest;
        } else {
            break;
        }
    }
    let indent = block
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| leading_spaces(l))
        .min()
        .unwrap_or(0);
    // Every non-blank line starts with at least `indent` ASCII spaces
    let dedented = block
        .iter()
        .map(|l| l.get(indent..).unwrap_or_default().to_string())
        .collect();
    // Give back trailing blanks so the caller resumes after them
    (dedented, end)
}

/// Split a directive body into its leading option list and the content
fn split_options(body: &[String]) -> (Vec<(String, String)>, Vec<String>) {
    let mut options = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let Some(caps) = FIELD.captures(&body[i]) else {
            break;
        };
        options.push((
            caps[1].trim().to_string(),
            caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
        ));
        i += 1;
    }
    while i < body.len() && body[i].is_empty() {
        i += 1;
    }
    (options, body[i..].to_vec())
}

fn bullet_list(lines: &[String], start: usize) -> (Vec<String>, usize) {
    let mut items = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let Some(caps) = BULLET.captures(&lines[i]) else {
            break;
        };
        let mut item = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
        let (continuation, next) = indented_block(lines, i + 1);
        for extra in continuation.iter().filter(|l| !l.is_empty()) {
            item.push(' ');
            item.push_str(extra.trim());
        }
        items.push(item);
        i = next;
    }
    (items, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::GraphRenderer;
    use crate::errors::Result;
    use std::fs;
    use tempfile::TempDir;

    struct FakeRenderer;

    impl GraphRenderer for FakeRenderer {
        fn render(&self, source: &str, output: &Path) -> Result<()> {
            fs::write(output, source)?;
            Ok(())
        }
    }

    fn read(text: &str) -> Document {
        let mut diagrams = DiagramContext::new(Box::new(FakeRenderer));
        Reader::new(Path::new("/nonexistent/deck.rst"), &mut diagrams).read(text)
    }

    #[test]
    fn test_transitions_split_slides() {
        let doc = read("First\n=====\n\nHello\n\n----\n\nSecond\n======\n\n----\n\nThird\n");
        assert_eq!(doc.slides.len(), 3);
        assert_eq!(
            doc.slides[0].nodes,
            vec![
                Node::Title {
                    level: 1,
                    text: "First".to_string()
                },
                Node::Paragraph("Hello".to_string())
            ]
        );
        assert_eq!(doc.slides[2].nodes, vec![Node::Paragraph("Third".to_string())]);
    }

    #[test]
    fn test_title_levels_follow_first_appearance() {
        let doc = read("=====\nTop\n=====\n\nSub\n---\n\nOther\n=====\n");
        let levels: Vec<usize> = doc.slides[0]
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Title { level, .. } => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 3]);
    }

    #[test]
    fn test_document_fields_and_slide_attributes() {
        let doc = read(
            ":title: My talk\n:css: a.css b.css\n:auto-console: true\n\nIntro\n\n----\n\n:data-x: 3000\n:id: second\n\nBody\n",
        );
        assert_eq!(doc.settings.title.as_deref(), Some("My talk"));
        assert_eq!(doc.settings.css, vec!["a.css", "b.css"]);
        assert!(doc.settings.auto_console);
        assert_eq!(doc.slides[1].attribute("data-x"), Some("3000"));
        assert_eq!(doc.slides[1].attribute("id"), Some("second"));
        assert_eq!(doc.title(), "My talk");
    }

    #[test]
    fn test_bullets_literal_and_notes() {
        let doc = read(
            "- one\n- two\n  continued\n\nExample::\n\n    let x = 1;\n    x + 1\n\n.. note::\n\n    Say something *nice*.\n",
        );
        let nodes = &doc.slides[0].nodes;
        assert_eq!(
            nodes[0],
            Node::BulletList(vec!["one".to_string(), "two continued".to_string()])
        );
        assert_eq!(nodes[1], Node::Paragraph("Example:".to_string()));
        assert_eq!(nodes[2], Node::LiteralBlock("let x = 1;\nx + 1".to_string()));
        assert_eq!(
            nodes[3],
            Node::Notes(vec![Node::Paragraph("Say something *nice*.".to_string())])
        );
    }

    #[test]
    fn test_image_directive_options() {
        let doc = read(".. image:: images/cat.png\n    :alt: A cat\n    :width: 200\n");
        let Node::Image(image) = &doc.slides[0].nodes[0] else {
            panic!("expected image");
        };
        assert_eq!(image.uri, "images/cat.png");
        assert_eq!(image.alt.as_deref(), Some("A cat"));
        assert_eq!(image.width, Some(200));
        assert!(image.height.is_none());
    }

    #[test]
    fn test_unknown_directive_does_not_abort() {
        let doc = read(".. frobnicate:: x\n\nStill here\n");
        assert!(matches!(doc.slides[0].nodes[0], Node::Error(_)));
        assert_eq!(doc.slides[0].nodes[1], Node::Paragraph("Still here".to_string()));
    }

    #[test]
    fn test_multibyte_leading_whitespace_in_block() {
        let doc = read(".. note::\n\n   a\n  \u{3000}b\n\nAfter\n");
        assert_eq!(
            doc.slides[0].nodes,
            vec![
                Node::Notes(vec![
                    Node::Paragraph("a".to_string()),
                    Node::Paragraph("b".to_string())
                ]),
                Node::Paragraph("After".to_string())
            ]
        );
    }

    #[test]
    fn test_diagram_directive_reads_options_and_content() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source = temp.path().join("talk.rst");
        let mut diagrams = DiagramContext::new(Box::new(FakeRenderer));
        let doc = Reader::new(&source, &mut diagrams).read(
            ".. yographviz::\n    :alt: flow\n\n    digraph {\n        a -> b\n    }\n\n----\n\n.. yographviz::\n\n    graph { c }\n",
        );

        let Node::Image(first) = &doc.slides[0].nodes[0] else {
            panic!("expected image");
        };
        let Node::Image(second) = &doc.slides[1].nodes[0] else {
            panic!("expected image");
        };
        assert_eq!(first.uri, "talk/img/graph_1.png");
        assert_eq!(first.alt.as_deref(), Some("flow"));
        assert_eq!(second.uri, "talk/img/graph_2.png");
        assert_eq!(
            fs::read_to_string(&diagrams.rendered()[0]).unwrap(),
            "digraph {\n    a -> b\n}"
        );
    }

    #[test]
    fn test_math_detection() {
        assert!(read(".. math::\n\n    e = mc^2\n").has_math());
        assert!(read("Inline :math:`x^2` here\n").has_math());
        assert!(!read("Plain text\n").has_math());
    }
}
