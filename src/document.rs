// ABOUTME: Document tree produced by the reStructuredText reader
// ABOUTME: Holds slides, their nodes and the presentation-level settings

use std::path::PathBuf;

/// An image reference. Options the author did not give stay unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    pub uri: String,
    pub format: Option<String>,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<f64>,
    pub align: Option<String>,
    pub classes: Vec<String>,
}

impl Image {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Title { level: usize, text: String },
    Paragraph(String),
    BulletList(Vec<String>),
    LiteralBlock(String),
    Math(String),
    Image(Image),
    Notes(Vec<Node>),
    /// A visible error marker in place of content that failed to build
    Error(String),
}

impl Node {
    pub fn contains_math(&self) -> bool {
        match self {
            Node::Math(_) => true,
            Node::Paragraph(text) => text.contains(":math:`"),
            Node::BulletList(items) => items.iter().any(|i| i.contains(":math:`")),
            Node::Notes(nodes) => nodes.iter().any(Node::contains_math),
            _ => false,
        }
    }

    /// Images referenced by this node, including those inside notes
    pub fn images(&self) -> Vec<&Image> {
        match self {
            Node::Image(image) => vec![image],
            Node::Notes(nodes) => nodes.iter().flat_map(Node::images).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slide {
    /// Attributes from the slide's leading field list, in source order
    pub attributes: Vec<(String, String)>,
    pub nodes: Vec<Node>,
}

impl Slide {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Presentation-level settings from the document's leading field list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentSettings {
    pub title: Option<String>,
    pub css: Vec<String>,
    pub js_body: Vec<String>,
    pub auto_console: bool,
    pub skip_help: bool,
    pub slide_numbers: bool,
    /// Fields with no dedicated meaning, passed through to the root element
    pub extra: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub source: PathBuf,
    pub settings: DocumentSettings,
    pub slides: Vec<Slide>,
}

impl Document {
    /// Title from the settings, falling back to the first section title
    pub fn title(&self) -> String {
        if let Some(title) = &self.settings.title {
            return title.clone();
        }
        self.slides
            .iter()
            .flat_map(|s| s.nodes.iter())
            .find_map(|n| match n {
                Node::Title { text, .. } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "Presentation".to_string())
    }

    pub fn has_math(&self) -> bool {
        self.slides
            .iter()
            .flat_map(|s| s.nodes.iter())
            .any(Node::contains_math)
    }

    pub fn images(&self) -> Vec<&Image> {
        self.slides
            .iter()
            .flat_map(|s| s.nodes.iter())
            .flat_map(Node::images)
            .collect()
    }
}
