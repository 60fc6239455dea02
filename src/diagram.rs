// ABOUTME: Graphviz diagram directive for reStructuredText presentations
// ABOUTME: Renders embedded graph descriptions to PNG files and returns image nodes

use crate::document::{Image, Node};
use crate::errors::{BildumiloError, Result};
use crate::utils;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Name the directive is registered under in documents
pub const DIAGRAM_DIRECTIVE: &str = "yographviz";

/// Options shared by image-producing directives. Each stays `None` unless
/// the author gave it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageOptions {
    pub alt: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub scale: Option<f64>,
    pub align: Option<String>,
    pub classes: Option<Vec<String>>,
}

impl ImageOptions {
    /// Parse directive options, rejecting unknown names and malformed values
    pub fn parse(options: &[(String, String)]) -> Result<Self> {
        let mut parsed = Self::default();
        for (name, value) in options {
            let value = value.trim();
            match name.as_str() {
                "alt" => parsed.alt = Some(value.to_string()),
                "height" => parsed.height = Some(parse_number(name, value)?),
                "width" => parsed.width = Some(parse_number(name, value)?),
                "scale" => parsed.scale = Some(parse_number(name, value)?),
                "align" => parsed.align = Some(value.to_string()),
                "class" => {
                    parsed.classes = Some(value.split_whitespace().map(str::to_string).collect())
                }
                other => {
                    return Err(BildumiloError::ValidationError(format!(
                        "unknown option: \"{}\"",
                        other
                    )));
                }
            }
        }
        Ok(parsed)
    }

    /// Copy the options that were given onto an image node
    pub fn apply(&self, image: &mut Image) {
        if let Some(alt) = &self.alt {
            image.alt = Some(alt.clone());
        }
        if let Some(classes) = &self.classes {
            image.classes.extend(classes.iter().cloned());
        }
        if let Some(width) = self.width {
            image.width = Some(width);
        }
        if let Some(height) = self.height {
            image.height = Some(height);
        }
        if let Some(scale) = self.scale {
            image.scale = Some(scale);
        }
        if let Some(align) = &self.align {
            image.align = Some(align.clone());
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        BildumiloError::ValidationError(format!("invalid option value for {}: {:?} ({})", name, value, e))
    })
}

/// Rasterizes a graph description into an image file
pub trait GraphRenderer {
    fn render(&self, source: &str, output: &Path) -> Result<()>;
}

/// Renders through the Graphviz `dot` executable
pub struct Graphviz {
    command: String,
}

impl Graphviz {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for Graphviz {
    fn default() -> Self {
        Self::new("dot")
    }
}

impl GraphRenderer for Graphviz {
    fn render(&self, source: &str, output: &Path) -> Result<()> {
        let program = which::which(&self.command).map_err(|e| {
            BildumiloError::DiagramError(format!("`{}` not found, is Graphviz installed? ({})", self.command, e))
        })?;
        debug!("Running {:?} for {:?}", program, output);

        let mut child = Command::new(&program)
            .arg("-Tpng")
            .arg("-o")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }

        let result = child.wait_with_output()?;
        if !result.status.success() {
            return Err(BildumiloError::DiagramError(format!(
                "`{}` failed ({}): {}",
                self.command,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Per-conversion state for diagram directives.
///
/// The counter only ever grows, so every diagram rendered through one
/// context gets its own file name.
pub struct DiagramContext {
    counter: usize,
    renderer: Box<dyn GraphRenderer>,
    rendered: Vec<PathBuf>,
}

impl DiagramContext {
    pub fn new(renderer: Box<dyn GraphRenderer>) -> Self {
        Self {
            counter: 0,
            renderer,
            rendered: Vec::new(),
        }
    }

    /// Number of diagrams attempted so far
    pub fn count(&self) -> usize {
        self.counter
    }

    /// Image files written by successful renders
    pub fn rendered(&self) -> &[PathBuf] {
        &self.rendered
    }

    /// Run the directive for one occurrence. Never fails: problems come back
    /// as a single error node so the rest of the document still converts.
    pub fn run(&mut self, source_path: &Path, code: &str, options: &[(String, String)]) -> Node {
        match self.render_image(source_path, code, options) {
            Ok(image) => Node::Image(image),
            Err(e) => Node::Error(format!("Error generating Graphviz image: {}", e)),
        }
    }

    fn render_image(
        &mut self,
        source_path: &Path,
        code: &str,
        options: &[(String, String)],
    ) -> Result<Image> {
        let options = ImageOptions::parse(options)?;

        let source_path = utils::absolutize(source_path)?;
        let source_dir = source_path.parent().ok_or_else(|| {
            BildumiloError::ValidationError(format!("Source has no parent directory: {:?}", source_path))
        })?;
        let stem = utils::file_stem(&source_path)?;

        let graphs_dir = source_dir.join(stem).join("img");
        utils::ensure_directory_exists(&graphs_dir)?;

        self.counter += 1;
        let graph_path = graphs_dir.join(format!("graph_{}.png", self.counter));
        self.renderer.render(code, &graph_path)?;
        info!("Rendered diagram {:?}", graph_path);
        self.rendered.push(graph_path.clone());

        let relative = graph_path.strip_prefix(source_dir).map_err(|e| {
            BildumiloError::DiagramError(format!("Cannot make {:?} relative: {}", graph_path, e))
        })?;
        let uri = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let mut image = Image::new(uri);
        image.format = Some("png".to_string());
        options.apply(&mut image);
        Ok(image)
    }
}
