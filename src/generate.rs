// ABOUTME: Presentation generation pipeline for bildumilo
// ABOUTME: Reads the source, renders slides into the target directory and reports dependencies

use crate::config::Config;
use crate::diagram::{DiagramContext, Graphviz};
use crate::errors::{BildumiloError, Result};
use crate::html::{self, HtmlSettings};
use crate::pdf;
use crate::resources::{ResourceFile, ResourceKind};
use crate::rst::Reader;
use crate::template::Template;
use crate::utils;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Absolute paths a generation pass depends on, in discovery order
pub type MonitorList = Vec<PathBuf>;

/// Name of the generated entry page
pub const INDEX_FILE: &str = "index.html";

/// Everything a generation pass needs to know, resolved from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationOptions {
    /// Absolute path of the reStructuredText source
    pub presentation: PathBuf,
    pub targetdir: PathBuf,
    pub template: Option<String>,
    pub css: Option<PathBuf>,
    pub js: Option<PathBuf>,
    pub auto_console: bool,
    pub skip_help: bool,
    pub skip_notes: bool,
    pub slide_numbers: bool,
    pub mathjax: String,
    pub default_movement: i64,
    pub pdf_output_path: Option<PathBuf>,
}

impl PresentationOptions {
    /// Options with defaults for everything but the source and target
    pub fn new(presentation: impl Into<PathBuf>, targetdir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            presentation: presentation.into(),
            targetdir: targetdir.into(),
            template: None,
            css: None,
            js: None,
            auto_console: false,
            skip_help: false,
            skip_notes: false,
            slide_numbers: false,
            mathjax: config.mathjax_url.clone(),
            default_movement: config.default_movement,
            pdf_output_path: None,
        }
    }

    fn html_settings(&self) -> HtmlSettings {
        HtmlSettings {
            skip_notes: self.skip_notes,
            auto_console: self.auto_console,
            skip_help: self.skip_help,
            slide_numbers: self.slide_numbers,
            default_movement: self.default_movement,
            mathjax_url: self.mathjax.clone(),
        }
    }
}

/// Builds presentations. Calls are synchronous and may be slow.
pub trait Generator: Send + Sync {
    /// Build the presentation into `options.targetdir` and return the files
    /// the next staleness check should watch
    fn generate(&self, options: &PresentationOptions) -> Result<MonitorList>;

    /// Build the presentation and print it to `options.pdf_output_path`
    fn generate_pdf(&self, options: &PresentationOptions) -> Result<()>;
}

/// The standard generator: reStructuredText in, HTML slides out
pub struct SlideGenerator {
    config: Config,
}

impl SlideGenerator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Generator for SlideGenerator {
    fn generate(&self, options: &PresentationOptions) -> Result<MonitorList> {
        let source = &options.presentation;
        info!("Generating presentation from {:?}", source);

        let text = fs::read_to_string(source)?;
        let source_dir = source
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| BildumiloError::GenerateError(format!("Source has no directory: {:?}", source)))?;

        let mut diagrams = DiagramContext::new(Box::new(Graphviz::new(self.config.dot_command.clone())));
        let document = Reader::new(source, &mut diagrams).read(&text);
        let template = Template::resolve(options.template.as_deref())?;

        let css: Vec<ResourceFile> = document
            .settings
            .css
            .iter()
            .map(|p| ResourceFile::new(p, ResourceKind::Css).resolved_against(&source_dir))
            .chain(
                options
                    .css
                    .iter()
                    .map(|p| ResourceFile::new(&p.to_string_lossy(), ResourceKind::Css)),
            )
            .collect();
        let js: Vec<ResourceFile> = document
            .settings
            .js_body
            .iter()
            .map(|p| ResourceFile::new(p, ResourceKind::Js).resolved_against(&source_dir))
            .chain(
                options
                    .js
                    .iter()
                    .map(|p| ResourceFile::new(&p.to_string_lossy(), ResourceKind::Js)),
            )
            .collect();

        utils::ensure_directory_exists(&options.targetdir)?;
        for resource in css.iter().chain(js.iter()) {
            resource.install(&options.targetdir)?;
        }
        template.install_assets(&options.targetdir)?;

        let mut images = Vec::new();
        for image in document.images() {
            let Some(relative) = local_relative_uri(&image.uri) else {
                continue;
            };
            let image_path = source_dir.join(&relative);
            let copy = options.targetdir.join(&relative);
            if image_path.is_file() {
                utils::copy_file(&image_path, &copy)?;
            } else {
                warn!("Image {:?} referenced by {:?} does not exist", image_path, source);
            }
            images.push(image_path);
        }

        let html = html::render(
            &document,
            &template.html()?,
            &options.html_settings(),
            &css,
            &js,
        );
        let index = options.targetdir.join(INDEX_FILE);
        fs::write(&index, html)?;
        info!("Presentation written to {:?}", index);

        // Rendered diagrams are outputs, not dependencies
        let mut seen = diagrams
            .rendered()
            .iter()
            .map(|p| utils::absolutize(p))
            .collect::<Result<HashSet<PathBuf>>>()?;
        let mut candidates = vec![source.clone()];
        candidates.extend(template.dependencies()?);
        candidates.extend(css.iter().chain(js.iter()).filter_map(ResourceFile::local_path));
        candidates.extend(images);

        let mut monitor = MonitorList::new();
        for path in candidates {
            let path = utils::absolutize(&path)?;
            if seen.insert(path.clone()) {
                monitor.push(path);
            }
        }
        debug!("Monitoring {} files", monitor.len());
        Ok(monitor)
    }

    fn generate_pdf(&self, options: &PresentationOptions) -> Result<()> {
        pdf::generate_pdf(self, options, &self.config)
    }
}

/// Relative, local image references that stay inside the source directory
fn local_relative_uri(uri: &str) -> Option<PathBuf> {
    if uri.contains("://") || uri.starts_with("//") || uri.starts_with("data:") {
        return None;
    }
    let path = PathBuf::from(uri);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    (!escapes).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_relative_uri() {
        assert_eq!(local_relative_uri("img/a.png"), Some(PathBuf::from("img/a.png")));
        assert_eq!(local_relative_uri("https://x.org/a.png"), None);
        assert_eq!(local_relative_uri("../a.png"), None);
        assert_eq!(local_relative_uri("/abs/a.png"), None);
    }
}
