// ABOUTME: Presentation source resolution for bildumilo
// ABOUTME: Turns command-line paths into absolute source and target locations

use crate::args::Args;
use crate::config::Config;
use crate::errors::{BildumiloError, Result};
use crate::generate::PresentationOptions;
use crate::template::Template;
use crate::utils;
use log::debug;
use std::path::{Path, PathBuf};

/// Source file looked up when the presentation argument is a directory
pub const DIRECTORY_INDEX: &str = "index.rst";

/// The input presentation, resolved once from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationSource {
    /// Absolute path of the reStructuredText file
    pub file: PathBuf,
}

impl PresentationSource {
    /// Resolve the presentation argument. Fails with `PresentationNotFound`
    /// carrying the path as the user gave it.
    pub fn resolve(presentation: &Path) -> Result<Self> {
        let absolute = utils::absolutize(presentation)?;
        if !absolute.exists() {
            return Err(BildumiloError::PresentationNotFound(presentation.to_path_buf()));
        }
        let file = if absolute.is_dir() {
            let index = absolute.join(DIRECTORY_INDEX);
            if !index.is_file() {
                return Err(BildumiloError::ValidationError(format!(
                    "Directory {:?} has no {}",
                    presentation, DIRECTORY_INDEX
                )));
            }
            index
        } else {
            absolute
        };
        debug!("Presentation source resolved to {:?}", file);
        Ok(Self { file })
    }

    /// Directory served in live mode: next to the source, named after it.
    /// `/tmp/x/deck.rst` gives `/tmp/x/deck`.
    pub fn default_target_dir(&self) -> Result<PathBuf> {
        let dir = self.file.parent().ok_or_else(|| {
            BildumiloError::ValidationError(format!("Source has no parent directory: {:?}", self.file))
        })?;
        Ok(dir.join(utils::file_stem(&self.file)?))
    }

    /// Build generation options from the command line. Every path is made
    /// absolute here because serving changes the working directory.
    pub fn options(&self, args: &Args, config: &Config, targetdir: &Path) -> Result<PresentationOptions> {
        let mut options = PresentationOptions::new(self.file.clone(), utils::absolutize(targetdir)?, config);

        options.template = match &args.template {
            Some(name) if !Template::is_builtin_name(name) => {
                Some(utils::absolutize(Path::new(name))?.to_string_lossy().into_owned())
            }
            other => other.clone(),
        };
        options.css = args.css.as_deref().map(utils::absolutize).transpose()?;
        options.js = args.js.as_deref().map(utils::absolutize).transpose()?;
        options.auto_console = args.auto_console;
        options.skip_help = args.skip_help;
        options.skip_notes = args.skip_notes;
        options.slide_numbers = args.slide_numbers;
        if let Some(mathjax) = &args.mathjax {
            options.mathjax = mathjax.clone();
        }
        if let Some(movement) = args.default_movement {
            options.default_movement = movement;
        }
        options.pdf_output_path = args
            .pdf_output_path
            .as_deref()
            .map(utils::absolutize)
            .transpose()?;
        Ok(options)
    }
}
