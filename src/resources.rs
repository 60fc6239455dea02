// ABOUTME: Resource handling for the bildumilo application
// ABOUTME: Handles local and remote stylesheets and scripts used by a presentation

use crate::errors::{BildumiloError, Result};
use crate::utils;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Css,
    Js,
}

/// Represents a resource file that can be either local or remote.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFile {
    pub path: String,
    pub kind: ResourceKind,
    pub is_remote: bool,
}

impl ResourceFile {
    /// Create a new ResourceFile from a path string.
    /// The path can be either a local file path or a URL.
    pub fn new(path: &str, kind: ResourceKind) -> Self {
        let is_remote = path.starts_with("http://")
            || path.starts_with("https://")
            || path.starts_with("//");
        Self {
            path: path.to_string(),
            kind,
            is_remote,
        }
    }

    /// Resolve a local path against the directory of the document that named it
    pub fn resolved_against(mut self, base_dir: &Path) -> Self {
        if !self.is_remote && Path::new(&self.path).is_relative() {
            self.path = base_dir.join(&self.path).to_string_lossy().into_owned();
        }
        self
    }

    /// Local file backing this resource, if any
    pub fn local_path(&self) -> Option<PathBuf> {
        (!self.is_remote).then(|| PathBuf::from(&self.path))
    }

    /// Where the resource is referenced from inside the target directory
    pub fn href(&self) -> String {
        if self.is_remote {
            return self.path.clone();
        }
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }

    /// Copy a local resource into the target directory. Remote resources are
    /// linked where they are.
    pub fn install(&self, target_dir: &Path) -> Result<()> {
        let Some(local) = self.local_path() else {
            return Ok(());
        };
        if !local.is_file() {
            return Err(BildumiloError::ValidationError(format!(
                "Resource file not found: {:?}",
                local
            )));
        }
        info!("Copying resource {:?} into {:?}", local, target_dir);
        utils::copy_file(&local, &target_dir.join(self.href()))
    }

    /// Generate the HTML tag that references the resource
    pub fn tag(&self) -> String {
        match self.kind {
            ResourceKind::Css => format!(r#"<link rel="stylesheet" href="{}">"#, self.href()),
            ResourceKind::Js => format!(r#"<script src="{}"></script>"#, self.href()),
        }
    }
}
