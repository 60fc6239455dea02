// ABOUTME: Template selection for generated presentations
// ABOUTME: Resolves built-in or user templates and installs their asset files

use crate::errors::{BildumiloError, Result};
use crate::utils;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TEMPLATE: &str = include_str!("templates/default.html");
const SIMPLE_TEMPLATE: &str = include_str!("templates/simple.html");

/// File looked up inside a template directory
pub const TEMPLATE_FILE: &str = "template.html";

#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    Builtin { name: &'static str, html: &'static str },
    /// A user template: the HTML file and, for directory templates, the
    /// directory whose other files are copied alongside the output
    Custom { file: PathBuf, assets_dir: Option<PathBuf> },
}

impl Default for Template {
    fn default() -> Self {
        Template::Builtin {
            name: "default",
            html: DEFAULT_TEMPLATE,
        }
    }
}

impl Template {
    /// Whether a template argument names a built-in template rather than a path
    pub fn is_builtin_name(name: &str) -> bool {
        matches!(name, "default" | "simple")
    }

    pub fn resolve(name: Option<&str>) -> Result<Self> {
        let name = match name {
            None | Some("default") => return Ok(Self::default()),
            Some("simple") => {
                return Ok(Template::Builtin {
                    name: "simple",
                    html: SIMPLE_TEMPLATE,
                })
            }
            Some(name) => Path::new(name),
        };

        if name.is_dir() {
            let file = name.join(TEMPLATE_FILE);
            if !file.is_file() {
                return Err(BildumiloError::ValidationError(format!(
                    "Template directory {:?} has no {}",
                    name, TEMPLATE_FILE
                )));
            }
            Ok(Template::Custom {
                file,
                assets_dir: Some(name.to_path_buf()),
            })
        } else if name.is_file() {
            Ok(Template::Custom {
                file: name.to_path_buf(),
                assets_dir: None,
            })
        } else {
            Err(BildumiloError::ValidationError(format!(
                "Template not found: {:?}",
                name
            )))
        }
    }

    pub fn html(&self) -> Result<String> {
        match self {
            Template::Builtin { html, .. } => Ok((*html).to_string()),
            Template::Custom { file, .. } => Ok(fs::read_to_string(file)?),
        }
    }

    /// Asset files of a directory template, excluding the template itself
    fn assets(&self) -> Result<Vec<PathBuf>> {
        let Template::Custom {
            assets_dir: Some(dir),
            file,
        } = self
        else {
            return Ok(Vec::new());
        };

        let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
        let entries = glob::glob(&pattern)
            .map_err(|e| BildumiloError::ValidationError(format!("Invalid template path: {}", e)))?;
        let mut assets: Vec<PathBuf> = entries
            .flatten()
            .filter(|p| p.is_file() && p != file)
            .collect();
        assets.sort();
        Ok(assets)
    }

    /// Files a regeneration should be triggered by
    pub fn dependencies(&self) -> Result<Vec<PathBuf>> {
        match self {
            Template::Builtin { .. } => Ok(Vec::new()),
            Template::Custom { file, .. } => {
                let mut deps = vec![file.clone()];
                deps.extend(self.assets()?);
                Ok(deps)
            }
        }
    }

    /// Copy template assets into the target directory, keeping their layout
    pub fn install_assets(&self, target_dir: &Path) -> Result<()> {
        let Template::Custom {
            assets_dir: Some(dir),
            ..
        } = self
        else {
            return Ok(());
        };
        for asset in self.assets()? {
            // The target may live inside the template directory
            if asset.starts_with(target_dir) {
                continue;
            }
            let relative = asset.strip_prefix(dir).map_err(|e| {
                BildumiloError::ValidationError(format!("Template asset {:?}: {}", asset, e))
            })?;
            debug!("Installing template asset {:?}", relative);
            utils::copy_file(&asset, &target_dir.join(relative))?;
        }
        info!("Template assets installed into {:?}", target_dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_names() {
        assert_eq!(Template::resolve(None).unwrap(), Template::default());
        assert!(matches!(
            Template::resolve(Some("simple")).unwrap(),
            Template::Builtin { name: "simple", .. }
        ));
        assert!(Template::resolve(Some("default"))
            .unwrap()
            .html()
            .unwrap()
            .contains("{{slides}}"));
    }

    #[test]
    fn test_directory_template_with_assets() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = temp.path().join("theme");
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join(TEMPLATE_FILE), "<html>{{slides}}</html>").unwrap();
        fs::write(dir.join("css").join("theme.css"), "body {}").unwrap();

        let template = Template::resolve(Some(dir.to_str().unwrap())).unwrap();
        let deps = template.dependencies().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0], dir.join(TEMPLATE_FILE));

        let out = temp.path().join("out");
        template.install_assets(&out).unwrap();
        assert!(out.join("css").join("theme.css").is_file());
        assert!(!out.join(TEMPLATE_FILE).exists());
    }

    #[test]
    fn test_missing_template_is_an_error() {
        assert!(Template::resolve(Some("/no/such/template")).is_err());
    }
}
