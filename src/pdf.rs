// ABOUTME: PDF export module for the bildumilo application
// ABOUTME: Prints a freshly generated presentation to PDF using a headless browser

use crate::config::Config;
use crate::errors::{BildumiloError, Result};
use crate::generate::{Generator, PresentationOptions, INDEX_FILE};
use crate::utils;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Generate the presentation into a scratch directory and print it to the
/// PDF path named in the options
pub fn generate_pdf<G: Generator + ?Sized>(
    generator: &G,
    options: &PresentationOptions,
    config: &Config,
) -> Result<()> {
    let output = options.pdf_output_path.clone().ok_or_else(|| {
        BildumiloError::ValidationError("No PDF output path given".to_string())
    })?;
    let output = utils::absolutize(&output)?;
    info!("Exporting {:?} to PDF {:?}", options.presentation, output);

    let staging = tempfile::Builder::new().prefix("bildumilo-pdf").tempdir()?;
    let mut staged = options.clone();
    staged.targetdir = staging.path().to_path_buf();
    generator.generate(&staged)?;

    let pdf = print_to_pdf(&staging.path().join(INDEX_FILE), config)?;

    utils::ensure_parent_directory_exists(&output)?;
    fs::write(&output, pdf)?;
    println!("PDF written to {}", output.display());
    Ok(())
}

fn browser_error(context: &str, err: anyhow::Error) -> BildumiloError {
    warn!("{}: {}", context, err);
    BildumiloError::BrowserError {
        message: format!("{}: {}", context, err),
        source: Some(err.into()),
    }
}

fn print_to_pdf(html_path: &Path, config: &Config) -> Result<Vec<u8>> {
    let mut launch_options_builder = LaunchOptionsBuilder::default();
    launch_options_builder.headless(true);
    launch_options_builder.idle_browser_timeout(Duration::from_millis(config.pdf_timeout_ms));
    if let Some(browser_path) = &config.browser_path {
        launch_options_builder.path(Some(browser_path.into()));
    }

    let launch_options = launch_options_builder
        .build()
        .map_err(|e| BildumiloError::BrowserError {
            message: format!("Failed to build browser options: {}", e),
            source: None,
        })?;

    info!("Launching headless browser");
    let browser = Browser::new(launch_options)
        .map_err(|e| browser_error("Failed to launch browser", e))?;

    let html_path_abs = fs::canonicalize(html_path)?;
    let url = format!("file://{}", html_path_abs.to_string_lossy());
    info!("Opening page at URL: {}", url);

    let tab = browser
        .new_tab()
        .map_err(|e| browser_error("Failed to create new tab", e))?;
    tab.set_default_timeout(Duration::from_millis(config.pdf_timeout_ms));

    tab.navigate_to(&url)
        .map_err(|e| browser_error("Failed to navigate to HTML", e))?;
    tab.wait_until_navigated()
        .map_err(|e| browser_error("Navigation failed", e))?;

    let start_time = Instant::now();
    let pdf_options = PrintToPdfOptions {
        landscape: Some(true),
        print_background: Some(true),
        ..Default::default()
    };
    let pdf = tab
        .print_to_pdf(Some(pdf_options))
        .map_err(|e| browser_error("Failed to print PDF", e))?;

    info!(
        "Printed {} bytes of PDF in {:.2} seconds",
        pdf.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::MonitorList;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct RecordingGenerator {
        targets: Mutex<Vec<PathBuf>>,
    }

    impl Generator for RecordingGenerator {
        fn generate(&self, options: &PresentationOptions) -> Result<MonitorList> {
            self.targets.lock().push(options.targetdir.clone());
            Err(BildumiloError::GenerateError("stop here".to_string()))
        }

        fn generate_pdf(&self, _options: &PresentationOptions) -> Result<()> {
            unreachable!("not used by the export path")
        }
    }

    #[test]
    fn test_pdf_export_requires_output_path() {
        let generator = RecordingGenerator {
            targets: Mutex::new(Vec::new()),
        };
        let options = PresentationOptions::new("/tmp/deck.rst", "/tmp/deck", &Config::default());
        let err = generate_pdf(&generator, &options, &Config::default()).unwrap_err();
        assert!(matches!(err, BildumiloError::ValidationError(_)));
        assert!(generator.targets.lock().is_empty());
    }

    #[test]
    fn test_pdf_export_generates_into_scratch_dir() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let generator = RecordingGenerator {
            targets: Mutex::new(Vec::new()),
        };
        let mut options = PresentationOptions::new(
            temp.path().join("deck.rst"),
            temp.path().join("deck"),
            &Config::default(),
        );
        options.pdf_output_path = Some(temp.path().join("deck.pdf"));

        assert!(generate_pdf(&generator, &options, &Config::default()).is_err());
        let targets = generator.targets.lock();
        assert_eq!(targets.len(), 1);
        assert_ne!(targets[0], options.targetdir);
        assert!(!temp.path().join("deck.pdf").exists());
    }
}
