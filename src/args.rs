// ABOUTME: Command-line argument definitions for bildumilo
// ABOUTME: Declares the clap parser and normalizes legacy single-dash options

use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

pub const DEFAULT_PORT: &str = "0.0.0.0:8000";

/// Create impress.js presentations with reStructuredText
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bildumilo",
    version,
    about = "Create impress.js presentations with reStructuredText",
    disable_version_flag = true
)]
pub struct Args {
    /// The path to the reStructuredText presentation file.
    #[arg(value_name = "PRESENTATION")]
    pub presentation: PathBuf,

    /// The directory where the presentation is saved. Will be created if it
    /// does not exist. Without a targetdir a webserver is started instead and
    /// the presentation is served from that server.
    #[arg(value_name = "TARGETDIR")]
    pub targetdir: Option<PathBuf>,

    /// Specify a template: a .html file, a directory holding template.html,
    /// or one of the built-in names `default` and `simple`.
    #[arg(short, long)]
    pub template: Option<String>,

    /// An additional css file for the presentation to use.
    #[arg(short, long)]
    pub css: Option<PathBuf>,

    /// An additional javascript file for the presentation to use, added as a
    /// body script.
    #[arg(short, long)]
    pub js: Option<PathBuf>,

    /// Open the presenter console automatically.
    #[arg(short, long)]
    pub auto_console: bool,

    /// Do not show the initial help popup.
    #[arg(short, long)]
    pub skip_help: bool,

    /// Do not include presenter notes in the output.
    #[arg(short = 'n', long)]
    pub skip_notes: bool,

    /// The address and port that the server uses. Ex 8080 or 127.0.0.1:9000.
    #[arg(short, long, default_value = DEFAULT_PORT)]
    pub port: String,

    /// The URL to the mathjax library. Defaults to $HOVERCRAFT_MATHJAX or a
    /// CDN copy; only used when the document contains math.
    #[arg(long)]
    pub mathjax: Option<String>,

    /// Show slide numbers during the presentation.
    #[arg(short = 'N', long)]
    pub slide_numbers: bool,

    /// The default distance in pixels to move right between slides.
    #[arg(short, long, allow_negative_numbers = true)]
    pub default_movement: Option<i64>,

    /// Path to the output PDF file
    #[arg(long = "pdf", value_name = "PDF")]
    pub pdf_output_path: Option<PathBuf>,

    /// Display version and exit.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

impl Args {
    /// Parse the process arguments
    pub fn from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Parse an explicit argument list, the first item being the program name
    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

/// Rewrite the single-dash `-pdf` option to `--pdf`.
///
/// clap only knows single-character short options, so `-pdf` would
/// otherwise be read as `-p df`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if arg == "-pdf" {
                OsString::from("--pdf")
            } else if let Some(value) = arg.to_str().and_then(|s| s.strip_prefix("-pdf=")) {
                OsString::from(format!("--pdf={}", value))
            } else {
                arg
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["bildumilo"];
        argv.extend_from_slice(args);
        Args::try_from_iter(argv).expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["deck.rst"]);
        assert_eq!(args.presentation, PathBuf::from("deck.rst"));
        assert!(args.targetdir.is_none());
        assert_eq!(args.port, DEFAULT_PORT);
        assert!(args.mathjax.is_none());
        assert!(!args.auto_console && !args.skip_help && !args.skip_notes);
        assert!(!args.slide_numbers);
        assert!(args.pdf_output_path.is_none());
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&[
            "deck.rst", "out", "-a", "-s", "-n", "-N", "-p", "8080", "-t", "simple", "-d", "800",
        ]);
        assert_eq!(args.targetdir, Some(PathBuf::from("out")));
        assert!(args.auto_console && args.skip_help && args.skip_notes && args.slide_numbers);
        assert_eq!(args.port, "8080");
        assert_eq!(args.template.as_deref(), Some("simple"));
        assert_eq!(args.default_movement, Some(800));
    }

    #[test]
    fn test_single_dash_pdf() {
        let args = parse(&["deck.rst", "-pdf", "deck.pdf"]);
        assert_eq!(args.pdf_output_path, Some(PathBuf::from("deck.pdf")));
        assert_eq!(args.port, DEFAULT_PORT);

        let args = parse(&["deck.rst", "--pdf", "other.pdf"]);
        assert_eq!(args.pdf_output_path, Some(PathBuf::from("other.pdf")));
    }

    #[test]
    fn test_version_flag_exits() {
        let err = Args::try_from_iter(["bildumilo", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_presentation_is_required() {
        assert!(Args::try_from_iter(["bildumilo"]).is_err());
    }
}
