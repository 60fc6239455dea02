// ABOUTME: Error types for the bildumilo application
// ABOUTME: Provides structured error handling for generation, watching and serving

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BildumiloError {
    #[error("I/O error: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("File or folder '{}' does not exist.", .0.display())]
    PresentationNotFound(PathBuf),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Diagram rendering error: {0}")]
    DiagramError(String),

    #[error("Generation error: {0}")]
    GenerateError(String),

    #[error("Headless browser error: {message}")]
    BrowserError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Can't bind to port {0}: No permission")]
    BindPermissionDenied(String),

    #[error("Can't bind to port {0}: port already in use")]
    AddressInUse(String),

    #[error("Can't bind to port {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BildumiloError {
    /// Bind failures that are reported to the user without failing the process.
    pub fn is_graceful_bind_failure(&self) -> bool {
        matches!(
            self,
            BildumiloError::BindPermissionDenied(_) | BildumiloError::AddressInUse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BildumiloError>;
