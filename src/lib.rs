// ABOUTME: Library module for the bildumilo program.
// ABOUTME: Contains generation, diagram rendering, file watching and serving of presentations.

pub mod address;
pub mod args;
pub mod config;
pub mod diagram;
pub mod document;
pub mod errors;
pub mod generate;
pub mod html;
pub mod pdf;
pub mod resources;
pub mod rst;
pub mod serve;
pub mod server;
pub mod source;
pub mod template;
pub mod utils;
pub mod watch;

// Reexport common types and functions
pub use address::ListenAddress;
pub use args::Args;
pub use config::Config;
pub use diagram::{DiagramContext, GraphRenderer, Graphviz};
pub use document::{Document, Image, Node, Slide};
pub use errors::{BildumiloError, Result};
pub use generate::{Generator, MonitorList, PresentationOptions, SlideGenerator};
pub use serve::{run, serve_presentation};
pub use server::PresentationServer;
pub use source::PresentationSource;
pub use watch::{generate_and_observe, ChangeDetector, RunSignal};
