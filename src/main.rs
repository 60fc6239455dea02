// ABOUTME: Main entry point for the bildumilo program.
// ABOUTME: Provides the CLI interface and maps library errors to exit statuses.

use anyhow::Context;
use bildumilo::{Args, BildumiloError, Config};
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::from_env();
    let config = Config::from_env().context("Invalid configuration")?;

    match bildumilo::run(&args, &config) {
        Ok(()) => Ok(()),
        Err(BildumiloError::PresentationNotFound(path)) => {
            println!("File or folder '{}' does not exist.", path.display());
            std::process::exit(-1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
