// ABOUTME: Orchestration of the three run modes: PDF export, one-shot build and live serving
// ABOUTME: Supervises the regeneration worker next to the HTTP server and coordinates shutdown

use crate::address::ListenAddress;
use crate::args::Args;
use crate::config::{self, Config};
use crate::errors::{BildumiloError, Result};
use crate::generate::{Generator, PresentationOptions, SlideGenerator};
use crate::server::PresentationServer;
use crate::source::PresentationSource;
use crate::utils;
use crate::watch::{generate_and_observe, RunSignal};
use log::{error, info, warn};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Run the command line: validate the input, then export, build or serve
pub fn run(args: &Args, config: &Config) -> Result<()> {
    if let Some(url) = &args.mathjax {
        config::validate_url(url)?;
    }
    let source = PresentationSource::resolve(&args.presentation)?;
    let generator = Arc::new(SlideGenerator::new(config.clone()));

    if args.pdf_output_path.is_some() {
        let options = source.options(args, config, &source.default_target_dir()?)?;
        return generator.generate_pdf(&options);
    }

    match &args.targetdir {
        Some(targetdir) => {
            let options = source.options(args, config, targetdir)?;
            utils::validate_directory_writable(&options.targetdir)?;
            generator.generate(&options)?;
            println!("Presentation generated in {}", options.targetdir.display());
            Ok(())
        }
        None => {
            let options = source.options(args, config, &source.default_target_dir()?)?;
            let address = ListenAddress::parse(&args.port)?;
            serve_presentation(generator, options, &address, config.poll_interval)
        }
    }
}

/// Serve the presentation from its target directory, regenerating it in the
/// background until the server is interrupted.
///
/// Permission and address-in-use bind failures are reported and end the
/// call successfully; other bind errors propagate.
pub fn serve_presentation<G: Generator + 'static>(
    generator: Arc<G>,
    options: PresentationOptions,
    address: &ListenAddress,
    poll_interval: Duration,
) -> Result<()> {
    utils::ensure_directory_exists(&options.targetdir)?;
    env::set_current_dir(&options.targetdir)?;

    let server = match PresentationServer::bind(address) {
        Ok(server) => server,
        Err(e) if e.is_graceful_bind_failure() => {
            println!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    println!("Serving HTTP on {} port {} ...", address.bind, address.port);

    let interrupted = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(&server, Arc::clone(&interrupted));

    let signal = RunSignal::new();
    let worker = spawn_regeneration(generator, options.clone(), signal.clone(), poll_interval)?;

    server.run(&options.targetdir);
    if interrupted.load(Ordering::SeqCst) {
        println!("\nKeyboard interrupt received, exiting.");
    }
    drop(server);

    signal.stop();
    match worker.join() {
        Ok(Ok(())) => info!("Regeneration worker finished"),
        Ok(Err(e)) => error!("Regeneration worker failed: {}", e),
        Err(_) => error!("Regeneration worker panicked"),
    }
    Ok(())
}

fn spawn_regeneration<G: Generator + 'static>(
    generator: Arc<G>,
    options: PresentationOptions,
    signal: RunSignal,
    poll_interval: Duration,
) -> Result<JoinHandle<Result<()>>> {
    thread::Builder::new()
        .name("regenerate".to_string())
        .spawn(move || generate_and_observe(&*generator, &options, &signal, poll_interval))
        .map_err(BildumiloError::from)
}

/// Ctrl-C unblocks the accept loop. The handler only holds a weak reference
/// so dropping the server still closes the socket.
fn install_interrupt_handler(server: &PresentationServer, interrupted: Arc<AtomicBool>) {
    let handle = Arc::downgrade(&server.handle());
    let result = ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
        if let Some(server) = handle.upgrade() {
            server.unblock();
        }
    });
    if let Err(e) = result {
        warn!("Failed to set Ctrl+C handler: {}", e);
    }
}
