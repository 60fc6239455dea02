// ABOUTME: Watch module for monitoring presentation dependencies
// ABOUTME: Regenerates the presentation whenever a file reported by the last build changes

use crossbeam::channel::{bounded, Receiver, Sender};
use crossbeam::select;
use log::{debug, error, info, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::Result;
use crate::generate::{Generator, MonitorList, PresentationOptions};

/// Cooperative stop flag shared between the server and the regeneration
/// worker. Stopping also disconnects [`RunSignal::stopped`], so a blocked
/// `select!` wakes immediately.
#[derive(Clone)]
pub struct RunSignal {
    inner: Arc<RunState>,
}

struct RunState {
    running: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    stopped: Receiver<()>,
}

impl RunSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(RunState {
                running: AtomicBool::new(true),
                stop_tx: Mutex::new(Some(tx)),
                stopped: rx,
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.stop_tx.lock().take();
    }

    /// Never receives a message; disconnects once the signal is stopped
    pub fn stopped(&self) -> &Receiver<()> {
        &self.inner.stopped
    }
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot detector for a fixed set of files. Armed on creation, it
/// triggers on the first event touching a watched path and ignores
/// everything after that.
pub struct ChangeDetector {
    watched: HashSet<PathBuf>,
    triggered: AtomicBool,
    cause: Mutex<Option<PathBuf>>,
    wake_tx: Sender<PathBuf>,
    wake_rx: Receiver<PathBuf>,
}

impl ChangeDetector {
    pub fn new<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            watched: paths.into_iter().collect(),
            triggered: AtomicBool::new(false),
            cause: Mutex::new(None),
            wake_tx,
            wake_rx,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// The watched path whose change triggered the detector
    pub fn trigger_path(&self) -> Option<PathBuf> {
        self.cause.lock().clone()
    }

    /// Receives the triggering path once
    pub fn changes(&self) -> &Receiver<PathBuf> {
        &self.wake_rx
    }

    /// Feed one filesystem notification. Returns true if this event is the
    /// one that triggered the detector.
    pub fn handle_event(&self, event: &Event) -> bool {
        event_paths(event).iter().any(|path| self.update(path))
    }

    fn update(&self, path: &Path) -> bool {
        if !self.watched.contains(path) {
            return false;
        }
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        *self.cause.lock() = Some(path.to_path_buf());
        println!("File {} modified, update presentation", path.display());
        let _ = self.wake_tx.try_send(path.to_path_buf());
        true
    }
}

/// Paths an event may have changed: modified or created paths, and the
/// destination of a move
fn event_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => &[],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..2).unwrap_or(&[])
        }
        EventKind::Modify(_) => &event.paths,
        _ => &[],
    }
}

/// Group monitored files by the directory that has to be watched for them
pub fn group_by_directory(files: &[PathBuf]) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut directories: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        let directory = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        directories.entry(directory).or_default().push(file.clone());
    }
    directories
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Changed,
    Stopped,
}

/// Regenerate the presentation until the run signal is stopped.
///
/// Each cycle generates once, then watches the reported files and blocks
/// until one of them changes or the signal stops. A failed generation is
/// logged and the previous file set is watched again so that fixing the
/// source triggers a rebuild.
pub fn generate_and_observe<G: Generator + ?Sized>(
    generator: &G,
    options: &PresentationOptions,
    signal: &RunSignal,
    poll_interval: Duration,
) -> Result<()> {
    let mut monitor: MonitorList = vec![options.presentation.clone()];

    while signal.is_running() {
        match panic::catch_unwind(AssertUnwindSafe(|| generator.generate(options))) {
            Ok(Ok(files)) => {
                println!("Presentation generated.");
                monitor = files;
            }
            Ok(Err(e)) => {
                error!("Failed to generate presentation: {}", e);
                println!("Failed to generate presentation: {}", e);
            }
            Err(cause) => {
                let message = panic_message(cause.as_ref());
                error!("Presentation generation panicked: {}", message);
                println!("Failed to generate presentation: {}", message);
            }
        }

        let detector = Arc::new(ChangeDetector::new(monitor.iter().cloned()));
        let Some(watcher) = observe_until_ready(&detector, &monitor, signal, poll_interval) else {
            break;
        };
        let outcome = wait_for_change(&detector, signal, poll_interval);
        // Dropping the watcher stops and joins its event thread
        drop(watcher);

        debug!("Watch cycle ended: {:?}", outcome);
        if let Some(path) = detector.trigger_path() {
            info!("Regenerating after change to {:?}", path);
        }
    }

    info!("Regeneration loop stopped");
    Ok(())
}

/// Keep trying to set up the watcher until it works or the signal stops.
/// Returns `None` only when stopped.
fn observe_until_ready(
    detector: &Arc<ChangeDetector>,
    files: &[PathBuf],
    signal: &RunSignal,
    poll_interval: Duration,
) -> Option<RecommendedWatcher> {
    let mut reported = false;
    while signal.is_running() {
        match observe(detector, files) {
            Ok(watcher) => return Some(watcher),
            Err(e) => {
                error!("Failed to watch presentation files: {}", e);
                if !reported {
                    println!("Failed to watch presentation files, retrying: {}", e);
                    reported = true;
                }
            }
        }
        select! {
            recv(signal.stopped()) -> _ => {}
            default(poll_interval) => {}
        }
    }
    None
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn observe(detector: &Arc<ChangeDetector>, files: &[PathBuf]) -> Result<RecommendedWatcher> {
    let handler = Arc::clone(detector);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            handler.handle_event(&event);
        }
        Err(e) => warn!("Watch error: {}", e),
    })?;

    for (directory, files) in group_by_directory(files) {
        debug!("Watching {:?} for {} files", directory, files.len());
        if let Err(e) = watcher.watch(&directory, RecursiveMode::NonRecursive) {
            warn!("Failed to watch {:?}: {}", directory, e);
        }
    }
    Ok(watcher)
}

fn wait_for_change(detector: &ChangeDetector, signal: &RunSignal, poll_interval: Duration) -> WaitOutcome {
    loop {
        if !signal.is_running() {
            return WaitOutcome::Stopped;
        }
        if detector.is_triggered() {
            return WaitOutcome::Changed;
        }
        select! {
            recv(signal.stopped()) -> _ => return WaitOutcome::Stopped,
            recv(detector.changes()) -> _ => return WaitOutcome::Changed,
            default(poll_interval) => {}
        }
    }
}
