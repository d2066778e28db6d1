//! Consumes folder events and maintains the descriptor set.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{debug, info};
use tokio::sync::broadcast;

use crate::db::{analysis_repo, Database};
use crate::worker::descriptor::{AnalysisStatus, DatasheetDescriptor, DescriptorSet};
use crate::worker::watcher::FolderEvent;

/// Notifications for frontends. Worker threads never touch UI-visible state
/// directly; they publish here and the subscriber applies the change on its
/// own thread.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    /// The descriptor set or a descriptor status changed.
    DescriptorsChanged,
    /// A finished run stored a new analysis record for this file.
    AnalysisStored { filename: String },
    /// Something under the results subfolder changed.
    ResultsChanged { path: PathBuf },
}

pub struct WatchController {
    descriptors: Arc<DescriptorSet>,
    watch_directory: PathBuf,
    events: broadcast::Sender<ServiceEvent>,
    shutdown: Arc<AtomicBool>,
}

impl WatchController {
    pub fn new(
        descriptors: Arc<DescriptorSet>,
        watch_directory: impl Into<PathBuf>,
        events: broadcast::Sender<ServiceEvent>,
    ) -> Self {
        Self {
            descriptors,
            watch_directory: watch_directory.into(),
            events,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts consuming folder events on a background thread.
    pub fn start(&self, receiver: Receiver<FolderEvent>) -> JoinHandle<()> {
        let descriptors = Arc::clone(&self.descriptors);
        let watch_directory = self.watch_directory.clone();
        let events = self.events.clone();
        let shutdown = Arc::clone(&self.shutdown);

        std::thread::spawn(move || {
            debug!("Watch controller started");
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }

                match receiver.recv_timeout(Duration::from_millis(100)) {
                    Ok(event) => apply_event(&descriptors, &watch_directory, event, &events),
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Watch controller stopped");
        })
    }

    /// Signals the controller thread to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Manual re-analysis: deletes the store record for each selected
    /// filename and resets its descriptor to Ready, making it eligible for
    /// the next scheduler tick. Returns how many descriptors were reset.
    pub fn reanalyze(&self, db: &Database, filenames: &[String]) -> crate::error::Result<usize> {
        let mut reset = 0;
        for filename in filenames {
            if let Some(record) = analysis_repo::find_by_filename(db, filename)? {
                analysis_repo::delete(db, record.id)?;
                debug!("Deleted record {} for '{}'", record.id, filename);
            }
            if self.descriptors.set_status(filename, AnalysisStatus::Ready) {
                reset += 1;
            }
        }

        if reset > 0 {
            info!("{} file(s) queued for re-analysis", reset);
            let _ = self.events.send(ServiceEvent::DescriptorsChanged);
        }
        Ok(reset)
    }
}

fn apply_event(
    descriptors: &DescriptorSet,
    watch_directory: &std::path::Path,
    event: FolderEvent,
    events: &broadcast::Sender<ServiceEvent>,
) {
    match event {
        FolderEvent::DocumentAdded { filename } => {
            if descriptors.insert(DatasheetDescriptor::new(&filename, watch_directory)) {
                info!("New datasheet detected: {}", filename);
                let _ = events.send(ServiceEvent::DescriptorsChanged);
            }
        }
        FolderEvent::DocumentRemoved { filename } => {
            if descriptors.remove(&filename) {
                info!("Datasheet removed: {}", filename);
                let _ = events.send(ServiceEvent::DescriptorsChanged);
            }
        }
        FolderEvent::ResultsChanged { path } => {
            let _ = events.send(ServiceEvent::ResultsChanged { path });
        }
    }
}
