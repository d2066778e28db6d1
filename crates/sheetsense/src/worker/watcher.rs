//! File system watcher for the datasheet folder.
//!
//! Raw notify events are debounced, classified into typed [`FolderEvent`]s
//! and pushed over a channel; the controller consumes them on its own
//! thread, decoupling descriptor mutation from notify's callback timing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, Debouncer};

use crate::error::WorkerError;
use crate::raster::DocumentKind;

/// A classified change in the watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEvent {
    /// A recognized document appeared directly in the watched folder.
    DocumentAdded { filename: String },
    /// A recognized document disappeared from the watched folder.
    DocumentRemoved { filename: String },
    /// Something changed under the results subfolder; viewers should
    /// refresh, the descriptor set is untouched.
    ResultsChanged { path: PathBuf },
}

/// Debounced folder watcher.
pub struct FolderWatcher {
    watch_directory: PathBuf,
    /// Subfolder name distinguishing result exports, matched as a path
    /// substring.
    results_marker: String,
    sender: Sender<FolderEvent>,
    shutdown: Arc<AtomicBool>,
}

impl FolderWatcher {
    pub fn new(
        watch_directory: impl Into<PathBuf>,
        results_subdirectory: &str,
    ) -> (Self, Receiver<FolderEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let watcher = Self {
            watch_directory: watch_directory.into(),
            results_marker: results_subdirectory.to_string(),
            sender,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        (watcher, receiver)
    }

    /// Starts watching the folder. Blocks until [`stop`](Self::stop) is
    /// called.
    pub fn watch(&self) -> Result<(), WorkerError> {
        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer: Debouncer<RecommendedWatcher> =
            new_debouncer(Duration::from_millis(500), tx)
                .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&self.watch_directory, RecursiveMode::Recursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching folder: {}", self.watch_directory.display());

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Use timeout to allow checking the shutdown flag
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if let Some(folder_event) = self.classify(&event.path) {
                            let _ = self.sender.send(folder_event);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!("Watch error: {:?}", e);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    break;
                }
            }
        }

        info!("Stopped watching {}", self.watch_directory.display());
        Ok(())
    }

    /// Classifies a debounced event path. Rename pairs surface as a
    /// removal of the old name plus an addition of the new one.
    fn classify(&self, path: &Path) -> Option<FolderEvent> {
        if path.to_string_lossy().contains(&self.results_marker) {
            return Some(FolderEvent::ResultsChanged {
                path: path.to_path_buf(),
            });
        }

        // Only files directly in the watched folder feed the descriptor
        // set. Compared by final component, notify may report canonicalized
        // paths.
        let watch_root = self.watch_directory.file_name();
        if path.parent().and_then(|p| p.file_name()) != watch_root {
            return None;
        }

        if path.is_dir() {
            return None;
        }

        DocumentKind::from_path(path)?;
        let filename = path.file_name()?.to_str()?.to_string();

        if path.exists() {
            Some(FolderEvent::DocumentAdded { filename })
        } else {
            Some(FolderEvent::DocumentRemoved { filename })
        }
    }

    /// Signals the watcher to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Runs a [`FolderWatcher`] on a background thread.
pub struct AsyncFolderWatcher {
    watcher: Arc<FolderWatcher>,
    receiver: Receiver<FolderEvent>,
    watch_handle: Option<std::thread::JoinHandle<Result<(), WorkerError>>>,
}

impl AsyncFolderWatcher {
    pub fn new(watch_directory: impl Into<PathBuf>, results_subdirectory: &str) -> Self {
        let (watcher, receiver) = FolderWatcher::new(watch_directory, results_subdirectory);
        Self {
            watcher: Arc::new(watcher),
            receiver,
            watch_handle: None,
        }
    }

    /// Starts watching in a background thread.
    pub fn start(&mut self) {
        if self.watch_handle.is_some() {
            return;
        }

        let watcher = Arc::clone(&self.watcher);
        self.watch_handle = Some(std::thread::spawn(move || watcher.watch()));
    }

    /// Returns a receiver for classified folder events.
    pub fn events(&self) -> Receiver<FolderEvent> {
        self.receiver.clone()
    }

    /// Stops the watcher and joins its thread.
    pub fn stop(&mut self) {
        self.watcher.stop();
        if let Some(handle) = self.watch_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AsyncFolderWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn watcher_for(dir: &Path) -> (FolderWatcher, Receiver<FolderEvent>) {
        FolderWatcher::new(dir, "results")
    }

    #[test]
    fn test_classify_new_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.pdf");
        std::fs::write(&path, b"PDF").unwrap();

        let (watcher, _rx) = watcher_for(dir.path());
        assert_eq!(
            watcher.classify(&path),
            Some(FolderEvent::DocumentAdded {
                filename: "sheet.pdf".to_string()
            })
        );
    }

    #[test]
    fn test_classify_removed_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.png");

        let (watcher, _rx) = watcher_for(dir.path());
        assert_eq!(
            watcher.classify(&path),
            Some(FolderEvent::DocumentRemoved {
                filename: "gone.png".to_string()
            })
        );
    }

    #[test]
    fn test_classify_results_subfolder_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results").join("export.mounterlib");

        let (watcher, _rx) = watcher_for(dir.path());
        assert_eq!(
            watcher.classify(&path),
            Some(FolderEvent::ResultsChanged { path: path.clone() })
        );
    }

    #[test]
    fn test_classify_ignores_unrecognized_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let (watcher, _rx) = watcher_for(dir.path());
        assert_eq!(watcher.classify(&path), None);
    }

    #[test]
    fn test_classify_ignores_nested_documents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("subdir").join("deep.pdf");

        let (watcher, _rx) = watcher_for(dir.path());
        assert_eq!(watcher.classify(&nested), None);
    }

    #[test]
    fn test_classify_ignores_directories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("subdir");
        std::fs::create_dir(&sub).unwrap();

        let (watcher, _rx) = watcher_for(dir.path());
        assert_eq!(watcher.classify(&sub), None);
    }

    #[test]
    fn test_stop_flag() {
        let dir = TempDir::new().unwrap();
        let (watcher, _rx) = watcher_for(dir.path());

        assert!(!watcher.is_stopped());
        watcher.stop();
        assert!(watcher.is_stopped());
    }

    #[test]
    fn test_live_watch_detects_created_file() {
        let dir = TempDir::new().unwrap();
        let mut watcher = AsyncFolderWatcher::new(dir.path(), "results");
        let events = watcher.events();
        watcher.start();

        // Give the debouncer a moment to arm before creating the file.
        std::thread::sleep(Duration::from_millis(300));
        std::fs::write(dir.path().join("new.pdf"), b"PDF").unwrap();

        let event = events
            .recv_timeout(Duration::from_secs(10))
            .expect("expected a folder event");
        assert_eq!(
            event,
            FolderEvent::DocumentAdded {
                filename: "new.pdf".to_string()
            }
        );

        watcher.stop();
    }
}
