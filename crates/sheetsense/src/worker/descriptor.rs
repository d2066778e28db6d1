//! In-memory tracking of each discovered datasheet's processing status.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Processing status of one datasheet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Ready,
    Processing,
    Finish,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnalysisStatus::Ready => "Ready",
            AnalysisStatus::Processing => "Processing",
            AnalysisStatus::Finish => "Finish",
        };
        f.write_str(label)
    }
}

/// One discovered input file. Never persisted — the set is reconstructed
/// from the directory listing and store lookups on every load.
#[derive(Debug, Clone)]
pub struct DatasheetDescriptor {
    pub filename: String,
    pub folder: PathBuf,
    pub status: AnalysisStatus,
}

impl DatasheetDescriptor {
    pub fn new(filename: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            folder: folder.into(),
            status: AnalysisStatus::Ready,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }
}

/// Mutex-guarded descriptor collection, shared between the controller, the
/// scheduler and its worker threads.
pub struct DescriptorSet {
    inner: Mutex<Vec<DatasheetDescriptor>>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Vec<DatasheetDescriptor>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the whole set, e.g. after a startup or folder-switch scan.
    pub fn replace_all(&self, descriptors: Vec<DatasheetDescriptor>) {
        *self.locked() = descriptors;
    }

    /// Adds a descriptor unless one with the same filename already exists.
    pub fn insert(&self, descriptor: DatasheetDescriptor) -> bool {
        let mut inner = self.locked();
        if inner.iter().any(|d| d.filename == descriptor.filename) {
            return false;
        }
        inner.push(descriptor);
        true
    }

    pub fn remove(&self, filename: &str) -> bool {
        let mut inner = self.locked();
        let before = inner.len();
        inner.retain(|d| d.filename != filename);
        inner.len() != before
    }

    pub fn snapshot(&self) -> Vec<DatasheetDescriptor> {
        self.locked().clone()
    }

    /// Atomically marks every Ready descriptor as Processing and returns
    /// the claimed descriptors, so one tick cannot dispatch a file twice.
    pub fn claim_ready(&self) -> Vec<DatasheetDescriptor> {
        let mut inner = self.locked();
        let mut claimed = Vec::new();
        for descriptor in inner.iter_mut() {
            if descriptor.status == AnalysisStatus::Ready {
                descriptor.status = AnalysisStatus::Processing;
                claimed.push(descriptor.clone());
            }
        }
        claimed
    }

    pub fn set_status(&self, filename: &str, status: AnalysisStatus) -> bool {
        let mut inner = self.locked();
        match inner.iter_mut().find(|d| d.filename == filename) {
            Some(descriptor) => {
                descriptor.status = status;
                true
            }
            None => false,
        }
    }

    pub fn status_of(&self, filename: &str) -> Option<AnalysisStatus> {
        self.locked()
            .iter()
            .find(|d| d.filename == filename)
            .map(|d| d.status)
    }

    pub fn len(&self) -> usize {
        self.locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }
}

impl Default for DescriptorSet {
    fn default() -> Self {
        Self::new()
    }
}
