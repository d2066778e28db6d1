pub mod controller;
pub mod descriptor;
pub mod scanner;
pub mod scheduler;
pub mod watcher;

pub use controller::{ServiceEvent, WatchController};
pub use descriptor::{AnalysisStatus, DatasheetDescriptor, DescriptorSet};
pub use scanner::DirectoryScanner;
pub use scheduler::AnalysisScheduler;
pub use watcher::{AsyncFolderWatcher, FolderEvent, FolderWatcher};
