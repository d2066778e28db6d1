//! Shared fixtures for integration tests.
//!
//! External collaborators (completion service, code-generation tool) are
//! replaced by stubs so the full pipeline runs hermetically.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use sheetsense::ai::{CompletionRequest, CompletionService};
use sheetsense::codegen::CodeSynthesizer;
use sheetsense::db::Database;
use sheetsense::error::{CompletionError, SynthesisError};
use sheetsense::pipeline::{Analyzer, PipelineConfig};
use sheetsense::worker::{AnalysisScheduler, DescriptorSet, ServiceEvent};

/// Canned completion backend. Stages are told apart by their instruction:
/// image-bearing requests are the vendor/report stages, text-only requests
/// are tags or checklist.
pub struct StubCompletion {
    pub vendor: String,
    pub report: String,
    pub tags_reply: String,
    pub checklist_reply: String,
}

impl StubCompletion {
    pub fn with_defaults() -> Self {
        Self {
            vendor: "MAX5033A".to_string(),
            report: "## 1. Datasheet analysis\nBuck converter, 7.5 V to 76 V input, 500 mA.\n"
                .to_string(),
            tags_reply: "```json\n[\n  {'Name' : 'Model', 'Description' : 'MAX5033A'},\n  {'Name' : 'Output voltage', 'Description' : '3.3V DC'}\n]\n```"
                .to_string(),
            checklist_reply: "```json\n[\"Verify that the VIN pin of MAX5033A has a decoupling capacitor to GND\", \"Verify that the BST pin of MAX5033A has a 0.1 uF capacitor to LX\", \"Verify that the FB pin of MAX5033A is tied to VOUT\"]\n```"
                .to_string(),
        }
    }
}

impl CompletionService for StubCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        if !request.images.is_empty() {
            if request.instruction.contains("vendor part code") {
                Ok(self.vendor.clone())
            } else {
                Ok(self.report.clone())
            }
        } else if request.instruction.contains("search metadata") {
            Ok(self.tags_reply.clone())
        } else {
            Ok(self.checklist_reply.clone())
        }
    }
}

/// Code synthesizer stub with an optional failing call index (1-based).
pub struct StubSynthesizer {
    calls: Mutex<usize>,
    fail_on_call: Option<usize>,
}

impl StubSynthesizer {
    pub fn reliable() -> Self {
        Self {
            calls: Mutex::new(0),
            fail_on_call: None,
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            calls: Mutex::new(0),
            fail_on_call: Some(call),
        }
    }
}

impl CodeSynthesizer for StubSynthesizer {
    fn synthesize(&self, prompt: &str) -> Result<String, SynthesisError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if self.fail_on_call == Some(*calls) {
            return Err(SynthesisError::NonZeroExit { code: Some(1) });
        }
        Ok(format!("# generated for: {}\n", prompt))
    }
}

/// Isolated environment: temp watch folder, on-disk store, stubbed
/// analyzer and a scheduler over a shared descriptor set.
pub struct TestHarness {
    temp_dir: TempDir,
    pub watch_dir: PathBuf,
    pub db: Database,
    pub descriptors: Arc<DescriptorSet>,
    pub events: broadcast::Sender<ServiceEvent>,
    pub scheduler: AnalysisScheduler,
}

impl TestHarness {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        synthesizer: Arc<dyn CodeSynthesizer>,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watch_dir = temp_dir.path().join("datasheets");
        std::fs::create_dir_all(&watch_dir).expect("Failed to create watch dir");

        let db = Database::open(&temp_dir.path().join("sheetsense.db"))
            .expect("Failed to open test database");

        let config = Arc::new(PipelineConfig {
            watch_directory: watch_dir.clone(),
            max_pages: 5,
            dpi: 150,
        });
        let analyzer = Arc::new(Analyzer::new(config, db.clone(), completion, synthesizer));

        let descriptors = Arc::new(DescriptorSet::new());
        let (events, _) = broadcast::channel(64);

        let scheduler = AnalysisScheduler::new(
            analyzer,
            Arc::clone(&descriptors),
            Duration::from_secs(60),
            events.clone(),
        );

        Self {
            temp_dir,
            watch_dir,
            db,
            descriptors,
            events,
            scheduler,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(StubCompletion::with_defaults()),
            Arc::new(StubSynthesizer::reliable()),
        )
    }

    /// Writes a small valid PNG into the watch folder.
    pub fn add_png(&self, name: &str, shade: u8) -> PathBuf {
        let path = self.watch_dir.join(name);
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade]));
        img.save(&path).expect("Failed to write test PNG");
        path
    }

    /// Scans the watch folder into the descriptor set.
    pub fn scan(&self) {
        let scanner = sheetsense::worker::DirectoryScanner::new(&self.watch_dir);
        self.descriptors
            .replace_all(scanner.scan(&self.db).expect("scan failed"));
    }

    /// Runs one scheduler pass and waits for all dispatched workers.
    pub fn run_tick(&self) {
        for handle in self.scheduler.run_pending() {
            handle.join().expect("worker thread panicked");
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}
