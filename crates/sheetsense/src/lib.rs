pub mod ai;
pub mod codegen;
pub mod config;
pub mod db;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod raster;
pub mod worker;

pub use ai::{ChatCompletionClient, CompletionRequest, CompletionService};
pub use codegen::{CodeSynthesizer, ExternalToolSynthesizer};
pub use config::{load_config, Config};
pub use error::{
    CompletionError, ConfigError, RasterError, Result, SheetsenseError, SynthesisError,
    WorkerError,
};
pub use pipeline::{AnalysisContext, AnalysisOutcome, Analyzer, PipelineConfig};
pub use worker::{
    AnalysisScheduler, AnalysisStatus, DatasheetDescriptor, DescriptorSet, DirectoryScanner,
    ServiceEvent, WatchController,
};
