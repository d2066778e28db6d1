use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Rasterization failed: {0}")]
    Raster(#[from] crate::error::RasterError),

    #[error("Completion service call failed: {0}")]
    Completion(#[from] crate::error::CompletionError),

    #[error("Store write failed: {0}")]
    Store(#[from] crate::db::DatabaseError),
}

#[derive(Debug, Clone)]
pub enum PipelineWarning {
    /// Tag output did not parse; the raw text was stored instead.
    TagParseFallback,
    /// Checklist output did not parse; no items were generated.
    ChecklistParseFallback,
    /// One checklist item's code synthesis failed; the item was stored
    /// with an empty artifact.
    SynthesisFailed { checkpoint: String, error: String },
    /// A checklist item could not be stored.
    CheckpointStoreFailed { checkpoint: String, error: String },
}
