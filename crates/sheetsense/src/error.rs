use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetsenseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rasterization error: {0}")]
    Raster(#[from] RasterError),

    #[error("Completion service error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Code synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Credential resolution failed: {message}")]
    Credential { message: String },
}

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render PDF page: {0}")]
    PdfRender(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Failed to launch '{tool}': {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tool exited with status {code:?}")]
    NonZeroExit { code: Option<i32> },

    #[error("Tool did not finish within {secs}s")]
    TimedOut { secs: u64 },

    #[error("Tool reported success but wrote no output file: {0}")]
    MissingOutput(PathBuf),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, SheetsenseError>;
