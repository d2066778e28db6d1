pub mod client;
pub mod extract;
pub mod prompts;

pub use client::ChatCompletionClient;
pub use extract::Extraction;

use crate::error::CompletionError;
use crate::raster::PageImage;

/// A single-turn request to the completion service: one text instruction
/// plus zero or more embedded page images.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub instruction: String,
    pub images: Vec<PageImage>,
}

impl CompletionRequest {
    /// Text-only request.
    pub fn text(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            images: Vec::new(),
        }
    }

    /// Request bundling the rendered page set.
    pub fn with_images(instruction: impl Into<String>, images: &[PageImage]) -> Self {
        Self {
            instruction: instruction.into(),
            images: images.to_vec(),
        }
    }
}

/// A text/vision completion backend. Implemented by the HTTP client in
/// production and by stubs in tests.
pub trait CompletionService: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
