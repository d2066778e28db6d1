pub mod image;
pub mod pdf;

use std::path::Path;

use base64::Engine;

use crate::error::RasterError;

/// Recognized input document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A rendered page encoded as a self-describing `data:` URL, ready to embed
/// in a vision request.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub data_url: String,
}

impl PageImage {
    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self {
            data_url: format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }
    }
}

pub trait Rasterizer: Send + Sync {
    /// Renders the document into at most `max_pages` encoded page images at
    /// the given resolution.
    fn rasterize(
        &self,
        path: &Path,
        max_pages: usize,
        dpi: u32,
    ) -> Result<Vec<PageImage>, RasterError>;

    fn supports(&self, kind: DocumentKind) -> bool;
}

pub struct RasterizerRegistry {
    rasterizers: Vec<Box<dyn Rasterizer>>,
}

impl RasterizerRegistry {
    pub fn new() -> Self {
        Self {
            rasterizers: vec![
                Box::new(pdf::PdfRasterizer::new()),
                Box::new(image::ImageRasterizer::new()),
            ],
        }
    }

    pub fn rasterize(
        &self,
        path: &Path,
        max_pages: usize,
        dpi: u32,
    ) -> Result<Vec<PageImage>, RasterError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let kind = DocumentKind::from_extension(extension)
            .ok_or_else(|| RasterError::UnsupportedFormat(extension.to_string()))?;

        for rasterizer in &self.rasterizers {
            if rasterizer.supports(kind) {
                return rasterizer.rasterize(path, max_pages, dpi);
            }
        }

        Err(RasterError::UnsupportedFormat(extension.to_string()))
    }
}

impl Default for RasterizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
