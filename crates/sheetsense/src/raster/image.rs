use std::io::Cursor;
use std::path::Path;

use crate::error::RasterError;
use crate::raster::{DocumentKind, PageImage, Rasterizer};

/// Single-image documents bypass page rendering: the file is decoded to
/// verify it is a readable image, then re-encoded as one PNG page.
pub struct ImageRasterizer;

impl ImageRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ImageRasterizer {
    fn rasterize(
        &self,
        path: &Path,
        _max_pages: usize,
        _dpi: u32,
    ) -> Result<Vec<PageImage>, RasterError> {
        let _span = tracing::info_span!("raster.image").entered();

        let bytes = std::fs::read(path).map_err(|e| RasterError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| RasterError::ImageDecode(e.to_string()))?;

        let mut png = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| RasterError::ImageDecode(e.to_string()))?;

        Ok(vec![PageImage::from_png_bytes(&png)])
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Image)
    }
}
