use std::path::Path;
use std::process::Command;

use crate::error::RasterError;
use crate::raster::{DocumentKind, PageImage, Rasterizer};

pub struct PdfRasterizer;

impl PdfRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdfRasterizer {
    fn rasterize(
        &self,
        path: &Path,
        max_pages: usize,
        dpi: u32,
    ) -> Result<Vec<PageImage>, RasterError> {
        let _span = tracing::info_span!("raster.pdf").entered();

        std::fs::metadata(path).map_err(|e| RasterError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let page_count = count_pdf_pages(path)?;
        let pages = page_count.min(max_pages.max(1));

        let mut images = Vec::with_capacity(pages);
        for page_num in 1..=pages {
            let png = render_pdf_page(path, page_num as u32, dpi)?;
            images.push(PageImage::from_png_bytes(&png));
        }

        Ok(images)
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Pdf)
    }
}

/// Get the page count of a PDF using pdfinfo (poppler-utils).
fn count_pdf_pages(path: &Path) -> Result<usize, RasterError> {
    let output = Command::new("pdfinfo").arg(path).output().map_err(|e| {
        RasterError::PdfRender(format!(
            "Failed to run pdfinfo: {}. Make sure poppler-utils is installed.",
            e
        ))
    })?;

    if !output.status.success() {
        return Err(RasterError::PdfRender(format!(
            "pdfinfo failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(count_str) = line.strip_prefix("Pages:") {
            if let Ok(count) = count_str.trim().parse::<usize>() {
                return Ok(count);
            }
        }
    }

    // Default to 1 page if we can't determine the count
    Ok(1)
}

fn render_pdf_page(path: &Path, page_num: u32, dpi: u32) -> Result<Vec<u8>, RasterError> {
    let temp_dir = std::env::temp_dir();
    let output_prefix = temp_dir.join(format!("sheetsense_page_{}", uuid::Uuid::new_v4()));

    let output = Command::new("pdftoppm")
        .args([
            "-png",
            "-r",
            &dpi.to_string(),
            "-f",
            &page_num.to_string(),
            "-l",
            &page_num.to_string(),
        ])
        .arg(path)
        .arg(&output_prefix)
        .output()
        .map_err(|e| {
            RasterError::PdfRender(format!(
                "Failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                e
            ))
        })?;

    if !output.status.success() {
        return Err(RasterError::PdfRender(format!(
            "pdftoppm failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    // Find the output file (pdftoppm pads the page number suffix)
    let output_path = format!("{}-{}.png", output_prefix.display(), page_num);
    let output_path_alt = format!("{}-{:02}.png", output_prefix.display(), page_num);
    let output_path_alt2 = format!("{}-{:03}.png", output_prefix.display(), page_num);

    let paths = [output_path, output_path_alt, output_path_alt2];
    let image_path = paths
        .iter()
        .find(|p| Path::new(p).exists())
        .ok_or_else(|| RasterError::PdfRender("Failed to find rendered page image".to_string()))?;

    let image_data = std::fs::read(image_path)
        .map_err(|e| RasterError::PdfRender(format!("Failed to read rendered image: {}", e)))?;

    let _ = std::fs::remove_file(image_path);

    Ok(image_data)
}
