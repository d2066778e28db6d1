use std::collections::HashMap;

use serde_json::Value;

use crate::raster::PageImage;

use super::error::PipelineWarning;

pub struct AnalysisContext {
    // Input
    pub filename: String,

    // Stage 1 result — guaranteed Some after step_rasterize
    pub pages: Option<Vec<PageImage>>,

    // Stage 2 result — trimmed, may be empty
    pub vendor_code: Option<String>,

    // Stage 3 result — guaranteed Some after step_report; persisted verbatim
    pub report: Option<String>,

    // Stage 4 result
    pub metadata: HashMap<String, Value>,

    // Persist stage result — guaranteed Some after step_persist
    pub record_id: Option<i64>,

    // Stage 6 result
    pub checklist: Vec<String>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl AnalysisContext {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            pages: None,
            vendor_code: None,
            report: None,
            metadata: HashMap::new(),
            record_id: None,
            checklist: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
