use std::path::PathBuf;

use crate::config::Config;

pub struct PipelineConfig {
    pub watch_directory: PathBuf,
    pub max_pages: usize,
    pub dpi: u32,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            watch_directory: PathBuf::from(&config.watch_directory),
            max_pages: config.raster.max_pages,
            dpi: config.raster.dpi,
        }
    }
}
