use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.watch_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "watch_directory must not be empty".to_string(),
        });
    }

    if config.scan_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "scan_interval_secs must be greater than zero".to_string(),
        });
    }

    if config.raster.max_pages == 0 {
        return Err(ConfigError::Validation {
            message: "raster.max_pages must be greater than zero".to_string(),
        });
    }

    if config.raster.dpi == 0 {
        return Err(ConfigError::Validation {
            message: "raster.dpi must be greater than zero".to_string(),
        });
    }

    if config.codegen.tool_path.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "codegen.tool_path must not be empty".to_string(),
        });
    }

    if config.codegen.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "codegen.timeout_secs must be greater than zero".to_string(),
        });
    }

    Ok(())
}
