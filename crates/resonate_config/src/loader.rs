//! Settings file loading and validation.

use crate::error::ConfigError;
use crate::types::{BuildSettings, ConfigFile};
use std::path::Path;

/// Loads `<dir>/resonate.toml` and returns its validated build settings.
pub fn load_settings(dir: &Path) -> Result<BuildSettings, ConfigError> {
    let content = std::fs::read_to_string(dir.join("resonate.toml"))?;
    load_settings_from_str(&content)
}

/// Parses and validates build settings from TOML text.
pub fn load_settings_from_str(content: &str) -> Result<BuildSettings, ConfigError> {
    let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&file.build)?;
    Ok(file.build)
}

fn validate(settings: &BuildSettings) -> Result<(), ConfigError> {
    if settings.max_delay_line_length == 0 {
        return Err(ConfigError::Validation(
            "max_delay_line_length must be at least 1".to_string(),
        ));
    }
    if settings.max_processor_array_size == 0 {
        return Err(ConfigError::Validation(
            "max_processor_array_size must be at least 1".to_string(),
        ));
    }
    if matches!(&settings.main_processor, Some(name) if name.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "main_processor must not be empty".to_string(),
        ));
    }
    Ok(())
}
