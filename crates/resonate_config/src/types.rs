//! Configuration types deserialized from `resonate.toml`.

use serde::{Deserialize, Serialize};

/// Default call-stack budget in bytes.
pub const DEFAULT_MAX_STACK_SIZE: u64 = 20 * 1024 * 1024;
/// Default maximum delay line length in frames.
pub const DEFAULT_MAX_DELAY_LINE_LENGTH: u64 = 1024 * 256;
/// Default maximum size of an endpoint or processor array.
pub const DEFAULT_MAX_PROCESSOR_ARRAY_SIZE: u32 = 256;
/// Default maximum number of distinct specialised modules.
pub const DEFAULT_MAX_SPECIALISATION_INSTANCES: u32 = 64;

/// The whole `resonate.toml` file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Settings under `[build]`.
    #[serde(default)]
    pub build: BuildSettings,
}

/// Limits and options that steer linking and verification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Full name of the main processor or graph, overriding the `main`
    /// annotation.
    pub main_processor: Option<String>,
    /// Maximum worst-case call-stack size in bytes. `0` disables the check.
    pub max_stack_size: u64,
    /// Maximum connection delay length in frames.
    pub max_delay_line_length: u64,
    /// Maximum size of endpoint arrays and processor-instance arrays.
    pub max_processor_array_size: u32,
    /// Maximum number of distinct specialised modules in one program.
    pub max_specialisation_instances: u32,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            main_processor: None,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            max_delay_line_length: DEFAULT_MAX_DELAY_LINE_LENGTH,
            max_processor_array_size: DEFAULT_MAX_PROCESSOR_ARRAY_SIZE,
            max_specialisation_instances: DEFAULT_MAX_SPECIALISATION_INSTANCES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = BuildSettings::default();
        assert_eq!(s.max_stack_size, 20 * 1024 * 1024);
        assert_eq!(s.max_delay_line_length, 262_144);
        assert_eq!(s.max_processor_array_size, 256);
        assert!(s.main_processor.is_none());
    }
}
