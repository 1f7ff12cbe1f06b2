//! Binding configuration
//!
//! Which library to load, which string encoding to bind and how the native
//! diagnostics log is set up. Values come from defaults, an optional TOML file
//! and `WIMBRIDGE_*` environment variables, in increasing precedence.

pub mod platform;
pub mod variant;

pub use crate::platform::{PlatformInfo, TargetTriple};
pub use crate::variant::{AbiVariant, StringEncoding, StructLayout};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_LIBRARY: &str = "WIMBRIDGE_LIBRARY";
pub const ENV_ENCODING: &str = "WIMBRIDGE_ENCODING";
pub const ENV_PRINT_ERRORS: &str = "WIMBRIDGE_PRINT_ERRORS";
pub const ENV_INIT_FLAGS: &str = "WIMBRIDGE_INIT_FLAGS";
pub const ENV_ERROR_DIR: &str = "WIMBRIDGE_ERROR_DIR";

/// Everything the lifecycle manager needs to bring the native library up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Explicit library path; the platform default name is used when unset
    pub library_path: Option<PathBuf>,

    /// String encoding to bind; the platform convention is used when unset
    pub encoding: Option<StringEncoding>,

    /// Route native diagnostics to a temporary log file at load time
    pub print_errors: bool,

    /// Flags passed to the native global initialisation entry point
    pub init_flags: u32,

    /// Directory for the temporary diagnostics log (system temp dir if unset)
    pub error_file_dir: Option<PathBuf>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            encoding: None,
            print_errors: true,
            init_flags: 0,
            error_file_dir: None,
        }
    }
}

impl BindingConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().apply_lookup(lookup)
    }

    /// Merge with environment variables (env vars take precedence)
    pub fn merge_with_env(self) -> Self {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    fn apply_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_LIBRARY).filter(|v| !v.is_empty()) {
            self.library_path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup(ENV_ENCODING)
            && let Ok(encoding) = val.parse()
        {
            self.encoding = Some(encoding);
        }

        if let Some(val) = lookup(ENV_PRINT_ERRORS) {
            self.print_errors = parse_flag(&val).unwrap_or(self.print_errors);
        }

        if let Some(val) = lookup(ENV_INIT_FLAGS) {
            self.init_flags = parse_u32(&val).unwrap_or(self.init_flags);
        }

        if let Some(dir) = lookup(ENV_ERROR_DIR).filter(|v| !v.is_empty()) {
            self.error_file_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Resolve the encoding to bind on `platform`.
    pub fn encoding_for(&self, platform: &PlatformInfo) -> StringEncoding {
        self.encoding
            .unwrap_or_else(|| StringEncoding::platform_default(platform))
    }

    /// Resolve the library to open on `platform`, if any is known.
    pub fn library_for(&self, platform: &PlatformInfo) -> Option<PathBuf> {
        self.library_path
            .clone()
            .or_else(|| platform.default_library_name().map(PathBuf::from))
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BindingConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn from_file(_path: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Save configuration to TOML file
    #[cfg(feature = "toml-config")]
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn save_to_file(&self, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
