//! `wimbridge` binds the native wimlib library at run time.
//!
//! ```no_run
//! let mut lib = wimbridge::load_from_env()?;
//! let native = lib.library()?;
//! println!("wimlib {}", native.version());
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;

use anyhow::Context;
use tracing::debug;

pub use wimbridge_config::{
    AbiVariant, BindingConfig, PlatformInfo, StringEncoding, StructLayout, TargetTriple,
};
pub use wimbridge_ffi::*;
pub use wimbridge_utils::init_logging;

/// Configure from the environment and load the library.
pub fn load_from_env() -> anyhow::Result<WimLib> {
    load_with_config(BindingConfig::from_env())
}

/// Read a TOML config file, let the environment override it, and load.
pub fn load_from_file(path: &Path) -> anyhow::Result<WimLib> {
    let config = BindingConfig::from_file(path)
        .with_context(|| format!("failed to read binding config {}", path.display()))?
        .merge_with_env();
    load_with_config(config)
}

pub fn load_with_config(config: BindingConfig) -> anyhow::Result<WimLib> {
    init_logging();
    debug!(?config, "binding wimlib");

    let mut lib = WimLib::new(config);
    lib.load().context("failed to load wimlib")?;
    Ok(lib)
}
