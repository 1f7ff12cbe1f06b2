use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use wimbridge_config::{AbiVariant, BindingConfig, PlatformInfo};

use crate::dynamic_loader::{DynamicLibraryLoader, SymbolSource};
use crate::error::{Error, Result};
use crate::library::NativeLibrary;

enum State {
    Unloaded,
    Loaded(NativeLibrary),
}

/// Owns the loaded/unloaded state of the native library.
///
/// Every [`Wim`](crate::Wim) borrows the [`NativeLibrary`] held here, so the
/// library cannot be unloaded while a handle is still open.
pub struct WimLib {
    config: BindingConfig,
    platform: PlatformInfo,
    state: State,
    generation: u64,
}

impl WimLib {
    pub fn new(config: BindingConfig) -> Self {
        Self::with_platform(config, PlatformInfo::host())
    }

    /// Bind against `platform` instead of the host, e.g. to pick a layout in tests.
    pub fn with_platform(config: BindingConfig, platform: PlatformInfo) -> Self {
        Self {
            config,
            platform,
            state: State::Unloaded,
            generation: 0,
        }
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// Takes effect on the next load.
    pub fn set_platform(&mut self, platform: PlatformInfo) {
        self.platform = platform;
    }

    /// Load the configured library, or the default name for the platform.
    pub fn load(&mut self) -> Result<&NativeLibrary> {
        let path = self.config.library_for(&self.platform).ok_or_else(|| {
            Error::PlatformUnsupported(format!(
                "no default library name for {}-{}",
                self.platform.arch, self.platform.os
            ))
        })?;
        self.load_from(&path)
    }

    pub fn load_from(&mut self, path: &Path) -> Result<&NativeLibrary> {
        self.ensure_unloaded()?;
        let library = DynamicLibraryLoader::global().load(path)?;
        self.load_source(Arc::new(library))
    }

    /// Load from an already-opened symbol source.
    pub fn load_source(&mut self, source: Arc<dyn SymbolSource>) -> Result<&NativeLibrary> {
        self.ensure_unloaded()?;

        let encoding = self.config.encoding_for(&self.platform);
        let variant =
            AbiVariant::select(encoding, &self.platform).map_err(Error::PlatformUnsupported)?;
        debug!(library = source.name(), variant = %variant, "loading native library");

        let library = NativeLibrary::open(source, variant, &self.config)?;
        self.generation += 1;
        info!(
            library = library.name(),
            version = %library.version(),
            generation = self.generation,
            "native library loaded"
        );

        self.state = State::Loaded(library);
        self.library()
    }

    /// Release the library. A no-op when nothing is loaded.
    pub fn unload(&mut self) {
        if let State::Loaded(library) = std::mem::replace(&mut self.state, State::Unloaded) {
            let name = library.name().to_string();
            drop(library);
            info!(library = %name, "native library unloaded");
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, State::Loaded(_))
    }

    pub fn library(&self) -> Result<&NativeLibrary> {
        match &self.state {
            State::Loaded(library) => Ok(library),
            State::Unloaded => Err(Error::NotLoaded),
        }
    }

    /// Number of successful loads so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn ensure_unloaded(&self) -> Result<()> {
        match &self.state {
            State::Loaded(library) => Err(Error::AlreadyLoaded(library.name().to_string())),
            State::Unloaded => Ok(()),
        }
    }
}

impl Drop for WimLib {
    fn drop(&mut self) {
        self.unload();
    }
}
