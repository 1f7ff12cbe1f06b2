use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use libloading::Library;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Anything that can hand out export addresses by name.
///
/// The OS loader is the production implementation; tests plug in tables of
/// in-process `extern "C"` functions.
pub trait SymbolSource: Send + Sync {
    /// Human-readable label used in diagnostics.
    fn name(&self) -> &str;

    /// Address of `symbol`, or `None` when it is not exported.
    fn address(&self, symbol: &str) -> Option<NonNull<c_void>>;
}

/// A loaded module. Clones share one OS handle.
#[derive(Clone)]
pub struct DynamicLibrary {
    path: PathBuf,
    label: String,
    inner: Arc<Library>,
}

impl DynamicLibrary {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolSource for DynamicLibrary {
    fn name(&self) -> &str {
        &self.label
    }

    fn address(&self, symbol: &str) -> Option<NonNull<c_void>> {
        let symbol = unsafe { self.inner.get::<*mut c_void>(symbol.as_bytes()) }.ok()?;
        NonNull::new(*symbol)
    }
}

/// Opens modules and keeps at most one live handle per path.
///
/// Entries are weak so that dropping the last [`DynamicLibrary`] actually
/// unloads the module.
pub struct DynamicLibraryLoader {
    cache: Mutex<HashMap<PathBuf, Weak<Library>>>,
}

impl Default for DynamicLibraryLoader {
    fn default() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl DynamicLibraryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static Self {
        static GLOBAL: Lazy<DynamicLibraryLoader> = Lazy::new(DynamicLibraryLoader::new);
        &GLOBAL
    }

    pub fn load(&self, path: &Path) -> Result<DynamicLibrary> {
        // Bare file names go through the platform search path and are keyed as given.
        let key = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        let label = key.display().to_string();

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.get(&key).and_then(Weak::upgrade) {
            debug!(library = %label, "reusing loaded library handle");
            return Ok(DynamicLibrary {
                path: key,
                label,
                inner: existing,
            });
        }

        let library = unsafe { Library::new(path) }.map_err(|source| Error::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let inner = Arc::new(library);
        cache.retain(|_, handle| handle.strong_count() > 0);
        cache.insert(key.clone(), Arc::downgrade(&inner));
        debug!(library = %label, "loaded library");

        Ok(DynamicLibrary {
            path: key,
            label,
            inner,
        })
    }

    /// Number of paths with a live handle.
    pub fn live_handles(&self) -> usize {
        self.cache
            .lock()
            .values()
            .filter(|handle| handle.strong_count() > 0)
            .count()
    }
}
