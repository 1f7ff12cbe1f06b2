//! Eager, all-or-nothing binding of an export table.

use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use ahash::AHashMap;
use tracing::{debug, trace};

use crate::dynamic_loader::SymbolSource;
use crate::error::{Error, Result};

/// One entry of an export table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSpec {
    /// Primary symbol name, also the key the export is stored under
    pub name: &'static str,
    /// Alternate symbol tried when the primary one is absent
    pub fallback: Option<&'static str>,
    pub required: bool,
}

impl ExportSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            fallback: None,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            fallback: None,
            required: false,
        }
    }

    pub const fn or(self, fallback: &'static str) -> Self {
        Self {
            fallback: Some(fallback),
            ..self
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.fallback)
    }
}

impl fmt::Display for ExportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fallback {
            Some(fallback) => write!(f, "{} (or {})", self.name, fallback),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A resolved export: which symbol matched and where it lives.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedExport {
    pub symbol: &'static str,
    address: NonNull<c_void>,
}

impl ResolvedExport {
    pub fn address(&self) -> NonNull<c_void> {
        self.address
    }
}

/// Result of resolving a whole table.
#[derive(Debug)]
pub struct ResolvedExports {
    library: String,
    entries: AHashMap<&'static str, ResolvedExport>,
}

impl ResolvedExports {
    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, spec: &ExportSpec) -> Option<&ResolvedExport> {
        self.entries.get(spec.name)
    }

    /// Cast a resolved export to its function pointer type.
    ///
    /// # Safety
    /// `F` must be the `extern "C"` function pointer type matching the
    /// native definition of the export.
    pub unsafe fn function<F: Copy>(&self, spec: &ExportSpec) -> Result<F> {
        match self.get(spec) {
            Some(export) => Ok(unsafe { cast_address(export.address) }),
            None => Err(Error::SymbolNotFound {
                symbol: spec.to_string(),
                library: self.library.clone(),
            }),
        }
    }

    /// Like [`function`](Self::function) for exports allowed to be absent.
    ///
    /// # Safety
    /// Same contract as [`function`](Self::function).
    pub unsafe fn optional<F: Copy>(&self, spec: &ExportSpec) -> Option<F> {
        self.get(spec)
            .map(|export| unsafe { cast_address(export.address) })
    }
}

unsafe fn cast_address<F: Copy>(address: NonNull<c_void>) -> F {
    const {
        assert!(
            mem::size_of::<F>() == mem::size_of::<*mut c_void>(),
            "export must be cast to a thin function pointer"
        );
    }
    let raw = address.as_ptr();
    unsafe { mem::transmute_copy::<*mut c_void, F>(&raw) }
}

/// Looks exports up in a [`SymbolSource`].
pub struct SymbolResolver<'a> {
    source: &'a dyn SymbolSource,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(source: &'a dyn SymbolSource) -> Self {
        Self { source }
    }

    /// Try the primary name, then the fallback.
    pub fn resolve(&self, spec: &ExportSpec) -> Option<ResolvedExport> {
        spec.candidates().find_map(|symbol| {
            self.source
                .address(symbol)
                .map(|address| ResolvedExport { symbol, address })
        })
    }

    /// Resolve every entry of `table`, or nothing at all.
    pub fn resolve_all(&self, table: &[ExportSpec]) -> Result<ResolvedExports> {
        let mut entries = AHashMap::with_capacity(table.len());

        for spec in table {
            match self.resolve(spec) {
                Some(export) => {
                    if export.symbol != spec.name {
                        debug!(export = spec.name, symbol = export.symbol, "bound fallback export");
                    }
                    trace!(export = spec.name, address = ?export.address, "resolved export");
                    entries.insert(spec.name, export);
                }
                None if spec.required => {
                    return Err(Error::SymbolNotFound {
                        symbol: spec.to_string(),
                        library: self.source.name().to_string(),
                    });
                }
                None => trace!(export = spec.name, "optional export absent"),
            }
        }

        debug!(
            library = self.source.name(),
            resolved = entries.len(),
            requested = table.len(),
            "resolved export table"
        );

        Ok(ResolvedExports {
            library: self.source.name().to_string(),
            entries,
        })
    }
}
