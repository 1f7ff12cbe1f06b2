use std::ffi::c_void;
use std::fmt;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tracing::debug;
use wimbridge_config::{AbiVariant, BindingConfig, StringEncoding};

use crate::callbacks::{ProgressHandler, progress_trampoline};
use crate::codes::{CompressionType, ErrorCode};
use crate::dynamic_loader::SymbolSource;
use crate::error::{Error, Result};
use crate::error_channel::ErrorChannel;
use crate::exports::{EXPORT_TABLE, Exports, GET_VERSION_STRING, WimStruct};
use crate::resolver::SymbolResolver;
use crate::strings::{NativeString, decode};
use crate::wim::Wim;

/// Packed native version number, `major << 20 | minor << 10 | patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl From<u32> for Version {
    fn from(raw: u32) -> Self {
        Self {
            major: raw >> 20,
            minor: (raw >> 10) & 0x3ff,
            patch: raw & 0x3ff,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A native library that is resolved, initialised and ready for calls.
///
/// Dropping it runs global cleanup, switches diagnostics off and releases
/// the module handle, in that order.
pub struct NativeLibrary {
    variant: AbiVariant,
    exports: Exports,
    diagnostics: ErrorChannel,
    symbols_resolved: usize,
    // Declared last so the module outlives every pointer above.
    source: Arc<dyn SymbolSource>,
}

impl NativeLibrary {
    pub(crate) fn open(
        source: Arc<dyn SymbolSource>,
        variant: AbiVariant,
        config: &BindingConfig,
    ) -> Result<Self> {
        let resolved = SymbolResolver::new(source.as_ref()).resolve_all(EXPORT_TABLE)?;
        let exports = Exports::bind(&resolved)?;

        let code = ErrorCode::from(unsafe { (exports.global_init)(config.init_flags as c_int) });
        if !code.is_success() {
            let description =
                unsafe { decode((exports.get_error_string)(code.0), variant.encoding) };
            return Err(Error::NativeCall {
                operation: "wimlib_global_init",
                code,
                description,
                last_log: None,
            });
        }

        let library = Self {
            variant,
            exports,
            diagnostics: ErrorChannel::new((&exports).into(), variant.encoding),
            symbols_resolved: resolved.len(),
            source,
        };

        // From here on a failure drops `library`, which undoes the global init.
        if config.print_errors {
            library
                .diagnostics
                .set_temporary_error_file(config.error_file_dir.as_deref())?;
        }

        debug!(
            library = library.source.name(),
            variant = %variant,
            exports = library.symbols_resolved,
            "native library initialised"
        );
        Ok(library)
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn variant(&self) -> AbiVariant {
        self.variant
    }

    pub fn encoding(&self) -> StringEncoding {
        self.variant.encoding
    }

    /// Number of exports bound at load time, optional ones included.
    pub fn symbols_resolved(&self) -> usize {
        self.symbols_resolved
    }

    pub fn exports(&self) -> &Exports {
        &self.exports
    }

    pub fn diagnostics(&self) -> &ErrorChannel {
        &self.diagnostics
    }

    pub fn version(&self) -> Version {
        Version::from(unsafe { (self.exports.get_version)() })
    }

    pub fn version_string(&self) -> Result<String> {
        let get = self
            .exports
            .get_version_string
            .ok_or(Error::ExportUnavailable(GET_VERSION_STRING.name))?;
        Ok(unsafe { decode(get(), self.encoding()) }.unwrap_or_default())
    }

    /// Static description of a native return code.
    pub fn error_string(&self, code: ErrorCode) -> Option<String> {
        unsafe { decode((self.exports.get_error_string)(code.0), self.encoding()) }
    }

    pub fn create_new_wim(&self, compression: CompressionType) -> Result<Wim<'_>> {
        let mut raw: *mut WimStruct = ptr::null_mut();
        let code = unsafe { (self.exports.create_new_wim)(compression as c_int, &mut raw) };
        self.check("wimlib_create_new_wim", code)?;
        self.adopt("wimlib_create_new_wim", raw, None)
    }

    pub fn open_wim(&self, path: &Path, open_flags: i32) -> Result<Wim<'_>> {
        let path = self.native_path(path)?;
        let mut raw: *mut WimStruct = ptr::null_mut();
        let code = unsafe { (self.exports.open_wim)(path.as_ptr(), open_flags, &mut raw) };
        self.check("wimlib_open_wim", code)?;
        self.adopt("wimlib_open_wim", raw, None)
    }

    /// Open an archive with `handler` registered for the lifetime of the handle.
    pub fn open_wim_with_progress(
        &self,
        path: &Path,
        open_flags: i32,
        handler: ProgressHandler,
    ) -> Result<Wim<'_>> {
        let path = self.native_path(path)?;
        let mut handler = Box::new(handler);
        let ctx: *mut c_void = (&mut *handler as *mut ProgressHandler).cast();
        let mut raw: *mut WimStruct = ptr::null_mut();
        let code = unsafe {
            (self.exports.open_wim_with_progress)(
                path.as_ptr(),
                open_flags,
                &mut raw,
                Some(progress_trampoline),
                ctx,
            )
        };
        self.check("wimlib_open_wim_with_progress", code)?;
        self.adopt("wimlib_open_wim_with_progress", raw, Some(handler))
    }

    fn adopt(
        &self,
        operation: &'static str,
        raw: *mut WimStruct,
        progress: Option<Box<ProgressHandler>>,
    ) -> Result<Wim<'_>> {
        let raw = NonNull::new(raw).ok_or(Error::NativeCall {
            operation,
            code: ErrorCode::INVALID_PARAM,
            description: Some("library reported success but returned no handle".into()),
            last_log: None,
        })?;
        Ok(Wim::new(self, raw, progress))
    }

    pub(crate) fn native_string(&self, text: &str) -> Result<NativeString> {
        NativeString::encode(text, self.encoding())
    }

    pub(crate) fn native_path(&self, path: &Path) -> Result<NativeString> {
        NativeString::from_path(path, self.encoding())
    }

    /// Compare a native return value with the success sentinel.
    pub(crate) fn check(&self, operation: &'static str, raw: c_int) -> Result<()> {
        let code = ErrorCode::from(raw);
        if code.is_success() {
            Ok(())
        } else {
            Err(self.failure(operation, code))
        }
    }

    pub(crate) fn failure(&self, operation: &'static str, code: ErrorCode) -> Error {
        if code == ErrorCode::ABORTED_BY_PROGRESS {
            return Error::Cancelled { operation };
        }
        Error::NativeCall {
            operation,
            code,
            description: self.error_string(code),
            last_log: self.diagnostics.last_error(),
        }
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("name", &self.source.name())
            .field("variant", &self.variant)
            .field("symbols_resolved", &self.symbols_resolved)
            .field("print_state", &self.diagnostics.print_state())
            .finish()
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        unsafe { (self.exports.global_cleanup)() };
        self.diagnostics.shutdown();
        debug!(library = self.source.name(), "native library released");
    }
}
