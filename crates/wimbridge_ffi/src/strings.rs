//! `tchar` string marshaling for both encodings.

use std::ffi::{CStr, CString, c_char, c_void};
use std::path::Path;

use wimbridge_config::StringEncoding;

use crate::error::{Error, Result};

/// An owned NUL-terminated buffer in the bound encoding.
///
/// The heap buffer does not move when the value does, so pointers taken from
/// [`as_ptr`](Self::as_ptr) stay valid for as long as the value is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeString {
    Narrow(CString),
    Wide(Vec<u16>),
}

impl NativeString {
    pub fn encode(text: &str, encoding: StringEncoding) -> Result<Self> {
        match encoding {
            StringEncoding::Utf8 => CString::new(text)
                .map(NativeString::Narrow)
                .map_err(|_| interior_nul(text)),
            StringEncoding::Utf16 => {
                let mut units: Vec<u16> = text.encode_utf16().collect();
                if units.contains(&0) {
                    return Err(interior_nul(text));
                }
                units.push(0);
                Ok(NativeString::Wide(units))
            }
        }
    }

    pub fn from_path(path: &Path, encoding: StringEncoding) -> Result<Self> {
        match encoding {
            #[cfg(unix)]
            StringEncoding::Utf8 => {
                use std::os::unix::ffi::OsStrExt;
                CString::new(path.as_os_str().as_bytes())
                    .map(NativeString::Narrow)
                    .map_err(|_| interior_nul(&path.display().to_string()))
            }
            #[cfg(windows)]
            StringEncoding::Utf16 => {
                use std::os::windows::ffi::OsStrExt;
                let mut units: Vec<u16> = path.as_os_str().encode_wide().collect();
                if units.contains(&0) {
                    return Err(interior_nul(&path.display().to_string()));
                }
                units.push(0);
                Ok(NativeString::Wide(units))
            }
            _ => {
                let text = path.to_str().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "path {} is not representable in {}",
                        path.display(),
                        encoding
                    ))
                })?;
                Self::encode(text, encoding)
            }
        }
    }

    pub fn encoding(&self) -> StringEncoding {
        match self {
            NativeString::Narrow(_) => StringEncoding::Utf8,
            NativeString::Wide(_) => StringEncoding::Utf16,
        }
    }

    pub fn as_ptr(&self) -> *const c_void {
        match self {
            NativeString::Narrow(text) => text.as_ptr().cast(),
            NativeString::Wide(units) => units.as_ptr().cast(),
        }
    }
}

fn interior_nul(text: &str) -> Error {
    Error::InvalidArgument(format!("string {text:?} contains an interior NUL"))
}

/// Pointer for an optional argument; absent values become null.
pub fn opt_ptr(value: Option<&NativeString>) -> *const c_void {
    value.map_or(std::ptr::null(), NativeString::as_ptr)
}

/// Copy a native string returned by the library.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer in `encoding` that
/// stays valid for the duration of the call.
pub unsafe fn decode(ptr: *const c_void, encoding: StringEncoding) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    let text = match encoding {
        StringEncoding::Utf8 => unsafe { CStr::from_ptr(ptr.cast::<c_char>()) }
            .to_string_lossy()
            .into_owned(),
        StringEncoding::Utf16 => {
            let start = ptr.cast::<u16>();
            let mut len = 0usize;
            while unsafe { *start.add(len) } != 0 {
                len += 1;
            }
            let units = unsafe { std::slice::from_raw_parts(start, len) };
            String::from_utf16_lossy(units)
        }
    };
    Some(text)
}
