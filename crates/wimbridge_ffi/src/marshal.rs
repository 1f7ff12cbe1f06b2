//! Fixed-layout transfer structs whose shape depends on the ABI variant.
//!
//! `struct wimlib_capture_source` ends in a C `long`, so it has a distinct
//! shape for each `long` width, and its string pointers point at `char` or
//! `u16` depending on the encoding. All four shapes live here; nothing else in
//! the crate needs to know about them.

use std::ffi::{c_char, c_void};
use std::mem;
use std::path::{Path, PathBuf};

use wimbridge_config::{AbiVariant, StringEncoding, StructLayout};

use crate::error::Result;
use crate::strings::NativeString;

/// Capture source with a 32-bit `reserved` field
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CaptureSourceLong32<C> {
    pub fs_source_path: *const C,
    pub wim_target_path: *const C,
    pub reserved: i32,
}

/// Capture source with a 64-bit `reserved` field
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CaptureSourceLong64<C> {
    pub fs_source_path: *const C,
    pub wim_target_path: *const C,
    pub reserved: i64,
}

/// One filesystem tree to place inside a new image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSource {
    pub fs_source_path: PathBuf,
    /// Destination inside the image; `/` is the image root
    pub wim_target_path: String,
}

impl CaptureSource {
    pub fn new(fs_source_path: impl AsRef<Path>, wim_target_path: impl Into<String>) -> Self {
        Self {
            fs_source_path: fs_source_path.as_ref().to_path_buf(),
            wim_target_path: wim_target_path.into(),
        }
    }
}

#[derive(Debug)]
enum Entries {
    NarrowLong32(Vec<CaptureSourceLong32<c_char>>),
    NarrowLong64(Vec<CaptureSourceLong64<c_char>>),
    WideLong32(Vec<CaptureSourceLong32<u16>>),
    WideLong64(Vec<CaptureSourceLong64<u16>>),
}

/// A native array of capture sources built for a single call.
#[derive(Debug)]
pub struct CaptureSourceArray {
    entries: Entries,
    // Backing storage for the pointers held in `entries`.
    _strings: Vec<(NativeString, NativeString)>,
    variant: AbiVariant,
}

impl CaptureSourceArray {
    pub fn build(sources: &[CaptureSource], variant: AbiVariant) -> Result<Self> {
        let strings = sources
            .iter()
            .map(|source| {
                Ok((
                    NativeString::from_path(&source.fs_source_path, variant.encoding)?,
                    NativeString::encode(&source.wim_target_path, variant.encoding)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let entries = match (variant.encoding, variant.layout) {
            (StringEncoding::Utf8, StructLayout::Long32) => {
                Entries::NarrowLong32(strings.iter().map(long32).collect())
            }
            (StringEncoding::Utf8, StructLayout::Long64) => {
                Entries::NarrowLong64(strings.iter().map(long64).collect())
            }
            (StringEncoding::Utf16, StructLayout::Long32) => {
                Entries::WideLong32(strings.iter().map(long32).collect())
            }
            (StringEncoding::Utf16, StructLayout::Long64) => {
                Entries::WideLong64(strings.iter().map(long64).collect())
            }
        };

        Ok(Self {
            entries,
            _strings: strings,
            variant,
        })
    }

    pub fn variant(&self) -> AbiVariant {
        self.variant
    }

    /// Element count, passed to the library as `size_t`.
    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::NarrowLong32(v) => v.len(),
            Entries::NarrowLong64(v) => v.len(),
            Entries::WideLong32(v) => v.len(),
            Entries::WideLong64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of one element.
    pub fn stride(&self) -> usize {
        match &self.entries {
            Entries::NarrowLong32(_) => mem::size_of::<CaptureSourceLong32<c_char>>(),
            Entries::NarrowLong64(_) => mem::size_of::<CaptureSourceLong64<c_char>>(),
            Entries::WideLong32(_) => mem::size_of::<CaptureSourceLong32<u16>>(),
            Entries::WideLong64(_) => mem::size_of::<CaptureSourceLong64<u16>>(),
        }
    }

    pub fn as_ptr(&self) -> *const c_void {
        match &self.entries {
            Entries::NarrowLong32(v) => v.as_ptr().cast(),
            Entries::NarrowLong64(v) => v.as_ptr().cast(),
            Entries::WideLong32(v) => v.as_ptr().cast(),
            Entries::WideLong64(v) => v.as_ptr().cast(),
        }
    }
}

fn long32<C>((source, target): &(NativeString, NativeString)) -> CaptureSourceLong32<C> {
    CaptureSourceLong32 {
        fs_source_path: source.as_ptr().cast(),
        wim_target_path: target.as_ptr().cast(),
        reserved: 0,
    }
}

fn long64<C>((source, target): &(NativeString, NativeString)) -> CaptureSourceLong64<C> {
    CaptureSourceLong64 {
        fs_source_path: source.as_ptr().cast(),
        wim_target_path: target.as_ptr().cast(),
        reserved: 0,
    }
}
