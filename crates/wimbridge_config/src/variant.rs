//! ABI variant selection
//!
//! The native library exists in a narrow (UTF-8) and a wide (UTF-16) build,
//! and any transfer struct carrying a C `long` changes shape with the
//! platform's `long` width. A loaded binding commits to exactly one
//! combination of the two.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::PlatformInfo;

/// String encoding used for every `tchar` argument and return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringEncoding {
    /// NUL-terminated `char` buffers holding UTF-8
    Utf8,
    /// NUL-terminated `u16` buffers holding UTF-16
    Utf16,
}

impl StringEncoding {
    /// The encoding the native library is usually built with on `platform`.
    pub fn platform_default(platform: &PlatformInfo) -> Self {
        if platform.is_windows() {
            StringEncoding::Utf16
        } else {
            StringEncoding::Utf8
        }
    }
}

impl std::str::FromStr for StringEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utf8" | "utf-8" | "narrow" | "ansi" => Ok(StringEncoding::Utf8),
            "utf16" | "utf-16" | "wide" | "unicode" => Ok(StringEncoding::Utf16),
            _ => Err(format!("Unknown string encoding: {}", s)),
        }
    }
}

impl fmt::Display for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringEncoding::Utf8 => write!(f, "utf-8"),
            StringEncoding::Utf16 => write!(f, "utf-16"),
        }
    }
}

/// Width of the `long` fields embedded in transfer structs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructLayout {
    Long32,
    Long64,
}

impl StructLayout {
    pub fn for_platform(platform: &PlatformInfo) -> Result<Self, String> {
        match platform.long_width {
            32 => Ok(StructLayout::Long32),
            64 => Ok(StructLayout::Long64),
            other => Err(format!(
                "no transfer struct layout for {}-bit `long` on {}-{}",
                other, platform.arch, platform.os
            )),
        }
    }
}

/// One coherent calling convention for a loaded library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbiVariant {
    pub encoding: StringEncoding,
    pub layout: StructLayout,
}

impl AbiVariant {
    pub fn new(encoding: StringEncoding, layout: StructLayout) -> Self {
        Self { encoding, layout }
    }

    /// Combine an explicit encoding choice with the platform's struct layout.
    pub fn select(encoding: StringEncoding, platform: &PlatformInfo) -> Result<Self, String> {
        let layout = StructLayout::for_platform(platform)?;
        Ok(Self { encoding, layout })
    }
}

impl fmt::Display for AbiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = match self.layout {
            StructLayout::Long32 => 32,
            StructLayout::Long64 => 64,
        };
        write!(f, "{}/long{}", self.encoding, width)
    }
}
