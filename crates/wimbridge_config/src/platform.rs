//! Platform description used to pick an ABI variant and a default library name
//!
//! The only facts the binding needs about a platform are its operating system,
//! its pointer width and the width of C `long`, which differs between LLP64
//! (Windows) and LP64 (everything else 64-bit).

use std::str::FromStr;

/// Target architecture/OS configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    /// Architecture (e.g., x86_64, aarch64, i686)
    pub arch: String,
    /// Vendor (e.g., unknown, apple, pc)
    pub vendor: String,
    /// Operating system (e.g., linux, darwin, windows)
    pub os: String,
    /// ABI/environment (e.g., gnu, msvc, musl)
    pub env: Option<String>,
}

impl TargetTriple {
    pub fn new(
        arch: impl Into<String>,
        vendor: impl Into<String>,
        os: impl Into<String>,
        env: Option<impl Into<String>>,
    ) -> Self {
        Self {
            arch: arch.into(),
            vendor: vendor.into(),
            os: os.into(),
            env: env.map(|e| e.into()),
        }
    }

    /// Parse a target triple string (e.g., "x86_64-unknown-linux-gnu")
    pub fn parse(triple: &str) -> Result<Self, String> {
        let parts: Vec<&str> = triple.split('-').collect();

        if parts.len() < 3 {
            return Err(format!("Invalid target triple format: {}", triple));
        }

        let mut arch = parts[0].to_string();
        if arch == "arm64" {
            arch = "aarch64".to_string();
        }

        let vendor = parts[1].to_string();

        // Strip version suffixes such as "darwin19.6.0"
        let raw_os = parts[2];
        let split_index = raw_os
            .char_indices()
            .find(|(_, ch)| ch.is_ascii_digit() || *ch == '.')
            .map_or(raw_os.len(), |(idx, _)| idx);
        let os = if split_index == 0 {
            raw_os.to_string()
        } else {
            raw_os[..split_index].to_string()
        };

        let env = if parts.len() > 3 {
            let env_str = parts[3..].join("-");
            if env_str.is_empty() {
                None
            } else {
                Some(env_str)
            }
        } else {
            None
        };

        Ok(Self {
            arch,
            vendor,
            os,
            env,
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    pub fn is_darwin(&self) -> bool {
        matches!(self.os.as_str(), "darwin" | "macos" | "ios")
    }

    /// Check if this is a Unix-like target
    pub fn is_unix(&self) -> bool {
        matches!(
            self.os.as_str(),
            "linux" | "darwin" | "macos" | "freebsd" | "openbsd" | "netbsd" | "dragonfly"
        )
    }

    /// Pointer width in bits, inferred from the architecture
    pub fn pointer_width(&self) -> Option<u32> {
        match self.arch.as_str() {
            "x86_64" | "aarch64" | "powerpc64" | "powerpc64le" | "riscv64gc" | "riscv64"
            | "s390x" | "loongarch64" | "sparc64" | "mips64" | "mips64el" | "wasm64" => Some(64),
            "i386" | "i586" | "i686" | "x86" | "powerpc" | "riscv32" | "mips" | "mipsel"
            | "wasm32" => Some(32),
            arch if arch.starts_with("arm") || arch.starts_with("thumb") => Some(32),
            _ => None,
        }
    }
}

impl FromStr for TargetTriple {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The facts about a platform that shape the foreign-function ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub arch: String,
    pub os: String,
    /// Width of a data pointer in bits
    pub pointer_width: u32,
    /// Width of C `long` in bits
    pub long_width: u32,
}

impl PlatformInfo {
    /// Describe the platform this binary was compiled for.
    pub fn host() -> Self {
        let pointer_width = if cfg!(target_pointer_width = "64") {
            64
        } else if cfg!(target_pointer_width = "32") {
            32
        } else {
            16
        };
        let long_width = (std::mem::size_of::<std::os::raw::c_long>() * 8) as u32;

        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            pointer_width,
            long_width,
        }
    }

    /// Describe a (possibly foreign) platform from its target triple.
    pub fn from_triple(triple: &TargetTriple) -> Result<Self, String> {
        let pointer_width = triple.pointer_width().ok_or_else(|| {
            format!(
                "unknown pointer width for architecture `{}`",
                triple.arch
            )
        })?;
        let long_width = if triple.is_windows() { 32 } else { pointer_width };
        let os = if triple.is_darwin() {
            "macos".to_string()
        } else {
            triple.os.clone()
        };

        Ok(Self {
            arch: triple.arch.clone(),
            os,
            pointer_width,
            long_width,
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// File name the native library ships under on this platform.
    pub fn default_library_name(&self) -> Option<&'static str> {
        match self.os.as_str() {
            "windows" => Some("libwim-15.dll"),
            "macos" => Some("libwim.15.dylib"),
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" | "android" => {
                Some("libwim.so.15")
            }
            _ => None,
        }
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triple() {
        let triple = TargetTriple::parse("x86_64-unknown-linux-gnu").unwrap();
        assert_eq!(triple.arch, "x86_64");
        assert_eq!(triple.vendor, "unknown");
        assert_eq!(triple.os, "linux");
        assert_eq!(triple.env, Some("gnu".to_string()));
    }

    #[test]
    fn test_parse_strips_os_version() {
        let triple: TargetTriple = "arm64-apple-darwin19.6.0".parse().unwrap();
        assert_eq!(triple.arch, "aarch64");
        assert_eq!(triple.os, "darwin");
        assert!(triple.env.is_none());
    }

    #[test]
    fn test_rejects_short_triple() {
        assert!(TargetTriple::parse("x86_64-linux").is_err());
    }

    #[test]
    fn windows_long_is_32_bits() {
        let triple = TargetTriple::parse("x86_64-pc-windows-msvc").unwrap();
        let platform = PlatformInfo::from_triple(&triple).unwrap();
        assert_eq!(platform.pointer_width, 64);
        assert_eq!(platform.long_width, 32);
        assert_eq!(platform.default_library_name(), Some("libwim-15.dll"));
    }

    #[test]
    fn lp64_long_matches_pointer() {
        let triple = TargetTriple::parse("aarch64-apple-darwin").unwrap();
        let platform = PlatformInfo::from_triple(&triple).unwrap();
        assert_eq!(platform.long_width, 64);
        assert_eq!(platform.default_library_name(), Some("libwim.15.dylib"));

        let triple = TargetTriple::parse("i686-unknown-linux-gnu").unwrap();
        let platform = PlatformInfo::from_triple(&triple).unwrap();
        assert_eq!(platform.long_width, 32);
        assert_eq!(platform.default_library_name(), Some("libwim.so.15"));
    }

    #[test]
    fn unknown_os_has_no_library_name() {
        let triple = TargetTriple::parse("wasm32-unknown-unknown").unwrap();
        let platform = PlatformInfo::from_triple(&triple).unwrap();
        assert!(platform.default_library_name().is_none());
    }

    #[test]
    fn host_long_width_matches_c_long() {
        let host = PlatformInfo::host();
        assert_eq!(
            host.long_width as usize,
            std::mem::size_of::<std::os::raw::c_long>() * 8
        );
    }
}
