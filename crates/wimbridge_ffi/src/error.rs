use std::path::PathBuf;

use thiserror::Error;

use crate::codes::ErrorCode;

/// Failures surfaced by the binding.
///
/// A native library built without diagnostics support is not an error; the
/// error channel reports it through [`crate::PrintState::Unsupported`].
#[derive(Error, Debug)]
pub enum Error {
    /// The dynamic loader could not open the module.
    #[error("failed to load native library {}: {source}", .path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A mandatory export is missing; the load was abandoned.
    #[error("native export `{symbol}` not found in {library}")]
    SymbolNotFound { symbol: String, library: String },

    /// No library name or struct layout is defined for this platform.
    #[error("unsupported platform: {0}")]
    PlatformUnsupported(String),

    /// A foreign call returned something other than success.
    #[error(
        "{operation} failed: {code}{}{}",
        .description.as_deref().map(|d| format!(", {d}")).unwrap_or_default(),
        .last_log.as_deref().map(|l| format!(" [{l}]")).unwrap_or_default()
    )]
    NativeCall {
        operation: &'static str,
        code: ErrorCode,
        description: Option<String>,
        last_log: Option<String>,
    },

    /// A caller-supplied callback asked the native operation to stop.
    #[error("{operation} was cancelled by a callback")]
    Cancelled { operation: &'static str },

    #[error("native library is already loaded from {0}")]
    AlreadyLoaded(String),

    #[error("native library is not loaded")]
    NotLoaded,

    /// An optional export the operation needs was absent at load time.
    #[error("native export `{0}` is not available in the loaded library")]
    ExportUnavailable(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Native code carried by a failed call, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::NativeCall { code, .. } => Some(*code),
            Error::Cancelled { .. } => Some(ErrorCode::ABORTED_BY_PROGRESS),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
