//! Runtime binding to the native `libwim` archive library.
//!
//! The library is opened at run time, every export is resolved up front and
//! the string encoding and struct layout are fixed for the lifetime of one
//! load. [`WimLib`] owns that state; [`Wim`] handles borrow from it.

pub mod callbacks;
pub mod codes;
pub mod dynamic_loader;
pub mod error;
pub mod error_channel;
pub mod exports;
pub mod library;
pub mod lifecycle;
pub mod marshal;
pub mod resolver;
pub mod strings;
pub mod wim;

pub use callbacks::{
    CallbackStatus, DirEntry, IterationOutcome, ProgressHandler, ProgressMessage, ProgressStatus,
    ResourceEntry, Timestamp,
};
pub use codes::{CompressionType, ErrorCode};
pub use dynamic_loader::{DynamicLibrary, DynamicLibraryLoader, SymbolSource};
pub use error::{Error, Result};
pub use error_channel::{ErrorChannel, PrintState};
pub use exports::{EXPORT_TABLE, Exports};
pub use library::{NativeLibrary, Version};
pub use lifecycle::WimLib;
pub use marshal::{CaptureSource, CaptureSourceArray};
pub use resolver::{ExportSpec, ResolvedExports, SymbolResolver};
pub use strings::NativeString;
pub use wim::{Wim, WimInfo};
