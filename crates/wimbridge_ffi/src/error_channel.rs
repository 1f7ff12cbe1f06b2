//! Bridge to the native diagnostics log.
//!
//! The library reports warnings and errors by appending lines to a file it
//! was told about, not through return values. This module owns that file and
//! turns its contents into queryable strings.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempPath;
use tracing::debug;
use wimbridge_config::StringEncoding;

use crate::codes::ErrorCode;
use crate::error::{Error, Result};
use crate::exports::{Exports, SetErrorFileByNameFn, SetPrintErrorsFn};
use crate::strings::NativeString;

/// Whether the native library is writing diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintState {
    Off,
    On,
    /// The library was built without diagnostics support
    Unsupported,
}

#[derive(Debug)]
enum TrackedFile {
    /// Created by the binding and removed when dropped
    Temporary(TempPath),
    /// Supplied by the caller
    External(PathBuf),
}

impl TrackedFile {
    fn path(&self) -> &Path {
        match self {
            TrackedFile::Temporary(path) => &**path,
            TrackedFile::External(path) => path.as_path(),
        }
    }

    fn discard(self) {
        match self {
            TrackedFile::Temporary(path) => {
                if let Err(err) = path.close() {
                    debug!(error = %err, "failed to remove temporary error file");
                }
            }
            TrackedFile::External(path) => {
                if path.exists()
                    && let Err(err) = std::fs::remove_file(&path)
                {
                    debug!(path = %path.display(), error = %err, "failed to remove error file");
                }
            }
        }
    }
}

#[derive(Debug)]
struct ChannelState {
    file: Option<TrackedFile>,
    print: PrintState,
}

/// The two native entry points the channel drives.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsExports {
    pub set_error_file_by_name: SetErrorFileByNameFn,
    pub set_print_errors: SetPrintErrorsFn,
}

impl From<&Exports> for DiagnosticsExports {
    fn from(exports: &Exports) -> Self {
        Self {
            set_error_file_by_name: exports.set_error_file_by_name,
            set_print_errors: exports.set_print_errors,
        }
    }
}

/// Diagnostics log of one loaded library.
///
/// One mutex serialises every operation, so a thread switching the file can
/// never interleave with another thread reading the last error.
#[derive(Debug)]
pub struct ErrorChannel {
    state: Mutex<ChannelState>,
    exports: DiagnosticsExports,
    encoding: StringEncoding,
}

impl ErrorChannel {
    pub fn new(exports: DiagnosticsExports, encoding: StringEncoding) -> Self {
        Self {
            state: Mutex::new(ChannelState {
                file: None,
                print: PrintState::Off,
            }),
            exports,
            encoding,
        }
    }

    /// Direct native diagnostics to `path`, opened by the library for append.
    pub fn set_error_file(&self, path: &Path) -> Result<PrintState> {
        self.install(TrackedFile::External(path.to_path_buf()))
    }

    /// Direct native diagnostics to a fresh temporary file.
    pub fn set_temporary_error_file(&self, dir: Option<&Path>) -> Result<PrintState> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("wimbridge-errors-").suffix(".log");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        self.install(TrackedFile::Temporary(file.into_temp_path()))
    }

    fn install(&self, file: TrackedFile) -> Result<PrintState> {
        let native_path = NativeString::from_path(file.path(), self.encoding)?;
        let mut state = self.state.lock();

        let code =
            ErrorCode::from(unsafe { (self.exports.set_error_file_by_name)(native_path.as_ptr()) });
        if code == ErrorCode::UNSUPPORTED {
            debug!("native library has no diagnostics support");
            if let Some(previous) = state.file.take() {
                previous.discard();
            }
            // A caller's file was never tracked and is left alone.
            if let TrackedFile::Temporary(path) = file {
                TrackedFile::Temporary(path).discard();
            }
            state.print = PrintState::Unsupported;
            return Ok(PrintState::Unsupported);
        }
        if !code.is_success() {
            // The requested file is not tracked; a temporary one goes away here.
            return Err(Error::NativeCall {
                operation: "wimlib_set_error_file_by_name",
                code,
                description: None,
                last_log: None,
            });
        }

        debug!(path = %file.path().display(), "diagnostics redirected");
        if let Some(TrackedFile::Temporary(previous)) = state.file.replace(file) {
            TrackedFile::Temporary(previous).discard();
        }
        state.print = PrintState::On;
        Ok(PrintState::On)
    }

    /// Turn native diagnostics on or off.
    pub fn set_print_errors(&self, enabled: bool) -> Result<PrintState> {
        let mut state = self.state.lock();
        Self::apply_print_errors(&self.exports, &mut state, enabled)
    }

    fn apply_print_errors(
        exports: &DiagnosticsExports,
        state: &mut ChannelState,
        enabled: bool,
    ) -> Result<PrintState> {
        let code = ErrorCode::from(unsafe { (exports.set_print_errors)(enabled) });
        if code == ErrorCode::UNSUPPORTED {
            state.print = PrintState::Unsupported;
            return Ok(PrintState::Unsupported);
        }
        if !code.is_success() {
            return Err(Error::NativeCall {
                operation: "wimlib_set_print_errors",
                code,
                description: None,
                last_log: None,
            });
        }

        state.print = if enabled { PrintState::On } else { PrintState::Off };
        Ok(state.print)
    }

    pub fn print_state(&self) -> PrintState {
        self.state.lock().print
    }

    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Path of the tracked log file, if any.
    pub fn error_file(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .file
            .as_ref()
            .map(|file| file.path().to_path_buf())
    }

    /// Most recent non-empty line of the log.
    pub fn last_error(&self) -> Option<String> {
        self.read_lines().pop()
    }

    /// Every non-empty line of the log, oldest first.
    pub fn all_errors(&self) -> Vec<String> {
        self.read_lines()
    }

    fn read_lines(&self) -> Vec<String> {
        let state = self.state.lock();
        if state.print != PrintState::On {
            return Vec::new();
        }
        let Some(file) = state.file.as_ref() else {
            return Vec::new();
        };

        match read_shared(file.path()) {
            Ok(contents) => split_log(&contents),
            Err(err) => {
                debug!(path = %file.path().display(), error = %err, "error file unreadable");
                Vec::new()
            }
        }
    }

    /// Empty the tracked log.
    pub fn reset_error_file(&self) -> Result<()> {
        let state = self.state.lock();
        if state.print != PrintState::On {
            return Ok(());
        }
        if let Some(file) = state.file.as_ref() {
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .create(true)
                .open(file.path())?;
        }
        Ok(())
    }

    /// Disable diagnostics and drop the tracked file.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.print != PrintState::Unsupported
            && let Err(err) = Self::apply_print_errors(&self.exports, &mut state, false)
        {
            debug!(error = %err, "failed to disable native diagnostics");
        }
        if let Some(TrackedFile::Temporary(path)) = state.file.take() {
            TrackedFile::Temporary(path).discard();
        }
    }
}

/// Read the whole file without excluding a concurrent appender.
fn read_shared(path: &Path) -> std::io::Result<String> {
    let mut options = OpenOptions::new();
    options.read(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        // FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE
        options.share_mode(0x1 | 0x2 | 0x4);
    }
    let mut file: File = options.open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn split_log(contents: &str) -> Vec<String> {
    contents
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
