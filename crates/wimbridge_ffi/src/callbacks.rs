//! Synchronous callbacks driven by the native library.
//!
//! Iteration and progress callbacks run on the calling thread while the
//! foreign call is in progress. Closures are passed through the opaque
//! context pointer and reached again from `extern "C"` trampolines.

use std::ffi::c_void;
use std::os::raw::c_int;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;
use wimbridge_config::StringEncoding;

use crate::codes::ErrorCode;
use crate::strings::decode;

/// Returned to the native iterator when a closure asks to stop early.
///
/// Native error codes are non-negative, so a negative value cannot be
/// mistaken for a failure.
pub const ITERATION_STOPPED: c_int = -1;

/// What an iteration closure wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Continue,
    /// End the iteration successfully
    Stop,
    /// End the iteration and report cancellation
    Abort,
}

impl CallbackStatus {
    fn raw(self) -> c_int {
        match self {
            CallbackStatus::Continue => 0,
            CallbackStatus::Stop => ITERATION_STOPPED,
            CallbackStatus::Abort => ErrorCode::ABORTED_BY_PROGRESS.0,
        }
    }
}

/// How a successful iteration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Completed,
    Stopped,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTimespec {
    pub tv_sec: i64,
    pub tv_nsec: i32,
}

/// Leading fields of `struct wimlib_dir_entry`. The native struct continues
/// with fields this binding does not read.
#[repr(C)]
#[derive(Debug)]
pub struct RawDirEntry {
    pub filename: *const c_void,
    pub dos_name: *const c_void,
    pub full_path: *const c_void,
    pub depth: usize,
    pub security_descriptor: *const c_void,
    pub security_descriptor_size: usize,
    pub attributes: u32,
    pub reparse_tag: u32,
    pub num_links: u32,
    pub num_named_streams: u32,
    pub hard_link_group_id: u64,
    pub creation_time: RawTimespec,
    pub last_write_time: RawTimespec,
    pub last_access_time: RawTimespec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: i32,
}

impl From<RawTimespec> for Timestamp {
    fn from(raw: RawTimespec) -> Self {
        Self {
            seconds: raw.tv_sec,
            nanoseconds: raw.tv_nsec,
        }
    }
}

/// A file or directory inside an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub filename: String,
    pub dos_name: Option<String>,
    pub full_path: String,
    pub depth: usize,
    pub security_descriptor: Vec<u8>,
    pub attributes: u32,
    pub reparse_tag: u32,
    pub num_links: u32,
    pub num_named_streams: u32,
    pub hard_link_group_id: u64,
    pub creation_time: Timestamp,
    pub last_write_time: Timestamp,
    pub last_access_time: Timestamp,
}

impl DirEntry {
    pub const ATTRIBUTE_DIRECTORY: u32 = 0x0000_0010;
    pub const ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;

    pub fn is_directory(&self) -> bool {
        self.attributes & Self::ATTRIBUTE_DIRECTORY != 0
    }

    /// # Safety
    /// `raw` must point to a live `wimlib_dir_entry` whose strings use `encoding`.
    unsafe fn decode(raw: &RawDirEntry, encoding: StringEncoding) -> Self {
        let security_descriptor = if raw.security_descriptor.is_null() {
            Vec::new()
        } else {
            unsafe {
                std::slice::from_raw_parts(
                    raw.security_descriptor.cast::<u8>(),
                    raw.security_descriptor_size,
                )
            }
            .to_vec()
        };

        Self {
            filename: unsafe { decode(raw.filename, encoding) }.unwrap_or_default(),
            dos_name: unsafe { decode(raw.dos_name, encoding) },
            full_path: unsafe { decode(raw.full_path, encoding) }.unwrap_or_default(),
            depth: raw.depth,
            security_descriptor,
            attributes: raw.attributes,
            reparse_tag: raw.reparse_tag,
            num_links: raw.num_links,
            num_named_streams: raw.num_named_streams,
            hard_link_group_id: raw.hard_link_group_id,
            creation_time: raw.creation_time.into(),
            last_write_time: raw.last_write_time.into(),
            last_access_time: raw.last_access_time.into(),
        }
    }
}

/// Leading fields of `struct wimlib_resource_entry`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawResourceEntry {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub offset: u64,
    pub sha1_hash: [u8; 20],
    pub part_number: u32,
    pub reference_count: u32,
    pub flags: u32,
    pub raw_resource_offset_in_wim: u64,
    pub raw_resource_compressed_size: u64,
    pub raw_resource_uncompressed_size: u64,
}

/// A blob in the archive's lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub offset: u64,
    pub sha1_hash: [u8; 20],
    pub part_number: u32,
    pub reference_count: u32,
    pub is_compressed: bool,
    pub is_metadata: bool,
    pub is_free: bool,
    pub is_spanned: bool,
    pub is_missing: bool,
    pub packed: bool,
}

impl ResourceEntry {
    pub fn sha1_hex(&self) -> String {
        self.sha1_hash.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl From<&RawResourceEntry> for ResourceEntry {
    fn from(raw: &RawResourceEntry) -> Self {
        let bit = |n: u32| raw.flags & (1 << n) != 0;
        Self {
            uncompressed_size: raw.uncompressed_size,
            compressed_size: raw.compressed_size,
            offset: raw.offset,
            sha1_hash: raw.sha1_hash,
            part_number: raw.part_number,
            reference_count: raw.reference_count,
            is_compressed: bit(0),
            is_metadata: bit(1),
            is_free: bit(2),
            is_spanned: bit(3),
            is_missing: bit(4),
            packed: bit(5),
        }
    }
}

pub type DirEntryCallback =
    unsafe extern "C" fn(dentry: *const RawDirEntry, user_ctx: *mut c_void) -> c_int;

pub type ResourceCallback =
    unsafe extern "C" fn(resource: *const RawResourceEntry, user_ctx: *mut c_void) -> c_int;

pub type ProgressFunc =
    unsafe extern "C" fn(msg_type: c_int, info: *mut c_void, progctx: *mut c_void) -> c_int;

/// State shared between one iteration call and its trampoline.
pub(crate) struct IterationContext<'f, F> {
    callback: &'f mut F,
    encoding: StringEncoding,
    finished: Option<c_int>,
}

impl<'f, F> IterationContext<'f, F> {
    pub(crate) fn new(callback: &'f mut F, encoding: StringEncoding) -> Self {
        Self {
            callback,
            encoding,
            finished: None,
        }
    }

    pub(crate) fn as_ctx(&mut self) -> *mut c_void {
        (self as *mut Self).cast()
    }

    pub(crate) fn dir_entry_callback(&self) -> DirEntryCallback
    where
        F: FnMut(&DirEntry) -> CallbackStatus,
    {
        dir_entry_trampoline::<F>
    }

    pub(crate) fn resource_callback(&self) -> ResourceCallback
    where
        F: FnMut(&ResourceEntry) -> CallbackStatus,
    {
        resource_trampoline::<F>
    }

    // Once the closure has asked to end the iteration it is never called again.
    fn dispatch(&mut self, call: impl FnOnce(&mut F) -> CallbackStatus) -> c_int {
        if let Some(code) = self.finished {
            return code;
        }

        let status = match catch_unwind(AssertUnwindSafe(|| call(&mut *self.callback))) {
            Ok(status) => status,
            Err(_) => {
                warn!("iteration callback panicked; aborting native iteration");
                CallbackStatus::Abort
            }
        };

        let code = status.raw();
        if status != CallbackStatus::Continue {
            self.finished = Some(code);
        }
        code
    }
}

pub(crate) unsafe extern "C" fn dir_entry_trampoline<F>(
    dentry: *const RawDirEntry,
    user_ctx: *mut c_void,
) -> c_int
where
    F: FnMut(&DirEntry) -> CallbackStatus,
{
    let Some(ctx) = (unsafe { user_ctx.cast::<IterationContext<F>>().as_mut() }) else {
        return ErrorCode::INVALID_PARAM.0;
    };
    let Some(raw) = (unsafe { dentry.as_ref() }) else {
        return ErrorCode::INVALID_PARAM.0;
    };
    let entry = unsafe { DirEntry::decode(raw, ctx.encoding) };
    ctx.dispatch(|callback| callback(&entry))
}

pub(crate) unsafe extern "C" fn resource_trampoline<F>(
    resource: *const RawResourceEntry,
    user_ctx: *mut c_void,
) -> c_int
where
    F: FnMut(&ResourceEntry) -> CallbackStatus,
{
    let Some(ctx) = (unsafe { user_ctx.cast::<IterationContext<F>>().as_mut() }) else {
        return ErrorCode::INVALID_PARAM.0;
    };
    let Some(raw) = (unsafe { resource.as_ref() }) else {
        return ErrorCode::INVALID_PARAM.0;
    };
    let entry = ResourceEntry::from(raw);
    ctx.dispatch(|callback| callback(&entry))
}

/// Map the return value of a native iteration call.
pub(crate) fn iteration_outcome(raw: c_int) -> Result<IterationOutcome, ErrorCode> {
    match raw {
        0 => Ok(IterationOutcome::Completed),
        ITERATION_STOPPED => Ok(IterationOutcome::Stopped),
        code => Err(ErrorCode(code)),
    }
}

/// Kind of progress event, `enum wimlib_progress_msg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressMessage(pub i32);

impl ProgressMessage {
    pub const EXTRACT_IMAGE_BEGIN: ProgressMessage = ProgressMessage(0);
    pub const EXTRACT_TREE_BEGIN: ProgressMessage = ProgressMessage(1);
    pub const EXTRACT_FILE_STRUCTURE: ProgressMessage = ProgressMessage(3);
    pub const EXTRACT_STREAMS: ProgressMessage = ProgressMessage(4);
    pub const EXTRACT_SPWM_PART_BEGIN: ProgressMessage = ProgressMessage(5);
    pub const EXTRACT_METADATA: ProgressMessage = ProgressMessage(6);
    pub const EXTRACT_IMAGE_END: ProgressMessage = ProgressMessage(7);
    pub const EXTRACT_TREE_END: ProgressMessage = ProgressMessage(8);
    pub const SCAN_BEGIN: ProgressMessage = ProgressMessage(9);
    pub const SCAN_DENTRY: ProgressMessage = ProgressMessage(10);
    pub const SCAN_END: ProgressMessage = ProgressMessage(11);
    pub const WRITE_STREAMS: ProgressMessage = ProgressMessage(12);
    pub const WRITE_METADATA_BEGIN: ProgressMessage = ProgressMessage(13);
    pub const WRITE_METADATA_END: ProgressMessage = ProgressMessage(14);
    pub const RENAME: ProgressMessage = ProgressMessage(15);
    pub const VERIFY_INTEGRITY: ProgressMessage = ProgressMessage(16);
    pub const CALC_INTEGRITY: ProgressMessage = ProgressMessage(17);
    pub const SPLIT_BEGIN_PART: ProgressMessage = ProgressMessage(19);
    pub const SPLIT_END_PART: ProgressMessage = ProgressMessage(20);
    pub const UPDATE_BEGIN_COMMAND: ProgressMessage = ProgressMessage(21);
    pub const UPDATE_END_COMMAND: ProgressMessage = ProgressMessage(22);
    pub const REPLACE_FILE_IN_WIM: ProgressMessage = ProgressMessage(23);
    pub const WIMBOOT_EXCLUDE: ProgressMessage = ProgressMessage(24);
    pub const UNMOUNT_BEGIN: ProgressMessage = ProgressMessage(25);
    pub const DONE_WITH_FILE: ProgressMessage = ProgressMessage(26);
    pub const BEGIN_VERIFY_IMAGE: ProgressMessage = ProgressMessage(27);
    pub const END_VERIFY_IMAGE: ProgressMessage = ProgressMessage(28);
    pub const VERIFY_STREAMS: ProgressMessage = ProgressMessage(29);
    pub const TEST_FILE_EXCLUSION: ProgressMessage = ProgressMessage(30);
    pub const HANDLE_ERROR: ProgressMessage = ProgressMessage(31);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Continue,
    Abort,
}

impl ProgressStatus {
    fn raw(self) -> c_int {
        match self {
            ProgressStatus::Continue => 0,
            ProgressStatus::Abort => 1,
        }
    }
}

/// Boxed progress closure registered with a WIM handle.
pub type ProgressHandler = Box<dyn FnMut(ProgressMessage) -> ProgressStatus + Send>;

pub(crate) unsafe extern "C" fn progress_trampoline(
    msg_type: c_int,
    _info: *mut c_void,
    progctx: *mut c_void,
) -> c_int {
    let Some(handler) = (unsafe { progctx.cast::<ProgressHandler>().as_mut() }) else {
        return ProgressStatus::Continue.raw();
    };

    match catch_unwind(AssertUnwindSafe(|| handler(ProgressMessage(msg_type)))) {
        Ok(status) => status.raw(),
        Err(_) => {
            warn!(msg = msg_type, "progress callback panicked; aborting native operation");
            ProgressStatus::Abort.raw()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::NativeString;

    fn raw_entry(name: &NativeString) -> RawDirEntry {
        RawDirEntry {
            filename: name.as_ptr(),
            dos_name: std::ptr::null(),
            full_path: name.as_ptr(),
            depth: 1,
            security_descriptor: std::ptr::null(),
            security_descriptor_size: 0,
            attributes: DirEntry::ATTRIBUTE_DIRECTORY,
            reparse_tag: 0,
            num_links: 1,
            num_named_streams: 0,
            hard_link_group_id: 0,
            creation_time: RawTimespec::default(),
            last_write_time: RawTimespec {
                tv_sec: 1_700_000_000,
                tv_nsec: 5,
            },
            last_access_time: RawTimespec::default(),
        }
    }

    #[test]
    fn trampoline_decodes_entry_and_stops() {
        let name = NativeString::encode("Windows", StringEncoding::Utf8).unwrap();
        let raw = raw_entry(&name);

        let mut seen = Vec::new();
        let mut callback = |entry: &DirEntry| {
            seen.push(entry.clone());
            CallbackStatus::Stop
        };
        let mut ctx = IterationContext::new(&mut callback, StringEncoding::Utf8);
        let trampoline = ctx.dir_entry_callback();
        let ctx_ptr = ctx.as_ctx();

        let first = unsafe { trampoline(&raw, ctx_ptr) };
        let second = unsafe { trampoline(&raw, ctx_ptr) };
        drop(ctx);

        assert_eq!(first, ITERATION_STOPPED);
        assert_eq!(second, ITERATION_STOPPED);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].filename, "Windows");
        assert!(seen[0].dos_name.is_none());
        assert!(seen[0].is_directory());
        assert_eq!(seen[0].last_write_time.seconds, 1_700_000_000);
    }

    #[test]
    fn panicking_callback_aborts() {
        let name = NativeString::encode("x", StringEncoding::Utf8).unwrap();
        let raw = raw_entry(&name);
        let mut callback = |_: &DirEntry| -> CallbackStatus { panic!("boom") };
        let mut ctx = IterationContext::new(&mut callback, StringEncoding::Utf8);
        let trampoline = ctx.dir_entry_callback();
        let code = unsafe { trampoline(&raw, ctx.as_ctx()) };
        assert_eq!(code, ErrorCode::ABORTED_BY_PROGRESS.0);
    }

    #[test]
    fn resource_flags_are_unpacked() {
        let raw = RawResourceEntry {
            uncompressed_size: 10,
            compressed_size: 4,
            offset: 208,
            sha1_hash: [0xab; 20],
            part_number: 1,
            reference_count: 2,
            flags: 0b10_0011,
            raw_resource_offset_in_wim: 208,
            raw_resource_compressed_size: 4,
            raw_resource_uncompressed_size: 10,
        };
        let entry = ResourceEntry::from(&raw);
        assert!(entry.is_compressed && entry.is_metadata && entry.packed);
        assert!(!entry.is_free && !entry.is_spanned && !entry.is_missing);
        assert_eq!(entry.sha1_hex().len(), 40);
    }

    #[test]
    fn maps_iteration_return_values() {
        assert_eq!(iteration_outcome(0), Ok(IterationOutcome::Completed));
        assert_eq!(iteration_outcome(ITERATION_STOPPED), Ok(IterationOutcome::Stopped));
        assert_eq!(
            iteration_outcome(ErrorCode::ABORTED_BY_PROGRESS.0),
            Err(ErrorCode::ABORTED_BY_PROGRESS)
        );
    }

    #[test]
    fn progress_trampoline_forwards_status() {
        let mut handler: ProgressHandler = Box::new(|msg| {
            if msg == ProgressMessage::WRITE_STREAMS {
                ProgressStatus::Abort
            } else {
                ProgressStatus::Continue
            }
        });
        let ctx = (&mut handler as *mut ProgressHandler).cast::<c_void>();
        let info = std::ptr::null_mut();
        assert_eq!(unsafe { progress_trampoline(9, info, ctx) }, 0);
        assert_eq!(unsafe { progress_trampoline(12, info, ctx) }, 1);
    }
}
