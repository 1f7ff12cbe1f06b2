//! In-process stand-in for the native library.
//!
//! Every export is an `extern "C"` function in this file. Native state lives in
//! a thread local because the binding only calls into the library from the
//! calling thread, so each test gets an isolated fake.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::raw::{c_int, c_long, c_uint};
use std::path::PathBuf;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};

use wimbridge_config::{StringEncoding, StructLayout};
use wimbridge_ffi::callbacks::{
    DirEntryCallback, ProgressFunc, RawDirEntry, RawResourceEntry, RawTimespec, ResourceCallback,
};
use wimbridge_ffi::strings::decode;
use wimbridge_ffi::{NativeString, SymbolSource};

pub const FAKE_VERSION: u32 = (1 << 20) | (14 << 10) | 4;
pub const DIR_ENTRIES: usize = 5;
pub const RESOURCES: usize = 3;

const NOT_A_WIM_FILE: c_int = 43;
const INVALID_IMAGE: c_int = 18;
const UNSUPPORTED: c_int = 68;
const ABORTED_BY_PROGRESS: c_int = 76;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSource {
    pub fs_source_path: String,
    pub wim_target_path: String,
}

pub struct FakeState {
    pub encoding: StringEncoding,
    /// Shape the fake reads `wimlib_capture_source` arrays with
    pub layout: StructLayout,
    pub init_result: c_int,
    pub init_calls: usize,
    pub init_flags: Option<c_int>,
    pub cleanup_calls: usize,
    pub diagnostics_unsupported: bool,
    pub error_file: Option<PathBuf>,
    pub print_errors: Option<bool>,
    pub live_wims: usize,
    pub freed_wims: usize,
    pub multisource: Vec<RecordedSource>,
    pub multisource_count: usize,
    pub multisource_reserved: Vec<i64>,
    pub written: Vec<(String, c_int)>,
    pub extracted: Vec<String>,
    // Keeps returned strings alive, like the library's static tables.
    returned: Vec<NativeString>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            encoding: StringEncoding::Utf8,
            layout: host_layout(),
            init_result: 0,
            init_calls: 0,
            init_flags: None,
            cleanup_calls: 0,
            diagnostics_unsupported: false,
            error_file: None,
            print_errors: None,
            live_wims: 0,
            freed_wims: 0,
            multisource: Vec::new(),
            multisource_count: 0,
            multisource_reserved: Vec::new(),
            written: Vec::new(),
            extracted: Vec::new(),
            returned: Vec::new(),
        }
    }
}

fn host_layout() -> StructLayout {
    if std::mem::size_of::<c_long>() == 4 {
        StructLayout::Long32
    } else {
        StructLayout::Long64
    }
}

thread_local! {
    static STATE: RefCell<FakeState> = RefCell::new(FakeState::default());
}

pub fn with_state<R>(f: impl FnOnce(&mut FakeState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Start a test from a clean fake that speaks `encoding`.
pub fn reset(encoding: StringEncoding) {
    reset_with_layout(encoding, host_layout());
}

/// Like [`reset`], for a fake built where C `long` has the width of `layout`.
pub fn reset_with_layout(encoding: StringEncoding, layout: StructLayout) {
    with_state(|state| {
        *state = FakeState {
            encoding,
            layout,
            ..FakeState::default()
        }
    });
}

fn encoding() -> StringEncoding {
    with_state(|state| state.encoding)
}

unsafe fn read(ptr: *const c_void) -> Option<String> {
    unsafe { decode(ptr, encoding()) }
}

fn leak_string(text: &str) -> *const c_void {
    with_state(|state| match NativeString::encode(text, state.encoding) {
        Ok(native) => {
            let ptr = native.as_ptr();
            state.returned.push(native);
            ptr
        }
        Err(_) => ptr::null(),
    })
}

fn log_error(line: &str) {
    let Some(path) = with_state(|state| {
        if state.print_errors == Some(true) {
            state.error_file.clone()
        } else {
            None
        }
    }) else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().append(true).create(true).open(path) {
        let _ = writeln!(file, "[ERROR] {line}");
    }
}

struct FakeWim {
    compression: c_int,
    images: Vec<FakeImage>,
    progress: Option<(ProgressFunc, *mut c_void)>,
}

#[derive(Default)]
struct FakeImage {
    name: Option<NativeString>,
    description: Option<NativeString>,
    properties: HashMap<String, NativeString>,
}

fn new_wim(compression: c_int, wim_ret: *mut *mut c_void) {
    let wim = Box::new(FakeWim {
        compression,
        images: Vec::new(),
        progress: None,
    });
    unsafe { *wim_ret = Box::into_raw(wim).cast() };
    with_state(|state| state.live_wims += 1);
}

unsafe fn wim<'a>(raw: *const c_void) -> &'a mut FakeWim {
    unsafe { &mut *(raw as *mut FakeWim) }
}

fn image_index(wim: &FakeWim, image: c_int) -> Option<usize> {
    let index = usize::try_from(image).ok()?.checked_sub(1)?;
    (index < wim.images.len()).then_some(index)
}

fn push_image(wim: &mut FakeWim, name: Option<String>) {
    let name = name.and_then(|n| NativeString::encode(&n, encoding()).ok());
    wim.images.push(FakeImage {
        name,
        ..FakeImage::default()
    });
}

extern "C" fn fake_global_init(init_flags: c_int) -> c_int {
    with_state(|state| {
        state.init_calls += 1;
        state.init_flags = Some(init_flags);
        state.init_result
    })
}

extern "C" fn fake_global_cleanup() {
    with_state(|state| state.cleanup_calls += 1);
}

extern "C" fn fake_get_error_string(code: c_int) -> *const c_void {
    leak_string(&format!("fake error {code}"))
}

extern "C" fn fake_set_error_file_by_name(path: *const c_void) -> c_int {
    let path = unsafe { read(path) };
    with_state(|state| {
        if state.diagnostics_unsupported {
            return UNSUPPORTED;
        }
        state.error_file = path.map(PathBuf::from);
        state.print_errors = Some(true);
        0
    })
}

extern "C" fn fake_set_print_errors(show_messages: bool) -> c_int {
    with_state(|state| {
        if state.diagnostics_unsupported {
            return UNSUPPORTED;
        }
        state.print_errors = Some(show_messages);
        0
    })
}

extern "C" fn fake_get_version() -> u32 {
    FAKE_VERSION
}

extern "C" fn fake_get_version_string() -> *const c_void {
    leak_string("1.14.4")
}

extern "C" fn fake_create_new_wim(ctype: c_int, wim_ret: *mut *mut c_void) -> c_int {
    new_wim(ctype, wim_ret);
    0
}

fn open(path: *const c_void, wim_ret: *mut *mut c_void) -> Result<*mut c_void, c_int> {
    let path = unsafe { read(path) }.unwrap_or_default();
    if !path.ends_with(".wim") {
        log_error(&format!("\"{path}\" is not a WIM file"));
        return Err(NOT_A_WIM_FILE);
    }
    new_wim(2, wim_ret);
    Ok(unsafe { *wim_ret })
}

extern "C" fn fake_open_wim(
    path: *const c_void,
    _flags: c_int,
    wim_ret: *mut *mut c_void,
) -> c_int {
    match open(path, wim_ret) {
        Ok(raw) => {
            push_image(unsafe { wim(raw) }, Some("Base".into()));
            0
        }
        Err(code) => code,
    }
}

extern "C" fn fake_open_wim_with_progress(
    path: *const c_void,
    _flags: c_int,
    wim_ret: *mut *mut c_void,
    progfunc: Option<ProgressFunc>,
    progctx: *mut c_void,
) -> c_int {
    match open(path, wim_ret) {
        Ok(raw) => {
            let wim = unsafe { wim(raw) };
            push_image(wim, Some("Base".into()));
            wim.progress = progfunc.map(|func| (func, progctx));
            0
        }
        Err(code) => code,
    }
}

extern "C" fn fake_free(raw: *mut c_void) {
    if raw.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(raw.cast::<FakeWim>()) });
    with_state(|state| {
        state.live_wims -= 1;
        state.freed_wims += 1;
    });
}

extern "C" fn fake_register_progress_function(
    raw: *mut c_void,
    progfunc: Option<ProgressFunc>,
    progctx: *mut c_void,
) {
    unsafe { wim(raw) }.progress = progfunc.map(|func| (func, progctx));
}

extern "C" fn fake_get_wim_info(raw: *mut c_void, info: *mut c_void) -> c_int {
    let wim = unsafe { wim(raw) };
    let base = info.cast::<u8>();
    unsafe {
        base.add(16)
            .cast::<u32>()
            .write_unaligned(wim.images.len() as u32);
        base.add(24).cast::<u32>().write_unaligned(0x10d00);
        base.add(28).cast::<u32>().write_unaligned(32768);
        base.add(32).cast::<u16>().write_unaligned(1);
        base.add(34).cast::<u16>().write_unaligned(1);
        base.add(36).cast::<i32>().write_unaligned(wim.compression);
        base.add(40).cast::<u64>().write_unaligned(4096);
    }
    0
}

extern "C" fn fake_set_output_compression_type(raw: *mut c_void, ctype: c_int) -> c_int {
    unsafe { wim(raw) }.compression = ctype;
    0
}

extern "C" fn fake_write(
    _raw: *mut c_void,
    path: *const c_void,
    image: c_int,
    _write_flags: c_int,
    _num_threads: c_uint,
) -> c_int {
    let path = unsafe { read(path) }.unwrap_or_default();
    with_state(|state| state.written.push((path, image)));
    0
}

extern "C" fn fake_overwrite(
    _raw: *mut c_void,
    _write_flags: c_int,
    _num_threads: c_uint,
) -> c_int {
    0
}

extern "C" fn fake_add_image(
    raw: *mut c_void,
    _source: *const c_void,
    name: *const c_void,
    _config_file: *const c_void,
    _add_flags: c_int,
) -> c_int {
    push_image(unsafe { wim(raw) }, unsafe { read(name) });
    0
}

/// `struct wimlib_capture_source` built with a 32-bit `long`.
#[repr(C)]
struct SourceLong32 {
    fs_source_path: *const c_void,
    wim_target_path: *const c_void,
    reserved: i32,
}

/// `struct wimlib_capture_source` built with a 64-bit `long`.
#[repr(C)]
struct SourceLong64 {
    fs_source_path: *const c_void,
    wim_target_path: *const c_void,
    reserved: i64,
}

unsafe fn read_sources<T>(
    sources: *const c_void,
    num_sources: usize,
    fields: impl Fn(&T) -> (*const c_void, *const c_void, i64),
) -> Vec<(RecordedSource, i64)> {
    let entries = unsafe { std::slice::from_raw_parts(sources.cast::<T>(), num_sources) };
    entries
        .iter()
        .map(|entry| {
            let (source, target, reserved) = fields(entry);
            let recorded = RecordedSource {
                fs_source_path: unsafe { read(source) }.unwrap_or_default(),
                wim_target_path: unsafe { read(target) }.unwrap_or_default(),
            };
            (recorded, reserved)
        })
        .collect()
}

extern "C" fn fake_add_image_multisource(
    raw: *mut c_void,
    sources: *const c_void,
    num_sources: usize,
    name: *const c_void,
    _config_file: *const c_void,
    _add_flags: c_int,
) -> c_int {
    let layout = with_state(|state| state.layout);
    let entries = match layout {
        StructLayout::Long32 => unsafe {
            read_sources(sources, num_sources, |e: &SourceLong32| {
                (e.fs_source_path, e.wim_target_path, i64::from(e.reserved))
            })
        },
        StructLayout::Long64 => unsafe {
            read_sources(sources, num_sources, |e: &SourceLong64| {
                (e.fs_source_path, e.wim_target_path, e.reserved)
            })
        },
    };
    with_state(|state| {
        state.multisource_count = num_sources;
        state.multisource_reserved = entries.iter().map(|(_, reserved)| *reserved).collect();
        state.multisource = entries.into_iter().map(|(source, _)| source).collect();
    });
    push_image(unsafe { wim(raw) }, unsafe { read(name) });
    0
}

extern "C" fn fake_add_tree(
    raw: *mut c_void,
    image: c_int,
    _fs_source_path: *const c_void,
    _wim_target_path: *const c_void,
    _add_flags: c_int,
) -> c_int {
    if image_index(unsafe { wim(raw) }, image).is_none() {
        return INVALID_IMAGE;
    }
    0
}

extern "C" fn fake_delete_image(raw: *mut c_void, image: c_int) -> c_int {
    let wim = unsafe { wim(raw) };
    if image == -1 {
        wim.images.clear();
        return 0;
    }
    match image_index(wim, image) {
        Some(index) => {
            wim.images.remove(index);
            0
        }
        None => INVALID_IMAGE,
    }
}

extern "C" fn fake_delete_path(
    _raw: *mut c_void,
    _image: c_int,
    _path: *const c_void,
    _flags: c_int,
) -> c_int {
    0
}

extern "C" fn fake_rename_path(
    _raw: *mut c_void,
    _image: c_int,
    _source: *const c_void,
    _dest: *const c_void,
) -> c_int {
    0
}

extern "C" fn fake_extract_image(
    raw: *mut c_void,
    _image: c_int,
    target: *const c_void,
    _flags: c_int,
) -> c_int {
    let target = unsafe { read(target) }.unwrap_or_default();
    let progress = unsafe { wim(raw) }.progress;
    if let Some((func, ctx)) = progress {
        // begin, five stream updates, end
        for msg in [0, 4, 4, 4, 4, 4, 7] {
            if unsafe { func(msg, ptr::null_mut(), ctx) } != 0 {
                return ABORTED_BY_PROGRESS;
            }
        }
    }
    with_state(|state| state.extracted.push(target));
    0
}

extern "C" fn fake_get_image_name(raw: *const c_void, image: c_int) -> *const c_void {
    let wim = unsafe { wim(raw) };
    image_index(wim, image)
        .and_then(|index| wim.images[index].name.as_ref())
        .map_or(ptr::null(), NativeString::as_ptr)
}

extern "C" fn fake_set_image_name(raw: *mut c_void, image: c_int, value: *const c_void) -> c_int {
    let wim = unsafe { wim(raw) };
    let Some(index) = image_index(wim, image) else {
        return INVALID_IMAGE;
    };
    wim.images[index].name =
        unsafe { read(value) }.and_then(|v| NativeString::encode(&v, encoding()).ok());
    0
}

extern "C" fn fake_get_image_description(raw: *const c_void, image: c_int) -> *const c_void {
    let wim = unsafe { wim(raw) };
    image_index(wim, image)
        .and_then(|index| wim.images[index].description.as_ref())
        .map_or(ptr::null(), NativeString::as_ptr)
}

extern "C" fn fake_set_image_description(
    raw: *mut c_void,
    image: c_int,
    value: *const c_void,
) -> c_int {
    let wim = unsafe { wim(raw) };
    let Some(index) = image_index(wim, image) else {
        return INVALID_IMAGE;
    };
    wim.images[index].description =
        unsafe { read(value) }.and_then(|v| NativeString::encode(&v, encoding()).ok());
    0
}

extern "C" fn fake_get_image_property(
    raw: *const c_void,
    image: c_int,
    property_name: *const c_void,
) -> *const c_void {
    let wim = unsafe { wim(raw) };
    let name = unsafe { read(property_name) }.unwrap_or_default();
    image_index(wim, image)
        .and_then(|index| wim.images[index].properties.get(&name))
        .map_or(ptr::null(), NativeString::as_ptr)
}

extern "C" fn fake_set_image_property(
    raw: *mut c_void,
    image: c_int,
    property_name: *const c_void,
    property_value: *const c_void,
) -> c_int {
    let wim = unsafe { wim(raw) };
    let Some(index) = image_index(wim, image) else {
        return INVALID_IMAGE;
    };
    let name = unsafe { read(property_name) }.unwrap_or_default();
    let properties = &mut wim.images[index].properties;
    match unsafe { read(property_value) } {
        Some(value) => {
            if let Ok(native) = NativeString::encode(&value, encoding()) {
                properties.insert(name, native);
            }
        }
        None => {
            properties.remove(&name);
        }
    }
    0
}

extern "C" fn fake_resolve_image(raw: *mut c_void, name_or_num: *const c_void) -> c_int {
    let wim = unsafe { wim(raw) };
    let Some(query) = (unsafe { read(name_or_num) }) else {
        return 0;
    };
    if query == "*" {
        return -1;
    }
    if let Ok(number) = query.parse::<c_int>() {
        return if image_index(wim, number).is_some() { number } else { 0 };
    }
    let names: Vec<Option<String>> = wim
        .images
        .iter()
        .map(|image| image.name.as_ref().and_then(|n| unsafe { read(n.as_ptr()) }))
        .collect();
    names
        .iter()
        .position(|name| name.as_deref() == Some(query.as_str()))
        .map_or(0, |index| index as c_int + 1)
}

extern "C" fn fake_iterate_dir_tree(
    _raw: *mut c_void,
    _image: c_int,
    path: *const c_void,
    _flags: c_int,
    cb: Option<DirEntryCallback>,
    user_ctx: *mut c_void,
) -> c_int {
    let Some(cb) = cb else {
        return 0;
    };
    let root = unsafe { read(path) }.unwrap_or_default();
    let enc = encoding();
    for i in 0..DIR_ENTRIES {
        let (Ok(filename), Ok(full_path)) = (
            NativeString::encode(&format!("file{i}"), enc),
            NativeString::encode(&format!("{}/file{i}", root.trim_end_matches('/')), enc),
        ) else {
            return 0;
        };
        let entry = RawDirEntry {
            filename: filename.as_ptr(),
            dos_name: ptr::null(),
            full_path: full_path.as_ptr(),
            depth: 1,
            security_descriptor: ptr::null(),
            security_descriptor_size: 0,
            attributes: if i == 0 { 0x10 } else { 0x20 },
            reparse_tag: 0,
            num_links: 1,
            num_named_streams: 0,
            hard_link_group_id: 0,
            creation_time: RawTimespec::default(),
            last_write_time: RawTimespec {
                tv_sec: 1_700_000_000 + i as i64,
                tv_nsec: 0,
            },
            last_access_time: RawTimespec::default(),
        };
        let ret = unsafe { cb(&entry, user_ctx) };
        if ret != 0 {
            return ret;
        }
    }
    0
}

extern "C" fn fake_iterate_lookup_table(
    _raw: *mut c_void,
    _flags: c_int,
    cb: Option<ResourceCallback>,
    user_ctx: *mut c_void,
) -> c_int {
    let Some(cb) = cb else {
        return 0;
    };
    for i in 0..RESOURCES {
        let entry = RawResourceEntry {
            uncompressed_size: 1000 * (i as u64 + 1),
            compressed_size: 400 * (i as u64 + 1),
            offset: 208 + 1000 * i as u64,
            sha1_hash: [i as u8; 20],
            part_number: 1,
            reference_count: 1,
            flags: if i == 0 { 0b11 } else { 0b01 },
            raw_resource_offset_in_wim: 0,
            raw_resource_compressed_size: 0,
            raw_resource_uncompressed_size: 0,
        };
        let ret = unsafe { cb(&entry, user_ctx) };
        if ret != 0 {
            return ret;
        }
    }
    0
}

/// Exports in the fake, by native name.
fn export_table() -> HashMap<&'static str, usize> {
    HashMap::from([
        ("wimlib_global_init", fake_global_init as usize),
        ("wimlib_global_cleanup", fake_global_cleanup as usize),
        ("wimlib_get_error_string", fake_get_error_string as usize),
        (
            "wimlib_set_error_file_by_name",
            fake_set_error_file_by_name as usize,
        ),
        ("wimlib_set_print_errors", fake_set_print_errors as usize),
        ("wimlib_get_version", fake_get_version as usize),
        ("wimlib_get_version_string", fake_get_version_string as usize),
        ("wimlib_create_new_wim", fake_create_new_wim as usize),
        ("wimlib_open_wim", fake_open_wim as usize),
        (
            "wimlib_open_wim_with_progress",
            fake_open_wim_with_progress as usize,
        ),
        ("wimlib_free", fake_free as usize),
        (
            "wimlib_register_progress_function",
            fake_register_progress_function as usize,
        ),
        ("wimlib_get_wim_info", fake_get_wim_info as usize),
        (
            "wimlib_set_output_compression_type",
            fake_set_output_compression_type as usize,
        ),
        ("wimlib_write", fake_write as usize),
        ("wimlib_overwrite", fake_overwrite as usize),
        ("wimlib_add_image", fake_add_image as usize),
        (
            "wimlib_add_image_multisource",
            fake_add_image_multisource as usize,
        ),
        ("wimlib_add_tree", fake_add_tree as usize),
        ("wimlib_delete_image", fake_delete_image as usize),
        ("wimlib_delete_path", fake_delete_path as usize),
        ("wimlib_rename_path", fake_rename_path as usize),
        ("wimlib_extract_image", fake_extract_image as usize),
        ("wimlib_get_image_name", fake_get_image_name as usize),
        ("wimlib_set_image_name", fake_set_image_name as usize),
        (
            "wimlib_get_image_description",
            fake_get_image_description as usize,
        ),
        // Only the corrected spelling, so binding has to use the fallback.
        (
            "wimlib_set_image_description",
            fake_set_image_description as usize,
        ),
        ("wimlib_get_image_property", fake_get_image_property as usize),
        ("wimlib_set_image_property", fake_set_image_property as usize),
        ("wimlib_resolve_image", fake_resolve_image as usize),
        ("wimlib_iterate_dir_tree", fake_iterate_dir_tree as usize),
        (
            "wimlib_iterate_lookup_table",
            fake_iterate_lookup_table as usize,
        ),
    ])
}

/// A [`SymbolSource`] backed by the functions above.
pub struct FakeLibrary {
    exports: HashMap<&'static str, usize>,
    hidden: HashSet<&'static str>,
    lookups: AtomicUsize,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self {
            exports: export_table(),
            hidden: HashSet::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Pretend `symbol` is not exported.
    pub fn without(mut self, symbol: &'static str) -> Self {
        self.hidden.insert(symbol);
        self
    }

    /// Number of symbol lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl SymbolSource for FakeLibrary {
    fn name(&self) -> &str {
        "fake-libwim"
    }

    fn address(&self, symbol: &str) -> Option<NonNull<c_void>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.hidden.contains(symbol) {
            return None;
        }
        self.exports
            .get(symbol)
            .and_then(|&address| NonNull::new(address as *mut c_void))
    }
}
