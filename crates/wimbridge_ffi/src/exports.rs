//! The export table of the native library and its typed function pointers.
//!
//! `tchar` arguments are declared as `*const c_void`; the bound
//! [`AbiVariant`](wimbridge_config::AbiVariant) decides whether they carry
//! UTF-8 or UTF-16 buffers.

use std::ffi::c_void;
use std::os::raw::{c_int, c_uint};

use crate::callbacks::{DirEntryCallback, ProgressFunc, ResourceCallback};
use crate::error::Result;
use crate::resolver::{ExportSpec, ResolvedExports};

/// Opaque `WIMStruct`
pub type WimStruct = c_void;
type TStr = *const c_void;

pub type GlobalInitFn = unsafe extern "C" fn(init_flags: c_int) -> c_int;
pub type GlobalCleanupFn = unsafe extern "C" fn();
pub type GetErrorStringFn = unsafe extern "C" fn(code: c_int) -> TStr;
pub type SetErrorFileByNameFn = unsafe extern "C" fn(path: TStr) -> c_int;
pub type SetPrintErrorsFn = unsafe extern "C" fn(show_messages: bool) -> c_int;
pub type GetVersionFn = unsafe extern "C" fn() -> u32;
pub type GetVersionStringFn = unsafe extern "C" fn() -> TStr;

pub type CreateNewWimFn = unsafe extern "C" fn(ctype: c_int, wim_ret: *mut *mut WimStruct) -> c_int;
pub type OpenWimFn =
    unsafe extern "C" fn(wim_file: TStr, open_flags: c_int, wim_ret: *mut *mut WimStruct) -> c_int;
pub type OpenWimWithProgressFn = unsafe extern "C" fn(
    wim_file: TStr,
    open_flags: c_int,
    wim_ret: *mut *mut WimStruct,
    progfunc: Option<ProgressFunc>,
    progctx: *mut c_void,
) -> c_int;
pub type FreeFn = unsafe extern "C" fn(wim: *mut WimStruct);
pub type RegisterProgressFunctionFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    progfunc: Option<ProgressFunc>,
    progctx: *mut c_void,
);
pub type GetWimInfoFn = unsafe extern "C" fn(wim: *mut WimStruct, info: *mut c_void) -> c_int;
pub type SetOutputCompressionTypeFn =
    unsafe extern "C" fn(wim: *mut WimStruct, ctype: c_int) -> c_int;

pub type WriteFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    path: TStr,
    image: c_int,
    write_flags: c_int,
    num_threads: c_uint,
) -> c_int;
pub type OverwriteFn =
    unsafe extern "C" fn(wim: *mut WimStruct, write_flags: c_int, num_threads: c_uint) -> c_int;

pub type AddImageFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    source: TStr,
    name: TStr,
    config_file: TStr,
    add_flags: c_int,
) -> c_int;
pub type AddImageMultisourceFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    sources: *const c_void,
    num_sources: usize,
    name: TStr,
    config_file: TStr,
    add_flags: c_int,
) -> c_int;
pub type AddTreeFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    image: c_int,
    fs_source_path: TStr,
    wim_target_path: TStr,
    add_flags: c_int,
) -> c_int;
pub type DeleteImageFn = unsafe extern "C" fn(wim: *mut WimStruct, image: c_int) -> c_int;
pub type DeletePathFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    image: c_int,
    path: TStr,
    delete_flags: c_int,
) -> c_int;
pub type RenamePathFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    image: c_int,
    source_path: TStr,
    dest_path: TStr,
) -> c_int;
pub type ExtractImageFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    image: c_int,
    target: TStr,
    extract_flags: c_int,
) -> c_int;

pub type GetImageStringFn = unsafe extern "C" fn(wim: *const WimStruct, image: c_int) -> TStr;
pub type SetImageStringFn =
    unsafe extern "C" fn(wim: *mut WimStruct, image: c_int, value: TStr) -> c_int;
pub type GetImagePropertyFn =
    unsafe extern "C" fn(wim: *const WimStruct, image: c_int, property_name: TStr) -> TStr;
pub type SetImagePropertyFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    image: c_int,
    property_name: TStr,
    property_value: TStr,
) -> c_int;
pub type ResolveImageFn =
    unsafe extern "C" fn(wim: *mut WimStruct, image_name_or_num: TStr) -> c_int;

pub type IterateDirTreeFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    image: c_int,
    path: TStr,
    flags: c_int,
    cb: Option<DirEntryCallback>,
    user_ctx: *mut c_void,
) -> c_int;
pub type IterateLookupTableFn = unsafe extern "C" fn(
    wim: *mut WimStruct,
    flags: c_int,
    cb: Option<ResourceCallback>,
    user_ctx: *mut c_void,
) -> c_int;

pub const GLOBAL_INIT: ExportSpec = ExportSpec::required("wimlib_global_init");
pub const GLOBAL_CLEANUP: ExportSpec = ExportSpec::required("wimlib_global_cleanup");
pub const GET_ERROR_STRING: ExportSpec = ExportSpec::required("wimlib_get_error_string");
pub const SET_ERROR_FILE_BY_NAME: ExportSpec =
    ExportSpec::required("wimlib_set_error_file_by_name");
pub const SET_PRINT_ERRORS: ExportSpec = ExportSpec::required("wimlib_set_print_errors");
pub const GET_VERSION: ExportSpec = ExportSpec::required("wimlib_get_version");
pub const GET_VERSION_STRING: ExportSpec = ExportSpec::optional("wimlib_get_version_string");
pub const CREATE_NEW_WIM: ExportSpec = ExportSpec::required("wimlib_create_new_wim");
pub const OPEN_WIM: ExportSpec = ExportSpec::required("wimlib_open_wim");
pub const OPEN_WIM_WITH_PROGRESS: ExportSpec =
    ExportSpec::required("wimlib_open_wim_with_progress");
pub const FREE: ExportSpec = ExportSpec::required("wimlib_free");
pub const REGISTER_PROGRESS_FUNCTION: ExportSpec =
    ExportSpec::required("wimlib_register_progress_function");
pub const GET_WIM_INFO: ExportSpec = ExportSpec::required("wimlib_get_wim_info");
pub const SET_OUTPUT_COMPRESSION_TYPE: ExportSpec =
    ExportSpec::required("wimlib_set_output_compression_type");
pub const WRITE: ExportSpec = ExportSpec::required("wimlib_write");
pub const OVERWRITE: ExportSpec = ExportSpec::required("wimlib_overwrite");
pub const ADD_IMAGE: ExportSpec = ExportSpec::required("wimlib_add_image");
pub const ADD_IMAGE_MULTISOURCE: ExportSpec = ExportSpec::required("wimlib_add_image_multisource");
pub const ADD_TREE: ExportSpec = ExportSpec::required("wimlib_add_tree");
pub const DELETE_IMAGE: ExportSpec = ExportSpec::required("wimlib_delete_image");
pub const DELETE_PATH: ExportSpec = ExportSpec::required("wimlib_delete_path");
pub const RENAME_PATH: ExportSpec = ExportSpec::required("wimlib_rename_path");
pub const EXTRACT_IMAGE: ExportSpec = ExportSpec::required("wimlib_extract_image");
pub const GET_IMAGE_NAME: ExportSpec = ExportSpec::required("wimlib_get_image_name");
pub const SET_IMAGE_NAME: ExportSpec = ExportSpec::required("wimlib_set_image_name");
pub const GET_IMAGE_DESCRIPTION: ExportSpec = ExportSpec::required("wimlib_get_image_description");
// The library has always exported this one misspelled.
pub const SET_IMAGE_DESCRIPTION: ExportSpec =
    ExportSpec::required("wimlib_set_image_descripton").or("wimlib_set_image_description");
pub const GET_IMAGE_PROPERTY: ExportSpec = ExportSpec::optional("wimlib_get_image_property");
pub const SET_IMAGE_PROPERTY: ExportSpec = ExportSpec::optional("wimlib_set_image_property");
pub const RESOLVE_IMAGE: ExportSpec = ExportSpec::required("wimlib_resolve_image");
pub const ITERATE_DIR_TREE: ExportSpec = ExportSpec::required("wimlib_iterate_dir_tree");
pub const ITERATE_LOOKUP_TABLE: ExportSpec = ExportSpec::required("wimlib_iterate_lookup_table");

/// Every export the call surface binds, resolved once per load.
pub const EXPORT_TABLE: &[ExportSpec] = &[
    GLOBAL_INIT,
    GLOBAL_CLEANUP,
    GET_ERROR_STRING,
    SET_ERROR_FILE_BY_NAME,
    SET_PRINT_ERRORS,
    GET_VERSION,
    GET_VERSION_STRING,
    CREATE_NEW_WIM,
    OPEN_WIM,
    OPEN_WIM_WITH_PROGRESS,
    FREE,
    REGISTER_PROGRESS_FUNCTION,
    GET_WIM_INFO,
    SET_OUTPUT_COMPRESSION_TYPE,
    WRITE,
    OVERWRITE,
    ADD_IMAGE,
    ADD_IMAGE_MULTISOURCE,
    ADD_TREE,
    DELETE_IMAGE,
    DELETE_PATH,
    RENAME_PATH,
    EXTRACT_IMAGE,
    GET_IMAGE_NAME,
    SET_IMAGE_NAME,
    GET_IMAGE_DESCRIPTION,
    SET_IMAGE_DESCRIPTION,
    GET_IMAGE_PROPERTY,
    SET_IMAGE_PROPERTY,
    RESOLVE_IMAGE,
    ITERATE_DIR_TREE,
    ITERATE_LOOKUP_TABLE,
];

/// Typed entry points of one loaded library.
#[derive(Debug, Clone, Copy)]
pub struct Exports {
    pub global_init: GlobalInitFn,
    pub global_cleanup: GlobalCleanupFn,
    pub get_error_string: GetErrorStringFn,
    pub set_error_file_by_name: SetErrorFileByNameFn,
    pub set_print_errors: SetPrintErrorsFn,
    pub get_version: GetVersionFn,
    pub get_version_string: Option<GetVersionStringFn>,
    pub create_new_wim: CreateNewWimFn,
    pub open_wim: OpenWimFn,
    pub open_wim_with_progress: OpenWimWithProgressFn,
    pub free: FreeFn,
    pub register_progress_function: RegisterProgressFunctionFn,
    pub get_wim_info: GetWimInfoFn,
    pub set_output_compression_type: SetOutputCompressionTypeFn,
    pub write: WriteFn,
    pub overwrite: OverwriteFn,
    pub add_image: AddImageFn,
    pub add_image_multisource: AddImageMultisourceFn,
    pub add_tree: AddTreeFn,
    pub delete_image: DeleteImageFn,
    pub delete_path: DeletePathFn,
    pub rename_path: RenamePathFn,
    pub extract_image: ExtractImageFn,
    pub get_image_name: GetImageStringFn,
    pub set_image_name: SetImageStringFn,
    pub get_image_description: GetImageStringFn,
    pub set_image_description: SetImageStringFn,
    pub get_image_property: Option<GetImagePropertyFn>,
    pub set_image_property: Option<SetImagePropertyFn>,
    pub resolve_image: ResolveImageFn,
    pub iterate_dir_tree: IterateDirTreeFn,
    pub iterate_lookup_table: IterateLookupTableFn,
}

impl Exports {
    /// Bind typed pointers from a table resolved against [`EXPORT_TABLE`].
    pub fn bind(resolved: &ResolvedExports) -> Result<Self> {
        // SAFETY: each alias above mirrors the C prototype of its export.
        unsafe {
            Ok(Self {
                global_init: resolved.function(&GLOBAL_INIT)?,
                global_cleanup: resolved.function(&GLOBAL_CLEANUP)?,
                get_error_string: resolved.function(&GET_ERROR_STRING)?,
                set_error_file_by_name: resolved.function(&SET_ERROR_FILE_BY_NAME)?,
                set_print_errors: resolved.function(&SET_PRINT_ERRORS)?,
                get_version: resolved.function(&GET_VERSION)?,
                get_version_string: resolved.optional(&GET_VERSION_STRING),
                create_new_wim: resolved.function(&CREATE_NEW_WIM)?,
                open_wim: resolved.function(&OPEN_WIM)?,
                open_wim_with_progress: resolved.function(&OPEN_WIM_WITH_PROGRESS)?,
                free: resolved.function(&FREE)?,
                register_progress_function: resolved.function(&REGISTER_PROGRESS_FUNCTION)?,
                get_wim_info: resolved.function(&GET_WIM_INFO)?,
                set_output_compression_type: resolved.function(&SET_OUTPUT_COMPRESSION_TYPE)?,
                write: resolved.function(&WRITE)?,
                overwrite: resolved.function(&OVERWRITE)?,
                add_image: resolved.function(&ADD_IMAGE)?,
                add_image_multisource: resolved.function(&ADD_IMAGE_MULTISOURCE)?,
                add_tree: resolved.function(&ADD_TREE)?,
                delete_image: resolved.function(&DELETE_IMAGE)?,
                delete_path: resolved.function(&DELETE_PATH)?,
                rename_path: resolved.function(&RENAME_PATH)?,
                extract_image: resolved.function(&EXTRACT_IMAGE)?,
                get_image_name: resolved.function(&GET_IMAGE_NAME)?,
                set_image_name: resolved.function(&SET_IMAGE_NAME)?,
                get_image_description: resolved.function(&GET_IMAGE_DESCRIPTION)?,
                set_image_description: resolved.function(&SET_IMAGE_DESCRIPTION)?,
                get_image_property: resolved.optional(&GET_IMAGE_PROPERTY),
                set_image_property: resolved.optional(&SET_IMAGE_PROPERTY),
                resolve_image: resolved.function(&RESOLVE_IMAGE)?,
                iterate_dir_tree: resolved.function(&ITERATE_DIR_TREE)?,
                iterate_lookup_table: resolved.function(&ITERATE_LOOKUP_TABLE)?,
            })
        }
    }
}
