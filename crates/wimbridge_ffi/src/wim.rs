//! Per-archive calls on an opened or created `WIMStruct`.

use std::ffi::c_void;
use std::fmt;
use std::os::raw::{c_int, c_uint};
use std::path::Path;
use std::ptr::NonNull;

use crate::callbacks::{
    CallbackStatus, DirEntry, IterationContext, IterationOutcome, ProgressHandler, ResourceEntry,
    iteration_outcome, progress_trampoline,
};
use crate::codes::{CompressionType, ErrorCode, image};
use crate::error::{Error, Result};
use crate::exports::{GET_IMAGE_PROPERTY, SET_IMAGE_PROPERTY, WimStruct};
use crate::library::NativeLibrary;
use crate::marshal::{CaptureSource, CaptureSourceArray};
use crate::strings::{NativeString, decode, opt_ptr};

/// `struct wimlib_wim_info`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RawWimInfo {
    pub guid: [u8; 16],
    pub image_count: u32,
    pub boot_index: u32,
    pub wim_version: u32,
    pub chunk_size: u32,
    pub part_number: u16,
    pub total_parts: u16,
    pub compression_type: i32,
    pub total_bytes: u64,
    pub flags: u32,
    pub reserved: [u32; 9],
}

/// Header information about an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WimInfo {
    pub guid: [u8; 16],
    pub image_count: u32,
    /// 1-based index of the bootable image, 0 if none
    pub boot_index: u32,
    pub wim_version: u32,
    pub chunk_size: u32,
    pub part_number: u16,
    pub total_parts: u16,
    /// `None` when the library reports a type this crate does not know
    pub compression_type: Option<CompressionType>,
    pub total_bytes: u64,
    pub has_integrity_table: bool,
    pub opened_readonly: bool,
    pub is_readonly: bool,
    pub has_rpfix: bool,
    pub is_marked_readonly: bool,
    pub spanned: bool,
    pub write_in_progress: bool,
    pub metadata_only: bool,
    pub resource_only: bool,
    pub pipable: bool,
}

impl From<&RawWimInfo> for WimInfo {
    fn from(raw: &RawWimInfo) -> Self {
        let bit = |n: u32| raw.flags & (1 << n) != 0;
        Self {
            guid: raw.guid,
            image_count: raw.image_count,
            boot_index: raw.boot_index,
            wim_version: raw.wim_version,
            chunk_size: raw.chunk_size,
            part_number: raw.part_number,
            total_parts: raw.total_parts,
            compression_type: CompressionType::from_raw(raw.compression_type),
            total_bytes: raw.total_bytes,
            has_integrity_table: bit(0),
            opened_readonly: bit(1),
            is_readonly: bit(2),
            has_rpfix: bit(3),
            is_marked_readonly: bit(4),
            spanned: bit(5),
            write_in_progress: bit(6),
            metadata_only: bit(7),
            resource_only: bit(8),
            pipable: bit(9),
        }
    }
}

/// An open archive handle, freed on drop.
pub struct Wim<'lib> {
    library: &'lib NativeLibrary,
    raw: NonNull<WimStruct>,
    // The native side holds a pointer into this box until `wimlib_free`.
    progress: Option<Box<ProgressHandler>>,
}

impl<'lib> Wim<'lib> {
    pub(crate) fn new(
        library: &'lib NativeLibrary,
        raw: NonNull<WimStruct>,
        progress: Option<Box<ProgressHandler>>,
    ) -> Self {
        Self {
            library,
            raw,
            progress,
        }
    }

    pub fn library(&self) -> &'lib NativeLibrary {
        self.library
    }

    pub fn as_raw(&self) -> *mut WimStruct {
        self.raw.as_ptr()
    }

    pub fn has_progress_function(&self) -> bool {
        self.progress.is_some()
    }

    pub fn info(&self) -> Result<WimInfo> {
        let mut raw = RawWimInfo::default();
        let code = unsafe {
            (self.library.exports().get_wim_info)(
                self.as_raw(),
                (&mut raw as *mut RawWimInfo).cast::<c_void>(),
            )
        };
        self.library.check("wimlib_get_wim_info", code)?;
        Ok(WimInfo::from(&raw))
    }

    pub fn set_output_compression_type(&mut self, compression: CompressionType) -> Result<()> {
        let set = self.library.exports().set_output_compression_type;
        let code = unsafe { set(self.as_raw(), compression as c_int) };
        self.library.check("wimlib_set_output_compression_type", code)
    }

    /// Write `image` (or [`image::ALL_IMAGES`]) to a new file at `path`.
    pub fn write(
        &mut self,
        path: &Path,
        image: i32,
        write_flags: i32,
        num_threads: u32,
    ) -> Result<()> {
        let path = self.library.native_path(path)?;
        let code = unsafe {
            (self.library.exports().write)(
                self.as_raw(),
                path.as_ptr(),
                image,
                write_flags,
                num_threads as c_uint,
            )
        };
        self.library.check("wimlib_write", code)
    }

    /// Commit changes back to the file the archive was opened from.
    pub fn overwrite(&mut self, write_flags: i32, num_threads: u32) -> Result<()> {
        let code = unsafe {
            (self.library.exports().overwrite)(self.as_raw(), write_flags, num_threads as c_uint)
        };
        self.library.check("wimlib_overwrite", code)
    }

    pub fn add_image(
        &mut self,
        source: &Path,
        name: &str,
        config_file: Option<&Path>,
        add_flags: i32,
    ) -> Result<()> {
        let source = self.library.native_path(source)?;
        let name = self.library.native_string(name)?;
        let config_file = self.optional_path(config_file)?;
        let code = unsafe {
            (self.library.exports().add_image)(
                self.as_raw(),
                source.as_ptr(),
                name.as_ptr(),
                opt_ptr(config_file.as_ref()),
                add_flags,
            )
        };
        self.library.check("wimlib_add_image", code)
    }

    /// Capture several trees into one new image.
    pub fn add_image_multisource(
        &mut self,
        sources: &[CaptureSource],
        name: &str,
        config_file: Option<&Path>,
        add_flags: i32,
    ) -> Result<()> {
        if sources.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one capture source is required".into(),
            ));
        }
        let array = CaptureSourceArray::build(sources, self.library.variant())?;
        let name = self.library.native_string(name)?;
        let config_file = self.optional_path(config_file)?;
        let code = unsafe {
            (self.library.exports().add_image_multisource)(
                self.as_raw(),
                array.as_ptr(),
                array.len(),
                name.as_ptr(),
                opt_ptr(config_file.as_ref()),
                add_flags,
            )
        };
        self.library.check("wimlib_add_image_multisource", code)
    }

    pub fn add_tree(
        &mut self,
        image: i32,
        fs_source_path: &Path,
        wim_target_path: &str,
        add_flags: i32,
    ) -> Result<()> {
        let source = self.library.native_path(fs_source_path)?;
        let target = self.library.native_string(wim_target_path)?;
        let code = unsafe {
            (self.library.exports().add_tree)(
                self.as_raw(),
                image,
                source.as_ptr(),
                target.as_ptr(),
                add_flags,
            )
        };
        self.library.check("wimlib_add_tree", code)
    }

    pub fn delete_image(&mut self, image: i32) -> Result<()> {
        let code = unsafe { (self.library.exports().delete_image)(self.as_raw(), image) };
        self.library.check("wimlib_delete_image", code)
    }

    pub fn delete_path(&mut self, image: i32, path: &str, delete_flags: i32) -> Result<()> {
        let path = self.library.native_string(path)?;
        let code = unsafe {
            (self.library.exports().delete_path)(self.as_raw(), image, path.as_ptr(), delete_flags)
        };
        self.library.check("wimlib_delete_path", code)
    }

    pub fn rename_path(&mut self, image: i32, source_path: &str, dest_path: &str) -> Result<()> {
        let source = self.library.native_string(source_path)?;
        let dest = self.library.native_string(dest_path)?;
        let rename = self.library.exports().rename_path;
        let code = unsafe { rename(self.as_raw(), image, source.as_ptr(), dest.as_ptr()) };
        self.library.check("wimlib_rename_path", code)
    }

    pub fn extract_image(&mut self, image: i32, target: &Path, extract_flags: i32) -> Result<()> {
        let target = self.library.native_path(target)?;
        let code = unsafe {
            (self.library.exports().extract_image)(
                self.as_raw(),
                image,
                target.as_ptr(),
                extract_flags,
            )
        };
        self.library.check("wimlib_extract_image", code)
    }

    /// Name of `image`, or `None` if it has none or does not exist.
    pub fn image_name(&self, image: i32) -> Option<String> {
        let raw = unsafe { (self.library.exports().get_image_name)(self.as_raw(), image) };
        unsafe { decode(raw, self.library.encoding()) }
    }

    pub fn set_image_name(&mut self, image: i32, name: &str) -> Result<()> {
        let name = self.library.native_string(name)?;
        let code =
            unsafe { (self.library.exports().set_image_name)(self.as_raw(), image, name.as_ptr()) };
        self.library.check("wimlib_set_image_name", code)
    }

    pub fn image_description(&self, image: i32) -> Option<String> {
        let raw = unsafe { (self.library.exports().get_image_description)(self.as_raw(), image) };
        unsafe { decode(raw, self.library.encoding()) }
    }

    pub fn set_image_description(&mut self, image: i32, description: &str) -> Result<()> {
        let description = self.library.native_string(description)?;
        let code = unsafe {
            (self.library.exports().set_image_description)(
                self.as_raw(),
                image,
                description.as_ptr(),
            )
        };
        self.library.check("wimlib_set_image_description", code)
    }

    /// Read an XML property such as `WINDOWS/VERSION/BUILD`.
    pub fn image_property(&self, image: i32, property_name: &str) -> Result<Option<String>> {
        let get = self
            .library
            .exports()
            .get_image_property
            .ok_or(Error::ExportUnavailable(GET_IMAGE_PROPERTY.name))?;
        let property_name = self.library.native_string(property_name)?;
        let raw = unsafe { get(self.as_raw(), image, property_name.as_ptr()) };
        Ok(unsafe { decode(raw, self.library.encoding()) })
    }

    /// Set an XML property; `None` removes it.
    pub fn set_image_property(
        &mut self,
        image: i32,
        property_name: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let set = self
            .library
            .exports()
            .set_image_property
            .ok_or(Error::ExportUnavailable(SET_IMAGE_PROPERTY.name))?;
        let property_name = self.library.native_string(property_name)?;
        let value = value.map(|v| self.library.native_string(v)).transpose()?;
        let code = unsafe {
            set(
                self.as_raw(),
                image,
                property_name.as_ptr(),
                opt_ptr(value.as_ref()),
            )
        };
        self.library.check("wimlib_set_image_property", code)
    }

    /// Resolve an image name or 1-based number; `"*"` selects all images.
    pub fn resolve_image(&self, name_or_num: &str) -> Result<Option<i32>> {
        let name = self.library.native_string(name_or_num)?;
        let image = unsafe { (self.library.exports().resolve_image)(self.as_raw(), name.as_ptr()) };
        Ok((image != image::NO_IMAGE).then_some(image))
    }

    /// Walk the tree under `path` in `image`, calling `callback` for each entry.
    pub fn iterate_dir_tree<F>(
        &self,
        image: i32,
        path: &str,
        iterate_flags: i32,
        mut callback: F,
    ) -> Result<IterationOutcome>
    where
        F: FnMut(&DirEntry) -> CallbackStatus,
    {
        let path = self.library.native_string(path)?;
        let mut ctx = IterationContext::new(&mut callback, self.library.encoding());
        let trampoline = ctx.dir_entry_callback();
        let raw = unsafe {
            (self.library.exports().iterate_dir_tree)(
                self.as_raw(),
                image,
                path.as_ptr(),
                iterate_flags,
                Some(trampoline),
                ctx.as_ctx(),
            )
        };
        self.iteration_result("wimlib_iterate_dir_tree", raw)
    }

    /// Visit every resource in the blob table.
    pub fn iterate_lookup_table<F>(&self, mut callback: F) -> Result<IterationOutcome>
    where
        F: FnMut(&ResourceEntry) -> CallbackStatus,
    {
        let mut ctx = IterationContext::new(&mut callback, self.library.encoding());
        let trampoline = ctx.resource_callback();
        let raw = unsafe {
            (self.library.exports().iterate_lookup_table)(
                self.as_raw(),
                0,
                Some(trampoline),
                ctx.as_ctx(),
            )
        };
        self.iteration_result("wimlib_iterate_lookup_table", raw)
    }

    /// Route progress of later operations on this handle to `handler`.
    pub fn register_progress_function(&mut self, handler: ProgressHandler) {
        let mut handler = Box::new(handler);
        let ctx: *mut c_void = (&mut *handler as *mut ProgressHandler).cast();
        unsafe {
            (self.library.exports().register_progress_function)(
                self.as_raw(),
                Some(progress_trampoline),
                ctx,
            )
        };
        // The previous handler is unreachable from native code only now.
        self.progress = Some(handler);
    }

    pub fn clear_progress_function(&mut self) {
        unsafe {
            (self.library.exports().register_progress_function)(
                self.as_raw(),
                None,
                std::ptr::null_mut(),
            )
        };
        self.progress = None;
    }

    fn optional_path(&self, path: Option<&Path>) -> Result<Option<NativeString>> {
        path.map(|p| self.library.native_path(p)).transpose()
    }

    fn iteration_result(&self, operation: &'static str, raw: c_int) -> Result<IterationOutcome> {
        iteration_outcome(raw).map_err(|code: ErrorCode| self.library.failure(operation, code))
    }
}

impl fmt::Debug for Wim<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wim")
            .field("library", &self.library.name())
            .field("raw", &self.raw)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Drop for Wim<'_> {
    fn drop(&mut self) {
        unsafe { (self.library.exports().free)(self.as_raw()) };
    }
}
