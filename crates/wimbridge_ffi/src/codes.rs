//! Numeric constants of the native API: error codes, image selectors,
//! compression types and operation flags.

use std::fmt;
use std::os::raw::c_int;

/// A native return code. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const SUCCESS: ErrorCode = ErrorCode(0);
    pub const ALREADY_LOCKED: ErrorCode = ErrorCode(1);
    pub const DECOMPRESSION: ErrorCode = ErrorCode(2);
    pub const FUSE: ErrorCode = ErrorCode(6);
    pub const GLOB_HAD_NO_MATCHES: ErrorCode = ErrorCode(8);
    pub const IMAGE_COUNT: ErrorCode = ErrorCode(10);
    pub const IMAGE_NAME_COLLISION: ErrorCode = ErrorCode(11);
    pub const INSUFFICIENT_PRIVILEGES: ErrorCode = ErrorCode(12);
    pub const INTEGRITY: ErrorCode = ErrorCode(13);
    pub const INVALID_CAPTURE_CONFIG: ErrorCode = ErrorCode(14);
    pub const INVALID_CHUNK_SIZE: ErrorCode = ErrorCode(15);
    pub const INVALID_COMPRESSION_TYPE: ErrorCode = ErrorCode(16);
    pub const INVALID_HEADER: ErrorCode = ErrorCode(17);
    pub const INVALID_IMAGE: ErrorCode = ErrorCode(18);
    pub const INVALID_INTEGRITY_TABLE: ErrorCode = ErrorCode(19);
    pub const INVALID_LOOKUP_TABLE_ENTRY: ErrorCode = ErrorCode(20);
    pub const INVALID_METADATA_RESOURCE: ErrorCode = ErrorCode(21);
    pub const INVALID_OVERLAY: ErrorCode = ErrorCode(23);
    pub const INVALID_PARAM: ErrorCode = ErrorCode(24);
    pub const INVALID_PART_NUMBER: ErrorCode = ErrorCode(25);
    pub const INVALID_PIPABLE_WIM: ErrorCode = ErrorCode(26);
    pub const INVALID_REPARSE_DATA: ErrorCode = ErrorCode(27);
    pub const INVALID_RESOURCE_HASH: ErrorCode = ErrorCode(28);
    pub const INVALID_UTF16_STRING: ErrorCode = ErrorCode(30);
    pub const INVALID_UTF8_STRING: ErrorCode = ErrorCode(31);
    pub const IS_DIRECTORY: ErrorCode = ErrorCode(32);
    pub const IS_SPLIT_WIM: ErrorCode = ErrorCode(33);
    pub const LINK: ErrorCode = ErrorCode(35);
    pub const METADATA_NOT_FOUND: ErrorCode = ErrorCode(36);
    pub const MKDIR: ErrorCode = ErrorCode(37);
    pub const MQUEUE: ErrorCode = ErrorCode(38);
    pub const NOMEM: ErrorCode = ErrorCode(39);
    pub const NOTDIR: ErrorCode = ErrorCode(40);
    pub const NOTEMPTY: ErrorCode = ErrorCode(41);
    pub const NOT_A_REGULAR_FILE: ErrorCode = ErrorCode(42);
    pub const NOT_A_WIM_FILE: ErrorCode = ErrorCode(43);
    pub const NOT_PIPABLE: ErrorCode = ErrorCode(44);
    pub const NO_FILENAME: ErrorCode = ErrorCode(45);
    pub const NTFS_3G: ErrorCode = ErrorCode(46);
    pub const OPEN: ErrorCode = ErrorCode(47);
    pub const OPENDIR: ErrorCode = ErrorCode(48);
    pub const PATH_DOES_NOT_EXIST: ErrorCode = ErrorCode(49);
    pub const READ: ErrorCode = ErrorCode(50);
    pub const READLINK: ErrorCode = ErrorCode(51);
    pub const RENAME: ErrorCode = ErrorCode(52);
    pub const REPARSE_POINT_FIXUP_FAILED: ErrorCode = ErrorCode(54);
    pub const RESOURCE_NOT_FOUND: ErrorCode = ErrorCode(55);
    pub const RESOURCE_ORDER: ErrorCode = ErrorCode(56);
    pub const SET_ATTRIBUTES: ErrorCode = ErrorCode(57);
    pub const SET_REPARSE_DATA: ErrorCode = ErrorCode(58);
    pub const SET_SECURITY: ErrorCode = ErrorCode(59);
    pub const SET_SHORT_NAME: ErrorCode = ErrorCode(60);
    pub const SET_TIMESTAMPS: ErrorCode = ErrorCode(61);
    pub const SPLIT_INVALID: ErrorCode = ErrorCode(62);
    pub const STAT: ErrorCode = ErrorCode(63);
    pub const UNEXPECTED_END_OF_FILE: ErrorCode = ErrorCode(65);
    pub const UNICODE_STRING_NOT_REPRESENTABLE: ErrorCode = ErrorCode(66);
    pub const UNKNOWN_VERSION: ErrorCode = ErrorCode(67);
    pub const UNSUPPORTED: ErrorCode = ErrorCode(68);
    pub const UNSUPPORTED_FILE: ErrorCode = ErrorCode(69);
    pub const WIM_IS_READONLY: ErrorCode = ErrorCode(71);
    pub const WRITE: ErrorCode = ErrorCode(72);
    pub const XML: ErrorCode = ErrorCode(73);
    pub const WIM_IS_ENCRYPTED: ErrorCode = ErrorCode(74);
    pub const WIMBOOT: ErrorCode = ErrorCode(75);
    pub const ABORTED_BY_PROGRESS: ErrorCode = ErrorCode(76);
    pub const UNKNOWN_PROGRESS_STATUS: ErrorCode = ErrorCode(77);
    pub const MKNOD: ErrorCode = ErrorCode(78);
    pub const MOUNTED_IMAGE_IS_BUSY: ErrorCode = ErrorCode(79);
    pub const NOT_A_MOUNTPOINT: ErrorCode = ErrorCode(80);
    pub const NOT_PERMITTED_TO_UNMOUNT: ErrorCode = ErrorCode(81);
    pub const FVE_LOCKED_VOLUME: ErrorCode = ErrorCode(82);
    pub const UNABLE_TO_READ_CAPTURE_CONFIG: ErrorCode = ErrorCode(83);
    pub const WIM_IS_INCOMPLETE: ErrorCode = ErrorCode(84);
    pub const COMPACTION_NOT_POSSIBLE: ErrorCode = ErrorCode(85);
    pub const IMAGE_HAS_MULTIPLE_REFERENCES: ErrorCode = ErrorCode(86);
    pub const DUPLICATE_EXPORTED_IMAGE: ErrorCode = ErrorCode(87);
    pub const CONCURRENT_MODIFICATION_DETECTED: ErrorCode = ErrorCode(88);
    pub const SNAPSHOT_FAILURE: ErrorCode = ErrorCode(89);
    pub const INVALID_XATTR: ErrorCode = ErrorCode(90);
    pub const SET_XATTR: ErrorCode = ErrorCode(91);

    #[inline]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SUCCESS => "SUCCESS",
            Self::ALREADY_LOCKED => "ALREADY_LOCKED",
            Self::DECOMPRESSION => "DECOMPRESSION",
            Self::FUSE => "FUSE",
            Self::GLOB_HAD_NO_MATCHES => "GLOB_HAD_NO_MATCHES",
            Self::IMAGE_COUNT => "IMAGE_COUNT",
            Self::IMAGE_NAME_COLLISION => "IMAGE_NAME_COLLISION",
            Self::INSUFFICIENT_PRIVILEGES => "INSUFFICIENT_PRIVILEGES",
            Self::INTEGRITY => "INTEGRITY",
            Self::INVALID_CAPTURE_CONFIG => "INVALID_CAPTURE_CONFIG",
            Self::INVALID_CHUNK_SIZE => "INVALID_CHUNK_SIZE",
            Self::INVALID_COMPRESSION_TYPE => "INVALID_COMPRESSION_TYPE",
            Self::INVALID_HEADER => "INVALID_HEADER",
            Self::INVALID_IMAGE => "INVALID_IMAGE",
            Self::INVALID_INTEGRITY_TABLE => "INVALID_INTEGRITY_TABLE",
            Self::INVALID_LOOKUP_TABLE_ENTRY => "INVALID_LOOKUP_TABLE_ENTRY",
            Self::INVALID_METADATA_RESOURCE => "INVALID_METADATA_RESOURCE",
            Self::INVALID_OVERLAY => "INVALID_OVERLAY",
            Self::INVALID_PARAM => "INVALID_PARAM",
            Self::INVALID_PART_NUMBER => "INVALID_PART_NUMBER",
            Self::INVALID_PIPABLE_WIM => "INVALID_PIPABLE_WIM",
            Self::INVALID_REPARSE_DATA => "INVALID_REPARSE_DATA",
            Self::INVALID_RESOURCE_HASH => "INVALID_RESOURCE_HASH",
            Self::INVALID_UTF16_STRING => "INVALID_UTF16_STRING",
            Self::INVALID_UTF8_STRING => "INVALID_UTF8_STRING",
            Self::IS_DIRECTORY => "IS_DIRECTORY",
            Self::IS_SPLIT_WIM => "IS_SPLIT_WIM",
            Self::LINK => "LINK",
            Self::METADATA_NOT_FOUND => "METADATA_NOT_FOUND",
            Self::MKDIR => "MKDIR",
            Self::MQUEUE => "MQUEUE",
            Self::NOMEM => "NOMEM",
            Self::NOTDIR => "NOTDIR",
            Self::NOTEMPTY => "NOTEMPTY",
            Self::NOT_A_REGULAR_FILE => "NOT_A_REGULAR_FILE",
            Self::NOT_A_WIM_FILE => "NOT_A_WIM_FILE",
            Self::NOT_PIPABLE => "NOT_PIPABLE",
            Self::NO_FILENAME => "NO_FILENAME",
            Self::NTFS_3G => "NTFS_3G",
            Self::OPEN => "OPEN",
            Self::OPENDIR => "OPENDIR",
            Self::PATH_DOES_NOT_EXIST => "PATH_DOES_NOT_EXIST",
            Self::READ => "READ",
            Self::READLINK => "READLINK",
            Self::RENAME => "RENAME",
            Self::REPARSE_POINT_FIXUP_FAILED => "REPARSE_POINT_FIXUP_FAILED",
            Self::RESOURCE_NOT_FOUND => "RESOURCE_NOT_FOUND",
            Self::RESOURCE_ORDER => "RESOURCE_ORDER",
            Self::SET_ATTRIBUTES => "SET_ATTRIBUTES",
            Self::SET_REPARSE_DATA => "SET_REPARSE_DATA",
            Self::SET_SECURITY => "SET_SECURITY",
            Self::SET_SHORT_NAME => "SET_SHORT_NAME",
            Self::SET_TIMESTAMPS => "SET_TIMESTAMPS",
            Self::SPLIT_INVALID => "SPLIT_INVALID",
            Self::STAT => "STAT",
            Self::UNEXPECTED_END_OF_FILE => "UNEXPECTED_END_OF_FILE",
            Self::UNICODE_STRING_NOT_REPRESENTABLE => "UNICODE_STRING_NOT_REPRESENTABLE",
            Self::UNKNOWN_VERSION => "UNKNOWN_VERSION",
            Self::UNSUPPORTED => "UNSUPPORTED",
            Self::UNSUPPORTED_FILE => "UNSUPPORTED_FILE",
            Self::WIM_IS_READONLY => "WIM_IS_READONLY",
            Self::WRITE => "WRITE",
            Self::XML => "XML",
            Self::WIM_IS_ENCRYPTED => "WIM_IS_ENCRYPTED",
            Self::WIMBOOT => "WIMBOOT",
            Self::ABORTED_BY_PROGRESS => "ABORTED_BY_PROGRESS",
            Self::UNKNOWN_PROGRESS_STATUS => "UNKNOWN_PROGRESS_STATUS",
            Self::MKNOD => "MKNOD",
            Self::MOUNTED_IMAGE_IS_BUSY => "MOUNTED_IMAGE_IS_BUSY",
            Self::NOT_A_MOUNTPOINT => "NOT_A_MOUNTPOINT",
            Self::NOT_PERMITTED_TO_UNMOUNT => "NOT_PERMITTED_TO_UNMOUNT",
            Self::FVE_LOCKED_VOLUME => "FVE_LOCKED_VOLUME",
            Self::UNABLE_TO_READ_CAPTURE_CONFIG => "UNABLE_TO_READ_CAPTURE_CONFIG",
            Self::WIM_IS_INCOMPLETE => "WIM_IS_INCOMPLETE",
            Self::COMPACTION_NOT_POSSIBLE => "COMPACTION_NOT_POSSIBLE",
            Self::IMAGE_HAS_MULTIPLE_REFERENCES => "IMAGE_HAS_MULTIPLE_REFERENCES",
            Self::DUPLICATE_EXPORTED_IMAGE => "DUPLICATE_EXPORTED_IMAGE",
            Self::CONCURRENT_MODIFICATION_DETECTED => "CONCURRENT_MODIFICATION_DETECTED",
            Self::SNAPSHOT_FAILURE => "SNAPSHOT_FAILURE",
            Self::INVALID_XATTR => "INVALID_XATTR",
            Self::SET_XATTR => "SET_XATTR",
            _ => return None,
        };
        Some(name)
    }
}

impl From<c_int> for ErrorCode {
    #[inline]
    fn from(value: c_int) -> Self {
        Self(value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "error code {}", self.0),
        }
    }
}

/// Image selectors
pub mod image {
    /// Every image in the archive
    pub const ALL_IMAGES: i32 = -1;
    /// No image / not found
    pub const NO_IMAGE: i32 = 0;
}

/// Compression applied to newly written resources
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionType {
    None = 0,
    Xpress = 1,
    #[default]
    Lzx = 2,
    Lzms = 3,
}

impl CompressionType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Xpress),
            2 => Some(Self::Lzx),
            3 => Some(Self::Lzms),
            _ => None,
        }
    }
}

/// `wimlib_global_init` flags
pub mod init_flags {
    pub const ASSUME_UTF8: u32 = 0x0000_0001;
    pub const DONT_ACQUIRE_PRIVILEGES: u32 = 0x0000_0002;
    pub const STRICT_CAPTURE_PRIVILEGES: u32 = 0x0000_0004;
    pub const STRICT_APPLY_PRIVILEGES: u32 = 0x0000_0008;
    pub const DEFAULT_CASE_SENSITIVE: u32 = 0x0000_0010;
    pub const DEFAULT_CASE_INSENSITIVE: u32 = 0x0000_0020;
}

/// `wimlib_open_wim` flags
pub mod open_flags {
    pub const DEFAULT: i32 = 0;
    pub const CHECK_INTEGRITY: i32 = 0x0000_0001;
    pub const ERROR_IF_SPLIT: i32 = 0x0000_0002;
    pub const WRITE_ACCESS: i32 = 0x0000_0004;
}

/// `wimlib_write` / `wimlib_overwrite` flags
pub mod write_flags {
    pub const DEFAULT: i32 = 0;
    pub const CHECK_INTEGRITY: i32 = 0x0000_0001;
    pub const NO_CHECK_INTEGRITY: i32 = 0x0000_0002;
    pub const PIPABLE: i32 = 0x0000_0004;
    pub const NOT_PIPABLE: i32 = 0x0000_0008;
    pub const RECOMPRESS: i32 = 0x0000_0010;
    pub const FSYNC: i32 = 0x0000_0020;
    pub const REBUILD: i32 = 0x0000_0040;
    pub const SOFT_DELETE: i32 = 0x0000_0080;
    pub const IGNORE_READONLY_FLAG: i32 = 0x0000_0100;
    pub const SKIP_EXTERNAL_WIMS: i32 = 0x0000_0200;
    pub const STREAMS_OK: i32 = 0x0000_0400;
    pub const RETAIN_GUID: i32 = 0x0000_0800;
    pub const SOLID: i32 = 0x0000_1000;
    pub const SEND_DONE_WITH_FILE_MESSAGES: i32 = 0x0000_2000;
    pub const NO_SOLID_SORT: i32 = 0x0000_4000;
    pub const UNSAFE_COMPACT: i32 = 0x0000_8000;
}

/// `wimlib_add_image` / `wimlib_add_tree` flags
pub mod add_flags {
    pub const DEFAULT: i32 = 0;
    pub const NTFS: i32 = 0x0000_0001;
    pub const DEREFERENCE: i32 = 0x0000_0002;
    pub const VERBOSE: i32 = 0x0000_0004;
    pub const BOOT: i32 = 0x0000_0008;
    pub const UNIX_DATA: i32 = 0x0000_0010;
    pub const NO_ACLS: i32 = 0x0000_0020;
    pub const STRICT_ACLS: i32 = 0x0000_0040;
    pub const EXCLUDE_VERBOSE: i32 = 0x0000_0080;
    pub const RPFIX: i32 = 0x0000_0100;
    pub const NORPFIX: i32 = 0x0000_0200;
    pub const NO_UNSUPPORTED_EXCLUDE: i32 = 0x0000_0400;
    pub const WINCONFIG: i32 = 0x0000_0800;
    pub const WIMBOOT: i32 = 0x0000_1000;
    pub const NO_REPLACE: i32 = 0x0000_2000;
    pub const TEST_FILE_EXCLUSION: i32 = 0x0000_4000;
    pub const SNAPSHOT: i32 = 0x0000_8000;
    pub const FILE_PATHS_UNNEEDED: i32 = 0x0001_0000;
}

/// `wimlib_delete_path` flags
pub mod delete_flags {
    pub const DEFAULT: i32 = 0;
    pub const FORCE: i32 = 0x0000_0001;
    pub const RECURSIVE: i32 = 0x0000_0002;
}

/// `wimlib_extract_image` flags
pub mod extract_flags {
    pub const DEFAULT: i32 = 0;
    pub const NTFS: i32 = 0x0000_0001;
    pub const RECOVER_DATA: i32 = 0x0000_0002;
    pub const UNIX_DATA: i32 = 0x0000_0020;
    pub const NO_ACLS: i32 = 0x0000_0040;
    pub const STRICT_ACLS: i32 = 0x0000_0080;
    pub const RPFIX: i32 = 0x0000_0100;
    pub const NORPFIX: i32 = 0x0000_0200;
    pub const TO_STDOUT: i32 = 0x0000_0400;
    pub const REPLACE_INVALID_FILENAMES: i32 = 0x0000_0800;
    pub const ALL_CASE_CONFLICTS: i32 = 0x0000_1000;
    pub const STRICT_TIMESTAMPS: i32 = 0x0000_2000;
    pub const STRICT_SHORT_NAMES: i32 = 0x0000_4000;
    pub const STRICT_SYMLINKS: i32 = 0x0000_8000;
    pub const GLOB_PATHS: i32 = 0x0004_0000;
    pub const STRICT_GLOB: i32 = 0x0008_0000;
    pub const NO_ATTRIBUTES: i32 = 0x0010_0000;
    pub const NO_PRESERVE_DIR_STRUCTURE: i32 = 0x0020_0000;
    pub const WIMBOOT: i32 = 0x0040_0000;
    pub const COMPACT_XPRESS4K: i32 = 0x0100_0000;
    pub const COMPACT_XPRESS8K: i32 = 0x0200_0000;
    pub const COMPACT_XPRESS16K: i32 = 0x0400_0000;
    pub const COMPACT_LZX: i32 = 0x0800_0000;
}

/// `wimlib_iterate_dir_tree` / `wimlib_iterate_lookup_table` flags
pub mod iterate_flags {
    pub const DEFAULT: i32 = 0;
    pub const RECURSIVE: i32 = 0x0000_0001;
    pub const CHILDREN: i32 = 0x0000_0002;
    pub const RESOURCES_NEEDED: i32 = 0x0000_0004;
}
