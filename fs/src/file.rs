//! Open-file objects: handles, kinds and errors.

use core::fmt;

use crate::backend::{BackendError, DeviceMajor, InodeId, PipeId};

/// Handle to a slot of the file table.
///
/// Two handles are the same open file exactly when they name the same slot;
/// descriptor lookup relies on this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRef(u16);

impl FileRef {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u16)
    }

    /// Slot index inside the table.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What an open file is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKind {
    /// Free slot, or allocated but not populated yet
    #[default]
    None,
    Pipe(PipeId),
    Inode(InodeId),
    Device(DeviceMajor),
}

impl FileKind {
    pub const fn is_none(self) -> bool {
        matches!(self, FileKind::None)
    }
}

/// Direction of a transfer, for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    Read,
    Write,
}

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;

/// Recoverable errors of the file layer.
///
/// Kernel bugs (reference count used at zero, unpopulated files reaching the
/// dispatcher, short writes inside one transaction) are not represented
/// here; they panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileError {
    /// No free slot in the file table (ENFILE), or no free descriptor in the
    /// calling process (EMFILE)
    ResourceExhausted,
    /// File was not opened for reading
    NotReadable,
    /// File was not opened for writing
    NotWritable,
    /// Operation not defined for this kind of file
    Unsupported,
    /// File is not referenced by the calling process's descriptor array
    NotFound,
    /// Descriptor number out of range or not open (EBADF)
    BadDescriptor,
    /// Device major number has no registered driver (ENODEV)
    NoDevice,
    /// Backend reported a failure
    Backend(BackendError),
    /// Only a prefix of the data reached the file. The prefix is durable.
    PartialWrite { written: usize },
}

impl FileError {
    /// Value returned to user space for this error.
    pub const fn as_syscall_rc(self) -> isize {
        -1
    }
}

impl From<BackendError> for FileError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceExhausted => f.write_str("too many open files"),
            Self::NotReadable => f.write_str("file not open for reading"),
            Self::NotWritable => f.write_str("file not open for writing"),
            Self::Unsupported => f.write_str("operation not supported"),
            Self::NotFound => f.write_str("no descriptor refers to file"),
            Self::BadDescriptor => f.write_str("bad file descriptor"),
            Self::NoDevice => f.write_str("no such device"),
            Self::Backend(e) => write!(f, "backend error: {e}"),
            Self::PartialWrite { written } => write!(f, "partial write ({written} bytes)"),
        }
    }
}
