//! Interfaces of the subsystems the file layer sits on.
//!
//! The file table never touches disk blocks, pipe buffers or the scheduler
//! directly. Each collaborator is reached through one of the traits below,
//! handed to the table at startup as `&'static dyn` references bundled in
//! [`FileBackends`].

use core::fmt;

use ofile_abi::{PROC_NAME_LEN, Stat};

use crate::file::FileRef;

/// Identifier of an in-memory inode held open by the filesystem.
pub type InodeId = u32;

/// Identifier of a pipe owned by the pipe subsystem.
pub type PipeId = u32;

/// Major device number, an index into the device switch.
pub type DeviceMajor = u16;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reported by a backend. The file layer only forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// Disk or device I/O failed
    IoError,
    /// Pipe has no reader left (writes) or was torn down
    BrokenPipe,
    /// The calling process was killed while blocked
    Interrupted,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => f.write_str("I/O error"),
            Self::BrokenPipe => f.write_str("broken pipe"),
            Self::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Pipe subsystem.
pub trait PipeBackend: Send + Sync {
    /// Copy out up to `buf.len()` bytes, blocking until data is available or
    /// every write end is closed.
    fn read(&self, pipe: PipeId, buf: &mut [u8]) -> BackendResult<usize>;

    /// Copy in all of `buf`, blocking while the pipe is full.
    fn write(&self, pipe: PipeId, buf: &[u8]) -> BackendResult<usize>;

    /// Drop one end of the pipe. The pipe is freed when both ends are gone.
    fn close(&self, pipe: PipeId, writable: bool);
}

/// Inode layer of the filesystem.
///
/// `read_at`, `write_at` and `stat` require the inode sleep-lock, taken with
/// `lock` and dropped with `unlock`. `lock` may block the caller.
pub trait InodeBackend: Send + Sync {
    fn lock(&self, ip: InodeId);

    fn unlock(&self, ip: InodeId);

    /// Read up to `buf.len()` bytes starting at `off`. Returns the number of
    /// bytes read, 0 at end of file.
    fn read_at(&self, ip: InodeId, buf: &mut [u8], off: u32) -> BackendResult<usize>;

    /// Write `buf` at `off`, growing the file as needed. Must be called
    /// inside a log transaction.
    fn write_at(&self, ip: InodeId, buf: &[u8], off: u32) -> BackendResult<usize>;

    fn stat(&self, ip: InodeId) -> Stat;

    /// Drop a reference to the in-memory inode (`iput`). May free the inode
    /// on disk, so it must be called inside a log transaction.
    fn release(&self, ip: InodeId);
}

/// Write-ahead log.
///
/// `begin_op` may block until the log has room for another operation of
/// `MAXOPBLOCKS` blocks. `end_op` commits when it ends the last outstanding
/// operation.
pub trait LogBackend: Send + Sync {
    fn begin_op(&self);

    fn end_op(&self);
}

/// The calling process, as seen by the scheduler.
pub trait ProcessContext: Send + Sync {
    /// Name of the calling process, NUL padded.
    fn name(&self) -> [u8; PROC_NAME_LEN];

    /// Entry `fd` of the calling process's open-file array. `None` for empty
    /// entries and for `fd >= NOFILE`.
    fn descriptor(&self, fd: usize) -> Option<FileRef>;

    /// Store `file` in entry `fd` of the calling process's open-file array.
    fn set_descriptor(&self, fd: usize, file: Option<FileRef>);
}

/// Character device driver, registered in the device switch by major number.
pub trait DeviceOps: Send + Sync {
    fn read(&self, buf: &mut [u8]) -> BackendResult<usize>;

    fn write(&self, buf: &[u8]) -> BackendResult<usize>;
}

/// Everything the file table calls into.
#[derive(Clone, Copy)]
pub struct FileBackends {
    pub pipes: &'static dyn PipeBackend,
    pub inodes: &'static dyn InodeBackend,
    pub log: &'static dyn LogBackend,
    pub procs: &'static dyn ProcessContext,
}

/// Holds an inode sleep-lock; unlocks on drop.
pub(crate) struct InodeGuard<'a> {
    inodes: &'a dyn InodeBackend,
    ip: InodeId,
}

impl<'a> InodeGuard<'a> {
    pub(crate) fn lock(inodes: &'a dyn InodeBackend, ip: InodeId) -> Self {
        inodes.lock(ip);
        Self { inodes, ip }
    }

    #[inline]
    pub(crate) fn ip(&self) -> InodeId {
        self.ip
    }
}

impl Drop for InodeGuard<'_> {
    fn drop(&mut self) {
        self.inodes.unlock(self.ip);
    }
}

/// One outstanding log operation; `end_op` runs on drop.
pub(crate) struct LogOp<'a> {
    log: &'a dyn LogBackend,
}

impl<'a> LogOp<'a> {
    pub(crate) fn begin(log: &'a dyn LogBackend) -> Self {
        log.begin_op();
        Self { log }
    }
}

impl Drop for LogOp<'_> {
    fn drop(&mut self) {
        self.log.end_op();
    }
}
