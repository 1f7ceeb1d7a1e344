//! System-wide table of open files.
//!
//! One lock guards the reference counts and kinds of every slot. It is held
//! only for constant-time bookkeeping and never across a call into a pipe,
//! inode, log or device backend: `close` snapshots the slot, frees it, drops
//! the lock and only then releases the backing object.
//!
//! The offset and byte counters of a slot live outside the table lock in
//! relaxed atomics. They are loaded and stored separately, never updated
//! with a read-modify-write, so two threads doing I/O through the same open
//! file can lose offset or counter updates. Callers that share a file across
//! threads serialize their I/O themselves.

use core::sync::atomic::{AtomicU32, Ordering};

use ofile_abi::{NFILE, OpenMode};
use ofile_lib::{kernel_bug, klog_debug, klog_info, klog_warn};
use spin::{Mutex, Once};

use crate::backend::{FileBackends, LogOp, PipeId, ProcessContext};
use crate::devsw::DeviceSwitch;
use crate::file::{FileError, FileKind, FileRef, FileResult};

/// Lock-protected part of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SlotState {
    pub(crate) ref_count: u32,
    pub(crate) kind: FileKind,
    pub(crate) mode: OpenMode,
}

impl SlotState {
    const FREE: Self = Self {
        ref_count: 0,
        kind: FileKind::None,
        mode: OpenMode::empty(),
    };
}

/// Position and accounting of a slot; see the module docs for the locking
/// rules.
pub(crate) struct SlotIo {
    pub(crate) offset: AtomicU32,
    pub(crate) read_bytes: AtomicU32,
    pub(crate) write_bytes: AtomicU32,
}

impl SlotIo {
    const fn new() -> Self {
        Self {
            offset: AtomicU32::new(0),
            read_bytes: AtomicU32::new(0),
            write_bytes: AtomicU32::new(0),
        }
    }

    fn reset(&self) {
        self.offset.store(0, Ordering::Relaxed);
        self.read_bytes.store(0, Ordering::Relaxed);
        self.write_bytes.store(0, Ordering::Relaxed);
    }
}

pub struct FileTable<const N: usize = NFILE> {
    slots: Mutex<[SlotState; N]>,
    io: [SlotIo; N],
    pub(crate) backends: FileBackends,
    devsw: DeviceSwitch,
}

impl<const N: usize> FileTable<N> {
    pub fn new(backends: FileBackends) -> Self {
        const { assert!(N > 0 && N <= u16::MAX as usize) };
        Self {
            slots: Mutex::new([SlotState::FREE; N]),
            io: [const { SlotIo::new() }; N],
            backends,
            devsw: DeviceSwitch::new(),
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Claim a free slot with a reference count of one.
    ///
    /// The file is unpopulated until [`install`](Self::install) gives it a
    /// kind and access mode.
    pub fn allocate(&self) -> FileResult<FileRef> {
        {
            let mut slots = self.slots.lock();
            if let Some(idx) = slots.iter().position(|slot| slot.ref_count == 0) {
                slots[idx].ref_count = 1;
                return Ok(FileRef::new(idx));
            }
        }
        klog_warn!("file: table full ({} open files)", N);
        Err(FileError::ResourceExhausted)
    }

    /// Populate a freshly allocated file. Resets its offset and counters.
    pub fn install(&self, f: FileRef, kind: FileKind, mode: OpenMode) {
        let idx = self.check(f);
        {
            let mut slots = self.slots.lock();
            let slot = &mut slots[idx];
            if slot.ref_count < 1 {
                kernel_bug!("fileinstall: file {} is not allocated", idx);
            }
            if !slot.kind.is_none() {
                kernel_bug!("fileinstall: file {} already holds {:?}", idx, slot.kind);
            }
            slot.kind = kind;
            slot.mode = mode;
        }
        self.io[idx].reset();
    }

    /// Add a sharer. Returns the same file.
    pub fn duplicate(&self, f: FileRef) -> FileRef {
        let idx = self.check(f);
        let mut slots = self.slots.lock();
        let slot = &mut slots[idx];
        if slot.ref_count < 1 {
            kernel_bug!("filedup: file {} has no references", idx);
        }
        slot.ref_count += 1;
        f
    }

    /// Drop a sharer; the last close releases the backing object.
    pub fn close(&self, f: FileRef) {
        let idx = self.check(f);
        let closed = {
            let mut slots = self.slots.lock();
            let slot = &mut slots[idx];
            if slot.ref_count < 1 {
                kernel_bug!("fileclose: file {} has no references", idx);
            }
            slot.ref_count -= 1;
            if slot.ref_count > 0 {
                return;
            }
            let snapshot = *slot;
            *slot = SlotState::FREE;
            snapshot
        };
        self.finalize(idx, closed);
    }

    fn finalize(&self, idx: usize, closed: SlotState) {
        match closed.kind {
            FileKind::Pipe(pipe) => {
                klog_debug!(
                    "file: {} released pipe {} ({} end)",
                    idx,
                    pipe,
                    if closed.mode.writable() { "write" } else { "read" }
                );
                self.backends.pipes.close(pipe, closed.mode.writable());
            }
            FileKind::Inode(ip) => {
                klog_debug!("file: {} released inode {}", idx, ip);
                let _op = LogOp::begin(self.backends.log);
                self.backends.inodes.release(ip);
            }
            FileKind::Device(_) | FileKind::None => {}
        }
    }

    /// Allocate and populate both ends of `pipe`.
    ///
    /// On failure nothing stays allocated; the pipe itself still belongs to
    /// the caller.
    pub fn open_pipe_pair(&self, pipe: PipeId) -> FileResult<(FileRef, FileRef)> {
        let rf = self.allocate()?;
        let wf = match self.allocate() {
            Ok(wf) => wf,
            Err(err) => {
                self.close(rf);
                return Err(err);
            }
        };
        self.install(rf, FileKind::Pipe(pipe), OpenMode::READ);
        self.install(wf, FileKind::Pipe(pipe), OpenMode::WRITE);
        Ok((rf, wf))
    }

    pub fn ref_count(&self, f: FileRef) -> u32 {
        self.state(f).ref_count
    }

    pub fn kind(&self, f: FileRef) -> FileKind {
        self.state(f).kind
    }

    pub fn mode(&self, f: FileRef) -> OpenMode {
        self.state(f).mode
    }

    pub fn offset(&self, f: FileRef) -> u32 {
        self.io(f).offset.load(Ordering::Relaxed)
    }

    /// Number of slots with a nonzero reference count.
    pub fn in_use(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|slot| slot.ref_count > 0)
            .count()
    }

    pub fn devsw(&self) -> &DeviceSwitch {
        &self.devsw
    }

    pub fn procs(&self) -> &'static dyn ProcessContext {
        self.backends.procs
    }

    /// Copy of the lock-protected state of `f`.
    pub(crate) fn state(&self, f: FileRef) -> SlotState {
        let idx = self.check(f);
        self.slots.lock()[idx]
    }

    pub(crate) fn io(&self, f: FileRef) -> &SlotIo {
        &self.io[self.check(f)]
    }

    #[cfg(test)]
    pub(crate) fn table_lock_held(&self) -> bool {
        self.slots.is_locked()
    }

    fn check(&self, f: FileRef) -> usize {
        let idx = f.index();
        if idx >= N {
            kernel_bug!("file: handle {} outside a table of {}", idx, N);
        }
        idx
    }
}

static FILE_TABLE: Once<FileTable> = Once::new();

/// Create the system-wide file table. Later calls return the existing table
/// and ignore `backends`.
pub fn fileinit(backends: FileBackends) -> &'static FileTable {
    FILE_TABLE.call_once(|| {
        klog_info!("file: table of {} open files ready", NFILE);
        FileTable::new(backends)
    })
}

/// The system-wide file table.
pub fn file_table() -> &'static FileTable {
    match FILE_TABLE.get() {
        Some(table) => table,
        None => kernel_bug!("file: table used before fileinit"),
    }
}
