//! Recording fakes of the file layer's backends.

use core::ops::Range;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::boxed::Box;
use std::vec::Vec;

use ofile_abi::{NOFILE, O_RDWR, OpenMode, PROC_NAME_LEN, Stat, T_FILE};
use spin::{Mutex, Once};

use crate::backend::{
    BackendError, BackendResult, DeviceMajor, DeviceOps, FileBackends, InodeBackend, InodeId,
    LogBackend, PipeBackend, PipeId, ProcessContext,
};
use crate::file::{FileKind, FileRef};
use crate::table::FileTable;

/// Major number of the console device.
pub const CONSOLE: DeviceMajor = 1;

/// Backend call, in the order the file layer made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    BeginOp,
    EndOp,
    Lock(InodeId),
    Unlock(InodeId),
    ReadAt { ip: InodeId, off: u32, len: usize },
    WriteAt { ip: InodeId, off: u32, len: usize },
    Stat(InodeId),
    Release(InodeId),
    PipeRead { pipe: PipeId, len: usize },
    PipeWrite { pipe: PipeId, len: usize },
    PipeClose { pipe: PipeId, writable: bool },
}

pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Event> {
        core::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// In-memory inodes. Inode numbers are indices into `files`.
pub struct FakeInodes {
    events: &'static EventLog,
    files: Mutex<Vec<Vec<u8>>>,
    write_calls: AtomicUsize,
    /// 1-based index of the `write_at` call that fails; 0 for none.
    failing_write: AtomicUsize,
    short_writes: AtomicBool,
}

impl FakeInodes {
    fn new(events: &'static EventLog) -> Self {
        Self {
            events,
            files: Mutex::new(Vec::new()),
            write_calls: AtomicUsize::new(0),
            failing_write: AtomicUsize::new(0),
            short_writes: AtomicBool::new(false),
        }
    }

    pub fn create(&self, contents: &[u8]) -> InodeId {
        let mut files = self.files.lock();
        files.push(contents.to_vec());
        (files.len() - 1) as InodeId
    }

    pub fn contents(&self, ip: InodeId) -> Vec<u8> {
        self.files.lock()[ip as usize].clone()
    }

    pub fn fail_write_call(&self, nth: usize) {
        self.failing_write.store(nth, Ordering::SeqCst);
    }

    pub fn set_short_writes(&self, on: bool) {
        self.short_writes.store(on, Ordering::SeqCst);
    }
}

impl InodeBackend for FakeInodes {
    fn lock(&self, ip: InodeId) {
        self.events.push(Event::Lock(ip));
    }

    fn unlock(&self, ip: InodeId) {
        self.events.push(Event::Unlock(ip));
    }

    fn read_at(&self, ip: InodeId, buf: &mut [u8], off: u32) -> BackendResult<usize> {
        let files = self.files.lock();
        let data = &files[ip as usize];
        let start = (off as usize).min(data.len());
        let len = buf.len().min(data.len() - start);
        buf[..len].copy_from_slice(&data[start..start + len]);
        self.events.push(Event::ReadAt {
            ip,
            off,
            len: buf.len(),
        });
        Ok(len)
    }

    fn write_at(&self, ip: InodeId, buf: &[u8], off: u32) -> BackendResult<usize> {
        let call = self.write_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.failing_write.load(Ordering::SeqCst) {
            return Err(BackendError::IoError);
        }
        let len = if self.short_writes.load(Ordering::SeqCst) {
            buf.len().saturating_sub(1)
        } else {
            buf.len()
        };
        let mut files = self.files.lock();
        let data = &mut files[ip as usize];
        let start = off as usize;
        if data.len() < start + len {
            data.resize(start + len, 0);
        }
        data[start..start + len].copy_from_slice(&buf[..len]);
        self.events.push(Event::WriteAt {
            ip,
            off,
            len: buf.len(),
        });
        Ok(len)
    }

    fn stat(&self, ip: InodeId) -> Stat {
        self.events.push(Event::Stat(ip));
        Stat {
            type_: T_FILE,
            dev: 1,
            ino: ip,
            nlink: 1,
            size: self.files.lock()[ip as usize].len() as u32,
        }
    }

    fn release(&self, ip: InodeId) {
        self.events.push(Event::Release(ip));
    }
}

pub struct FakeLog {
    events: &'static EventLog,
}

impl LogBackend for FakeLog {
    fn begin_op(&self) {
        self.events.push(Event::BeginOp);
    }

    fn end_op(&self) {
        self.events.push(Event::EndOp);
    }
}

pub type LockCheck = &'static (dyn Fn() -> bool + Send + Sync);

/// Pipes sharing one unbounded buffer. Reads never block.
pub struct FakePipes {
    events: &'static EventLog,
    buffer: Mutex<Vec<u8>>,
    close_check: Once<LockCheck>,
    lock_seen_held: AtomicBool,
}

impl FakePipes {
    fn new(events: &'static EventLog) -> Self {
        Self {
            events,
            buffer: Mutex::new(Vec::new()),
            close_check: Once::new(),
            lock_seen_held: AtomicBool::new(false),
        }
    }

    /// Run `check` on every close; remember whether it ever returned true.
    pub fn set_close_check(&self, check: LockCheck) {
        self.close_check.call_once(|| check);
    }

    pub fn lock_seen_held(&self) -> bool {
        self.lock_seen_held.load(Ordering::SeqCst)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }
}

impl PipeBackend for FakePipes {
    fn read(&self, pipe: PipeId, buf: &mut [u8]) -> BackendResult<usize> {
        let mut buffer = self.buffer.lock();
        let len = buf.len().min(buffer.len());
        buf[..len].copy_from_slice(&buffer[..len]);
        buffer.drain(..len);
        self.events.push(Event::PipeRead { pipe, len });
        Ok(len)
    }

    fn write(&self, pipe: PipeId, buf: &[u8]) -> BackendResult<usize> {
        self.buffer.lock().extend_from_slice(buf);
        self.events.push(Event::PipeWrite {
            pipe,
            len: buf.len(),
        });
        Ok(buf.len())
    }

    fn close(&self, pipe: PipeId, writable: bool) {
        if let Some(check) = self.close_check.get() {
            if check() {
                self.lock_seen_held.store(true, Ordering::SeqCst);
            }
        }
        self.events.push(Event::PipeClose { pipe, writable });
    }
}

/// The single calling process.
pub struct FakeProcess {
    name: Mutex<[u8; PROC_NAME_LEN]>,
    ofile: Mutex<[Option<FileRef>; NOFILE]>,
}

impl FakeProcess {
    fn new(name: &str) -> Self {
        let process = Self {
            name: Mutex::new([0; PROC_NAME_LEN]),
            ofile: Mutex::new([None; NOFILE]),
        };
        process.set_name(name);
        process
    }

    pub fn set_name(&self, name: &str) {
        let mut buf = [0u8; PROC_NAME_LEN];
        let len = name.len().min(PROC_NAME_LEN);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        *self.name.lock() = buf;
    }

    pub fn set_fd(&self, fd: usize, file: Option<FileRef>) {
        self.ofile.lock()[fd] = file;
    }
}

impl ProcessContext for FakeProcess {
    fn name(&self) -> [u8; PROC_NAME_LEN] {
        *self.name.lock()
    }

    fn descriptor(&self, fd: usize) -> Option<FileRef> {
        self.ofile.lock().get(fd).copied().flatten()
    }

    fn set_descriptor(&self, fd: usize, file: Option<FileRef>) {
        if let Some(slot) = self.ofile.lock().get_mut(fd) {
            *slot = file;
        }
    }
}

/// Console-like character device.
pub struct FakeConsole {
    input: Mutex<Vec<u8>>,
    output: Mutex<Vec<u8>>,
}

impl FakeConsole {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: Mutex::new(input.to_vec()),
            output: Mutex::new(Vec::new()),
        }
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }
}

impl DeviceOps for FakeConsole {
    fn read(&self, buf: &mut [u8]) -> BackendResult<usize> {
        let mut input = self.input.lock();
        let len = buf.len().min(input.len());
        buf[..len].copy_from_slice(&input[..len]);
        input.drain(..len);
        Ok(len)
    }

    fn write(&self, buf: &[u8]) -> BackendResult<usize> {
        self.output.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
}

pub struct Fixture<const N: usize> {
    pub table: &'static FileTable<N>,
    pub backends: FileBackends,
    pub events: &'static EventLog,
    pub inodes: &'static FakeInodes,
    pub pipes: &'static FakePipes,
    pub process: &'static FakeProcess,
}

impl<const N: usize> Fixture<N> {
    /// New inode holding `contents`, opened with the `O_*` flags `omode`.
    pub fn open_inode(&self, contents: &[u8], omode: u32) -> (FileRef, InodeId) {
        let ip = self.inodes.create(contents);
        let f = self.table.allocate().expect("file table full");
        self.table
            .install(f, FileKind::Inode(ip), OpenMode::from_open_flags(omode));
        (f, ip)
    }

    /// One console file shared by descriptors `fds`, as init sets up the
    /// standard descriptors.
    pub fn open_console(&self, fds: Range<usize>) -> FileRef {
        let f = self.table.allocate().expect("file table full");
        self.table.install(
            f,
            FileKind::Device(CONSOLE),
            OpenMode::from_open_flags(O_RDWR),
        );
        for (i, fd) in fds.enumerate() {
            if i > 0 {
                self.table.duplicate(f);
            }
            self.process.set_fd(fd, Some(f));
        }
        f
    }
}

/// Fresh table of `N` files over fresh fakes. The calling process is named
/// `init` and has no open descriptors.
pub fn fixture<const N: usize>() -> Fixture<N> {
    let events = leak(EventLog::new());
    let inodes = leak(FakeInodes::new(events));
    let pipes = leak(FakePipes::new(events));
    let log = leak(FakeLog { events });
    let process = leak(FakeProcess::new("init"));
    let backends = FileBackends {
        pipes,
        inodes,
        log,
        procs: process,
    };
    Fixture {
        table: leak(FileTable::new(backends)),
        backends,
        events,
        inodes,
        pipes,
        process,
    }
}
