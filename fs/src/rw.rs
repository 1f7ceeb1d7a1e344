//! Read, write and stat dispatch on open files.

use core::sync::atomic::Ordering;

use ofile_abi::{MAX_WRITE_CHUNK, Stat};
use ofile_lib::{kernel_bug, klog_trace, klog_warn};

use crate::backend::{InodeGuard, InodeId, LogOp};
use crate::file::{FileError, FileKind, FileRef, FileResult, IoDirection};
use crate::table::FileTable;

impl<const N: usize> FileTable<N> {
    /// Metadata of an inode-backed file.
    pub fn stat(&self, f: FileRef) -> FileResult<Stat> {
        match self.state(f).kind {
            FileKind::Inode(ip) => {
                let inodes = self.backends.inodes;
                let guard = InodeGuard::lock(inodes, ip);
                Ok(inodes.stat(guard.ip()))
            }
            _ => Err(FileError::Unsupported),
        }
    }

    /// Read up to `buf.len()` bytes. Returns the number of bytes read; 0 at
    /// end of file or when every writer of a pipe is gone.
    pub fn read(&self, f: FileRef, buf: &mut [u8]) -> FileResult<usize> {
        let state = self.state(f);
        if !state.mode.readable() {
            return Err(FileError::NotReadable);
        }

        let n = match state.kind {
            FileKind::Pipe(pipe) => self.backends.pipes.read(pipe, buf)?,
            FileKind::Inode(ip) => {
                let inodes = self.backends.inodes;
                let offset = &self.io(f).offset;
                let guard = InodeGuard::lock(inodes, ip);
                let off = offset.load(Ordering::Relaxed);
                let r = inodes.read_at(guard.ip(), buf, off)?;
                if r > 0 {
                    offset.store(off.saturating_add(r as u32), Ordering::Relaxed);
                }
                r
            }
            FileKind::Device(major) => self.devsw().get(major)?.read(buf)?,
            FileKind::None => kernel_bug!("fileread: file {} is not populated", f.index()),
        };

        self.record(f, IoDirection::Read, n);
        Ok(n)
    }

    /// Write all of `buf`.
    ///
    /// Inode writes are split into log transactions of at most
    /// [`MAX_WRITE_CHUNK`] bytes. If a chunk fails the chunks before it stay
    /// on disk and the call fails with [`FileError::PartialWrite`].
    pub fn write(&self, f: FileRef, buf: &[u8]) -> FileResult<usize> {
        let state = self.state(f);
        if !state.mode.writable() {
            return Err(FileError::NotWritable);
        }

        let n = match state.kind {
            FileKind::Pipe(pipe) => self.backends.pipes.write(pipe, buf)?,
            FileKind::Inode(ip) => return self.write_inode(f, ip, buf),
            FileKind::Device(major) => self.devsw().get(major)?.write(buf)?,
            FileKind::None => kernel_bug!("filewrite: file {} is not populated", f.index()),
        };

        self.record(f, IoDirection::Write, n);
        Ok(n)
    }

    fn write_inode(&self, f: FileRef, ip: InodeId, buf: &[u8]) -> FileResult<usize> {
        let inodes = self.backends.inodes;
        let offset = &self.io(f).offset;
        let mut written = 0usize;

        while written < buf.len() {
            let chunk = &buf[written..buf.len().min(written + MAX_WRITE_CHUNK)];

            let result = {
                let _op = LogOp::begin(self.backends.log);
                let guard = InodeGuard::lock(inodes, ip);
                let off = offset.load(Ordering::Relaxed);
                let result = inodes.write_at(guard.ip(), chunk, off);
                if let Ok(r) = result {
                    if r > 0 {
                        offset.store(off.saturating_add(r as u32), Ordering::Relaxed);
                    }
                }
                result
            };

            match result {
                Ok(r) if r == chunk.len() => {
                    klog_trace!("file: inode {} chunk of {} bytes committed", ip, r);
                    written += r;
                }
                Ok(r) => kernel_bug!(
                    "filewrite: short write to inode {} ({} of {} bytes)",
                    ip,
                    r,
                    chunk.len()
                ),
                Err(err) => {
                    klog_warn!(
                        "file: inode {} write stopped after {} of {} bytes: {}",
                        ip,
                        written,
                        buf.len(),
                        err
                    );
                    break;
                }
            }
        }

        self.record(f, IoDirection::Write, written);
        if written == buf.len() {
            Ok(written)
        } else {
            Err(FileError::PartialWrite { written })
        }
    }
}
