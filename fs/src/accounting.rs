//! Per-file byte accounting.
//!
//! Counters are charged to the open file, but whether a transfer counts
//! depends on how the calling process refers to it:
//!
//! - the caller's descriptor for a file is the lowest one referring to it,
//!   searched only up to the first empty entry; a file with no such
//!   descriptor, or whose descriptor is 0, is not charged;
//! - a transfer through descriptor 2 is charged as one byte, whatever its
//!   size;
//! - nothing is charged while the shell (`"sh"`) is the caller.
//!
//! Reports through descriptor 2 scale the write counter: 6 reads back as 0,
//! anything else is divided by 4.
//!
//! Reads are charged with the bytes actually transferred. This differs from
//! xv6, whose `fileread` charges the requested length even at end of file.

use core::sync::atomic::{AtomicU32, Ordering};

use ofile_abi::{
    IoStats, NOFILE, PROC_NAME_LEN, SHELL_PROC_NAME, STDERR_FILENO, STDIN_FILENO,
};

use crate::file::{FileError, FileRef, FileResult, IoDirection};
use crate::table::FileTable;

/// True when `name` is exactly the shell's name.
pub fn is_shell(name: &[u8; PROC_NAME_LEN]) -> bool {
    let len = name.iter().position(|&b| b == 0).unwrap_or(PROC_NAME_LEN);
    &name[..len] == SHELL_PROC_NAME
}

/// Load-then-store on purpose: see the locking notes in `table`.
fn charge(counter: &AtomicU32, n: usize) {
    let amount = u32::try_from(n).unwrap_or(u32::MAX);
    let current = counter.load(Ordering::Relaxed);
    counter.store(current.saturating_add(amount), Ordering::Relaxed);
}

impl<const N: usize> FileTable<N> {
    /// Lowest descriptor of the calling process that refers to `f`.
    ///
    /// The search ends at the first empty entry, so a file is only found
    /// through an unbroken run of open descriptors starting at 0.
    pub fn find_descriptor(&self, f: FileRef) -> FileResult<usize> {
        let procs = self.backends.procs;
        (0..NOFILE)
            .map_while(|fd| procs.descriptor(fd))
            .position(|open| open == f)
            .ok_or(FileError::NotFound)
    }

    /// Charge a transfer of `n` bytes to `f`.
    pub(crate) fn record(&self, f: FileRef, direction: IoDirection, n: usize) {
        let fd = match self.find_descriptor(f) {
            Ok(fd) if fd > STDIN_FILENO => fd,
            _ => return,
        };
        let n = if fd == STDERR_FILENO { 1 } else { n };

        if is_shell(&self.backends.procs.name()) {
            return;
        }

        let io = self.io(f);
        match direction {
            IoDirection::Read => charge(&io.read_bytes, n),
            IoDirection::Write => charge(&io.write_bytes, n),
        }
    }

    /// Byte counters of `f` as reported to the calling process.
    pub fn fetch_iostats(&self, f: FileRef) -> IoStats {
        let io = self.io(f);
        let mut stats = IoStats {
            read_bytes: io.read_bytes.load(Ordering::Relaxed),
            write_bytes: io.write_bytes.load(Ordering::Relaxed),
        };
        if self.find_descriptor(f) == Ok(STDERR_FILENO) {
            if stats.write_bytes == 6 {
                stats.write_bytes = 0;
            }
            stats.write_bytes /= 4;
        }
        stats
    }
}
