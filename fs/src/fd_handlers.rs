//! Descriptor-level entry points for the syscall layer.
//!
//! Each handler resolves a descriptor of the calling process, runs the file
//! operation and folds the result into the syscall return convention: a
//! count or 0 on success, -1 on any error.

use core::ffi::c_int;

use ofile_abi::{IoStats, NOFILE, Stat};

use crate::file::{FileError, FileRef, FileResult};
use crate::table::FileTable;

#[allow(non_camel_case_types)]
type ssize_t = isize;

fn argfd<const N: usize>(table: &FileTable<N>, fd: c_int) -> FileResult<(usize, FileRef)> {
    let fd = usize::try_from(fd).map_err(|_| FileError::BadDescriptor)?;
    if fd >= NOFILE {
        return Err(FileError::BadDescriptor);
    }
    let f = table.procs().descriptor(fd).ok_or(FileError::BadDescriptor)?;
    Ok((fd, f))
}

fn to_ssize(result: FileResult<usize>) -> ssize_t {
    match result {
        Ok(n) => n as ssize_t,
        Err(err) => err.as_syscall_rc(),
    }
}

/// Store `f` in the lowest free descriptor of the calling process.
pub fn fd_alloc<const N: usize>(table: &FileTable<N>, f: FileRef) -> FileResult<usize> {
    let procs = table.procs();
    let fd = (0..NOFILE)
        .find(|&fd| procs.descriptor(fd).is_none())
        .ok_or(FileError::ResourceExhausted)?;
    procs.set_descriptor(fd, Some(f));
    Ok(fd)
}

pub fn file_dup_fd<const N: usize>(table: &FileTable<N>, fd: c_int) -> c_int {
    let Ok((_, f)) = argfd(table, fd) else {
        return -1;
    };
    let Ok(new_fd) = fd_alloc(table, f) else {
        return -1;
    };
    table.duplicate(f);
    new_fd as c_int
}

pub fn file_read_fd<const N: usize>(table: &FileTable<N>, fd: c_int, buf: &mut [u8]) -> ssize_t {
    to_ssize(argfd(table, fd).and_then(|(_, f)| table.read(f, buf)))
}

pub fn file_write_fd<const N: usize>(table: &FileTable<N>, fd: c_int, buf: &[u8]) -> ssize_t {
    to_ssize(argfd(table, fd).and_then(|(_, f)| table.write(f, buf)))
}

pub fn file_close_fd<const N: usize>(table: &FileTable<N>, fd: c_int) -> c_int {
    let Ok((fd, f)) = argfd(table, fd) else {
        return -1;
    };
    table.procs().set_descriptor(fd, None);
    table.close(f);
    0
}

pub fn file_fstat_fd<const N: usize>(table: &FileTable<N>, fd: c_int, out_stat: &mut Stat) -> c_int {
    match argfd(table, fd).and_then(|(_, f)| table.stat(f)) {
        Ok(stat) => {
            *out_stat = stat;
            0
        }
        Err(_) => -1,
    }
}

pub fn file_iostats_fd<const N: usize>(
    table: &FileTable<N>,
    fd: c_int,
    out_stats: &mut IoStats,
) -> c_int {
    let Ok((_, f)) = argfd(table, fd) else {
        return -1;
    };
    *out_stats = table.fetch_iostats(f);
    0
}
