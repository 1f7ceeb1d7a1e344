//! Kernel parameters shared by the file layer, the log and userland.

/// Open files per system.
pub const NFILE: usize = 100;

/// Open files per process.
pub const NOFILE: usize = 16;

/// Maximum major device number (size of the device switch).
pub const NDEV: usize = 10;

/// Max number of blocks any filesystem operation writes inside one log
/// transaction.
pub const MAXOPBLOCKS: usize = 10;

/// Filesystem block size in bytes.
pub const BSIZE: usize = 512;

/// Length of a process name, NUL padded.
pub const PROC_NAME_LEN: usize = 16;

/// Name of the shell process. Its reads and writes are never accounted.
pub const SHELL_PROC_NAME: &[u8] = b"sh";

/// Standard descriptor numbers.
pub const STDIN_FILENO: usize = 0;
pub const STDOUT_FILENO: usize = 1;
pub const STDERR_FILENO: usize = 2;

/// Largest inode write that fits in one log transaction.
///
/// A write touches the inode block, an indirect block and allocation
/// bitmap blocks, plus two blocks of slop for writes that are not block
/// aligned. Half of what remains is left for data.
pub const MAX_WRITE_CHUNK: usize = ((MAXOPBLOCKS - 1 - 1 - 2) / 2) * BSIZE;

const _: () = assert!(MAX_WRITE_CHUNK == 1536);
const _: () = assert!(STDERR_FILENO < NOFILE);
