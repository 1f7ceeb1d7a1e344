//! Filesystem ABI types shared between kernel and userland.

use bitflags::bitflags;

/// Inode types reported in [`Stat::type_`].
pub const T_DIR: u16 = 1;
pub const T_FILE: u16 = 2;
pub const T_DEV: u16 = 3;

/// Open flags as passed to the open syscall.
pub const O_RDONLY: u32 = 0x000;
pub const O_WRONLY: u32 = 0x001;
pub const O_RDWR: u32 = 0x002;
pub const O_CREATE: u32 = 0x200;

bitflags! {
    /// Access granted to an open file. Fixed when the file is populated.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct OpenMode: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl OpenMode {
    /// Decode the access bits of an open syscall's `omode` argument.
    ///
    /// `O_WRONLY` files are not readable; every mode except `O_WRONLY` and
    /// `O_RDWR` is read-only.
    pub const fn from_open_flags(omode: u32) -> Self {
        let readable = omode & O_WRONLY == 0;
        let writable = omode & O_WRONLY != 0 || omode & O_RDWR != 0;
        match (readable, writable) {
            (true, true) => Self::READ_WRITE,
            (true, false) => Self::READ,
            (false, true) => Self::WRITE,
            (false, false) => Self::empty(),
        }
    }

    #[inline]
    pub const fn readable(self) -> bool {
        self.contains(Self::READ)
    }

    #[inline]
    pub const fn writable(self) -> bool {
        self.contains(Self::WRITE)
    }
}

/// Inode metadata returned by fstat.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stat {
    /// Type of file (`T_DIR`, `T_FILE`, `T_DEV`)
    pub type_: u16,
    /// File system's disk device
    pub dev: u32,
    /// Inode number
    pub ino: u32,
    /// Number of links to file
    pub nlink: u16,
    /// Size of file in bytes
    pub size: u32,
}

impl Stat {
    pub fn is_directory(&self) -> bool {
        self.type_ == T_DIR
    }

    pub fn is_file(&self) -> bool {
        self.type_ == T_FILE
    }

    pub fn is_device(&self) -> bool {
        self.type_ == T_DEV
    }
}

/// Cumulative byte counters of one open file, as reported to userland.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoStats {
    pub read_bytes: u32,
    pub write_bytes: u32,
}
