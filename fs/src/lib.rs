#![no_std]

pub mod accounting;
pub mod backend;
pub mod devsw;
pub mod fd_handlers;
pub mod file;
pub mod rw;
pub mod table;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod test_fixtures;

pub use accounting::is_shell;
pub use backend::{
    BackendError, BackendResult, DeviceMajor, DeviceOps, FileBackends, InodeBackend, InodeId,
    LogBackend, PipeBackend, PipeId, ProcessContext,
};
pub use devsw::DeviceSwitch;
pub use fd_handlers::*;
pub use file::{FileError, FileKind, FileRef, FileResult, IoDirection};
pub use table::{FileTable, file_table, fileinit};
