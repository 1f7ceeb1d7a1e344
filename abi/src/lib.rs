//! ofile kernel-userland ABI types.
//!
//! Canonical definitions for the values that cross the syscall boundary of
//! the file layer (`Stat`, `IoStats`, open-mode bits) and the kernel
//! parameters the file layer is sized by.
//!
//! All shared structs are `#[repr(C)]` for ABI stability.

#![no_std]
#![forbid(unsafe_code)]

pub mod fs;
pub mod param;

pub use fs::*;
pub use param::*;
