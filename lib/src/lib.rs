#![no_std]

#[cfg(test)]
extern crate std;

pub mod bug;
pub mod klog;

pub use klog::{
    KlogBackend, KlogLevel, klog_get_level, klog_init, klog_is_enabled, klog_register_backend,
    klog_set_level, klog_unregister_backend,
};
