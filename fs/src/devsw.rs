//! Device switch: maps a major device number to its driver.

use ofile_abi::NDEV;
use spin::Mutex;

use crate::backend::{DeviceMajor, DeviceOps};
use crate::file::{FileError, FileResult};

pub struct DeviceSwitch {
    drivers: Mutex<[Option<&'static dyn DeviceOps>; NDEV]>,
}

impl DeviceSwitch {
    pub const fn new() -> Self {
        Self {
            drivers: Mutex::new([None; NDEV]),
        }
    }

    /// Install `ops` as the driver for `major`, replacing any previous one.
    pub fn register(&self, major: DeviceMajor, ops: &'static dyn DeviceOps) -> FileResult<()> {
        let idx = major as usize;
        if idx >= NDEV {
            return Err(FileError::NoDevice);
        }
        self.drivers.lock()[idx] = Some(ops);
        Ok(())
    }

    pub fn unregister(&self, major: DeviceMajor) {
        if let Some(slot) = self.drivers.lock().get_mut(major as usize) {
            *slot = None;
        }
    }

    /// Driver for `major`. The switch lock is released before the caller
    /// uses the driver, so drivers are free to block.
    pub fn get(&self, major: DeviceMajor) -> FileResult<&'static dyn DeviceOps> {
        self.drivers
            .lock()
            .get(major as usize)
            .copied()
            .flatten()
            .ok_or(FileError::NoDevice)
    }
}

impl Default for DeviceSwitch {
    fn default() -> Self {
        Self::new()
    }
}
