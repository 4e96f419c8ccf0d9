// Per-drive exclusivity: at most one active rip job per drive index
use crate::error::{Result, RipError};
use crate::models::JobId;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct DriveLocks {
    held: Mutex<HashMap<u32, JobId>>,
}

impl DriveLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reserve `drive` for `job_id`. The reservation lasts until the returned
    /// guard is dropped.
    pub fn try_acquire(self: &Arc<Self>, drive: u32, job_id: JobId) -> Result<DriveGuard> {
        let mut held = self.held.lock();

        if let Some(&holder) = held.get(&drive) {
            return Err(RipError::DriveBusy {
                drive,
                job_id: holder,
            });
        }

        held.insert(drive, job_id);
        debug!("Drive {} reserved for job {}", drive, job_id);

        Ok(DriveGuard {
            locks: Arc::clone(self),
            drive,
            job_id,
        })
    }

    pub fn holder(&self, drive: u32) -> Option<JobId> {
        self.held.lock().get(&drive).copied()
    }
}

pub struct DriveGuard {
    locks: Arc<DriveLocks>,
    drive: u32,
    job_id: JobId,
}

impl Drop for DriveGuard {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        if held.get(&self.drive) == Some(&self.job_id) {
            held.remove(&self.drive);
            debug!("Drive {} released by job {}", self.drive, self.job_id);
        }
    }
}
