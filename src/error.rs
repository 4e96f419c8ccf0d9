// Error types shared by the scanner, command builders and job controller
use crate::models::JobId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RipError {
    #[error("Invalid {kind} index: {value}")]
    InvalidIndex { kind: &'static str, value: i64 },

    #[error("Drive {drive} is busy with job {job_id}")]
    DriveBusy { drive: u32, job_id: JobId },

    #[error("Rip job not found: {0}")]
    JobNotFound(JobId),

    #[error("Rip job {0} is still active")]
    JobActive(JobId),

    #[error("No tokio runtime available to run rip jobs")]
    NoRuntime,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan of {device} failed: {message}")]
    ScanFailed { device: String, message: String },

    #[error("Scan of {device} timed out after {timeout:?}")]
    ScanTimeout { device: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RipError>;
