//! Optical disc ripping core around makemkvcon's robot mode: scan output
//! parsing, main-feature detection, rip command building, progress decoding
//! and a rip job controller with per-drive exclusivity.
//!
//! The crate logs through the `log` facade and installs no logger.

pub mod commands;
pub mod disc;
pub mod error;
pub mod jobs;
pub mod makemkv;
pub mod models;
pub mod process_manager;

#[cfg(all(test, unix))]
mod test_support;

pub use commands::Ripper;
pub use disc::{classify_tracks, find_main_title, list_drives, scan_disc};
pub use error::{Result, RipError};
pub use jobs::{CancelOutcome, RipEvent, RipJobController};
pub use makemkv::{build_rip_command, decode_progress, parse_scan_output, ProgressKind, ProgressSample};
pub use models::{
    ClassifierPolicy, DiscRecord, DiscType, DriveInfo, DriveState, JobId, Resolution, RipJob,
    RipJobStatus, RipRequest, RipperConfig, Track, TrackClass, TrackDuration,
};
