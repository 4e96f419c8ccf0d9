// Rip job lifecycle and per-drive exclusivity
pub mod controller;
pub mod drive_lock;

pub use controller::{CancelOutcome, RipEvent, RipJobController};
pub use drive_lock::{DriveGuard, DriveLocks};
