// Disc scanning and track classification
pub mod classifier;
pub mod scanner;

pub use classifier::{classify_tracks, find_main_title};
pub use scanner::{list_drives, scan_disc};
