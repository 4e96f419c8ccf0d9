// Data models (structs)
pub mod disc;
pub mod rip_job;
pub mod settings;

pub use disc::*;
pub use rip_job::*;
pub use settings::*;
