pub mod rip_worker;

pub use rip_worker::{run_rip_worker, spawn_rip_worker, WorkerExit, WorkerMessage};
