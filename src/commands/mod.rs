// Operations exposed to the enclosing API layer
pub mod rips;

pub use rips::Ripper;
