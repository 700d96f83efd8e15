//! Inbound command kinds and outbound line builders.

pub mod outbound;
mod types;

pub use types::Command;
