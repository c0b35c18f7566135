//! Scanner service wiring: configuration, tracing and the re-scan loop.

pub mod config;
mod main_lib;
pub mod scheduler;

pub use main_lib::{build_state, init_tracing, AppState};
