//! Asynchronous job runtime: FSM transitions, heartbeat/streaming
//! progress curves, and a bounded in-process executor.

pub mod executor;
pub mod progress;

pub use executor::{Executor, PhaseWork, DEFAULT_HARD_TIMEOUT_SECS, DEFAULT_SOFT_TIMEOUT_SECS};
pub use progress::{heartbeat_progress, streaming_progress};
