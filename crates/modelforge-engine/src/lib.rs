//! Pipeline controller, recalc engine, and spreadsheet emission driver:
//! the three collaborators that turn dispatched phase requests into
//! persisted phase results and, eventually, a populated workbook.

pub mod controller;
pub mod emit_job;
pub mod emitter;
pub mod recalc;

pub use controller::{DispatchOptions, DispatchResult, PipelineController};
pub use emit_job::EmitJobWork;
pub use emitter::{distribute_largest_remainder, resolve as resolve_emit_output, EmitOutput, SpreadsheetDriver};
pub use recalc::{recalc, RecalcResult};
