//! The five LLM phase agents and the Phase 6 spreadsheet emission driver.
//!
//! Each agent implements [`phase_trait::Phase`]: build the messages to
//! send and turn the guarded JSON response into a [`phase_trait::PhaseOutput`].
//! [`adapter::LlmPhaseWork`] bridges a `Phase` into the job runtime.
//! Phase 6 has no agent of its own, since it makes no LLM call: see
//! [`phase6::resolve_emit_plan`].

pub mod adapter;
pub mod phase1;
pub mod phase2;
pub mod phase3;
pub mod phase4;
pub mod phase5;
pub mod phase6;
pub mod phase_trait;

pub use adapter::LlmPhaseWork;
pub use phase1::Phase1Agent;
pub use phase2::Phase2Agent;
pub use phase3::Phase3Agent;
pub use phase4::Phase4Agent;
pub use phase5::Phase5Agent;
pub use phase6::{resolve_emit_plan, EmitPlan};
pub use phase_trait::{AgentError, Phase, PhaseContext, PhaseOutput};
