//! Foundation types shared across the modelforge workspace.

pub mod canonical;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{ModelForgeError, Result, UserFriendlyError};
