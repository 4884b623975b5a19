//! Engine error taxonomy
//!
//! Structural problems are rejected before the engine ever runs. Transition-contract
//! violations during a run are forwarded to the runner as `error` instructions and
//! move the engine to `Failed`. Computation failures abort the run through the
//! `advance` result instead of the instruction channel.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed or unknown instruction, or a transition contract violation that
    /// has no more specific kind.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transition target absent from the current frame's own definition.
    #[error("unknown state '{state}'")]
    UnknownState { state: String },

    /// `parent_transition` issued by the root frame.
    #[error("parent transition issued at the root frame")]
    UnknownParent,

    /// Machine definition missing `__start__` or `__end__`, detected at load time.
    #[error("structural error: {0}")]
    Structural(String),

    /// The active computation failed internally while producing its next step.
    #[error("computation error in state '{state}': {message}")]
    Computation { state: String, message: String },
}

impl EngineError {
    /// Stable tag carried in the payload of forwarded `error` instructions, so
    /// runner implementations can dispatch without parsing display text.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::UnknownState { .. } => "unknown_state_error",
            EngineError::UnknownParent => "unknown_parent_error",
            EngineError::Structural(_) => "structural_error",
            EngineError::Computation { .. } => "computation_error",
        }
    }
}
