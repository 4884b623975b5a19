//! Instruction protocol
//!
//! The closed vocabulary a state computation uses to communicate intent upward.
//! `transition` and `parent_transition` are consumed by the engine; every other kind
//! passes through to the runner untouched. The wire shape (tag + field names) is the
//! entire protocol surface between engine and runner and must stay stable.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::EngineError;

/// Severity attached to `notify` instructions. The engine does not interpret these;
/// they exist so independent runners agree on the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Success,
    Progress,
}

/// One instruction, produced at a suspension point and consumed within one exchange.
///
/// All kinds accept an optional `payload`, passed through unchanged. For
/// `transition` and `parent_transition` the payload becomes the next computation's
/// initial input; for forwarded kinds it is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "instruction", rename_all = "snake_case", deny_unknown_fields)]
pub enum Instruction {
    /// Advance the current frame to the named state.
    Transition {
        next_state: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Pop the current frame and set the new top frame's state.
    ParentTransition {
        next_state_for_parent: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Suspend the engine and await a resume value from the runner.
    RequestInput {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Forward-only user notification.
    Notify {
        message: String,
        level: NotifyLevel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Forward-only diagnostic; `level` is a free-form channel name.
    Debug {
        message: String,
        level: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Forward-only warning.
    Warning {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Forward-only error report. The runner decides whether to abort.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },

    /// Forward-only, runner-defined effect.
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },
}

impl Instruction {
    pub fn transition(next_state: impl Into<String>) -> Self {
        Instruction::Transition {
            next_state: next_state.into(),
            payload: None,
        }
    }

    pub fn parent_transition(next_state_for_parent: impl Into<String>) -> Self {
        Instruction::ParentTransition {
            next_state_for_parent: next_state_for_parent.into(),
            payload: None,
        }
    }

    pub fn request_input(query: impl Into<String>) -> Self {
        Instruction::RequestInput {
            query: query.into(),
            payload: None,
        }
    }

    pub fn notify(message: impl Into<String>, level: NotifyLevel) -> Self {
        Instruction::Notify {
            message: message.into(),
            level,
            payload: None,
        }
    }

    pub fn debug(message: impl Into<String>, level: impl Into<String>) -> Self {
        Instruction::Debug {
            message: message.into(),
            level: level.into(),
            payload: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Instruction::Warning {
            message: message.into(),
            payload: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Instruction::Error {
            message: message.into(),
            payload: None,
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Instruction::Custom {
            name: name.into(),
            payload: None,
        }
    }

    /// Attach a payload, replacing any existing one.
    pub fn with_payload(mut self, value: JsonValue) -> Self {
        *self.payload_mut() = Some(value);
        self
    }

    /// The optional payload shared by every kind.
    pub fn payload(&self) -> Option<&JsonValue> {
        match self {
            Instruction::Transition { payload, .. }
            | Instruction::ParentTransition { payload, .. }
            | Instruction::RequestInput { payload, .. }
            | Instruction::Notify { payload, .. }
            | Instruction::Debug { payload, .. }
            | Instruction::Warning { payload, .. }
            | Instruction::Error { payload, .. }
            | Instruction::Custom { payload, .. } => payload.as_ref(),
        }
    }

    fn payload_mut(&mut self) -> &mut Option<JsonValue> {
        match self {
            Instruction::Transition { payload, .. }
            | Instruction::ParentTransition { payload, .. }
            | Instruction::RequestInput { payload, .. }
            | Instruction::Notify { payload, .. }
            | Instruction::Debug { payload, .. }
            | Instruction::Warning { payload, .. }
            | Instruction::Error { payload, .. }
            | Instruction::Custom { payload, .. } => payload,
        }
    }

    /// Wire tag of this kind, e.g. `"transition"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Transition { .. } => "transition",
            Instruction::ParentTransition { .. } => "parent_transition",
            Instruction::RequestInput { .. } => "request_input",
            Instruction::Notify { .. } => "notify",
            Instruction::Debug { .. } => "debug",
            Instruction::Warning { .. } => "warning",
            Instruction::Error { .. } => "error",
            Instruction::Custom { .. } => "custom",
        }
    }

    /// True for the kinds the engine consumes itself.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Instruction::Transition { .. } | Instruction::ParentTransition { .. }
        )
    }

    /// Validate and decode a wire-shaped instruction.
    ///
    /// A missing required field or unrecognized `instruction` tag is a
    /// `ValidationError`; this is the ingestion point for instructions arriving
    /// from outside the process.
    pub fn from_json(value: JsonValue) -> Result<Self, EngineError> {
        serde_json::from_value(value).map_err(|e| EngineError::Validation(e.to_string()))
    }
}
