//! Stack frames
//!
//! One frame per live machine definition. The last frame on the engine's stack is
//! the sole active frame; everything below it is dormant, holding only its
//! `current_state` for eventual resumption after a pop.

use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::computation::BoxedComputation;
use crate::machine::{MachineDef, START_STATE};

/// Live execution context of one machine definition.
pub struct Frame {
    /// The definition this frame executes. Lookups never cross frames.
    pub def: Rc<MachineDef>,

    /// Name of the state this frame is in. The only field mutated while the frame
    /// is dormant (by a pop that retargets it).
    pub current_state: String,

    /// The active computation instance, or `None` between states.
    pub computation: Option<BoxedComputation>,

    /// Index of the frame that pushed this one, fixed at push time. `None` for the
    /// root frame.
    pub parent: Option<usize>,

    /// Target recorded from the last `transition` yielded by this frame's
    /// `__end__` computation; cleared by any later yield. Applied to the parent
    /// when this frame is popped on completion.
    pub end_default_target: Option<(String, Option<JsonValue>)>,
}

impl Frame {
    /// New frame entering `__start__`.
    pub fn new(def: Rc<MachineDef>, parent: Option<usize>) -> Self {
        Frame {
            def,
            current_state: START_STATE.to_string(),
            computation: None,
            parent,
            end_default_target: None,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("current_state", &self.current_state)
            .field("has_computation", &self.computation.is_some())
            .field("parent", &self.parent)
            .field("end_default_target", &self.end_default_target)
            .finish()
    }
}
