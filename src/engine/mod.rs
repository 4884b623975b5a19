//! Stack-based execution engine
//!
//! The engine owns an ordered stack of frames and a single drive loop. Each
//! `advance` resumes the top frame's computation, interprets control instructions
//! (`transition`, `parent_transition`) by mutating the stack, and returns the first
//! instruction that must be forwarded outward. Nesting depth is bounded only by
//! memory: the stack is an explicit `Vec<Frame>`, never the call stack.
//!
//! Exactly one computation is logically active per engine at any time; suspension
//! happens only at instruction-yield points. One engine instance per workflow run.

use std::rc::Rc;

use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::computation::Step;
use crate::error::EngineError;
use crate::instruction::Instruction;
use crate::machine::{MachineDef, StateDef, END_STATE};
use crate::observer::{EngineEvent, EngineObserver};
use crate::resolver::TransitionResolver;

pub mod frame;

#[cfg(test)]
mod tests;

pub use frame::Frame;

/// Engine run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Suspended on a `request_input`; `resume` must be called before `advance`.
    AwaitingInput,
    /// The root frame's `__end__` completed and the stack is empty.
    Done,
    /// Terminal. The stack was abandoned as-is; no further `__end__` runs.
    Failed,
}

/// What one `advance` call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Produced {
    /// A forwarded, non-suspending instruction. Drive again for the next one.
    Instruction(Instruction),
    /// A forwarded `request_input`; the engine is suspended until `resume`.
    AwaitingInput(Instruction),
    /// The run completed.
    Done,
}

/// The driver of one workflow run.
pub struct Engine {
    frames: Vec<Frame>,
    state: RunState,
    /// Initial input for the next computation instantiation (a transition payload).
    pending_input: Option<JsonValue>,
    /// Resume value delivered by the runner, consumed by the next drive of the
    /// active computation.
    resume_value: Option<JsonValue>,
    resolver: Option<Box<dyn TransitionResolver>>,
    observers: Vec<Box<dyn EngineObserver>>,
    failure: Option<EngineError>,
    run_id: Uuid,
}

impl Engine {
    /// Validate the definition (recursively) and set up the root frame at
    /// `__start__`. A malformed definition is rejected here, before any
    /// computation runs.
    pub fn new(definition: MachineDef) -> Result<Self, EngineError> {
        definition.validate()?;
        let def = Rc::new(definition);
        Ok(Engine {
            frames: vec![Frame::new(def, None)],
            state: RunState::Running,
            pending_input: None,
            resume_value: None,
            resolver: None,
            observers: Vec::new(),
            failure: None,
            run_id: Uuid::new_v4(),
        })
    }

    /// Install a transition resolver, applied to every in-frame `transition`
    /// target before validation.
    pub fn with_resolver(mut self, resolver: Box<dyn TransitionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attach an observer. Observers are invoked synchronously, in forwarding
    /// order.
    pub fn add_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stack_depth(&self) -> usize {
        self.frames.len()
    }

    /// State name of the active frame, if any frame is live.
    pub fn current_state(&self) -> Option<&str> {
        self.frames.last().map(|f| f.current_state.as_str())
    }

    /// Deliver the resume value for a pending `request_input`.
    pub fn resume(&mut self, value: JsonValue) -> Result<(), EngineError> {
        if self.state != RunState::AwaitingInput {
            return Err(EngineError::Validation(
                "resume called while the engine is not awaiting input".to_string(),
            ));
        }
        self.resume_value = Some(value);
        self.state = RunState::Running;
        Ok(())
    }

    /// Drive the engine until it produces the next forwardable instruction,
    /// suspends, or completes.
    ///
    /// Transition-contract violations come back as a forwarded `error`
    /// instruction with the engine moved to `Failed`; a computation failure comes
    /// back as `Err` and also fails the engine.
    pub fn advance(&mut self) -> Result<Produced, EngineError> {
        match self.state {
            RunState::Done => return Ok(Produced::Done),
            RunState::Failed => {
                return Err(self
                    .failure
                    .clone()
                    .unwrap_or_else(|| EngineError::Validation("engine failed".to_string())))
            }
            RunState::AwaitingInput => {
                return Err(EngineError::Validation(
                    "advance called while the engine is awaiting input".to_string(),
                ))
            }
            RunState::Running => {}
        }

        loop {
            let Some(top) = self.frames.len().checked_sub(1) else {
                return Ok(self.complete());
            };

            // Between states: resolve the state definition, pushing a sub-machine
            // frame or instantiating a computation.
            if self.frames[top].computation.is_none() {
                let state_name = self.frames[top].current_state.clone();
                match self.frames[top].def.get(&state_name) {
                    None => {
                        // Targets are validated before current_state is mutated,
                        // so this only fires on a definition mutated out from
                        // under the engine.
                        return self.fail(EngineError::UnknownState { state: state_name });
                    }
                    Some(StateDef::SubMachine(sub)) => {
                        let sub = Rc::clone(sub);
                        self.frames.push(Frame::new(sub, Some(top)));
                        let depth = self.frames.len();
                        debug!(run_id = %self.run_id, depth, "frame pushed");
                        self.observe(&EngineEvent::FramePushed { depth });
                        continue;
                    }
                    Some(StateDef::Computation(factory)) => {
                        let factory = factory.clone();
                        let input = self.pending_input.take();
                        self.frames[top].computation = Some(factory.instantiate(input));
                    }
                }
            }

            let resume = self.resume_value.take();
            let state_name = self.frames[top].current_state.clone();
            let step = match self.frames[top]
                .computation
                .as_mut()
                .expect("active frame has a computation")
                .advance(resume)
            {
                Ok(step) => step,
                Err(e) => {
                    let err = EngineError::Computation {
                        state: state_name,
                        message: format!("{e:#}"),
                    };
                    self.state = RunState::Failed;
                    self.failure = Some(err.clone());
                    self.observe(&EngineEvent::RunFailed {
                        error: err.to_string(),
                    });
                    return Err(err);
                }
            };

            let instruction = match step {
                Step::Yielded(instruction) => instruction,
                Step::Completed => {
                    if state_name != END_STATE {
                        return self.fail(EngineError::Validation(format!(
                            "no transition from terminal computation in state '{state_name}'"
                        )));
                    }

                    let finished = self.frames.pop().expect("popping the active frame");
                    let depth = self.frames.len();
                    debug!(run_id = %self.run_id, depth, "frame popped");
                    self.observe(&EngineEvent::FramePopped { depth });

                    if self.frames.is_empty() {
                        return Ok(self.complete());
                    }

                    // Default parent transition: used only when the sub-machine
                    // lifetime produced no explicit parent_transition.
                    match finished.end_default_target {
                        Some((target, payload)) => {
                            if let Err(e) = self.retarget_top(target, payload) {
                                return self.fail(e);
                            }
                            continue;
                        }
                        None => {
                            return self.fail(EngineError::Validation(
                                "sub-machine completed without a parent target".to_string(),
                            ));
                        }
                    }
                }
            };

            // The default parent transition is the *last* yield of the __end__
            // computation; any non-transition yield after it clears the record.
            if state_name == END_STATE && !matches!(instruction, Instruction::Transition { .. }) {
                self.frames[top].end_default_target = None;
            }

            match instruction {
                Instruction::Transition {
                    next_state,
                    payload,
                } => {
                    // Inside __end__ this is the candidate default parent
                    // transition, not an in-frame move.
                    if state_name == END_STATE {
                        self.frames[top].end_default_target = Some((next_state, payload));
                        continue;
                    }
                    let target = match &self.resolver {
                        Some(resolver) => resolver
                            .resolve(&state_name, &next_state)
                            .unwrap_or(next_state),
                        None => next_state,
                    };
                    // Validate against this frame's own definition only;
                    // current_state is untouched on failure.
                    if !self.frames[top].def.contains(&target) {
                        return self.fail(EngineError::UnknownState { state: target });
                    }
                    debug!(run_id = %self.run_id, from = %state_name, to = %target, "transition");
                    self.frames[top].current_state = target.clone();
                    self.frames[top].computation = None;
                    self.pending_input = payload;
                    self.observe(&EngineEvent::StateAdvanced {
                        state: target,
                        depth: self.frames.len(),
                    });
                    continue;
                }

                Instruction::ParentTransition {
                    next_state_for_parent,
                    payload,
                } => {
                    if self.frames.len() < 2 {
                        return self.fail(EngineError::UnknownParent);
                    }
                    // The child's own __end__ is never consulted.
                    self.frames.pop();
                    let depth = self.frames.len();
                    debug!(run_id = %self.run_id, depth, to = %next_state_for_parent, "parent transition");
                    self.observe(&EngineEvent::FramePopped { depth });
                    if let Err(e) = self.retarget_top(next_state_for_parent, payload) {
                        return self.fail(e);
                    }
                    continue;
                }

                Instruction::RequestInput { .. } => {
                    self.state = RunState::AwaitingInput;
                    let forwarded = instruction.clone();
                    self.observe(&EngineEvent::InstructionForwarded {
                        instruction: forwarded,
                    });
                    return Ok(Produced::AwaitingInput(instruction));
                }

                // Non-suspending side-channel instructions: forwarded verbatim,
                // frame not advanced.
                other => {
                    self.observe(&EngineEvent::InstructionForwarded {
                        instruction: other.clone(),
                    });
                    return Ok(Produced::Instruction(other));
                }
            }
        }
    }

    /// Point the (new) top frame at `target`, delivering `payload` as the next
    /// computation's input. The target must exist in that frame's own definition.
    fn retarget_top(
        &mut self,
        target: String,
        payload: Option<JsonValue>,
    ) -> Result<(), EngineError> {
        let top = self
            .frames
            .last_mut()
            .expect("retarget requires a live frame");
        if !top.def.contains(&target) {
            return Err(EngineError::UnknownState { state: target });
        }
        top.current_state = target.clone();
        top.computation = None;
        self.pending_input = payload;
        let depth = self.frames.len();
        self.observe(&EngineEvent::StateAdvanced {
            state: target,
            depth,
        });
        Ok(())
    }

    fn complete(&mut self) -> Produced {
        self.state = RunState::Done;
        debug!(run_id = %self.run_id, "run completed");
        self.observe(&EngineEvent::RunCompleted);
        Produced::Done
    }

    /// Move to `Failed` and surface the error to the runner as a forwarded
    /// `error` instruction. The stack is abandoned as-is.
    fn fail(&mut self, err: EngineError) -> Result<Produced, EngineError> {
        self.state = RunState::Failed;
        self.failure = Some(err.clone());
        debug!(run_id = %self.run_id, error = %err, "run failed");
        let instruction = Instruction::error(err.to_string())
            .with_payload(json!({ "error_kind": err.kind() }));
        self.observe(&EngineEvent::InstructionForwarded {
            instruction: instruction.clone(),
        });
        self.observe(&EngineEvent::RunFailed {
            error: err.to_string(),
        });
        Ok(Produced::Instruction(instruction))
    }

    fn observe(&mut self, event: &EngineEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("frames", &self.frames)
            .finish()
    }
}
