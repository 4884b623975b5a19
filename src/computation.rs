//! State computations
//!
//! A state computation is a lazy, finite, non-restartable sequence of instructions.
//! The contract mirrors a coroutine without requiring one: the engine calls
//! `advance(None)` on each drive cycle and `advance(Some(value))` exactly once after
//! a `request_input` suspension. Computations are user code, so they fail through
//! `anyhow` and the engine converts that into a hard `ComputationError`.

use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;
use serde_json::Value as JsonValue;

use crate::instruction::Instruction;

/// One step of a computation: either the next instruction or the completion signal.
#[derive(Debug)]
pub enum Step {
    Yielded(Instruction),
    Completed,
}

/// A resumable unit of execution bound to one state name.
pub trait StateComputation {
    /// Produce the next step.
    ///
    /// `resume` is `Some` only on the first call after a `request_input`
    /// suspension; it carries exactly the value the runner supplied.
    fn advance(&mut self, resume: Option<JsonValue>) -> Result<Step>;
}

pub type BoxedComputation = Box<dyn StateComputation>;

/// Constructor for a state's computation.
///
/// Invoked each time the state is entered, with the payload of the transition that
/// entered it (or `None`). Re-entering a state always constructs a fresh instance;
/// prior instances are never resumed.
#[derive(Clone)]
pub struct ComputationFactory {
    make: Rc<dyn Fn(Option<JsonValue>) -> BoxedComputation>,
}

impl ComputationFactory {
    pub fn new<F>(make: F) -> Self
    where
        F: Fn(Option<JsonValue>) -> BoxedComputation + 'static,
    {
        ComputationFactory {
            make: Rc::new(make),
        }
    }

    /// Factory for `Script`-based states; the closure builds the step list from the
    /// state's initial input.
    pub fn scripted<F>(build: F) -> Self
    where
        F: Fn(Option<JsonValue>) -> Vec<ScriptStep> + 'static,
    {
        ComputationFactory::new(move |input| Box::new(Script::new(build(input))))
    }

    pub fn instantiate(&self, input: Option<JsonValue>) -> BoxedComputation {
        (self.make)(input)
    }
}

impl std::fmt::Debug for ComputationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ComputationFactory")
    }
}

/// One step of a `Script`.
pub enum ScriptStep {
    /// Yield this instruction to the engine.
    Emit(Instruction),
    /// Consume the resume value delivered after the preceding `request_input` and
    /// splice the returned continuation steps at the front of the queue.
    OnInput(Box<dyn FnOnce(JsonValue) -> Vec<ScriptStep>>),
}

/// Emit one instruction.
pub fn emit(instruction: Instruction) -> ScriptStep {
    ScriptStep::Emit(instruction)
}

/// Branch on the resume value delivered for the previous `request_input`.
pub fn on_input<F>(f: F) -> ScriptStep
where
    F: FnOnce(JsonValue) -> Vec<ScriptStep> + 'static,
{
    ScriptStep::OnInput(Box::new(f))
}

/// A manually threaded state machine standing in for a generator.
///
/// The queue is consumed front to back. An `OnInput` step must directly follow the
/// `Emit` of a `request_input` instruction; reaching one without a pending resume
/// value, or receiving a resume value with no `OnInput` at the front, violates the
/// computation contract.
pub struct Script {
    queue: VecDeque<ScriptStep>,
}

impl Script {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Script {
            queue: steps.into(),
        }
    }
}

impl StateComputation for Script {
    fn advance(&mut self, resume: Option<JsonValue>) -> Result<Step> {
        if let Some(value) = resume {
            match self.queue.pop_front() {
                Some(ScriptStep::OnInput(f)) => {
                    let continuation = f(value);
                    for step in continuation.into_iter().rev() {
                        self.queue.push_front(step);
                    }
                }
                _ => anyhow::bail!("resume value delivered but no input step is pending"),
            }
        }

        match self.queue.pop_front() {
            Some(ScriptStep::Emit(instruction)) => Ok(Step::Yielded(instruction)),
            Some(ScriptStep::OnInput(_)) => {
                anyhow::bail!("input step reached without a preceding request_input")
            }
            None => Ok(Step::Completed),
        }
    }
}
