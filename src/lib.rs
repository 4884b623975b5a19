//! # cadence-core — stack-based workflow state machine engine
//!
//! Workflows are graphs of named states. Each state's behavior is a resumable
//! computation that talks to its host through a small instruction protocol; the
//! engine drives those computations from an explicit frame stack, supporting
//! machines nested as sub-machines inside states of a parent machine.
//!
//! - **Instructions** (`instruction`): the closed vocabulary yielded at suspension
//!   points. The engine consumes `transition`/`parent_transition`; everything else
//!   is forwarded to the runner.
//! - **Computations** (`computation`): the resumable-unit contract plus `Script`,
//!   a manually threaded stand-in for a coroutine.
//! - **Machine definitions** (`machine`): state name → computation constructor or
//!   nested definition, with the `__start__`/`__end__` invariant checked up front.
//! - **Engine** (`engine`): the cooperative, single-threaded drive loop over an
//!   explicit `Vec<Frame>` stack. One engine instance per run.
//! - **Runner** (`runner`): the reference consumer; performs real I/O for
//!   `request_input` and observes everything else.

pub mod computation;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod machine;
pub mod observer;
pub mod resolver;
pub mod runner;

// Re-export the main types
pub use computation::{
    emit, on_input, ComputationFactory, Script, ScriptStep, StateComputation, Step,
};
pub use engine::{Engine, Produced, RunState};
pub use error::EngineError;
pub use instruction::{Instruction, NotifyLevel};
pub use machine::{MachineDef, StateDef, END_STATE, START_STATE};
pub use observer::{EngineEvent, EngineObserver, EventLog};
pub use resolver::{LabeledGraphResolver, TransitionResolver};
pub use runner::{InputSource, QueuedInput, Runner, StdinInput};
