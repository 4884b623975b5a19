//! Test helpers for engine tests
//!
//! Small machine-building shorthands plus a driver that feeds queued resume
//! values, collecting everything the engine forwards.

use std::collections::VecDeque;

use anyhow::Result;
use serde_json::Value as JsonValue;

use crate::computation::{emit, ComputationFactory, StateComputation, Step};
use crate::engine::{Engine, Produced, RunState};
use crate::instruction::Instruction;

/// State that yields the given instructions and then transitions to `next`.
pub fn linear_state(instructions: Vec<Instruction>, next: &str) -> ComputationFactory {
    let next = next.to_string();
    ComputationFactory::scripted(move |_| {
        let mut steps: Vec<_> = instructions.clone().into_iter().map(emit).collect();
        steps.push(emit(Instruction::transition(next.clone())));
        steps
    })
}

/// `__end__` state that yields nothing and completes.
pub fn silent_end() -> ComputationFactory {
    ComputationFactory::scripted(|_| vec![])
}

/// `__end__` state whose last yield is a transition to `target` — the default
/// parent transition when the frame is popped.
pub fn end_with_default(target: &str) -> ComputationFactory {
    let target = target.to_string();
    ComputationFactory::scripted(move |_| vec![emit(Instruction::transition(target.clone()))])
}

/// Computation that fails on its first drive.
pub struct FailingComputation(pub &'static str);

impl StateComputation for FailingComputation {
    fn advance(&mut self, _resume: Option<JsonValue>) -> Result<Step> {
        anyhow::bail!("{}", self.0)
    }
}

/// Drive the engine to completion, failure, or input exhaustion, answering each
/// `request_input` from `inputs` in order. Returns every forwarded instruction in
/// forwarding order and the final run state.
pub fn drive(engine: &mut Engine, inputs: Vec<JsonValue>) -> (Vec<Instruction>, RunState) {
    let mut inputs: VecDeque<JsonValue> = inputs.into();
    let mut forwarded = Vec::new();

    loop {
        match engine.advance() {
            Ok(Produced::Done) => return (forwarded, engine.run_state()),
            Ok(Produced::Instruction(instruction)) => {
                forwarded.push(instruction);
                if engine.run_state() == RunState::Failed {
                    return (forwarded, RunState::Failed);
                }
            }
            Ok(Produced::AwaitingInput(instruction)) => {
                forwarded.push(instruction);
                match inputs.pop_front() {
                    Some(value) => engine.resume(value).expect("resume while awaiting input"),
                    None => return (forwarded, engine.run_state()),
                }
            }
            Err(_) => return (forwarded, engine.run_state()),
        }
    }
}

/// `drive` with no scripted inputs.
pub fn drive_to_end(engine: &mut Engine) -> (Vec<Instruction>, RunState) {
    drive(engine, vec![])
}
