//! In-frame transition behavior

use serde_json::json;

use super::helpers::{drive_to_end, linear_state, silent_end};
use crate::computation::{emit, ComputationFactory};
use crate::engine::{Engine, RunState};
use crate::instruction::{Instruction, NotifyLevel};
use crate::machine::MachineDef;

#[test]
fn test_linear_run_produces_yields_in_order_then_done() {
    let def = MachineDef::builder()
        .state("__start__", linear_state(vec![], "gather"))
        .state(
            "gather",
            linear_state(
                vec![
                    Instruction::notify("one", NotifyLevel::Info),
                    Instruction::debug("two", "trace"),
                    Instruction::custom("three"),
                ],
                "__end__",
            ),
        )
        .state("__end__", silent_end())
        .build()
        .unwrap();

    let mut engine = Engine::new(def).unwrap();
    let (forwarded, state) = drive_to_end(&mut engine);

    assert_eq!(
        forwarded,
        vec![
            Instruction::notify("one", NotifyLevel::Info),
            Instruction::debug("two", "trace"),
            Instruction::custom("three"),
        ]
    );
    assert_eq!(state, RunState::Done);
    assert_eq!(engine.stack_depth(), 0);
}

#[test]
fn test_transition_payload_becomes_next_state_input() {
    let def = MachineDef::builder()
        .scripted("__start__", |_| {
            vec![emit(
                Instruction::transition("greet").with_payload(json!({"user": "ada"})),
            )]
        })
        .scripted("greet", |input| {
            let user = input
                .as_ref()
                .and_then(|v| v["user"].as_str())
                .unwrap_or("unknown")
                .to_string();
            vec![
                emit(Instruction::notify(
                    format!("hello {user}"),
                    NotifyLevel::Info,
                )),
                emit(Instruction::transition("__end__")),
            ]
        })
        .state("__end__", silent_end())
        .build()
        .unwrap();

    let mut engine = Engine::new(def).unwrap();
    let (forwarded, state) = drive_to_end(&mut engine);

    assert_eq!(
        forwarded,
        vec![Instruction::notify("hello ada", NotifyLevel::Info)]
    );
    assert_eq!(state, RunState::Done);
}

#[test]
fn test_self_transition_reinstantiates_a_fresh_computation() {
    // Each pass reads the counter from its input payload; a resumed (rather than
    // re-created) instance would not see the new value.
    let def = MachineDef::builder()
        .scripted("__start__", |_| {
            vec![emit(
                Instruction::transition("tick").with_payload(json!({"n": 0})),
            )]
        })
        .scripted("tick", |input| {
            let n = input.as_ref().and_then(|v| v["n"].as_i64()).unwrap_or(0);
            let mut steps = vec![emit(Instruction::notify(
                format!("tick {n}"),
                NotifyLevel::Progress,
            ))];
            if n < 2 {
                steps.push(emit(
                    Instruction::transition("tick").with_payload(json!({"n": n + 1})),
                ));
            } else {
                steps.push(emit(Instruction::transition("__end__")));
            }
            steps
        })
        .state("__end__", silent_end())
        .build()
        .unwrap();

    let mut engine = Engine::new(def).unwrap();
    let (forwarded, state) = drive_to_end(&mut engine);

    assert_eq!(
        forwarded,
        vec![
            Instruction::notify("tick 0", NotifyLevel::Progress),
            Instruction::notify("tick 1", NotifyLevel::Progress),
            Instruction::notify("tick 2", NotifyLevel::Progress),
        ]
    );
    assert_eq!(state, RunState::Done);
}

#[test]
fn test_instructions_after_a_transition_are_discarded() {
    let def = MachineDef::builder()
        .scripted("__start__", |_| {
            vec![
                emit(Instruction::notify("before", NotifyLevel::Info)),
                emit(Instruction::transition("__end__")),
                emit(Instruction::notify("after", NotifyLevel::Info)),
            ]
        })
        .state("__end__", silent_end())
        .build()
        .unwrap();

    let mut engine = Engine::new(def).unwrap();
    let (forwarded, state) = drive_to_end(&mut engine);

    assert_eq!(
        forwarded,
        vec![Instruction::notify("before", NotifyLevel::Info)]
    );
    assert_eq!(state, RunState::Done);
}

#[test]
fn test_completion_outside_end_is_a_validation_error() {
    let def = MachineDef::builder()
        .state("__start__", linear_state(vec![], "stuck"))
        .state("stuck", ComputationFactory::scripted(|_| vec![]))
        .state("__end__", silent_end())
        .build()
        .unwrap();

    let mut engine = Engine::new(def).unwrap();
    let (forwarded, state) = drive_to_end(&mut engine);

    assert_eq!(state, RunState::Failed);
    let last = forwarded.last().unwrap();
    assert_eq!(last.kind(), "error");
    assert_eq!(last.payload().unwrap()["error_kind"], "validation_error");
}

#[test]
fn test_advance_after_done_stays_done() {
    let def = MachineDef::builder()
        .state("__start__", linear_state(vec![], "__end__"))
        .state("__end__", silent_end())
        .build()
        .unwrap();

    let mut engine = Engine::new(def).unwrap();
    drive_to_end(&mut engine);

    assert!(matches!(
        engine.advance(),
        Ok(crate::engine::Produced::Done)
    ));
    assert_eq!(engine.run_state(), RunState::Done);
}
