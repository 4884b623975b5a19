//! Reference runner
//!
//! Consumes the engine's produced sequence to exhaustion. `request_input`
//! instructions are answered through an `InputSource`; everything else is logged.
//! A forwarded `error` instruction is log-and-continue, unless the engine itself
//! has moved to `Failed`, in which case the runner stops driving and surfaces the
//! failure without unwinding anything.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, Produced, RunState};
use crate::instruction::{Instruction, NotifyLevel};

/// The resume channel: one value per suspension.
///
/// An engine whose source never answers stays suspended indefinitely, holding
/// whatever its computation captured; the queue-backed source below fails fast
/// instead when it runs dry.
pub trait InputSource {
    fn request(&mut self, query: &str, payload: Option<&JsonValue>) -> Result<JsonValue>;
}

/// Interactive console input: prints the query, reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdinInput;

impl InputSource for StdinInput {
    fn request(&mut self, query: &str, _payload: Option<&JsonValue>) -> Result<JsonValue> {
        print!("[input] {query} ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read input line")?;
        Ok(JsonValue::String(line.trim_end_matches('\n').to_string()))
    }
}

/// Pre-scripted input values, answered in order.
#[derive(Debug, Default)]
pub struct QueuedInput {
    values: VecDeque<JsonValue>,
}

impl QueuedInput {
    pub fn new(values: Vec<JsonValue>) -> Self {
        QueuedInput {
            values: values.into(),
        }
    }
}

impl InputSource for QueuedInput {
    fn request(&mut self, query: &str, _payload: Option<&JsonValue>) -> Result<JsonValue> {
        self.values
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("input queue exhausted at query: {query}"))
    }
}

/// What a completed run looked like from the runner's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Forwarded instructions observed, including the `request_input`s.
    pub forwarded: usize,
    /// Resume values supplied.
    pub inputs_supplied: usize,
}

/// Drives one engine to exhaustion.
pub struct Runner<I: InputSource> {
    input: I,
    debug_mode: bool,
}

impl<I: InputSource> Runner<I> {
    pub fn new(input: I) -> Self {
        Runner {
            input,
            debug_mode: false,
        }
    }

    /// Log `debug` instructions too (they are skipped by default).
    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn run(&mut self, engine: &mut Engine) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            match engine.advance().context("workflow run aborted")? {
                Produced::Done => {
                    info!(run_id = %engine.run_id(), "workflow run completed");
                    return Ok(summary);
                }

                Produced::AwaitingInput(instruction) => {
                    summary.forwarded += 1;
                    let Instruction::RequestInput { query, payload } = &instruction else {
                        anyhow::bail!("engine suspended on a non-request_input instruction");
                    };
                    let value = self.input.request(query, payload.as_ref())?;
                    summary.inputs_supplied += 1;
                    engine
                        .resume(value)
                        .context("Failed to resume suspended engine")?;
                }

                Produced::Instruction(instruction) => {
                    summary.forwarded += 1;
                    self.handle(&instruction);
                    if engine.run_state() == RunState::Failed {
                        anyhow::bail!(
                            "engine failed; stack abandoned at depth {}",
                            engine.stack_depth()
                        );
                    }
                }
            }
        }
    }

    fn handle(&self, instruction: &Instruction) {
        match instruction {
            Instruction::Notify {
                message,
                level,
                payload,
            } => match level {
                NotifyLevel::Info => info!(payload = ?payload, "{message}"),
                NotifyLevel::Success => info!(payload = ?payload, "[success] {message}"),
                NotifyLevel::Progress => info!(payload = ?payload, "[progress] {message}"),
                NotifyLevel::Warning => warn!(payload = ?payload, "{message}"),
            },

            Instruction::Debug {
                message,
                level,
                payload,
            } => {
                if self.debug_mode {
                    debug!(channel = %level, payload = ?payload, "{message}");
                }
            }

            Instruction::Warning { message, payload } => {
                warn!(payload = ?payload, "{message}");
            }

            // Log and continue; the run loop separately stops if the engine
            // itself has failed.
            Instruction::Error { message, payload } => {
                error!(payload = ?payload, "{message}");
            }

            Instruction::Custom { name, payload } => {
                info!(payload = ?payload, "[custom] {name}");
            }

            // Control kinds are consumed by the engine and never forwarded.
            Instruction::Transition { .. } | Instruction::ParentTransition { .. } => {}

            // Already answered in the run loop; nothing further to do here.
            Instruction::RequestInput { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::{emit, on_input};
    use crate::engine::Engine;
    use crate::instruction::Instruction;
    use crate::machine::MachineDef;
    use serde_json::json;

    fn sink_end() -> MachineDef {
        MachineDef::builder()
            .scripted("__start__", |_| {
                vec![
                    emit(Instruction::request_input("name?")),
                    on_input(|value| {
                        vec![
                            emit(Instruction::notify(
                                format!("hi {}", value.as_str().unwrap_or("?")),
                                NotifyLevel::Info,
                            )),
                            emit(Instruction::transition("__end__")),
                        ]
                    }),
                ]
            })
            .scripted("__end__", |_| vec![])
            .build()
            .unwrap()
    }

    #[test]
    fn test_queued_run_to_completion() {
        let mut engine = Engine::new(sink_end()).unwrap();
        let mut runner = Runner::new(QueuedInput::new(vec![json!("ada")]));

        let summary = runner.run(&mut engine).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                forwarded: 2,
                inputs_supplied: 1
            }
        );
        assert_eq!(engine.run_state(), RunState::Done);
    }

    #[test]
    fn test_exhausted_queue_surfaces_the_query() {
        let mut engine = Engine::new(sink_end()).unwrap();
        let mut runner = Runner::new(QueuedInput::new(vec![]));

        let err = runner.run(&mut engine).unwrap_err();
        assert!(err.to_string().contains("name?"));
        // Still suspended; a resumable driver could pick the run back up.
        assert_eq!(engine.run_state(), RunState::AwaitingInput);
    }

    #[test]
    fn test_error_instruction_alone_does_not_stop_the_run() {
        let def = MachineDef::builder()
            .scripted("__start__", |_| {
                vec![
                    emit(Instruction::error("recoverable hiccup")),
                    emit(Instruction::transition("__end__")),
                ]
            })
            .scripted("__end__", |_| vec![])
            .build()
            .unwrap();

        let mut engine = Engine::new(def).unwrap();
        let mut runner = Runner::new(QueuedInput::default());

        let summary = runner.run(&mut engine).unwrap();
        assert_eq!(summary.forwarded, 1);
        assert_eq!(engine.run_state(), RunState::Done);
    }

    #[test]
    fn test_engine_failure_stops_the_runner() {
        let def = MachineDef::builder()
            .scripted("__start__", |_| {
                vec![emit(Instruction::transition("missing"))]
            })
            .scripted("__end__", |_| vec![])
            .build()
            .unwrap();

        let mut engine = Engine::new(def).unwrap();
        let mut runner = Runner::new(QueuedInput::default());

        let err = runner.run(&mut engine).unwrap_err();
        assert!(err.to_string().contains("engine failed"));
        assert_eq!(engine.run_state(), RunState::Failed);
    }
}
