//! Machine definitions
//!
//! A machine definition maps state names to either a computation constructor or a
//! nested machine definition (a sub-machine). Every definition, at every nesting
//! level, must contain `__start__` and `__end__`; this is checked when the
//! definition is built and again before it is ever handed to an engine, so a
//! malformed graph never runs partially.

use std::collections::HashMap;
use std::rc::Rc;

use crate::computation::{ComputationFactory, ScriptStep};
use crate::error::EngineError;

/// Entry state of every machine.
pub const START_STATE: &str = "__start__";
/// Terminal state of every machine.
pub const END_STATE: &str = "__end__";

/// What a state name resolves to.
#[derive(Debug, Clone)]
pub enum StateDef {
    /// Constructor for the state's computation.
    Computation(ComputationFactory),
    /// A nested machine, entered at `__start__` on its own stack frame.
    SubMachine(Rc<MachineDef>),
}

/// Mapping from state name to state definition.
#[derive(Debug, Clone, Default)]
pub struct MachineDef {
    states: HashMap<String, StateDef>,
}

impl MachineDef {
    pub fn builder() -> MachineDefBuilder {
        MachineDefBuilder::default()
    }

    pub fn get(&self, state: &str) -> Option<&StateDef> {
        self.states.get(state)
    }

    pub fn contains(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(|s| s.as_str())
    }

    /// Check the `__start__`/`__end__` invariant for this definition and every
    /// nested definition.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.validate_at("root")
    }

    fn validate_at(&self, path: &str) -> Result<(), EngineError> {
        for required in [START_STATE, END_STATE] {
            if !self.states.contains_key(required) {
                return Err(EngineError::Structural(format!(
                    "machine '{path}' is missing the '{required}' state"
                )));
            }
        }
        for (name, def) in &self.states {
            if let StateDef::SubMachine(sub) = def {
                sub.validate_at(&format!("{path}.{name}"))?;
            }
        }
        Ok(())
    }
}

/// Builder for `MachineDef`; `build` enforces the structural invariant.
#[derive(Debug, Default)]
pub struct MachineDefBuilder {
    states: HashMap<String, StateDef>,
}

impl MachineDefBuilder {
    /// Register a computation-backed state.
    pub fn state(mut self, name: impl Into<String>, factory: ComputationFactory) -> Self {
        self.states
            .insert(name.into(), StateDef::Computation(factory));
        self
    }

    /// Register a scripted state; shorthand for `state` with
    /// `ComputationFactory::scripted`.
    pub fn scripted<F>(self, name: impl Into<String>, build: F) -> Self
    where
        F: Fn(Option<serde_json::Value>) -> Vec<ScriptStep> + 'static,
    {
        self.state(name, ComputationFactory::scripted(build))
    }

    /// Register a state handled by a nested machine.
    pub fn sub_machine(mut self, name: impl Into<String>, def: MachineDef) -> Self {
        self.states
            .insert(name.into(), StateDef::SubMachine(Rc::new(def)));
        self
    }

    pub fn build(self) -> Result<MachineDef, EngineError> {
        let def = MachineDef {
            states: self.states,
        };
        def.validate()?;
        Ok(def)
    }
}
