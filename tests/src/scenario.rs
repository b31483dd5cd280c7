//! Scenario definitions.

use std::collections::HashMap;
use tarn_core::{Literal, NodeId};
use tarn_graph::{EngineConfig, Graph};
use tarn_model::{Model, ModelResult, Move};

use crate::assertion::{Assertion, AssertionBuilder};
use crate::error::{ScenarioError, ScenarioResult};
use crate::runner::Runner;

/// Names given to nodes during setup, used by steps and assertions.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    nodes: HashMap<String, NodeId>,
}

impl Bindings {
    /// Name a node; returns it for chaining inside setup code.
    pub fn bind(&mut self, name: impl Into<String>, id: NodeId) -> NodeId {
        self.nodes.insert(name.into(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    pub(crate) fn resolve(&self, step: &str, name: &str) -> ScenarioResult<NodeId> {
        self.get(name)
            .ok_or_else(|| ScenarioError::unknown_node(step, name))
    }
}

/// What a step does, by node name.
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Only check the current state.
    Check,
    Assign { name: String, value: Literal },
    /// Assign the member at `index` of a container variable.
    AssignMember { name: String, index: usize, value: Literal },
    AddMember { name: String, value: Literal },
    /// Remove the first member equal to `value`.
    RemoveValue { name: String, value: Literal },
    RemoveAt { name: String, index: usize },
    Insert { name: String, index: usize, value: Literal },
    Swap { name: String, a: usize, b: usize },
    FunctionAssign { name: String, slot: usize, value: Literal },
    PartitionMove { name: String, member: usize, part: usize },
}

impl StepAction {
    /// The move this action stands for in the current state.
    pub(crate) fn resolve(&self, step: &str, bindings: &Bindings, graph: &Graph) -> ScenarioResult<Option<Move>> {
        let mv = match self {
            StepAction::Check => return Ok(None),
            StepAction::Assign { name, value } => Move::Assign {
                target: bindings.resolve(step, name)?,
                value: value.clone(),
            },
            StepAction::AssignMember { name, index, value } => {
                let container = bindings.resolve(step, name)?;
                let target = graph
                    .member(container, *index)
                    .map_err(|e| ScenarioError::step_execution(step, e.to_string()))?;
                Move::Assign {
                    target,
                    value: value.clone(),
                }
            }
            StepAction::AddMember { name, value } => Move::AddMember {
                container: bindings.resolve(step, name)?,
                value: value.clone(),
            },
            StepAction::RemoveValue { name, value } => {
                let container = bindings.resolve(step, name)?;
                let hash = value.hash();
                let index = graph
                    .members(container)
                    .iter()
                    .position(|member| graph.hash_of(*member) == hash)
                    .ok_or_else(|| {
                        ScenarioError::step_execution(step, format!("{} holds no {}", name, value))
                    })?;
                Move::RemoveMember { container, index }
            }
            StepAction::RemoveAt { name, index } => Move::RemoveMember {
                container: bindings.resolve(step, name)?,
                index: *index,
            },
            StepAction::Insert { name, index, value } => Move::SequenceInsert {
                sequence: bindings.resolve(step, name)?,
                index: *index,
                value: value.clone(),
            },
            StepAction::Swap { name, a, b } => Move::SequenceSwap {
                sequence: bindings.resolve(step, name)?,
                a: *a,
                b: *b,
            },
            StepAction::FunctionAssign { name, slot, value } => Move::FunctionAssign {
                function: bindings.resolve(step, name)?,
                slot: *slot,
                value: value.clone(),
            },
            StepAction::PartitionMove { name, member, part } => Move::PartitionMove {
                partition: bindings.resolve(step, name)?,
                member: *member,
                part: *part,
            },
        };
        Ok(Some(mv))
    }
}

/// A named step: an action and what must hold afterwards.
#[derive(Debug)]
pub struct Step {
    pub name: String,
    pub action: StepAction,
    pub assertion: Assertion,
}

type Setup = Box<dyn Fn(&mut Model, &mut Bindings) -> ModelResult<()>>;

/// A model plus the steps to run against it.
pub struct Scenario {
    name: String,
    config: EngineConfig,
    setup: Option<Setup>,
    initial: Assertion,
    steps: Vec<Step>,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("steps", &self.steps)
            .finish()
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: EngineConfig::default(),
            setup: None,
            initial: Assertion::default(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    /// Declare variables and constraints, naming what steps refer to.
    pub fn setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Model, &mut Bindings) -> ModelResult<()> + 'static,
    {
        self.setup = Some(Box::new(f));
        self
    }

    pub(crate) fn run_setup(&self, model: &mut Model, bindings: &mut Bindings) -> ScenarioResult<()> {
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| ScenarioError::build(&self.name, "no setup given"))?;
        setup(model, bindings).map_err(|e| ScenarioError::build(&self.name, e.to_string()))
    }

    /// What must hold right after the model starts.
    pub fn initially<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        self.initial = f(AssertionBuilder::new()).build();
        self
    }

    pub(crate) fn initial(&self) -> &Assertion {
        &self.initial
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    // ==================== Steps ====================

    fn push<F>(mut self, name: &str, action: StepAction, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        self.steps.push(Step {
            name: name.to_string(),
            action,
            assertion: f(AssertionBuilder::new()).build(),
        });
        self
    }

    pub fn check<F>(self, step: &str, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        self.push(step, StepAction::Check, f)
    }

    pub fn assign<F>(self, step: &str, node: &str, value: Literal, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::Assign {
            name: node.to_string(),
            value,
        };
        self.push(step, action, f)
    }

    pub fn assign_member<F>(self, step: &str, node: &str, index: usize, value: Literal, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::AssignMember {
            name: node.to_string(),
            index,
            value,
        };
        self.push(step, action, f)
    }

    pub fn add_member<F>(self, step: &str, node: &str, value: Literal, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::AddMember {
            name: node.to_string(),
            value,
        };
        self.push(step, action, f)
    }

    pub fn remove_value<F>(self, step: &str, node: &str, value: Literal, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::RemoveValue {
            name: node.to_string(),
            value,
        };
        self.push(step, action, f)
    }

    pub fn remove_at<F>(self, step: &str, node: &str, index: usize, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::RemoveAt {
            name: node.to_string(),
            index,
        };
        self.push(step, action, f)
    }

    pub fn insert<F>(self, step: &str, node: &str, index: usize, value: Literal, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::Insert {
            name: node.to_string(),
            index,
            value,
        };
        self.push(step, action, f)
    }

    pub fn swap<F>(self, step: &str, node: &str, a: usize, b: usize, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::Swap {
            name: node.to_string(),
            a,
            b,
        };
        self.push(step, action, f)
    }

    pub fn function_assign<F>(self, step: &str, node: &str, slot: usize, value: Literal, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::FunctionAssign {
            name: node.to_string(),
            slot,
            value,
        };
        self.push(step, action, f)
    }

    pub fn partition_move<F>(self, step: &str, node: &str, member: usize, part: usize, f: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        let action = StepAction::PartitionMove {
            name: node.to_string(),
            member,
            part,
        };
        self.push(step, action, f)
    }

    /// Run every step; returns the model in its final state.
    pub fn run(&self) -> ScenarioResult<Model> {
        Runner::new(self).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::AnyDomain;

    #[test]
    fn test_steps_keep_declaration_order() {
        let scenario = Scenario::new("order")
            .assign("first", "x", Literal::Int(1), |a| a.violation(0))
            .check("second", |a| a.violation(0));
        let names: Vec<_> = scenario.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_unknown_node_is_reported() {
        let mut model = Model::default();
        let x = model
            .add_variable(AnyDomain::int_range(0, 3).unwrap(), Literal::Int(0))
            .unwrap();
        let mut bindings = Bindings::default();
        bindings.bind("x", x);
        let action = StepAction::Assign {
            name: "y".to_string(),
            value: Literal::Int(1),
        };
        assert!(matches!(
            action.resolve("step", &bindings, model.graph()),
            Err(ScenarioError::UnknownNode { .. })
        ));
    }
}
