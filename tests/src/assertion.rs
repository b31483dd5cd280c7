//! Assertion types and builders for verifying step results.

use tarn_model::Model;

use crate::error::{ScenarioError, ScenarioResult};
use crate::scenario::Bindings;

type Custom = Box<dyn Fn(&Model, &Bindings) -> bool>;

/// What must hold after a step.
pub struct Assertion {
    pub violation: Option<u64>,
    pub violation_max: Option<u64>,
    /// `Some(None)` expects an undefined objective.
    pub objective: Option<Option<i64>>,
    pub ints: Vec<(String, i64)>,
    pub defined: Vec<(String, bool)>,
    pub sizes: Vec<(String, usize)>,
    /// Attributed violation per named variable.
    pub var_violations: Vec<(String, u64)>,
    /// The step must fail with an error containing this text.
    pub error: Option<String>,
    /// Run the sanity pass after the step.
    pub sane: bool,
    pub custom: Option<Custom>,
}

impl Default for Assertion {
    fn default() -> Self {
        Self {
            violation: None,
            violation_max: None,
            objective: None,
            ints: Vec::new(),
            defined: Vec::new(),
            sizes: Vec::new(),
            var_violations: Vec::new(),
            error: None,
            sane: true,
            custom: None,
        }
    }
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("violation", &self.violation)
            .field("violation_max", &self.violation_max)
            .field("objective", &self.objective)
            .field("ints", &self.ints)
            .field("defined", &self.defined)
            .field("sizes", &self.sizes)
            .field("var_violations", &self.var_violations)
            .field("error", &self.error)
            .field("sane", &self.sane)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl Assertion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether verifying needs fresh per-variable violations.
    pub(crate) fn needs_var_violations(&self) -> bool {
        !self.var_violations.is_empty()
    }

    /// Check `result` and the model state after step `step`.
    pub fn verify(
        &self,
        step: &str,
        model: &Model,
        bindings: &Bindings,
        result: &Result<(), String>,
    ) -> ScenarioResult<()> {
        if let Some(ref expected) = self.error {
            return match result {
                Err(msg) if msg.contains(expected.as_str()) => Ok(()),
                Err(msg) => Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error containing '{}', got: {}", expected, msg),
                )),
                Ok(()) => Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error containing '{}', but step succeeded", expected),
                )),
            };
        }
        result
            .as_ref()
            .map_err(|msg| ScenarioError::assertion_failed(step, format!("step failed: {}", msg)))?;

        if let Some(expected) = self.violation {
            let actual = model.violation();
            if actual != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected violation {}, got {}", expected, actual),
                ));
            }
        }

        if let Some(max) = self.violation_max {
            let actual = model.violation();
            if actual > max {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected violation at most {}, got {}", max, actual),
                ));
            }
        }

        if let Some(expected) = self.objective {
            let actual = model.objective_value();
            if actual != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected objective {:?}, got {:?}", expected, actual),
                ));
            }
        }

        self.verify_nodes(step, model, bindings)?;

        if let Some(ref custom) = self.custom {
            if !custom(model, bindings) {
                return Err(ScenarioError::assertion_failed(step, "custom assertion failed"));
            }
        }

        if self.sane {
            model
                .check_sanity()
                .map_err(|e| ScenarioError::assertion_failed(step, e.to_string()))?;
        }
        Ok(())
    }

    fn verify_nodes(&self, step: &str, model: &Model, bindings: &Bindings) -> ScenarioResult<()> {
        let graph = model.graph();
        for (name, expected) in &self.ints {
            let node = bindings.resolve(step, name)?;
            let actual = graph.int_if_defined(node);
            if actual != Some(*expected) {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected {} = {}, got {:?}", name, expected, actual),
                ));
            }
        }

        for (name, expected) in &self.defined {
            let node = bindings.resolve(step, name)?;
            if graph.is_defined(node) != *expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected {} defined = {}", name, expected),
                ));
            }
        }

        for (name, expected) in &self.sizes {
            let node = bindings.resolve(step, name)?;
            let actual = graph.size(node);
            if actual != *expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected |{}| = {}, got {}", name, expected, actual),
                ));
            }
        }

        for (name, expected) in &self.var_violations {
            let node = bindings.resolve(step, name)?;
            let var = graph.value_base(node).map(|base| base.id).ok_or_else(|| {
                ScenarioError::assertion_failed(step, format!("{} is not a variable", name))
            })?;
            let actual = model.var_violations().var_violation(var);
            if actual != *expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected {} to carry violation {}, got {}", name, expected, actual),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for assertions.
#[derive(Default)]
pub struct AssertionBuilder {
    assertion: Assertion,
}

impl AssertionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> Assertion {
        self.assertion
    }

    /// Total constraint violation.
    pub fn violation(mut self, n: u64) -> Self {
        self.assertion.violation = Some(n);
        self
    }

    pub fn violation_max(mut self, n: u64) -> Self {
        self.assertion.violation_max = Some(n);
        self
    }

    pub fn satisfied(self) -> Self {
        self.violation(0)
    }

    pub fn objective(mut self, value: i64) -> Self {
        self.assertion.objective = Some(Some(value));
        self
    }

    pub fn objective_undefined(mut self) -> Self {
        self.assertion.objective = Some(None);
        self
    }

    /// A named integer node holds `value`.
    pub fn int(mut self, name: &str, value: i64) -> Self {
        self.assertion.ints.push((name.to_string(), value));
        self
    }

    pub fn defined(mut self, name: &str) -> Self {
        self.assertion.defined.push((name.to_string(), true));
        self
    }

    pub fn undefined(mut self, name: &str) -> Self {
        self.assertion.defined.push((name.to_string(), false));
        self
    }

    pub fn size(mut self, name: &str, size: usize) -> Self {
        self.assertion.sizes.push((name.to_string(), size));
        self
    }

    /// A named variable is credited with `violation`.
    pub fn var_violation(mut self, name: &str, violation: u64) -> Self {
        self.assertion.var_violations.push((name.to_string(), violation));
        self
    }

    pub fn error(mut self, contains: impl Into<String>) -> Self {
        self.assertion.error = Some(contains.into());
        self
    }

    /// Skip the sanity pass for this step.
    pub fn unchecked(mut self) -> Self {
        self.assertion.sane = false;
        self
    }

    pub fn assert_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Model, &Bindings) -> bool + 'static,
    {
        self.assertion.custom = Some(Box::new(f));
        self
    }
}
