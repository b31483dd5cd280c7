//! Scenario runner.

use tarn_model::Model;

use crate::error::{ScenarioError, ScenarioResult};
use crate::scenario::{Bindings, Scenario};

/// Runs a scenario against a fresh model.
pub struct Runner<'s> {
    scenario: &'s Scenario,
}

impl<'s> Runner<'s> {
    pub fn new(scenario: &'s Scenario) -> Self {
        Self { scenario }
    }

    /// Run the scenario; returns the model in its final state.
    pub fn run(&self) -> ScenarioResult<Model> {
        let name = self.scenario.name();

        // 1. Build and start the model
        let mut model = Model::new(self.scenario.engine_config().clone());
        let mut bindings = Bindings::default();
        self.scenario.run_setup(&mut model, &mut bindings)?;
        model
            .start()
            .map_err(|e| ScenarioError::build(name, e.to_string()))?;

        // 2. Check the initial state
        self.verify("initial", self.scenario.initial(), &mut model, &bindings, Ok(()))?;

        // 3. Apply each step and verify its assertion
        for step in self.scenario.steps() {
            let mv = step.action.resolve(&step.name, &bindings, model.graph())?;
            let result = match mv {
                Some(mv) => model.apply(&mv).map(|_| ()).map_err(|e| e.to_string()),
                None => Ok(()),
            };
            self.verify(&step.name, &step.assertion, &mut model, &bindings, result)?;
        }

        Ok(model)
    }

    fn verify(
        &self,
        step: &str,
        assertion: &crate::Assertion,
        model: &mut Model,
        bindings: &Bindings,
        result: Result<(), String>,
    ) -> ScenarioResult<()> {
        if result.is_ok() && assertion.needs_var_violations() {
            model
                .update_var_violations()
                .map_err(|e| ScenarioError::step_execution(step, e.to_string()))?;
        }
        assertion.verify(step, model, bindings, &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::{AnyDomain, Literal};

    fn bounded() -> Scenario {
        Scenario::new("bounded").setup(|model, names| {
            let x = model.add_variable(AnyDomain::int_range(0, 9)?, Literal::Int(8))?;
            names.bind("x", x);
            let g = model.graph_mut();
            let five = g.constant(Literal::Int(5));
            let less = g.less(x, five)?;
            model.add_constraint(less)?;
            Ok(())
        })
    }

    // ========== TEST: runner_applies_steps_in_order ==========
    #[test]
    fn test_runner_applies_steps_in_order() {
        // GIVEN x < 5 with x = 8
        let scenario = bounded()
            .initially(|a| a.violation(4).var_violation("x", 4))
            .assign("lower", "x", Literal::Int(2), |a| a.satisfied().int("x", 2))
            .assign("out_of_domain", "x", Literal::Int(12), |a| a.error("outside the domain"));

        // WHEN run
        let model = scenario.run().unwrap();

        // THEN the failed step left x untouched
        assert_eq!(model.violation(), 0);
    }

    #[test]
    fn test_failed_assertion_names_the_step() {
        let scenario = bounded().assign("lower", "x", Literal::Int(2), |a| a.violation(3));
        match scenario.run() {
            Err(ScenarioError::AssertionFailed { step, .. }) => assert_eq!(step, "lower"),
            other => panic!("unexpected {:?}", other.map(|m| m.violation())),
        }
    }
}
