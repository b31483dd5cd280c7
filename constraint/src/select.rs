//! Violation-weighted random variable selection.

use crate::ViolationContainer;
use rand::Rng;
use tarn_core::VarId;

impl ViolationContainer {
    /// Pick a variable among `0..=max_var`, weighted by violation.
    ///
    /// Non-violating variables are not excluded: together they receive the
    /// weight of the smallest recorded violation, shared equally.
    pub fn select_random_var<R: Rng + ?Sized>(&self, max_var: usize, rng: &mut R) -> VarId {
        self.pick(max_var, rng, None)
    }

    /// Pick `count` distinct variables, weighted as [`Self::select_random_var`].
    ///
    /// `count` is clamped to the number of candidates.
    pub fn select_random_vars<R: Rng + ?Sized>(
        &self,
        max_var: usize,
        count: usize,
        rng: &mut R,
    ) -> Vec<VarId> {
        let count = count.min(max_var + 1);
        let min_violation = Some(self.calc_min_violation());
        let mut vars = Vec::with_capacity(count);
        while vars.len() < count {
            let var = self.pick(max_var, rng, min_violation);
            if !vars.contains(&var) {
                vars.push(var);
            }
        }
        vars
    }

    /// Pick a violated variable with probability proportional to its violation.
    pub fn select_violating_var<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<VarId> {
        if self.total_violation() == 0 {
            return None;
        }
        let mut remaining = rng.gen_range(0..self.total_violation());
        for (var, violation) in self.iter() {
            if violation > remaining {
                return Some(var);
            }
            remaining -= violation;
        }
        self.vars_with_violation().last().copied()
    }

    fn pick<R: Rng + ?Sized>(&self, max_var: usize, rng: &mut R, min_violation: Option<u64>) -> VarId {
        if self.total_violation() == 0 {
            return VarId(rng.gen_range(0..=max_var));
        }
        let violating = self
            .vars_with_violation()
            .iter()
            .filter(|id| id.raw() <= max_var)
            .count();
        let non_violating = (max_var + 1) - violating;
        let (point, simulated) = if non_violating == 0 {
            (rng.gen_range(0.0..self.total_violation() as f64), 0.0)
        } else {
            let min = min_violation.unwrap_or_else(|| self.calc_min_violation());
            let simulated = min as f64 / non_violating as f64;
            (
                rng.gen_range(0.0..(self.total_violation() + min) as f64),
                simulated,
            )
        };
        let mut consumed = 0.0;
        for index in 0..=max_var {
            let mut weight = self.var_violation(VarId(index)) as f64;
            if weight == 0.0 {
                weight = simulated;
            }
            consumed += weight;
            if consumed >= point {
                return VarId(index);
            }
        }
        VarId(max_var)
    }
}
