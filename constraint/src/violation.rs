//! Violation containers.

use std::collections::HashMap;
use tarn_core::{Reason, VarId};

/// Accumulated violation per variable, plus child containers for the
/// members of container variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationContainer {
    total_violation: u64,
    var_violations: Vec<u64>,
    /// Variables with nonzero violation, in the order they first received it.
    vars_with_violation: Vec<VarId>,
    children: HashMap<VarId, ViolationContainer>,
    /// Direction integer variables were last asked to move in.
    reasons: HashMap<VarId, Reason>,
}

impl ViolationContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container sized for `number_variables` variables.
    pub fn with_capacity(number_variables: usize) -> Self {
        Self {
            var_violations: vec![0; number_variables],
            ..Self::default()
        }
    }

    /// Add violation to a variable, growing the table as needed.
    pub fn add_violation(&mut self, id: VarId, violation: u64) {
        if violation == 0 {
            return;
        }
        let index = id.raw();
        if index >= self.var_violations.len() {
            self.var_violations.resize(index + 1, 0);
        }
        if self.var_violations[index] == 0 {
            self.vars_with_violation.push(id);
        }
        self.var_violations[index] = self.var_violations[index].saturating_add(violation);
        self.total_violation = self.total_violation.saturating_add(violation);
    }

    /// Clear every violation and child, keeping the table size.
    pub fn reset(&mut self) {
        self.total_violation = 0;
        let size = self.var_violations.len();
        self.var_violations.clear();
        self.var_violations.resize(size, 0);
        self.vars_with_violation.clear();
        self.children.clear();
        self.reasons.clear();
    }

    /// Violation of a variable; zero when never recorded.
    pub fn var_violation(&self, id: VarId) -> u64 {
        self.var_violations.get(id.raw()).copied().unwrap_or(0)
    }

    /// Record the direction a violated integer variable should move in.
    pub fn set_reason(&mut self, id: VarId, reason: Reason) {
        self.reasons.insert(id, reason);
    }

    /// Direction last recorded for `id`, if any.
    pub fn reason(&self, id: VarId) -> Option<Reason> {
        self.reasons.get(&id).copied()
    }

    /// Variables with nonzero violation.
    pub fn vars_with_violation(&self) -> &[VarId] {
        &self.vars_with_violation
    }

    pub fn total_violation(&self) -> u64 {
        self.total_violation
    }

    /// Child container for the members of a container variable, created on demand.
    pub fn child_violations(&mut self, id: VarId) -> &mut ViolationContainer {
        self.children.entry(id).or_default()
    }

    /// Child container, if any member of `id` received violation.
    pub fn child(&self, id: VarId) -> Option<&ViolationContainer> {
        self.children.get(&id)
    }

    pub fn has_child_violation(&self, id: VarId) -> bool {
        self.children.contains_key(&id)
    }

    /// Smallest nonzero variable violation, or zero when nothing is violated.
    pub fn calc_min_violation(&self) -> u64 {
        self.vars_with_violation
            .iter()
            .map(|id| self.var_violation(*id))
            .min()
            .unwrap_or(0)
    }

    /// Iterate `(variable, violation)` pairs for violated variables.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, u64)> + '_ {
        self.vars_with_violation
            .iter()
            .map(move |id| (*id, self.var_violation(*id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ========== TEST: add_violation_tracks_first_violation ==========
    #[test]
    fn test_add_violation_tracks_first_violation() {
        // GIVEN an empty container
        let mut container = ViolationContainer::new();

        // WHEN violation is added twice to v3 and once to v1
        container.add_violation(VarId(3), 2);
        container.add_violation(VarId(1), 1);
        container.add_violation(VarId(3), 4);

        // THEN vars are listed in first-violation order, totals accumulate
        assert_eq!(container.vars_with_violation(), &[VarId(3), VarId(1)]);
        assert_eq!(container.var_violation(VarId(3)), 6);
        assert_eq!(container.total_violation(), 7);
        assert_eq!(container.calc_min_violation(), 1);
    }

    #[test]
    fn test_zero_violation_is_ignored() {
        let mut container = ViolationContainer::new();
        container.add_violation(VarId(0), 0);
        assert!(container.vars_with_violation().is_empty());
    }

    // ========== TEST: reset_clears_children ==========
    #[test]
    fn test_reset_clears_children() {
        // GIVEN a container with a child
        let mut container = ViolationContainer::with_capacity(2);
        container.child_violations(VarId(0)).add_violation(VarId(4), 1);
        container.add_violation(VarId(0), 1);
        assert!(container.has_child_violation(VarId(0)));

        // WHEN reset
        container.reset();

        // THEN it is empty again
        assert_eq!(container, ViolationContainer::with_capacity(2));
        assert_eq!(container.var_violation(VarId(0)), 0);
    }
}
