//! Defined-variable forwarding.
//!
//! An equality whose one side is a decision variable used nowhere else may
//! write the other side's value straight into that variable. Each such
//! equality carries a [`DefinesLock`]: a round stamp that lets it forward at
//! most once per propagation round, so two equalities defining each other
//! cannot bounce a value back and forth.

use crate::expr::Expr;
use crate::Graph;
use tarn_core::NodeId;
use tracing::debug;

/// Round-scoped forwarding token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinesLock {
    stamp: u64,
}

impl DefinesLock {
    const DISABLED: u64 = u64::MAX;

    /// A lock that allows forwarding from the next round on.
    pub fn enabled() -> Self {
        Self { stamp: 0 }
    }

    pub fn is_disabled(&self) -> bool {
        self.stamp == Self::DISABLED
    }

    /// Take the lock for `round`; fails if disabled or already taken this round.
    pub fn try_lock(&mut self, round: u64) -> bool {
        if !self.soft_try(round) {
            return false;
        }
        self.stamp = round;
        true
    }

    /// Whether `try_lock` would succeed, without taking the lock.
    pub fn soft_try(&self, round: u64) -> bool {
        !self.is_disabled() && self.stamp < round
    }

    pub fn disable(&mut self) {
        self.stamp = Self::DISABLED;
    }

    /// Release a taken lock; returns false if the lock is disabled.
    pub fn reset(&mut self) -> bool {
        if self.is_disabled() {
            return false;
        }
        self.stamp = 0;
        true
    }
}

impl Default for DefinesLock {
    fn default() -> Self {
        Self {
            stamp: Self::DISABLED,
        }
    }
}

impl Graph {
    /// Start a new round: every enabled lock may forward once more.
    pub fn unlock_all(&mut self) {
        self.begin_round();
    }

    pub(crate) fn begin_round(&mut self) {
        self.round += 1;
    }

    /// The equality that writes `var`, if forwarding is set up for it.
    pub fn defined_by(&self, var: NodeId) -> Option<NodeId> {
        self.try_node(var).and_then(|node| node.defined_by)
    }

    /// Whether search should leave `var` alone because an equality writes it.
    pub fn is_defined_variable(&self, var: NodeId) -> bool {
        self.defined_by(var).is_some()
    }

    /// Decision variables written by forwarding equalities.
    pub fn defined_variables(&self) -> Vec<NodeId> {
        self.variables
            .iter()
            .copied()
            .filter(|v| self.is_defined_variable(*v))
            .collect()
    }

    /// Bring every defined variable in line with its source, in a fresh round.
    ///
    /// Called once after triggering starts; from then on the equalities keep
    /// their variables up to date themselves.
    pub fn sync_defined_variables(&mut self) {
        let equalities: Vec<NodeId> = self
            .variables
            .iter()
            .filter_map(|v| self.defined_by(*v))
            .collect();
        if equalities.is_empty() {
            return;
        }
        self.begin_round();
        for equality in &equalities {
            if self.contains(*equality) && matches!(self.expr(*equality), Expr::Equality(_)) {
                crate::ops::equality::sync_definition(self, *equality);
            }
        }
        debug!(count = equalities.len(), "synchronised defined variables");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== TEST: lock_fires_once_per_round ==========
    #[test]
    fn test_lock_fires_once_per_round() {
        // GIVEN an enabled lock
        let mut lock = DefinesLock::enabled();

        // WHEN taken in round 3
        assert!(lock.try_lock(3));

        // THEN it refuses the rest of round 3 and opens in round 4
        assert!(!lock.soft_try(3));
        assert!(!lock.try_lock(3));
        assert!(lock.soft_try(4));
        assert!(lock.try_lock(4));
    }

    #[test]
    fn test_disabled_lock_never_fires() {
        let mut lock = DefinesLock::default();
        assert!(lock.is_disabled());
        assert!(!lock.try_lock(1));
        assert!(!lock.reset());

        let mut lock = DefinesLock::enabled();
        lock.try_lock(5);
        assert!(lock.reset());
        assert!(lock.soft_try(5));
        lock.disable();
        assert!(!lock.soft_try(6));
    }
}
