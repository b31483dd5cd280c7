//! Context passed down by `update_var_violations`.

use tarn_core::Reason;

/// What a violated parent tells its operands while attributing violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationContext {
    /// Violation of the nearest violated ancestor.
    pub parent_violation: u64,
    /// Direction an integer operand should move, when known.
    pub reason: Option<Reason>,
    /// Below an odd number of boolean negations: satisfied comparisons are
    /// what the ancestor wants broken.
    pub negated: bool,
}

impl ViolationContext {
    /// Context without a direction.
    pub fn basic(parent_violation: u64) -> Self {
        Self {
            parent_violation,
            reason: None,
            negated: false,
        }
    }

    /// Context for integer bound constraints.
    pub fn int(parent_violation: u64, reason: Reason) -> Self {
        Self {
            parent_violation,
            reason: Some(reason),
            negated: false,
        }
    }

    /// Same context seen through an integer negation.
    pub fn flipped(&self) -> Self {
        Self {
            reason: self.reason.map(Reason::flip),
            ..*self
        }
    }

    /// Same context seen through a boolean `not`.
    pub fn negated(&self) -> Self {
        Self {
            negated: !self.negated,
            ..self.flipped()
        }
    }

    /// `reason`, or its opposite when negated.
    pub fn directed(&self, reason: Reason) -> Reason {
        if self.negated {
            reason.flip()
        } else {
            reason
        }
    }

    /// Same direction, different magnitude.
    pub fn with_violation(&self, parent_violation: u64) -> Self {
        Self {
            parent_violation,
            ..*self
        }
    }
}
