//! The model: a graph plus its top-level constraint and objective.

use crate::error::{ModelError, ModelResult};
use crate::moves::Move;
use rand::Rng;
use tarn_constraint::ViolationContainer;
use tarn_core::{AnyDomain, Kind, Literal, NodeId};
use tarn_graph::{EngineConfig, Graph};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimiseMode {
    Minimise,
    Maximise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Objective {
    pub mode: OptimiseMode,
    pub expr: NodeId,
}

/// A constraint model.
///
/// Built by declaring variables and adding constraints through
/// [`Model::graph_mut`], then started once. After `start` only moves change
/// state.
#[derive(Debug)]
pub struct Model {
    graph: Graph,
    constraints: Vec<NodeId>,
    objective: Option<Objective>,
    /// Conjunction of all constraints, set by `start`.
    root: Option<NodeId>,
    violations: ViolationContainer,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Model {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: Graph::new(config),
            constraints: Vec::new(),
            objective: None,
            root: None,
            violations: ViolationContainer::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The graph, for building expressions.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn is_started(&self) -> bool {
        self.root.is_some()
    }

    fn root(&self) -> ModelResult<NodeId> {
        self.root.ok_or(ModelError::NotStarted)
    }

    fn expect_building(&self, operation: &'static str) -> ModelResult<()> {
        if self.is_started() {
            return Err(ModelError::already_started(operation));
        }
        Ok(())
    }

    // ==================== Building ====================

    /// Declare a decision variable with its initial value.
    pub fn add_variable(&mut self, domain: AnyDomain, init: Literal) -> ModelResult<NodeId> {
        self.expect_building("add_variable")?;
        Ok(self.graph.variable(domain, init)?)
    }

    /// Add a boolean expression that must hold.
    pub fn add_constraint(&mut self, constraint: NodeId) -> ModelResult<()> {
        self.expect_building("add_constraint")?;
        self.graph.check(constraint)?;
        let kind = self.graph.kind(constraint);
        if kind != Kind::Bool {
            return Err(tarn_core::EngineError::kind_mismatch(constraint, Kind::Bool, kind).into());
        }
        self.constraints.push(constraint);
        Ok(())
    }

    /// Set the integer expression to minimise or maximise.
    pub fn set_objective(&mut self, mode: OptimiseMode, expr: NodeId) -> ModelResult<()> {
        self.expect_building("set_objective")?;
        self.graph.check(expr)?;
        let kind = self.graph.kind(expr);
        if kind != Kind::Int {
            return Err(tarn_core::EngineError::kind_mismatch(expr, Kind::Int, kind).into());
        }
        self.objective = Some(Objective { mode, expr });
        Ok(())
    }

    /// Optimise, evaluate and switch the model into incremental mode.
    pub fn start(&mut self) -> ModelResult<()> {
        self.expect_building("start")?;
        let constraints = std::mem::take(&mut self.constraints);
        let root = self.graph.conjunction(constraints)?;
        let root = self.graph.optimise(root);
        self.graph.evaluate(root);
        self.graph.start_triggering(root);
        if let Some(objective) = self.objective {
            self.graph.evaluate(objective.expr);
            self.graph.start_triggering(objective.expr);
        }
        self.graph.sync_defined_variables();
        self.root = Some(root);
        info!(
            variables = self.graph.variables().len(),
            defined = self.graph.defined_variables().len(),
            nodes = self.graph.len(),
            violation = self.graph.violation(root),
            "model started"
        );
        if self.graph.config().sanity_check_after_moves {
            self.assert_sane();
        }
        Ok(())
    }

    // ==================== Reading ====================

    /// Total violation of all constraints; 0 before `start`.
    pub fn violation(&self) -> u64 {
        self.root.map_or(0, |root| self.graph.violation(root))
    }

    /// Current objective value; `None` without an objective or while undefined.
    pub fn objective_value(&self) -> Option<i64> {
        let objective = self.objective?;
        if !self.graph.is_evaluated(objective.expr) {
            return None;
        }
        self.graph.int_if_defined(objective.expr)
    }

    pub fn objective(&self) -> Option<Objective> {
        self.objective
    }

    pub fn variables(&self) -> &[NodeId] {
        self.graph.variables()
    }

    /// Variables a search may pick: those no equality writes.
    pub fn search_variables(&self) -> Vec<NodeId> {
        self.graph
            .variables()
            .iter()
            .copied()
            .filter(|var| !self.graph.is_defined_variable(*var))
            .collect()
    }

    // ==================== Moves ====================

    /// Apply a move; returns the move that undoes it.
    pub fn apply(&mut self, mv: &Move) -> ModelResult<Move> {
        self.root()?;
        let inverse = mv.apply(&mut self.graph)?;
        debug!(%mv, violation = self.violation(), "applied move");
        if self.graph.config().sanity_check_after_moves {
            self.assert_sane();
        }
        Ok(inverse)
    }

    /// Apply `mv`, then keep it only if `accept` approves the new state.
    ///
    /// Rejected moves are undone through their inverse, so listeners see the
    /// revert as an ordinary move. Returns whether the move was kept.
    pub fn try_move<F>(&mut self, mv: &Move, accept: F) -> ModelResult<bool>
    where
        F: FnOnce(&Model) -> bool,
    {
        let inverse = self.apply(mv)?;
        if accept(self) {
            return Ok(true);
        }
        self.apply(&inverse)?;
        debug!(%mv, "move rejected");
        Ok(false)
    }

    pub fn try_assign<F>(&mut self, target: NodeId, value: Literal, accept: F) -> ModelResult<bool>
    where
        F: FnOnce(&Model) -> bool,
    {
        self.try_move(&Move::Assign { target, value }, accept)
    }

    // ==================== Violations ====================

    /// Recompute per-variable violations for the current state.
    pub fn update_var_violations(&mut self) -> ModelResult<&ViolationContainer> {
        let root = self.root()?;
        self.violations.reset();
        self.graph.update_var_violations(root, &mut self.violations);
        Ok(&self.violations)
    }

    /// Violations from the last [`Model::update_var_violations`].
    pub fn var_violations(&self) -> &ViolationContainer {
        &self.violations
    }

    /// Pick a violated search variable, weighted by its violation.
    pub fn select_violating_var<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<NodeId> {
        let candidates: Vec<(NodeId, u64)> = self
            .violations
            .iter()
            .filter_map(|(var, violation)| {
                let node = *self.graph.variables().get(var.raw())?;
                (!self.graph.is_defined_variable(node)).then_some((node, violation))
            })
            .collect();
        let total: u64 = candidates.iter().map(|(_, v)| *v).sum();
        if total == 0 {
            return None;
        }
        let mut remaining = rng.gen_range(0..total);
        for (node, violation) in &candidates {
            if *violation > remaining {
                return Some(*node);
            }
            remaining -= violation;
        }
        candidates.last().map(|(node, _)| *node)
    }

    // ==================== Sanity ====================

    /// Recompute every cached view and compare; see [`Graph::debug_sanity_check`].
    pub fn check_sanity(&self) -> ModelResult<()> {
        let root = self.root()?;
        self.graph.debug_sanity_check(root)?;
        if let Some(objective) = self.objective {
            self.graph.debug_sanity_check(objective.expr)?;
        }
        Ok(())
    }

    /// Panics when the cached state disagrees with a recomputation.
    pub fn assert_sane(&self) {
        if let Err(error) = self.check_sanity() {
            panic!("model is not sane: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tarn_core::SizeAttr;

    fn int_domain() -> AnyDomain {
        AnyDomain::int_range(0, 9).unwrap()
    }

    /// x < y, y < z over three integer variables.
    fn chain(values: [i64; 3]) -> (Model, [NodeId; 3]) {
        let mut model = Model::new(EngineConfig::default().with_sanity_check_after_moves(true));
        let vars = values.map(|v| model.add_variable(int_domain(), Literal::Int(v)).unwrap());
        let g = model.graph_mut();
        let first = g.less(vars[0], vars[1]).unwrap();
        let second = g.less(vars[1], vars[2]).unwrap();
        model.add_constraint(first).unwrap();
        model.add_constraint(second).unwrap();
        (model, vars)
    }

    // ========== TEST: start_evaluates_constraints ==========
    #[test]
    fn test_start_evaluates_constraints() {
        // GIVEN x = 5, y = 3, z = 9
        let (mut model, _) = chain([5, 3, 9]);

        // WHEN started
        model.start().unwrap();

        // THEN only x < y is violated, by 3
        assert_eq!(model.violation(), 3);
        model.assert_sane();
    }

    #[test]
    fn test_building_after_start_is_rejected() {
        let (mut model, _) = chain([0, 1, 2]);
        model.start().unwrap();
        assert!(matches!(
            model.add_variable(int_domain(), Literal::Int(0)),
            Err(ModelError::AlreadyStarted { .. })
        ));
        assert!(matches!(model.start(), Err(ModelError::AlreadyStarted { .. })));
    }

    #[test]
    fn test_moves_require_start() {
        let (mut model, vars) = chain([0, 1, 2]);
        let result = model.apply(&Move::Assign {
            target: vars[0],
            value: Literal::Int(1),
        });
        assert!(matches!(result, Err(ModelError::NotStarted)));
    }

    #[test]
    fn test_non_boolean_constraint_is_rejected() {
        let mut model = Model::default();
        let x = model.add_variable(int_domain(), Literal::Int(1)).unwrap();
        assert!(matches!(model.add_constraint(x), Err(ModelError::Engine(_))));
    }

    // ========== TEST: rejected_move_restores_state ==========
    #[test]
    fn test_rejected_move_restores_state() {
        // GIVEN a started chain
        let (mut model, vars) = chain([5, 3, 9]);
        model.start().unwrap();

        // WHEN a move is tried and rejected
        let mut seen = None;
        let kept = model
            .try_assign(vars[1], Literal::Int(7), |m| {
                seen = Some(m.violation());
                false
            })
            .unwrap();

        // THEN the predicate saw the new state and the old one is back
        assert!(!kept);
        assert_eq!(seen, Some(0));
        assert_eq!(model.violation(), 3);
        assert_eq!(model.graph().int(vars[1]), 3);
    }

    #[test]
    fn test_accepted_move_is_kept() {
        let (mut model, vars) = chain([5, 3, 9]);
        model.start().unwrap();
        let kept = model
            .try_assign(vars[1], Literal::Int(7), |m| m.violation() == 0)
            .unwrap();
        assert!(kept);
        assert_eq!(model.graph().int(vars[1]), 7);
    }

    // ========== TEST: set_moves_invert ==========
    #[test]
    fn test_set_moves_invert() {
        // GIVEN forall i in S: i mod 2 = 0 with S = {1, 2, 3}
        let mut model = Model::new(EngineConfig::default().with_sanity_check_after_moves(true));
        let domain = AnyDomain::set(SizeAttr::NoSize, AnyDomain::int_range(1, 5).unwrap());
        let s = model
            .add_variable(domain, Literal::set(Literal::ints([1, 2, 3])))
            .unwrap();
        let g = model.graph_mut();
        let two = g.constant(Literal::Int(2));
        let zero = g.constant(Literal::Int(0));
        let forall = g
            .forall(s, |g, i| {
                let m = g.modulo(i, two)?;
                g.int_eq(m, zero)
            })
            .unwrap();
        model.add_constraint(forall).unwrap();
        model.start().unwrap();
        assert_eq!(model.violation(), 2);

        // WHEN members are removed and added, one tentatively
        let hash = model.graph().hash_of(s);
        let kept = model
            .try_move(
                &Move::RemoveMember {
                    container: s,
                    index: 0,
                },
                |m| m.violation() == 0,
            )
            .unwrap();
        assert!(!kept);
        assert_eq!(model.graph().hash_of(s), hash);
        assert_eq!(model.violation(), 2);

        let undo = model
            .apply(&Move::AddMember {
                container: s,
                value: Literal::Int(5),
            })
            .unwrap();

        // THEN each step is propagated and inverses restore the value
        assert_eq!(model.violation(), 3);
        model.apply(&undo).unwrap();
        assert_eq!(model.violation(), 2);
        assert_eq!(model.graph().hash_of(s), hash);
    }

    #[test]
    fn test_objective_is_read_back() {
        let mut model = Model::default();
        let x = model.add_variable(int_domain(), Literal::Int(4)).unwrap();
        let y = model.add_variable(int_domain(), Literal::Int(6)).unwrap();
        let g = model.graph_mut();
        let terms = g.sequence_lit(vec![x, y]).unwrap();
        let total = g.sum(terms).unwrap();
        model.set_objective(OptimiseMode::Minimise, total).unwrap();
        assert_eq!(model.objective_value(), None);
        model.start().unwrap();
        assert_eq!(model.objective_value(), Some(10));
        model
            .apply(&Move::Assign {
                target: x,
                value: Literal::Int(1),
            })
            .unwrap();
        assert_eq!(model.objective_value(), Some(7));
        assert_eq!(model.violation(), 0);
    }

    // ========== TEST: defined_variables_are_never_selected ==========
    #[test]
    fn test_defined_variables_are_never_selected() {
        // GIVEN y = x and x < 0 is impossible, so x stays violated
        let mut model = Model::default();
        let x = model.add_variable(int_domain(), Literal::Int(3)).unwrap();
        let y = model.add_variable(int_domain(), Literal::Int(0)).unwrap();
        let g = model.graph_mut();
        let define = g.int_eq(y, x).unwrap();
        let one = g.constant(Literal::Int(1));
        let bound = g.less(x, one).unwrap();
        model.add_constraint(define).unwrap();
        model.add_constraint(bound).unwrap();
        model.start().unwrap();
        assert_eq!(model.search_variables(), vec![x]);

        // WHEN violations are attributed and a variable picked
        model.update_var_violations().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // THEN only x is ever chosen
        for _ in 0..20 {
            assert_eq!(model.select_violating_var(&mut rng), Some(x));
        }
    }
}
