//! Node arena and read accessors.

use crate::config::EngineConfig;
use crate::event::Prior;
use crate::expr::Expr;
use crate::node::{Node, Pool, ValueBase};
use crate::trigger::Delayed;
use crate::view::{
    FunctionView, MSetView, PartitionView, SequenceView, SetView, TupleView, View,
};
use tarn_core::{EngineError, EngineResult, HashType, Kind, NodeId, LARGE_VIOLATION};

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Slot allocator with a free-list; released slots are reused with a bumped
/// generation so stale ids never alias.
#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn free(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        self.live -= 1;
        Some(node)
    }
}

/// The expression graph.
#[derive(Debug)]
pub struct Graph {
    arena: Arena,
    /// Delayed-trigger stack.
    pub(crate) delayed: Vec<Delayed>,
    pub(crate) processing_delayed: bool,
    /// Nesting of `notify` calls on the stack.
    pub(crate) notify_depth: usize,
    /// Current forwarding round, see [`crate::DefinesLock`].
    pub(crate) round: u64,
    pub(crate) config: EngineConfig,
    /// Decision variables, indexed by their id in the variable pool.
    pub(crate) variables: Vec<NodeId>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Graph {
    /// Create a new empty graph.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            arena: Arena::default(),
            delayed: Vec::new(),
            processing_delayed: false,
            notify_depth: 0,
            round: 1,
            config,
            variables: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.arena.live
    }

    pub fn is_empty(&self) -> bool {
        self.arena.live == 0
    }

    // ==================== Node Storage ====================

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node> {
        self.arena.free(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some()
    }

    /// Fail with `NodeNotFound` for stale ids.
    pub fn check(&self, id: NodeId) -> EngineResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(EngineError::NodeNotFound(id))
        }
    }

    pub(crate) fn try_node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub(crate) fn try_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        match self.arena.get(id) {
            Some(node) => node,
            None => unreachable!("stale node id {}", id),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.arena.get_mut(id) {
            Some(node) => node,
            None => unreachable!("stale node id {}", id),
        }
    }

    pub(crate) fn expr(&self, id: NodeId) -> &Expr {
        &self.node(id).expr
    }

    pub(crate) fn expr_mut(&mut self, id: NodeId) -> &mut Expr {
        &mut self.node_mut(id).expr
    }

    // ==================== Flags ====================

    /// Whether the node currently has a value.
    pub fn is_defined(&self, id: NodeId) -> bool {
        self.node(id).flags.defined
    }

    pub fn is_constant(&self, id: NodeId) -> bool {
        self.node(id).flags.constant
    }

    pub fn is_evaluated(&self, id: NodeId) -> bool {
        self.node(id).flags.evaluated
    }

    pub fn is_triggering(&self, id: NodeId) -> bool {
        self.node(id).flags.triggering
    }

    pub(crate) fn set_defined(&mut self, id: NodeId, defined: bool) {
        self.node_mut(id).flags.defined = defined;
    }

    /// Container back-reference of a value leaf.
    pub fn value_base(&self, id: NodeId) -> Option<ValueBase> {
        self.try_node(id).and_then(Node::value_base)
    }

    pub fn is_variable(&self, id: NodeId) -> bool {
        matches!(
            self.value_base(id),
            Some(ValueBase {
                pool: Pool::Variable,
                ..
            })
        )
    }

    /// Decision variables in pool order.
    pub fn variables(&self) -> &[NodeId] {
        &self.variables
    }

    /// Number of live listeners on a node.
    pub fn listener_count(&self, id: NodeId) -> usize {
        self.try_node(id)
            .map_or(0, |node| node.listeners.active_count())
    }

    // ==================== Views ====================

    /// Follow iterators and index operators to the node holding the value.
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        while let Some(Some(target)) = self.node(id).expr.reference_target() {
            id = target;
        }
        id
    }

    /// The cached view of a node, whether or not it is defined.
    pub fn view(&self, id: NodeId) -> &View {
        &self.node(self.resolve(id)).view
    }

    /// The cached view, or `None` when the node is undefined.
    pub fn view_if_defined(&self, id: NodeId) -> Option<&View> {
        if self.is_defined(id) {
            Some(self.view(id))
        } else {
            None
        }
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.node(id).view.kind()
    }

    /// Violation of a boolean node; `LARGE_VIOLATION` when undefined.
    pub fn violation(&self, id: NodeId) -> u64 {
        if !self.is_defined(id) {
            return LARGE_VIOLATION;
        }
        match self.view(id) {
            View::Bool(violation) => *violation,
            other => unreachable!("violation of {} view on {}", other.kind(), id),
        }
    }

    pub fn violation_if_defined(&self, id: NodeId) -> Option<u64> {
        self.is_defined(id).then(|| self.violation(id))
    }

    /// Value of an integer node. Meaningless when undefined.
    pub fn int(&self, id: NodeId) -> i64 {
        match self.view(id) {
            View::Int(value) => *value,
            View::Enum(value) => *value as i64,
            View::Bool(violation) => (*violation == 0) as i64,
            other => unreachable!("int of {} view on {}", other.kind(), id),
        }
    }

    pub fn int_if_defined(&self, id: NodeId) -> Option<i64> {
        self.is_defined(id).then(|| self.int(id))
    }

    pub fn enum_value(&self, id: NodeId) -> u32 {
        match self.view(id) {
            View::Enum(value) => *value,
            other => unreachable!("enum of {} view on {}", other.kind(), id),
        }
    }

    pub fn hash_of(&self, id: NodeId) -> HashType {
        self.view(id).hash()
    }

    /// Snapshot of the node's current value for a later `Changed` event.
    pub fn prior(&self, id: NodeId) -> Prior {
        match self.view(id) {
            View::Bool(violation) => Prior::Bool(*violation),
            View::Int(value) => Prior::Int(*value),
            View::Enum(value) => Prior::Enum(*value),
            view => Prior::Hash(view.hash()),
        }
    }

    pub fn set_view(&self, id: NodeId) -> &SetView {
        match self.view(id) {
            View::Set(view) => view,
            other => unreachable!("set view expected on {}, found {}", id, other.kind()),
        }
    }

    pub fn mset_view(&self, id: NodeId) -> &MSetView {
        match self.view(id) {
            View::MSet(view) => view,
            other => unreachable!("mset view expected on {}, found {}", id, other.kind()),
        }
    }

    pub fn sequence_view(&self, id: NodeId) -> &SequenceView {
        match self.view(id) {
            View::Sequence(view) => view,
            other => unreachable!("sequence view expected on {}, found {}", id, other.kind()),
        }
    }

    pub fn function_view(&self, id: NodeId) -> &FunctionView {
        match self.view(id) {
            View::Function(view) => view,
            other => unreachable!("function view expected on {}, found {}", id, other.kind()),
        }
    }

    pub fn partition_view(&self, id: NodeId) -> &PartitionView {
        match self.view(id) {
            View::Partition(view) => view,
            other => unreachable!("partition view expected on {}, found {}", id, other.kind()),
        }
    }

    pub fn tuple_view(&self, id: NodeId) -> &TupleView {
        match self.view(id) {
            View::Tuple(view) => view,
            other => unreachable!("tuple view expected on {}, found {}", id, other.kind()),
        }
    }

    /// Own view of a node, never following references; used for writes.
    pub(crate) fn own_view_mut(&mut self, id: NodeId) -> &mut View {
        &mut self.node_mut(id).view
    }

    /// Members of any container view, in view order.
    pub fn members(&self, id: NodeId) -> Vec<NodeId> {
        self.view(id).members()
    }

    /// Number of members of a container view.
    pub fn size(&self, id: NodeId) -> usize {
        self.view(id).len()
    }

    /// Kind of the members of a container node.
    pub fn member_kind(&self, id: NodeId) -> Option<Kind> {
        self.view(id).inner_kind()
    }

    // ==================== Kind Checks ====================

    pub(crate) fn expect_kind(&self, id: NodeId, expected: Kind) -> EngineResult<()> {
        self.check(id)?;
        let actual = self.kind(id);
        if actual == expected {
            Ok(())
        } else {
            Err(EngineError::kind_mismatch(id, expected, actual))
        }
    }

    pub(crate) fn expect_member_kind(&self, id: NodeId, expected: Kind) -> EngineResult<()> {
        self.check(id)?;
        match self.member_kind(id) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(EngineError::kind_mismatch(id, expected, actual)),
            None => Err(EngineError::kind_mismatch(id, Kind::Sequence, self.kind(id))),
        }
    }
}
