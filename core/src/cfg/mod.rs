//! The control-flow graph consumed by the execution engine.
//!
//! Nodes are stored in an id-indexed arena; adjacency lives in parallel
//! vectors of small successor/predecessor lists. The engine never mutates a
//! graph: it is built once by [`ControlFlowGraph::lower`] and walked by id.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use smallvec::SmallVec;

use crate::{
    Identifier,
    syntax::{CompilationUnit, Expression, Invocation, Lhs, Rhs},
    types::RuntimeType,
};

mod lower;

// NODE IDS
// ================================================================================================

/// The id of a node within a [`ControlFlowGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// NODE KINDS
// ================================================================================================

/// A single executable statement carried by a statement node.
///
/// Structured control flow never reaches the graph: `Ite`/`While` lower to a
/// branch node whose successors begin with guard assumptions, and
/// `Try`/`Catch` lower to the dedicated entry/exit node kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Declare { ty: RuntimeType, var: Identifier },
    Assign { lhs: Lhs, rhs: Rhs },
    Assert { assertion: Expression },
    Assume { assumption: Expression },
    Return { expression: Option<Expression> },
    Lock { var: Identifier },
    Unlock { var: Identifier },
    Fork { invocation: Invocation },
    Skip,
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Declare { ty, var } => write!(f, "{ty} {var}"),
            Step::Assign { lhs, .. } => write!(f, "{lhs} := ..."),
            Step::Assert { assertion } => write!(f, "assert {assertion}"),
            Step::Assume { assumption } => write!(f, "assume {assumption}"),
            Step::Return { .. } => write!(f, "return"),
            Step::Lock { var } => write!(f, "lock {var}"),
            Step::Unlock { var } => write!(f, "unlock {var}"),
            Step::Fork { invocation } => write!(f, "fork {invocation}"),
            Step::Skip => write!(f, "skip"),
        }
    }
}

/// The kind of a CFG node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Statement(Step),
    MemberEntry,
    MemberExit { return_ty: RuntimeType },
    TryEntry { handler: NodeId },
    TryExit,
    CatchEntry,
    CatchExit,
    Exceptional { message: String },
    Call { invocation: Invocation, target: Option<Lhs> },
    Join,
}

impl NodeKind {
    /// A short name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Statement(_) => "statement",
            NodeKind::MemberEntry => "member-entry",
            NodeKind::MemberExit { .. } => "member-exit",
            NodeKind::TryEntry { .. } => "try-entry",
            NodeKind::TryExit => "try-exit",
            NodeKind::CatchEntry => "catch-entry",
            NodeKind::CatchExit => "catch-exit",
            NodeKind::Exceptional { .. } => "exceptional",
            NodeKind::Call { .. } => "call",
            NodeKind::Join => "join",
        }
    }
}

// CFG CONTEXT
// ================================================================================================

/// A point in the graph together with its immediate neighbours.
#[derive(Copy, Clone, Debug)]
pub struct CfgContext<'a> {
    pub predecessors: &'a [NodeId],
    pub id: NodeId,
    pub kind: &'a NodeKind,
    pub successors: &'a [NodeId],
}

// CONTROL-FLOW GRAPH
// ================================================================================================

type Neighbours = SmallVec<[NodeId; 2]>;

/// A directed graph of [`NodeKind`] nodes covering every member body of a
/// compilation unit, with entry/exit nodes registered per `(class, member)`.
#[derive(Clone, Debug, Default)]
pub struct ControlFlowGraph {
    nodes: Vec<NodeKind>,
    successors: Vec<Neighbours>,
    predecessors: Vec<Neighbours>,
    entries: BTreeMap<(Identifier, Identifier), NodeId>,
    exits: BTreeMap<(Identifier, Identifier), NodeId>,
}

impl ControlFlowGraph {
    /// Lowers every method and constructor body of `unit` into one graph.
    pub fn lower(unit: &CompilationUnit) -> Self {
        lower::lower_unit(unit)
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()]
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id.index()]
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.predecessors[id.index()]
    }

    pub fn context(&self, id: NodeId) -> CfgContext<'_> {
        CfgContext {
            predecessors: self.predecessors(id),
            id,
            kind: self.kind(id),
            successors: self.successors(id),
        }
    }

    /// Returns the `MemberEntry` node of `class.member`, if lowered.
    pub fn entry_of(&self, class: &Identifier, member: &Identifier) -> Option<NodeId> {
        self.entries.get(&(class.clone(), member.clone())).copied()
    }

    /// Returns the `MemberExit` node of `class.member`, if lowered.
    pub fn exit_of(&self, class: &Identifier, member: &Identifier) -> Option<NodeId> {
        self.exits.get(&(class.clone(), member.clone())).copied()
    }

    // MUTATORS (lowering only)
    // --------------------------------------------------------------------------------------------

    pub(crate) fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(kind);
        self.successors.push(SmallVec::new());
        self.predecessors.push(SmallVec::new());
        id
    }

    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.successors[from.index()].push(to);
        self.predecessors[to.index()].push(from);
    }

    pub(crate) fn register_member(
        &mut self,
        class: Identifier,
        member: Identifier,
        entry: NodeId,
        exit: NodeId,
    ) {
        self.entries.insert((class.clone(), member.clone()), entry);
        self.exits.insert((class, member), exit);
    }
}
