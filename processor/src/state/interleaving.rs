use oox_core::cfg::NodeId;

// INTERLEAVING CONSTRAINTS
// ================================================================================================

/// An independence observation over a pair of CFG nodes, produced by POR
/// when it selects more than one thread and consumed by the uniqueness
/// filter one level deeper in the exploration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterleavingConstraint {
    Independent(NodeId, NodeId),
    NotIndependent(NodeId, NodeId),
}

impl InterleavingConstraint {
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        match self {
            InterleavingConstraint::Independent(a, b)
            | InterleavingConstraint::NotIndependent(a, b) => (*a, *b),
        }
    }

    pub fn is_independent(&self) -> bool {
        matches!(self, InterleavingConstraint::Independent(..))
    }
}
