//! Lowering of structured member bodies into the flat graph.

use smallvec::{SmallVec, smallvec};

use super::{ControlFlowGraph, NodeId, NodeKind, Step};
use crate::syntax::{CompilationUnit, DeclarationMember, Expression, Statement};

/// The piece of graph produced for one statement or block: its entry node
/// and the open ends whose outgoing edge goes to whatever follows.
struct Segment {
    entry: NodeId,
    open: SmallVec<[NodeId; 2]>,
}

pub(super) fn lower_unit(unit: &CompilationUnit) -> ControlFlowGraph {
    let mut graph = ControlFlowGraph::default();
    for class in &unit.classes {
        for member in &class.members {
            match member {
                DeclarationMember::Method(method) => {
                    lower_member(
                        &mut graph,
                        class.name.clone(),
                        method.name.clone(),
                        NodeKind::MemberExit { return_ty: method.return_ty.clone() },
                        &method.body,
                    );
                },
                DeclarationMember::Constructor(ctor) => {
                    lower_member(
                        &mut graph,
                        class.name.clone(),
                        ctor.name.clone(),
                        NodeKind::MemberExit {
                            return_ty: crate::types::RuntimeType::Reference(class.name.clone()),
                        },
                        &ctor.body,
                    );
                },
                DeclarationMember::Field(_) => {},
            }
        }
    }
    graph
}

fn lower_member(
    graph: &mut ControlFlowGraph,
    class: crate::Identifier,
    member: crate::Identifier,
    exit_kind: NodeKind,
    body: &[Statement],
) {
    let entry = graph.add_node(NodeKind::MemberEntry);
    let exit = graph.add_node(exit_kind);
    graph.register_member(class, member, entry, exit);

    let mut lowerer = Lowerer { graph: &mut *graph, exit };
    let seg = lowerer.lower_block(body);
    graph.add_edge(entry, seg.entry);
    for open in seg.open {
        graph.add_edge(open, exit);
    }
}

struct Lowerer<'a> {
    graph: &'a mut ControlFlowGraph,
    exit: NodeId,
}

impl Lowerer<'_> {
    fn lower_block(&mut self, stmts: &[Statement]) -> Segment {
        let Some(first) = stmts.first() else {
            let skip = self.statement(Step::Skip);
            return Segment { entry: skip, open: smallvec![skip] };
        };
        let head = self.lower_statement(first);
        let entry = head.entry;
        let mut open = head.open;
        for stmt in &stmts[1..] {
            let seg = self.lower_statement(stmt);
            for o in &open {
                self.graph.add_edge(*o, seg.entry);
            }
            open = seg.open;
        }
        Segment { entry, open }
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Segment {
        match stmt {
            Statement::Declare { ty, var } => {
                self.simple(Step::Declare { ty: ty.clone(), var: var.clone() })
            },
            Statement::Assign { lhs, rhs } => {
                self.simple(Step::Assign { lhs: lhs.clone(), rhs: rhs.clone() })
            },
            Statement::Assert { assertion } => {
                self.simple(Step::Assert { assertion: assertion.clone() })
            },
            Statement::Assume { assumption } => {
                self.simple(Step::Assume { assumption: assumption.clone() })
            },
            Statement::Lock { var } => self.simple(Step::Lock { var: var.clone() }),
            Statement::Unlock { var } => self.simple(Step::Unlock { var: var.clone() }),
            Statement::Fork { invocation } => {
                self.simple(Step::Fork { invocation: invocation.clone() })
            },
            Statement::Skip => self.simple(Step::Skip),
            Statement::Return { expression } => {
                // The frame pop itself happens at the member exit node.
                let node =
                    self.statement(Step::Return { expression: expression.clone() });
                self.graph.add_edge(node, self.exit);
                Segment { entry: node, open: SmallVec::new() }
            },
            Statement::Throw { message } => {
                let node =
                    self.graph.add_node(NodeKind::Exceptional { message: message.clone() });
                Segment { entry: node, open: SmallVec::new() }
            },
            Statement::Call { invocation, target } => {
                let node = self.graph.add_node(NodeKind::Call {
                    invocation: invocation.clone(),
                    target: target.clone(),
                });
                Segment { entry: node, open: smallvec![node] }
            },
            Statement::Join => {
                let node = self.graph.add_node(NodeKind::Join);
                Segment { entry: node, open: smallvec![node] }
            },
            Statement::Ite { guard, if_true, if_false } => self.lower_ite(guard, if_true, if_false),
            Statement::While { guard, body } => self.lower_while(guard, body),
            Statement::Try { body, catch } => self.lower_try(body, catch),
        }
    }

    /// Branch node whose two successors begin with the guard assumption and
    /// its negation; the then-branch is the first successor.
    fn lower_ite(
        &mut self,
        guard: &Expression,
        if_true: &[Statement],
        if_false: &[Statement],
    ) -> Segment {
        let branch = self.statement(Step::Skip);
        let then_guard = self.statement(Step::Assume { assumption: guard.clone() });
        let else_guard =
            self.statement(Step::Assume { assumption: Expression::not(guard.clone()) });
        self.graph.add_edge(branch, then_guard);
        self.graph.add_edge(branch, else_guard);

        let then_seg = self.lower_block(if_true);
        self.graph.add_edge(then_guard, then_seg.entry);
        let else_seg = self.lower_block(if_false);
        self.graph.add_edge(else_guard, else_seg.entry);

        let mut open = then_seg.open;
        open.extend(else_seg.open);
        Segment { entry: branch, open }
    }

    fn lower_while(&mut self, guard: &Expression, body: &[Statement]) -> Segment {
        let branch = self.statement(Step::Skip);
        let enter = self.statement(Step::Assume { assumption: guard.clone() });
        let leave = self.statement(Step::Assume { assumption: Expression::not(guard.clone()) });
        self.graph.add_edge(branch, enter);
        self.graph.add_edge(branch, leave);

        let body_seg = self.lower_block(body);
        self.graph.add_edge(enter, body_seg.entry);
        for open in body_seg.open {
            self.graph.add_edge(open, branch);
        }
        Segment { entry: branch, open: smallvec![leave] }
    }

    fn lower_try(&mut self, body: &[Statement], catch: &[Statement]) -> Segment {
        let catch_entry = self.graph.add_node(NodeKind::CatchEntry);
        let catch_seg = self.lower_block(catch);
        self.graph.add_edge(catch_entry, catch_seg.entry);
        let catch_exit = self.graph.add_node(NodeKind::CatchExit);
        for open in catch_seg.open {
            self.graph.add_edge(open, catch_exit);
        }

        let try_entry = self.graph.add_node(NodeKind::TryEntry { handler: catch_entry });
        let body_seg = self.lower_block(body);
        self.graph.add_edge(try_entry, body_seg.entry);
        let try_exit = self.graph.add_node(NodeKind::TryExit);
        for open in body_seg.open {
            self.graph.add_edge(open, try_exit);
        }

        Segment { entry: try_entry, open: smallvec![try_exit, catch_exit] }
    }

    fn simple(&mut self, step: Step) -> Segment {
        let node = self.statement(step);
        Segment { entry: node, open: smallvec![node] }
    }

    fn statement(&mut self, step: Step) -> NodeId {
        self.graph.add_node(NodeKind::Statement(step))
    }
}

// TESTS
// ================================================================================================
