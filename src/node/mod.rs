//! Immutable DAG nodes and the session that mints their ids.

pub mod builder;
pub mod ops;
pub mod types;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use ops::Op;
use types::{Literal, ValueType, Variable};

/// Construction-order identity of a node. Unique within one [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Literal(Literal),
    Variable(Variable),
    Term(Op),
    /// Operands are `[condition, then, else]`.
    Conditional,
}

impl NodeKind {
    /// Literals and variables render in place and are never bound to temporaries.
    pub fn is_atom(&self) -> bool {
        matches!(self, NodeKind::Literal(_) | NodeKind::Variable(_))
    }

    pub fn describe(&self) -> String {
        match self {
            NodeKind::Literal(lit) => format!("literal {}", lit.ty()),
            NodeKind::Variable(var) => format!("{} {}", var.role(), var.name()),
            NodeKind::Term(op) => format!("term {}", op.name()),
            NodeKind::Conditional => "conditional".to_string(),
        }
    }
}

struct NodeData {
    id: NodeId,
    kind: NodeKind,
    ty: ValueType,
    operands: Vec<Node>,
}

impl Drop for NodeData {
    fn drop(&mut self) {
        // Unlink uniquely owned operands on an explicit stack so that dropping a very deep
        // chain does not recurse once per level.
        let mut stack = std::mem::take(&mut self.operands);
        while let Some(node) = stack.pop() {
            if let Some(mut data) = Arc::into_inner(node.0) {
                stack.append(&mut data.operands);
            }
        }
    }
}

/// Shared handle to an immutable node. Cloning is cheap; equality of handles is by id.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, ty: ValueType, operands: Vec<Node>) -> Node {
        Node(Arc::new(NodeData {
            id,
            kind,
            ty,
            operands,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn ty(&self) -> ValueType {
        self.0.ty
    }

    pub fn operands(&self) -> &[Node] {
        &self.0.operands
    }

    /// True if both handles point at the very same node object.
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands: Vec<NodeId> = self.operands().iter().map(Node::id).collect();
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("kind", self.kind())
            .field("ty", &self.ty())
            .field("operands", &operands)
            .finish()
    }
}

/// Id source for node construction.
///
/// Every node built through one session gets a distinct, increasing id, so operands always
/// carry smaller ids than the nodes referencing them. Allocation is atomic; a session can be
/// shared between threads building parts of one graph. Graphs built from different sessions
/// must not be mixed in one compilation.
#[derive(Debug, Default)]
pub struct Session {
    next_id: AtomicU64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    fn allocate_id(&self) -> NodeId {
        NodeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn make(&self, kind: NodeKind, ty: ValueType, operands: Vec<Node>) -> Node {
        Node::new(self.allocate_id(), kind, ty, operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_per_session() {
        let session = Session::new();
        let a = session.float(1.0);
        let b = session.float(2.0);
        let c = session.add(&a, &b).unwrap();
        assert!(a.id() < b.id());
        assert!(b.id() < c.id());
        assert_eq!(session.allocated(), 3);

        let other = Session::new();
        assert_eq!(other.float(1.0).id(), a.id());
    }

    #[test]
    fn test_clones_share_identity() {
        let session = Session::new();
        let a = session.float(1.0);
        let b = a.clone();
        let c = session.float(1.0);
        assert!(Node::ptr_eq(&a, &b));
        assert!(!Node::ptr_eq(&a, &c));
    }

    #[test]
    fn test_describe_kinds() {
        let session = Session::new();
        let x = session.uniform("time", ValueType::Float).unwrap();
        let y = session.neg(&x).unwrap();
        assert_eq!(x.kind().describe(), "uniform time");
        assert_eq!(y.kind().describe(), "term Neg");
        assert_eq!(format!("{}", y.id()), "#1");
    }

    #[test]
    fn test_dropping_deep_chain_does_not_overflow() {
        let session = Session::new();
        let mut node = session.float(0.0);
        let one = session.float(1.0);
        for _ in 0..200_000 {
            node = session.add(&node, &one).unwrap();
        }
        drop(node);
    }

    #[test]
    fn test_session_is_shareable_across_threads() {
        let session = Arc::new(Session::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    (0..100).map(|i| session.float(i as f32).id()).collect::<Vec<_>>()
                })
            })
            .collect();
        let mut ids: Vec<NodeId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 400);
    }
}
