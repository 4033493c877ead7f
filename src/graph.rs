use std::collections::HashMap;

use log::debug;

use crate::error::{CompileError, NodeRef};
use crate::node::{Node, NodeId};

/// Reachable part of a node graph, children ordered before parents.
#[derive(Debug)]
pub struct GraphWalk {
    order: Vec<Node>,
    position: HashMap<NodeId, usize>,
    in_degree: Vec<usize>,
}

impl GraphWalk {
    /// Reachable nodes in post-order: every operand precedes each node that uses it.
    pub fn order(&self) -> &[Node] {
        &self.order
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Index of a node in [`GraphWalk::order`].
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.position.get(&id).copied()
    }

    /// Number of operand edges pointing at the node plus the number of roots bound to it.
    ///
    /// This counts edges, not distinct parents: a parent using the same operand twice
    /// contributes two, so the operand of `add(s, s)` is bound once instead of being
    /// rendered twice inline.
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.position(id).map_or(0, |p| self.in_degree[p])
    }

    pub(crate) fn in_degree_at(&self, position: usize) -> usize {
        self.in_degree[position]
    }
}

struct Visit {
    node: Node,
    done: bool,
}

/// Walk everything reachable from `roots` with an explicit stack.
///
/// Reconvergent nodes are expanded once. Distinct node objects carrying the same id (graphs
/// from different sessions) and references back into the current path are rejected.
pub fn walk(roots: &[&Node]) -> Result<GraphWalk, CompileError> {
    let mut visits: HashMap<NodeId, Visit> = HashMap::new();
    let mut counts: HashMap<NodeId, usize> = HashMap::new();
    let mut order: Vec<Node> = Vec::new();
    let mut stack: Vec<(Node, usize)> = Vec::new();

    for &root in roots {
        *counts.entry(root.id()).or_default() += 1;
        if !enter(&mut visits, root)? {
            continue;
        }
        stack.push((root.clone(), 0));

        loop {
            let Some((node, next)) = stack.last_mut() else {
                break;
            };
            if let Some(child) = node.operands().get(*next).cloned() {
                *next += 1;
                *counts.entry(child.id()).or_default() += 1;
                if enter(&mut visits, &child)? {
                    stack.push((child, 0));
                }
            } else if let Some((node, _)) = stack.pop() {
                if let Some(visit) = visits.get_mut(&node.id()) {
                    visit.done = true;
                }
                order.push(node);
            }
        }
    }

    let position: HashMap<NodeId, usize> = order
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id(), i))
        .collect();
    let in_degree = order
        .iter()
        .map(|n| counts.get(&n.id()).copied().unwrap_or(0))
        .collect();

    debug!(
        "[walk] {} reachable nodes from {} root(s)",
        order.len(),
        roots.len()
    );
    Ok(GraphWalk {
        order,
        position,
        in_degree,
    })
}

/// Record a reference to `node`. Returns true when the node is new and must be expanded.
fn enter(visits: &mut HashMap<NodeId, Visit>, node: &Node) -> Result<bool, CompileError> {
    match visits.get(&node.id()) {
        Some(seen) if !Node::ptr_eq(&seen.node, node) => Err(CompileError::IdentityCollision {
            first: NodeRef::from(&seen.node),
            second: NodeRef::from(node),
        }),
        Some(seen) if !seen.done => Err(CompileError::Cycle {
            node: NodeRef::from(node),
        }),
        Some(_) => Ok(false),
        None => {
            visits.insert(
                node.id(),
                Visit {
                    node: node.clone(),
                    done: false,
                },
            );
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Session;

    #[test]
    fn test_children_precede_parents() {
        let s = Session::new();
        let a = s.float(1.0);
        let b = s.float(2.0);
        let sum = s.add(&a, &b).unwrap();
        let prod = s.mul(&sum, &a).unwrap();
        let walk = walk(&[&prod]).unwrap();
        assert_eq!(walk.len(), 4);
        for node in walk.order() {
            let p = walk.position(node.id()).unwrap();
            for operand in node.operands() {
                assert!(walk.position(operand.id()).unwrap() < p);
            }
        }
    }

    #[test]
    fn test_in_degree_counts_edges_and_roots() {
        let s = Session::new();
        let x = s.float(2.0);
        let sq = s.mul(&x, &x).unwrap();
        let shared = s.add(&sq, &x).unwrap();
        let walk = walk(&[&shared, &sq]).unwrap();
        assert_eq!(walk.in_degree(x.id()), 3);
        assert_eq!(walk.in_degree(sq.id()), 2);
        assert_eq!(walk.in_degree(shared.id()), 1);
    }

    #[test]
    fn test_mixed_sessions_are_rejected() {
        let s1 = Session::new();
        let s2 = Session::new();
        let a = s1.float(1.0);
        let b = s2.float(2.0);
        let sum = s1.add(&a, &b).unwrap();
        assert!(matches!(
            walk(&[&sum]),
            Err(CompileError::IdentityCollision { .. })
        ));
    }

    #[test]
    fn test_deep_chain_walks_without_recursion() {
        let s = Session::new();
        let one = s.float(1.0);
        let mut node = s.float(0.0);
        for _ in 0..100_000 {
            node = s.add(&node, &one).unwrap();
        }
        let walk = walk(&[&node]).unwrap();
        assert_eq!(walk.len(), 100_002);
        assert_eq!(walk.in_degree(one.id()), 100_000);
    }
}
