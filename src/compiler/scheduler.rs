//! Inline-vs-hoist decisions, scope placement and per-scope statement order.
//!
//! Scopes form a tree: the function body is the root, and every conditional owns two branch
//! scopes nested in the scope the conditional itself is placed in. A hoisted node is placed in
//! the lowest common ancestor of the scopes of all its use sites, so a value needed by only
//! one branch is computed inside that branch, and a value shared by both branches (or by the
//! condition) is computed once before the `if`.
//!
//! Within a scope, statements are ordered by Kahn's algorithm over "statement A's text uses
//! binding B" edges, taking the smallest node id whenever several statements are ready.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use log::{debug, trace};

use crate::error::{CompileError, NodeRef};
use crate::graph::GraphWalk;
use crate::node::{Node, NodeId, NodeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    /// Position of the conditional owning this branch scope.
    owner: Option<usize>,
    depth: usize,
    members: Vec<usize>,
}

/// Ordered statements per scope, ready for lowering.
#[derive(Debug)]
pub struct Schedule {
    statements: Vec<Vec<Node>>,
    #[cfg(test)]
    parents: Vec<Option<ScopeId>>,
    branches: HashMap<NodeId, [ScopeId; 2]>,
    placement: HashMap<NodeId, ScopeId>,
}

impl Schedule {
    /// Hoisted nodes placed directly in `scope`, in emission order.
    pub fn statements(&self, scope: ScopeId) -> &[Node] {
        self.statements.get(scope.0).map_or(&[][..], Vec::as_slice)
    }

    /// `[then, else]` scopes of a conditional node.
    pub fn branches(&self, conditional: NodeId) -> Option<[ScopeId; 2]> {
        self.branches.get(&conditional).copied()
    }

    #[cfg(test)]
    fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.parents.get(scope.0).copied().flatten()
    }

    /// Scope a hoisted node is bound in; `None` for inlined nodes and atoms.
    pub fn placement(&self, id: NodeId) -> Option<ScopeId> {
        self.placement.get(&id).copied()
    }

    pub fn hoisted_count(&self) -> usize {
        self.placement.len()
    }

    pub fn conditional_count(&self) -> usize {
        self.branches.len()
    }
}

#[derive(Clone, Copy)]
enum Use {
    Root,
    Operand { parent: usize, index: usize },
}

/// Where one use of a node is evaluated: the scope, and the hoisted statement whose text
/// contains it (`None` when it is the scope's closing assignment).
type Site = (ScopeId, Option<usize>);

pub fn schedule(walk: &GraphWalk, roots: &[&Node]) -> Result<Schedule, CompileError> {
    let order = walk.order();
    let n = order.len();

    let mut uses: Vec<Vec<Use>> = vec![Vec::new(); n];
    for (p, node) in order.iter().enumerate() {
        for (index, operand) in node.operands().iter().enumerate() {
            if let Some(c) = walk.position(operand.id()) {
                uses[c].push(Use::Operand { parent: p, index });
            }
        }
    }
    for root in roots {
        if let Some(p) = walk.position(root.id()) {
            uses[p].push(Use::Root);
        }
    }

    let mut scopes = vec![Scope {
        parent: None,
        owner: None,
        depth: 0,
        members: Vec::new(),
    }];
    let mut home = vec![ScopeId::ROOT; n];
    let mut anchor: Vec<Option<usize>> = vec![None; n];
    let mut branch_scopes: Vec<Option<[ScopeId; 2]>> = vec![None; n];
    // (dependency, dependent): the dependent statement's text references the dependency.
    let mut edges: Vec<(usize, usize)> = Vec::new();

    // Parents come after their operands in walk order, so walking backwards sees every use
    // site of a node before the node itself.
    for p in (0..n).rev() {
        let node = &order[p];
        let hoist = match node.kind() {
            NodeKind::Conditional => true,
            NodeKind::Term(_) => walk.in_degree_at(p) > 1,
            // Atoms render as a single token, so repeating them costs nothing.
            NodeKind::Literal(_) | NodeKind::Variable(_) => continue,
        };

        let sites: Vec<Site> = uses[p]
            .iter()
            .map(|u| match *u {
                Use::Root => (ScopeId::ROOT, None),
                Use::Operand { parent, index } => match order[parent].kind() {
                    NodeKind::Conditional if index > 0 => (
                        branch_scopes[parent].map_or(ScopeId::ROOT, |b| b[index - 1]),
                        None,
                    ),
                    NodeKind::Conditional => (home[parent], Some(parent)),
                    _ => (home[parent], anchor[parent]),
                },
            })
            .collect();

        let scope = sites
            .iter()
            .map(|site| site.0)
            .reduce(|a, b| common_ancestor(&scopes, a, b))
            .unwrap_or(ScopeId::ROOT);
        home[p] = scope;

        if hoist {
            anchor[p] = Some(p);
            for &(mut at, mut user) in &sites {
                // Uses nested in deeper branches surface as a dependency of the conditional
                // that owns them.
                while at != scope {
                    let info = &scopes[at.0];
                    let Some(parent) = info.parent else { break };
                    user = info.owner;
                    at = parent;
                }
                if let Some(user) = user {
                    edges.push((p, user));
                }
            }
            scopes[scope.0].members.push(p);
            trace!("[schedule] hoist {} into scope {}", NodeRef::from(node), scope.0);
        } else {
            anchor[p] = sites.first().and_then(|site| site.1);
        }

        if matches!(node.kind(), NodeKind::Conditional) {
            let depth = scopes[scope.0].depth + 1;
            let mut pair = [ScopeId::ROOT; 2];
            for slot in &mut pair {
                scopes.push(Scope {
                    parent: Some(scope),
                    owner: Some(p),
                    depth,
                    members: Vec::new(),
                });
                *slot = ScopeId(scopes.len() - 1);
            }
            branch_scopes[p] = Some(pair);
        }
    }

    let statements = order_scopes(order, &scopes, &edges)?;

    let mut placement = HashMap::new();
    for (s, scope) in scopes.iter().enumerate() {
        for &p in &scope.members {
            placement.insert(order[p].id(), ScopeId(s));
        }
    }
    let branches: HashMap<NodeId, [ScopeId; 2]> = branch_scopes
        .iter()
        .enumerate()
        .filter_map(|(p, b)| b.map(|pair| (order[p].id(), pair)))
        .collect();

    debug!(
        "[schedule] {} hoisted bindings across {} scopes ({} conditionals)",
        placement.len(),
        scopes.len(),
        branches.len()
    );

    Ok(Schedule {
        statements,
        #[cfg(test)]
        parents: scopes.iter().map(|s| s.parent).collect(),
        branches,
        placement,
    })
}

fn common_ancestor(scopes: &[Scope], mut a: ScopeId, mut b: ScopeId) -> ScopeId {
    let up = |s: ScopeId| scopes[s.0].parent.unwrap_or(ScopeId::ROOT);
    while scopes[a.0].depth > scopes[b.0].depth {
        a = up(a);
    }
    while scopes[b.0].depth > scopes[a.0].depth {
        b = up(b);
    }
    while a != b {
        a = up(a);
        b = up(b);
    }
    a
}

fn order_scopes(
    order: &[Node],
    scopes: &[Scope],
    edges: &[(usize, usize)],
) -> Result<Vec<Vec<Node>>, CompileError> {
    let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut pending: HashMap<usize, usize> = HashMap::new();
    for &(dependency, dependent) in edges {
        successors.entry(dependency).or_default().push(dependent);
        *pending.entry(dependent).or_default() += 1;
    }

    let mut result = Vec::with_capacity(scopes.len());
    for scope in scopes {
        let mut ready: BinaryHeap<Reverse<(NodeId, usize)>> = scope
            .members
            .iter()
            .filter(|p| pending.get(p).copied().unwrap_or(0) == 0)
            .map(|&p| Reverse((order[p].id(), p)))
            .collect();

        let mut ordered = Vec::with_capacity(scope.members.len());
        while let Some(Reverse((_, p))) = ready.pop() {
            ordered.push(order[p].clone());
            for &next in successors.get(&p).map_or(&[][..], Vec::as_slice) {
                if let Some(count) = pending.get_mut(&next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse((order[next].id(), next)));
                    }
                }
            }
        }

        if ordered.len() != scope.members.len() {
            let stuck = scope
                .members
                .iter()
                .find(|p| pending.get(p).copied().unwrap_or(0) > 0)
                .copied()
                .unwrap_or_default();
            return Err(CompileError::Cycle {
                node: NodeRef::from(&order[stuck]),
            });
        }
        result.push(ordered);
    }
    Ok(result)
}
