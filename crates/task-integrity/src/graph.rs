//! Arena dependency graph over entity identities.
//!
//! Nodes are indices into a flat list of entities in declaration order (each
//! task followed by its subtasks). Edges carry the position of the stored
//! dependency entry they came from so callers can remove exactly that entry.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::engine::{normalize, ReferenceContext};
use crate::entities::{BareSubtaskReferences, RawReference, Reference, Tag, TaskId};

/// Location of an entity inside a [`Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub task: usize,
    pub subtask: Option<usize>,
}

/// Every entity of the tag in declaration order with its current identity.
pub fn entities(tag: &Tag) -> Vec<(Slot, Reference)> {
    let mut out = Vec::with_capacity(tag.task_count() + tag.subtask_count());
    for (ti, task) in tag.tasks.iter().enumerate() {
        out.push((
            Slot {
                task: ti,
                subtask: None,
            },
            Reference::Task(task.id),
        ));
        for (si, subtask) in task.subtasks.iter().enumerate() {
            out.push((
                Slot {
                    task: ti,
                    subtask: Some(si),
                },
                Reference::Subtask(task.id, subtask.id),
            ));
        }
    }
    out
}

/// Stored dependency list of the entity at `slot`.
pub fn dependencies(tag: &Tag, slot: Slot) -> &[RawReference] {
    let task = &tag.tasks[slot.task];
    match slot.subtask {
        None => &task.dependencies,
        Some(si) => &task.subtasks[si].dependencies,
    }
}

/// Mutable stored dependency list of the entity at `slot`.
pub fn dependencies_mut(tag: &mut Tag, slot: Slot) -> &mut Vec<RawReference> {
    let task = &mut tag.tasks[slot.task];
    match slot.subtask {
        None => &mut task.dependencies,
        Some(si) => &mut task.subtasks[si].dependencies,
    }
}

/// Directed edge `owner -> target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: usize,
    /// Index of the stored entry in the owner's dependency list
    pub entry: usize,
}

/// Edge that closed a cycle during depth-first traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackEdge {
    pub from: usize,
    pub edge: Edge,
    /// Nodes on the cycle, starting at the node the edge points back to
    pub cycle: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    OnStack,
    Done,
}

/// Dependency graph of one tag.
///
/// Only resolvable, non-self edges are included; malformed and dangling
/// entries are the validator's concern, not the traversal's.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<Reference>,
    slots: Vec<Slot>,
    index: HashMap<Reference, usize>,
    edges: Vec<Vec<Edge>>,
}

impl DependencyGraph {
    /// Build the graph for `tag`, reading bare subtask integers with `policy`.
    pub fn build(tag: &Tag, policy: BareSubtaskReferences) -> Self {
        let listed = entities(tag);

        // Only the first task carrying an id, and only its subtasks, resolve.
        let mut primary: HashMap<TaskId, usize> = HashMap::new();
        let mut index = HashMap::with_capacity(listed.len());
        for (i, (slot, reference)) in listed.iter().enumerate() {
            let owner = *primary.entry(reference.root_task()).or_insert(slot.task);
            if owner == slot.task {
                index.entry(*reference).or_insert(i);
            }
        }

        let base = ReferenceContext::new(&tag.name, Reference::Task(0), policy);
        let mut edges = Vec::with_capacity(listed.len());
        for (slot, owner) in &listed {
            let ctx = base.for_owner(*owner);
            let mut out = Vec::new();
            for (entry, raw) in dependencies(tag, *slot).iter().enumerate() {
                let Ok(target) = normalize(raw, &ctx) else {
                    continue;
                };
                if target == *owner {
                    continue;
                }
                if let Some(&target) = index.get(&target) {
                    out.push(Edge { target, entry });
                }
            }
            edges.push(out);
        }

        let (slots, nodes) = listed.into_iter().unzip();
        Self {
            nodes,
            slots,
            index,
            edges,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identity of a node
    pub fn reference(&self, node: usize) -> Reference {
        self.nodes[node]
    }

    /// Location of a node in the tag
    pub fn slot(&self, node: usize) -> Slot {
        self.slots[node]
    }

    /// Node for an identity (first occurrence when ids are duplicated)
    pub fn node(&self, reference: Reference) -> Option<usize> {
        self.index.get(&reference).copied()
    }

    /// Whether the identity resolves to an entity
    pub fn contains(&self, reference: Reference) -> bool {
        self.index.contains_key(&reference)
    }

    /// Outgoing edges of a node
    pub fn edges(&self, node: usize) -> &[Edge] {
        &self.edges[node]
    }

    /// Depth-first search from every node in declaration order, returning
    /// each edge that points back onto the current traversal stack.
    ///
    /// Finished nodes are never revisited, so each back edge is reported
    /// once. Dropping every returned edge leaves the graph acyclic.
    pub fn back_edges(&self) -> Vec<BackEdge> {
        let mut state = vec![Visit::Unseen; self.nodes.len()];
        let mut found = Vec::new();

        for root in 0..self.nodes.len() {
            if state[root] != Visit::Unseen {
                continue;
            }

            // (node, next edge to explore)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            state[root] = Visit::OnStack;

            while let Some(&(node, next)) = stack.last() {
                let Some(&edge) = self.edges[node].get(next) else {
                    state[node] = Visit::Done;
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                match state[edge.target] {
                    Visit::Unseen => {
                        state[edge.target] = Visit::OnStack;
                        stack.push((edge.target, 0));
                    }
                    Visit::OnStack => {
                        let start = stack
                            .iter()
                            .position(|(n, _)| *n == edge.target)
                            .unwrap_or(0);
                        found.push(BackEdge {
                            from: node,
                            edge,
                            cycle: stack[start..].iter().map(|(n, _)| *n).collect(),
                        });
                    }
                    Visit::Done => {}
                }
            }
        }

        found
    }

    /// Shortest path `from -> ... -> to` following dependency edges.
    pub fn path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let mut previous: HashMap<usize, usize> = HashMap::new();
        let mut seen = HashSet::from([from]);
        let mut queue = std::collections::VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(&prev) = previous.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for edge in &self.edges[current] {
                if seen.insert(edge.target) {
                    previous.insert(edge.target, current);
                    queue.push_back(edge.target);
                }
            }
        }

        None
    }

    /// Every node reachable from `start` (excluding the start nodes
    /// themselves unless reachable through a cycle).
    pub fn reachable(&self, start: &[usize]) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<usize> = start.to_vec();
        while let Some(current) = stack.pop() {
            for edge in &self.edges[current] {
                if seen.insert(edge.target) {
                    stack.push(edge.target);
                }
            }
        }
        seen
    }

    /// Nodes that have an edge to `target`, in declaration order
    pub fn dependents(&self, target: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|n| self.edges[*n].iter().any(|e| e.target == target))
            .collect()
    }
}
