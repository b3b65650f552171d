//! Hierarchy moves: rename, promote, demote, reparent, and cross-tag moves.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use super::{normalize, reencode, DependencyPolicy, IntegrityEngine, ValidationReport};
use crate::entities::{MoveRecord, Reference, Subtask, Tag, Task, TaskId, TaskPriority};
use crate::errors::{ConflictingEdge, IntegrityError, IntegrityResult};
use crate::graph::{self, DependencyGraph, Slot};

/// Result of a within-tag move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub tag: Tag,

    /// Applied `(from, to)` pairs; same-to-same pairs are left out
    pub moved: Vec<(Reference, Reference)>,

    /// Validation of the moved tag. Moves preserve every edge and never
    /// land on an identity a dangling entry points at, so only pre-existing
    /// problems or a parent left without a startable subtask show up here.
    pub report: ValidationReport,
}

/// Settings for a cross-tag move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossTagMoveOptions {
    pub policy: DependencyPolicy,

    /// Timestamp recorded in each moved task's history
    pub moved_at: DateTime<Utc>,
}

impl CrossTagMoveOptions {
    pub fn new(policy: DependencyPolicy) -> Self {
        Self {
            policy,
            moved_at: Utc::now(),
        }
    }

    pub fn at(policy: DependencyPolicy, moved_at: DateTime<Utc>) -> Self {
        Self { policy, moved_at }
    }
}

impl Default for CrossTagMoveOptions {
    fn default() -> Self {
        Self::new(DependencyPolicy::default())
    }
}

/// Result of a cross-tag move.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTagOutcome {
    pub source: Tag,
    pub destination: Tag,

    /// Top-level ids that moved, in source declaration order
    pub moved: Vec<TaskId>,

    /// Edges removed under [`DependencyPolicy::IgnoreDependencies`]
    pub dropped_edges: Vec<ConflictingEdge>,
}

/// Identity change caused by one move.
#[derive(Debug, Clone, Copy)]
enum Relocation {
    /// Task keeps its place, its id and its subtasks' parent change
    RenameTask { from: TaskId, to: TaskId },
    /// Task becomes a subtask of another task
    Demote { from: TaskId, parent: TaskId, id: u32 },
    /// Subtask becomes a top-level task
    Promote { parent: TaskId, id: u32, to: TaskId },
    /// Subtask moves under the same or another parent
    Reparent {
        parent: TaskId,
        id: u32,
        new_parent: TaskId,
        new_id: u32,
    },
}

impl Relocation {
    fn remap(self, reference: Reference) -> Reference {
        match (self, reference) {
            (Self::RenameTask { from, to }, Reference::Task(id)) if id == from => Reference::Task(to),
            (Self::RenameTask { from, to }, Reference::Subtask(p, s)) if p == from => {
                Reference::Subtask(to, s)
            }
            (Self::Demote { from, parent, id }, Reference::Task(t)) if t == from => {
                Reference::Subtask(parent, id)
            }
            (Self::Promote { parent, id, to }, Reference::Subtask(p, s)) if p == parent && s == id => {
                Reference::Task(to)
            }
            (
                Self::Reparent {
                    parent,
                    id,
                    new_parent,
                    new_id,
                },
                Reference::Subtask(p, s),
            ) if p == parent && s == id => Reference::Subtask(new_parent, new_id),
            (_, other) => other,
        }
    }

    /// Identities that start resolving once the move is applied.
    fn arrivals(self, tag: &Tag) -> Vec<Reference> {
        match self {
            Self::RenameTask { from, to } => std::iter::once(Reference::Task(to))
                .chain(
                    tag.task(from)
                        .into_iter()
                        .flat_map(|t| t.subtasks.iter().map(move |s| Reference::Subtask(to, s.id))),
                )
                .collect(),
            Self::Demote { parent, id, .. } => vec![Reference::Subtask(parent, id)],
            Self::Promote { to, .. } => vec![Reference::Task(to)],
            Self::Reparent {
                new_parent, new_id, ..
            } => vec![Reference::Subtask(new_parent, new_id)],
        }
    }
}

impl IntegrityEngine {
    /// Apply `(sources[i], destinations[i])` moves in order.
    ///
    /// Each move relocates the entity and rewrites every reference to it in
    /// the same step. Pairs are applied to a working copy, so a failing pair
    /// leaves the input exactly as it was.
    pub fn move_tasks(
        &self,
        tag: &Tag,
        sources: &[Reference],
        destinations: &[Reference],
    ) -> IntegrityResult<MoveOutcome> {
        if sources.len() != destinations.len() {
            return Err(IntegrityError::MoveListMismatch {
                sources: sources.len(),
                destinations: destinations.len(),
            });
        }
        if sources.is_empty() {
            return Err(IntegrityError::InvalidArgument {
                reason: "no moves requested".to_string(),
            });
        }

        let mut work = tag.clone();
        let mut moved = Vec::with_capacity(sources.len());
        for (&from, &to) in sources.iter().zip(destinations) {
            if from == to {
                tracing::debug!(%from, "Skipping move onto itself");
                continue;
            }
            self.move_one(&mut work, from, to)?;
            moved.push((from, to));
        }

        let report = self.validate(&work);
        if !report.is_valid() {
            tracing::warn!(
                tag = %work.name,
                issues = report.issues.len(),
                "Tag has integrity issues after move"
            );
        }

        Ok(MoveOutcome {
            tag: work,
            moved,
            report,
        })
    }

    fn move_one(&self, tag: &mut Tag, from: Reference, to: Reference) -> IntegrityResult<()> {
        if !tag.contains(from) {
            return Err(IntegrityError::not_found(&tag.name, from));
        }
        let relocation = Self::plan(tag, from, to)?;
        self.ensure_unreferenced(tag, relocation)?;

        // References first, while every owner still sits at its old identity.
        self.rewrite_references(tag, relocation);

        match relocation {
            Relocation::RenameTask { from, to } => {
                if let Some(task) = tag.task_mut(from) {
                    task.id = to;
                    for subtask in &mut task.subtasks {
                        if subtask.parent_id.is_some() {
                            subtask.parent_id = Some(to);
                        }
                    }
                }
            }
            Relocation::Demote { from, parent, id } => {
                if let Some(idx) = tag.position(from) {
                    let task = tag.tasks.remove(idx);
                    let subtask = demote(task, parent, id);
                    if let Some(target) = tag.task_mut(parent) {
                        target.insert_subtask_ordered(subtask);
                    }
                }
            }
            Relocation::Promote { parent, id, to } => {
                let removed = tag.task_mut(parent).and_then(|p| p.remove_subtask(id));
                if let Some(subtask) = removed {
                    tag.insert_task_ordered(promote(subtask, to));
                }
            }
            Relocation::Reparent {
                parent,
                id,
                new_parent,
                new_id,
            } => {
                let removed = tag.task_mut(parent).and_then(|p| p.remove_subtask(id));
                if let Some(mut subtask) = removed {
                    subtask.id = new_id;
                    if subtask.parent_id.is_some() {
                        subtask.parent_id = Some(new_parent);
                    }
                    if let Some(target) = tag.task_mut(new_parent) {
                        target.insert_subtask_ordered(subtask);
                    }
                }
            }
        }

        tracing::debug!(tag = %tag.name, %from, %to, "Moved entity");
        Ok(())
    }

    /// Check preconditions and decide the shape conversion. Never mutates.
    fn plan(tag: &Tag, from: Reference, to: Reference) -> IntegrityResult<Relocation> {
        if tag.contains(to) {
            return Err(IntegrityError::Conflict {
                tag: tag.name.clone(),
                destination: to,
            });
        }
        if let Reference::Subtask(parent, _) = to {
            if tag.task(parent).is_none() {
                return Err(IntegrityError::not_found(&tag.name, Reference::Task(parent)));
            }
        }

        match (from, to) {
            (Reference::Task(from), Reference::Task(to)) => Ok(Relocation::RenameTask { from, to }),
            (Reference::Task(task_id), Reference::Subtask(parent, id)) => {
                if parent == task_id {
                    return Err(IntegrityError::InvalidMove {
                        from: Reference::Task(task_id),
                        to: Reference::Subtask(parent, id),
                        reason: "a task cannot become its own subtask".to_string(),
                    });
                }
                let has_children = tag.task(task_id).is_some_and(|t| !t.subtasks.is_empty());
                if has_children {
                    return Err(IntegrityError::InvalidMove {
                        from: Reference::Task(task_id),
                        to: Reference::Subtask(parent, id),
                        reason: "task has subtasks; move them out first".to_string(),
                    });
                }
                Ok(Relocation::Demote {
                    from: task_id,
                    parent,
                    id,
                })
            }
            (Reference::Subtask(parent, id), Reference::Task(to)) => {
                Ok(Relocation::Promote { parent, id, to })
            }
            (Reference::Subtask(parent, id), Reference::Subtask(new_parent, new_id)) => {
                Ok(Relocation::Reparent {
                    parent,
                    id,
                    new_parent,
                    new_id,
                })
            }
        }
    }

    /// Refuse a move whose new identities are already named by an entry.
    /// Such an entry dangles today and would silently become a live edge.
    fn ensure_unreferenced(&self, tag: &Tag, relocation: Relocation) -> IntegrityResult<()> {
        let arrivals = relocation.arrivals(tag);
        for (slot, owner) in graph::entities(tag) {
            let ctx = self.context(&tag.name, owner);
            for raw in graph::dependencies(tag, slot) {
                if let Ok(target) = normalize(raw, &ctx) {
                    if arrivals.contains(&target) {
                        return Err(IntegrityError::DestinationReferenced {
                            tag: tag.name.clone(),
                            destination: target,
                            owner,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Point every reference at the relocated identity, re-encoding an entry
    /// only when its stored form would no longer read correctly from its
    /// owner's new position.
    fn rewrite_references(&self, tag: &mut Tag, relocation: Relocation) {
        let name = tag.name.clone();
        for (slot, owner) in graph::entities(tag) {
            let old_ctx = self.context(&name, owner);
            let new_ctx = self.context(&name, relocation.remap(owner));
            for raw in graph::dependencies_mut(tag, slot).iter_mut() {
                let Ok(current) = normalize(raw, &old_ctx) else {
                    continue;
                };
                let rewritten = reencode(raw, relocation.remap(current), &new_ctx);
                if rewritten != *raw {
                    tracing::debug!(%owner, from = %raw, to = %rewritten, "Rewrote reference");
                    *raw = rewritten;
                }
            }
        }
    }

    /// Move whole top-level tasks from `source` into `destination`.
    ///
    /// Ids are kept, so the destination must not already use any of them.
    /// Edges between moving and staying tasks are handled by
    /// `options.policy`; nothing is modified unless the whole move succeeds.
    pub fn move_cross_tag(
        &self,
        source: &Tag,
        destination: &Tag,
        ids: &[Reference],
        options: &CrossTagMoveOptions,
    ) -> IntegrityResult<CrossTagOutcome> {
        if source.name == destination.name {
            return Err(IntegrityError::InvalidArgument {
                reason: format!(
                    "source and destination are both '{}'; use a within-tag move",
                    source.name
                ),
            });
        }
        if ids.is_empty() {
            return Err(IntegrityError::InvalidArgument {
                reason: "no tasks selected to move".to_string(),
            });
        }

        let mut moving: BTreeSet<TaskId> = BTreeSet::new();
        for &reference in ids {
            match reference {
                Reference::Subtask(..) => {
                    return Err(IntegrityError::CrossTagSubtaskMove { reference });
                }
                Reference::Task(id) => {
                    if source.task(id).is_none() {
                        return Err(IntegrityError::not_found(&source.name, reference));
                    }
                    moving.insert(id);
                }
            }
        }

        let dependency_graph = DependencyGraph::build(source, self.config().bare_subtask_references);

        if options.policy == DependencyPolicy::WithDependencies {
            let pulled = Self::dependency_closure(&dependency_graph, &moving);
            if !pulled.is_empty() {
                tracing::info!(
                    tasks = ?pulled,
                    "Including dependencies in cross-tag move"
                );
            }
            moving.extend(pulled);
        }

        for &id in &moving {
            if destination.task(id).is_some() {
                return Err(IntegrityError::Conflict {
                    tag: destination.name.clone(),
                    destination: Reference::Task(id),
                });
            }
        }

        let conflicts = Self::crossing_edges(&dependency_graph, &moving);

        if !conflicts.is_empty() && options.policy != DependencyPolicy::IgnoreDependencies {
            return Err(IntegrityError::CrossTagDependencyConflict {
                edges: conflicts.into_iter().map(|(edge, _)| edge).collect(),
            });
        }

        // All checks passed; build the new snapshots.
        let mut source_out = source.clone();
        let mut destination_out = destination.clone();

        let mut removals: BTreeMap<(usize, Option<usize>), Vec<usize>> = BTreeMap::new();
        let mut dropped_edges = Vec::with_capacity(conflicts.len());
        for (edge, (slot, entry)) in conflicts {
            tracing::warn!(%edge, "Dropping dependency crossing tags");
            removals
                .entry((slot.task, slot.subtask))
                .or_default()
                .push(entry);
            dropped_edges.push(edge);
        }
        for ((task, subtask), mut entries) in removals {
            entries.sort_unstable_by(|a, b| b.cmp(a));
            let deps = graph::dependencies_mut(&mut source_out, Slot { task, subtask });
            for entry in entries {
                deps.remove(entry);
            }
        }

        let mut moved = Vec::with_capacity(moving.len());
        let mut staying = Vec::with_capacity(source_out.tasks.len());
        let mut seen = HashSet::new();
        for mut task in std::mem::take(&mut source_out.tasks) {
            // Only the first task carrying an id belongs to the moving set.
            if moving.contains(&task.id) && seen.insert(task.id) {
                task.move_history.push(MoveRecord {
                    from_tag: source.name.clone(),
                    to_tag: destination.name.clone(),
                    moved_at: options.moved_at,
                });
                moved.push(task.id);
                destination_out.tasks.push(task);
            } else {
                staying.push(task);
            }
        }
        source_out.tasks = staying;

        tracing::info!(
            from = %source.name,
            to = %destination.name,
            moved = moved.len(),
            dropped = dropped_edges.len(),
            policy = %options.policy,
            "Moved tasks across tags"
        );

        Ok(CrossTagOutcome {
            source: source_out,
            destination: destination_out,
            moved,
            dropped_edges,
        })
    }

    /// Top-level tasks the moving set depends on, transitively, that are not
    /// already moving.
    fn dependency_closure(graph: &DependencyGraph, moving: &BTreeSet<TaskId>) -> BTreeSet<TaskId> {
        let starts: Vec<usize> = (0..graph.len())
            .filter(|n| moving.contains(&graph.reference(*n).root_task()))
            .collect();

        let mut roots: BTreeSet<TaskId> = moving.clone();
        let mut frontier = starts;
        loop {
            let reached = graph.reachable(&frontier);
            let new_roots: BTreeSet<TaskId> = reached
                .iter()
                .map(|n| graph.reference(*n).root_task())
                .filter(|root| !roots.contains(root))
                .collect();
            if new_roots.is_empty() {
                break;
            }
            // Subtasks of pulled-in tasks travel with them, so their
            // dependencies must be followed too.
            frontier = (0..graph.len())
                .filter(|n| new_roots.contains(&graph.reference(*n).root_task()))
                .collect();
            roots.extend(new_roots);
        }

        roots.difference(moving).copied().collect()
    }

    /// Every edge with exactly one end in the moving set, with the location
    /// of the stored entry that encodes it.
    fn crossing_edges(
        graph: &DependencyGraph,
        moving: &BTreeSet<TaskId>,
    ) -> Vec<(ConflictingEdge, (Slot, usize))> {
        let mut out = Vec::new();
        for node in 0..graph.len() {
            let from = graph.reference(node);
            let from_moving = moving.contains(&from.root_task());
            for edge in graph.edges(node) {
                let to = graph.reference(edge.target);
                if moving.contains(&to.root_task()) != from_moving {
                    out.push((
                        ConflictingEdge {
                            from,
                            to,
                            from_moving,
                        },
                        (graph.slot(node), edge.entry),
                    ));
                }
            }
        }
        out
    }
}

/// Task to subtask. Task-only fields are dropped; the task has no subtasks
/// (checked by the planner).
fn demote(task: Task, parent: TaskId, id: u32) -> Subtask {
    Subtask {
        id,
        parent_id: Some(parent),
        title: task.title,
        description: task.description,
        status: task.status,
        dependencies: task.dependencies,
        details: task.details,
        test_strategy: task.test_strategy,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

/// Subtask to task with task-only fields at their defaults.
fn promote(subtask: Subtask, id: TaskId) -> Task {
    Task {
        id,
        title: subtask.title,
        description: subtask.description,
        status: subtask.status,
        priority: TaskPriority::default(),
        dependencies: subtask.dependencies,
        details: subtask.details,
        test_strategy: subtask.test_strategy,
        subtasks: Vec::new(),
        created_at: subtask.created_at,
        updated_at: subtask.updated_at,
        move_history: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RawReference;

    fn engine() -> IntegrityEngine {
        IntegrityEngine::default()
    }

    fn t(id: u32) -> Reference {
        Reference::Task(id)
    }

    fn s(parent: u32, id: u32) -> Reference {
        Reference::Subtask(parent, id)
    }

    #[test]
    fn test_rename_task_rewrites_references() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a").with_subtask(Subtask::new(1, "a1")),
                Task::new(2, "b").with_dependencies([RawReference::Number(1), RawReference::from("1.1")]),
            ],
        );
        let outcome = engine().move_tasks(&tag, &[t(1)], &[t(9)]).unwrap();
        assert_eq!(outcome.tag.tasks[0].id, 9);
        assert_eq!(
            outcome.tag.tasks[1].dependencies,
            vec![RawReference::Number(9), RawReference::from("9.1")]
        );
        assert!(outcome.report.is_valid());
    }

    #[test]
    fn test_demote_task_into_subtask_slot() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(3, "base"),
                Task::new(5, "moving").with_dependencies([3]),
                Task::new(7, "parent").with_subtask(Subtask::new(1, "p1")),
                Task::new(8, "user").with_dependencies([5]),
            ],
        );
        let outcome = engine().move_tasks(&tag, &[t(5)], &[s(7, 2)]).unwrap();
        let tag = outcome.tag;
        assert!(tag.task(5).is_none());
        let demoted = tag.subtask(7, 2).unwrap();
        assert_eq!(demoted.title, "moving");
        assert_eq!(demoted.parent_id, Some(7));
        // a bare 3 would read as sibling 7.3 now
        assert_eq!(demoted.dependencies, vec![RawReference::from("3")]);
        assert_eq!(tag.task(8).unwrap().dependencies, vec![RawReference::from("7.2")]);
    }

    #[test]
    fn test_promote_subtask_to_task() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a")
                    .with_subtask(Subtask::new(1, "a1"))
                    .with_subtask(Subtask::new(2, "a2").with_dependencies([1])),
                Task::new(6, "b").with_dependencies(["1.2"]),
            ],
        );
        let outcome = engine().move_tasks(&tag, &[s(1, 2)], &[t(4)]).unwrap();
        let tag = outcome.tag;
        let ids: Vec<_> = tag.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 4, 6]);
        let promoted = tag.task(4).unwrap();
        assert_eq!(promoted.priority, TaskPriority::Medium);
        assert_eq!(promoted.dependencies, vec![RawReference::from("1.1")]);
        assert_eq!(tag.task(6).unwrap().dependencies, vec![RawReference::Number(4)]);
    }

    #[test]
    fn test_reparent_subtask_keeps_sibling_shorthand_valid() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a")
                    .with_subtask(Subtask::new(1, "a1"))
                    .with_subtask(Subtask::new(2, "a2").with_dependencies([1])),
                Task::new(2, "b").with_subtask(Subtask::new(1, "b1")),
            ],
        );
        let outcome = engine().move_tasks(&tag, &[s(1, 1)], &[s(2, 3)]).unwrap();
        let tag = outcome.tag;
        assert_eq!(tag.task(1).unwrap().subtasks.len(), 1);
        assert_eq!(
            tag.subtask(1, 2).unwrap().dependencies,
            vec![RawReference::from("2.3")]
        );
        assert!(tag.subtask(2, 3).is_some());
    }

    #[test]
    fn test_conflict_leaves_input_untouched() {
        let tag = Tag::with_tasks(
            "master",
            vec![Task::new(5, "a"), Task::new(6, "b"), Task::new(7, "c")],
        );
        let original = tag.clone();
        let err = engine()
            .move_tasks(&tag, &[t(5), t(6)], &[t(8), t(8)])
            .unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::Conflict {
                destination: Reference::Task(8),
                ..
            }
        ));
        assert_eq!(tag, original);
    }

    #[test]
    fn test_precondition_errors() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a").with_subtask(Subtask::new(1, "a1")),
                Task::new(2, "b"),
            ],
        );
        assert!(matches!(
            engine().move_tasks(&tag, &[t(1)], &[]),
            Err(IntegrityError::MoveListMismatch { .. })
        ));
        assert!(matches!(
            engine().move_tasks(&tag, &[t(9)], &[t(10)]),
            Err(IntegrityError::TaskNotFound { task_id: 9, .. })
        ));
        assert!(matches!(
            engine().move_tasks(&tag, &[t(2)], &[s(9, 1)]),
            Err(IntegrityError::TaskNotFound { task_id: 9, .. })
        ));
        assert!(matches!(
            engine().move_tasks(&tag, &[t(1)], &[s(2, 1)]),
            Err(IntegrityError::InvalidMove { .. })
        ));
        assert!(matches!(
            engine().move_tasks(&tag, &[t(2)], &[s(2, 1)]),
            Err(IntegrityError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_move_onto_dangling_target_is_refused() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a").with_dependencies([2]),
                Task::new(2, "b").with_dependencies([9]),
            ],
        );
        let err = engine().move_tasks(&tag, &[t(1)], &[t(9)]).unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::DestinationReferenced {
                destination: Reference::Task(9),
                owner: Reference::Task(2),
                ..
            }
        ));

        let lone = Tag::with_tasks(
            "master",
            vec![Task::new(1, "a"), Task::new(2, "b").with_dependencies([9])],
        );
        assert!(matches!(
            engine().move_tasks(&lone, &[t(1)], &[t(9)]),
            Err(IntegrityError::DestinationReferenced { .. })
        ));
    }

    #[test]
    fn test_rename_refused_when_subtask_identity_is_referenced() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(5, "a").with_subtask(Subtask::new(1, "a1")),
                Task::new(6, "b").with_dependencies(["9.1", "5.2"]),
                Task::new(7, "c"),
            ],
        );
        assert!(matches!(
            engine().move_tasks(&tag, &[t(5)], &[t(9)]),
            Err(IntegrityError::DestinationReferenced {
                destination: Reference::Subtask(9, 1),
                ..
            })
        ));
        assert!(matches!(
            engine().move_tasks(&tag, &[t(7)], &[s(5, 2)]),
            Err(IntegrityError::DestinationReferenced {
                destination: Reference::Subtask(5, 2),
                owner: Reference::Task(6),
                ..
            })
        ));
    }

    #[test]
    fn test_same_to_same_is_skipped() {
        let tag = Tag::with_tasks("master", vec![Task::new(1, "a")]);
        let outcome = engine().move_tasks(&tag, &[t(1)], &[t(1)]).unwrap();
        assert!(outcome.moved.is_empty());
        assert_eq!(outcome.tag, tag);
    }

    fn cross_tag_fixture() -> (Tag, Tag) {
        let source = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "base"),
                Task::new(2, "mid").with_dependencies([1]),
                Task::new(3, "top")
                    .with_dependencies([2])
                    .with_subtask(Subtask::new(1, "top1")),
                Task::new(4, "user").with_dependencies(["3.1"]),
            ],
        );
        let destination = Tag::with_tasks("feature", vec![Task::new(10, "other")]);
        (source, destination)
    }

    #[test]
    fn test_cross_tag_default_policy_reports_every_edge() {
        let (source, destination) = cross_tag_fixture();
        let err = engine()
            .move_cross_tag(&source, &destination, &[t(3)], &CrossTagMoveOptions::default())
            .unwrap_err();
        let IntegrityError::CrossTagDependencyConflict { edges } = err else {
            panic!("expected dependency conflict");
        };
        assert_eq!(
            edges,
            vec![
                ConflictingEdge {
                    from: t(3),
                    to: t(2),
                    from_moving: true
                },
                ConflictingEdge {
                    from: t(4),
                    to: s(3, 1),
                    from_moving: false
                },
            ]
        );
    }

    #[test]
    fn test_cross_tag_ignore_drops_edges() {
        let (source, destination) = cross_tag_fixture();
        let options = CrossTagMoveOptions::new(DependencyPolicy::IgnoreDependencies);
        let outcome = engine()
            .move_cross_tag(&source, &destination, &[t(3)], &options)
            .unwrap();
        assert_eq!(outcome.moved, vec![3]);
        assert_eq!(outcome.dropped_edges.len(), 2);
        let moved = outcome.destination.task(3).unwrap();
        assert!(moved.dependencies.is_empty());
        assert_eq!(moved.move_history.len(), 1);
        assert_eq!(moved.move_history[0].from_tag, "master");
        assert!(outcome.source.task(4).unwrap().dependencies.is_empty());
        assert!(engine().validate(&outcome.source).is_valid());
        assert!(engine().validate(&outcome.destination).is_valid());
    }

    #[test]
    fn test_cross_tag_with_dependencies_pulls_closure() {
        let (mut source, destination) = cross_tag_fixture();
        source.tasks.pop();
        let options = CrossTagMoveOptions::new(DependencyPolicy::WithDependencies);
        let outcome = engine()
            .move_cross_tag(&source, &destination, &[t(3)], &options)
            .unwrap();
        assert_eq!(outcome.moved, vec![1, 2, 3]);
        assert!(outcome.source.tasks.is_empty());
        let ids: Vec<_> = outcome.destination.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![10, 1, 2, 3]);
    }

    #[test]
    fn test_cross_tag_with_dependencies_still_blocks_dependents() {
        let (source, destination) = cross_tag_fixture();
        let options = CrossTagMoveOptions::new(DependencyPolicy::WithDependencies);
        let err = engine()
            .move_cross_tag(&source, &destination, &[t(3)], &options)
            .unwrap_err();
        let IntegrityError::CrossTagDependencyConflict { edges } = err else {
            panic!("expected dependency conflict");
        };
        assert_eq!(edges.len(), 1);
        assert!(!edges[0].from_moving);
    }

    #[test]
    fn test_cross_tag_rejects_subtasks_and_id_conflicts() {
        let (source, mut destination) = cross_tag_fixture();
        assert!(matches!(
            engine().move_cross_tag(&source, &destination, &[s(3, 1)], &CrossTagMoveOptions::default()),
            Err(IntegrityError::CrossTagSubtaskMove { .. })
        ));

        // The id collision wins over the crossing edge 2 -> 1, whatever the policy.
        destination.tasks.push(Task::new(1, "taken"));
        for policy in [
            DependencyPolicy::Fail,
            DependencyPolicy::WithDependencies,
            DependencyPolicy::IgnoreDependencies,
        ] {
            assert!(matches!(
                engine().move_cross_tag(&source, &destination, &[t(1)], &CrossTagMoveOptions::new(policy)),
                Err(IntegrityError::Conflict {
                    destination: Reference::Task(1),
                    ..
                })
            ));
        }
    }
}
