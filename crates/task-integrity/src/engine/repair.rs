//! Deterministic, idempotent dependency repair.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::{normalize, IntegrityEngine};
use crate::entities::{RawReference, Reference, Tag, TaskId};
use crate::graph::{self, DependencyGraph, Slot};

/// Counts of what a repair run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairStats {
    pub ids_renumbered: usize,
    pub duplicates_removed: usize,
    pub missing_removed: usize,
    pub malformed_removed: usize,
    pub self_removed: usize,
    pub circular_fixed: usize,
    pub subtasks_fixed: usize,
    pub orphans_fixed: usize,
}

impl RepairStats {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.ids_renumbered
            + self.duplicates_removed
            + self.missing_removed
            + self.malformed_removed
            + self.self_removed
            + self.circular_fixed
            + self.subtasks_fixed
            + self.orphans_fixed
    }

    /// True when the run changed nothing; callers may skip persisting.
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Repaired snapshot and what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub tag: Tag,
    pub stats: RepairStats,
}

/// Key used to spot repeated entries, including malformed ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Resolved(Reference),
    Unresolved(RawReference),
}

/// Ids taken within one scope, handing out fresh ones.
#[derive(Debug, Default)]
struct IdPool {
    taken: HashSet<u32>,
    highest: u32,
}

impl IdPool {
    fn reserve(&mut self, id: u32) {
        self.taken.insert(id);
        self.highest = self.highest.max(id);
    }

    /// Next id above everything reserved, or the largest free one below.
    fn next_free(&mut self) -> Option<u32> {
        let fresh = match self.highest.checked_add(1) {
            Some(next) => next,
            None => (1..u32::MAX).rev().find(|id| !self.taken.contains(id))?,
        };
        self.reserve(fresh);
        Some(fresh)
    }
}

impl IntegrityEngine {
    /// Fix every repairable issue in a tag.
    ///
    /// Passes run in a fixed order: renumber duplicate ids, drop repeated
    /// entries, drop dangling and malformed entries, drop self references,
    /// break cycles, guarantee a startable subtask per parent, and restamp
    /// declared parents. Running it on its own output changes nothing.
    pub fn repair(&self, tag: &Tag) -> RepairOutcome {
        let mut work = tag.clone();
        let mut stats = RepairStats::default();

        stats.ids_renumbered = self.renumber_duplicate_ids(&mut work);
        stats.duplicates_removed = self.drop_repeated_entries(&mut work);

        let (missing, malformed) = self.drop_unresolvable_entries(&mut work);
        stats.missing_removed = missing;
        stats.malformed_removed = malformed;

        stats.self_removed = self.drop_self_references(&mut work);
        stats.circular_fixed = self.break_cycles(&mut work);
        stats.subtasks_fixed = Self::ensure_startable_subtasks(&mut work);
        stats.orphans_fixed = Self::reattach_orphans(&mut work);

        if stats.is_zero() {
            tracing::debug!(tag = %tag.name, "Dependencies already consistent");
        } else {
            tracing::info!(
                tag = %tag.name,
                ids_renumbered = stats.ids_renumbered,
                duplicates_removed = stats.duplicates_removed,
                missing_removed = stats.missing_removed,
                malformed_removed = stats.malformed_removed,
                self_removed = stats.self_removed,
                circular_fixed = stats.circular_fixed,
                subtasks_fixed = stats.subtasks_fixed,
                orphans_fixed = stats.orphans_fixed,
                "Repaired dependencies"
            );
        }

        RepairOutcome { tag: work, stats }
    }

    /// Give every repeated or zero id a fresh one above anything in use or
    /// referenced, so a previously dangling reference never starts resolving
    /// by accident. Falls back to the largest free id when the top of the
    /// range is taken.
    fn renumber_duplicate_ids(&self, tag: &mut Tag) -> usize {
        let mut tasks_taken = IdPool::default();
        let mut subtasks_taken: HashMap<TaskId, IdPool> = HashMap::new();

        for task in &tag.tasks {
            tasks_taken.reserve(task.id);
            let pool = subtasks_taken.entry(task.id).or_default();
            for subtask in &task.subtasks {
                pool.reserve(subtask.id);
            }
        }
        for (slot, owner) in graph::entities(tag) {
            let ctx = self.context(&tag.name, owner);
            for raw in graph::dependencies(tag, slot) {
                match normalize(raw, &ctx) {
                    Ok(Reference::Task(id)) => tasks_taken.reserve(id),
                    Ok(Reference::Subtask(parent, id)) => {
                        tasks_taken.reserve(parent);
                        subtasks_taken.entry(parent).or_default().reserve(id);
                    }
                    Err(_) => {}
                }
            }
        }

        let mut renumbered = 0;
        let mut seen_tasks = HashSet::new();
        for task in &mut tag.tasks {
            if task.id == 0 || !seen_tasks.insert(task.id) {
                let old = task.id;
                let Some(fresh) = tasks_taken.next_free() else {
                    tracing::warn!(id = old, "No free task id left to renumber into");
                    continue;
                };
                task.id = fresh;
                seen_tasks.insert(fresh);
                for subtask in &mut task.subtasks {
                    if subtask.parent_id == Some(old) {
                        subtask.parent_id = Some(fresh);
                    }
                }
                tracing::debug!(from = old, to = fresh, "Renumbered task id");
                renumbered += 1;
            }

            let mut seen_subtasks = HashSet::new();
            let pool = subtasks_taken.entry(task.id).or_insert_with(|| {
                let mut pool = IdPool::default();
                for subtask in &task.subtasks {
                    pool.reserve(subtask.id);
                }
                pool
            });
            for subtask in &mut task.subtasks {
                if subtask.id == 0 || !seen_subtasks.insert(subtask.id) {
                    let old = subtask.id;
                    let Some(fresh) = pool.next_free() else {
                        tracing::warn!(parent = task.id, id = old, "No free subtask id left");
                        continue;
                    };
                    subtask.id = fresh;
                    seen_subtasks.insert(fresh);
                    tracing::debug!(
                        parent = task.id,
                        from = old,
                        to = fresh,
                        "Renumbered subtask id"
                    );
                    renumbered += 1;
                }
            }
        }

        renumbered
    }

    fn drop_repeated_entries(&self, tag: &mut Tag) -> usize {
        let mut seen: HashMap<Slot, HashSet<EntryKey>> = HashMap::new();
        self.retain_entries(tag, |slot, _, raw, resolved| {
            let key = match resolved {
                Ok(reference) => EntryKey::Resolved(reference),
                Err(()) => EntryKey::Unresolved(raw.clone()),
            };
            seen.entry(slot).or_default().insert(key)
        })
    }

    fn drop_unresolvable_entries(&self, tag: &mut Tag) -> (usize, usize) {
        let lookup = DependencyGraph::build(tag, self.config().bare_subtask_references);
        let mut malformed = 0;
        let mut missing = 0;
        self.retain_entries(tag, |_, _, _, resolved| match resolved {
            Err(()) => {
                malformed += 1;
                false
            }
            Ok(target) if !lookup.contains(target) => {
                missing += 1;
                false
            }
            Ok(_) => true,
        });
        (missing, malformed)
    }

    fn drop_self_references(&self, tag: &mut Tag) -> usize {
        self.retain_entries(tag, |_, owner, _, resolved| resolved != Ok(owner))
    }

    /// Remove the edge that closes each cycle found by depth-first search.
    fn break_cycles(&self, tag: &mut Tag) -> usize {
        let dependency_graph = DependencyGraph::build(tag, self.config().bare_subtask_references);
        let back_edges = dependency_graph.back_edges();

        let mut removals: BTreeMap<(usize, Option<usize>), Vec<usize>> = BTreeMap::new();
        for back_edge in &back_edges {
            tracing::debug!(
                from = %dependency_graph.reference(back_edge.from),
                to = %dependency_graph.reference(back_edge.edge.target),
                "Breaking dependency cycle"
            );
            let slot = dependency_graph.slot(back_edge.from);
            removals
                .entry((slot.task, slot.subtask))
                .or_default()
                .push(back_edge.edge.entry);
        }

        for ((task, subtask), mut entries) in removals {
            entries.sort_unstable_by(|a, b| b.cmp(a));
            let deps = graph::dependencies_mut(tag, Slot { task, subtask });
            for entry in entries {
                deps.remove(entry);
            }
        }

        back_edges.len()
    }

    /// Clear the first subtask's dependencies wherever no subtask can start.
    fn ensure_startable_subtasks(tag: &mut Tag) -> usize {
        let mut fixed = 0;
        for task in &mut tag.tasks {
            if task.has_startable_subtask() {
                continue;
            }
            if let Some(first) = task.subtasks.first_mut() {
                tracing::debug!(
                    parent = task.id,
                    subtask = first.id,
                    "Cleared dependencies to keep a startable subtask"
                );
                first.dependencies.clear();
                fixed += 1;
            }
        }
        fixed
    }

    fn reattach_orphans(tag: &mut Tag) -> usize {
        let mut fixed = 0;
        for task in &mut tag.tasks {
            for subtask in &mut task.subtasks {
                if subtask.parent_id.is_some_and(|declared| declared != task.id) {
                    subtask.parent_id = Some(task.id);
                    fixed += 1;
                }
            }
        }
        fixed
    }

    /// Walk every stored entry and keep those `keep` accepts.
    ///
    /// `keep` receives the owner's slot and identity, the stored entry and its
    /// normalized form (`Err(())` when malformed). Returns how many entries
    /// were dropped.
    fn retain_entries<F>(&self, tag: &mut Tag, mut keep: F) -> usize
    where
        F: FnMut(Slot, Reference, &RawReference, Result<Reference, ()>) -> bool,
    {
        let name = tag.name.clone();
        let mut dropped = 0;
        for (slot, owner) in graph::entities(tag) {
            let ctx = self.context(&name, owner);
            let deps = graph::dependencies_mut(tag, slot);
            let before = deps.len();
            deps.retain(|raw| {
                let resolved = normalize(raw, &ctx).map_err(|_| ());
                keep(slot, owner, raw, resolved)
            });
            dropped += before - deps.len();
        }
        dropped
    }
}
