//! Single-edge dependency edits and queries.

use super::{encode, normalize, IntegrityEngine};
use crate::entities::{Reference, Tag};
use crate::errors::{IntegrityError, IntegrityResult};
use crate::graph::{self, DependencyGraph, Slot};

/// Result of adding or removing one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyChange {
    pub tag: Tag,

    /// `false` when the edit was a no-op
    pub changed: bool,
}

impl IntegrityEngine {
    /// Make `owner` depend on `target`.
    ///
    /// Rejects missing endpoints, self edges and edges that would close a
    /// cycle. Adding an edge that already exists in any spelling is a no-op.
    pub fn add_dependency(
        &self,
        tag: &Tag,
        owner: Reference,
        target: Reference,
    ) -> IntegrityResult<DependencyChange> {
        let slot = self.locate(tag, owner)?;
        if !tag.contains(target) {
            return Err(IntegrityError::not_found(&tag.name, target));
        }
        if owner == target {
            return Err(IntegrityError::SelfDependency { reference: owner });
        }

        let ctx = self.context(&tag.name, owner);
        let exists = graph::dependencies(tag, slot)
            .iter()
            .any(|raw| normalize(raw, &ctx).is_ok_and(|r| r == target));
        if exists {
            tracing::debug!(%owner, %target, "Dependency already present");
            return Ok(DependencyChange {
                tag: tag.clone(),
                changed: false,
            });
        }

        let dependency_graph = DependencyGraph::build(tag, self.config().bare_subtask_references);
        if let (Some(from), Some(to)) = (dependency_graph.node(target), dependency_graph.node(owner)) {
            if let Some(path) = dependency_graph.path(from, to) {
                let mut cycle = vec![owner];
                cycle.extend(path.into_iter().map(|n| dependency_graph.reference(n)));
                return Err(IntegrityError::CircularDependency { cycle });
            }
        }

        let mut updated = tag.clone();
        graph::dependencies_mut(&mut updated, slot).push(encode(target, &ctx));
        tracing::info!(tag = %tag.name, %owner, %target, "Added dependency");

        Ok(DependencyChange {
            tag: updated,
            changed: true,
        })
    }

    /// Remove every entry of `owner` that reads as `target`.
    pub fn remove_dependency(
        &self,
        tag: &Tag,
        owner: Reference,
        target: Reference,
    ) -> IntegrityResult<DependencyChange> {
        let slot = self.locate(tag, owner)?;
        let ctx = self.context(&tag.name, owner);

        let mut updated = tag.clone();
        let entries = graph::dependencies_mut(&mut updated, slot);
        let before = entries.len();
        entries.retain(|raw| !normalize(raw, &ctx).is_ok_and(|r| r == target));
        let changed = entries.len() != before;

        if changed {
            tracing::info!(tag = %tag.name, %owner, %target, "Removed dependency");
        } else {
            tracing::debug!(%owner, %target, "Dependency not present");
        }

        Ok(DependencyChange {
            tag: updated,
            changed,
        })
    }

    /// Entities with an entry that reads as `target`, in declaration order.
    ///
    /// Works for targets that no longer exist, so dangling references can be
    /// traced back to their owners.
    pub fn dependents(&self, tag: &Tag, target: Reference) -> Vec<Reference> {
        graph::entities(tag)
            .into_iter()
            .filter(|(slot, owner)| {
                let ctx = self.context(&tag.name, *owner);
                graph::dependencies(tag, *slot)
                    .iter()
                    .any(|raw| normalize(raw, &ctx).is_ok_and(|r| r == target))
            })
            .map(|(_, owner)| owner)
            .collect()
    }

    /// Readable entries of `owner` in stored order. Malformed entries are
    /// left out; use [`IntegrityEngine::validate`] to see them.
    pub fn dependencies_of(&self, tag: &Tag, owner: Reference) -> IntegrityResult<Vec<Reference>> {
        let slot = self.locate(tag, owner)?;
        let ctx = self.context(&tag.name, owner);
        Ok(graph::dependencies(tag, slot)
            .iter()
            .filter_map(|raw| normalize(raw, &ctx).ok())
            .collect())
    }

    fn locate(&self, tag: &Tag, reference: Reference) -> IntegrityResult<Slot> {
        graph::entities(tag)
            .into_iter()
            .find(|(_, r)| *r == reference)
            .map(|(slot, _)| slot)
            .ok_or_else(|| IntegrityError::not_found(&tag.name, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BareSubtaskReferences, IntegrityConfig, RawReference, Subtask, Task};

    fn engine() -> IntegrityEngine {
        IntegrityEngine::default()
    }

    fn sample() -> Tag {
        Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a"),
                Task::new(2, "b").with_dependencies([1]),
                Task::new(3, "c")
                    .with_dependencies([2])
                    .with_subtask(Subtask::new(1, "c1"))
                    .with_subtask(Subtask::new(2, "c2").with_dependencies([1])),
            ],
        )
    }

    #[test]
    fn test_add_writes_canonical_entry() {
        let change = engine()
            .add_dependency(&sample(), Reference::Subtask(3, 1), Reference::Task(1))
            .unwrap();
        assert!(change.changed);
        assert_eq!(
            change.tag.subtask(3, 1).unwrap().dependencies,
            vec![RawReference::from("1")]
        );
        assert_eq!(
            engine()
                .dependencies_of(&change.tag, Reference::Subtask(3, 1))
                .unwrap(),
            vec![Reference::Task(1)]
        );
    }

    #[test]
    fn test_add_existing_edge_in_other_spelling_is_noop() {
        let tag = sample();
        let change = engine()
            .add_dependency(&tag, Reference::Subtask(3, 2), Reference::Subtask(3, 1))
            .unwrap();
        assert!(!change.changed);
        assert_eq!(change.tag, tag);
    }

    #[test]
    fn test_add_rejects_cycles_with_path() {
        let err = engine()
            .add_dependency(&sample(), Reference::Task(1), Reference::Task(3))
            .unwrap_err();
        let IntegrityError::CircularDependency { cycle } = err else {
            panic!("expected circular dependency");
        };
        assert_eq!(
            cycle,
            vec![
                Reference::Task(1),
                Reference::Task(3),
                Reference::Task(2),
                Reference::Task(1)
            ]
        );
    }

    #[test]
    fn test_add_rejects_self_and_missing() {
        assert!(matches!(
            engine().add_dependency(&sample(), Reference::Task(2), Reference::Task(2)),
            Err(IntegrityError::SelfDependency { .. })
        ));
        assert!(matches!(
            engine().add_dependency(&sample(), Reference::Task(2), Reference::Subtask(3, 9)),
            Err(IntegrityError::SubtaskNotFound { .. })
        ));
        assert!(matches!(
            engine().add_dependency(&sample(), Reference::Task(8), Reference::Task(1)),
            Err(IntegrityError::TaskNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_dependency() {
        let tag = sample();
        let change = engine()
            .remove_dependency(&tag, Reference::Task(3), Reference::Task(2))
            .unwrap();
        assert!(change.changed);
        assert!(change.tag.task(3).unwrap().dependencies.is_empty());

        let again = engine()
            .remove_dependency(&change.tag, Reference::Task(3), Reference::Task(2))
            .unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_queries() {
        let tag = sample();
        assert_eq!(
            engine().dependents(&tag, Reference::Task(1)),
            vec![Reference::Task(2)]
        );
        assert_eq!(
            engine().dependents(&tag, Reference::Subtask(3, 1)),
            vec![Reference::Subtask(3, 2)]
        );
        assert_eq!(
            engine()
                .dependencies_of(&tag, Reference::Subtask(3, 2))
                .unwrap(),
            vec![Reference::Subtask(3, 1)]
        );
    }

    #[test]
    fn test_queries_follow_policy() {
        let engine = IntegrityEngine::new(IntegrityConfig {
            bare_subtask_references: BareSubtaskReferences::TopLevel,
            ..IntegrityConfig::default()
        });
        assert_eq!(
            engine.dependents(&sample(), Reference::Task(1)),
            vec![Reference::Task(2), Reference::Subtask(3, 2)]
        );
    }
}
