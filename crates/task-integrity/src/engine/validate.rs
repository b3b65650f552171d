//! Read-only dependency validation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use super::{normalize, IntegrityEngine};
use crate::entities::{RawReference, Reference, Tag, TaskId};
use crate::graph::{self, DependencyGraph};

/// A single finding. Findings are data, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Issue {
    /// Identity already used earlier in the same scope
    DuplicateId { entity: Reference },

    /// Id outside the positive range, unreachable by any reference
    InvalidId { entity: Reference },

    /// Stored entry that is not a valid reference
    MalformedReference {
        entity: Reference,
        raw: RawReference,
        reason: String,
    },

    /// Same target listed more than once
    DuplicateDependency {
        entity: Reference,
        reference: Reference,
    },

    /// Entity depends on itself
    SelfReference { entity: Reference },

    /// Target does not exist in the tag
    MissingReference {
        entity: Reference,
        reference: Reference,
    },

    /// Entity lies on a dependency cycle
    CircularReference {
        entity: Reference,
        cycle: Vec<Reference>,
    },

    /// Declared `parentId` disagrees with the containing task
    #[serde(rename_all = "camelCase")]
    OrphanedSubtask {
        entity: Reference,
        declared_parent: TaskId,
    },

    /// Parent whose subtasks all have dependencies
    NoStartableSubtask { parent: TaskId },
}

/// Discriminant of an [`Issue`], used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    DuplicateId,
    InvalidId,
    MalformedReference,
    DuplicateDependency,
    SelfReference,
    MissingReference,
    CircularReference,
    OrphanedSubtask,
    NoStartableSubtask,
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Self::DuplicateId { .. } => IssueKind::DuplicateId,
            Self::InvalidId { .. } => IssueKind::InvalidId,
            Self::MalformedReference { .. } => IssueKind::MalformedReference,
            Self::DuplicateDependency { .. } => IssueKind::DuplicateDependency,
            Self::SelfReference { .. } => IssueKind::SelfReference,
            Self::MissingReference { .. } => IssueKind::MissingReference,
            Self::CircularReference { .. } => IssueKind::CircularReference,
            Self::OrphanedSubtask { .. } => IssueKind::OrphanedSubtask,
            Self::NoStartableSubtask { .. } => IssueKind::NoStartableSubtask,
        }
    }

    /// Entity the finding is about
    pub fn entity(&self) -> Reference {
        match self {
            Self::DuplicateId { entity }
            | Self::InvalidId { entity }
            | Self::MalformedReference { entity, .. }
            | Self::DuplicateDependency { entity, .. }
            | Self::SelfReference { entity }
            | Self::MissingReference { entity, .. }
            | Self::CircularReference { entity, .. }
            | Self::OrphanedSubtask { entity, .. } => *entity,
            Self::NoStartableSubtask { parent } => Reference::Task(*parent),
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DuplicateId => "duplicate id",
            Self::InvalidId => "invalid id",
            Self::MalformedReference => "malformed reference",
            Self::DuplicateDependency => "duplicate dependency",
            Self::SelfReference => "self reference",
            Self::MissingReference => "missing reference",
            Self::CircularReference => "circular reference",
            Self::OrphanedSubtask => "orphaned subtask",
            Self::NoStartableSubtask => "no startable subtask",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { entity } => write!(f, "{entity} reuses an id already taken"),
            Self::InvalidId { entity } => write!(f, "{entity} has id 0; ids start at 1"),
            Self::MalformedReference { entity, raw, reason } => {
                write!(f, "{entity} has malformed dependency {raw}: {reason}")
            }
            Self::DuplicateDependency { entity, reference } => {
                write!(f, "{entity} lists {reference} more than once")
            }
            Self::SelfReference { entity } => write!(f, "{entity} depends on itself"),
            Self::MissingReference { entity, reference } => {
                write!(f, "{entity} depends on missing {reference}")
            }
            Self::CircularReference { entity, cycle } => {
                let path: Vec<String> = cycle
                    .iter()
                    .chain(cycle.first())
                    .map(ToString::to_string)
                    .collect();
                write!(f, "{entity} is on cycle {}", path.join(" -> "))
            }
            Self::OrphanedSubtask {
                entity,
                declared_parent,
            } => write!(f, "{entity} declares parent {declared_parent}"),
            Self::NoStartableSubtask { parent } => {
                write!(f, "every subtask of {parent} has dependencies")
            }
        }
    }
}

/// Issues found in one tag, in deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub tag: String,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues of one kind
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind() == kind).count()
    }

    /// Issue counts grouped by kind
    pub fn summary(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind()).or_insert(0) += 1;
        }
        counts
    }
}

impl IntegrityEngine {
    /// Scan a tag and report every integrity issue without modifying it.
    ///
    /// Issues come out grouped by pass (ids, references, cycles, orphans,
    /// startable subtasks) and in declaration order within each pass.
    pub fn validate(&self, tag: &Tag) -> ValidationReport {
        let mut issues = Vec::new();
        let listed = graph::entities(tag);

        // Identity lookup
        let mut seen_tasks = HashSet::new();
        for task in &tag.tasks {
            if task.id == 0 {
                issues.push(Issue::InvalidId {
                    entity: Reference::Task(task.id),
                });
            } else if !seen_tasks.insert(task.id) {
                issues.push(Issue::DuplicateId {
                    entity: Reference::Task(task.id),
                });
            }
            let mut seen_subtasks = HashSet::new();
            for subtask in &task.subtasks {
                if subtask.id == 0 {
                    issues.push(Issue::InvalidId {
                        entity: Reference::Subtask(task.id, subtask.id),
                    });
                } else if !seen_subtasks.insert(subtask.id) {
                    issues.push(Issue::DuplicateId {
                        entity: Reference::Subtask(task.id, subtask.id),
                    });
                }
            }
        }

        let dependency_graph = DependencyGraph::build(tag, self.config().bare_subtask_references);

        // References
        for (slot, owner) in &listed {
            let ctx = self.context(&tag.name, *owner);
            let mut targets = HashSet::new();
            for raw in graph::dependencies(tag, *slot) {
                let target = match normalize(raw, &ctx) {
                    Ok(target) => target,
                    Err(err) => {
                        issues.push(Issue::MalformedReference {
                            entity: *owner,
                            raw: raw.clone(),
                            reason: err.to_string(),
                        });
                        continue;
                    }
                };
                if !targets.insert(target) {
                    issues.push(Issue::DuplicateDependency {
                        entity: *owner,
                        reference: target,
                    });
                } else if target == *owner {
                    issues.push(Issue::SelfReference { entity: *owner });
                } else if !dependency_graph.contains(target) {
                    issues.push(Issue::MissingReference {
                        entity: *owner,
                        reference: target,
                    });
                }
            }
        }

        // Cycles
        for back_edge in dependency_graph.back_edges() {
            let cycle: Vec<Reference> = back_edge
                .cycle
                .iter()
                .map(|n| dependency_graph.reference(*n))
                .collect();
            for entity in &cycle {
                issues.push(Issue::CircularReference {
                    entity: *entity,
                    cycle: cycle.clone(),
                });
            }
        }

        // Orphans
        for task in &tag.tasks {
            for subtask in &task.subtasks {
                if let Some(declared) = subtask.parent_id {
                    if declared != task.id {
                        issues.push(Issue::OrphanedSubtask {
                            entity: Reference::Subtask(task.id, subtask.id),
                            declared_parent: declared,
                        });
                    }
                }
            }
        }

        // Startable subtasks
        for task in &tag.tasks {
            if !task.has_startable_subtask() {
                issues.push(Issue::NoStartableSubtask { parent: task.id });
            }
        }

        tracing::debug!(tag = %tag.name, issues = issues.len(), "Validated dependencies");

        ValidationReport {
            tag: tag.name.clone(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BareSubtaskReferences, IntegrityConfig, Subtask, Task};

    fn engine() -> IntegrityEngine {
        IntegrityEngine::default()
    }

    #[test]
    fn test_clean_tag_is_valid() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a"),
                Task::new(2, "b")
                    .with_dependencies([1])
                    .with_subtask(Subtask::new(1, "b1"))
                    .with_subtask(Subtask::new(2, "b2").with_dependencies([1])),
            ],
        );
        let report = engine().validate(&tag);
        assert!(report.is_valid(), "{:?}", report.issues);
    }

    #[test]
    fn test_self_and_missing_references() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(5, "a").with_dependencies([5, 3]),
                Task::new(6, "b").with_dependencies(["9.1"]),
            ],
        );
        let report = engine().validate(&tag);
        assert_eq!(
            report.issues,
            vec![
                Issue::SelfReference {
                    entity: Reference::Task(5)
                },
                Issue::MissingReference {
                    entity: Reference::Task(5),
                    reference: Reference::Task(3)
                },
                Issue::MissingReference {
                    entity: Reference::Task(6),
                    reference: Reference::Subtask(9, 1)
                },
            ]
        );
    }

    #[test]
    fn test_cycle_reports_every_node() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(5, "a").with_dependencies([6]),
                Task::new(6, "b").with_dependencies([7]),
                Task::new(7, "c").with_dependencies([5]),
            ],
        );
        let report = engine().validate(&tag);
        assert_eq!(report.count(IssueKind::CircularReference), 3);
        let entities: Vec<_> = report.issues.iter().map(Issue::entity).collect();
        assert_eq!(
            entities,
            vec![Reference::Task(5), Reference::Task(6), Reference::Task(7)]
        );
        assert_eq!(
            report.issues[0].to_string(),
            "5 is on cycle 5 -> 6 -> 7 -> 5"
        );
    }

    #[test]
    fn test_duplicates_and_malformed() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a"),
                Task::new(1, "again"),
                Task::new(2, "b").with_dependencies([
                    RawReference::Number(1),
                    RawReference::from("1"),
                    RawReference::from("one"),
                ]),
            ],
        );
        let report = engine().validate(&tag);
        let kinds: Vec<_> = report.issues.iter().map(Issue::kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::DuplicateId,
                IssueKind::DuplicateDependency,
                IssueKind::MalformedReference
            ]
        );
    }

    #[test]
    fn test_sibling_shorthand_is_policy_dependent() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a"),
                Task::new(3, "b")
                    .with_subtask(Subtask::new(1, "b1"))
                    .with_subtask(Subtask::new(2, "b2").with_dependencies([1])),
            ],
        );
        assert!(engine().validate(&tag).is_valid());

        let top_level = IntegrityEngine::new(IntegrityConfig {
            bare_subtask_references: BareSubtaskReferences::TopLevel,
            ..IntegrityConfig::default()
        });
        assert!(top_level.validate(&tag).is_valid());

        let strict = IntegrityEngine::new(IntegrityConfig {
            bare_subtask_references: BareSubtaskReferences::Reject,
            ..IntegrityConfig::default()
        });
        assert_eq!(
            strict.validate(&tag).count(IssueKind::MalformedReference),
            1
        );
    }

    #[test]
    fn test_orphan_and_startable_checks() {
        let mut orphan = Subtask::new(1, "moved badly");
        orphan.parent_id = Some(99);
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a"),
                Task::new(2, "b")
                    .with_subtask(orphan)
                    .with_subtask(Subtask::new(2, "b2").with_dependencies(["1"])),
                Task::new(4, "c").with_subtask(Subtask::new(1, "c1").with_dependencies(["1"])),
            ],
        );
        let report = engine().validate(&tag);
        assert_eq!(
            report.issues,
            vec![
                Issue::OrphanedSubtask {
                    entity: Reference::Subtask(2, 1),
                    declared_parent: 99
                },
                Issue::NoStartableSubtask { parent: 4 },
            ]
        );
    }

    #[test]
    fn test_zero_ids_reported() {
        let tag = Tag::with_tasks(
            "master",
            vec![Task::new(0, "z").with_subtask(Subtask::new(0, "z0"))],
        );
        assert_eq!(
            engine().validate(&tag).issues,
            vec![
                Issue::InvalidId {
                    entity: Reference::Task(0)
                },
                Issue::InvalidId {
                    entity: Reference::Subtask(0, 0)
                },
            ]
        );
    }

    #[test]
    fn test_subtasks_of_repeated_task_do_not_resolve() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(3, "first"),
                Task::new(3, "second").with_subtask(Subtask::new(1, "s1")),
                Task::new(4, "d").with_dependencies(["3.1"]),
            ],
        );
        assert!(!tag.contains(Reference::Subtask(3, 1)));
        assert_eq!(
            engine().validate(&tag).issues,
            vec![
                Issue::DuplicateId {
                    entity: Reference::Task(3)
                },
                Issue::MissingReference {
                    entity: Reference::Task(4),
                    reference: Reference::Subtask(3, 1)
                },
            ]
        );
    }

    #[test]
    fn test_validate_is_deterministic() {
        let tag = Tag::with_tasks(
            "master",
            vec![
                Task::new(1, "a").with_dependencies([2, 8]),
                Task::new(2, "b").with_dependencies([1, 2]),
            ],
        );
        let first = engine().validate(&tag);
        let second = engine().validate(&tag);
        assert_eq!(first, second);
        assert_eq!(first.summary().values().sum::<usize>(), first.issues.len());
    }
}
