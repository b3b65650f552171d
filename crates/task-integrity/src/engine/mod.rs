//! The integrity engine: validation, repair, hierarchy moves and dependency
//! edits over in-memory tag snapshots.
//!
//! Every operation here is synchronous and performs no I/O. Mutating
//! operations take a snapshot by reference and return a new one, so an error
//! can never leave a half-applied change behind.

mod deps;
mod moves;
mod normalizer;
mod repair;
mod validate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{IntegrityConfig, Reference};
use crate::errors::IntegrityError;

pub use deps::DependencyChange;
pub use moves::{CrossTagMoveOptions, CrossTagOutcome, MoveOutcome};
pub use normalizer::{encode, normalize, reencode, ReferenceContext};
pub use repair::{RepairOutcome, RepairStats};
pub use validate::{Issue, IssueKind, ValidationReport};

/// How a cross-tag move treats edges between moving and staying tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyPolicy {
    /// Refuse the move and report every conflicting edge
    #[default]
    Fail,
    /// Pull the transitive dependencies of the moving set along
    WithDependencies,
    /// Drop the conflicting edges
    IgnoreDependencies,
}

impl fmt::Display for DependencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::WithDependencies => write!(f, "with-dependencies"),
            Self::IgnoreDependencies => write!(f, "ignore-dependencies"),
        }
    }
}

impl FromStr for DependencyPolicy {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "with-dependencies" | "with_dependencies" => Ok(Self::WithDependencies),
            "ignore-dependencies" | "ignore_dependencies" => Ok(Self::IgnoreDependencies),
            _ => Err(IntegrityError::InvalidArgument {
                reason: format!("unknown dependency policy '{s}'"),
            }),
        }
    }
}

/// Entry point for all integrity operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityEngine {
    config: IntegrityConfig,
}

impl IntegrityEngine {
    /// Create an engine with the given settings
    pub fn new(config: IntegrityConfig) -> Self {
        Self { config }
    }

    /// Engine settings
    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Normalization context for an owner in the named tag
    pub fn context<'a>(&self, tag: &'a str, owner: Reference) -> ReferenceContext<'a> {
        ReferenceContext::new(tag, owner, self.config.bare_subtask_references)
    }
}
