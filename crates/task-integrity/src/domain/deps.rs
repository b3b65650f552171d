//! Dependency domain facade.

use std::sync::Arc;

use crate::engine::{IntegrityEngine, RepairOutcome, ValidationReport};
use crate::entities::Reference;
use crate::errors::IntegrityResult;
use crate::storage::Storage;

/// Dependency domain facade providing validation, repair and edge edits
pub struct DependencyDomain {
    storage: Arc<dyn Storage>,
    engine: IntegrityEngine,
}

impl DependencyDomain {
    /// Create a new dependency domain
    pub fn new(storage: Arc<dyn Storage>, engine: IntegrityEngine) -> Self {
        Self { storage, engine }
    }

    /// Validate one tag
    pub async fn validate(&self, tag: &str) -> IntegrityResult<ValidationReport> {
        let snapshot = self.storage.load_tag(tag).await?;
        Ok(self.engine.validate(&snapshot))
    }

    /// Validate every tag in the document, in tag-name order
    pub async fn validate_all(&self) -> IntegrityResult<Vec<ValidationReport>> {
        let document = self.storage.load_document().await?;
        Ok(document
            .tag_names()
            .iter()
            .filter_map(|name| document.get(name))
            .map(|tag| self.engine.validate(tag))
            .collect())
    }

    /// Repair one tag. Nothing is written on a dry run or when the tag was
    /// already consistent.
    pub async fn fix(&self, tag: &str, dry_run: bool) -> IntegrityResult<RepairOutcome> {
        let snapshot = self.storage.load_tag(tag).await?;
        let outcome = self.engine.repair(&snapshot);

        if dry_run {
            tracing::info!(tag, fixes = outcome.stats.total(), "Dry run, not saving");
        } else if !outcome.stats.is_zero() {
            self.storage.save_tags(&[&outcome.tag]).await?;
        }

        Ok(outcome)
    }

    /// Add a dependency; returns `false` when it was already present
    pub async fn add_dependency(
        &self,
        tag: &str,
        owner: Reference,
        target: Reference,
    ) -> IntegrityResult<bool> {
        let snapshot = self.storage.load_tag(tag).await?;
        let change = self.engine.add_dependency(&snapshot, owner, target)?;
        if change.changed {
            self.storage.save_tags(&[&change.tag]).await?;
        }
        Ok(change.changed)
    }

    /// Remove a dependency; returns `false` when it was not present
    pub async fn remove_dependency(
        &self,
        tag: &str,
        owner: Reference,
        target: Reference,
    ) -> IntegrityResult<bool> {
        let snapshot = self.storage.load_tag(tag).await?;
        let change = self.engine.remove_dependency(&snapshot, owner, target)?;
        if change.changed {
            self.storage.save_tags(&[&change.tag]).await?;
        }
        Ok(change.changed)
    }

    /// Entities that depend on `target`
    pub async fn get_dependents(&self, tag: &str, target: Reference) -> IntegrityResult<Vec<Reference>> {
        let snapshot = self.storage.load_tag(tag).await?;
        Ok(self.engine.dependents(&snapshot, target))
    }

    /// Entities `owner` depends on
    pub async fn get_dependencies(&self, tag: &str, owner: Reference) -> IntegrityResult<Vec<Reference>> {
        let snapshot = self.storage.load_tag(tag).await?;
        self.engine.dependencies_of(&snapshot, owner)
    }
}
