//! Move domain facade.

use std::sync::Arc;

use crate::engine::{CrossTagMoveOptions, CrossTagOutcome, IntegrityEngine, MoveOutcome};
use crate::entities::{Reference, Tag, TagMetadata};
use crate::errors::IntegrityResult;
use crate::storage::Storage;

/// Move domain facade for within-tag and cross-tag moves
pub struct MoveDomain {
    storage: Arc<dyn Storage>,
    engine: IntegrityEngine,
}

impl MoveDomain {
    /// Create a new move domain
    pub fn new(storage: Arc<dyn Storage>, engine: IntegrityEngine) -> Self {
        Self { storage, engine }
    }

    /// Apply moves inside one tag and persist the result.
    pub async fn move_tasks(
        &self,
        tag: &str,
        sources: &[Reference],
        destinations: &[Reference],
    ) -> IntegrityResult<MoveOutcome> {
        let snapshot = self.storage.load_tag(tag).await?;
        let outcome = self.engine.move_tasks(&snapshot, sources, destinations)?;
        if !outcome.moved.is_empty() {
            self.storage.save_tags(&[&outcome.tag]).await?;
        }
        Ok(outcome)
    }

    /// Move top-level tasks to another tag, creating it when missing.
    /// Both tags are written together.
    pub async fn move_cross_tag(
        &self,
        source: &str,
        destination: &str,
        ids: &[Reference],
        options: &CrossTagMoveOptions,
    ) -> IntegrityResult<CrossTagOutcome> {
        let document = self.storage.load_document().await?;
        let source_tag = document.snapshot(source)?;
        let destination_tag = match document.get(destination) {
            Some(tag) => tag.clone(),
            None => {
                tracing::info!(tag = destination, "Creating destination tag");
                let mut tag = Tag::new(destination);
                tag.metadata = Some(TagMetadata {
                    created: Some(options.moved_at),
                    description: Some(format!("Created by move from '{source}'")),
                    ..Default::default()
                });
                tag
            }
        };

        let outcome = self
            .engine
            .move_cross_tag(&source_tag, &destination_tag, ids, options)?;
        self.storage
            .save_tags(&[&outcome.source, &outcome.destination])
            .await?;
        Ok(outcome)
    }
}
