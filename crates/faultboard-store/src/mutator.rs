//! Link mutator
//!
//! Writes and removes links between fault records. Each operation touches
//! both endpoint documents in one transaction, so a failed write never
//! leaves only one side recording the link. Preconditions (same category,
//! open target, not already linked, not the same record) belong to the
//! caller; the mutator only performs the symmetric write.

use crate::document::{Document, FieldUpdate};
use crate::error::LinkError;
use crate::store::{DocumentStore, Transaction};
use faultboard_graph::{FaultRecord, LinkRef, RecordId};
use serde_json::Value;
use std::sync::Arc;

const RELATED_TO: &str = "relatedTo";
const RELATED_BY: &str = "relatedBy";

/// Both endpoints of a link with the titles to store alongside them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    /// Record initiating the link
    pub source_id: RecordId,
    /// Source title, stored on the target
    pub source_title: String,
    /// Record being linked to
    pub target_id: RecordId,
    /// Target title, stored on the source
    pub target_title: String,
}

impl LinkRequest {
    /// Create a request from raw parts
    #[must_use]
    pub fn new(
        source_id: impl Into<RecordId>,
        source_title: impl Into<String>,
        target_id: impl Into<RecordId>,
        target_title: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_title: source_title.into(),
            target_id: target_id.into(),
            target_title: target_title.into(),
        }
    }

    /// Create a request between two decoded records, using their current titles
    #[must_use]
    pub fn between(source: &FaultRecord, target: &FaultRecord) -> Self {
        Self::new(
            source.id().clone(),
            source.title(),
            target.id().clone(),
            target.title(),
        )
    }
}

/// Result of a committed unlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlinkOutcome {
    /// Store revision of the commit
    pub revision: u64,
    /// Link entries removed across both documents
    pub removed_entries: usize,
}

/// Symmetric link writer over a [`DocumentStore`]
#[derive(Debug)]
pub struct LinkMutator<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for LinkMutator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> LinkMutator<S>
where
    S: DocumentStore + ?Sized,
{
    /// Create a mutator over a shared store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Link two records
    ///
    /// Adds `{target_id, target_title}` to the source's `relatedTo` and
    /// `{source_id, source_title}` to the target's `relatedBy` in one
    /// commit. An identical entry already present is not added twice.
    ///
    /// # Errors
    /// Returns [`LinkError::Transaction`] if the commit is rejected, for
    /// instance because an endpoint no longer exists. Nothing is written in
    /// that case.
    pub async fn link(&self, request: &LinkRequest) -> Result<u64, LinkError> {
        let outbound = serde_json::to_value(LinkRef::new(
            request.target_id.clone(),
            request.target_title.clone(),
        ))?;
        let inbound = serde_json::to_value(LinkRef::new(
            request.source_id.clone(),
            request.source_title.clone(),
        ))?;

        let mut tx = Transaction::new();
        tx.update(
            request.source_id.clone(),
            vec![FieldUpdate::array_union(RELATED_TO, outbound)],
        );
        tx.update(
            request.target_id.clone(),
            vec![FieldUpdate::array_union(RELATED_BY, inbound)],
        );

        let revision = self.store.commit(tx).await?;
        tracing::debug!(
            source = %request.source_id,
            target = %request.target_id,
            revision,
            "linked fault records"
        );
        Ok(revision)
    }

    /// Remove every link between two records
    ///
    /// Reads both endpoints inside the transaction, then drops every entry
    /// naming the other endpoint from `relatedTo` and `relatedBy` on both
    /// sides. Entries match on id only, so titles that changed since the
    /// link was written do not leave half of the link behind.
    ///
    /// # Errors
    /// Returns [`LinkError::Transaction`] if an endpoint is missing or the
    /// commit is rejected.
    pub async fn unlink(
        &self,
        source_id: &RecordId,
        target_id: &RecordId,
    ) -> Result<UnlinkOutcome, LinkError> {
        let mut tx = Transaction::new();
        let source = tx.read(&*self.store, source_id.as_str()).await?;
        let target = tx.read(&*self.store, target_id.as_str()).await?;

        let removed_entries =
            count_entries(&source, target_id) + count_entries(&target, source_id);
        log_stale_titles(&source, &target);
        log_stale_titles(&target, &source);

        tx.update(source_id.clone(), removal(target_id));
        tx.update(target_id.clone(), removal(source_id));

        let revision = self.store.commit(tx).await?;
        tracing::debug!(
            source = %source_id,
            target = %target_id,
            removed_entries,
            revision,
            "unlinked fault records"
        );
        Ok(UnlinkOutcome {
            revision,
            removed_entries,
        })
    }
}

fn removal(other: &RecordId) -> Vec<FieldUpdate> {
    [RELATED_TO, RELATED_BY]
        .into_iter()
        .map(|field| FieldUpdate::array_remove_where(field, "id", other.as_str()))
        .collect()
}

fn link_entries<'d>(document: &'d Document) -> impl Iterator<Item = &'d Value> {
    [RELATED_TO, RELATED_BY]
        .into_iter()
        .filter_map(move |field| document.get(field).and_then(Value::as_array))
        .flatten()
}

fn count_entries(document: &Document, other: &RecordId) -> usize {
    link_entries(document)
        .filter(|entry| entry.get("id").and_then(Value::as_str) == Some(other.as_str()))
        .count()
}

fn log_stale_titles(holder: &Document, other: &Document) {
    let Some(current) = other.get("title").and_then(Value::as_str) else {
        return;
    };
    for entry in link_entries(holder) {
        if entry.get("id").and_then(Value::as_str) != Some(other.id.as_str()) {
            continue;
        }
        if let Some(stored) = entry.get("title").and_then(Value::as_str) {
            if stored != current {
                tracing::debug!(
                    holder = %holder.id,
                    other = %other.id,
                    stored,
                    current,
                    "removing link entry with stale title"
                );
            }
        }
    }
}
