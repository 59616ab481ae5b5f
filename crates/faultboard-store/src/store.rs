//! Document store seam
//!
//! [`DocumentStore`] is everything the board needs from its backing store:
//! single-document CRUD, queries, live subscriptions and multi-document
//! transactions. Transactions are optimistic: reads pin the version they
//! saw, and commit applies every write or none, failing with
//! [`StoreError::Conflict`] if a pinned document moved in the meantime.

use crate::document::{Document, FieldUpdate, Fields};
use crate::error::StoreError;
use crate::query::Query;
use crate::snapshot::{Snapshot, Subscription};
use async_trait::async_trait;
use faultboard_graph::RecordId;
use std::collections::BTreeMap;

/// Backing store for board records
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document under a fresh id
    ///
    /// `updates` are applied to `fields` in the same write, so server
    /// timestamps land together with the document.
    async fn create(
        &self,
        fields: Fields,
        updates: Vec<FieldUpdate>,
    ) -> Result<RecordId, StoreError>;

    /// Create or overwrite a document under a caller-chosen id
    async fn set(&self, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Apply field updates to one existing document
    async fn update(&self, id: &str, updates: Vec<FieldUpdate>) -> Result<(), StoreError>;

    /// Delete a document; deleting a missing document is not an error
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Run a query once
    async fn query(&self, query: &Query) -> Result<Snapshot, StoreError>;

    /// Commit a transaction atomically, returning the new store revision
    async fn commit(&self, transaction: Transaction) -> Result<u64, StoreError>;

    /// Follow a query; the subscription sees every later change
    fn subscribe(&self, query: Query) -> Subscription;
}

/// Multi-document read-modify-write unit
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    reads: BTreeMap<RecordId, u64>,
    writes: Vec<(RecordId, Vec<FieldUpdate>)>,
}

impl Transaction {
    /// Empty transaction
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a document and pin its version
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the document does not exist.
    pub async fn read<S>(&mut self, store: &S, id: &str) -> Result<Document, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let document = store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(RecordId::from(id)))?;
        self.reads.insert(document.id.clone(), document.version);
        Ok(document)
    }

    /// Queue updates for a document; the document must exist at commit
    pub fn update(&mut self, id: impl Into<RecordId>, updates: Vec<FieldUpdate>) -> &mut Self {
        self.writes.push((id.into(), updates));
        self
    }

    /// Pinned `(id, version)` pairs
    #[inline]
    #[must_use]
    pub fn reads(&self) -> &BTreeMap<RecordId, u64> {
        &self.reads
    }

    /// Queued writes in order
    #[inline]
    #[must_use]
    pub fn writes(&self) -> &[(RecordId, Vec<FieldUpdate>)] {
        &self.writes
    }

    /// Whether nothing was queued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
