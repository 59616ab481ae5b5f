//! Query snapshots and live subscriptions
//!
//! A [`Snapshot`] is the complete result of a query at one store revision.
//! Subscriptions sit on a `tokio::sync::watch` channel: a slow consumer
//! never sees a backlog, only the freshest snapshot, and each snapshot
//! fully replaces the previous one.

use crate::document::Document;
use crate::query::Query;
use faultboard_graph::{FaultRecord, Record, RecordError};
use std::sync::Arc;
use tokio::sync::watch;

/// Point-in-time result of a query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Store revision the snapshot was taken at
    pub revision: u64,
    /// Matching documents in query order
    pub documents: Vec<Document>,
}

impl Snapshot {
    /// Number of documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the query matched nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether both snapshots hold the same document versions
    #[must_use]
    pub fn same_contents(&self, other: &Self) -> bool {
        self.documents.len() == other.documents.len()
            && self
                .documents
                .iter()
                .zip(&other.documents)
                .all(|(a, b)| a.id == b.id && a.version == b.version)
    }

    /// Decode every document
    ///
    /// # Errors
    /// Fails on the first document that violates the record schema.
    pub fn records(&self) -> Result<Vec<Record>, RecordError> {
        self.documents.iter().map(Document::decode).collect()
    }

    /// Decode the fault records, skipping other categories
    ///
    /// # Errors
    /// Fails on the first document that violates the record schema.
    pub fn fault_records(&self) -> Result<Vec<FaultRecord>, RecordError> {
        let mut faults = Vec::with_capacity(self.documents.len());
        for document in &self.documents {
            if let Some(fault) = document.decode_fault()? {
                faults.push(fault);
            }
        }
        Ok(faults)
    }
}

/// Live query subscription
///
/// Dropping the subscription unsubscribes; the store prunes closed
/// channels on its next write.
#[derive(Debug)]
pub struct Subscription {
    query: Query,
    receiver: watch::Receiver<Arc<Snapshot>>,
    primed: bool,
}

impl Subscription {
    pub(crate) fn new(query: Query, receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        Self {
            query,
            receiver,
            primed: false,
        }
    }

    /// Query this subscription follows
    #[inline]
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Latest snapshot, without waiting
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Next snapshot
    ///
    /// The first call yields the snapshot current at subscription time;
    /// later calls wait for a change. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        if !self.primed {
            self.primed = true;
            return Some(Arc::clone(&self.receiver.borrow_and_update()));
        }
        self.receiver.changed().await.ok()?;
        Some(Arc::clone(&self.receiver.borrow_and_update()))
    }
}
