//! In-memory document store
//!
//! All state sits behind one `parking_lot` lock. Every write, including a
//! multi-document commit, happens inside a single critical section, which
//! gives transactions all-or-nothing semantics. After each write the store
//! re-runs the live queries and publishes a new snapshot to subscribers
//! whose results changed.

use crate::document::{Document, FieldUpdate, Fields};
use crate::error::StoreError;
use crate::query::Query;
use crate::snapshot::{Snapshot, Subscription};
use crate::store::{DocumentStore, Transaction};
use async_trait::async_trait;
use faultboard_graph::{RecordId, Timestamp};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Length of generated document ids
pub const GENERATED_ID_LEN: usize = 20;

#[derive(Debug)]
struct Watcher {
    query: Query,
    sender: watch::Sender<Arc<Snapshot>>,
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<RecordId, Document>,
    revision: u64,
    watchers: Vec<Watcher>,
    failing_commits: usize,
}

impl State {
    fn snapshot(&self, query: &Query) -> Snapshot {
        Snapshot {
            revision: self.revision,
            documents: query.apply(self.documents.values()),
        }
    }

    fn publish(&mut self) {
        let before = self.watchers.len();
        let mut watchers = std::mem::take(&mut self.watchers);
        watchers.retain(|w| !w.sender.is_closed());
        for watcher in &watchers {
            let snapshot = self.snapshot(&watcher.query);
            watcher.sender.send_if_modified(|current| {
                if current.same_contents(&snapshot) {
                    false
                } else {
                    *current = Arc::new(snapshot);
                    true
                }
            });
        }
        if watchers.len() != before {
            tracing::debug!(
                pruned = before - watchers.len(),
                active = watchers.len(),
                "pruned closed subscriptions"
            );
        }
        self.watchers = watchers;
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Transactional document store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store behind an `Arc`
    #[inline]
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Current store revision
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.lock().revision
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().documents.len()
    }

    /// Whether the store holds no documents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().documents.is_empty()
    }

    /// Number of live subscriptions, after dropping closed ones
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.watchers.retain(|w| !w.sender.is_closed());
        state.watchers.len()
    }

    /// Reject the next `count` commits with [`StoreError::Unavailable`]
    ///
    /// Lets callers exercise their failure paths against a real store.
    pub fn fail_next_commits(&self, count: usize) {
        self.state.lock().failing_commits = count;
    }

    fn generate_id(documents: &BTreeMap<RecordId, Document>) -> RecordId {
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(GENERATED_ID_LEN)
                .map(char::from)
                .collect();
            let id = RecordId::from(id);
            if !documents.contains_key(&id) {
                return id;
            }
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.state.lock().documents.get(id).cloned())
    }

    async fn create(
        &self,
        mut fields: Fields,
        updates: Vec<FieldUpdate>,
    ) -> Result<RecordId, StoreError> {
        let mut state = self.state.lock();
        let id = Self::generate_id(&state.documents);
        let now = Timestamp::now();
        for update in &updates {
            update.apply(&id, &mut fields, now)?;
        }
        let revision = state.next_revision();
        let mut document = Document::new(id.clone(), fields);
        document.version = revision;
        state.documents.insert(id.clone(), document);
        state.publish();
        tracing::debug!(id = %id, revision, "created document");
        Ok(id)
    }

    async fn set(&self, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let revision = state.next_revision();
        let mut document = Document::new(id, fields);
        document.version = revision;
        state.documents.insert(document.id.clone(), document);
        state.publish();
        Ok(())
    }

    async fn update(&self, id: &str, updates: Vec<FieldUpdate>) -> Result<(), StoreError> {
        let mut tx = Transaction::new();
        tx.update(id, updates);
        self.commit(tx).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.documents.remove(id).is_some() {
            state.next_revision();
            state.publish();
            tracing::debug!(id, "deleted document");
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Snapshot, StoreError> {
        Ok(self.state.lock().snapshot(query))
    }

    async fn commit(&self, transaction: Transaction) -> Result<u64, StoreError> {
        let mut state = self.state.lock();

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        for (id, version) in transaction.reads() {
            match state.documents.get(id) {
                Some(doc) if doc.version == *version => {}
                _ => {
                    tracing::warn!(id = %id, "transaction conflict");
                    return Err(StoreError::Conflict(id.clone()));
                }
            }
        }

        if transaction.is_empty() {
            return Ok(state.revision);
        }

        let now = Timestamp::now();
        let mut staged: BTreeMap<RecordId, Fields> = BTreeMap::new();
        for (id, updates) in transaction.writes() {
            if !staged.contains_key(id) {
                let current = state
                    .documents
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                staged.insert(id.clone(), current.fields.clone());
            }
            let Some(fields) = staged.get_mut(id) else {
                continue;
            };
            for update in updates {
                update.apply(id, fields, now)?;
            }
        }

        let revision = state.next_revision();
        let written = staged.len();
        for (id, fields) in staged {
            if let Some(document) = state.documents.get_mut(&id) {
                document.fields = fields;
                document.version = revision;
            }
        }
        state.publish();
        tracing::debug!(revision, documents = written, "committed transaction");
        Ok(revision)
    }

    fn subscribe(&self, query: Query) -> Subscription {
        let mut state = self.state.lock();
        let (sender, receiver) = watch::channel(Arc::new(state.snapshot(&query)));
        state.watchers.push(Watcher {
            query: query.clone(),
            sender,
        });
        Subscription::new(query, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_assigns_twenty_char_ids() {
        let store = InMemoryStore::new();
        let id = store.create(fields(json!({ "title": "x" })), Vec::new()).await.unwrap();
        assert_eq!(id.as_str().len(), GENERATED_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn create_stamps_in_one_write() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(Query::all());
        assert!(sub.next().await.unwrap().is_empty());

        let id = store
            .create(
                fields(json!({ "title": "x" })),
                vec![FieldUpdate::ServerTimestamp {
                    field: "createdAt".to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(store.revision(), 1);
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.documents[0].id, id);
        assert!(snapshot.documents[0].fields["createdAt"]["seconds"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn create_with_bad_update_writes_nothing() {
        let store = InMemoryStore::new();
        let err = store
            .create(
                fields(json!({ "relatedTo": "oops" })),
                vec![FieldUpdate::array_union("relatedTo", json!({ "id": "b" }))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnArray { .. }));
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.set("a", fields(json!({ "relatedTo": [] }))).await.unwrap();

        let mut tx = Transaction::new();
        tx.update("a", vec![FieldUpdate::array_union("relatedTo", json!({ "id": "b" }))]);
        tx.update("missing", vec![FieldUpdate::set("x", 1)]);

        let err = store.commit(tx).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(RecordId::from("missing")));

        let a = store.get("a").await.unwrap().unwrap();
        assert_eq!(a.fields["relatedTo"], json!([]));
    }

    #[tokio::test]
    async fn stale_read_conflicts() {
        let store = InMemoryStore::new();
        store.set("a", fields(json!({ "title": "A" }))).await.unwrap();

        let mut tx = Transaction::new();
        tx.read(&store, "a").await.unwrap();
        store
            .update("a", vec![FieldUpdate::set("title", "A2")])
            .await
            .unwrap();
        tx.update("a", vec![FieldUpdate::set("title", "A3")]);

        let err = store.commit(tx).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            store.get("a").await.unwrap().unwrap().fields["title"],
            json!("A2")
        );
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = InMemoryStore::new();
        store.set("a", fields(json!({}))).await.unwrap();
        store.fail_next_commits(1);

        assert!(matches!(
            store.update("a", vec![FieldUpdate::set("n", 1)]).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.update("a", vec![FieldUpdate::set("n", 1)]).await.is_ok());
    }

    #[tokio::test]
    async fn subscribers_only_see_matching_changes() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(Query::all().where_eq("category", "common-fault"));
        assert!(sub.next().await.unwrap().is_empty());

        store
            .set("q", fields(json!({ "category": "qa", "title": "Q" })))
            .await
            .unwrap();
        store
            .set("f", fields(json!({ "category": "common-fault", "title": "F" })))
            .await
            .unwrap();

        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.documents[0].id.as_str(), "f");
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let store = InMemoryStore::new();
        let sub = store.subscribe(Query::all());
        let _kept = store.subscribe(Query::all());
        assert_eq!(store.subscriber_count(), 2);

        drop(sub);
        store.set("a", fields(json!({}))).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let store = InMemoryStore::new();
        store.delete("nothing").await.unwrap();
        assert_eq!(store.revision(), 0);
    }
}
