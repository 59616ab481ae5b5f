//! Testing utilities for Faultboard workspace
//!
//! Shared fixtures: fault record builders, link helpers and store seeding.

#![allow(missing_docs)]

use faultboard_graph::{FaultRecord, LinkRef, Record, RecordId, Timestamp};
use faultboard_store::{DocumentStore, InMemoryStore};
use std::sync::Arc;

/// Fluent builder for fault records
#[derive(Debug, Clone)]
pub struct FaultBuilder {
    record: FaultRecord,
}

impl FaultBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            record: FaultRecord::new(id, format!("Fault {id}")),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.record.base.title = title.to_string();
        self
    }

    pub fn created(mut self, seconds: i64) -> Self {
        self.record.base.created_at = Some(Timestamp::from_seconds(seconds));
        self
    }

    pub fn pending(mut self) -> Self {
        self.record.base.created_at = None;
        self
    }

    pub fn closed(mut self) -> Self {
        self.record.base.is_closed = true;
        self
    }

    pub fn model(mut self, model_number: &str) -> Self {
        self.record.base.model_number = Some(model_number.to_string());
        self
    }

    pub fn related_to(mut self, id: &str) -> Self {
        self.record.related_to.push(LinkRef::new(id, format!("Fault {id}")));
        self
    }

    pub fn related_by(mut self, id: &str) -> Self {
        self.record.related_by.push(LinkRef::new(id, format!("Fault {id}")));
        self
    }

    pub fn build(self) -> FaultRecord {
        self.record
    }
}

/// Fault record created at `seconds`, no links
pub fn fault(id: &str, seconds: i64) -> FaultRecord {
    FaultBuilder::new(id).created(seconds).build()
}

/// Write a link into both records the way the mutator does
pub fn link(records: &mut [FaultRecord], source: &str, target: &str) {
    let title_of = |records: &[FaultRecord], id: &str| {
        records
            .iter()
            .find(|r| r.id().as_str() == id)
            .map(|r| r.title().to_string())
            .unwrap_or_default()
    };
    let source_title = title_of(records, source);
    let target_title = title_of(records, target);
    for record in records.iter_mut() {
        if record.id().as_str() == source {
            record.related_to.push(LinkRef::new(target, target_title.clone()));
        }
        if record.id().as_str() == target {
            record.related_by.push(LinkRef::new(source, source_title.clone()));
        }
    }
}

/// Linear chain `f0 - f1 - ... - f{n-1}`, each created one second apart
pub fn chain(n: usize) -> Vec<FaultRecord> {
    let mut records: Vec<FaultRecord> = (0..n)
        .map(|i| fault(&format!("f{i}"), i64::try_from(i).unwrap_or(i64::MAX)))
        .collect();
    for i in 1..n {
        link(&mut records, &format!("f{}", i - 1), &format!("f{i}"));
    }
    records
}

/// Three records: `1` and `2` linked (one-sided, on `2`), `3` isolated
pub fn linked_pair_scenario() -> Vec<FaultRecord> {
    vec![
        FaultBuilder::new("1").title("A").created(100).build(),
        FaultBuilder::new("2").title("B").created(200).related_to("1").build(),
        FaultBuilder::new("3").title("C").created(300).build(),
    ]
}

pub fn ids(items: &[&str]) -> Vec<RecordId> {
    items.iter().map(|s| RecordId::from(*s)).collect()
}

/// Store records under their own ids
pub async fn seed_store<S>(store: &S, records: &[Record])
where
    S: DocumentStore + ?Sized,
{
    for record in records {
        let fields = record.to_fields().expect("record encodes");
        store
            .set(record.id().as_str(), fields)
            .await
            .expect("seed write succeeds");
    }
}

/// New in-memory store holding the given fault records
pub async fn store_with_faults(records: &[FaultRecord]) -> Arc<InMemoryStore> {
    let store = InMemoryStore::shared();
    let records: Vec<Record> = records.iter().cloned().map(Record::from).collect();
    seed_store(&*store, &records).await;
    store
}
