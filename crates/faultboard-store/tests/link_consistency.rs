use faultboard_graph::{compute_groups, Category, FaultRecord, LinkRef, RecordId};
use faultboard_store::{DocumentStore, LinkError, LinkMutator, LinkRequest, Query};
use faultboard_test_utils::{chain, fault, linked_pair_scenario, store_with_faults};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

fn edges(records: &[FaultRecord]) -> (BTreeSet<(String, String)>, BTreeSet<(String, String)>) {
    let mut outbound = BTreeSet::new();
    let mut inbound = BTreeSet::new();
    for record in records {
        for LinkRef { id, .. } in &record.related_to {
            outbound.insert((record.id().to_string(), id.to_string()));
        }
        for LinkRef { id, .. } in &record.related_by {
            inbound.insert((id.to_string(), record.id().to_string()));
        }
    }
    (outbound, inbound)
}

async fn faults<S: DocumentStore + ?Sized>(store: &S) -> Vec<FaultRecord> {
    store
        .query(&Query::category(Category::CommonFault))
        .await
        .unwrap()
        .fault_records()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_links_stay_symmetric() {
    let records: Vec<FaultRecord> = (0..8).map(|i| fault(&format!("r{i}"), i)).collect();
    let store = store_with_faults(&records).await;
    let mutator = LinkMutator::new(Arc::clone(&store));

    let mut tasks = Vec::new();
    for i in 0..8_i64 {
        for j in (i + 1)..8 {
            if (i + j) % 3 == 0 {
                continue;
            }
            let mutator = mutator.clone();
            tasks.push(tokio::spawn(async move {
                let request = LinkRequest::new(
                    format!("r{i}"),
                    format!("Fault r{i}"),
                    format!("r{j}"),
                    format!("Fault r{j}"),
                );
                mutator.link(&request).await
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let (outbound, inbound) = edges(&faults(&*store).await);
    assert_eq!(outbound, inbound);
    assert!(!outbound.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_link_and_unlink_converge() {
    let records = chain(6);
    let store = store_with_faults(&records).await;
    let mutator = LinkMutator::new(Arc::clone(&store));

    let mut tasks = Vec::new();
    for i in 1..6 {
        let mutator = mutator.clone();
        tasks.push(tokio::spawn(async move {
            let source = RecordId::from(format!("f{}", i - 1));
            let target = RecordId::from(format!("f{i}"));
            loop {
                match mutator.unlink(&source, &target).await {
                    Err(err) if err.is_retryable() => continue,
                    other => return other.map(|_| ()),
                }
            }
        }));
    }
    for i in 0..5 {
        let mutator = mutator.clone();
        tasks.push(tokio::spawn(async move {
            let request = LinkRequest::new(
                format!("f{i}"),
                format!("Fault f{i}"),
                format!("f{}", i + 1),
                format!("Fault f{}", i + 1),
            );
            mutator.link(&request).await.map(|_| ())
        }));
    }
    for task in tasks {
        let result: Result<(), LinkError> = task.await.unwrap();
        result.unwrap();
    }

    // whichever order the writes landed in, no half links remain
    let current = faults(&*store).await;
    let (outbound, inbound) = edges(&current);
    assert_eq!(outbound, inbound);

    let groups = compute_groups(&current);
    for (a, b) in &outbound {
        assert_eq!(groups.group_id_of(a), groups.group_id_of(b));
        assert!(groups.group_id_of(a).is_some());
    }
}

#[tokio::test]
async fn subscription_sees_regrouping() {
    let store = store_with_faults(&linked_pair_scenario()).await;
    let mut subscription = store.subscribe(Query::category(Category::CommonFault));

    let initial = subscription.next().await.unwrap();
    let groups = compute_groups(&initial.fault_records().unwrap());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.group_id_of("3"), None);

    let mutator = LinkMutator::new(Arc::clone(&store));
    mutator
        .link(&LinkRequest::new("3", "C", "2", "B"))
        .await
        .unwrap();

    let next = subscription.next().await.unwrap();
    assert!(next.revision > initial.revision);
    let groups = compute_groups(&next.fault_records().unwrap());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.group_id_of("3"), Some(&RecordId::from("1")));

    mutator
        .unlink(&RecordId::from("2"), &RecordId::from("1"))
        .await
        .unwrap();
    mutator
        .unlink(&RecordId::from("3"), &RecordId::from("2"))
        .await
        .unwrap();

    let mut latest = subscription.next().await.unwrap();
    while latest.revision < store.revision() {
        latest = subscription.next().await.unwrap();
    }
    assert!(compute_groups(&latest.fault_records().unwrap()).is_empty());
}

#[tokio::test]
async fn repeated_link_is_not_duplicated() {
    let store = store_with_faults(&[fault("a", 1), fault("b", 2)]).await;
    let mutator = LinkMutator::new(Arc::clone(&store));
    let request = LinkRequest::new("a", "Fault a", "b", "Fault b");

    mutator.link(&request).await.unwrap();
    mutator.link(&request).await.unwrap();

    let current = faults(&*store).await;
    let a = current.iter().find(|r| r.id().as_str() == "a").unwrap();
    assert_eq!(a.related_to.len(), 1);
}
