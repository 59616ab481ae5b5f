use faultboard_graph::{FaultRecord, GroupEngine, Groups, LinkRef, RecordId, Timestamp};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Edge plan: (holder index, target index, store on relatedBy instead of relatedTo)
type EdgePlan = (usize, usize, bool);

fn build(times: &[Option<i64>], edges: &[EdgePlan]) -> Vec<FaultRecord> {
    let n = times.len();
    let mut records: Vec<FaultRecord> = times
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut r = FaultRecord::new(format!("r{i}"), format!("title {i}"));
            r.base.created_at = t.map(Timestamp::from_seconds);
            r
        })
        .collect();

    for &(holder, target, inbound) in edges {
        if holder >= n {
            continue;
        }
        // targets past the end are dangling references
        let target_id = if target < n {
            format!("r{target}")
        } else {
            format!("ghost{target}")
        };
        let entry = LinkRef::new(target_id, "whatever");
        if inbound {
            records[holder].related_by.push(entry);
        } else {
            records[holder].related_to.push(entry);
        }
    }
    records
}

fn fixture() -> impl Strategy<Value = (Vec<Option<i64>>, Vec<EdgePlan>)> {
    (1..24usize).prop_flat_map(|n| {
        (
            proptest::collection::vec(proptest::option::of(0..6i64), n),
            proptest::collection::vec((0..n, 0..n + 3, any::<bool>()), 0..40),
        )
    })
}

fn canonical(groups: &Groups) -> Vec<(String, String, Vec<String>)> {
    groups
        .iter()
        .map(|(id, g)| {
            (
                id.to_string(),
                g.title.clone(),
                g.member_ids().map(ToString::to_string).collect(),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_groups_partition_the_input((times, edges) in fixture()) {
        let records = build(&times, &edges);
        let groups = GroupEngine::new().compute(&records);

        let mut seen = BTreeSet::new();
        for (_, group) in groups.iter() {
            for id in group.member_ids() {
                prop_assert!(seen.insert(id.clone()), "record {} in two groups", id);
            }
        }
        let input: BTreeSet<RecordId> = records.iter().map(|r| r.id().clone()).collect();
        prop_assert!(seen.is_subset(&input));
        prop_assert_eq!(seen.len(), groups.grouped_record_count());

        for record in &records {
            let in_group = seen.contains(record.id());
            prop_assert_eq!(in_group, groups.group_id_of(record.id().as_str()).is_some());
        }
    }

    #[test]
    fn prop_groups_have_at_least_two_members((times, edges) in fixture()) {
        let records = build(&times, &edges);
        let groups = GroupEngine::new().compute(&records);
        for (_, group) in groups.iter() {
            prop_assert!(group.len() >= 2);
        }
    }

    #[test]
    fn prop_linked_records_share_a_group((times, edges) in fixture()) {
        let records = build(&times, &edges);
        let groups = GroupEngine::new().compute(&records);
        let present: BTreeSet<&str> = records.iter().map(|r| r.id().as_str()).collect();

        for record in &records {
            for target in record.link_targets() {
                if !present.contains(target.as_str()) {
                    continue;
                }
                let a = groups.group_id_of(record.id().as_str());
                let b = groups.group_id_of(target.as_str());
                prop_assert!(a.is_some());
                prop_assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn prop_group_id_is_earliest_member((times, edges) in fixture()) {
        let records = build(&times, &edges);
        let groups = GroupEngine::new().compute(&records);
        for (id, group) in groups.iter() {
            let earliest = group.members.iter().map(FaultRecord::sort_key).min().unwrap();
            prop_assert_eq!(earliest.1, id);
            prop_assert_eq!(&group.title, group.root().title());
            let keys: Vec<_> = group.members.iter().map(FaultRecord::sort_key).collect();
            prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn prop_result_ignores_input_order(
        (times, edges) in fixture(),
        rotate in 0..24usize,
    ) {
        let records = build(&times, &edges);
        let mut permuted = records.clone();
        permuted.reverse();
        let len = permuted.len();
        permuted.rotate_left(rotate % len);

        let engine = GroupEngine::new();
        let first = engine.compute(&records);
        let second = engine.compute(&permuted);
        let again = engine.compute(&records);

        prop_assert_eq!(canonical(&first), canonical(&second));
        prop_assert_eq!(&first, &again);
    }
}
