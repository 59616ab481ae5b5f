use faultboard_graph::{
    compute_groups, group_id_of, Color, ColorAssignmentStore, GroupEngine, Palette, RecordId,
};
use faultboard_test_utils::{chain, fault, ids, link, linked_pair_scenario, FaultBuilder};
use pretty_assertions::assert_eq;

#[test]
fn linked_pair_forms_one_group_rooted_at_oldest() {
    let records = linked_pair_scenario();
    let groups = compute_groups(&records);

    assert_eq!(groups.len(), 1);
    let group = groups.get("1").unwrap();
    assert_eq!(group.title, "A");
    assert_eq!(group.member_ids().cloned().collect::<Vec<_>>(), ids(&["1", "2"]));

    assert_eq!(group_id_of("2", &groups), Some(&RecordId::from("1")));
    assert_eq!(group_id_of("3", &groups), None);
}

#[test]
fn chain_is_one_group() {
    let records = chain(4);
    let groups = compute_groups(&records);

    assert_eq!(groups.len(), 1);
    let group = groups.get("f0").unwrap();
    assert_eq!(
        group.member_ids().cloned().collect::<Vec<_>>(),
        ids(&["f0", "f1", "f2", "f3"])
    );
}

#[test]
fn two_separate_clusters() {
    let mut records = vec![
        fault("a", 10),
        fault("b", 20),
        fault("c", 5),
        fault("d", 40),
        fault("lonely", 1),
    ];
    link(&mut records, "a", "b");
    link(&mut records, "d", "c");

    let groups = compute_groups(&records);
    assert_eq!(groups.ids().cloned().collect::<Vec<_>>(), ids(&["a", "c"]));
    assert_eq!(groups.grouped_record_count(), 4);
    assert_eq!(group_id_of("d", &groups), Some(&RecordId::from("c")));
    assert_eq!(group_id_of("lonely", &groups), None);
}

#[test]
fn dangling_reference_alone_forms_no_group() {
    let records = vec![FaultBuilder::new("x").created(1).related_to("deleted").build()];
    let groups = compute_groups(&records);
    assert!(groups.is_empty());
}

#[test]
fn dangling_reference_does_not_break_real_links() {
    let records = vec![
        FaultBuilder::new("x").created(1).related_to("deleted").build(),
        FaultBuilder::new("y").created(2).related_by("x").build(),
    ];
    let groups = compute_groups(&records);
    assert_eq!(groups.len(), 1);
    assert_eq!(group_id_of("y", &groups), Some(&RecordId::from("x")));
}

#[test]
fn self_link_is_ignored() {
    let records = vec![FaultBuilder::new("x").created(1).related_to("x").build()];
    assert!(compute_groups(&records).is_empty());
}

#[test]
fn pending_timestamp_sorts_first() {
    let records = vec![
        FaultBuilder::new("old").created(100).related_to("new").build(),
        FaultBuilder::new("new").pending().build(),
    ];
    let groups = compute_groups(&records);
    let group = groups.get("new").unwrap();
    assert_eq!(group.title, "Fault new");
    assert_eq!(group.member_ids().cloned().collect::<Vec<_>>(), ids(&["new", "old"]));
}

#[test]
fn equal_timestamps_break_ties_on_id() {
    let mut records = vec![fault("m", 7), fault("k", 7)];
    link(&mut records, "m", "k");
    let groups = compute_groups(&records);
    assert!(groups.contains("k"));
}

#[test]
fn unlinking_dissolves_the_group() {
    let mut records = linked_pair_scenario();
    assert_eq!(compute_groups(&records).len(), 1);

    for record in &mut records {
        record.related_to.retain(|e| e.id.as_str() != "1" && e.id.as_str() != "2");
        record.related_by.retain(|e| e.id.as_str() != "1" && e.id.as_str() != "2");
    }
    let groups = compute_groups(&records);
    assert!(groups.is_empty());
    assert_eq!(group_id_of("1", &groups), None);
    assert_eq!(group_id_of("2", &groups), None);
}

#[test]
fn closed_records_still_group() {
    let mut records = vec![
        FaultBuilder::new("a").created(1).closed().build(),
        fault("b", 2),
    ];
    link(&mut records, "b", "a");
    let groups = compute_groups(&records);
    assert!(groups.contains("a"));
}

#[test]
fn menu_lists_newest_group_first() {
    let mut records = vec![fault("a", 1), fault("b", 2), fault("c", 3), fault("d", 4)];
    link(&mut records, "a", "b");
    link(&mut records, "c", "d");
    let groups = GroupEngine::new().compute(&records);

    let menu: Vec<&str> = groups.menu_order().iter().map(|g| g.group_id.as_str()).collect();
    assert_eq!(menu, vec!["c", "a"]);
}

#[test]
fn colors_survive_recomputation() {
    let mut colors = ColorAssignmentStore::default();

    let records = linked_pair_scenario();
    let groups = compute_groups(&records);
    colors.assign_groups(&groups);
    let first = colors.color_of("1").cloned().unwrap();

    let mut grown = records.clone();
    grown.push(fault("0", 50));
    grown.push(fault("9", 60));
    link(&mut grown, "9", "0");
    link(&mut grown, "3", "1");
    let regrouped = compute_groups(&grown);
    assert_eq!(regrouped.len(), 2);

    assert_eq!(colors.assign_groups(&regrouped), 1);
    assert_eq!(colors.color_of("1"), Some(&first));
    assert_ne!(colors.color_of("0"), Some(&first));
}

#[test]
fn dissolved_group_keeps_its_color_entry() {
    let mut colors = ColorAssignmentStore::new(
        Palette::new(vec![Color::parse("#000000").unwrap(), Color::parse("#ffffff").unwrap()])
            .unwrap(),
    );
    colors.assign_groups(&compute_groups(&linked_pair_scenario()));
    colors.assign_groups(&compute_groups(&[]));
    assert_eq!(colors.len(), 1);
    assert_eq!(colors.color_of("1").map(Color::as_str), Some("#000000"));
}
