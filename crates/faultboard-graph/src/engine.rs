//! Fault grouping engine
//!
//! Partitions fault records into linked groups with a breadth-first
//! connected-components pass over the [`LinkGraph`]. Components with a
//! single record are not groups. Each group is identified by its earliest
//! created member (ties broken by id), which keeps the identity stable for
//! as long as that member stays in the component.
//!
//! The engine holds no state: every snapshot is grouped from scratch and the
//! result only depends on the set of records, never on their order.

use crate::link_graph::LinkGraph;
use crate::record::{FaultRecord, RecordId, Timestamp};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A linked group of at least two fault records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultGroup {
    /// Id of the earliest created member
    pub group_id: RecordId,
    /// Title of the earliest created member
    pub title: String,
    /// Members ordered by `(created_at or epoch, id)`
    pub members: Vec<FaultRecord>,
}

impl FaultGroup {
    /// The earliest created member
    #[inline]
    #[must_use]
    pub fn root(&self) -> &FaultRecord {
        &self.members[0]
    }

    /// Root creation time, epoch when pending
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.root().base.created_or_epoch()
    }

    /// Number of members
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; groups have at least two members
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in creation order
    pub fn member_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.members.iter().map(FaultRecord::id)
    }

    /// Whether a record belongs to this group
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id().as_str() == id)
    }
}

/// Result of one grouping pass
///
/// Groups are keyed by group id. A membership index answers
/// [`Groups::group_id_of`] without scanning members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Groups {
    groups: BTreeMap<RecordId, FaultGroup>,
    membership: HashMap<RecordId, RecordId>,
}

impl Groups {
    fn insert(&mut self, group: FaultGroup) {
        for member in group.member_ids() {
            self.membership
                .insert(member.clone(), group.group_id.clone());
        }
        self.groups.insert(group.group_id.clone(), group);
    }

    /// Group by id
    #[inline]
    #[must_use]
    pub fn get(&self, group_id: &str) -> Option<&FaultGroup> {
        self.groups.get(group_id)
    }

    /// Whether a group with this id exists
    #[inline]
    #[must_use]
    pub fn contains(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    /// Group id of a record, `None` if the record is not in a multi-member group
    #[inline]
    #[must_use]
    pub fn group_id_of(&self, record_id: &str) -> Option<&RecordId> {
        self.membership.get(record_id)
    }

    /// Number of groups
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records that belong to some group
    #[inline]
    #[must_use]
    pub fn grouped_record_count(&self) -> usize {
        self.membership.len()
    }

    /// Groups in group-id order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &FaultGroup)> {
        self.groups.iter()
    }

    /// Group ids in group-id order
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.groups.keys()
    }

    /// Groups ordered by root creation, oldest first
    ///
    /// This is the order new colors are handed out in.
    #[must_use]
    pub fn by_creation(&self) -> Vec<&FaultGroup> {
        let mut groups: Vec<&FaultGroup> = self.groups.values().collect();
        groups.sort_by(|a, b| a.root().sort_key().cmp(&b.root().sort_key()));
        groups
    }

    /// Groups for the navigation menu, newest root first
    #[must_use]
    pub fn menu_order(&self) -> Vec<&FaultGroup> {
        let mut groups = self.by_creation();
        groups.reverse();
        groups
    }

    /// Borrow the underlying map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<RecordId, FaultGroup> {
        &self.groups
    }
}

/// Connected-components grouping over fault records
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupEngine;

impl GroupEngine {
    /// Create the engine
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Group a snapshot of fault records
    ///
    /// Records are visited in input order; each unvisited record seeds a
    /// breadth-first walk. The visited set bounds the walk, so malformed
    /// self references and cycles terminate.
    #[must_use]
    pub fn compute(&self, records: &[FaultRecord]) -> Groups {
        let graph = LinkGraph::build(records);
        let by_id: HashMap<&RecordId, &FaultRecord> =
            records.iter().map(|r| (r.id(), r)).collect();

        let mut visited = vec![false; graph.node_count()];
        let mut groups = Groups::default();

        for record in records {
            let Some(start) = graph.node(record.id().as_str()) else {
                continue;
            };
            if visited[start.index()] {
                continue;
            }
            visited[start.index()] = true;

            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for neighbor in graph.neighbor_nodes(node) {
                    if !visited[neighbor.index()] {
                        visited[neighbor.index()] = true;
                        component.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }

            if component.len() < 2 {
                continue;
            }

            let mut members: Vec<FaultRecord> = component
                .iter()
                .filter_map(|&node| by_id.get(graph.id_of(node)).map(|r| (*r).clone()))
                .collect();
            members.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

            let root = &members[0];
            let group = FaultGroup {
                group_id: root.id().clone(),
                title: root.title().to_string(),
                members,
            };
            groups.insert(group);
        }

        tracing::debug!(
            records = records.len(),
            links = graph.edge_count(),
            groups = groups.len(),
            "recomputed fault groups"
        );
        groups
    }
}

/// Group a snapshot with the default engine
#[must_use]
pub fn compute_groups(records: &[FaultRecord]) -> Groups {
    GroupEngine::new().compute(records)
}

/// Group id of a record in a computed grouping
#[must_use]
pub fn group_id_of<'g>(record_id: &str, groups: &'g Groups) -> Option<&'g RecordId> {
    groups.group_id_of(record_id)
}
