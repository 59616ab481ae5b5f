//! Undirected link graph over fault records
//!
//! Built from each record's [`FaultRecord::link_targets`]. Edges only join
//! records present in the input: references to deleted records are dropped,
//! self references never become loops, and repeated entries collapse into
//! one edge.

use crate::record::{FaultRecord, RecordId};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Adjacency over the current fault-record snapshot
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    graph: UnGraph<RecordId, ()>,
    index: HashMap<RecordId, NodeIndex>,
}

impl LinkGraph {
    /// Build the graph for a set of fault records
    ///
    /// Nodes are added in id order so the graph layout does not depend on
    /// the order of `records`.
    #[must_use]
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FaultRecord>,
    {
        let records: BTreeMap<&RecordId, &FaultRecord> =
            records.into_iter().map(|r| (r.id(), r)).collect();

        let mut graph = UnGraph::with_capacity(records.len(), records.len());
        let mut index = HashMap::with_capacity(records.len());
        for id in records.keys() {
            let node = graph.add_node((*id).clone());
            index.insert((*id).clone(), node);
        }

        for (id, record) in &records {
            let from = index[*id];
            for target in record.link_targets() {
                let Some(&to) = index.get(&target) else {
                    continue;
                };
                if graph.find_edge(from, to).is_none() {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, index }
    }

    /// Whether the record is part of the graph
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Neighbor ids of a record, empty for unknown ids
    #[must_use]
    pub fn neighbors(&self, id: &str) -> BTreeSet<RecordId> {
        self.index
            .get(id)
            .map(|&node| {
                self.graph
                    .neighbors(node)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full adjacency mapping, every record present as a key
    #[must_use]
    pub fn adjacency(&self) -> BTreeMap<RecordId, BTreeSet<RecordId>> {
        self.graph
            .node_indices()
            .map(|node| {
                let neighbors: BTreeSet<RecordId> = self
                    .graph
                    .neighbors(node)
                    .map(|n| self.graph[n].clone())
                    .collect();
                (self.graph[node].clone(), neighbors)
            })
            .collect()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct undirected links
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of connected components, singletons included
    #[must_use]
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    pub(crate) fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn neighbor_nodes(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(node)
    }

    pub(crate) fn id_of(&self, node: NodeIndex) -> &RecordId {
        &self.graph[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LinkRef;

    fn fault(id: &str, to: &[&str], by: &[&str]) -> FaultRecord {
        let mut r = FaultRecord::new(id, id.to_uppercase());
        r.related_to = to.iter().map(|t| LinkRef::new(*t, t.to_uppercase())).collect();
        r.related_by = by.iter().map(|t| LinkRef::new(*t, t.to_uppercase())).collect();
        r
    }

    fn ids(items: &[&str]) -> BTreeSet<RecordId> {
        items.iter().map(|s| RecordId::from(*s)).collect()
    }

    #[test]
    fn one_sided_link_is_symmetric() {
        let records = vec![fault("a", &["b"], &[]), fault("b", &[], &[])];
        let graph = LinkGraph::build(&records);

        assert_eq!(graph.neighbors("a"), ids(&["b"]));
        assert_eq!(graph.neighbors("b"), ids(&["a"]));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn duplicate_entries_collapse() {
        let records = vec![
            fault("a", &["b", "b"], &["b"]),
            fault("b", &["a"], &["a"]),
        ];
        let graph = LinkGraph::build(&records);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn dangling_and_self_references_are_dropped() {
        let records = vec![fault("a", &["a", "ghost"], &["b"]), fault("b", &[], &[])];
        let graph = LinkGraph::build(&records);

        assert_eq!(graph.neighbors("a"), ids(&["b"]));
        assert!(!graph.contains("ghost"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn adjacency_lists_isolated_records() {
        let records = vec![fault("a", &[], &[]), fault("b", &[], &["c"]), fault("c", &[], &[])];
        let adjacency = LinkGraph::build(&records).adjacency();

        assert_eq!(adjacency.len(), 3);
        assert!(adjacency[&RecordId::from("a")].is_empty());
        assert_eq!(adjacency[&RecordId::from("c")], ids(&["b"]));
    }

    #[test]
    fn counts_components_including_singletons() {
        let records = vec![
            fault("a", &["b"], &[]),
            fault("b", &[], &[]),
            fault("c", &[], &[]),
        ];
        let graph = LinkGraph::build(&records);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.component_count(), 2);
    }

    #[test]
    fn unknown_id_has_no_neighbors() {
        let none: Vec<FaultRecord> = Vec::new();
        let graph = LinkGraph::build(&none);
        assert!(graph.neighbors("nope").is_empty());
    }
}
