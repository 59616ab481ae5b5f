//! Concurrent link/unlink simulator
//!
//! Several board sessions share one in-memory store and issue random link
//! and unlink requests against it, each from its own live view. Once every
//! client is done the converged snapshot is regrouped and checked:
//!
//! - no record sits in two groups
//! - every group has at least two members
//! - linked records share a group
//! - every stored link entry has its counterpart on the other record
//! - every group has a color

use crate::board::Board;
use crate::config::BoardConfig;
use crate::error::BoardError;
use faultboard_graph::{
    compute_groups, Category, FaultRecord, Groups, Record, RecordId, Timestamp,
};
use faultboard_store::{DocumentStore, InMemoryStore, Query};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Fault records seeded into the store
    pub records: usize,
    /// Total link/unlink requests across all clients
    pub operations: u64,
    /// Concurrent board sessions
    pub clients: usize,
    /// Share of requests that link rather than unlink
    pub link_ratio: f64,
    /// Share of seeded records created closed
    pub closed_ratio: f64,
    /// Attempts per request on retryable failures
    pub max_retries: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            records: 40,
            operations: 1_000,
            clients: 4,
            link_ratio: 0.6,
            closed_ratio: 0.1,
            max_retries: 8,
        }
    }
}

/// Invariant broken by the converged snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Record listed in two groups
    Overlap {
        /// Record id
        record: RecordId,
        /// First group it was found in
        first: RecordId,
        /// Second group it was found in
        second: RecordId,
    },
    /// Group with fewer than two members
    Undersized {
        /// Group id
        group: RecordId,
        /// Member count
        members: usize,
    },
    /// Linked records in different groups, or ungrouped
    Split {
        /// Record holding the link
        source: RecordId,
        /// Linked record
        target: RecordId,
    },
    /// Link entry without its counterpart
    HalfLink {
        /// Record holding the entry
        holder: RecordId,
        /// Record the entry names
        other: RecordId,
    },
    /// Group without a color
    Uncolored(RecordId),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap {
                record,
                first,
                second,
            } => write!(f, "record {record} is in groups {first} and {second}"),
            Self::Undersized { group, members } => {
                write!(f, "group {group} has {members} member(s)")
            }
            Self::Split { source, target } => {
                write!(f, "linked records {source} and {target} are not grouped together")
            }
            Self::HalfLink { holder, other } => {
                write!(f, "record {holder} names {other} without a matching entry")
            }
            Self::Uncolored(group) => write!(f, "group {group} has no color"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ClientStats {
    links: u64,
    unlinks: u64,
    rejected: u64,
    retries: u64,
    failed: u64,
}

impl ClientStats {
    fn merge(&mut self, other: Self) {
        self.links += other.links;
        self.unlinks += other.unlinks;
        self.rejected += other.rejected;
        self.retries += other.retries;
        self.failed += other.failed;
    }
}

/// Outcome of a simulator run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Configuration used
    pub config: SimulatorConfig,
    /// Committed link requests
    pub links: u64,
    /// Committed unlink requests
    pub unlinks: u64,
    /// Link requests refused by a precondition
    pub rejected: u64,
    /// Retried attempts after conflicts
    pub retries: u64,
    /// Requests that failed for good
    pub failed: u64,
    /// Groups in the converged snapshot
    pub groups: usize,
    /// Records in some group
    pub grouped_records: usize,
    /// Final store revision
    pub revision: u64,
    /// Invariant violations
    pub violations: Vec<Violation>,
    /// Wall time
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Whether the run converged without violations or failures
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty() && self.failed == 0
    }

    /// Human-readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Simulation Report\n");
        out.push_str("=================\n");
        out.push_str(&format!(
            "Seed: {}  Records: {}  Clients: {}\n",
            self.config.seed, self.config.records, self.config.clients
        ));
        out.push_str(&format!(
            "Requests: {} linked, {} unlinked, {} rejected, {} failed\n",
            self.links, self.unlinks, self.rejected, self.failed
        ));
        out.push_str(&format!("Retries after conflict: {}\n", self.retries));
        out.push_str(&format!(
            "Converged: {} group(s) over {} record(s) at revision {}\n",
            self.groups, self.grouped_records, self.revision
        ));
        out.push_str(&format!("Elapsed: {:.2?}\n", self.elapsed));
        if self.violations.is_empty() {
            out.push_str("Invariants: PASS\n");
        } else {
            out.push_str(&format!("Invariants: FAIL ({})\n", self.violations.len()));
            for violation in &self.violations {
                out.push_str(&format!("  - {violation}\n"));
            }
        }
        out
    }
}

/// Check the grouping invariants against the records they were built from
#[must_use]
pub fn check_invariants(faults: &[FaultRecord], groups: &Groups) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut seen: HashMap<&RecordId, &RecordId> = HashMap::new();
    for (group_id, group) in groups.iter() {
        if group.len() < 2 {
            violations.push(Violation::Undersized {
                group: group_id.clone(),
                members: group.len(),
            });
        }
        for member in group.member_ids() {
            if let Some(first) = seen.insert(member, group_id) {
                violations.push(Violation::Overlap {
                    record: member.clone(),
                    first: first.clone(),
                    second: group_id.clone(),
                });
            }
        }
    }

    let by_id: HashMap<&str, &FaultRecord> =
        faults.iter().map(|f| (f.id().as_str(), f)).collect();
    for fault in faults {
        for target in fault.link_targets() {
            if !by_id.contains_key(target.as_str()) {
                continue;
            }
            let source_group = groups.group_id_of(fault.id().as_str());
            if source_group.is_none() || source_group != groups.group_id_of(target.as_str()) {
                violations.push(Violation::Split {
                    source: fault.id().clone(),
                    target,
                });
            }
        }

        let sides = [(&fault.related_to, true), (&fault.related_by, false)];
        for (entries, outbound) in sides {
            for entry in entries {
                let Some(other) = by_id.get(entry.id.as_str()) else {
                    continue;
                };
                let counterpart = if outbound {
                    &other.related_by
                } else {
                    &other.related_to
                };
                if !counterpart.iter().any(|e| e.id == *fault.id()) {
                    violations.push(Violation::HalfLink {
                        holder: fault.id().clone(),
                        other: entry.id.clone(),
                    });
                }
            }
        }
    }
    violations
}

async fn seed_records(
    store: &InMemoryStore,
    config: &SimulatorConfig,
    rng: &mut StdRng,
) -> Result<Vec<RecordId>, BoardError> {
    let mut ids = Vec::with_capacity(config.records);
    for i in 0..config.records {
        let mut fault = FaultRecord::new(format!("rec-{i:04}"), format!("Simulated fault {i}"));
        fault.base.created_at = Some(Timestamp::from_seconds(
            i64::try_from(i).unwrap_or(i64::MAX),
        ));
        fault.base.is_closed = rng.gen_bool(config.closed_ratio.clamp(0.0, 1.0));
        let record = Record::from(fault);
        store
            .set(record.id().as_str(), record.to_fields()?)
            .await?;
        ids.push(record.id().clone());
    }
    Ok(ids)
}

async fn run_client(
    board: Arc<Board<InMemoryStore>>,
    ids: Arc<Vec<RecordId>>,
    seed: u64,
    operations: u64,
    link_ratio: f64,
    max_retries: usize,
) -> ClientStats {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stats = ClientStats::default();
    if ids.len() < 2 {
        return stats;
    }

    for _ in 0..operations {
        let a = rng.gen_range(0..ids.len());
        let mut b = rng.gen_range(0..ids.len() - 1);
        if b >= a {
            b += 1;
        }
        let (source, target) = (ids[a].as_str(), ids[b].as_str());
        let linking = rng.gen_bool(link_ratio.clamp(0.0, 1.0));

        let mut attempt = 0;
        loop {
            let result = if linking {
                board.link(source, target).await.map(|_| ())
            } else {
                board.unlink(source, target).await.map(|_| ())
            };
            match result {
                Ok(()) if linking => stats.links += 1,
                Ok(()) => stats.unlinks += 1,
                Err(error) if error.is_precondition() => stats.rejected += 1,
                Err(error) if error.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    stats.retries += 1;
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(error) => {
                    tracing::warn!(source, target, %error, "simulated request failed");
                    stats.failed += 1;
                }
            }
            break;
        }
        tokio::task::yield_now().await;
    }
    stats
}

/// Run the simulator
///
/// # Errors
/// Fails only if the store cannot be seeded or the final snapshot cannot be
/// read; invariant violations are reported, not returned as errors.
pub async fn run_simulator(config: SimulatorConfig) -> Result<SimulationReport, BoardError> {
    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let store = InMemoryStore::shared();
    let ids = Arc::new(seed_records(&store, &config, &mut rng).await?);
    tracing::info!(
        records = ids.len(),
        clients = config.clients,
        operations = config.operations,
        seed = config.seed,
        "starting simulation"
    );

    let clients = config.clients.max(1);
    let mut boards = Vec::with_capacity(clients);
    for _ in 0..clients {
        let board = Arc::new(Board::new(Arc::clone(&store), BoardConfig::default())?);
        board.start().await;
        board.wait_for_revision(store.revision()).await;
        boards.push(board);
    }

    let client_count = u64::try_from(clients).unwrap_or(u64::MAX);
    let per_client = config.operations / client_count;
    let remainder = config.operations % client_count;
    let tasks: Vec<_> = boards
        .iter()
        .enumerate()
        .map(|(index, board)| {
            let index = u64::try_from(index).unwrap_or(u64::MAX);
            let operations = per_client + u64::from(index < remainder);
            tokio::spawn(run_client(
                Arc::clone(board),
                Arc::clone(&ids),
                config.seed.wrapping_add(index + 1),
                operations,
                config.link_ratio,
                config.max_retries,
            ))
        })
        .collect();

    let mut stats = ClientStats::default();
    for joined in futures::future::join_all(tasks).await {
        match joined {
            Ok(client) => stats.merge(client),
            Err(error) => {
                tracing::error!(%error, "simulated client panicked");
                stats.failed += 1;
            }
        }
    }

    let snapshot = store
        .query(&Query::category(Category::CommonFault))
        .await?;
    let faults = snapshot.fault_records()?;
    let groups = compute_groups(&faults);
    let mut violations = check_invariants(&faults, &groups);

    let observer = &boards[0];
    let view = observer.refresh().await?;
    for group_id in groups.ids() {
        if view.color_of(group_id.as_str()).is_none() {
            violations.push(Violation::Uncolored(group_id.clone()));
        }
    }
    for board in &boards {
        board.stop().await;
    }

    let grouped: BTreeSet<&RecordId> = groups.iter().flat_map(|(_, g)| g.member_ids()).collect();
    let report = SimulationReport {
        config,
        links: stats.links,
        unlinks: stats.unlinks,
        rejected: stats.rejected,
        retries: stats.retries,
        failed: stats.failed,
        groups: groups.len(),
        grouped_records: grouped.len(),
        revision: snapshot.revision,
        violations,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        passed = report.passed(),
        groups = report.groups,
        violations = report.violations.len(),
        "simulation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultboard_graph::LinkRef;

    fn fault(id: &str, secs: i64) -> FaultRecord {
        let mut r = FaultRecord::new(id, id);
        r.base.created_at = Some(Timestamp::from_seconds(secs));
        r
    }

    #[test]
    fn half_link_is_reported() {
        let mut a = fault("a", 1);
        a.related_to.push(LinkRef::new("b", "b"));
        let faults = vec![a, fault("b", 2)];
        let groups = compute_groups(&faults);

        let violations = check_invariants(&faults, &groups);
        assert_eq!(
            violations,
            vec![Violation::HalfLink {
                holder: RecordId::from("a"),
                other: RecordId::from("b"),
            }]
        );
    }

    #[test]
    fn symmetric_links_pass() {
        let mut a = fault("a", 1);
        let mut b = fault("b", 2);
        a.related_to.push(LinkRef::new("b", "b"));
        b.related_by.push(LinkRef::new("a", "a"));
        let faults = vec![a, b, fault("c", 3)];
        assert!(check_invariants(&faults, &compute_groups(&faults)).is_empty());
    }

    #[test]
    fn split_is_reported_against_a_stale_grouping() {
        let mut a = fault("a", 1);
        let mut b = fault("b", 2);
        a.related_to.push(LinkRef::new("b", "b"));
        b.related_by.push(LinkRef::new("a", "a"));
        let stale = compute_groups(&[]);

        let violations = check_invariants(&[a, b], &stale);
        assert!(violations
            .iter()
            .all(|v| matches!(v, Violation::Split { .. })));
        assert_eq!(violations.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn small_run_converges() {
        let report = run_simulator(SimulatorConfig {
            records: 12,
            operations: 200,
            clients: 3,
            ..SimulatorConfig::default()
        })
        .await
        .unwrap();

        assert!(report.passed(), "{}", report.generate_text());
        assert!(report.links + report.unlinks + report.rejected > 0);
        assert!(report.generate_text().contains("Invariants: PASS"));
    }
}
