//! Faultboard Graph - fault record grouping
//!
//! Pure, synchronous core of the record board:
//! - [`record`]: tagged-union record model decoded from store documents
//! - [`link_graph`]: undirected adjacency built from `relatedTo`/`relatedBy`
//! - [`engine`]: connected-components grouping with stable group ids
//! - [`color`]: append-only session color assignments
//!
//! # Example
//!
//! ```rust
//! use faultboard_graph::{ColorAssignmentStore, FaultRecord, GroupEngine, LinkRef, Timestamp};
//!
//! let mut a = FaultRecord::new("1", "Door seal leak");
//! a.base.created_at = Some(Timestamp::from_seconds(100));
//! let mut b = FaultRecord::new("2", "Door seal leak (again)");
//! b.base.created_at = Some(Timestamp::from_seconds(200));
//! b.related_to.push(LinkRef::new("1", "Door seal leak"));
//!
//! let groups = GroupEngine::new().compute(&[a, b]);
//! assert_eq!(groups.group_id_of("2").map(|id| id.as_str()), Some("1"));
//!
//! let mut colors = ColorAssignmentStore::default();
//! colors.assign_groups(&groups);
//! assert!(colors.color_of("1").is_some());
//! ```

#![warn(unreachable_pub)]

pub mod color;
pub mod engine;
pub mod error;
pub mod link_graph;
pub mod record;

pub use color::{Color, ColorAssignmentStore, Palette, DEFAULT_PALETTE};
pub use engine::{compute_groups, group_id_of, FaultGroup, GroupEngine, Groups};
pub use error::{ColorError, RecordError};
pub use link_graph::LinkGraph;
pub use record::{
    Category, Comment, FaultRecord, GeneralRecord, LinkRef, ModelCategory, QaRecord, Record,
    RecordBase, RecordId, Timestamp,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
