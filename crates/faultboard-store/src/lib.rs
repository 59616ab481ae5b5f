//! Faultboard Store - document store seam and link mutation
//!
//! - [`DocumentStore`]: async store interface with optimistic
//!   multi-document transactions and live query subscriptions
//! - [`InMemoryStore`]: single-lock implementation used by sessions,
//!   the simulator and tests
//! - [`LinkMutator`]: symmetric link/unlink writes, one transaction each
//!
//! # Example
//!
//! ```rust,ignore
//! use faultboard_store::{InMemoryStore, LinkMutator, LinkRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::shared();
//! let mutator = LinkMutator::new(store.clone());
//! mutator.link(&LinkRequest::new("a", "Door seal", "b", "Door seal leak")).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod memory;
pub mod mutator;
pub mod query;
pub mod snapshot;
pub mod store;

pub use document::{Document, FieldUpdate, Fields};
pub use error::{LinkError, StoreError};
pub use memory::InMemoryStore;
pub use mutator::{LinkMutator, LinkRequest, UnlinkOutcome};
pub use query::{Direction, Filter, OrderBy, Query};
pub use snapshot::{Snapshot, Subscription};
pub use store::{DocumentStore, Transaction};
