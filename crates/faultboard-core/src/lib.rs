//! Faultboard Core - record board sessions
//!
//! Ties the grouping engine and the document store together into a live
//! board session:
//! - Follows the fault feed and regroups every snapshot
//! - Keeps group colors stable for the whole session
//! - Validates and performs link / unlink requests
//! - Serves status-filtered, searchable record lists
//! - Ships a concurrent link/unlink simulator
//!
//! # Example
//!
//! ```rust,ignore
//! use faultboard_core::{Board, BoardConfig};
//! use faultboard_store::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let board = Board::new(InMemoryStore::shared(), BoardConfig::new())?;
//! board.start().await;
//!
//! let view = board.refresh().await?;
//! for group in view.summaries() {
//!     println!("{} ({} records)", group.title, group.members.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod board;
pub mod config;
pub mod error;
pub mod filter;
pub mod simulate;

pub use board::{Board, BoardView, GroupSummary, NewRecord, RecordUpdate};
pub use config::{BoardConfig, StatusFilter, DEFAULT_APP_ID};
pub use error::{BoardError, ConfigError};
pub use filter::{matches_search, RecordFilter};
pub use simulate::{check_invariants, run_simulator, SimulationReport, SimulatorConfig, Violation};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with board sessions
    pub use crate::{
        Board, BoardConfig, BoardError, BoardView, NewRecord, RecordFilter, RecordUpdate,
        StatusFilter,
    };
    pub use faultboard_graph::{Category, FaultRecord, RecordId};
    pub use faultboard_store::{DocumentStore, InMemoryStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
