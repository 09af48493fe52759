//! Closure-table tree repository for SeaORM.
//!
//! A tree is stored as a parent pointer on the node table plus a closure
//! relation holding one `(ancestor, descendant, depth)` row for every
//! ancestor pair, including a depth-0 self edge per node. Reads of arbitrary
//! shape (roots, children, counts, paths, whole subtrees) become plain joins
//! against the closure relation; writes pay for it by touching one row per
//! affected ancestor pair. The crate covers the read surface, node removal
//! with child reparenting, and assembly of flat subtree rows into a nested
//! tree. Edge rewrites delegate to an injected maintenance strategy; the
//! implementation targets PostgreSQL.

pub mod assembly;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod lock;
mod removal;
pub mod repository;
pub mod strategy;
pub mod traits;

pub mod prelude {
    //! Convenient re-exports for consumers.
    pub use crate::assembly::{build_tree_array, TreeNode};
    pub use crate::config::{AdvisoryLockStrategy, ClosureTableConfig, ClosureTableOptions};
    pub use crate::hierarchy::{HierarchyOptions, HierarchyRow};
    pub use crate::repository::ClosureTableRepository;
    pub use crate::strategy::ClosureMaintenance;
    pub use crate::traits::ClosureTableModel;
}

pub use closure_table_macros::ClosureTableModel as ClosureTableModelDerive;
#[doc(hidden)]
pub use closure_table_macros::ClosureTableModel;
pub use assembly::{build_tree_array, TreeNode};
pub use config::{AdvisoryLockKey, AdvisoryLockStrategy, ClosureTableConfig, ClosureTableOptions};
pub use error::ClosureTableError;
pub use hierarchy::{HierarchyOptions, HierarchyRow};
pub use repository::ClosureTableRepository;
pub use strategy::{ClosureMaintenance, SqlClosureMaintenance};
pub use traits::ClosureTableModel;
