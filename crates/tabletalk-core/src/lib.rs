//! Shared types for the Tabletalk gateway core.
//!
//! Tabletalk lets an external planner (LLM-backed or rule-based) query and
//! mutate a relational database through structured plans instead of raw SQL.
//! This crate holds the vocabulary the other crates agree on:
//!
//! - [`plan`]: untrusted read/create/update plans as produced by a planner
//! - [`catalog`]: the exposed catalog, the filtered and classified view of a
//!   database schema that the executor treats as ground truth
//! - [`error`]: the gateway error taxonomy, split between planner faults and
//!   retryable infrastructure faults

pub mod catalog;
pub mod error;
pub mod plan;

pub use catalog::{ColumnInfo, ExposedCatalog, ExposedTable, ForeignKeyInfo, IndexInfo};
pub use error::{GatewayError, Result};
pub use plan::{CreatePlan, Filter, FilterOp, OrderDir, ReadPlan, UpdatePlan};
