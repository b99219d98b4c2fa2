//! Proposed plans: structured, untrusted descriptions of a single operation.
//!
//! Plans arrive from an external planner. Nothing in a plan is taken at face
//! value: the executor re-validates every entity and field name against the
//! exposed catalog before a statement is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator for a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "in")]
    In,
}

/// A single predicate on one column.
///
/// `like`/`ilike` treat `value` as an already-formed pattern string; `in`
/// expects a non-empty array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction for a read plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDir {
    #[default]
    Asc,
    Desc,
}

/// A proposed read: projection, predicates, ordering and a row limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPlan {
    pub entity: String,
    /// Explicit projection. When absent the table's default read fields are
    /// used.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_dir: OrderDir,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// A proposed single-row insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    pub entity: String,
    pub fields: serde_json::Map<String, Value>,
}

/// A proposed update. Filters are mandatory; an update with no filters is
/// rejected before any statement is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub entity: String,
    pub fields: serde_json::Map<String, Value>,
    #[serde(default)]
    pub filters: Vec<Filter>,
}
