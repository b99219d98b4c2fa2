//! The exposed catalog: the filtered, classified view of a database schema.
//!
//! The catalog is built once per session at connect time and is immutable
//! until reconnect. A table appears in it only if it is not blocked by guard
//! policy and declares at least one primary-key column. Every later component
//! treats the catalog as the single source of truth: no field absent from a
//! table's `columns` may ever reach a generated statement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One column of an exposed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Textual SQL type as reported by the database.
    pub data_type: String,
    pub nullable: bool,
    /// True when the column carries a server default or is an identity
    /// column. Such columns never become mandatory create fields.
    pub has_default: bool,
    #[serde(default)]
    pub is_primary_key: bool,
}

/// A secondary index, kept so indexed columns can be offered as filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
}

/// A foreign-key relationship to another table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

/// One table the gateway is willing to operate on, with the four field roles
/// derived at catalog build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposedTable {
    pub name: String,
    /// Primary-key column names, in constraint order. Never empty.
    pub primary_key: Vec<String>,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,

    /// Columns the caller must supply on insert: not nullable, no default,
    /// not part of the primary key.
    pub create_fields: Vec<String>,
    /// Columns an update may touch: everything except the primary key and
    /// the audit columns.
    pub update_fields: Vec<String>,
    /// Columns worth filtering on: primary key, indexed columns, and common
    /// business keys.
    pub filter_fields: Vec<String>,
    /// Default projection: primary key first, then other columns, capped at
    /// eight.
    pub read_fields: Vec<String>,
}

impl ExposedTable {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// The per-session catalog. `exposed_tables` preserves the order the tables
/// were introspected in, which is stable for a given connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposedCatalog {
    pub built_at: DateTime<Utc>,
    pub exposed_tables: Vec<String>,
    pub tables: HashMap<String, ExposedTable>,
}

impl ExposedCatalog {
    pub fn table(&self, name: &str) -> Option<&ExposedTable> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}
