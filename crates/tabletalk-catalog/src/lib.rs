//! Catalog builder: turns raw schema metadata into the exposed catalog.
//!
//! A table is exposed iff it is not blocked by guard policy and declares at
//! least one primary-key column. Every exposed column is classified into the
//! four field roles (create/update/filter/read) here, once, at connect time;
//! the executor never re-derives them.

use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tabletalk_core::{ColumnInfo, ExposedCatalog, ExposedTable, GatewayError};

pub mod introspect;
pub mod registry;

pub use introspect::{RawColumn, RawTable};
pub use registry::{ColumnMeta, TableMeta, TableRegistry, TypeTag, reflect_metadata};

/// Column-name fragments that mark a column as a likely business key and
/// therefore a useful filter.
const COMMON_FILTER_KEYS: [&str; 7] = [
    "status",
    "type",
    "category",
    "email",
    "name",
    "date",
    "created_at",
];

/// Default projection width when no explicit column list is given.
const READ_FIELD_CAP: usize = 8;

fn is_audit_column(name: &str) -> bool {
    tabletalk_policy::AUDIT_COLUMNS
        .iter()
        .any(|audit| name.eq_ignore_ascii_case(audit))
}

/// Classify one raw table into an [`ExposedTable`], or `None` when the table
/// has no primary key and must stay out of the catalog.
pub fn classify_table(raw: RawTable) -> Option<ExposedTable> {
    if raw.primary_key.is_empty() {
        return None;
    }

    let is_pk = |name: &str| raw.primary_key.iter().any(|pk| pk == name);

    // Caller must supply these on insert: not nullable, no default, not PK.
    let create_fields: Vec<String> = raw
        .columns
        .iter()
        .filter(|c| !is_pk(&c.name) && !c.nullable && !c.has_default)
        .map(|c| c.name.clone())
        .collect();

    // Updates may touch anything except the primary key and audit trail.
    let update_fields: Vec<String> = raw
        .columns
        .iter()
        .filter(|c| !is_pk(&c.name) && !is_audit_column(&c.name))
        .map(|c| c.name.clone())
        .collect();

    // Filters: primary key, indexed columns, and common business keys.
    let mut filter_fields: Vec<String> = raw.primary_key.clone();
    let mut add_filter = |name: &str| {
        if !filter_fields.iter().any(|f| f == name) {
            filter_fields.push(name.to_string());
        }
    };
    for idx in &raw.indexes {
        for col in &idx.columns {
            add_filter(col);
        }
    }
    for c in &raw.columns {
        let lower = c.name.to_ascii_lowercase();
        if COMMON_FILTER_KEYS.iter().any(|k| lower.contains(k)) {
            add_filter(&c.name);
        }
    }

    // Default projection: primary key first, then remaining columns, capped.
    let mut read_fields: Vec<String> = raw.primary_key.clone();
    for c in &raw.columns {
        if read_fields.len() >= READ_FIELD_CAP {
            break;
        }
        if !read_fields.iter().any(|f| f == &c.name) {
            read_fields.push(c.name.clone());
        }
    }

    let columns = raw
        .columns
        .into_iter()
        .map(|c| {
            let is_primary_key = raw.primary_key.iter().any(|pk| pk == &c.name);
            ColumnInfo {
                name: c.name,
                data_type: c.data_type,
                nullable: c.nullable,
                has_default: c.has_default,
                is_primary_key,
            }
        })
        .collect();

    Some(ExposedTable {
        name: raw.name,
        primary_key: raw.primary_key,
        columns,
        indexes: raw.indexes,
        foreign_keys: raw.foreign_keys,
        create_fields,
        update_fields,
        filter_fields,
        read_fields,
    })
}

/// Assemble a catalog from raw tables: apply the denylist, drop tables
/// without a primary key, classify the rest. Pure; introspection order is
/// preserved.
pub fn assemble_catalog(raw_tables: Vec<RawTable>) -> ExposedCatalog {
    let mut exposed_tables = Vec::new();
    let mut tables = HashMap::new();

    for raw in raw_tables {
        if tabletalk_policy::is_blocked_table(&raw.name) {
            tracing::debug!(table = %raw.name, "skipping blocked table");
            continue;
        }
        let Some(table) = classify_table(raw) else {
            continue;
        };
        exposed_tables.push(table.name.clone());
        tables.insert(table.name.clone(), table);
    }

    ExposedCatalog {
        built_at: Utc::now(),
        exposed_tables,
        tables,
    }
}

/// Build the exposed catalog for a connection. Called once per session; any
/// introspection failure aborts the whole build.
pub async fn build_catalog(pool: &PgPool) -> Result<ExposedCatalog, GatewayError> {
    let names = introspect::list_tables(pool).await?;

    let mut raw_tables = Vec::new();
    for name in names {
        // Blocked tables are skipped before introspection; their metadata is
        // never even read.
        if tabletalk_policy::is_blocked_table(&name) {
            tracing::debug!(table = %name, "skipping blocked table");
            continue;
        }
        raw_tables.push(introspect::introspect_table(pool, &name).await?);
    }

    let catalog = assemble_catalog(raw_tables);
    tracing::info!(
        exposed = catalog.exposed_tables.len(),
        "catalog built"
    );
    Ok(catalog)
}
