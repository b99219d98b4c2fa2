//! Raw Postgres schema introspection.
//!
//! Read-only metadata queries against information_schema and pg_catalog.
//! No data rows are ever read here. Any failure aborts the whole catalog
//! build; a session must never operate on a partially built catalog.

use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use tabletalk_core::{ForeignKeyInfo, GatewayError, IndexInfo};

/// One column as the database reports it, before classification.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub has_default: bool,
}

/// One table's raw metadata: columns in ordinal order, primary key in
/// constraint order, secondary indexes and foreign keys.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<RawColumn>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

fn introspection_error(e: sqlx::Error) -> GatewayError {
    GatewayError::SchemaIntrospection(e.to_string())
}

/// Enumerate base tables in the public schema, in stable name order.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, GatewayError> {
    let rows = sqlx::query(
        r#"
        select table_name
        from information_schema.tables
        where table_type = 'BASE TABLE'
          and table_schema = 'public'
        order by table_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(introspection_error)?;

    Ok(rows
        .into_iter()
        .map(|r| r.get::<String, _>("table_name"))
        .collect())
}

/// Introspect one table: columns, primary key, indexes, foreign keys.
pub async fn introspect_table(pool: &PgPool, table: &str) -> Result<RawTable, GatewayError> {
    let col_rows = sqlx::query(
        r#"
        select column_name, data_type, is_nullable, column_default, is_identity
        from information_schema.columns
        where table_schema = 'public' and table_name = $1
        order by ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(introspection_error)?;

    let mut columns = Vec::new();
    for c in col_rows {
        let name: String = c.get("column_name");
        let data_type: String = c.get("data_type");
        let is_nullable: String = c.get("is_nullable");
        let column_default: Option<String> = c.get("column_default");
        let is_identity: String = c.get("is_identity");

        columns.push(RawColumn {
            name,
            data_type,
            nullable: is_nullable == "YES",
            has_default: column_default.is_some() || is_identity == "YES",
        });
    }

    let pk_rows = sqlx::query(
        r#"
        select kcu.column_name
        from information_schema.table_constraints tc
        join information_schema.key_column_usage kcu
          on tc.constraint_name = kcu.constraint_name
         and tc.table_schema = kcu.table_schema
        where tc.constraint_type = 'PRIMARY KEY'
          and tc.table_schema = 'public'
          and tc.table_name = $1
        order by kcu.ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(introspection_error)?;

    let primary_key: Vec<String> = pk_rows
        .into_iter()
        .map(|r| r.get::<String, _>("column_name"))
        .collect();

    // Secondary indexes only; the primary key is already a filter candidate.
    let idx_rows = sqlx::query(
        r#"
        select i.relname as index_name, a.attname as column_name
        from pg_index ix
        join pg_class t on t.oid = ix.indrelid
        join pg_namespace n on n.oid = t.relnamespace
        join pg_class i on i.oid = ix.indexrelid
        join pg_attribute a on a.attrelid = t.oid and a.attnum = any(ix.indkey)
        where n.nspname = 'public'
          and t.relname = $1
          and not ix.indisprimary
        order by i.relname, a.attnum
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(introspection_error)?;

    let mut idx_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for r in idx_rows {
        let index_name: String = r.get("index_name");
        let column_name: String = r.get("column_name");
        idx_map.entry(index_name).or_default().push(column_name);
    }
    let indexes = idx_map
        .into_iter()
        .map(|(name, columns)| IndexInfo { name, columns })
        .collect();

    // Foreign keys, grouped by constraint name for stability.
    let fk_rows = sqlx::query(
        r#"
        select
          tc.constraint_name,
          kcu.column_name as column_name,
          ccu.table_name as foreign_table_name,
          ccu.column_name as foreign_column_name
        from information_schema.table_constraints tc
        join information_schema.key_column_usage kcu
          on tc.constraint_name = kcu.constraint_name
         and tc.table_schema = kcu.table_schema
        join information_schema.constraint_column_usage ccu
          on ccu.constraint_name = tc.constraint_name
         and ccu.table_schema = tc.table_schema
        where tc.constraint_type = 'FOREIGN KEY'
          and tc.table_schema = 'public'
          and tc.table_name = $1
        order by tc.constraint_name, kcu.ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(introspection_error)?;

    let mut fk_map: BTreeMap<String, (Vec<String>, String, Vec<String>)> = BTreeMap::new();
    for fk in fk_rows {
        let constraint_name: String = fk.get("constraint_name");
        let column_name: String = fk.get("column_name");
        let foreign_table: String = fk.get("foreign_table_name");
        let foreign_column: String = fk.get("foreign_column_name");

        let entry = fk_map
            .entry(constraint_name)
            .or_insert_with(|| (Vec::new(), foreign_table.clone(), Vec::new()));
        entry.0.push(column_name);
        entry.2.push(foreign_column);
    }
    let foreign_keys = fk_map
        .into_values()
        .map(
            |(constrained_columns, referred_table, referred_columns)| ForeignKeyInfo {
                constrained_columns,
                referred_table,
                referred_columns,
            },
        )
        .collect();

    Ok(RawTable {
        name: table.to_string(),
        columns,
        primary_key,
        indexes,
        foreign_keys,
    })
}
