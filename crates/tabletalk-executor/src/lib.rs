//! The guarded executor: validates a proposed plan against the reflected
//! registry and guard policy, then executes exactly the validated operation.
//!
//! Every entry point re-checks the entity and every field name against the
//! catalog-derived registry; nothing supplied by a planner reaches a
//! statement unverified. Reads run as a single bounded SELECT. Creates and
//! updates each run in their own transaction, and an update whose affected
//! row count exceeds the policy ceiling is rolled back after execution. The
//! database is the only oracle for how many rows a loose filter touches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, PgPool, Row};
use tabletalk_catalog::{TableMeta, TableRegistry};
use tabletalk_core::{CreatePlan, Filter, GatewayError, OrderDir, ReadPlan, UpdatePlan};
use tabletalk_policy::MAX_MUTATION_ROWS;

pub mod session;
pub mod sql;
pub mod validate;

pub use session::{Session, SessionRegistry};

use validate::{
    validate_create, validate_mutation_filters, validate_read, validate_update_fields,
};

/// One result row: column name to value, in selected column order.
pub type RowMap = serde_json::Map<String, Value>;

/// Outcome of a guarded insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOutcome {
    pub inserted: u64,
    /// The field set actually written, so confirmations need no re-read.
    pub fields: Vec<String>,
}

/// Outcome of a guarded update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub updated_count: u64,
    pub fields: Vec<String>,
    pub filters: Vec<Filter>,
}

/// Executes validated plans against one session's pool and registry.
pub struct GuardedExecutor<'a> {
    pool: &'a PgPool,
    registry: &'a TableRegistry,
}

impl<'a> GuardedExecutor<'a> {
    pub fn new(pool: &'a PgPool, registry: &'a TableRegistry) -> Self {
        Self { pool, registry }
    }

    fn table(&self, entity: &str) -> Result<&'a TableMeta, GatewayError> {
        self.registry
            .table(entity)
            .ok_or_else(|| GatewayError::UnknownEntity(entity.to_string()))
    }

    /// Execute a read plan as a single bounded SELECT.
    pub async fn read(&self, plan: &ReadPlan) -> Result<Vec<RowMap>, GatewayError> {
        let table = self.table(&plan.entity)?;
        let v = validate_read(table, plan);

        let mut select_list = Vec::with_capacity(v.columns.len());
        for c in &v.columns {
            select_list.push(sql::select_expr(c)?);
        }

        let mut where_parts = Vec::new();
        let mut args = PgArguments::default();
        let mut idx = 1usize;
        sql::push_filters(&mut where_parts, &mut args, &mut idx, table, &v.filters)?;

        let mut stmt = format!(
            "SELECT {} FROM {} AS t",
            select_list.join(", "),
            sql::quote_ident(&table.name)?
        );
        if !where_parts.is_empty() {
            stmt.push_str(" WHERE ");
            stmt.push_str(&where_parts.join(" AND "));
        }
        if let Some((col, dir)) = &v.order {
            let dir = match dir {
                OrderDir::Asc => "ASC",
                OrderDir::Desc => "DESC",
            };
            stmt.push_str(&format!(" ORDER BY {} {}", sql::quote_ident(col)?, dir));
        }
        args.add(v.limit).map_err(|e| GatewayError::InvalidValue {
            column: "limit".to_string(),
            reason: e.to_string(),
        })?;
        stmt.push_str(&format!(" LIMIT ${idx}"));

        tracing::debug!(entity = %plan.entity, sql = %stmt, "read");
        let rows = sqlx::query_with(&stmt, args).fetch_all(self.pool).await?;

        rows.iter()
            .map(|row| {
                let mut out = RowMap::new();
                for (i, name) in v.columns.iter().enumerate() {
                    let value: Option<Value> = row.try_get(i)?;
                    out.insert(name.clone(), value.unwrap_or(Value::Null));
                }
                Ok(out)
            })
            .collect()
    }

    /// Execute a single-row insert of exactly the validated field set.
    pub async fn create(&self, plan: &CreatePlan) -> Result<CreateOutcome, GatewayError> {
        let table = self.table(&plan.entity)?;
        let fields = validate_create(table, plan)?;

        let mut columns = Vec::with_capacity(fields.len());
        let mut placeholders = Vec::with_capacity(fields.len());
        let mut args = PgArguments::default();

        for (idx, (name, value)) in fields.iter().enumerate() {
            let Some(col) = table.column(name) else {
                return Err(GatewayError::UnknownColumn {
                    entity: table.name.clone(),
                    column: name.clone(),
                });
            };
            columns.push(sql::quote_ident(name)?);
            placeholders.push(format!("${}{}", idx + 1, col.type_tag.cast_suffix()));
            sql::bind_value(&mut args, col, value)?;
        }

        let stmt = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            sql::quote_ident(&table.name)?,
            columns.join(", "),
            placeholders.join(", ")
        );

        tracing::debug!(entity = %plan.entity, sql = %stmt, "create");
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query_with(&stmt, args).execute(&mut *tx).await?;
        tx.commit().await?;

        let fields = fields.into_iter().map(|(name, _)| name).collect();
        Ok(CreateOutcome {
            inserted: done.rows_affected(),
            fields,
        })
    }

    /// Show the rows an update would touch: all columns, the update's own
    /// filters, capped at the mutation row ceiling. Previewing without a
    /// filter is disallowed, matching the update rule itself.
    pub async fn preview_update(&self, plan: &UpdatePlan) -> Result<Vec<RowMap>, GatewayError> {
        let table = self.table(&plan.entity)?;
        let filters = validate_mutation_filters(table, &plan.filters)?;

        let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        let mut select_list = Vec::with_capacity(columns.len());
        for c in &columns {
            select_list.push(sql::select_expr(c)?);
        }

        let mut where_parts = Vec::new();
        let mut args = PgArguments::default();
        let mut idx = 1usize;
        sql::push_filters(&mut where_parts, &mut args, &mut idx, table, &filters)?;

        args.add(MAX_MUTATION_ROWS as i64)
            .map_err(|e| GatewayError::InvalidValue {
                column: "limit".to_string(),
                reason: e.to_string(),
            })?;
        let stmt = format!(
            "SELECT {} FROM {} AS t WHERE {} LIMIT ${idx}",
            select_list.join(", "),
            sql::quote_ident(&table.name)?,
            where_parts.join(" AND ")
        );

        tracing::debug!(entity = %plan.entity, sql = %stmt, "preview update");
        let rows = sqlx::query_with(&stmt, args).fetch_all(self.pool).await?;

        rows.iter()
            .map(|row| {
                let mut out = RowMap::new();
                for (i, name) in columns.iter().enumerate() {
                    let value: Option<Value> = row.try_get(i)?;
                    out.insert(name.clone(), value.unwrap_or(Value::Null));
                }
                Ok(out)
            })
            .collect()
    }

    /// Execute an update inside a transaction and enforce the row ceiling on
    /// the database's own affected count: over the ceiling, the statement is
    /// rolled back, never committed.
    pub async fn update(&self, plan: &UpdatePlan) -> Result<UpdateOutcome, GatewayError> {
        let table = self.table(&plan.entity)?;
        let filters = validate_mutation_filters(table, &plan.filters)?;
        let fields = validate_update_fields(table, plan)?;

        let mut set_parts = Vec::with_capacity(fields.len());
        let mut args = PgArguments::default();
        let mut idx = 1usize;

        for (name, value) in &fields {
            let Some(col) = table.column(name) else {
                return Err(GatewayError::UnknownColumn {
                    entity: table.name.clone(),
                    column: name.clone(),
                });
            };
            set_parts.push(format!(
                "{} = ${idx}{}",
                sql::quote_ident(name)?,
                col.type_tag.cast_suffix()
            ));
            sql::bind_value(&mut args, col, value)?;
            idx += 1;
        }

        let mut where_parts = Vec::new();
        sql::push_filters(&mut where_parts, &mut args, &mut idx, table, &filters)?;

        let stmt = format!(
            "UPDATE {} SET {} WHERE {}",
            sql::quote_ident(&table.name)?,
            set_parts.join(", "),
            where_parts.join(" AND ")
        );

        tracing::debug!(entity = %plan.entity, sql = %stmt, "update");
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query_with(&stmt, args).execute(&mut *tx).await?;
        let affected = done.rows_affected();

        if affected > MAX_MUTATION_ROWS {
            tx.rollback().await?;
            tracing::warn!(
                entity = %plan.entity,
                attempted = affected,
                max = MAX_MUTATION_ROWS,
                "update rolled back: row ceiling exceeded"
            );
            return Err(GatewayError::TooManyRowsAffected {
                attempted: affected,
                max: MAX_MUTATION_ROWS,
            });
        }
        tx.commit().await?;

        let fields = fields.into_iter().map(|(name, _)| name).collect();
        Ok(UpdateOutcome {
            updated_count: affected,
            fields,
            filters,
        })
    }
}
