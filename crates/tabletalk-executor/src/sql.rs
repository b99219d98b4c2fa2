//! Statement assembly: identifier quoting, typed value binding and WHERE
//! clause construction.
//!
//! Identifiers are never interpolated from plan input; they come from the
//! reflected registry and still pass the strict quoting check. Values are
//! always bound as placeholders, typed by the column's tag.

use serde_json::Value;
use sqlx::Arguments;
use sqlx::postgres::PgArguments;
use tabletalk_catalog::{ColumnMeta, TableMeta, TypeTag};
use tabletalk_core::{Filter, FilterOp, GatewayError};

/// Quote an identifier. Only alphanumerics and underscores are accepted;
/// catalog-sourced names always pass.
pub fn quote_ident(ident: &str) -> Result<String, GatewayError> {
    if ident.is_empty()
        || !ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(GatewayError::InvalidIdentifier(ident.to_string()));
    }
    Ok(format!("\"{ident}\""))
}

fn args_add<T>(args: &mut PgArguments, v: T, column: &str) -> Result<(), GatewayError>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| GatewayError::InvalidValue {
        column: column.to_string(),
        reason: e.to_string(),
    })
}

fn invalid(column: &str, reason: &str) -> GatewayError {
    GatewayError::InvalidValue {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

/// Bind one JSON value for a column, converting by type tag.
pub fn bind_value(
    args: &mut PgArguments,
    col: &ColumnMeta,
    v: &Value,
) -> Result<(), GatewayError> {
    let name = col.name.as_str();

    if v.is_null() {
        if !col.nullable {
            return Err(invalid(name, "column is not nullable"));
        }
        return match col.type_tag {
            TypeTag::Uuid => args_add(args, Option::<uuid::Uuid>::None, name),
            TypeTag::Bool => args_add(args, Option::<bool>::None, name),
            TypeTag::Int => args_add(args, Option::<i64>::None, name),
            TypeTag::Json => args_add(args, Option::<sqlx::types::Json<Value>>::None, name),
            _ => args_add(args, Option::<String>::None, name),
        };
    }

    match col.type_tag {
        TypeTag::Uuid => {
            let s = v.as_str().ok_or_else(|| invalid(name, "expected uuid string"))?;
            let id = uuid::Uuid::parse_str(s).map_err(|e| invalid(name, &e.to_string()))?;
            args_add(args, id, name)
        }
        TypeTag::Bool => {
            let b = v.as_bool().ok_or_else(|| invalid(name, "expected boolean"))?;
            args_add(args, b, name)
        }
        TypeTag::Int => {
            let n = v.as_i64().ok_or_else(|| invalid(name, "expected integer"))?;
            args_add(args, n, name)
        }
        TypeTag::Json => args_add(args, sqlx::types::Json(v.clone()), name),
        // Bound as string with an explicit cast in the SQL.
        TypeTag::Numeric => match v {
            Value::Number(n) => args_add(args, n.to_string(), name),
            Value::String(s) => args_add(args, s.clone(), name),
            _ => Err(invalid(name, "expected number or string")),
        },
        TypeTag::Date | TypeTag::Timestamp | TypeTag::Timestamptz => {
            let s = v
                .as_str()
                .ok_or_else(|| invalid(name, "expected date/time string"))?;
            args_add(args, s.to_string(), name)
        }
        TypeTag::Text => {
            let s = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            args_add(args, s, name)
        }
    }
}

/// Render validated filters as WHERE parts, binding their values. `idx` is
/// the next placeholder number and is advanced past everything bound here.
pub fn push_filters(
    parts: &mut Vec<String>,
    args: &mut PgArguments,
    idx: &mut usize,
    table: &TableMeta,
    filters: &[Filter],
) -> Result<(), GatewayError> {
    for f in filters {
        let Some(col) = table.column(&f.field) else {
            // Validation resolved every field already; a miss here means the
            // filter list did not come from validation.
            return Err(GatewayError::UnknownColumn {
                entity: table.name.clone(),
                column: f.field.clone(),
            });
        };
        let ident = quote_ident(&col.name)?;
        let cast = col.type_tag.cast_suffix();

        match f.op {
            FilterOp::Eq
            | FilterOp::Ne
            | FilterOp::Gt
            | FilterOp::Ge
            | FilterOp::Lt
            | FilterOp::Le => {
                let op = match f.op {
                    FilterOp::Eq => "=",
                    FilterOp::Ne => "<>",
                    FilterOp::Gt => ">",
                    FilterOp::Ge => ">=",
                    FilterOp::Lt => "<",
                    FilterOp::Le => "<=",
                    _ => unreachable!(),
                };
                parts.push(format!("{ident} {op} ${idx}{cast}"));
                bind_value(args, col, &f.value)?;
                *idx += 1;
            }
            FilterOp::Like | FilterOp::ILike => {
                let op = if f.op == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let pattern = match &f.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                parts.push(format!("{ident} {op} ${idx}"));
                args_add(args, pattern, &col.name)?;
                *idx += 1;
            }
            FilterOp::In => {
                let items = f
                    .value
                    .as_array()
                    .ok_or_else(|| invalid(&col.name, "'in' expects an array"))?;
                if items.is_empty() {
                    return Err(invalid(&col.name, "'in' expects a non-empty array"));
                }
                let mut placeholders = Vec::with_capacity(items.len());
                for item in items {
                    placeholders.push(format!("${idx}{cast}"));
                    bind_value(args, col, item)?;
                    *idx += 1;
                }
                parts.push(format!("{ident} IN ({})", placeholders.join(", ")));
            }
        }
    }
    Ok(())
}

/// Projection entry: the column rendered as jsonb so values decode uniformly
/// while the selected order is preserved.
pub fn select_expr(column: &str) -> Result<String, GatewayError> {
    let ident = quote_ident(column)?;
    Ok(format!("to_jsonb(t.{ident}) AS {ident}"))
}
