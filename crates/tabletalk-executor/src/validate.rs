//! Pure plan validation against the reflected registry.
//!
//! Reads and mutations are deliberately asymmetric: a read silently drops
//! filter fields that are not real columns (planner noise is cheap on a
//! bounded read), while a mutation hard-fails on anything it cannot resolve
//! (a loosened WHERE on an update is not cheap). Nothing in this module
//! touches the database.

use serde_json::Value;
use tabletalk_catalog::TableMeta;
use tabletalk_core::{CreatePlan, Filter, FilterOp, GatewayError, OrderDir, ReadPlan, UpdatePlan};

/// A read plan resolved against the catalog, ready to render.
#[derive(Debug, Clone)]
pub struct ValidatedRead {
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<(String, OrderDir)>,
    pub limit: i64,
}

fn in_filter_is_usable(f: &Filter) -> bool {
    f.op != FilterOp::In || f.value.as_array().is_some_and(|a| !a.is_empty())
}

/// Resolve a read plan. Unknown columns and unusable filters are dropped,
/// never fatal; the limit is always clamped.
pub fn validate_read(table: &TableMeta, plan: &ReadPlan) -> ValidatedRead {
    let columns = match &plan.columns {
        Some(requested) => {
            let kept: Vec<String> = requested
                .iter()
                .filter(|c| table.has_column(c))
                .cloned()
                .collect();
            if kept.is_empty() {
                // Nothing the planner asked for exists; fall back to the
                // first columns rather than failing the read.
                table.columns.iter().take(8).map(|c| c.name.clone()).collect()
            } else {
                kept
            }
        }
        None => table.read_fields.clone(),
    };

    let filters: Vec<Filter> = plan
        .filters
        .iter()
        .filter(|f| table.has_column(&f.field) && in_filter_is_usable(f))
        .cloned()
        .collect();

    let order = plan
        .order_by
        .as_ref()
        .filter(|col| table.has_column(col))
        .map(|col| (col.clone(), plan.order_dir));

    ValidatedRead {
        columns,
        filters,
        order,
        limit: tabletalk_policy::clamp_limit(plan.limit),
    }
}

/// Resolve a create plan's field set: unknown columns and auto-generated
/// primary-key columns are dropped; an empty remainder is fatal.
pub fn validate_create(
    table: &TableMeta,
    plan: &CreatePlan,
) -> Result<Vec<(String, Value)>, GatewayError> {
    let fields: Vec<(String, Value)> = plan
        .fields
        .iter()
        .filter(|(name, _)| {
            table
                .column(name)
                .is_some_and(|col| !(col.primary_key && col.generated))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if fields.is_empty() {
        return Err(GatewayError::NoValidFields {
            entity: table.name.clone(),
        });
    }
    Ok(fields)
}

/// Resolve an update plan's field set. Primary keys are immutable through
/// this path and system columns are never valid targets; both are dropped.
/// An empty remainder is fatal.
pub fn validate_update_fields(
    table: &TableMeta,
    plan: &UpdatePlan,
) -> Result<Vec<(String, Value)>, GatewayError> {
    let fields: Vec<(String, Value)> = plan
        .fields
        .iter()
        .filter(|(name, _)| {
            table.column(name).is_some_and(|col| !col.primary_key)
                && !tabletalk_policy::is_system_column(name)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if fields.is_empty() {
        return Err(GatewayError::NoValidFields {
            entity: table.name.clone(),
        });
    }
    Ok(fields)
}

/// Resolve mutation filters: none is fatal, and every field must be a real
/// column. No silent dropping here.
pub fn validate_mutation_filters(
    table: &TableMeta,
    filters: &[Filter],
) -> Result<Vec<Filter>, GatewayError> {
    tabletalk_policy::require_mutation_filters(filters)?;

    for f in filters {
        if !table.has_column(&f.field) {
            return Err(GatewayError::UnknownColumn {
                entity: table.name.clone(),
                column: f.field.clone(),
            });
        }
        if f.op == FilterOp::In && !in_filter_is_usable(f) {
            return Err(GatewayError::InvalidValue {
                column: f.field.clone(),
                reason: "'in' expects a non-empty array".to_string(),
            });
        }
    }
    Ok(filters.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabletalk_catalog::{RawColumn, RawTable, assemble_catalog, reflect_metadata};

    fn meta() -> TableMeta {
        let raw = RawTable {
            name: "accounts".to_string(),
            columns: vec![
                RawColumn {
                    name: "id".into(),
                    data_type: "integer".into(),
                    nullable: false,
                    has_default: true,
                },
                RawColumn {
                    name: "name".into(),
                    data_type: "character varying".into(),
                    nullable: false,
                    has_default: false,
                },
                RawColumn {
                    name: "balance".into(),
                    data_type: "integer".into(),
                    nullable: false,
                    has_default: true,
                },
                RawColumn {
                    name: "status".into(),
                    data_type: "character varying".into(),
                    nullable: true,
                    has_default: false,
                },
                RawColumn {
                    name: "created_at".into(),
                    data_type: "timestamp with time zone".into(),
                    nullable: false,
                    has_default: true,
                },
            ],
            primary_key: vec!["id".into()],
            indexes: vec![],
            foreign_keys: vec![],
        };
        let catalog = assemble_catalog(vec![raw]);
        let registry = reflect_metadata(&catalog);
        registry.table("accounts").unwrap().clone()
    }

    fn filter(field: &str, op: FilterOp, value: Value) -> Filter {
        Filter {
            field: field.into(),
            op,
            value,
        }
    }

    #[test]
    fn read_defaults_to_read_fields() {
        let table = meta();
        let plan = ReadPlan {
            entity: "accounts".into(),
            columns: None,
            filters: vec![],
            order_by: None,
            order_dir: OrderDir::Asc,
            limit: None,
        };
        let v = validate_read(&table, &plan);
        assert_eq!(v.columns[0], "id");
        assert_eq!(v.limit, tabletalk_policy::DEFAULT_LIMIT);
    }

    #[test]
    fn read_keeps_only_real_columns_and_falls_back_when_none_survive() {
        let table = meta();
        let mut plan = ReadPlan {
            entity: "accounts".into(),
            columns: Some(vec!["balance".into(), "ghost".into()]),
            filters: vec![],
            order_by: None,
            order_dir: OrderDir::Asc,
            limit: None,
        };
        assert_eq!(validate_read(&table, &plan).columns, vec!["balance"]);

        plan.columns = Some(vec!["ghost".into(), "phantom".into()]);
        let v = validate_read(&table, &plan);
        // Fallback: first table columns, not an error.
        assert_eq!(v.columns[0], "id");
        assert!(v.columns.len() <= 8);
    }

    #[test]
    fn read_silently_drops_unknown_filter_fields() {
        let table = meta();
        let plan = ReadPlan {
            entity: "accounts".into(),
            columns: None,
            filters: vec![
                filter("status", FilterOp::Eq, json!("active")),
                filter("ghost", FilterOp::Eq, json!(1)),
                filter("id", FilterOp::In, json!([])),
            ],
            order_by: Some("ghost".into()),
            order_dir: OrderDir::Desc,
            limit: Some(10_000),
        };
        let v = validate_read(&table, &plan);
        assert_eq!(v.filters.len(), 1);
        assert_eq!(v.filters[0].field, "status");
        // Unknown order column is dropped too.
        assert!(v.order.is_none());
        assert_eq!(v.limit, tabletalk_policy::MAX_SELECT_ROWS);
    }

    #[test]
    fn read_orders_only_on_real_columns() {
        let table = meta();
        let plan = ReadPlan {
            entity: "accounts".into(),
            columns: None,
            filters: vec![],
            order_by: Some("balance".into()),
            order_dir: OrderDir::Desc,
            limit: Some(5),
        };
        let v = validate_read(&table, &plan);
        assert_eq!(v.order, Some(("balance".into(), OrderDir::Desc)));
        assert_eq!(v.limit, 5);
    }

    #[test]
    fn create_drops_generated_pk_but_keeps_the_rest() {
        // A supplied autoincrement id must never reach the insert.
        let table = meta();
        let plan = CreatePlan {
            entity: "accounts".into(),
            fields: serde_json::from_value(json!({ "id": 5, "name": "x" })).unwrap(),
        };
        let fields = validate_create(&table, &plan).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "name");
    }

    #[test]
    fn create_with_nothing_valid_fails() {
        let table = meta();
        let plan = CreatePlan {
            entity: "accounts".into(),
            fields: serde_json::from_value(json!({ "id": 5, "ghost": 1 })).unwrap(),
        };
        let err = validate_create(&table, &plan).unwrap_err();
        assert!(matches!(err, GatewayError::NoValidFields { .. }));
    }

    #[test]
    fn update_without_filters_is_rejected_before_anything_else() {
        let table = meta();
        let plan = UpdatePlan {
            entity: "accounts".into(),
            fields: serde_json::from_value(json!({ "balance": 100 })).unwrap(),
            filters: vec![],
        };
        let err = validate_mutation_filters(&table, &plan.filters).unwrap_err();
        assert!(matches!(err, GatewayError::MissingFilters));
    }

    #[test]
    fn update_fields_exclude_pk_and_system_columns() {
        let table = meta();
        let plan = UpdatePlan {
            entity: "accounts".into(),
            fields: serde_json::from_value(
                json!({ "id": 9, "balance": 100, "created_at": "2024-01-01" }),
            )
            .unwrap(),
            filters: vec![filter("id", FilterOp::Eq, json!(1))],
        };
        let fields = validate_update_fields(&table, &plan).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "balance");
    }

    #[test]
    fn update_with_only_disallowed_fields_fails() {
        let table = meta();
        let plan = UpdatePlan {
            entity: "accounts".into(),
            fields: serde_json::from_value(json!({ "id": 9, "ghost": 1 })).unwrap(),
            filters: vec![filter("id", FilterOp::Eq, json!(1))],
        };
        let err = validate_update_fields(&table, &plan).unwrap_err();
        assert!(matches!(err, GatewayError::NoValidFields { .. }));
    }

    #[test]
    fn mutation_filters_are_strict_where_reads_are_lenient() {
        let table = meta();
        let unknown = vec![filter("ghost", FilterOp::Eq, json!(1))];
        let err = validate_mutation_filters(&table, &unknown).unwrap_err();
        assert!(matches!(err, GatewayError::UnknownColumn { .. }));

        let empty_in = vec![filter("id", FilterOp::In, json!([]))];
        let err = validate_mutation_filters(&table, &empty_in).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidValue { .. }));

        let good = vec![filter("id", FilterOp::In, json!([1, 2]))];
        assert_eq!(validate_mutation_filters(&table, &good).unwrap().len(), 1);
    }
}
