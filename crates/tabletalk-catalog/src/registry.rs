//! The reflected table registry: the executor's statement-building
//! vocabulary.
//!
//! Field names in plans resolve against this registry, never against raw
//! strings. A lookup miss is a first-class rejectable case, not a runtime
//! fault.

use std::collections::HashMap;
use tabletalk_core::{ExposedCatalog, ExposedTable};

/// Coarse type tag steering how values are bound and cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Uuid,
    Bool,
    Int,
    Json,
    Numeric,
    Date,
    Timestamp,
    Timestamptz,
    Text,
}

impl TypeTag {
    /// Map an information_schema data type to a tag. Unknown types bind as
    /// text, the same fallback the database applies for literals.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type {
            "uuid" => TypeTag::Uuid,
            "boolean" => TypeTag::Bool,
            "smallint" | "integer" | "bigint" => TypeTag::Int,
            "json" | "jsonb" => TypeTag::Json,
            "numeric" | "decimal" | "real" | "double precision" => TypeTag::Numeric,
            "date" => TypeTag::Date,
            "timestamp without time zone" => TypeTag::Timestamp,
            "timestamp with time zone" => TypeTag::Timestamptz,
            _ => TypeTag::Text,
        }
    }

    /// Explicit cast appended after a placeholder, for types bound as
    /// strings.
    pub fn cast_suffix(self) -> &'static str {
        match self {
            TypeTag::Numeric => "::numeric",
            TypeTag::Date => "::date",
            TypeTag::Timestamp => "::timestamp",
            TypeTag::Timestamptz => "::timestamptz",
            _ => "",
        }
    }
}

/// Typed descriptor for one column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub type_tag: TypeTag,
    pub nullable: bool,
    pub primary_key: bool,
    /// Identity or default-backed primary-key column; a caller may never
    /// supply a value for it.
    pub generated: bool,
}

/// One exposed table bound to its typed columns.
#[derive(Debug, Clone)]
pub struct TableMeta {
    pub name: String,
    /// Columns in introspection order.
    pub columns: Vec<ColumnMeta>,
    pub primary_key: Vec<String>,
    /// Default projection carried over from the catalog.
    pub read_fields: Vec<String>,
}

impl TableMeta {
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// All exposed tables, keyed by name. Built once per session alongside the
/// catalog and immutable for the session's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, TableMeta>,
}

impl TableRegistry {
    pub fn table(&self, entity: &str) -> Option<&TableMeta> {
        self.tables.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn reflect_table(table: &ExposedTable) -> TableMeta {
    let columns = table
        .columns
        .iter()
        .map(|c| ColumnMeta {
            name: c.name.clone(),
            type_tag: TypeTag::from_data_type(&c.data_type),
            nullable: c.nullable,
            primary_key: c.is_primary_key,
            generated: c.is_primary_key && c.has_default,
        })
        .collect();

    TableMeta {
        name: table.name.clone(),
        columns,
        primary_key: table.primary_key.clone(),
        read_fields: table.read_fields.clone(),
    }
}

/// Bind every exposed table to a typed metadata handle.
pub fn reflect_metadata(catalog: &ExposedCatalog) -> TableRegistry {
    let tables = catalog
        .tables
        .values()
        .map(|t| (t.name.clone(), reflect_table(t)))
        .collect();
    TableRegistry { tables }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_map_the_common_pg_types() {
        assert_eq!(TypeTag::from_data_type("uuid"), TypeTag::Uuid);
        assert_eq!(TypeTag::from_data_type("integer"), TypeTag::Int);
        assert_eq!(TypeTag::from_data_type("bigint"), TypeTag::Int);
        assert_eq!(TypeTag::from_data_type("numeric"), TypeTag::Numeric);
        assert_eq!(TypeTag::from_data_type("jsonb"), TypeTag::Json);
        assert_eq!(
            TypeTag::from_data_type("timestamp with time zone"),
            TypeTag::Timestamptz
        );
        assert_eq!(TypeTag::from_data_type("character varying"), TypeTag::Text);
    }

    #[test]
    fn only_string_bound_types_get_casts() {
        assert_eq!(TypeTag::Numeric.cast_suffix(), "::numeric");
        assert_eq!(TypeTag::Timestamptz.cast_suffix(), "::timestamptz");
        assert_eq!(TypeTag::Text.cast_suffix(), "");
        assert_eq!(TypeTag::Int.cast_suffix(), "");
    }
}
