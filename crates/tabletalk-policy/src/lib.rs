//! Tabletalk guard policy.
//!
//! Central, stateless safety rules consulted by every other component. These
//! are independent of caller intent and cannot be bypassed by plan content:
//! the catalog builder applies the table denylist, the executor applies the
//! limit clamp, the mandatory-filter rule and the mutation row ceiling.

use regex::RegexSet;
use std::sync::LazyLock;
use tabletalk_core::{Filter, GatewayError};

/// Hard cap on rows returned by any read.
pub const MAX_SELECT_ROWS: i64 = 100;

/// Row limit applied when a plan supplies none.
pub const DEFAULT_LIMIT: i64 = 25;

/// An update whose affected-row count exceeds this is rolled back.
pub const MAX_MUTATION_ROWS: u64 = 100;

/// Audit-trail columns excluded from update targets.
pub const AUDIT_COLUMNS: [&str; 4] = ["created_at", "created_by", "updated_at", "updated_by"];

/// Default-deny patterns for sensitive and system tables: migration-tracking
/// tables, anything credential-shaped, `auth_`-prefixed tables, and the
/// `user`/`users` table itself (usually PII). Hard-coded on purpose; a
/// deployment wanting more exposure has to wrap this, not configure it away.
static BLOCKED_TABLES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)^(alembic_version|flyway_schema_history|django_migrations)$",
        r"(?i)password|secret|token|credential|session",
        r"(?i)^auth_",
        r"(?i)^users?$",
    ])
    .expect("blocked-table patterns are valid")
});

/// True if the table name matches the denylist, case-insensitively.
pub fn is_blocked_table(name: &str) -> bool {
    BLOCKED_TABLES.is_match(name)
}

/// Bound a requested row limit. Absent or zero means [`DEFAULT_LIMIT`];
/// anything else is clamped into `1..=MAX_SELECT_ROWS`.
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    match requested {
        Some(n) if n != 0 => n.clamp(1, MAX_SELECT_ROWS),
        _ => DEFAULT_LIMIT,
    }
}

/// No filter, no mutation. Enforced before any update-shaped statement (or
/// its preview) is built.
pub fn require_mutation_filters(filters: &[Filter]) -> Result<(), GatewayError> {
    if filters.is_empty() {
        return Err(GatewayError::MissingFilters);
    }
    Ok(())
}

/// True for columns the system owns: the surrogate id and the audit trail.
/// These are never valid update targets.
pub fn is_system_column(name: &str) -> bool {
    name.eq_ignore_ascii_case("id")
        || AUDIT_COLUMNS
            .iter()
            .any(|audit| name.eq_ignore_ascii_case(audit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabletalk_core::FilterOp;

    #[test]
    fn migration_tables_are_blocked_exactly() {
        assert!(is_blocked_table("alembic_version"));
        assert!(is_blocked_table("flyway_schema_history"));
        assert!(is_blocked_table("django_migrations"));
        // Not a prefix rule
        assert!(!is_blocked_table("alembic_version_backup"));
    }

    #[test]
    fn credential_shaped_names_are_blocked_anywhere() {
        assert!(is_blocked_table("password_resets"));
        assert!(is_blocked_table("api_tokens"));
        assert!(is_blocked_table("client_secrets"));
        assert!(is_blocked_table("oauth_credentials"));
        assert!(is_blocked_table("user_sessions"));
    }

    #[test]
    fn auth_prefix_and_user_tables_are_blocked() {
        assert!(is_blocked_table("auth_group"));
        assert!(is_blocked_table("user"));
        assert!(is_blocked_table("users"));
        // Prefix/suffix variants of user are fine
        assert!(!is_blocked_table("user_preferences"));
        assert!(!is_blocked_table("users_test"));
    }

    #[test]
    fn blocking_is_case_insensitive() {
        assert!(is_blocked_table("Users"));
        assert!(is_blocked_table("API_TOKENS"));
        assert!(is_blocked_table("Auth_Group"));
    }

    #[test]
    fn ordinary_tables_pass() {
        for name in ["orders", "customers", "invoices", "products", "events"] {
            assert!(!is_blocked_table(name), "{name} should not be blocked");
        }
    }

    #[test]
    fn clamp_limit_bounds_every_read() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(1)), 1);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(100)), 100);
        assert_eq!(clamp_limit(Some(10_000)), MAX_SELECT_ROWS);
    }

    #[test]
    fn empty_filters_fail_mutations() {
        let err = require_mutation_filters(&[]).unwrap_err();
        assert!(matches!(err, GatewayError::MissingFilters));

        let filters = vec![Filter {
            field: "id".into(),
            op: FilterOp::Eq,
            value: json!(1),
        }];
        assert!(require_mutation_filters(&filters).is_ok());
    }

    #[test]
    fn system_columns_cover_id_and_audit_trail() {
        for name in ["id", "ID", "created_at", "Updated_At", "created_by", "updated_by"] {
            assert!(is_system_column(name), "{name} should be a system column");
        }
        assert!(!is_system_column("status"));
        assert!(!is_system_column("customer_id"));
    }
}
