//! SQL rewriting
//!
//! Reassembles an extracted [`ClauseSet`] into a dialect-correct SQL
//! statement: identifier sanitization and quoting, paging strategy
//! selection, and null-comparison rewriting. Pure string construction,
//! no I/O; malformed clause contents surface only at execution time.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::clauses::ClauseSet;

/// Target SQL dialect for rewriting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite: double-quoted identifiers, trailing LIMIT/OFFSET paging.
    #[default]
    Sqlite,
    /// SQL Server T-SQL: bracket identifiers, TOP (n) and OFFSET…FETCH.
    SqlServer,
}

impl Dialect {
    fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::Sqlite => format!("\"{ident}\""),
            Dialect::SqlServer => format!("[{ident}]"),
        }
    }
}

/// Which paging construct the rewriter chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingStrategy {
    None,
    RowLimit,
    OffsetFetch,
}

/// A rewritten, executable statement plus a shadow record of the paging
/// strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenStatement {
    pub sql: String,
    pub paging: PagingStrategy,
}

/// Rewrite a clause set into a single SQL statement for `dialect`.
///
/// Never fails: the SELECT field list and WHERE/ORDER BY contents are
/// trusted passthrough text (see the crate-level notes on the assumed
/// trust boundary).
pub fn rewrite(clauses: &ClauseSet, dialect: Dialect) -> RewrittenStatement {
    let has_limit = !clauses.limit.is_empty();
    let has_offset = !clauses.offset.is_empty();

    let paging = if has_offset {
        PagingStrategy::OffsetFetch
    } else if has_limit {
        PagingStrategy::RowLimit
    } else {
        PagingStrategy::None
    };

    let mut sql = String::new();

    // SQL Server expresses a pure row-count limit at the front of the
    // statement; every other combination starts with a plain SELECT.
    match (dialect, paging) {
        (Dialect::SqlServer, PagingStrategy::RowLimit) => {
            let _ = write!(sql, "SELECT TOP ({}) ", clauses.limit);
        }
        _ => sql.push_str("SELECT "),
    }

    sql.push_str(&clauses.select);

    let table = sanitize_identifier(&clauses.from);
    let _ = write!(sql, " FROM {}", dialect.quote_ident(&table));

    if !clauses.where_clause.is_empty() {
        let _ = write!(sql, " WHERE {}", rewrite_null_comparisons(&clauses.where_clause));
    }

    if !clauses.order_by.is_empty() {
        let _ = write!(sql, " ORDER BY {}", clauses.order_by);
    } else if has_offset {
        // Offset paging needs a deterministic ordering to be well-defined;
        // a constant subquery keeps the store's row order untouched.
        sql.push_str(" ORDER BY (SELECT NULL)");
    }

    match (dialect, paging) {
        (Dialect::Sqlite, PagingStrategy::RowLimit) => {
            let _ = write!(sql, " LIMIT {}", clauses.limit);
        }
        (Dialect::Sqlite, PagingStrategy::OffsetFetch) => {
            // SQLite requires LIMIT before OFFSET; -1 means unbounded.
            if has_limit {
                let _ = write!(sql, " LIMIT {} OFFSET {}", clauses.limit, clauses.offset);
            } else {
                let _ = write!(sql, " LIMIT -1 OFFSET {}", clauses.offset);
            }
        }
        (Dialect::SqlServer, PagingStrategy::OffsetFetch) => {
            let _ = write!(sql, " OFFSET {} ROWS", clauses.offset);
            if has_limit {
                let _ = write!(sql, " FETCH NEXT {} ROWS ONLY", clauses.limit);
            }
        }
        _ => {}
    }

    RewrittenStatement { sql, paging }
}

/// Drop every character that is not a letter, digit, or underscore.
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Rewrite SOQL null comparisons into SQL null predicates:
/// `= null` → `IS NULL`, `!= null` / `<> null` → `IS NOT NULL`.
/// Inequality runs first so its `=` is not consumed by the equality rule;
/// the equality pattern captures the preceding character so the `=` of a
/// relational operator (`<=`, `>=`) is never treated as bare equality.
fn rewrite_null_comparisons(where_clause: &str) -> String {
    static NE_NULL: OnceLock<Regex> = OnceLock::new();
    static EQ_NULL: OnceLock<Regex> = OnceLock::new();

    let ne = NE_NULL.get_or_init(|| Regex::new(r"(?i)(?:!=|<>)\s*null\b").unwrap());
    let eq = EQ_NULL.get_or_init(|| Regex::new(r"(?i)([^!<>=])=\s*null\b").unwrap());

    let rewritten = ne.replace_all(where_clause, "IS NOT NULL");
    eq.replace_all(&rewritten, "${1}IS NULL").into_owned()
}
