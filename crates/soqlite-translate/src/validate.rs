//! Structural validation of SOQL queries
//!
//! Rejects queries that cannot possibly translate before any clause
//! extraction happens. Semantic checks (field existence, type
//! compatibility) are deliberately absent: those surface as store-level
//! execution errors.

use thiserror::Error;

use crate::clauses::keyword_span;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    #[error("Query must start with SELECT")]
    MissingSelect,

    #[error("Query must contain FROM clause")]
    MissingFrom,

    #[error("Unbalanced parentheses in query")]
    UnbalancedParens,
}

/// Check query structure. Checks run in a fixed order and the first
/// failure wins.
pub fn validate(query: &str) -> Result<(), ValidateError> {
    let query = query.trim();

    let starts_with_select = query
        .get(..6)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("SELECT"));
    if !starts_with_select {
        return Err(ValidateError::MissingSelect);
    }

    // Whole-word, case-insensitive; occurrences inside string literals do
    // not count, so a FROM that only appears in a literal still fails here
    // instead of mis-splitting later.
    if keyword_span(query, "FROM").is_none() {
        return Err(ValidateError::MissingFrom);
    }

    let open = query.chars().filter(|&c| c == '(').count();
    let close = query.chars().filter(|&c| c == ')').count();
    if open != close {
        return Err(ValidateError::UnbalancedParens);
    }

    Ok(())
}
