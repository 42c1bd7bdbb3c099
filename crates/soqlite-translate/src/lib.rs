//! SOQL → SQL translation core
//!
//! Turns a constrained SOQL query (SELECT/FROM/WHERE/ORDER BY/LIMIT/OFFSET)
//! into a statement for a target SQL dialect. The pipeline is
//! validate → normalize → extract clauses → rewrite; only the rewrite step
//! knows anything about the dialect, and nothing here performs I/O.

pub mod clauses;
pub mod rewrite;
pub mod validate;

pub use clauses::{extract, normalize, ClauseSet};
pub use rewrite::{rewrite, Dialect, PagingStrategy, RewrittenStatement};
pub use validate::{validate, ValidateError};

/// Validate and translate a SOQL query in one step.
///
/// Rewriting cannot fail on a query that passed validation, so the only
/// error surface here is structural validation.
pub fn translate(soql: &str, dialect: Dialect) -> Result<RewrittenStatement, ValidateError> {
    validate(soql)?;
    let clauses = extract(soql);
    let statement = rewrite(&clauses, dialect);
    tracing::debug!(sql = %statement.sql, "translated SOQL query");
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_end_to_end() {
        let stmt = translate(
            "SELECT Id, Name FROM Account WHERE Industry = 'Tech' ORDER BY Name LIMIT 10",
            Dialect::Sqlite,
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT Id, Name FROM \"Account\" WHERE Industry = 'Tech' ORDER BY Name LIMIT 10"
        );
        assert_eq!(stmt.paging, PagingStrategy::RowLimit);
    }

    #[test]
    fn translate_rejects_invalid_query() {
        let err = translate("DELETE FROM Account", Dialect::Sqlite).unwrap_err();
        assert_eq!(err, ValidateError::MissingSelect);
    }
}
