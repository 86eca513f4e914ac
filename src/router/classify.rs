//! Coarse statement classification.
//!
//! Deliberately not a SQL parser: a single trimmed statement containing one
//! of six mutating keywords (each with a trailing space) is a mutation,
//! multiple semicolon-separated statements are a batch, and everything else
//! is a row-returning query. The naive token check is a preserved design
//! choice; it decides the access method, not validity — the engine still
//! rejects malformed SQL at execute time.

/// How a statement text should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Single statement, full result set returned in engine order.
    RowQuery,
    /// Single mutating statement, empty result payload.
    Mutation,
    /// Multi-statement script executed as one unit, empty result payload.
    Batch,
}

/// Keywords marking a single statement as mutating. The trailing space is
/// part of the token check.
const MUTATING_KEYWORDS: [&str; 6] = [
    "INSERT ", "UPDATE ", "DELETE ", "CREATE ", "DROP ", "ALTER ",
];

/// Classify a raw SQL text.
///
/// Splits the trimmed text on `;`, discarding empty segments; one segment
/// with a mutating keyword is a [`StatementKind::Mutation`], more than one
/// segment is a [`StatementKind::Batch`], anything else is a
/// [`StatementKind::RowQuery`]. Keyword matching is case-insensitive.
pub fn classify(sql: &str) -> StatementKind {
    let statement_count = sql
        .trim()
        .split(';')
        .filter(|segment| !segment.trim().is_empty())
        .count();
    let upper = sql.to_uppercase();

    if statement_count == 1 && MUTATING_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        StatementKind::Mutation
    } else if statement_count > 1 {
        StatementKind::Batch
    } else {
        StatementKind::RowQuery
    }
}
