//! Clause extraction
//!
//! Splits a whitespace-normalized SOQL query into its six clause segments
//! using ordered whole-word keyword matching. The scanner is a single
//! linear pass: it assumes the fixed SOQL clause order
//! (SELECT…FROM…WHERE…ORDER BY…LIMIT…OFFSET) and does not understand
//! subqueries. Keywords inside single-quoted string literals are skipped,
//! so a literal like `'choose FROM menu'` does not split the query.

/// Clause keywords in the only order the extractor recognizes.
const CLAUSE_KEYWORDS: [&str; 6] = ["SELECT", "FROM", "WHERE", "ORDER BY", "LIMIT", "OFFSET"];

/// The six-slot intermediate produced by [`extract`]. Absent clauses are
/// empty strings; present clauses are trimmed substrings of the
/// normalized query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseSet {
    pub select: String,
    pub from: String,
    pub where_clause: String,
    pub order_by: String,
    pub limit: String,
    pub offset: String,
}

/// Byte range of a keyword occurrence within a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

/// Collapse runs of whitespace to single spaces and trim the ends, so
/// keyword boundary matching is reliable.
pub fn normalize(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a query into its clause segments.
///
/// Each clause captures the text after its keyword up to the start of the
/// next clause keyword found later in the string, or end-of-string.
pub fn extract(query: &str) -> ClauseSet {
    let normalized = normalize(query);
    let spans: Vec<Option<Span>> = CLAUSE_KEYWORDS
        .iter()
        .map(|kw| keyword_span(&normalized, kw))
        .collect();

    let mut slots: [String; 6] = std::array::from_fn(|_| String::new());
    for (i, slot) in slots.iter_mut().enumerate() {
        let Some(span) = spans[i] else { continue };
        let start = span.end;
        let end = spans[i + 1..]
            .iter()
            .flatten()
            .map(|s| s.start)
            .filter(|&s| s >= start)
            .min()
            .unwrap_or(normalized.len());
        *slot = normalized[start..end].trim().to_string();
    }

    let [select, from, where_clause, order_by, limit, offset] = slots;
    ClauseSet {
        select,
        from,
        where_clause,
        order_by,
        limit,
        offset,
    }
}

/// Find the first whole-word, case-insensitive occurrence of `keyword`
/// outside single-quoted string literals. Multi-word keywords ("ORDER BY")
/// match across exactly one space, which normalization guarantees.
pub(crate) fn keyword_span(query: &str, keyword: &str) -> Option<Span> {
    let bytes = query.as_bytes();
    let kw = keyword.as_bytes();
    if kw.is_empty() || bytes.len() < kw.len() {
        return None;
    }

    let mut in_literal = false;
    for start in 0..=bytes.len() - kw.len() {
        if bytes[start] == b'\'' {
            in_literal = !in_literal;
            continue;
        }
        if in_literal {
            continue;
        }
        if start > 0 && is_word_byte(bytes[start - 1]) {
            continue;
        }
        let end = start + kw.len();
        if !bytes[start..end].eq_ignore_ascii_case(kw) {
            continue;
        }
        if end < bytes.len() && is_word_byte(bytes[end]) {
            continue;
        }
        return Some(Span { start, end });
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
