//! Label sets: canonical string form, query parsing and exact matching.

use std::collections::BTreeMap;

pub type Labels = BTreeMap<String, String>;

pub const PAIR_SEPARATOR: char = ':';
pub const LABEL_SEPARATOR: char = ';';

/// Renders a label set as sorted `key:value` pairs joined by `;`.
///
/// Pairs are sorted on their rendered form (byte-wise), not on the key alone,
/// so the result only depends on the set of pairs. An empty set renders as
/// the empty string.
pub fn canonicalize<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut pairs: Vec<String> = labels
        .into_iter()
        .map(|(key, value)| format!("{}{}{}", key, PAIR_SEPARATOR, value))
        .collect();
    pairs.sort_unstable();
    pairs.join(&LABEL_SEPARATOR.to_string())
}

/// Parses a `key:value;key:value` expression.
///
/// Parsing is lenient: blank segments and segments without `:` are skipped
/// instead of failing the whole expression. Only the first `:` splits a
/// segment, so values may contain colons. A repeated key keeps its last value.
pub fn parse_label_expression(expression: &str) -> Labels {
    let mut labels = Labels::new();
    for segment in expression.split(LABEL_SEPARATOR) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.split_once(PAIR_SEPARATOR) {
            Some((key, value)) => {
                labels.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                tracing::debug!("skipping malformed label segment '{}'", segment);
            }
        }
    }
    labels
}

/// Exact match: same cardinality and identical pairs. No subset or superset
/// matching.
pub fn matches_exactly(entries: &Labels, query: &Labels) -> bool {
    entries.len() == query.len()
        && entries
            .iter()
            .all(|(key, value)| query.get(key).is_some_and(|wanted| wanted == value))
}
