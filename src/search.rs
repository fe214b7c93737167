//! Search/filter engine: single-pass, case-insensitive substring matching.
//!
//! No ranking, no fuzzy matching; results keep input order.

use crate::comps::CompsView;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::record::Record;
use crate::selection::Selection;
use serde_json::json;

/// Lower-cased, trimmed query, or `None` when blank.
fn normalize(query: &str) -> Option<String> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        None
    } else {
        Some(q)
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Attributes a record search looks at.
fn searchable(record: &Record) -> [Option<&str>; 6] {
    [
        Some(record.company_name.as_str()),
        record.company_ticker.as_deref(),
        record.exchange.as_deref(),
        record.ipo_date.as_deref(),
        record.lead_bookrunners.as_deref(),
        record.co_bookrunners.as_deref(),
    ]
}

/// Records whose name, ticker, exchange, IPO date or bookrunner lists
/// contain the query. A blank query matches nothing.
pub fn filter_records<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    let Some(q) = normalize(query) else {
        return Vec::new();
    };
    let hits: Vec<&Record> = records
        .iter()
        .filter(|r| searchable(r).iter().flatten().any(|a| contains_ci(a, &q)))
        .collect();
    log(
        Level::Trace,
        Domain::Search,
        "records",
        obj(&[("query", v_str(&q)), ("hits", json!(hits.len()))]),
    );
    hits
}

/// Field labels containing the query. Unlike record search, a blank query
/// keeps every field visible (the column picker shows all options).
pub fn filter_fields<'a>(fields: &'a [String], query: &str) -> Vec<&'a str> {
    match normalize(query) {
        None => fields.iter().map(String::as_str).collect(),
        Some(q) => fields
            .iter()
            .filter(|f| contains_ci(f, &q))
            .map(String::as_str)
            .collect(),
    }
}

/// Comps views matching on name, description or category.
pub fn filter_views<'a>(views: &'a [CompsView], query: &str) -> Vec<&'a CompsView> {
    let Some(q) = normalize(query) else {
        return Vec::new();
    };
    views
        .iter()
        .filter(|v| {
            contains_ci(&v.name, &q) || contains_ci(&v.description, &q) || contains_ci(&v.category, &q)
        })
        .collect()
}

/// A record search result, flagged when it is already in the selection so
/// a picker can mark it instead of hiding it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub record: &'a Record,
    pub already_selected: bool,
}

pub fn search_hits<'a>(
    records: &'a [Record],
    query: &str,
    selection: &Selection,
) -> Vec<SearchHit<'a>> {
    filter_records(records, query)
        .into_iter()
        .map(|record| SearchHit {
            record,
            already_selected: selection.has_record(record.key()),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

/// Split `text` into matched and unmatched runs of `query`.
pub fn highlight<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    let needle: Vec<char> = query.trim().chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return vec![Segment { text, matched: false }];
    }

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i < text.len() {
        if let Some(len) = match_len_at(&text[i..], &needle) {
            if plain_start < i {
                segments.push(Segment { text: &text[plain_start..i], matched: false });
            }
            segments.push(Segment { text: &text[i..i + len], matched: true });
            i += len;
            plain_start = i;
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    if plain_start < text.len() {
        segments.push(Segment { text: &text[plain_start..], matched: false });
    }
    segments
}

/// Byte length of the prefix of `text` that equals `needle` ignoring case.
fn match_len_at(text: &str, needle: &[char]) -> Option<usize> {
    let mut matched = 0;
    for (offset, c) in text.char_indices() {
        for lc in c.to_lowercase() {
            if needle.get(matched) != Some(&lc) {
                return None;
            }
            matched += 1;
        }
        if matched == needle.len() {
            return Some(offset + c.len_utf8());
        }
    }
    None
}
