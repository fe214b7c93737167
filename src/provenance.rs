//! Provenance: source citations backing individual cell values, and the
//! panel that shows them for one (record, field) pair at a time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::record::Record;

/// Citation name for values read off the final prospectus.
pub const FILING_SOURCE_NAME: &str = "424B4 Filing";

/// The filing citation for a record value: dated the IPO date and linked
/// to the filing when one is known.
pub fn filing_citation(record: &Record, value: &str) -> Citation {
    Citation {
        source_type: SourceType::Filing,
        name: FILING_SOURCE_NAME.to_string(),
        value: value.to_string(),
        date: record.ipo_date.clone().unwrap_or_default(),
        url: record.filing_url.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Filing,
    News,
    Website,
    Database,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Filing => "filing",
            SourceType::News => "news",
            SourceType::Website => "website",
            SourceType::Database => "database",
        }
    }
}

/// One external reference for a value. `value` is what that source
/// reported and may disagree with the canonical cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub name: String,
    pub value: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    /// "Mar 29, 2024" for ISO dates; anything else is shown as stored.
    pub fn display_date(&self) -> String {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|_| self.date.clone())
    }
}

/// Canonical value plus its citations, as registered for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub record: String,
    pub field: String,
    pub value: String,
    pub citations: Vec<Citation>,
}

impl Inspection {
    /// An empty citation list is a valid "no sources" state.
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn summary(&self) -> String {
        match self.citations.len() {
            1 => "1 source found".to_string(),
            n => format!("{} sources found", n),
        }
    }

    /// Distinct source types in first-seen order.
    pub fn source_types(&self) -> Vec<SourceType> {
        let mut out = Vec::new();
        for c in &self.citations {
            if !out.contains(&c.source_type) {
                out.push(c.source_type);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex {
    entries: HashMap<(String, String), (String, Vec<Citation>)>,
}

impl ProvenanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every non-empty record value, each citing the filing.
    /// Only the first record per key is used, matching `RecordStore::get`.
    pub fn from_records(records: &[Record]) -> Self {
        let mut index = Self::new();
        let mut seen = HashSet::new();
        for record in records {
            if !seen.insert(record.key()) {
                continue;
            }
            for field in record.field_names() {
                let Some(value) = record.get(field).filter(|v| !v.is_empty()) else {
                    continue;
                };
                index.register(record.key(), field, value, vec![filing_citation(record, value)]);
            }
        }
        index
    }

    /// Overlay another index; its entries win.
    pub fn merge(&mut self, other: ProvenanceIndex) {
        self.entries.extend(other.entries);
    }

    /// Later registrations for the same pair replace earlier ones.
    pub fn register(&mut self, record: &str, field: &str, value: &str, citations: Vec<Citation>) {
        self.entries.insert(
            (record.to_string(), field.to_string()),
            (value.to_string(), citations),
        );
    }

    pub fn lookup(&self, record: &str, field: &str) -> Option<Inspection> {
        self.entries
            .get(&(record.to_string(), field.to_string()))
            .map(|(value, citations)| Inspection {
                record: record.to_string(),
                field: field.to_string(),
                value: value.clone(),
                citations: citations.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holds the inspection currently on screen, if any.
#[derive(Debug, Clone, Default)]
pub struct ProvenancePanel {
    current: Option<Inspection>,
}

impl ProvenancePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the panel for a registered cell. A miss leaves the panel as it
    /// was and returns `None`.
    pub fn open(&mut self, index: &ProvenanceIndex, record: &str, field: &str) -> Option<&Inspection> {
        let found = index.lookup(record, field)?;
        log(
            Level::Debug,
            Domain::Provenance,
            "panel_open",
            obj(&[("record", v_str(record)), ("field", v_str(field))]),
        );
        self.current = Some(found);
        self.current.as_ref()
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Inspection> {
        self.current.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}
