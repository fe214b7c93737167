//! Field catalog: the displayable field names across all records.

use crate::logging::log_catalog;
use crate::record::{Record, SIDE_CHANNEL_FIELDS};

/// Union of record keys in first-seen order. First-seen order drives the
/// default column order, so it must be reproducible for the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    fields: Vec<String>,
}

impl FieldCatalog {
    pub fn derive(records: &[Record]) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for record in records {
            for name in record.field_names() {
                if SIDE_CHANNEL_FIELDS.contains(&name.as_str()) {
                    continue;
                }
                if !fields.iter().any(|f| f == name) {
                    fields.push(name.clone());
                }
            }
        }
        log_catalog(fields.len());
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
