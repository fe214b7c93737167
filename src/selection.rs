//! Selection state and its reducer: `(Selection, SelectionEvent) -> outcome`.
//!
//! All mutation goes through [`reduce`]. Selected records keep insertion
//! order; selected fields are always kept in catalog order, whatever order
//! they were toggled in. Unknown record keys and field names are rejected
//! as no-ops and reported in the outcome.

use crate::catalog::FieldCatalog;
use crate::logging::log_selection;
use crate::record::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    records: Vec<String>,
    fields: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_record(&self, key: &str) -> bool {
        self.records.iter().any(|k| k == key)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// True when rendering would produce the empty placeholder.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() || self.fields.is_empty()
    }

    /// Appends unless already present. Returns whether the state changed.
    pub fn add_record(&mut self, key: &str) -> bool {
        if self.has_record(key) {
            return false;
        }
        self.records.push(key.to_string());
        true
    }

    pub fn remove_record(&mut self, key: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|k| k != key);
        self.records.len() != before
    }

    /// Adds or removes a field, placing additions at their catalog position.
    /// Names missing from the catalog leave the state untouched.
    pub fn toggle_field(&mut self, name: &str, on: bool, catalog: &FieldCatalog) -> bool {
        if !on {
            let before = self.fields.len();
            self.fields.retain(|f| f != name);
            return self.fields.len() != before;
        }
        let Some(pos) = catalog.position(name) else {
            return false;
        };
        if self.has_field(name) {
            return false;
        }
        let at = self
            .fields
            .iter()
            .position(|f| catalog.position(f).map_or(true, |p| p > pos))
            .unwrap_or(self.fields.len());
        self.fields.insert(at, name.to_string());
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    AddRecord(String),
    RemoveRecord(String),
    ToggleField { name: String, on: bool },
    ClearRecords,
    SelectAllFields,
    ClearFields,
}

impl SelectionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionEvent::AddRecord(_) => "add_record",
            SelectionEvent::RemoveRecord(_) => "remove_record",
            SelectionEvent::ToggleField { .. } => "toggle_field",
            SelectionEvent::ClearRecords => "clear_records",
            SelectionEvent::SelectAllFields => "select_all_fields",
            SelectionEvent::ClearFields => "clear_fields",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    UnknownRecord(String),
    UnknownField(String),
}

impl Rejected {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejected::UnknownRecord(_) => "unknown_record",
            Rejected::UnknownField(_) => "unknown_field",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub changed: bool,
    pub rejected: Option<Rejected>,
}

pub fn reduce(
    state: &mut Selection,
    event: SelectionEvent,
    store: &RecordStore,
    catalog: &FieldCatalog,
) -> SelectionOutcome {
    let name = event.name();
    let outcome = match event {
        SelectionEvent::AddRecord(key) => {
            if store.contains(&key) {
                changed(state.add_record(&key))
            } else {
                rejected(Rejected::UnknownRecord(key))
            }
        }
        SelectionEvent::RemoveRecord(key) => changed(state.remove_record(&key)),
        SelectionEvent::ToggleField { name, on } => {
            if on && !catalog.contains(&name) {
                rejected(Rejected::UnknownField(name))
            } else {
                changed(state.toggle_field(&name, on, catalog))
            }
        }
        SelectionEvent::ClearRecords => {
            let was_empty = state.records.is_empty();
            state.records.clear();
            changed(!was_empty)
        }
        SelectionEvent::SelectAllFields => {
            let all = catalog.fields().to_vec();
            let differs = state.fields != all;
            state.fields = all;
            changed(differs)
        }
        SelectionEvent::ClearFields => {
            let was_empty = state.fields.is_empty();
            state.fields.clear();
            changed(!was_empty)
        }
    };
    log_selection(
        name,
        outcome.changed,
        outcome.rejected.as_ref().map(Rejected::as_str),
    );
    outcome
}

fn changed(changed: bool) -> SelectionOutcome {
    SelectionOutcome {
        changed,
        rejected: None,
    }
}

fn rejected(reason: Rejected) -> SelectionOutcome {
    SelectionOutcome {
        changed: false,
        rejected: Some(reason),
    }
}
