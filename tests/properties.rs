//! Property tests over generated record sets: filtering, rendering,
//! catalog derivation, CSV quoting and the selection reducer.

use ipocomps::catalog::FieldCatalog;
use ipocomps::export::csv::to_csv;
use ipocomps::record::RecordStore;
use ipocomps::render::{render, Cell, Grid, GridRow, NOT_AVAILABLE};
use ipocomps::search::{filter_fields, filter_records};
use ipocomps::selection::{reduce, Selection, SelectionEvent};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const FIELD_POOL: [&str; 7] = [
    "Company Ticker",
    "Exchange",
    "IPO Date",
    "Final Price",
    "Lead Bookrunners",
    "Revenue",
    "Employees",
];

/// Per record: (field index, value) pairs; `None` stores JSON null.
fn records_strategy() -> impl Strategy<Value = Vec<Vec<(usize, Option<String>)>>> {
    let value = prop::option::of("[a-zA-Z0-9 $,.]{0,10}");
    let record = prop::collection::vec((0..FIELD_POOL.len(), value), 0..FIELD_POOL.len());
    prop::collection::vec(record, 1..6)
}

fn build_store(shape: &[Vec<(usize, Option<String>)>]) -> RecordStore {
    let docs: Vec<Value> = shape
        .iter()
        .enumerate()
        .map(|(i, fields)| {
            let mut obj = Map::new();
            obj.insert("Company Name".to_string(), json!(format!("Company {}", i)));
            for (idx, value) in fields {
                obj.insert(FIELD_POOL[*idx].to_string(), json!(value));
            }
            Value::Object(obj)
        })
        .collect();
    RecordStore::load(&Value::Array(docs).to_string()).expect("generated records load")
}

fn event_strategy() -> impl Strategy<Value = SelectionEvent> {
    let name = prop_oneof![
        (0..6usize).prop_map(|i| format!("Company {}", i)),
        Just("Nobody".to_string()),
    ];
    let field = prop_oneof![
        (0..FIELD_POOL.len()).prop_map(|i| FIELD_POOL[i].to_string()),
        Just("Company Name".to_string()),
        Just("Not A Field".to_string()),
    ];
    prop_oneof![
        name.clone().prop_map(SelectionEvent::AddRecord),
        name.prop_map(SelectionEvent::RemoveRecord),
        (field, any::<bool>()).prop_map(|(name, on)| SelectionEvent::ToggleField { name, on }),
        Just(SelectionEvent::ClearRecords),
        Just(SelectionEvent::SelectAllFields),
        Just(SelectionEvent::ClearFields),
    ]
}

/// Minimal RFC 4180 reader for checking the writer.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    rows
}

proptest! {
    #[test]
    fn prop_record_filter_matches_exactly(shape in records_strategy(), query in "[a-zA-Z0-9 ]{0,3}") {
        let store = build_store(&shape);
        let hits = filter_records(store.records(), &query);
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            prop_assert!(hits.is_empty());
        } else {
            let expected: Vec<&str> = store
                .records()
                .iter()
                .filter(|r| {
                    [
                        Some(r.key()),
                        r.ticker(),
                        r.exchange.as_deref(),
                        r.ipo_date.as_deref(),
                        r.lead_bookrunners.as_deref(),
                        r.co_bookrunners.as_deref(),
                    ]
                    .iter()
                    .flatten()
                    .any(|a| a.to_lowercase().contains(&q))
                })
                .map(|r| r.key())
                .collect();
            let got: Vec<&str> = hits.iter().map(|r| r.key()).collect();
            prop_assert_eq!(got, expected);
        }
    }

    #[test]
    fn prop_field_filter_blank_keeps_all(shape in records_strategy(), query in "[a-z ]{0,3}") {
        let store = build_store(&shape);
        let catalog = FieldCatalog::derive(store.records());
        let hits = filter_fields(catalog.fields(), &query);
        if query.trim().is_empty() {
            prop_assert_eq!(hits.len(), catalog.len());
        } else {
            let q = query.trim().to_lowercase();
            prop_assert!(hits.iter().all(|f| f.to_lowercase().contains(&q)));
        }
    }

    #[test]
    fn prop_na_iff_absent_or_empty(shape in records_strategy()) {
        let store = build_store(&shape);
        let fields: Vec<String> = FIELD_POOL.iter().map(|f| f.to_string()).collect();
        let records: Vec<_> = store.records().iter().collect();
        let out = render(&records, &fields);
        let grid = out.grid().expect("non-empty axes");
        prop_assert_eq!(grid.row_count(), records.len());
        for (r, record) in records.iter().enumerate() {
            prop_assert_eq!(grid.rows[r].cells.len(), fields.len());
            for (c, field) in fields.iter().enumerate() {
                let cell = grid.cell(r, c).unwrap();
                match record.get(field).filter(|v| !v.is_empty()) {
                    Some(v) => {
                        prop_assert_eq!(cell.value.as_str(), v);
                    }
                    None => {
                        prop_assert_eq!(cell.value.as_str(), NOT_AVAILABLE);
                    }
                }
            }
        }
    }

    #[test]
    fn prop_catalog_is_idempotent_and_complete(shape in records_strategy()) {
        let store = build_store(&shape);
        let a = FieldCatalog::derive(store.records());
        let b = FieldCatalog::derive(store.records());
        prop_assert_eq!(a.fields(), b.fields());
        prop_assert_eq!(a.fields()[0].as_str(), "Company Name");
        for (i, f) in a.fields().iter().enumerate() {
            prop_assert!(!a.fields()[..i].contains(f));
            prop_assert!(store.records().iter().any(|r| r.field_names().contains(f)));
        }
    }

    #[test]
    fn prop_csv_round_trips(rows in prop::collection::vec(prop::collection::vec("[a-z,\" \n]{0,6}", 3), 1..5)) {
        let grid = Grid {
            headers: vec!["A".into(), "B, b".into(), "C\"".into()],
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| GridRow {
                    key: i.to_string(),
                    logo_ticker: None,
                    cells: cells.iter().map(|v| Cell::plain(v.clone())).collect(),
                })
                .collect(),
            pinned_first_column: true,
            logo_column: None,
        };
        let parsed = parse_csv(&to_csv(&grid));
        let expected: Vec<Vec<String>> = grid
            .text_rows()
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect();
        prop_assert_eq!(parsed, expected);
    }

    #[test]
    fn prop_selection_invariants(shape in records_strategy(), events in prop::collection::vec(event_strategy(), 0..30)) {
        let store = build_store(&shape);
        let catalog = FieldCatalog::derive(store.records());
        let mut sel = Selection::new();
        for event in events {
            let before = sel.clone();
            let out = reduce(&mut sel, event, &store, &catalog);
            prop_assert_eq!(out.changed, before != sel);
            if out.rejected.is_some() {
                prop_assert_eq!(&before, &sel);
            }

            for (i, key) in sel.records().iter().enumerate() {
                prop_assert!(store.contains(key));
                prop_assert!(!sel.records()[..i].contains(key));
            }
            let positions: Vec<usize> = sel
                .fields()
                .iter()
                .map(|f| catalog.position(f).expect("selected field is in the catalog"))
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
