//! Record store: the immutable list of IPO records loaded from the static
//! JSON document.
//!
//! Field names are matched verbatim (spaces and punctuation included). The
//! known IPO fields get typed slots; any other scalar key is kept in
//! `extra` so datasets with additional metrics still render.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::logging::{log, log_load, log_load_error, obj, v_str, Domain, Level};

pub const KEY_FIELD: &str = "Company Name";
pub const TICKER_FIELD: &str = "Company Ticker";
pub const NOTES_FIELD: &str = "Notes";
pub const PAGE_FIELD: &str = "Page Number";
pub const FILING_URL_FIELD: &str = "Filing URL";

/// Keys that carry side-channel data rather than displayable values.
pub const SIDE_CHANNEL_FIELDS: [&str; 3] = [NOTES_FIELD, PAGE_FIELD, FILING_URL_FIELD];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("document is not a list of records")]
    NotAList,
    #[error("record {index} is not an object")]
    NotAnObject { index: usize },
    #[error("record {index} has no \"Company Name\"")]
    MissingKey { index: usize },
    #[error("record {index} field {field:?} has an unsupported value")]
    InvalidValue { index: usize, field: String },
}

/// One company / IPO event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub company_name: String,
    pub company_ticker: Option<String>,
    pub exchange: Option<String>,
    pub s1_filing_date: Option<String>,
    pub ipo_date: Option<String>,
    pub ipo_price_range: Option<String>,
    pub final_price: Option<String>,
    pub shares_offered_primary: Option<String>,
    pub shares_offered_secondary: Option<String>,
    pub total_shares_outstanding: Option<String>,
    pub gross_proceeds: Option<String>,
    pub net_proceeds: Option<String>,
    pub greenshoe_option: Option<String>,
    pub underwriter_discount_per_share: Option<String>,
    pub underwriter_discount_total: Option<String>,
    pub lead_bookrunners: Option<String>,
    pub co_bookrunners: Option<String>,
    pub syndicate_members: Option<String>,
    pub directed_share_program: Option<String>,
    pub post_ipo_voting_control: Option<String>,
    pub shares_delivery_date: Option<String>,
    /// Scalar keys outside the known set, in document order.
    pub extra: Vec<(String, String)>,
    pub filing_url: Option<String>,
    pub notes: BTreeMap<String, String>,
    pub page_reference: BTreeMap<String, String>,
    field_order: Vec<String>,
}

impl Record {
    /// Unique key used by selection and provenance lookups.
    pub fn key(&self) -> &str {
        &self.company_name
    }

    pub fn ticker(&self) -> Option<&str> {
        self.company_ticker.as_deref()
    }

    /// Displayable field names in the order the document listed them.
    pub fn field_names(&self) -> &[String] {
        &self.field_order
    }

    /// Raw value of a displayable field, which may be empty.
    pub fn get(&self, field: &str) -> Option<&str> {
        if field == KEY_FIELD {
            return Some(self.company_name.as_str());
        }
        match self.slot(field) {
            Some(slot) => slot.as_deref(),
            None => self
                .extra
                .iter()
                .find(|(k, _)| k == field)
                .map(|(_, v)| v.as_str()),
        }
    }

    pub fn note(&self, field: &str) -> Option<&str> {
        self.notes.get(field).map(String::as_str)
    }

    pub fn page_reference(&self, field: &str) -> Option<&str> {
        self.page_reference.get(field).map(String::as_str)
    }

    fn slot(&self, field: &str) -> Option<&Option<String>> {
        let slot = match field {
            TICKER_FIELD => &self.company_ticker,
            "Exchange" => &self.exchange,
            "S1 Filing Date" => &self.s1_filing_date,
            "IPO Date" => &self.ipo_date,
            "IPO Price Range" => &self.ipo_price_range,
            "Final Price" => &self.final_price,
            "Shares Offered (Primary)" => &self.shares_offered_primary,
            "Shares Offered (Secondary)" => &self.shares_offered_secondary,
            "Total Shares Outstanding" => &self.total_shares_outstanding,
            "Gross Proceeds" => &self.gross_proceeds,
            "Net Proceeds" => &self.net_proceeds,
            "Greenshoe Option" => &self.greenshoe_option,
            "Underwriter Discount (Per Share)" => &self.underwriter_discount_per_share,
            "Underwriter Discount (Total)" => &self.underwriter_discount_total,
            "Lead Bookrunners" => &self.lead_bookrunners,
            "Co-Bookrunners" => &self.co_bookrunners,
            "Syndicate Members" => &self.syndicate_members,
            "Directed Share Program" => &self.directed_share_program,
            "Post-IPO Voting Control" => &self.post_ipo_voting_control,
            "Shares Delivery Date" => &self.shares_delivery_date,
            _ => return None,
        };
        Some(slot)
    }

    fn slot_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        let slot = match field {
            TICKER_FIELD => &mut self.company_ticker,
            "Exchange" => &mut self.exchange,
            "S1 Filing Date" => &mut self.s1_filing_date,
            "IPO Date" => &mut self.ipo_date,
            "IPO Price Range" => &mut self.ipo_price_range,
            "Final Price" => &mut self.final_price,
            "Shares Offered (Primary)" => &mut self.shares_offered_primary,
            "Shares Offered (Secondary)" => &mut self.shares_offered_secondary,
            "Total Shares Outstanding" => &mut self.total_shares_outstanding,
            "Gross Proceeds" => &mut self.gross_proceeds,
            "Net Proceeds" => &mut self.net_proceeds,
            "Greenshoe Option" => &mut self.greenshoe_option,
            "Underwriter Discount (Per Share)" => &mut self.underwriter_discount_per_share,
            "Underwriter Discount (Total)" => &mut self.underwriter_discount_total,
            "Lead Bookrunners" => &mut self.lead_bookrunners,
            "Co-Bookrunners" => &mut self.co_bookrunners,
            "Syndicate Members" => &mut self.syndicate_members,
            "Directed Share Program" => &mut self.directed_share_program,
            "Post-IPO Voting Control" => &mut self.post_ipo_voting_control,
            "Shares Delivery Date" => &mut self.shares_delivery_date,
            _ => return None,
        };
        Some(slot)
    }

    fn from_object(index: usize, object: &Map<String, Value>) -> Result<Self, LoadError> {
        let mut record = Record::default();
        let mut name: Option<String> = None;

        for (key, value) in object {
            match key.as_str() {
                NOTES_FIELD => record.notes = side_channel(index, key, value)?,
                PAGE_FIELD => record.page_reference = side_channel(index, key, value)?,
                FILING_URL_FIELD => record.filing_url = scalar(index, key, value)?,
                KEY_FIELD => {
                    name = scalar(index, key, value)?;
                    record.field_order.push(key.clone());
                }
                _ => {
                    let text = scalar(index, key, value)?;
                    match record.slot_mut(key) {
                        Some(slot) => *slot = text,
                        None => {
                            if let Some(text) = text {
                                record.extra.push((key.clone(), text));
                            }
                        }
                    }
                    record.field_order.push(key.clone());
                }
            }
        }

        record.company_name = match name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Err(LoadError::MissingKey { index }),
        };
        record.filing_url = record.filing_url.filter(|u| !u.trim().is_empty());
        record.warn_orphan_side_channels();
        Ok(record)
    }

    fn warn_orphan_side_channels(&self) {
        for field in self.notes.keys().chain(self.page_reference.keys()) {
            if !self.field_order.iter().any(|f| f == field) {
                log(
                    Level::Warn,
                    Domain::Load,
                    "orphan_side_channel",
                    obj(&[("record", v_str(self.key())), ("field", v_str(field))]),
                );
            }
        }
    }
}

/// Render a JSON scalar as display text; `null` means absent.
fn scalar(index: usize, field: &str, value: &Value) -> Result<Option<String>, LoadError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(LoadError::InvalidValue {
            index,
            field: field.to_string(),
        }),
    }
}

fn side_channel(
    index: usize,
    field: &str,
    value: &Value,
) -> Result<BTreeMap<String, String>, LoadError> {
    let map = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Object(map) => map,
        _ => {
            return Err(LoadError::InvalidValue {
                index,
                field: field.to_string(),
            })
        }
    };
    let mut out = BTreeMap::new();
    for (k, v) in map {
        if let Some(text) = scalar(index, field, v)? {
            out.insert(k.clone(), text);
        }
    }
    Ok(out)
}

/// Owns every record; read-only after load.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    fingerprint: String,
}

impl RecordStore {
    /// Parse the raw document. Any malformed element rejects the whole load.
    pub fn load(raw: &str) -> Result<Self, LoadError> {
        let doc: Value = serde_json::from_str(raw)?;
        let items = doc.as_array().ok_or(LoadError::NotAList)?;

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or(LoadError::NotAnObject { index })?;
            let record = Record::from_object(index, object)?;
            if records.iter().any(|r: &Record| r.key() == record.key()) {
                log(
                    Level::Warn,
                    Domain::Load,
                    "duplicate_key",
                    obj(&[("record", v_str(record.key()))]),
                );
            }
            records.push(record);
        }

        Ok(Self {
            records,
            fingerprint: sha256_hex(raw.as_bytes()),
        })
    }

    pub fn load_file(path: &Path) -> Result<Self, LoadError> {
        let display = path.display().to_string();
        let result = std::fs::read_to_string(path)
            .map_err(|source| LoadError::Io {
                path: display.clone(),
                source,
            })
            .and_then(|raw| Self::load(&raw));
        match &result {
            Ok(store) => log_load(&display, store.len(), store.fingerprint()),
            Err(err) => log_load_error(&display, &err.to_string()),
        }
        result
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// First record with this key.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// SHA-256 of the raw document.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
