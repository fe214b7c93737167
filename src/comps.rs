//! Comps model: companies × metrics × values, each value backed by
//! citations, plus the catalog of named comps views.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::logging::{log_comps_load, log_load_error};
use crate::provenance::{filing_citation, Citation, ProvenanceIndex};
use crate::record::{LoadError, Record};
use crate::render::{Cell, Grid, GridRow, RenderOutcome, LOGO_HEADER};

/// Shown when a company has no value for a metric.
pub const MISSING_VALUE: &str = "-";
pub const NAME_HEADER: &str = "Company Name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompsView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub company_count: usize,
    pub metric_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub company_id: String,
    pub metric_id: String,
    pub value: String,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

/// Metrics derived from record fields when no comps document is supplied:
/// (metric id, metric label, record field).
pub const DEFAULT_METRICS: [(&str, &str, &str); 5] = [
    ("finalPrice", "Final Price", "Final Price"),
    ("grossProceeds", "Gross Proceeds", "Gross Proceeds"),
    ("netProceeds", "Net Proceeds", "Net Proceeds"),
    ("sharesOffered", "Shares Offered", "Shares Offered (Primary)"),
    ("underwriterDiscount", "Underwriter Discount", "Underwriter Discount (Total)"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompsModel {
    #[serde(default)]
    pub views: Vec<CompsView>,
    pub companies: Vec<Company>,
    pub metrics: Vec<Metric>,
    pub values: Vec<MetricValue>,
}

impl CompsModel {
    pub fn load(raw: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(raw)?)
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
            Ok(model) => log_comps_load(&display, model.companies.len(), model.metrics.len(), model.values.len()),
            Err(err) => log_load_error(&display, &err.to_string()),
        }
        result
    }

    /// One company per record (ids are 1-based positions), the default
    /// metric set, and a single filing citation per value dated the IPO
    /// date and linked to the filing. Empty values are left out, and so are
    /// later records repeating an earlier key.
    pub fn from_records(records: &[Record]) -> Self {
        let metrics: Vec<Metric> = DEFAULT_METRICS
            .iter()
            .map(|(id, name, _)| Metric {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();

        let mut companies = Vec::with_capacity(records.len());
        let mut values = Vec::with_capacity(records.len() * DEFAULT_METRICS.len());
        let mut seen = HashSet::new();
        for (i, record) in records.iter().enumerate() {
            if !seen.insert(record.key()) {
                continue;
            }
            let company_id = (i + 1).to_string();
            companies.push(Company {
                id: company_id.clone(),
                name: record.company_name.clone(),
                ticker: record.ticker().unwrap_or_default().to_string(),
            });
            for (metric_id, _, field) in DEFAULT_METRICS {
                let Some(value) = record.get(field).filter(|v| !v.is_empty()) else {
                    continue;
                };
                values.push(MetricValue {
                    company_id: company_id.clone(),
                    metric_id: metric_id.to_string(),
                    value: value.to_string(),
                    sources: vec![filing_citation(record, value)],
                });
            }
        }

        Self {
            views: Vec::new(),
            companies,
            metrics,
            values,
        }
    }

    pub fn company(&self, id: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    pub fn metric(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn view(&self, id: &str) -> Option<&CompsView> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn metric_value(&self, company_id: &str, metric_id: &str) -> Option<&MetricValue> {
        self.values
            .iter()
            .find(|v| v.company_id == company_id && v.metric_id == metric_id)
    }

    /// Display value; empty or missing values show as "-".
    pub fn value(&self, company_id: &str, metric_id: &str) -> &str {
        self.metric_value(company_id, metric_id)
            .map(|v| v.value.as_str())
            .filter(|v| !v.is_empty())
            .unwrap_or(MISSING_VALUE)
    }

    /// Citations keyed by (company name, metric name), matching the grid's
    /// row keys and headers.
    pub fn provenance_index(&self) -> ProvenanceIndex {
        let mut index = ProvenanceIndex::new();
        for v in &self.values {
            let (Some(company), Some(metric)) = (self.company(&v.company_id), self.metric(&v.metric_id))
            else {
                continue;
            };
            index.register(&company.name, &metric.name, &v.value, v.sources.clone());
        }
        index
    }

    /// Grid of logo, name and the chosen metrics for the chosen companies.
    /// Unknown ids are skipped.
    pub fn to_grid(&self, company_ids: &[String], metric_ids: &[String]) -> RenderOutcome {
        let companies: Vec<&Company> = company_ids.iter().filter_map(|id| self.company(id)).collect();
        let metrics: Vec<&Metric> = metric_ids.iter().filter_map(|id| self.metric(id)).collect();
        if companies.is_empty() || metrics.is_empty() {
            return RenderOutcome::Empty;
        }

        let mut headers = vec![LOGO_HEADER.to_string(), NAME_HEADER.to_string()];
        headers.extend(metrics.iter().map(|m| m.name.clone()));

        let rows = companies
            .iter()
            .map(|company| {
                let mut cells = vec![Cell::default(), Cell::plain(company.name.clone())];
                cells.extend(
                    metrics
                        .iter()
                        .map(|m| Cell::plain(self.value(&company.id, &m.id))),
                );
                GridRow {
                    key: company.name.clone(),
                    logo_ticker: Some(company.ticker.clone()).filter(|t| !t.is_empty()),
                    cells,
                }
            })
            .collect();

        RenderOutcome::Grid(Grid {
            headers,
            rows,
            pinned_first_column: true,
            logo_column: Some(0),
        })
    }

    /// Every company and every metric.
    pub fn full_grid(&self) -> RenderOutcome {
        let companies: Vec<String> = self.companies.iter().map(|c| c.id.clone()).collect();
        let metrics: Vec<String> = self.metrics.iter().map(|m| m.id.clone()).collect();
        self.to_grid(&companies, &metrics)
    }
}
