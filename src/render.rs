//! Table renderer: projects selected records × selected fields into a grid.

use crate::logging::log_render;
use crate::record::{Record, RecordStore};
use crate::selection::Selection;

/// Shown for absent or empty values.
pub const NOT_AVAILABLE: &str = "N/A";
pub const LOGO_HEADER: &str = "Company Logo";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: String,
    pub note: Option<String>,
    pub page_reference: Option<String>,
    /// Filing to open when the cell is clicked.
    pub link: Option<String>,
}

impl Cell {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn is_clickable(&self) -> bool {
        self.link.is_some()
    }

    /// Hover text built from the note and page reference. A page of "N/A"
    /// is not worth showing.
    pub fn tooltip(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(note) = self.note.as_deref().filter(|n| !n.is_empty()) {
            parts.push(format!("Notes: {}", note));
        }
        if let Some(page) = self.real_page() {
            parts.push(format!("Page: {}", page));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    fn real_page(&self) -> Option<&str> {
        self.page_reference
            .as_deref()
            .filter(|p| !p.is_empty() && *p != NOT_AVAILABLE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRow {
    pub key: String,
    pub logo_ticker: Option<String>,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<GridRow>,
    /// Front ends freeze the first column when set.
    pub pinned_first_column: bool,
    /// Column whose cells hold a company logo instead of text.
    pub logo_column: Option<usize>,
}

impl Grid {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Header line followed by each row's cell values.
    pub fn text_rows(&self) -> Vec<Vec<&str>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(self.headers.iter().map(String::as_str).collect());
        for row in &self.rows {
            out.push(row.cells.iter().map(|c| c.value.as_str()).collect());
        }
        out
    }

    /// Prepend an empty logo column; rows keep their ticker for the fetch.
    pub fn with_logo_column(mut self) -> Self {
        if self.logo_column.is_some() {
            return self;
        }
        self.headers.insert(0, LOGO_HEADER.to_string());
        for row in &mut self.rows {
            row.cells.insert(0, Cell::default());
        }
        self.logo_column = Some(0);
        self
    }

    /// Plain aligned table, one line per row.
    pub fn to_text(&self) -> String {
        let rows = self.text_rows();
        let mut widths = vec![0usize; self.headers.len()];
        for row in &rows {
            for (i, v) in row.iter().enumerate() {
                let w = v.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                widths[i] = widths[i].max(w);
            }
        }

        let mut out = String::new();
        for (n, row) in rows.iter().enumerate() {
            let line: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let flat = v.replace('\n', " ");
                    format!("{:<width$}", flat, width = widths[i])
                })
                .collect();
            out.push_str(line.join(" | ").trim_end());
            out.push('\n');
            if n == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                out.push_str(&rule.join("-+-"));
                out.push('\n');
            }
        }
        out
    }

    /// One line per cell with hover text or a filing link:
    /// `<row> / <header>: <tooltip> -> <link>`. Tooltip paragraphs are
    /// joined with "; ".
    pub fn annotations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for row in &self.rows {
            for (header, cell) in self.headers.iter().zip(&row.cells) {
                let tip = cell.tooltip();
                if tip.is_none() && !cell.is_clickable() {
                    continue;
                }
                let mut line = format!("{} / {}:", row.key, header);
                if let Some(tip) = tip {
                    line.push(' ');
                    line.push_str(&tip.split("\n\n").collect::<Vec<_>>().join("; "));
                }
                if let Some(link) = &cell.link {
                    line.push_str(" -> ");
                    line.push_str(link);
                }
                out.push(line);
            }
        }
        out
    }

    /// `to_text` followed by a blank line and the cell annotations, if any.
    pub fn to_annotated_text(&self) -> String {
        let mut out = self.to_text();
        let notes = self.annotations();
        if !notes.is_empty() {
            out.push('\n');
            for line in notes {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Nothing selected on one of the axes; show a placeholder.
    Empty,
    Grid(Grid),
}

impl RenderOutcome {
    pub fn grid(&self) -> Option<&Grid> {
        match self {
            RenderOutcome::Empty => None,
            RenderOutcome::Grid(g) => Some(g),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RenderOutcome::Empty)
    }
}

fn render_cell(record: &Record, field: &str) -> Cell {
    let value = record
        .get(field)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string();
    let mut cell = Cell {
        value,
        note: record.note(field).map(str::to_string),
        page_reference: record.page_reference(field).map(str::to_string),
        link: None,
    };
    if cell.real_page().is_some() {
        cell.link = record.filing_url.clone();
    }
    cell
}

/// Rows follow `records` order, columns follow `fields` order.
pub fn render(records: &[&Record], fields: &[String]) -> RenderOutcome {
    if records.is_empty() || fields.is_empty() {
        return RenderOutcome::Empty;
    }
    let rows: Vec<GridRow> = records
        .iter()
        .map(|record| GridRow {
            key: record.key().to_string(),
            logo_ticker: record.ticker().map(str::to_string),
            cells: fields.iter().map(|f| render_cell(record, f)).collect(),
        })
        .collect();
    log_render(rows.len(), fields.len());
    RenderOutcome::Grid(Grid {
        headers: fields.to_vec(),
        rows,
        pinned_first_column: true,
        logo_column: None,
    })
}

/// Resolve the selection's keys against the store, then render.
pub fn render_selection(store: &RecordStore, selection: &Selection) -> RenderOutcome {
    let records: Vec<&Record> = selection
        .records()
        .iter()
        .filter_map(|key| store.get(key))
        .collect();
    render(&records, selection.fields())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RecordStore {
        RecordStore::load(
            r#"[
                {
                    "Company Name": "Reddit",
                    "Company Ticker": "RDDT",
                    "Filing URL": "https://www.sec.gov/reddit-424b4.htm",
                    "Final Price": "$34.00",
                    "Gross Proceeds": "$748M",
                    "Net Proceeds": "",
                    "Notes": {"Gross Proceeds": "Includes secondary"},
                    "Page Number": {"Final Price": "N/A", "Gross Proceeds": "12"}
                },
                {
                    "Company Name": "Rubrik",
                    "Company Ticker": "RBRK",
                    "Final Price": "$32.00",
                    "Page Number": {"Final Price": "3"}
                }
            ]"#,
        )
        .unwrap()
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_and_empty_become_na() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let out = render(&recs, &fields(&["Net Proceeds", "Gross Proceeds"]));
        let grid = out.grid().unwrap();
        assert_eq!(grid.cell(0, 0).unwrap().value, "N/A");
        assert_eq!(grid.cell(0, 1).unwrap().value, "$748M");
        assert_eq!(grid.cell(1, 1).unwrap().value, "N/A");
    }

    #[test]
    fn test_clickable_requires_real_page_and_url() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let out = render(&recs, &fields(&["Final Price", "Gross Proceeds"]));
        let grid = out.grid().unwrap();
        // Reddit: page "N/A" for Final Price
        assert!(!grid.cell(0, 0).unwrap().is_clickable());
        assert_eq!(
            grid.cell(0, 1).unwrap().link.as_deref(),
            Some("https://www.sec.gov/reddit-424b4.htm")
        );
        // Rubrik: page present but no filing URL
        assert!(!grid.cell(1, 0).unwrap().is_clickable());
    }

    #[test]
    fn test_tooltip_text() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let out = render(&recs, &fields(&["Final Price", "Gross Proceeds"]));
        let grid = out.grid().unwrap();
        assert_eq!(grid.cell(0, 0).unwrap().tooltip(), None);
        assert_eq!(
            grid.cell(0, 1).unwrap().tooltip().as_deref(),
            Some("Notes: Includes secondary\n\nPage: 12")
        );
        assert_eq!(grid.cell(1, 0).unwrap().tooltip().as_deref(), Some("Page: 3"));
    }

    #[test]
    fn test_annotations_list_tooltips_and_links() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let grid = render(&recs, &fields(&["Final Price", "Gross Proceeds"])).grid().cloned().unwrap();
        assert_eq!(
            grid.annotations(),
            vec![
                "Reddit / Gross Proceeds: Notes: Includes secondary; Page: 12 -> https://www.sec.gov/reddit-424b4.htm",
                "Rubrik / Final Price: Page: 3",
            ]
        );

        let text = grid.to_annotated_text();
        assert!(text.starts_with(&grid.to_text()));
        assert!(text.ends_with("\n\nReddit / Gross Proceeds: Notes: Includes secondary; Page: 12 -> https://www.sec.gov/reddit-424b4.htm\nRubrik / Final Price: Page: 3\n"));

        let bare = render(&recs, &fields(&["Company Name"])).grid().cloned().unwrap();
        assert!(bare.annotations().is_empty());
        assert_eq!(bare.to_annotated_text(), bare.to_text());
    }

    #[test]
    fn test_empty_axes_signal_empty() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        assert!(render(&recs, &[]).is_empty());
        assert!(render(&[], &fields(&["Final Price"])).is_empty());
    }

    #[test]
    fn test_grid_is_pinned_and_aligned() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let out = render(&recs, &fields(&["Company Name", "Final Price"]));
        let grid = out.grid().unwrap();
        assert!(grid.pinned_first_column);
        assert_eq!(grid.column_count(), 2);
        assert!(grid.rows.iter().all(|r| r.cells.len() == 2));
        assert_eq!(grid.rows[1].logo_ticker.as_deref(), Some("RBRK"));
    }

    #[test]
    fn test_with_logo_column() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let grid = render(&recs, &fields(&["Company Name"])).grid().cloned().unwrap();
        let grid = grid.with_logo_column();
        assert_eq!(grid.headers, vec![LOGO_HEADER, "Company Name"]);
        assert_eq!(grid.logo_column, Some(0));
        assert_eq!(grid.cell(0, 0).unwrap().value, "");
        assert_eq!(grid.cell(0, 1).unwrap().value, "Reddit");
    }

    #[test]
    fn test_to_text_layout() {
        let s = store();
        let recs: Vec<&Record> = s.records().iter().collect();
        let grid = render(&recs, &fields(&["Company Name", "Final Price"])).grid().cloned().unwrap();
        let text = grid.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Company Name | Final Price");
        assert_eq!(lines[1], "-------------+------------");
        assert_eq!(lines[2], "Reddit       | $34.00");
    }
}
