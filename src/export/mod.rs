//! Exporter: turns a rendered grid into a CSV, spreadsheet or slide deck
//! artifact. Generation is all-or-nothing; logos are optional extras.

pub mod csv;
mod ooxml;
pub mod pptx;
pub mod xlsx;

use chrono::NaiveDate;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::logging::{log_export, v_str, ProfileScope};
use crate::logo::{fetch_logos, LogoImage, LogoSource};
use crate::render::{Grid, RenderOutcome};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: select at least one company and one field")]
    NothingToExport,
    #[error("failed to generate document: {0}")]
    Generation(String),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Generation(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Spreadsheet,
    SlideDeck,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::SlideDeck => "pptx",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::SlideDeck => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    /// Formats that can carry embedded logos.
    pub fn embeds_images(&self) -> bool {
        !matches!(self, ExportFormat::Csv)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            "pptx" | "powerpoint" | "slides" => Ok(ExportFormat::SlideDeck),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Characters that cannot appear in a filename on common filesystems.
const FILENAME_UNSAFE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// `<ViewName>_<YYYY-MM-DD>.<ext>`. Whitespace, path separators, characters
/// filesystems reject and `..` sequences in the view name collapse to one
/// underscore per run; leading dots are dropped.
pub fn export_filename(view_name: &str, date: NaiveDate, format: ExportFormat) -> String {
    let chars: Vec<char> = view_name.chars().collect();
    let unsafe_at = |i: usize| {
        let c = chars[i];
        c.is_whitespace()
            || c.is_control()
            || FILENAME_UNSAFE.contains(&c)
            || (c == '.' && (chars.get(i + 1) == Some(&'.') || (i > 0 && chars[i - 1] == '.')))
    };

    let mut stem = String::with_capacity(view_name.len());
    let mut in_run = false;
    for (i, &c) in chars.iter().enumerate() {
        if unsafe_at(i) {
            if !in_run {
                stem.push('_');
            }
            in_run = true;
        } else {
            stem.push(c);
            in_run = false;
        }
    }
    let stem = stem.trim_start_matches('.');
    format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), format.extension())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write into `dir` (created if needed) and return the full path. The
    /// bytes go to a staging file first and are renamed into place, so a
    /// failed write never leaves a partial export behind.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        if Path::new(&self.filename).file_name() != Some(OsStr::new(&self.filename)) {
            return Err(ExportError::Generation(format!(
                "export filename is not a plain file name: {}",
                self.filename
            )));
        }
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        let staged = dir.join(format!(".{}.part", self.filename));

        if let Err(err) = std::fs::write(&staged, &self.bytes).and_then(|_| std::fs::rename(&staged, &path)) {
            std::fs::remove_file(&staged).ok();
            return Err(err.into());
        }
        Ok(path)
    }
}

pub struct Exporter;

impl Exporter {
    /// Build the artifact for `grid`. Logos are looked up by each row's
    /// ticker; rows without one keep an empty logo cell.
    pub fn export(
        grid: &Grid,
        format: ExportFormat,
        view_name: &str,
        date: NaiveDate,
        logos: &HashMap<String, LogoImage>,
    ) -> Result<ExportArtifact, ExportError> {
        if grid.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let _scope = ProfileScope::with_context(
            "export",
            &[("format", v_str(format.extension())), ("view", v_str(view_name))],
        );

        let bytes = match format {
            ExportFormat::Csv => csv::to_csv(grid).into_bytes(),
            ExportFormat::Spreadsheet => xlsx::build(grid, view_name, logos)?,
            ExportFormat::SlideDeck => pptx::build(grid, view_name, date, logos)?,
        };
        let artifact = ExportArtifact {
            filename: export_filename(view_name, date, format),
            mime: format.mime(),
            bytes,
        };

        let embedded = if format.embeds_images() {
            grid.rows
                .iter()
                .filter(|r| r.logo_ticker.as_ref().is_some_and(|t| logos.contains_key(t)))
                .count()
        } else {
            0
        };
        log_export(view_name, format.extension(), &artifact.filename, artifact.bytes.len(), embedded);
        Ok(artifact)
    }

    /// As `export`, starting from a render outcome.
    pub fn export_outcome(
        outcome: &RenderOutcome,
        format: ExportFormat,
        view_name: &str,
        date: NaiveDate,
        logos: &HashMap<String, LogoImage>,
    ) -> Result<ExportArtifact, ExportError> {
        match outcome.grid() {
            Some(grid) => Self::export(grid, format, view_name, date, logos),
            None => Err(ExportError::NothingToExport),
        }
    }

    /// Fetch logos for the grid's tickers when the format embeds them, then
    /// export. A failing source only costs the affected logos.
    pub async fn export_with_source(
        grid: &Grid,
        format: ExportFormat,
        view_name: &str,
        date: NaiveDate,
        source: &dyn LogoSource,
    ) -> Result<ExportArtifact, ExportError> {
        if grid.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let logos = if format.embeds_images() && grid.logo_column.is_some() {
            let tickers: Vec<String> = grid.rows.iter().filter_map(|r| r.logo_ticker.clone()).collect();
            fetch_logos(source, &tickers).await
        } else {
            HashMap::new()
        };
        Self::export(grid, format, view_name, date, &logos)
    }
}
