//! ipocomps: browse, compare and export IPO filing records.
//!
//! Records load into a [`record::RecordStore`]; a [`selection::Selection`]
//! of record keys and field names is rendered into a [`render::Grid`],
//! which the [`export`] module writes out as CSV, a spreadsheet or a slide
//! deck. [`app::App`] ties these together for front ends.

pub mod app;
pub mod catalog;
pub mod comps;
pub mod config;
pub mod export;
pub mod logging;
pub mod logo;
pub mod provenance;
pub mod record;
pub mod render;
pub mod search;
pub mod selection;
