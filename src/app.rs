//! Application state: owns the store and everything derived from it, and
//! applies selection events with a push-style re-render.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::catalog::FieldCatalog;
use crate::comps::CompsModel;
use crate::export::{ExportArtifact, ExportError, ExportFormat, Exporter};
use crate::logo::{LogoImage, LogoSource};
use crate::provenance::{Inspection, ProvenanceIndex, ProvenancePanel};
use crate::record::RecordStore;
use crate::render::{render_selection, RenderOutcome};
use crate::search::{filter_fields, search_hits, SearchHit};
use crate::selection::{reduce, Rejected, Selection, SelectionEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutput {
    pub changed: bool,
    /// Set whenever the stored view was rebuilt and front ends should redraw.
    pub needs_render: bool,
    pub rejected: Option<Rejected>,
}

pub struct App {
    store: RecordStore,
    catalog: FieldCatalog,
    selection: Selection,
    comps: CompsModel,
    provenance: ProvenanceIndex,
    panel: ProvenancePanel,
    view: RenderOutcome,
}

impl App {
    /// Without a comps document the comps model is derived from records.
    pub fn new(store: RecordStore, comps: Option<CompsModel>) -> Self {
        let catalog = FieldCatalog::derive(store.records());
        let comps = comps.unwrap_or_else(|| CompsModel::from_records(store.records()));
        let mut provenance = ProvenanceIndex::from_records(store.records());
        provenance.merge(comps.provenance_index());
        Self {
            store,
            catalog,
            selection: Selection::new(),
            comps,
            provenance,
            panel: ProvenancePanel::new(),
            view: RenderOutcome::Empty,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn comps(&self) -> &CompsModel {
        &self.comps
    }

    /// The grid as of the last processed event.
    pub fn view(&self) -> &RenderOutcome {
        &self.view
    }

    pub fn panel(&self) -> &ProvenancePanel {
        &self.panel
    }

    pub fn dispatch(&mut self, event: SelectionEvent) -> DispatchOutput {
        let outcome = reduce(&mut self.selection, event, &self.store, &self.catalog);
        if outcome.changed {
            self.view = render_selection(&self.store, &self.selection);
        }
        DispatchOutput {
            changed: outcome.changed,
            needs_render: outcome.changed,
            rejected: outcome.rejected,
        }
    }

    /// Apply events in order and return each output.
    pub fn dispatch_all(&mut self, events: impl IntoIterator<Item = SelectionEvent>) -> Vec<DispatchOutput> {
        events.into_iter().map(|e| self.dispatch(e)).collect()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        search_hits(self.store.records(), query, &self.selection)
    }

    pub fn search_fields(&self, query: &str) -> Vec<&str> {
        filter_fields(self.catalog.fields(), query)
    }

    pub fn open_sources(&mut self, record: &str, field: &str) -> Option<&Inspection> {
        self.panel.open(&self.provenance, record, field)
    }

    pub fn close_sources(&mut self) {
        self.panel.close();
    }

    /// Export the current view. Logos are only used when the grid has a
    /// logo column.
    pub fn export(
        &self,
        format: ExportFormat,
        view_name: &str,
        date: NaiveDate,
        logos: &HashMap<String, LogoImage>,
    ) -> Result<ExportArtifact, ExportError> {
        Exporter::export_outcome(&self.view, format, view_name, date, logos)
    }

    /// Export the current view with a logo column, fetching logos first.
    pub async fn export_with_logos(
        &self,
        format: ExportFormat,
        view_name: &str,
        date: NaiveDate,
        source: &dyn LogoSource,
    ) -> Result<ExportArtifact, ExportError> {
        let grid = self.view.grid().ok_or(ExportError::NothingToExport)?;
        Exporter::export_with_source(&grid.clone().with_logo_column(), format, view_name, date, source).await
    }
}
