use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::Value;

use ipocomps::app::App;
use ipocomps::comps::CompsModel;
use ipocomps::config::Config;
use ipocomps::export::{ExportError, ExportFormat, Exporter};
use ipocomps::logging::{log, obj, v_str, Domain, Level};
use ipocomps::logo::{LogoDevClient, LogoSource, NullLogoSource};
use ipocomps::record::RecordStore;
use ipocomps::search::{filter_views, highlight};
use ipocomps::selection::{Rejected, SelectionEvent};

#[derive(Parser)]
#[command(name = "ipocomps")]
#[command(about = "Browse, compare and export IPO filing records")]
struct Cli {
    /// Records document (JSON list)
    #[arg(long, env = "IPO_DATA_PATH")]
    data: Option<PathBuf>,

    /// Comps document; derived from the records when absent
    #[arg(long, env = "COMPS_PATH")]
    comps: Option<PathBuf>,

    /// Company to select (repeatable)
    #[arg(short = 'c', long = "company", global = true)]
    companies: Vec<String>,

    /// Field to select (repeatable)
    #[arg(short = 'f', long = "field", global = true)]
    fields: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every field in catalog order
    Fields,
    /// Search companies by name, ticker, exchange, date or bookrunner
    Search { query: String },
    /// Filter the field list
    Columns { query: String },
    /// Print the table for the current selection
    Table,
    /// Show the sources behind one cell
    Sources { company: String, field: String },
    /// Search the named comps views
    Views { query: String },
    /// Export the current selection
    Export {
        /// csv, xlsx or pptx
        format: ExportFormat,
        /// Title and filename stem
        #[arg(long, env = "VIEW_NAME")]
        view: Option<String>,
        /// Output directory
        #[arg(long, env = "EXPORT_DIR")]
        out: Option<PathBuf>,
        /// Export the full comps grid instead of the selection
        #[arg(long)]
        all_comps: bool,
        /// Add a logo column to the selection grid
        #[arg(long)]
        logos: bool,
    },
}

fn logo_source(cfg: &Config) -> Result<Box<dyn LogoSource>> {
    match &cfg.logo_token {
        Some(token) => {
            log(
                Level::Info,
                Domain::Logo,
                "logo_source",
                obj(&[("type", v_str("logo.dev")), ("base", v_str(&cfg.logo_base))]),
            );
            Ok(Box::new(LogoDevClient::new(&cfg.logo_base, token, cfg.logo_timeout())?))
        }
        None => Ok(Box::new(NullLogoSource)),
    }
}

fn apply_selection(app: &mut App, companies: &[String], fields: &[String]) {
    let events = companies
        .iter()
        .map(|c| SelectionEvent::AddRecord(c.clone()))
        .chain(fields.iter().map(|f| SelectionEvent::ToggleField {
            name: f.clone(),
            on: true,
        }));
    for out in app.dispatch_all(events) {
        match out.rejected {
            Some(Rejected::UnknownRecord(key)) => eprintln!("warning: unknown company {:?}", key),
            Some(Rejected::UnknownField(name)) => eprintln!("warning: unknown field {:?}", name),
            None => {}
        }
    }
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::from_env();
    if let Some(data) = cli.data {
        cfg.data_path = data;
    }
    if let Some(comps) = cli.comps {
        cfg.comps_path = Some(comps);
    }

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("data", v_str(&cfg.data_path.display().to_string())),
            ("comps", cfg.comps_path.as_ref().map(|p| v_str(&p.display().to_string())).unwrap_or_default()),
            ("logos", Value::Bool(cfg.logo_token.is_some())),
        ]),
    );

    let store = RecordStore::load_file(&cfg.data_path).unwrap_or_else(|e| fail(e));
    let comps = match &cfg.comps_path {
        Some(path) => Some(CompsModel::load_file(path).unwrap_or_else(|e| fail(e))),
        None => None,
    };
    let mut app = App::new(store, comps);
    apply_selection(&mut app, &cli.companies, &cli.fields);

    match cli.command {
        Command::Fields => {
            for field in app.catalog().fields() {
                println!("{}", field);
            }
        }
        Command::Search { query } => {
            let hits = app.search(&query);
            if hits.is_empty() {
                println!("No companies found");
            }
            for hit in hits {
                let name: String = highlight(hit.record.key(), &query)
                    .iter()
                    .map(|s| if s.matched { format!("[{}]", s.text) } else { s.text.to_string() })
                    .collect();
                let marker = if hit.already_selected { "*" } else { " " };
                let ticker = hit.record.ticker().unwrap_or("-");
                let exchange = hit.record.exchange.as_deref().unwrap_or("-");
                println!("{} {} ({}, {})", marker, name, ticker, exchange);
            }
        }
        Command::Columns { query } => {
            for field in app.search_fields(&query) {
                let marker = if app.selection().has_field(field) { "*" } else { " " };
                println!("{} {}", marker, field);
            }
        }
        Command::Table => match app.view().grid() {
            Some(grid) => print!("{}", grid.to_annotated_text()),
            None => println!("Select companies and fields to build the table"),
        },
        Command::Sources { company, field } => {
            // No registered value means nothing to show.
            if let Some(insp) = app.open_sources(&company, &field) {
                println!("{} / {}: {}", insp.record, insp.field, insp.value);
                let types: Vec<&str> = insp.source_types().iter().map(|t| t.as_str()).collect();
                if types.is_empty() {
                    println!("{}", insp.summary());
                } else {
                    println!("{} ({})", insp.summary(), types.join(", "));
                }
                for c in &insp.citations {
                    println!(
                        "- [{}] {}: {} ({}){}",
                        c.source_type.as_str(),
                        c.name,
                        c.value,
                        c.display_date(),
                        c.url.as_deref().map(|u| format!(" {}", u)).unwrap_or_default()
                    );
                }
            }
        }
        Command::Views { query } => {
            for view in filter_views(&app.comps().views, &query) {
                println!(
                    "{}  {} [{}] {} companies, {} metrics\n    {}",
                    view.id, view.name, view.category, view.company_count, view.metric_count, view.description
                );
            }
        }
        Command::Export {
            format,
            view,
            out,
            all_comps,
            logos,
        } => {
            let view_name = view.unwrap_or_else(|| cfg.view_name.clone());
            let dir = out.unwrap_or_else(|| cfg.export_dir.clone());
            let date = Local::now().date_naive();
            let source = logo_source(&cfg)?;

            let result = if all_comps {
                match app.comps().full_grid().grid() {
                    Some(grid) => Exporter::export_with_source(grid, format, &view_name, date, source.as_ref()).await,
                    None => Err(ExportError::NothingToExport),
                }
            } else if logos {
                app.export_with_logos(format, &view_name, date, source.as_ref()).await
            } else {
                app.export(format, &view_name, date, &Default::default())
            };

            let artifact = result.unwrap_or_else(|e| fail(e));
            let path = artifact.save(&dir).unwrap_or_else(|e| fail(e));
            println!("{}", path.display());
        }
    }
    Ok(())
}
