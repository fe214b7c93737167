//! Package-level checks on the spreadsheet and slide deck exports: the
//! expected parts exist, text lands where it should, and logos embed.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use ipocomps::comps::CompsModel;
use ipocomps::export::{ExportFormat, Exporter};
use ipocomps::logo::{LogoImage, LogoSource, StaticLogoSource};
use ipocomps::render::Grid;
use zip::ZipArchive;

const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn comps_grid() -> Grid {
    let model = CompsModel::load_file(Path::new("data/comps.json")).unwrap();
    model.full_grid().grid().cloned().unwrap()
}

fn png() -> LogoImage {
    LogoImage::sniff(PNG.to_vec()).unwrap()
}

fn open(bytes: &[u8]) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip")
}

fn part(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut file = archive.by_name(name).unwrap_or_else(|e| panic!("missing {}: {}", name, e));
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

fn names(archive: &ZipArchive<Cursor<Vec<u8>>>) -> Vec<String> {
    archive.file_names().map(str::to_string).collect()
}

struct FlakySource;

#[async_trait]
impl LogoSource for FlakySource {
    async fn fetch(&self, ticker: &str) -> Result<Option<LogoImage>> {
        match ticker {
            "RBRK" => Ok(Some(LogoImage::sniff(PNG.to_vec()).unwrap())),
            _ => Err(anyhow!("timed out")),
        }
    }
}

#[test]
fn spreadsheet_has_named_sheet_and_cell_text() {
    let artifact = Exporter::export(
        &comps_grid(),
        ExportFormat::Spreadsheet,
        "SaaS IPOs 2024",
        date(),
        &HashMap::new(),
    )
    .unwrap();
    assert_eq!(artifact.filename, "SaaS_IPOs_2024_2024-05-01.xlsx");

    let mut zip = open(&artifact.bytes);
    let parts = names(&zip);
    for expected in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/worksheets/sheet1.xml",
    ] {
        assert!(parts.iter().any(|p| p == expected), "missing {}", expected);
    }
    assert!(!parts.iter().any(|p| p.starts_with("xl/media/")));

    assert!(part(&mut zip, "xl/workbook.xml").contains(r#"<sheet name="SaaS IPOs 2024""#));

    let sheet = part(&mut zip, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(">Company Name<"));
    assert!(sheet.contains(">Revenue (M)<"));
    assert!(sheet.contains(">$628M<"));
    assert!(sheet.contains(">2,013<"));
    assert!(sheet.contains(r#"<col min="1" max="1" width="12" customWidth="1"/>"#));
    assert!(sheet.contains(r#"<row r="2" ht="40" customHeight="1">"#));
    // The logo column header stays blank.
    assert!(!sheet.contains(">Company Logo<"));
}

#[test]
fn spreadsheet_embeds_logos_per_ticker() {
    let mut logos = HashMap::new();
    logos.insert("RBRK".to_string(), png());
    let artifact = Exporter::export(&comps_grid(), ExportFormat::Spreadsheet, "Comps", date(), &logos).unwrap();

    let mut zip = open(&artifact.bytes);
    let parts = names(&zip);
    assert!(parts.iter().any(|p| p == "xl/media/image1.png"));
    assert!(!parts.iter().any(|p| p == "xl/media/image2.png"));

    let drawing = part(&mut zip, "xl/drawings/drawing1.xml");
    assert_eq!(drawing.matches("<xdr:pic>").count(), 1);
    assert!(drawing.contains("<xdr:row>1</xdr:row>"));
    assert!(part(&mut zip, "[Content_Types].xml").contains(r#"Extension="png""#));
    assert!(part(&mut zip, "xl/worksheets/sheet1.xml").contains(r#"<drawing r:id="rId1"/>"#));
}

#[test]
fn slide_deck_has_title_table_and_footer() {
    let artifact = Exporter::export(
        &comps_grid(),
        ExportFormat::SlideDeck,
        "SaaS IPOs 2024",
        date(),
        &HashMap::new(),
    )
    .unwrap();
    assert_eq!(artifact.filename, "SaaS_IPOs_2024_2024-05-01.pptx");

    let mut zip = open(&artifact.bytes);
    let parts = names(&zip);
    for expected in [
        "ppt/presentation.xml",
        "ppt/slides/slide1.xml",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/theme/theme1.xml",
    ] {
        assert!(parts.iter().any(|p| p == expected), "missing {}", expected);
    }

    let slide = part(&mut zip, "ppt/slides/slide1.xml");
    assert!(slide.contains("<a:t>SaaS IPOs 2024</a:t>"));
    assert!(slide.contains("<a:t>Revenue (M)</a:t>"));
    assert!(slide.contains("<a:t>$804M</a:t>"));
    assert!(slide.contains("<a:t>Generated on 5/1/2024</a:t>"));
    assert_eq!(slide.matches("<a:tr ").count(), 3);
    assert!(!slide.contains("<p:pic>"));

    let pres = part(&mut zip, "ppt/presentation.xml");
    assert!(pres.contains(r#"<p:sldSz cx="9144000" cy="6858000"/>"#));
}

#[tokio::test]
async fn failing_logo_fetch_does_not_abort_export() {
    let grid = comps_grid();
    let artifact = Exporter::export_with_source(&grid, ExportFormat::SlideDeck, "Comps", date(), &FlakySource)
        .await
        .unwrap();

    let mut zip = open(&artifact.bytes);
    let slide = part(&mut zip, "ppt/slides/slide1.xml");
    assert_eq!(slide.matches("<p:pic>").count(), 1);
    assert!(slide.contains(r#"name="Logo Rubrik""#));
    assert!(names(&zip).iter().any(|p| p == "ppt/media/image1.png"));
}

#[tokio::test]
async fn csv_never_fetches_logos() {
    struct Panicking;

    #[async_trait]
    impl LogoSource for Panicking {
        async fn fetch(&self, _ticker: &str) -> Result<Option<LogoImage>> {
            panic!("csv export should not fetch logos");
        }
    }

    let artifact = Exporter::export_with_source(&comps_grid(), ExportFormat::Csv, "Comps", date(), &Panicking)
        .await
        .unwrap();
    let text = String::from_utf8(artifact.bytes).unwrap();
    assert!(text.starts_with("Company Logo,Company Name,Revenue (M),Employees,YoY Growth,Valuation (B),Total Funding (M)\n"));
    assert!(text.contains("\n,Rubrik,$628M,\"3,452\",+41%,$5.3B,$553M\n"));
}

#[tokio::test]
async fn static_source_fills_every_logo() {
    let source = StaticLogoSource::new().with("RBRK", png()).with("RDDT", png());
    let artifact = Exporter::export_with_source(&comps_grid(), ExportFormat::Spreadsheet, "Comps", date(), &source)
        .await
        .unwrap();
    let mut zip = open(&artifact.bytes);
    let drawing = part(&mut zip, "xl/drawings/drawing1.xml");
    assert_eq!(drawing.matches("<xdr:pic>").count(), 2);
}
