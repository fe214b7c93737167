//! Spreadsheet export: a single-sheet workbook with a styled header,
//! banded rows and logos anchored in the logo column.

use std::collections::HashMap;

use super::ooxml::{
    content_types, escape, Package, Relationships, EMU_PER_PX, NS_DOC_RELS, NS_DRAWING, REL_IMAGE,
    REL_OFFICE_DOCUMENT, XML_DECL,
};
use super::ExportError;
use crate::logo::{ImageFormat, LogoImage};
use crate::render::Grid;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_XDR: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";

const REL_WORKSHEET: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_DRAWING: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";

const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_DRAWING: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";

pub const LOGO_COLUMN_WIDTH: f64 = 12.0;
pub const FIRST_TEXT_COLUMN_WIDTH: f64 = 25.0;
pub const COLUMN_WIDTH: f64 = 20.0;
pub const HEADER_ROW_HEIGHT: f64 = 25.0;
pub const DATA_ROW_HEIGHT: f64 = 40.0;
pub const LOGO_PX: i64 = 50;
pub const MAX_SHEET_NAME: usize = 31;

// cellXfs indices in styles.xml
const STYLE_HEADER: usize = 1;
const STYLE_ROW: usize = 2;
const STYLE_ROW_BANDED: usize = 3;

/// Excel refuses `[]:*?/\` and names longer than 31 characters.
pub fn sheet_name(view_name: &str) -> String {
    let cleaned: String = view_name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let trimmed = cleaned.trim().trim_matches('\'').trim();
    if trimmed.is_empty() {
        "Sheet1".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn column_widths(grid: &Grid) -> Vec<f64> {
    let mut seen_text = false;
    (0..grid.column_count())
        .map(|i| {
            if grid.logo_column == Some(i) {
                LOGO_COLUMN_WIDTH
            } else if !seen_text {
                seen_text = true;
                FIRST_TEXT_COLUMN_WIDTH
            } else {
                COLUMN_WIDTH
            }
        })
        .collect()
}

/// One embedded picture per distinct ticker, shared by every row that
/// needs it.
struct Media<'a> {
    images: Vec<(&'a str, &'a LogoImage)>,
}

impl<'a> Media<'a> {
    fn collect(grid: &'a Grid, logos: &'a HashMap<String, LogoImage>) -> Self {
        let mut images: Vec<(&str, &LogoImage)> = Vec::new();
        if grid.logo_column.is_some() {
            for row in &grid.rows {
                let Some(ticker) = row.logo_ticker.as_deref() else {
                    continue;
                };
                if images.iter().any(|(t, _)| *t == ticker) {
                    continue;
                }
                if let Some(image) = logos.get(ticker) {
                    images.push((ticker, image));
                }
            }
        }
        Self { images }
    }

    fn index_of(&self, ticker: &str) -> Option<usize> {
        self.images.iter().position(|(t, _)| *t == ticker)
    }

    fn formats(&self) -> Vec<ImageFormat> {
        self.images.iter().map(|(_, img)| img.format).collect()
    }

    fn part_name(&self, i: usize) -> String {
        format!("image{}.{}", i + 1, self.images[i].1.format.extension())
    }

    fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn workbook_xml(sheet: &str) -> String {
    format!(
        r#"{}<workbook xmlns="{}" xmlns:r="{}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        XML_DECL,
        NS_MAIN,
        NS_DOC_RELS,
        escape(sheet)
    )
}

fn styles_xml() -> String {
    let border_side = |side: &str| {
        format!(r#"<{side} style="thin"><color rgb="FFD1D5DB"/></{side}>"#, side = side)
    };
    let thin = format!(
        "<border>{}{}{}{}<diagonal/></border>",
        border_side("left"),
        border_side("right"),
        border_side("top"),
        border_side("bottom")
    );
    let solid = |rgb: &str| {
        format!(
            r#"<fill><patternFill patternType="solid"><fgColor rgb="{}"/><bgColor indexed="64"/></patternFill></fill>"#,
            rgb
        )
    };
    let xf = |font: usize, fill: usize| {
        format!(
            r#"<xf numFmtId="0" fontId="{}" fillId="{}" borderId="1" xfId="0" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="left" vertical="center" wrapText="1"/></xf>"#,
            font, fill
        )
    };

    format!(
        concat!(
            r#"{decl}<styleSheet xmlns="{ns}">"#,
            r#"<fonts count="3">"#,
            r#"<font><sz val="11"/><name val="Calibri"/></font>"#,
            r#"<font><b/><sz val="12"/><color rgb="FFFFFFFF"/><name val="Arial"/></font>"#,
            r#"<font><sz val="11"/><color rgb="FF000000"/><name val="Arial"/></font>"#,
            r#"</fonts>"#,
            r#"<fills count="5"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill>{black}{white}{band}</fills>"#,
            r#"<borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border>{thin}</borders>"#,
            r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
            r#"<cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>{header}{row}{banded}</cellXfs>"#,
            r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
            r#"</styleSheet>"#
        ),
        decl = XML_DECL,
        ns = NS_MAIN,
        black = solid("FF000000"),
        white = solid("FFFFFFFF"),
        band = solid("FFF9FAFB"),
        thin = thin,
        header = xf(1, 2),
        row = xf(2, 3),
        banded = xf(2, 4),
    )
}

fn cell_xml(col: usize, row: usize, style: usize, text: &str) -> String {
    let r = format!("{}{}", column_letter(col), row);
    if text.is_empty() {
        return format!(r#"<c r="{}" s="{}"/>"#, r, style);
    }
    format!(
        r#"<c r="{}" s="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        r,
        style,
        escape(text)
    )
}

fn sheet_xml(grid: &Grid, has_drawing: bool) -> String {
    let mut xml = format!(r#"{}<worksheet xmlns="{}" xmlns:r="{}">"#, XML_DECL, NS_MAIN, NS_DOC_RELS);

    // Freeze the header row, plus the first column when pinned.
    xml.push_str(r#"<sheetViews><sheetView workbookViewId="0">"#);
    if grid.pinned_first_column {
        xml.push_str(r#"<pane xSplit="1" ySplit="1" topLeftCell="B2" activePane="bottomRight" state="frozen"/>"#);
    } else {
        xml.push_str(r#"<pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/>"#);
    }
    xml.push_str("</sheetView></sheetViews>");
    xml.push_str(r#"<sheetFormatPr defaultRowHeight="15"/>"#);

    xml.push_str("<cols>");
    for (i, w) in column_widths(grid).iter().enumerate() {
        xml.push_str(&format!(
            r#"<col min="{n}" max="{n}" width="{w}" customWidth="1"/>"#,
            n = i + 1,
            w = w
        ));
    }
    xml.push_str("</cols><sheetData>");

    xml.push_str(&format!(r#"<row r="1" ht="{}" customHeight="1">"#, HEADER_ROW_HEIGHT));
    for (c, header) in grid.headers.iter().enumerate() {
        let text = if grid.logo_column == Some(c) { "" } else { header.as_str() };
        xml.push_str(&cell_xml(c, 1, STYLE_HEADER, text));
    }
    xml.push_str("</row>");

    for (i, row) in grid.rows.iter().enumerate() {
        let r = i + 2;
        let style = if i % 2 == 0 { STYLE_ROW } else { STYLE_ROW_BANDED };
        xml.push_str(&format!(r#"<row r="{}" ht="{}" customHeight="1">"#, r, DATA_ROW_HEIGHT));
        for (c, cell) in row.cells.iter().enumerate() {
            xml.push_str(&cell_xml(c, r, style, &cell.value));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if has_drawing {
        xml.push_str(r#"<drawing r:id="rId1"/>"#);
    }
    xml.push_str("</worksheet>");
    xml
}

fn drawing_xml(grid: &Grid, media: &Media<'_>, rel_ids: &[String]) -> String {
    let mut xml = format!(
        r#"{}<xdr:wsDr xmlns:xdr="{}" xmlns:a="{}" xmlns:r="{}">"#,
        XML_DECL, NS_XDR, NS_DRAWING, NS_DOC_RELS
    );
    let Some(logo_col) = grid.logo_column else {
        xml.push_str("</xdr:wsDr>");
        return xml;
    };
    let size = LOGO_PX * EMU_PER_PX;
    let mut shape_id = 1;
    for (i, row) in grid.rows.iter().enumerate() {
        let Some(media_idx) = row.logo_ticker.as_deref().and_then(|t| media.index_of(t)) else {
            continue;
        };
        shape_id += 1;
        xml.push_str(&format!(
            concat!(
                r#"<xdr:oneCellAnchor><xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>"#,
                r#"<xdr:ext cx="{size}" cy="{size}"/>"#,
                r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{id}" name="Logo {name}"/><xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr></xdr:nvPicPr>"#,
                r#"<xdr:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>"#,
                r#"<xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{size}" cy="{size}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr></xdr:pic>"#,
                r#"<xdr:clientData/></xdr:oneCellAnchor>"#
            ),
            col = logo_col,
            row = i + 1,
            size = size,
            id = shape_id,
            name = escape(&row.key),
            rel = rel_ids[media_idx],
        ));
    }
    xml.push_str("</xdr:wsDr>");
    xml
}

/// Build the workbook bytes.
pub fn build(grid: &Grid, view_name: &str, logos: &HashMap<String, LogoImage>) -> Result<Vec<u8>, ExportError> {
    let media = Media::collect(grid, logos);

    let mut overrides = vec![
        ("/xl/workbook.xml", CT_WORKBOOK),
        ("/xl/worksheets/sheet1.xml", CT_WORKSHEET),
        ("/xl/styles.xml", CT_STYLES),
    ];
    if !media.is_empty() {
        overrides.push(("/xl/drawings/drawing1.xml", CT_DRAWING));
    }

    let mut root_rels = Relationships::new();
    root_rels.push(REL_OFFICE_DOCUMENT, "xl/workbook.xml");

    let mut workbook_rels = Relationships::new();
    workbook_rels.push(REL_WORKSHEET, "worksheets/sheet1.xml");
    workbook_rels.push(REL_STYLES, "styles.xml");

    let mut pkg = Package::new();
    pkg.add_xml("[Content_Types].xml", &content_types(&media.formats(), &overrides))?;
    pkg.add_xml("_rels/.rels", &root_rels.to_xml())?;
    pkg.add_xml("xl/workbook.xml", &workbook_xml(&sheet_name(view_name)))?;
    pkg.add_xml("xl/_rels/workbook.xml.rels", &workbook_rels.to_xml())?;
    pkg.add_xml("xl/styles.xml", &styles_xml())?;
    pkg.add_xml("xl/worksheets/sheet1.xml", &sheet_xml(grid, !media.is_empty()))?;

    if !media.is_empty() {
        let mut sheet_rels = Relationships::new();
        sheet_rels.push(REL_DRAWING, "../drawings/drawing1.xml");
        pkg.add_xml("xl/worksheets/_rels/sheet1.xml.rels", &sheet_rels.to_xml())?;

        let mut drawing_rels = Relationships::new();
        let mut rel_ids = Vec::with_capacity(media.images.len());
        for i in 0..media.images.len() {
            let part = media.part_name(i);
            rel_ids.push(drawing_rels.push(REL_IMAGE, &format!("../media/{}", part)));
            pkg.add(&format!("xl/media/{}", part), &media.images[i].1.bytes)?;
        }
        pkg.add_xml("xl/drawings/drawing1.xml", &drawing_xml(grid, &media, &rel_ids))?;
        pkg.add_xml("xl/drawings/_rels/drawing1.xml.rels", &drawing_rels.to_xml())?;
    }

    pkg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Cell, GridRow};

    #[test]
    fn test_sheet_name() {
        assert_eq!(sheet_name("IPO Metrics Dashboard"), "IPO Metrics Dashboard");
        assert_eq!(sheet_name("Q1/Q2 [draft]"), "Q1Q2 draft");
        assert_eq!(sheet_name("Cloud Security and Infrastructure IPOs").chars().count(), 31);
        assert_eq!(sheet_name("???"), "Sheet1");
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_widths_follow_logo_column() {
        let mut grid = Grid {
            headers: vec!["Company Logo".into(), "Company Name".into(), "Revenue".into()],
            logo_column: Some(0),
            ..Default::default()
        };
        assert_eq!(column_widths(&grid), vec![12.0, 25.0, 20.0]);
        grid.logo_column = None;
        assert_eq!(column_widths(&grid), vec![25.0, 20.0, 20.0]);
    }

    #[test]
    fn test_sheet_rows_are_banded_and_escaped() {
        let grid = Grid {
            headers: vec!["Company Name".into(), "Lead Bookrunners".into()],
            rows: vec![
                GridRow {
                    key: "A".into(),
                    logo_ticker: None,
                    cells: vec![Cell::plain("A"), Cell::plain("Morgan Stanley & Co.")],
                },
                GridRow {
                    key: "B".into(),
                    logo_ticker: None,
                    cells: vec![Cell::plain("B"), Cell::plain("N/A")],
                },
            ],
            pinned_first_column: true,
            logo_column: None,
        };
        let xml = sheet_xml(&grid, false);
        assert!(xml.contains(r#"<row r="1" ht="25" customHeight="1">"#));
        assert!(xml.contains(r#"<c r="B2" s="2" t="inlineStr"><is><t xml:space="preserve">Morgan Stanley &amp; Co.</t></is></c>"#));
        assert!(xml.contains(r#"<c r="A3" s="3""#));
        assert!(!xml.contains("<drawing"));
    }
}
