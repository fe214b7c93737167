//! Slide deck export: one 10 x 7.5in slide with a title, the grid as a
//! table, logos laid over the logo column and a dated footer.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::ooxml::{
    content_types, escape, inches, Package, Relationships, NS_DOC_RELS, NS_DRAWING, REL_IMAGE,
    REL_OFFICE_DOCUMENT, XML_DECL,
};
use super::ExportError;
use crate::logo::{ImageFormat, LogoImage};
use crate::render::Grid;

const NS_PML: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

const CT_PRESENTATION: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_MASTER: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

// Layout, in inches.
pub const SLIDE_WIDTH: f64 = 10.0;
pub const SLIDE_HEIGHT: f64 = 7.5;
pub const MARGIN: f64 = 0.5;
pub const TITLE_Y: f64 = 0.4;
pub const TITLE_HEIGHT: f64 = 0.6;
pub const TABLE_Y: f64 = 1.2;
pub const TABLE_WIDTH: f64 = 9.0;
pub const LOGO_COLUMN_WIDTH: f64 = 1.0;
pub const NAME_COLUMN_WIDTH: f64 = 2.0;
pub const ROW_HEIGHT: f64 = 0.5;
pub const LOGO_SIZE: f64 = 0.35;
pub const FOOTER_Y: f64 = 7.0;
pub const FOOTER_HEIGHT: f64 = 0.3;

const TITLE_PT: u32 = 24;
const HEADER_PT: u32 = 11;
const BODY_PT: u32 = 10;
const FOOTER_PT: u32 = 9;

const BLACK: &str = "000000";
const WHITE: &str = "FFFFFF";
const BAND: &str = "F9FAFB";
const BORDER: &str = "D1D5DB";
const FOOTER_GREY: &str = "666666";
const FONT: &str = "Arial";

/// Column widths in EMU. The logo column and the first text column get
/// fixed widths; the rest share what is left of the table width. Integer
/// rounding lands on the last column so the sum is exact.
pub fn column_widths(grid: &Grid) -> Vec<i64> {
    let total = inches(TABLE_WIDTH);
    let n = grid.column_count();
    if n == 0 {
        return Vec::new();
    }

    let mut fixed: Vec<Option<i64>> = vec![None; n];
    if let Some(c) = grid.logo_column.filter(|c| *c < n) {
        fixed[c] = Some(inches(LOGO_COLUMN_WIDTH));
    }
    if let Some(c) = (0..n).find(|c| grid.logo_column != Some(*c)) {
        fixed[c] = Some(inches(NAME_COLUMN_WIDTH));
    }

    let flexible = fixed.iter().filter(|w| w.is_none()).count() as i64;
    let used: i64 = fixed.iter().flatten().sum();
    let share = if flexible > 0 { (total - used).max(0) / flexible } else { 0 };

    let mut widths: Vec<i64> = fixed.iter().map(|w| w.unwrap_or(share)).collect();
    let sum: i64 = widths.iter().sum();
    if let Some(last) = widths.last_mut() {
        *last += total - sum;
    }
    widths
}

fn run_props(pt: u32, bold: bool, color: &str) -> String {
    format!(
        r#"<a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{}"/></a:rPr>"#,
        pt * 100,
        if bold { 1 } else { 0 },
        color,
        FONT
    )
}

/// One paragraph per line of `text`.
fn paragraphs(text: &str, pt: u32, bold: bool, color: &str, align: &str) -> String {
    let mut xml = String::new();
    for line in text.split('\n') {
        xml.push_str(&format!(r#"<a:p><a:pPr algn="{}"/>"#, align));
        if line.is_empty() {
            xml.push_str(&format!(r#"<a:endParaRPr lang="en-US" sz="{}"/>"#, pt * 100));
        } else {
            xml.push_str(&format!(
                "<a:r>{}<a:t>{}</a:t></a:r>",
                run_props(pt, bold, color),
                escape(line)
            ));
        }
        xml.push_str("</a:p>");
    }
    xml
}

fn text_box(id: usize, name: &str, pos: (f64, f64, f64, f64), body: &str, anchor: &str) -> String {
    let (x, y, w, h) = pos;
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{anchor}"/><a:lstStyle/>{body}</p:txBody></p:sp>"#
        ),
        id = id,
        name = name,
        x = inches(x),
        y = inches(y),
        w = inches(w),
        h = inches(h),
        anchor = anchor,
        body = body,
    )
}

fn table_cell(text: &str, header: bool, fill: &str) -> String {
    let (pt, color) = if header { (HEADER_PT, WHITE) } else { (BODY_PT, BLACK) };
    let line = |tag: &str| {
        format!(
            r#"<a:{tag} w="6350"><a:solidFill><a:srgbClr val="{c}"/></a:solidFill></a:{tag}>"#,
            tag = tag,
            c = BORDER
        )
    };
    format!(
        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr marL="91440" marR="91440" marT="91440" marB="91440" anchor="ctr">{}{}{}{}<a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:tcPr></a:tc>"#,
        paragraphs(text, pt, header, color, "l"),
        line("lnL"),
        line("lnR"),
        line("lnT"),
        line("lnB"),
        fill
    )
}

fn table_frame(grid: &Grid, widths: &[i64]) -> String {
    let row_h = inches(ROW_HEIGHT);
    let rows = grid.row_count() as i64 + 1;
    let mut xml = format!(
        concat!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Table"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>"#,
            r#"<p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></p:xfrm>"#,
            r#"<a:graphic><a:graphicData uri="{uri}"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>"#
        ),
        x = inches(MARGIN),
        y = inches(TABLE_Y),
        w = inches(TABLE_WIDTH),
        h = row_h * rows,
        uri = NS_TABLE,
    );
    for w in widths {
        xml.push_str(&format!(r#"<a:gridCol w="{}"/>"#, w));
    }
    xml.push_str("</a:tblGrid>");

    xml.push_str(&format!(r#"<a:tr h="{}">"#, row_h));
    for (c, header) in grid.headers.iter().enumerate() {
        let text = if grid.logo_column == Some(c) { "" } else { header.as_str() };
        xml.push_str(&table_cell(text, true, BLACK));
    }
    xml.push_str("</a:tr>");

    for (i, row) in grid.rows.iter().enumerate() {
        let fill = if i % 2 == 0 { WHITE } else { BAND };
        xml.push_str(&format!(r#"<a:tr h="{}">"#, row_h));
        for cell in &row.cells {
            xml.push_str(&table_cell(&cell.value, false, fill));
        }
        xml.push_str("</a:tr>");
    }
    xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
    xml
}

fn picture(id: usize, name: &str, rel: &str, x: i64, y: i64, size: i64) -> String {
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Logo {name}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{size}" cy="{size}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
        ),
        id = id,
        name = escape(name),
        rel = rel,
        x = x,
        y = y,
        size = size,
    )
}

/// "Generated on 5/1/2024".
pub fn footer_text(date: NaiveDate) -> String {
    format!("Generated on {}", date.format("%-m/%-d/%Y"))
}

fn slide_xml(grid: &Grid, view_name: &str, date: NaiveDate, logos: &[(usize, String)]) -> String {
    let widths = column_widths(grid);
    let content_w = SLIDE_WIDTH - 2.0 * MARGIN;

    let mut xml = format!(
        r#"{}<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
        XML_DECL, NS_DRAWING, NS_DOC_RELS, NS_PML
    );
    xml.push_str(&text_box(
        2,
        "Title",
        (MARGIN, TITLE_Y, content_w, TITLE_HEIGHT),
        &paragraphs(view_name, TITLE_PT, true, BLACK, "l"),
        "ctr",
    ));
    xml.push_str(&table_frame(grid, &widths));

    if let Some(logo_col) = grid.logo_column {
        let col_x = inches(MARGIN) + widths.iter().take(logo_col).sum::<i64>();
        let col_w = widths.get(logo_col).copied().unwrap_or(0);
        let size = inches(LOGO_SIZE);
        let row_h = inches(ROW_HEIGHT);
        let mut shape_id = 3;
        for (row_idx, rel) in logos {
            shape_id += 1;
            let row_y = inches(TABLE_Y) + row_h * (*row_idx as i64 + 1);
            let key = grid.rows.get(*row_idx).map(|r| r.key.as_str()).unwrap_or_default();
            xml.push_str(&picture(
                shape_id,
                key,
                rel,
                col_x + (col_w - size) / 2,
                row_y + (row_h - size) / 2,
                size,
            ));
        }
    }

    let footer_id = 4 + logos.len();
    xml.push_str(&text_box(
        footer_id,
        "Footer",
        (MARGIN, FOOTER_Y, content_w, FOOTER_HEIGHT),
        &paragraphs(&footer_text(date), FOOTER_PT, false, FOOTER_GREY, "r"),
        "t",
    ));
    xml.push_str(r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#);
    xml
}

fn presentation_xml() -> String {
    format!(
        concat!(
            r#"{decl}<p:presentation xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" saveSubsetFonts="1">"#,
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            r#"<p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst>"#,
            r#"<p:sldSz cx="{w}" cy="{h}"/><p:notesSz cx="{h}" cy="{w}"/>"#,
            r#"</p:presentation>"#
        ),
        decl = XML_DECL,
        a = NS_DRAWING,
        r = NS_DOC_RELS,
        p = NS_PML,
        w = inches(SLIDE_WIDTH),
        h = inches(SLIDE_HEIGHT),
    )
}

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>"#;

fn slide_master_xml() -> String {
    format!(
        concat!(
            r#"{decl}<p:sldMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}"><p:cSld>{tree}</p:cSld>"#,
            r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
        ),
        decl = XML_DECL,
        a = NS_DRAWING,
        r = NS_DOC_RELS,
        p = NS_PML,
        tree = EMPTY_TREE,
    )
}

fn slide_layout_xml() -> String {
    format!(
        r#"{decl}<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="blank" preserve="1"><p:cSld name="Blank">{tree}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        decl = XML_DECL,
        a = NS_DRAWING,
        r = NS_DOC_RELS,
        p = NS_PML,
        tree = EMPTY_TREE,
    )
}

fn theme_xml() -> String {
    let sys = |name: &str, val: &str, last: &str| {
        format!(r#"<a:{n}><a:sysClr val="{v}" lastClr="{l}"/></a:{n}>"#, n = name, v = val, l = last)
    };
    let rgb = |name: &str, val: &str| format!(r#"<a:{n}><a:srgbClr val="{v}"/></a:{n}>"#, n = name, v = val);
    let colors = [
        sys("dk1", "windowText", BLACK),
        sys("lt1", "window", WHITE),
        rgb("dk2", "1F2937"),
        rgb("lt2", "F3F4F6"),
        rgb("accent1", "2563EB"),
        rgb("accent2", "059669"),
        rgb("accent3", "D97706"),
        rgb("accent4", "DC2626"),
        rgb("accent5", "7C3AED"),
        rgb("accent6", "0891B2"),
        rgb("hlink", "2563EB"),
        rgb("folHlink", "7C3AED"),
    ]
    .concat();
    let font = format!(r#"<a:latin typeface="{f}"/><a:ea typeface=""/><a:cs typeface=""/>"#, f = FONT);
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="6350">{}</a:ln>"#, solid);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";

    format!(
        concat!(
            r#"{decl}<a:theme xmlns:a="{a}" name="Office Theme"><a:themeElements>"#,
            r#"<a:clrScheme name="Office">{colors}</a:clrScheme>"#,
            r#"<a:fontScheme name="Office"><a:majorFont>{font}</a:majorFont><a:minorFont>{font}</a:minorFont></a:fontScheme>"#,
            r#"<a:fmtScheme name="Office">"#,
            r#"<a:fillStyleLst>{s}{s}{s}</a:fillStyleLst>"#,
            r#"<a:lnStyleLst>{l}{l}{l}</a:lnStyleLst>"#,
            r#"<a:effectStyleLst>{e}{e}{e}</a:effectStyleLst>"#,
            r#"<a:bgFillStyleLst>{s}{s}{s}</a:bgFillStyleLst>"#,
            r#"</a:fmtScheme></a:themeElements></a:theme>"#
        ),
        decl = XML_DECL,
        a = NS_DRAWING,
        colors = colors,
        font = font,
        s = solid,
        l = line,
        e = effect,
    )
}

/// Build the presentation bytes.
pub fn build(
    grid: &Grid,
    view_name: &str,
    date: NaiveDate,
    logos: &HashMap<String, LogoImage>,
) -> Result<Vec<u8>, ExportError> {
    let mut slide_rels = Relationships::new();
    slide_rels.push(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");

    // One media part per distinct ticker; every row showing it shares the rel.
    let mut media: Vec<(&str, &LogoImage, String)> = Vec::new();
    let mut placed: Vec<(usize, String)> = Vec::new();
    if grid.logo_column.is_some() {
        for (i, row) in grid.rows.iter().enumerate() {
            let Some(ticker) = row.logo_ticker.as_deref() else {
                continue;
            };
            let Some(image) = logos.get(ticker) else {
                continue;
            };
            let rel = match media.iter().find(|(t, _, _)| *t == ticker) {
                Some((_, _, rel)) => rel.clone(),
                None => {
                    let target = format!("../media/image{}.{}", media.len() + 1, image.format.extension());
                    let rel = slide_rels.push(REL_IMAGE, &target);
                    media.push((ticker, image, rel.clone()));
                    rel
                }
            };
            placed.push((i, rel));
        }
    }
    let formats: Vec<ImageFormat> = media.iter().map(|(_, img, _)| img.format).collect();

    let overrides = [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        ("/ppt/slides/slide1.xml", CT_SLIDE),
        ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml", CT_THEME),
    ];

    let mut root_rels = Relationships::new();
    root_rels.push(REL_OFFICE_DOCUMENT, "ppt/presentation.xml");

    let mut pres_rels = Relationships::new();
    pres_rels.push(REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml");
    pres_rels.push(REL_SLIDE, "slides/slide1.xml");
    pres_rels.push(REL_THEME, "theme/theme1.xml");

    let mut master_rels = Relationships::new();
    master_rels.push(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
    master_rels.push(REL_THEME, "../theme/theme1.xml");

    let mut layout_rels = Relationships::new();
    layout_rels.push(REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml");

    let mut pkg = Package::new();
    pkg.add_xml("[Content_Types].xml", &content_types(&formats, &overrides))?;
    pkg.add_xml("_rels/.rels", &root_rels.to_xml())?;
    pkg.add_xml("ppt/presentation.xml", &presentation_xml())?;
    pkg.add_xml("ppt/_rels/presentation.xml.rels", &pres_rels.to_xml())?;
    pkg.add_xml("ppt/slideMasters/slideMaster1.xml", &slide_master_xml())?;
    pkg.add_xml("ppt/slideMasters/_rels/slideMaster1.xml.rels", &master_rels.to_xml())?;
    pkg.add_xml("ppt/slideLayouts/slideLayout1.xml", &slide_layout_xml())?;
    pkg.add_xml("ppt/slideLayouts/_rels/slideLayout1.xml.rels", &layout_rels.to_xml())?;
    pkg.add_xml("ppt/theme/theme1.xml", &theme_xml())?;
    pkg.add_xml("ppt/slides/slide1.xml", &slide_xml(grid, view_name, date, &placed))?;
    pkg.add_xml("ppt/slides/_rels/slide1.xml.rels", &slide_rels.to_xml())?;
    for (i, (_, image, _)) in media.iter().enumerate() {
        pkg.add(&format!("ppt/media/image{}.{}", i + 1, image.format.extension()), &image.bytes)?;
    }
    pkg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Cell, GridRow};

    fn comps_grid(metrics: usize) -> Grid {
        let mut headers = vec!["Company Logo".to_string(), "Company Name".to_string()];
        headers.extend((0..metrics).map(|i| format!("Metric {}", i)));
        Grid {
            headers,
            rows: vec![GridRow {
                key: "Rubrik".into(),
                logo_ticker: Some("RBRK".into()),
                cells: std::iter::once(Cell::default())
                    .chain(std::iter::once(Cell::plain("Rubrik")))
                    .chain((0..metrics).map(|_| Cell::plain("-")))
                    .collect(),
            }],
            pinned_first_column: true,
            logo_column: Some(0),
        }
    }

    #[test]
    fn test_widths_fill_table() {
        let widths = column_widths(&comps_grid(3));
        assert_eq!(widths[0], inches(1.0));
        assert_eq!(widths[1], inches(2.0));
        assert_eq!(widths.iter().sum::<i64>(), inches(TABLE_WIDTH));
        assert_eq!(widths[2], inches(2.0));
    }

    #[test]
    fn test_widths_without_logo_column() {
        let grid = Grid {
            headers: vec!["Company Name".into()],
            ..Default::default()
        };
        assert_eq!(column_widths(&grid), vec![inches(TABLE_WIDTH)]);
    }

    #[test]
    fn test_footer_text() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(footer_text(d), "Generated on 5/1/2024");
    }

    #[test]
    fn test_slide_contains_title_table_and_footer() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let xml = slide_xml(&comps_grid(1), "SaaS IPOs & Co", d, &[(0, "rId2".to_string())]);
        assert!(xml.contains("<a:t>SaaS IPOs &amp; Co</a:t>"));
        assert!(xml.contains("<a:t>Rubrik</a:t>"));
        assert!(xml.contains("<a:t>Generated on 5/1/2024</a:t>"));
        assert!(xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        // header row plus one data row
        assert_eq!(xml.matches("<a:tr ").count(), 2);
    }
}
