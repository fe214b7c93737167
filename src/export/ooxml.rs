//! Shared plumbing for the Office Open XML writers: the zip package,
//! relationship parts, content types and text escaping.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ExportError;
use crate::logo::ImageFormat;

pub const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_DOC_RELS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// EMU per inch and per pixel at 96 dpi.
pub const EMU_PER_INCH: i64 = 914_400;
pub const EMU_PER_PX: i64 = 9_525;

pub fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64).round() as i64
}

/// A zip archive built in memory.
pub struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl Package {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub fn add(&mut self, path: &str, contents: &[u8]) -> Result<(), ExportError> {
        self.zip.start_file(path, self.options)?;
        self.zip.write_all(contents)?;
        Ok(())
    }

    pub fn add_xml(&mut self, path: &str, xml: &str) -> Result<(), ExportError> {
        self.add(path, xml.as_bytes())
    }

    pub fn finish(self) -> Result<Vec<u8>, ExportError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Relationship part under construction; ids are handed out in order.
#[derive(Debug, Default)]
pub struct Relationships {
    items: Vec<(String, &'static str, String)>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: &'static str, target: &str) -> String {
        let id = format!("rId{}", self.items.len() + 1);
        self.items.push((id.clone(), kind, target.to_string()));
        id
    }

    pub fn to_xml(&self) -> String {
        let mut xml = format!(r#"{}<Relationships xmlns="{}">"#, XML_DECL, NS_RELS);
        for (id, kind, target) in &self.items {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                id,
                kind,
                escape(target)
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// `[Content_Types].xml` with the usual defaults plus one default per
/// image format in use.
pub fn content_types(images: &[ImageFormat], overrides: &[(&str, &str)]) -> String {
    let mut xml = format!(
        r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="{}"/><Default Extension="xml" ContentType="application/xml"/>"#,
        XML_DECL, CT_RELS
    );
    let mut seen: Vec<ImageFormat> = Vec::new();
    for format in images {
        if seen.contains(format) {
            continue;
        }
        seen.push(*format);
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            format.extension(),
            format.mime()
        ));
    }
    for (part, ct) in overrides {
        xml.push_str(&format!(r#"<Override PartName="{}" ContentType="{}"/>"#, part, ct));
    }
    xml.push_str("</Types>");
    xml
}

/// Escape text for element content and attribute values. Control
/// characters XML 1.0 cannot carry are dropped.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"A&B <"x"> 'y'"#), "A&amp;B &lt;&quot;x&quot;&gt; &apos;y&apos;");
        assert_eq!(escape("a\u{1}b\nc"), "ab\nc");
    }

    #[test]
    fn test_relationship_ids_are_sequential() {
        let mut rels = Relationships::new();
        assert_eq!(rels.push(REL_IMAGE, "../media/image1.png"), "rId1");
        assert_eq!(rels.push(REL_IMAGE, "../media/image2.png"), "rId2");
        assert!(rels.to_xml().contains(r#"Target="../media/image2.png""#));
    }

    #[test]
    fn test_content_types_dedupe_images() {
        let xml = content_types(&[ImageFormat::Png, ImageFormat::Png, ImageFormat::Jpeg], &[]);
        assert_eq!(xml.matches(r#"Extension="png""#).count(), 1);
        assert!(xml.contains(r#"Extension="jpeg""#));
    }

    #[test]
    fn test_inches() {
        assert_eq!(inches(1.0), 914_400);
        assert_eq!(inches(0.5), 457_200);
    }
}
