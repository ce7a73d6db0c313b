//! Text extraction for uploaded SRS documents (PDF, DOCX).
//!
//! The document type is sniffed from the payload's magic bytes first and
//! from the filename extension second. Anything else is rejected as an
//! unsupported type before any parsing happens. Payloads are parsed from
//! memory; nothing is written to disk.

use std::io::Read;

use srs_guard_core::traits::{ExtractError, TextExtractor};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// A document type the extractor can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Pdf,
    Docx,
}

impl DocumentType {
    pub fn mime(&self) -> &'static str {
        match self {
            DocumentType::Pdf => MIME_PDF,
            DocumentType::Docx => MIME_DOCX,
        }
    }

    /// Sniff the type from magic bytes, falling back to the extension.
    pub fn detect(bytes: &[u8], filename: &str) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(DocumentType::Pdf);
        }
        let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        if bytes.starts_with(b"PK\x03\x04") && ext.as_deref() != Some("pdf") {
            return Some(DocumentType::Docx);
        }
        Self::from_filename(filename)
    }

    /// Type implied by the filename extension alone.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentType::Pdf),
            "docx" => Some(DocumentType::Docx),
            _ => None,
        }
    }

    /// Type implied by a MIME content type, ignoring parameters.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence {
            MIME_PDF => Some(DocumentType::Pdf),
            MIME_DOCX => Some(DocumentType::Docx),
            _ => None,
        }
    }
}

/// [`TextExtractor`] for PDF and DOCX payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
        let doc_type = DocumentType::detect(bytes, filename)
            .ok_or_else(|| ExtractError::UnsupportedType(filename.to_string()))?;
        let text = match doc_type {
            DocumentType::Pdf => extract_pdf(bytes)?,
            DocumentType::Docx => extract_docx(bytes)?,
        };
        if text.trim().is_empty() {
            return Err(ExtractError::Unreadable(format!(
                "{} contains no extractable text",
                filename
            )));
        }
        Ok(text)
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Unreadable("PDF extraction failed: malformed document".to_string()))?
        .map_err(|e| ExtractError::Unreadable(format!("PDF extraction failed: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let ooxml = |e: &dyn std::fmt::Display| {
        ExtractError::Unreadable(format!("DOCX extraction failed: {}", e))
    };
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ooxml(&e))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ooxml(&"word/document.xml not found"))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ooxml(&e))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml(&"word/document.xml exceeds size limit"));
    }
    extract_paragraphs(&doc_xml).map_err(|e| ooxml(&e))
}

/// Heading numbers Word renders from styles and `numbering.xml` rather
/// than from the paragraph text. One counter per outline level.
#[derive(Debug, Default)]
struct HeadingNumbers {
    counters: Vec<u32>,
}

impl HeadingNumbers {
    /// Prefix `text` with its outline number. Headings that already carry a
    /// literal number keep it and resynchronize the counters.
    fn label(&mut self, level: usize, text: &str) -> String {
        let text = text.trim();
        if let Some(number) = leading_number(text) {
            self.counters = number;
            return text.to_string();
        }
        self.counters.resize(level, 0);
        self.counters[level - 1] += 1;
        let number: Vec<String> = self.counters.iter().map(u32::to_string).collect();
        format!("{} {}", number.join("."), text)
    }
}

/// `2.1` in `2.1 Product Perspective`.
fn leading_number(text: &str) -> Option<Vec<u32>> {
    let (number, _) = text.split_once(char::is_whitespace)?;
    let number = number.strip_suffix('.').unwrap_or(number);
    number.split('.').map(|part| part.parse().ok()).collect()
}

/// Outline level of a `HeadingN` paragraph style.
fn heading_style_level(style: &str) -> Option<usize> {
    let level: usize = style
        .to_ascii_lowercase()
        .strip_prefix("heading")?
        .trim()
        .parse()
        .ok()?;
    (1..=9).contains(&level).then_some(level)
}

fn attr_val(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Properties and text of the `<w:p>` being read.
#[derive(Debug, Default)]
struct Paragraph {
    text: String,
    style_level: Option<usize>,
    ilvl: Option<usize>,
    /// `w:numId` of 0 switches numbering off for this paragraph.
    numbering_off: bool,
}

impl Paragraph {
    fn heading_level(&self) -> Option<usize> {
        if self.numbering_off {
            return None;
        }
        self.style_level
            .map(|level| self.ilvl.map_or(level, |ilvl| ilvl + 1))
    }
}

/// Collect `<w:t>` text, one line per `<w:p>` paragraph, so that headings
/// stay on their own lines. Numbered heading styles get their outline
/// number written in front of the title.
fn extract_paragraphs(xml: &[u8]) -> Result<String, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    let mut para = Paragraph::default();
    let mut numbers = HeadingNumbers::default();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"pStyle" => para.style_level = attr_val(&e).as_deref().and_then(heading_style_level),
                b"ilvl" => para.ilvl = attr_val(&e).and_then(|v| v.parse().ok()),
                b"numId" => para.numbering_off = attr_val(&e).as_deref() == Some("0"),
                b"tab" => para.text.push('\t'),
                _ => {}
            },
            Event::Text(te) if in_text => {
                para.text.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let para = std::mem::take(&mut para);
                    match para.heading_level() {
                        Some(level) if !para.text.trim().is_empty() => {
                            out.push_str(&numbers.label(level, &para.text));
                        }
                        _ => out.push_str(&para.text),
                    }
                    out.push('\n');
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_magic_then_extension() {
        assert_eq!(DocumentType::detect(b"%PDF-1.4 ...", "x.bin"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::detect(b"PK\x03\x04...", "srs.docx"), Some(DocumentType::Docx));
        assert_eq!(DocumentType::detect(b"???", "SRS.PDF"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::detect(b"hello", "notes.txt"), None);
        assert_eq!(DocumentType::detect(b"hello", "no_extension"), None);
    }

    #[test]
    fn content_type_ignores_parameters() {
        assert_eq!(
            DocumentType::from_content_type("application/pdf; charset=binary"),
            Some(DocumentType::Pdf)
        );
        assert_eq!(DocumentType::from_content_type("text/plain"), None);
    }

    #[test]
    fn unsupported_type_returns_error() {
        let err = DocumentExtractor.extract(b"plain text", "notes.txt").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(_)));
    }

    #[test]
    fn invalid_pdf_is_unreadable() {
        let err = DocumentExtractor.extract(b"not a pdf", "srs.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn invalid_zip_is_unreadable() {
        let err = DocumentExtractor.extract(b"not a zip", "srs.docx").unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn paragraphs_become_lines() {
        let xml = br#"<?xml version="1.0"?><w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>1.1 Purpose</w:t></w:r></w:p><w:p><w:r><w:t>Reserve </w:t></w:r><w:r><w:t>books.</w:t></w:r></w:p></w:body></w:document>"#;
        let text = extract_paragraphs(xml).unwrap();
        assert_eq!(text, "1.1 Purpose\nReserve books.\n");
    }

    fn heading(style: &str, num_pr: &str, text: &str) -> String {
        format!(
            "<w:p><w:pPr><w:pStyle w:val=\"{}\"/>{}</w:pPr><w:r><w:t>{}</w:t></w:r></w:p>",
            style, num_pr, text
        )
    }

    #[test]
    fn heading_styles_get_outline_numbers() {
        let body = [
            heading("Heading1", "", "Introduction"),
            heading("Heading2", r#"<w:numPr><w:ilvl w:val="1"/><w:numId w:val="3"/></w:numPr>"#, "Purpose"),
            heading("Heading2", "", "Document Conventions"),
            heading("Heading1", "", "Overall Description"),
            heading("Heading2", "", "Product Perspective"),
            heading("Heading3", "", "Context"),
        ]
        .concat();
        let xml = format!(r#"<w:document xmlns:w="urn:w"><w:body>{}</w:body></w:document>"#, body);
        let text = extract_paragraphs(xml.as_bytes()).unwrap();
        assert_eq!(
            text,
            "1 Introduction\n1.1 Purpose\n1.2 Document Conventions\n\
             2 Overall Description\n2.1 Product Perspective\n2.1.1 Context\n"
        );
    }

    #[test]
    fn literal_heading_numbers_resync_the_counters() {
        let body = [
            heading("Heading2", "", "2.1 Product Perspective"),
            heading("Heading2", "", "Product Functions"),
        ]
        .concat();
        let xml = format!(r#"<w:document xmlns:w="urn:w"><w:body>{}</w:body></w:document>"#, body);
        let text = extract_paragraphs(xml.as_bytes()).unwrap();
        assert_eq!(text, "2.1 Product Perspective\n2.2 Product Functions\n");
    }

    #[test]
    fn unnumbered_headings_and_body_styles_are_left_alone() {
        let body = [
            heading("Heading1", r#"<w:numPr><w:numId w:val="0"/></w:numPr>"#, "Revision History"),
            heading("BodyText", "", "Plain paragraph"),
            heading("Heading1", "", "Introduction"),
        ]
        .concat();
        let xml = format!(r#"<w:document xmlns:w="urn:w"><w:body>{}</w:body></w:document>"#, body);
        let text = extract_paragraphs(xml.as_bytes()).unwrap();
        assert_eq!(text, "Revision History\nPlain paragraph\n1 Introduction\n");
    }
}
