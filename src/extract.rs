//! Format-specific text extraction.
//!
//! Each extractor consumes [`NormalizedContent`] and returns plain UTF-8 text.
//! Binary formats (PDF, OpenXML word processing) expect bytes; exported and
//! text formats expect text. Handing an extractor the wrong shape is a
//! [`DecodeError::WrongShape`], never a panic.

use std::io::Read;

use crate::error::DecodeError;
use crate::formats::{
    Category, MIME_DOCX, MIME_GOOGLE_DOC, MIME_GOOGLE_SHEET, MIME_GOOGLE_SLIDES, MIME_PDF,
    MIME_TEXT,
};
use crate::models::NormalizedContent;
use crate::traits::Extractor;

/// Delimiter placed between spreadsheet cells.
pub const CELL_DELIMITER: &str = " | ";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

fn expect_bytes(
    extractor: &'static str,
    content: NormalizedContent,
) -> Result<Vec<u8>, DecodeError> {
    match content {
        NormalizedContent::Bytes(b) => Ok(b),
        NormalizedContent::Text(_) => Err(DecodeError::WrongShape {
            extractor,
            expected: "binary",
        }),
    }
}

fn expect_text(extractor: &'static str, content: NormalizedContent) -> Result<String, DecodeError> {
    match content {
        NormalizedContent::Text(s) => Ok(s),
        NormalizedContent::Bytes(_) => Err(DecodeError::WrongShape {
            extractor,
            expected: "text",
        }),
    }
}

/// Drive prefixes `text/plain` exports with a byte order mark.
fn strip_bom(s: String) -> String {
    match s.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

// ============ PDF ============

/// Text-layout extraction over raw PDF bytes.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn category(&self) -> Category {
        Category::Pdf
    }

    fn supported_types(&self) -> &[&'static str] {
        &[MIME_PDF]
    }

    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError> {
        let bytes = expect_bytes(self.name(), content)?;
        extract_pdf(&bytes)
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, DecodeError> {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DecodeError::Pdf(e.to_string())),
        Err(_) => Err(DecodeError::Pdf("parser panicked on malformed input".to_string())),
    }
}

// ============ Exported native formats ============

/// Native documents exported as `text/plain`; the body is already text.
pub struct DocumentExtractor;

impl Extractor for DocumentExtractor {
    fn name(&self) -> &'static str {
        "document"
    }

    fn category(&self) -> Category {
        Category::Document
    }

    fn supported_types(&self) -> &[&'static str] {
        &[MIME_GOOGLE_DOC]
    }

    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError> {
        expect_text(self.name(), content).map(strip_bom)
    }
}

/// Native presentations exported as `text/plain`.
pub struct PresentationExtractor;

impl Extractor for PresentationExtractor {
    fn name(&self) -> &'static str {
        "presentation"
    }

    fn category(&self) -> Category {
        Category::Presentation
    }

    fn supported_types(&self) -> &[&'static str] {
        &[MIME_GOOGLE_SLIDES]
    }

    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError> {
        expect_text(self.name(), content).map(strip_bom)
    }
}

/// Native spreadsheets exported as `text/csv`, flattened to readable rows.
pub struct SpreadsheetExtractor;

impl Extractor for SpreadsheetExtractor {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn category(&self) -> Category {
        Category::Spreadsheet
    }

    fn supported_types(&self) -> &[&'static str] {
        &[MIME_GOOGLE_SHEET]
    }

    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError> {
        let csv = expect_text(self.name(), content).map(strip_bom)?;
        Ok(flatten_csv(&csv))
    }
}

/// Drop blank lines and replace every comma with [`CELL_DELIMITER`].
///
/// Commas inside quoted cells are replaced too; the output is meant for
/// reading, not for re-parsing.
pub fn flatten_csv(csv: &str) -> String {
    csv.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.replace(',', CELL_DELIMITER))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============ Plain text ============

/// Stored `text/plain` files, used as is.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn category(&self) -> Category {
        Category::PlainText
    }

    fn supported_types(&self) -> &[&'static str] {
        &[MIME_TEXT]
    }

    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError> {
        expect_text(self.name(), content)
    }
}

// ============ OpenXML word processing ============

/// Parser for `.docx` packages: reads `word/document.xml` and emits one line
/// per paragraph.
pub struct WordExtractor;

impl Extractor for WordExtractor {
    fn name(&self) -> &'static str {
        "word-doc"
    }

    fn category(&self) -> Category {
        Category::WordDoc
    }

    fn supported_types(&self) -> &[&'static str] {
        &[MIME_DOCX]
    }

    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError> {
        let bytes = expect_bytes(self.name(), content)?;
        extract_docx(&bytes)
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| DecodeError::Word(e.to_string()))?;
    let xml = read_zip_entry_bounded(&mut archive, DOCX_BODY_ENTRY, MAX_XML_ENTRY_BYTES)?;
    extract_paragraphs(&xml)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, DecodeError> {
    let entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => DecodeError::Word(format!("{} not found", name)),
        other => DecodeError::Word(other.to_string()),
    })?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Word(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(DecodeError::Word(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Walk WordprocessingML and collect `w:t` runs.
///
/// Paragraph ends become newlines, `w:tab` a tab, `w:br`/`w:cr` a line
/// break. Trailing newlines are trimmed.
fn extract_paragraphs(xml: &[u8]) -> Result<String, DecodeError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    // `w:tabs` holds tab stop definitions, not tab characters.
    let mut in_tab_stops = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| DecodeError::Word(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::CData(cd)) if in_text => {
                out.push_str(&String::from_utf8_lossy(&cd));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if !in_tab_stops => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(DecodeError::Word(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    Ok(out)
}
