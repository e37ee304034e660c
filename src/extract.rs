//! Text extraction for corpus files (PDF, XLSX/XLS, CSV).
//!
//! Two layers:
//!
//! - [`extract_text`] turns bytes into text and reports failures as
//!   [`ExtractError`].
//! - [`extract_file`] reads a path and never fails: any error becomes a
//!   deterministic placeholder line naming the file, its size and the error,
//!   so the chunker always receives a string.
//!
//! PDFs are read page by page; unreadable pages are logged and skipped.
//! Workbooks emit every sheet behind a `Sheet: <name>` line.

use std::any::Any;
use std::collections::HashMap;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info_span, warn};

use crate::models::{FileType, SourceFile};

/// Maximum sheets to process in a workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet (avoids unbounded memory).
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Compound File Binary signature used by legacy `.xls` workbooks.
const OLE2_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Extraction error. Never escapes [`extract_file`].
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Pdf(String),
    Ooxml(String),
    LegacyWorkbook,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "workbook extraction failed: {}", e),
            ExtractError::LegacyWorkbook => {
                write!(f, "legacy binary .xls workbooks are not supported")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts plain text from file bytes.
pub fn extract_text(bytes: &[u8], file_type: FileType) -> Result<String, ExtractError> {
    match file_type {
        FileType::Pdf => extract_pdf(bytes),
        FileType::Xlsx => extract_xlsx(bytes),
        FileType::Xls => {
            if bytes.starts_with(&OLE2_MAGIC) {
                return Err(ExtractError::LegacyWorkbook);
            }
            extract_xlsx(bytes)
        }
        FileType::Csv => Ok(extract_csv(bytes)),
    }
}

/// Reads and extracts a file, substituting a placeholder on any failure.
pub fn extract_file(path: &Path, file_type: FileType) -> String {
    let name = display_name(path);
    let _span = info_span!("extract", file = %name).entered();

    if !path.exists() {
        warn!("file does not exist");
        return format!("[missing file] {}", path.display());
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            let err = ExtractError::Io(e.to_string());
            warn!(error = %err, "extraction failed");
            return placeholder(&name, 0, &err);
        }
    };

    match extract_text(&bytes, file_type) {
        Ok(text) => {
            debug!(chars = text.len(), "extracted");
            text
        }
        Err(err) => {
            warn!(error = %err, "extraction failed");
            placeholder(&name, bytes.len() as u64, &err)
        }
    }
}

/// Extracts a file into a [`SourceFile`] for the given category.
pub fn load_source(path: &Path, category: &str, file_type: FileType) -> SourceFile {
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    SourceFile {
        filename: display_name(path),
        category: category.to_string(),
        file_type,
        size_bytes,
        raw_text: extract_file(path, file_type),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn placeholder(name: &str, size: u64, err: &dyn std::fmt::Display) -> String {
    format!("[extraction failed] {} ({} bytes): {}", name, size, err)
}

// ============ PDF ============

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "page-level PDF parse failed, trying whole document");
            return whole_document_text(bytes)
                .map_err(|e2| ExtractError::Pdf(format!("{}; {}", e, e2)));
        }
    };

    let pages = doc.get_pages();
    let mut out = String::new();
    let mut failed = 0usize;
    for &page in pages.keys() {
        match page_text(&doc, page) {
            Ok(text) => {
                if !text.trim().is_empty() {
                    out.push_str(&text);
                    out.push('\n');
                }
            }
            Err(e) => {
                failed += 1;
                warn!(page, error = %e, "skipping unreadable PDF page");
            }
        }
    }

    if out.trim().is_empty() {
        // lopdf finds no text in some font encodings that pdf-extract handles
        match whole_document_text(bytes) {
            Ok(text) => return Ok(text),
            Err(e) if !pages.is_empty() && failed == pages.len() => {
                return Err(ExtractError::Pdf(format!(
                    "all {} pages unreadable: {}",
                    failed, e
                )));
            }
            Err(e) => debug!(error = %e, "whole-document PDF fallback failed"),
        }
    } else if failed > 0 {
        warn!(
            failed,
            total = pages.len(),
            "partial PDF extraction"
        );
    }

    Ok(out)
}

/// Both PDF crates panic on some malformed fonts and encodings; a panic
/// counts as a failed page or document.
fn page_text(doc: &lopdf::Document, page: u32) -> Result<String, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| doc.extract_text(&[page]))) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn whole_document_text(bytes: &[u8]) -> Result<String, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("parser panicked: {}", detail)
}

// ============ XLSX ============

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let shared_strings = if archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        let xml = read_zip_entry_bounded(&mut archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
        parse_shared_strings(&xml)?
    } else {
        Vec::new()
    };
    let sheets = list_sheets(&mut archive)?;

    let mut parts = Vec::new();
    for (name, entry) in sheets.into_iter().take(XLSX_MAX_SHEETS) {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &entry, MAX_XML_ENTRY_BYTES)?;
        let rows = extract_sheet_rows(&sheet_xml, &shared_strings)?;
        parts.push(format!("Sheet: {}\n{}", name, rows));
    }
    Ok(parts.join("\n\n"))
}

fn attr(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

/// Sheets as `(display name, zip entry)` in workbook order.
///
/// Uses `xl/workbook.xml` and its relationships when present; otherwise
/// falls back to numbered worksheet entries named `SheetN`.
fn list_sheets(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<(String, String)>, ExtractError> {
    let has = |archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>, n: &str| {
        archive.file_names().any(|f| f == n)
    };

    if has(archive, "xl/workbook.xml") && has(archive, "xl/_rels/workbook.xml.rels") {
        let workbook = read_zip_entry_bounded(archive, "xl/workbook.xml", MAX_XML_ENTRY_BYTES)?;
        let rels =
            read_zip_entry_bounded(archive, "xl/_rels/workbook.xml.rels", MAX_XML_ENTRY_BYTES)?;
        let targets = parse_relationships(&rels)?;
        let sheets: Vec<(String, String)> = parse_workbook_sheets(&workbook)?
            .into_iter()
            .filter_map(|(name, rid)| {
                let target = targets.get(&rid)?;
                let entry = match target.strip_prefix('/') {
                    Some(abs) => abs.to_string(),
                    None => format!("xl/{}", target),
                };
                Some((name, entry))
            })
            .filter(|(_, entry)| has(archive, entry))
            .collect();
        if !sheets.is_empty() {
            return Ok(sheets);
        }
    }

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| sheet_number(name));
    Ok(names
        .into_iter()
        .map(|entry| {
            let label = format!("Sheet{}", sheet_number(&entry));
            (label, entry)
        })
        .collect())
}

fn sheet_number(entry: &str) -> u32 {
    entry
        .trim_start_matches("xl/worksheets/sheet")
        .trim_end_matches(".xml")
        .parse::<u32>()
        .unwrap_or(u32::MAX)
}

fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, ExtractError> {
    let mut sheets = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attr(&e, b"name"), attr(&e, b"id")) {
                    sheets.push((name, rid));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, ExtractError> {
    let mut targets = HashMap::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// One string per `<si>`, concatenating rich-text runs.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(current.take().unwrap_or_default().trim().to_string()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cells of a row joined by spaces, rows joined by newlines.
fn extract_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    let mut rows: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut cell_type: Option<String> = None;
    let mut in_v = false;
    let mut in_inline = false;
    let mut cell_count = 0usize;
    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => cell_type = attr(&e, b"t"),
                b"v" => in_v = true,
                b"t" => in_inline = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_v || in_inline => {
                let raw = te.unescape().unwrap_or_default();
                let s = raw.trim();
                if !s.is_empty() {
                    let value = if in_inline {
                        Some(s.to_string())
                    } else {
                        match cell_type.as_deref() {
                            Some("s") => s
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared_strings.get(i).cloned()),
                            Some("b") => Some(if s == "1" { "TRUE" } else { "FALSE" }.to_string()),
                            _ => Some(s.to_string()),
                        }
                    };
                    if let Some(v) = value.filter(|v| !v.is_empty()) {
                        row.push(v);
                        cell_count += 1;
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_inline = false,
                b"c" => cell_type = None,
                b"row" if !row.is_empty() => rows.push(std::mem::take(&mut row).join(" ")),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !row.is_empty() {
        rows.push(row.join(" "));
    }
    Ok(rows.join("\n"))
}

// ============ CSV ============

fn extract_csv(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');
    parse_csv(text)
        .into_iter()
        .map(|fields| {
            fields
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// RFC 4180-style records: quoted fields may hold commas, doubled quotes
/// and newlines.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
