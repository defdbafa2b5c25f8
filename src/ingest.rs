//! Upload decoding: CSV text or the first sheet of an XLSX workbook, into a
//! `LeadTable` of string cells.

use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::errors::AppError;
use crate::models::LeadTable;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadFormat {
    Csv,
    Xlsx,
}

impl UploadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFormat::Csv => "csv",
            UploadFormat::Xlsx => "xlsx",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" | "text/csv" | "application/csv" => Some(UploadFormat::Csv),
            "xlsx" | XLSX_CONTENT_TYPE => Some(UploadFormat::Xlsx),
            _ => None,
        }
    }

    /// Determines the upload format, in order of precedence: an explicit
    /// format name, the file name extension, the content type, and finally
    /// the zip signature every XLSX file starts with.
    pub fn detect(
        explicit: Option<&str>,
        filename: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Self, AppError> {
        if let Some(name) = explicit.filter(|s| !s.trim().is_empty()) {
            return Self::from_name(name).ok_or_else(|| {
                AppError::UnsupportedFormat(format!("'{}' (expected csv or xlsx)", name))
            });
        }

        if let Some(ext) = filename.and_then(|f| f.rsplit_once('.')).map(|(_, ext)| ext) {
            if let Some(format) = Self::from_name(ext) {
                return Ok(format);
            }
        }

        if let Some(mime) = content_type {
            // "text/csv; charset=utf-8" -> "text/csv"
            let essence = mime.split(';').next().unwrap_or_default();
            if let Some(format) = Self::from_name(essence) {
                return Ok(format);
            }
        }

        if body.starts_with(ZIP_MAGIC) {
            return Ok(UploadFormat::Xlsx);
        }

        Err(AppError::UnsupportedFormat(
            "could not determine upload format; pass format=csv or format=xlsx".to_string(),
        ))
    }
}

impl fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes an upload of the given format.
pub fn read_table(format: UploadFormat, body: &[u8]) -> Result<LeadTable, AppError> {
    let table = match format {
        UploadFormat::Csv => read_csv(body)?,
        UploadFormat::Xlsx => read_xlsx(body)?,
    };

    tracing::debug!(
        "Decoded {} upload: {} columns, {} rows",
        format,
        table.headers.len(),
        table.len()
    );
    Ok(table)
}

/// Reads CSV text. UTF-8 is expected; bytes that are not valid UTF-8 are
/// read as Latin-1, the usual encoding of spreadsheet exports in Brazil.
/// The delimiter is `,` unless the header line has more `;` than `,`.
pub fn read_csv(body: &[u8]) -> Result<LeadTable, AppError> {
    let text = decode_text(body);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text[..]);

    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::BadRequest("CSV upload has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.iter().any(|cell| !cell.is_empty()) {
            rows.push(row);
        }
    }

    Ok(LeadTable::new(headers, rows))
}

/// Reads the first worksheet of an XLSX workbook; its first row is the header.
pub fn read_xlsx(body: &[u8]) -> Result<LeadTable, AppError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(body))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::BadRequest("Workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| AppError::BadRequest("Worksheet is empty".to_string()))?
        .iter()
        .map(|cell| cell_to_string(cell).trim().to_string())
        .collect();

    let rows = rows
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    Ok(LeadTable::new(headers, rows))
}

/// Text of a spreadsheet cell. Integral floats drop their fraction so that
/// ids and counts read as `"42"` rather than `"42.0"`. Other floats use a
/// decimal comma, as a Brazilian report would print them: `234.567` read as
/// text would otherwise look like dot-grouped thousands.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        Data::Float(f) if f.is_finite() => f.to_string().replace('.', ","),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

fn decode_text(body: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("Upload is not valid UTF-8, decoding as Latin-1");
            Cow::Owned(body.iter().map(|&b| b as char).collect())
        }
    }
}
