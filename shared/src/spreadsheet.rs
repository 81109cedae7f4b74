//! Tabular input read from CSV or XLSX uploads
//!
//! A [`Sheet`] is a header row plus data rows of loosely typed [`Cell`]s. XLSX
//! cells keep the type stored in the workbook; CSV cells are inferred from text.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use thiserror::Error;

/// Errors reading an uploaded spreadsheet
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("unsupported file type, expected .xlsx or .csv")]
    UnsupportedFormat,

    #[error("could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read XLSX: {0}")]
    Xlsx(String),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("spreadsheet has no header row")]
    MissingHeader,
}

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    /// Pick the format from the uploaded file name
    pub fn from_filename(name: &str) -> Result<Self, SheetError> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx") => Ok(SheetFormat::Xlsx),
            Some("csv") => Ok(SheetFormat::Csv),
            _ => Err(SheetError::UnsupportedFormat),
        }
    }
}

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Infer a cell from CSV text
    pub fn infer(raw: &str) -> Cell {
        let text = raw.trim();
        if text.is_empty() {
            return Cell::Empty;
        }
        match parse_number(text) {
            Some(n) => Cell::Number(n),
            None => Cell::Text(text.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            Cell::Bool(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Render the cell as text; integral numbers print without a fraction
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

/// Accepts `12`, `12.5` and the comma-decimal form `12,5`
fn parse_number(text: &str) -> Option<f64> {
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let parsed = text.parse::<f64>().ok().or_else(|| {
        if text.matches(',').count() == 1 && !text.contains('.') {
            text.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            other => Cell::Text(other.to_string()),
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Header row plus data rows
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn parse(bytes: &[u8], format: SheetFormat) -> Result<Sheet, SheetError> {
        match format {
            SheetFormat::Csv => Self::from_csv(bytes),
            SheetFormat::Xlsx => Self::from_xlsx(bytes),
        }
    }

    /// Read CSV. Semicolon-separated files (common with comma decimals) are
    /// detected from the header line.
    pub fn from_csv(bytes: &[u8]) -> Result<Sheet, SheetError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let header_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
        let delimiter = if header_line.contains(&b';') && !header_line.contains(&b',') {
            b';'
        } else {
            b','
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(SheetError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::infer).collect());
        }

        Ok(Sheet { headers, rows })
    }

    /// Read the first worksheet of an XLSX workbook
    pub fn from_xlsx(bytes: &[u8]) -> Result<Sheet, SheetError> {
        let mut workbook =
            Xlsx::new(Cursor::new(bytes)).map_err(|e| SheetError::Xlsx(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SheetError::NoWorksheet)?
            .map_err(|e| SheetError::Xlsx(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or(SheetError::MissingHeader)?
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect();

        let rows = rows
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        Ok(Sheet { headers, rows })
    }

    /// Cell at `index`, treating short rows as padded with blanks
    pub fn cell(row: &[Cell], index: usize) -> &Cell {
        row.get(index).unwrap_or(&EMPTY_CELL)
    }
}
