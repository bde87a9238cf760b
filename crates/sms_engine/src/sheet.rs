use std::path::PathBuf;

use sms_core::{CellValue, Fields, NAME_FIELD, PHONE_FIELD};
use sms_logging::{sms_debug, sms_info};

use crate::{decode_sheet, AcquisitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetOptions {
    /// Keep every cell as text instead of parsing numeric-looking cells.
    pub raw_cells: bool,
    pub delimiter: u8,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            raw_cells: false,
            delimiter: b',',
        }
    }
}

/// Yields header-keyed rows in sheet order.
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Fields>, AcquisitionError>;
}

#[async_trait::async_trait]
impl RowSource for Vec<Fields> {
    async fn load(&self) -> Result<Vec<Fields>, AcquisitionError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone)]
enum SheetInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A header-driven CSV sheet. The first record is the header row.
#[derive(Debug, Clone)]
pub struct CsvSheet {
    input: SheetInput,
    options: SheetOptions,
}

impl CsvSheet {
    pub fn from_path(path: impl Into<PathBuf>, options: SheetOptions) -> Self {
        Self {
            input: SheetInput::Path(path.into()),
            options,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, options: SheetOptions) -> Self {
        Self {
            input: SheetInput::Bytes(bytes.into()),
            options,
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<Fields>, AcquisitionError> {
        let decoded = decode_sheet(bytes)?;
        sms_debug!("Decoded sheet as {}", decoded.encoding_label);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.options.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(decoded.text.as_bytes());

        let headers = reader.headers()?.clone();
        for required in [NAME_FIELD, PHONE_FIELD] {
            if !headers.iter().any(|header| header == required) {
                return Err(AcquisitionError::MissingColumn(required));
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Empty cells are left out of the row, like a sheet-to-JSON export does.
            let row: Fields = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, cell)| !header.is_empty() && !cell.is_empty())
                .map(|(header, cell)| (header.to_string(), self.cell_value(cell)))
                .collect();
            if !row.is_empty() {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn cell_value(&self, cell: &str) -> CellValue {
        if !self.options.raw_cells && looks_numeric(cell) {
            if let Ok(number) = cell.parse::<f64>() {
                return CellValue::Number(number);
            }
        }
        CellValue::Text(cell.to_string())
    }
}

#[async_trait::async_trait]
impl RowSource for CsvSheet {
    async fn load(&self) -> Result<Vec<Fields>, AcquisitionError> {
        let rows = match &self.input {
            SheetInput::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| AcquisitionError::Io {
                        path: path.clone(),
                        source,
                    })?;
                self.parse(&bytes)?
            }
            SheetInput::Bytes(bytes) => self.parse(bytes)?,
        };
        sms_info!("Loaded {} rows from sheet", rows.len());
        Ok(rows)
    }
}

/// Plain decimal numbers only. A leading `+` or a leading zero marks a phone
/// number or code that must stay text.
fn looks_numeric(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || (int_part.len() > 1 && int_part.starts_with('0')) {
        return false;
    }
    frac_part.map_or(true, all_digits)
}
