use std::collections::BTreeMap;
use std::fmt;

/// One spreadsheet row keyed by column header.
pub type Fields = BTreeMap<String, CellValue>;

/// A single spreadsheet cell as handed over by the row source.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Empty text, zero and NaN count as "not provided".
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Text(text) => !text.is_empty(),
            CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            // f64's Display already drops a trailing ".0" for integral values.
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}
