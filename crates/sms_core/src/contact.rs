use std::fmt;

use crate::{CellValue, Fields};

pub const NAME_FIELD: &str = "Name";
pub const PHONE_FIELD: &str = "PhoneNumber";
pub const TEXT_MESSAGE_FIELD: &str = "TextMessage";

/// Shown in place of a missing name in outcomes and log lines.
pub const UNKNOWN_NAME_SENTINEL: &str = "Unknown";
/// Shown in place of a missing phone number in outcomes and log lines.
pub const MISSING_PHONE_SENTINEL: &str = "Missing";
pub const MISSING_CONTACT_MESSAGE: &str = "Missing name or phone number";

/// A spreadsheet row turned into a send target.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub index: usize,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub text_message: Option<String>,
    /// The whole source row, used for placeholder substitution.
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowValidationError {
    MissingName,
    MissingPhone,
    MissingBoth,
}

impl fmt::Display for RowValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MISSING_CONTACT_MESSAGE)
    }
}

impl std::error::Error for RowValidationError {}

impl Contact {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME_SENTINEL)
    }

    pub fn display_phone(&self) -> &str {
        self.phone.as_deref().unwrap_or(MISSING_PHONE_SENTINEL)
    }

    /// Returns the name and phone when both are usable.
    pub fn validate(&self) -> Result<(&str, &str), RowValidationError> {
        match (self.name.as_deref(), self.phone.as_deref()) {
            (Some(name), Some(phone)) => Ok((name, phone)),
            (None, Some(_)) => Err(RowValidationError::MissingName),
            (Some(_), None) => Err(RowValidationError::MissingPhone),
            (None, None) => Err(RowValidationError::MissingBoth),
        }
    }

    /// The per-row message when present, else `default_template`.
    pub fn template<'a>(&'a self, default_template: &'a str) -> &'a str {
        self.text_message.as_deref().unwrap_or(default_template)
    }
}

/// Converts raw rows into contacts, one per row, in source order.
pub fn normalize(rows: Vec<Fields>) -> Vec<Contact> {
    rows.into_iter()
        .enumerate()
        .map(|(index, fields)| Contact {
            index,
            name: truthy_text(&fields, NAME_FIELD),
            phone: truthy_text(&fields, PHONE_FIELD),
            text_message: truthy_text(&fields, TEXT_MESSAGE_FIELD),
            fields,
        })
        .collect()
}

fn truthy_text(fields: &Fields, key: &str) -> Option<String> {
    fields
        .get(key)
        .filter(|value| value.is_truthy())
        .map(CellValue::to_string)
}
