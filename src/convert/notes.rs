//! Legacy rental plan embedded in quotation notes.
//!
//! Older rental quotations carry their dates and deposit as text lines
//! appended to `notes`:
//!
//! ```text
//! --- Información de Alquiler ---
//! Fecha Inicio: 2024-01-01
//! Fecha Fin: 2024-01-08
//! Depósito: 140
//! ```
//!
//! New records use the `planned_*` fields on `Quotation`; these functions keep
//! old records readable and keep written notes compatible with older clients.

use chrono::{Duration, NaiveDate};

const SECTION_HEADER: &str = "--- Información de Alquiler ---";
const START_LABEL: &str = "Fecha Inicio: ";
const END_LABEL: &str = "Fecha Fin: ";
const DEPOSIT_LABEL: &str = "Depósito: ";

/// Rental period used when a quotation does not state one
pub const DEFAULT_RENTAL_DAYS: i64 = 7;

/// Whatever could be recovered; absent fields stay `None`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlannedFields {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deposit: Option<f64>,
}

impl PlannedFields {
    /// Fill the gaps: start today, end a week later, no deposit
    pub fn resolve(self, today: NaiveDate) -> RentalFields {
        RentalFields {
            start_date: self.start_date.unwrap_or(today),
            end_date: self
                .end_date
                .unwrap_or(today + Duration::days(DEFAULT_RENTAL_DAYS)),
            deposit: self.deposit.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RentalFields {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deposit: f64,
}

pub fn parse_planned_fields(notes: &str) -> PlannedFields {
    PlannedFields {
        start_date: find_date(notes, START_LABEL),
        end_date: find_date(notes, END_LABEL),
        deposit: find_amount(notes, DEPOSIT_LABEL),
    }
}

/// Rental fields from notes with defaults for anything missing
pub fn extract_rental_fields_from_notes(notes: &str, today: NaiveDate) -> RentalFields {
    parse_planned_fields(notes).resolve(today)
}

/// Append (or replace) the legacy rental section in `notes`
pub fn encode_rental_fields_into_notes(notes: &str, fields: &RentalFields) -> String {
    let base = match notes.find(SECTION_HEADER) {
        Some(idx) => &notes[..idx],
        None => notes,
    };
    let base = base.trim_end();

    let section = format!(
        "{SECTION_HEADER}\n{START_LABEL}{}\n{END_LABEL}{}\n{DEPOSIT_LABEL}{}",
        fields.start_date.format("%Y-%m-%d"),
        fields.end_date.format("%Y-%m-%d"),
        fields.deposit
    );

    if base.is_empty() {
        section
    } else {
        format!("{base}\n\n{section}")
    }
}

fn value_after<'a>(notes: &'a str, label: &str) -> Option<&'a str> {
    notes.find(label).map(|idx| &notes[idx + label.len()..])
}

fn find_date(notes: &str, label: &str) -> Option<NaiveDate> {
    let rest = value_after(notes, label)?;
    let candidate = rest.get(..10)?;
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok()
}

fn find_amount(notes: &str, label: &str) -> Option<f64> {
    let rest = value_after(notes, label)?;
    let rest = rest.trim_start_matches("RD").trim_start_matches('$').trim_start();
    // thousands separators: "1,500.00"
    let raw: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();

    // "12.5.3" reads as 12.5
    let mut parts = raw.splitn(3, '.');
    let whole = parts.next().unwrap_or_default();
    let number = match parts.next() {
        Some(frac) => format!("{whole}.{frac}"),
        None => whole.to_string(),
    };
    number.parse::<f64>().ok()
}
