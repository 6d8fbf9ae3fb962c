use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::DocumentSettings;

/// Formatting callables handed to the document builder
pub trait Formatter {
    fn currency(&self, amount: f64) -> String;
    fn date(&self, date: NaiveDate) -> String;
}

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formatter driven by the `[documents]` settings
#[derive(Debug, Clone)]
pub struct LocaleFormatter {
    symbol: String,
    thousands: String,
    decimal: String,
    date_format: String,
}

impl LocaleFormatter {
    pub fn new(settings: &DocumentSettings) -> Self {
        Self {
            symbol: settings.currency_symbol.clone(),
            thousands: settings.thousands_separator.clone(),
            decimal: settings.decimal_separator.clone(),
            date_format: settings.date_format.clone(),
        }
    }

    /// Amount with grouping and two decimals, no currency symbol
    pub fn amount(&self, value: f64) -> String {
        let value = if value.is_finite() { value } else { 0.0 };
        let cents = (value.abs() * 100.0).round() as u64;
        let whole = group_digits(cents / 100, &self.thousands);
        let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
        format!("{sign}{whole}{}{:02}", self.decimal, cents % 100)
    }
}

impl Default for LocaleFormatter {
    fn default() -> Self {
        Self::new(&DocumentSettings::default())
    }
}

impl Formatter for LocaleFormatter {
    fn currency(&self, amount: f64) -> String {
        format!("{}{}", self.symbol, self.amount(amount))
    }

    fn date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        if write!(out, "{}", date.format(&self.date_format)).is_err() {
            return date.format(FALLBACK_DATE_FORMAT).to_string();
        }
        out
    }
}

fn group_digits(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}
