use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};
use crate::model::{Organization, PaymentMethod};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub organization: Organization,
    #[serde(default)]
    pub documents: DocumentSettings,
    #[serde(default)]
    pub numbering: NumberingSettings,
    /// Present when the desk talks to the REST API instead of the local ledger
    #[serde(default)]
    pub api: Option<ApiSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub currency_symbol: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
    pub date_format: String,
    /// Percent, e.g. 18.0
    pub default_tax_rate: f64,
    pub quotation_valid_days: i64,
    /// Days after issue printed as the invoice due date
    pub due_days: i64,
    pub default_payment_method: PaymentMethod,
    pub output_dir: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            currency_symbol: "RD$".to_string(),
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
            date_format: "%d/%m/%Y".to_string(),
            default_tax_rate: 18.0,
            quotation_valid_days: 15,
            due_days: 0,
            default_payment_method: PaymentMethod::Cash,
            output_dir: "~/.desk/output".to_string(),
        }
    }
}

impl DocumentSettings {
    /// Reject a `date_format` chrono cannot render
    pub fn validate(&self) -> Result<()> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(DeskError::Validation(format!(
                "invalid date_format '{}' in [documents]",
                self.date_format
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NumberingSettings {
    pub quotation_format: String,
    pub sale_format: String,
    pub rental_format: String,
}

impl Default for NumberingSettings {
    fn default() -> Self {
        Self {
            quotation_format: "COT-{year}-{seq:04}".to_string(),
            sale_format: "VEN-{year}-{seq:04}".to_string(),
            rental_format: "ALQ-{year}-{seq:04}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// Fill a number format. Supports `{year}`, `{seq}`, `{seq:03}`, `{seq:04}`
/// and `{seq:05}`.
pub fn format_number(format: &str, year: i32, seq: u32) -> String {
    format
        .replace("{year}", &year.to_string())
        .replace("{seq:05}", &format!("{seq:05}"))
        .replace("{seq:04}", &format!("{seq:04}"))
        .replace("{seq:03}", &format!("{seq:03}"))
        .replace("{seq}", &seq.to_string())
}
