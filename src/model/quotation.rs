use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Client, LineItem, PaymentMethod};
use crate::convert::notes::{parse_planned_fields, PlannedFields};
use crate::totals::RemoteTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    #[default]
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "aceptada")]
    Accepted,
    #[serde(alias = "rechazada")]
    Rejected,
    #[serde(alias = "convertida")]
    Converted,
    #[serde(alias = "vencida")]
    Expired,
}

impl QuotationStatus {
    pub const ALL: [QuotationStatus; 5] = [
        QuotationStatus::Pending,
        QuotationStatus::Accepted,
        QuotationStatus::Rejected,
        QuotationStatus::Converted,
        QuotationStatus::Expired,
    ];

    /// Value used by the REST API
    pub fn wire_name(&self) -> &'static str {
        match self {
            QuotationStatus::Pending => "pendiente",
            QuotationStatus::Accepted => "aceptada",
            QuotationStatus::Rejected => "rechazada",
            QuotationStatus::Converted => "convertida",
            QuotationStatus::Expired => "vencida",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuotationStatus::Pending => "pending",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Rejected => "rejected",
            QuotationStatus::Converted => "converted",
            QuotationStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl FromStr for QuotationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendiente" => Ok(QuotationStatus::Pending),
            "accepted" | "aceptada" => Ok(QuotationStatus::Accepted),
            "rejected" | "rechazada" => Ok(QuotationStatus::Rejected),
            "converted" | "convertida" => Ok(QuotationStatus::Converted),
            "expired" | "vencida" => Ok(QuotationStatus::Expired),
            other => Err(format!(
                "Invalid quotation status: {other}. Use pending, accepted, rejected, converted, or expired"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationType {
    #[default]
    #[serde(alias = "venta")]
    Sale,
    #[serde(alias = "alquiler")]
    Rental,
}

impl QuotationType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            QuotationType::Sale => "venta",
            QuotationType::Rental => "alquiler",
        }
    }
}

impl fmt::Display for QuotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotationType::Sale => f.write_str("sale"),
            QuotationType::Rental => f.write_str("rental"),
        }
    }
}

impl FromStr for QuotationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" | "venta" => Ok(QuotationType::Sale),
            "rental" | "alquiler" => Ok(QuotationType::Rental),
            other => Err(format!("Invalid quotation type: {other}. Use sale or rental")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: i64,
    pub quotation_number: String,
    #[serde(default)]
    pub quotation_type: QuotationType,
    #[serde(default)]
    pub status: QuotationStatus,
    pub client: Client,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub planned_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_deposit: Option<f64>,
    #[serde(default)]
    pub remote: RemoteTotals,
}

impl Quotation {
    /// Local editability predicate. The backend has the final word through
    /// `Backend::can_edit`.
    pub fn can_edit(&self) -> bool {
        self.status.is_editable()
    }

    /// Rental plan from the first-class fields, falling back to the legacy
    /// lines embedded in `notes`. Explicit fields win field by field.
    pub fn planned_fields(&self) -> PlannedFields {
        let legacy = parse_planned_fields(&self.notes);
        PlannedFields {
            start_date: self.planned_start_date.or(legacy.start_date),
            end_date: self.planned_end_date.or(legacy.end_date),
            deposit: self.planned_deposit.or(legacy.deposit),
        }
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.valid_until.is_some_and(|until| until < today)
    }
}
