use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Client, LineItem};
use crate::totals::RemoteTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[serde(alias = "completada")]
    Completed,
    #[default]
    #[serde(alias = "pendiente_pago")]
    PendingPayment,
    #[serde(alias = "parcial")]
    Partial,
    #[serde(alias = "cancelada")]
    Cancelled,
}

impl SaleStatus {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completada",
            SaleStatus::PendingPayment => "pendiente_pago",
            SaleStatus::Partial => "parcial",
            SaleStatus::Cancelled => "cancelada",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleStatus::Completed => "completed",
            SaleStatus::PendingPayment => "pending_payment",
            SaleStatus::Partial => "partial",
            SaleStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" | "completada" => Ok(SaleStatus::Completed),
            "pending_payment" | "pendiente_pago" => Ok(SaleStatus::PendingPayment),
            "partial" | "parcial" => Ok(SaleStatus::Partial),
            "cancelled" | "cancelada" => Ok(SaleStatus::Cancelled),
            other => Err(format!("Invalid sale status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "efectivo")]
    Cash,
    #[serde(alias = "tarjeta")]
    Card,
    #[serde(alias = "transferencia")]
    Transfer,
    #[serde(alias = "cheque")]
    Check,
}

impl PaymentMethod {
    pub fn wire_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "efectivo",
            PaymentMethod::Card => "tarjeta",
            PaymentMethod::Transfer => "transferencia",
            PaymentMethod::Check => "cheque",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Check => "check",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            "check" | "cheque" => Ok(PaymentMethod::Check),
            other => Err(format!(
                "Invalid payment method: {other}. Use cash, card, transfer, or check"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: f64,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub sale_number: String,
    #[serde(default)]
    pub status: SaleStatus,
    pub client: Client,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub quotation_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub remote: RemoteTotals,
}
