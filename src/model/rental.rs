use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Client, LineItem, Payment, PaymentMethod};
use crate::totals::RemoteTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    #[default]
    #[serde(alias = "activo")]
    Active,
    #[serde(alias = "devuelto")]
    Returned,
    #[serde(alias = "vencido")]
    Overdue,
    #[serde(alias = "cancelado")]
    Cancelled,
}

impl RentalStatus {
    pub const ALL: [RentalStatus; 4] = [
        RentalStatus::Active,
        RentalStatus::Returned,
        RentalStatus::Overdue,
        RentalStatus::Cancelled,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            RentalStatus::Active => "activo",
            RentalStatus::Returned => "devuelto",
            RentalStatus::Overdue => "vencido",
            RentalStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RentalStatus::Active => "active",
            RentalStatus::Returned => "returned",
            RentalStatus::Overdue => "overdue",
            RentalStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for RentalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "activo" => Ok(RentalStatus::Active),
            // the API reports returned-but-unpaid rentals separately
            "returned" | "devuelto" | "devuelto_no_pagado" | "completado" => {
                Ok(RentalStatus::Returned)
            }
            "overdue" | "vencido" => Ok(RentalStatus::Overdue),
            "cancelled" | "cancelado" => Ok(RentalStatus::Cancelled),
            other => Err(format!(
                "Invalid rental status: {other}. Use active, returned, overdue, or cancelled"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub id: i64,
    pub rental_number: String,
    #[serde(default)]
    pub status: RentalStatus,
    pub client: Client,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    #[serde(default)]
    pub deposit: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub condition_out: String,
    #[serde(default)]
    pub condition_in: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub quotation_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
    #[serde(default)]
    pub remote: RemoteTotals,
}
