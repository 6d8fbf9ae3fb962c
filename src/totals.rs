//! Document totals.
//!
//! Every view that shows money (list tables, detail output, printed documents,
//! conversions) goes through [`Priced::totals`], so the same record always
//! yields the same figures.
//!
//! Rules:
//! - subtotal is `Σ quantity × unit_price`, times the day count for rentals
//! - tax is charged on the pre-discount subtotal
//! - a percentage discount takes precedence over a flat discount amount
//! - values reported by the backend (tax amount, grand total) win over the
//!   locally computed ones when present
//! - missing or non-finite inputs count as zero

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::convert::notes::DEFAULT_RENTAL_DAYS;
use crate::model::{LineItem, Quotation, QuotationType, Rental, Sale};

const SECONDS_PER_DAY: i64 = 86_400;

/// Figures the backend computed itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTotals {
    #[serde(default)]
    pub tax_amount: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// Document-level tax and discount settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Adjustments {
    pub tax_rate: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total: f64,
}

impl Totals {
    /// Grand total as shown to people. The stored `total` is left untouched.
    pub fn display_total(&self) -> f64 {
        self.total.max(0.0)
    }
}

fn lenient(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Billable days between two instants: the ceiling of the day difference,
/// never less than one. An inverted range also counts as one day.
pub fn rental_days(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 1;
    }
    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX).max(1)
}

pub fn line_subtotal(item: &LineItem, days: u32) -> f64 {
    item.quantity as f64 * lenient(item.unit_price) * days as f64
}

pub fn subtotal(items: &[LineItem], days: u32) -> f64 {
    items.iter().map(|item| line_subtotal(item, days)).sum()
}

/// Totals from line items only, ignoring anything the backend reported
pub fn compute_local(items: &[LineItem], days: u32, adjustments: Adjustments) -> Totals {
    let subtotal = subtotal(items, days);
    let tax_amount = subtotal * lenient(adjustments.tax_rate) / 100.0;

    let discount_percent = lenient(adjustments.discount_percent);
    let discount_amount = if discount_percent > 0.0 {
        subtotal * discount_percent / 100.0
    } else {
        lenient(adjustments.discount_amount)
    };

    Totals {
        subtotal,
        tax_amount,
        discount_amount,
        total: subtotal + tax_amount - discount_amount,
    }
}

/// Apply backend-reported values over locally computed totals
pub fn reconcile(local: Totals, remote: RemoteTotals) -> Totals {
    let tax_amount = remote
        .tax_amount
        .filter(|v| v.is_finite())
        .unwrap_or(local.tax_amount);
    let total = remote
        .total
        .filter(|v| v.is_finite())
        .unwrap_or(local.subtotal + tax_amount - local.discount_amount);

    Totals {
        subtotal: local.subtotal,
        tax_amount,
        discount_amount: local.discount_amount,
        total,
    }
}

pub fn calculate(
    items: &[LineItem],
    days: u32,
    adjustments: Adjustments,
    remote: RemoteTotals,
) -> Totals {
    let totals = reconcile(compute_local(items, days, adjustments), remote);
    tracing::debug!(
        subtotal = totals.subtotal,
        tax = totals.tax_amount,
        discount = totals.discount_amount,
        total = totals.total,
        days,
        "computed totals"
    );
    totals
}

/// A document with priced line items
pub trait Priced {
    fn line_items(&self) -> &[LineItem];

    fn adjustments(&self) -> Adjustments;

    fn remote_totals(&self) -> RemoteTotals {
        RemoteTotals::default()
    }

    /// Multiplier applied to every line; 1 for anything but rentals
    fn billed_days(&self) -> u32 {
        1
    }

    fn local_totals(&self) -> Totals {
        compute_local(self.line_items(), self.billed_days(), self.adjustments())
    }

    fn totals(&self) -> Totals {
        calculate(
            self.line_items(),
            self.billed_days(),
            self.adjustments(),
            self.remote_totals(),
        )
    }
}

impl Priced for Sale {
    fn line_items(&self) -> &[LineItem] {
        &self.items
    }

    fn adjustments(&self) -> Adjustments {
        Adjustments {
            tax_rate: self.tax_rate,
            discount_percent: self.discount_percent,
            discount_amount: self.discount_amount,
        }
    }

    fn remote_totals(&self) -> RemoteTotals {
        self.remote
    }
}

impl Priced for Rental {
    fn line_items(&self) -> &[LineItem] {
        &self.items
    }

    fn adjustments(&self) -> Adjustments {
        Adjustments {
            tax_rate: self.tax_rate,
            discount_percent: self.discount_percent,
            discount_amount: self.discount_amount,
        }
    }

    fn remote_totals(&self) -> RemoteTotals {
        self.remote
    }

    fn billed_days(&self) -> u32 {
        rental_days(self.start_date, self.end_date)
    }
}

impl Priced for Quotation {
    fn line_items(&self) -> &[LineItem] {
        &self.items
    }

    fn adjustments(&self) -> Adjustments {
        Adjustments {
            tax_rate: self.tax_rate,
            discount_percent: self.discount_percent,
            discount_amount: self.discount_amount,
        }
    }

    fn remote_totals(&self) -> RemoteTotals {
        self.remote
    }

    fn billed_days(&self) -> u32 {
        if self.quotation_type != QuotationType::Rental {
            return 1;
        }
        // gaps filled the way conversion fills them, anchored on the quote date
        let planned = self.planned_fields();
        match planned.start_date.or(self.created_at) {
            Some(anchor) => {
                let fields = planned.resolve(anchor);
                rental_days(
                    fields.start_date.and_time(NaiveTime::MIN),
                    fields.end_date.and_time(NaiveTime::MIN),
                )
            }
            None => DEFAULT_RENTAL_DAYS as u32,
        }
    }
}

impl Sale {
    /// `total - paid_amount`. Not clamped; an overpaid sale is logged.
    pub fn balance(&self) -> f64 {
        let balance = self.totals().total - self.paid_amount;
        if balance < -0.001 {
            tracing::warn!(sale = %self.sale_number, balance, "sale is paid beyond its total");
        }
        balance
    }
}

impl Rental {
    pub fn balance(&self) -> f64 {
        let balance = self.totals().total - self.paid_amount;
        if balance < -0.001 {
            tracing::warn!(rental = %self.rental_number, balance, "rental is paid beyond its total");
        }
        balance
    }
}
