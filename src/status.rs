//! Lifecycle rules for quotations, rentals and sales.
//!
//! Quotation: `pending -> {accepted, rejected, expired}`, `accepted -> converted`.
//! Converting is only reachable through the conversion engine.
//!
//! Rental: `active -> {returned, cancelled, overdue}`, `overdue -> {returned, cancelled}`.
//!
//! Sale status follows the payments, with `cancelled` as a terminal override.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

use crate::error::{DeskError, Result};
use crate::model::{Quotation, QuotationStatus, Rental, RentalStatus, Sale, SaleStatus};
use crate::totals::Priced;

/// Tolerance for comparing money amounts
pub const MONEY_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotationAction {
    Accept,
    Reject,
    Expire,
}

impl QuotationAction {
    pub const ALL: [QuotationAction; 3] = [
        QuotationAction::Accept,
        QuotationAction::Reject,
        QuotationAction::Expire,
    ];
}

impl fmt::Display for QuotationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotationAction::Accept => f.write_str("accept"),
            QuotationAction::Reject => f.write_str("reject"),
            QuotationAction::Expire => f.write_str("expire"),
        }
    }
}

impl QuotationStatus {
    pub fn next(self, action: QuotationAction) -> Option<QuotationStatus> {
        match (self, action) {
            (QuotationStatus::Pending, QuotationAction::Accept) => Some(QuotationStatus::Accepted),
            (QuotationStatus::Pending, QuotationAction::Reject) => Some(QuotationStatus::Rejected),
            (QuotationStatus::Pending, QuotationAction::Expire) => Some(QuotationStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QuotationStatus::Converted | QuotationStatus::Rejected | QuotationStatus::Expired
        )
    }

    pub fn is_editable(self) -> bool {
        self == QuotationStatus::Pending
    }

    pub fn can_convert(self) -> bool {
        self == QuotationStatus::Accepted
    }
}

impl Quotation {
    /// Target status for `action`, or `InvalidTransition` with the record untouched
    pub fn check(&self, action: QuotationAction) -> Result<QuotationStatus> {
        self.status
            .next(action)
            .ok_or_else(|| DeskError::InvalidTransition {
                entity: "quotation",
                from: self.status.to_string(),
                action: action.to_string(),
            })
    }

    pub fn apply(&mut self, action: QuotationAction) -> Result<QuotationStatus> {
        let next = self.check(action)?;
        self.status = next;
        Ok(next)
    }

    pub(crate) fn mark_converted(&mut self) -> Result<()> {
        if !self.status.can_convert() {
            return Err(DeskError::InvalidTransition {
                entity: "quotation",
                from: self.status.to_string(),
                action: "convert".to_string(),
            });
        }
        self.status = QuotationStatus::Converted;
        Ok(())
    }
}

/// Pending quotations whose validity ended before `today`
pub fn expired_quotations(quotations: &[Quotation], today: NaiveDate) -> Vec<i64> {
    quotations
        .iter()
        .filter(|q| q.status == QuotationStatus::Pending && q.is_expired_on(today))
        .map(|q| q.id)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalAction {
    Return,
    Cancel,
    MarkOverdue,
}

impl RentalAction {
    pub const ALL: [RentalAction; 3] = [
        RentalAction::Return,
        RentalAction::Cancel,
        RentalAction::MarkOverdue,
    ];
}

impl fmt::Display for RentalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RentalAction::Return => f.write_str("return"),
            RentalAction::Cancel => f.write_str("cancel"),
            RentalAction::MarkOverdue => f.write_str("mark overdue"),
        }
    }
}

impl RentalStatus {
    pub fn next(self, action: RentalAction) -> Option<RentalStatus> {
        match (self, action) {
            (RentalStatus::Active, RentalAction::Return)
            | (RentalStatus::Overdue, RentalAction::Return) => Some(RentalStatus::Returned),
            (RentalStatus::Active, RentalAction::Cancel)
            | (RentalStatus::Overdue, RentalAction::Cancel) => Some(RentalStatus::Cancelled),
            (RentalStatus::Active, RentalAction::MarkOverdue) => Some(RentalStatus::Overdue),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RentalStatus::Returned | RentalStatus::Cancelled)
    }
}

impl Rental {
    pub fn check(&self, action: RentalAction) -> Result<RentalStatus> {
        self.status
            .next(action)
            .ok_or_else(|| DeskError::InvalidTransition {
                entity: "rental",
                from: self.status.to_string(),
                action: action.to_string(),
            })
    }

    pub fn apply(&mut self, action: RentalAction) -> Result<RentalStatus> {
        let next = self.check(action)?;
        self.status = next;
        Ok(next)
    }

    /// Status as of `now`: an active rental past its end date reads as overdue
    /// without anything being written.
    pub fn effective_status(&self, now: NaiveDateTime) -> RentalStatus {
        if self.status == RentalStatus::Active && self.end_date < now {
            RentalStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Persist the lazy overdue rule: flips every active rental past its end date
/// and returns the ids that changed.
pub fn sweep_overdue(rentals: &mut [Rental], now: NaiveDateTime) -> Vec<i64> {
    let mut changed = Vec::new();
    for rental in rentals.iter_mut() {
        if rental.effective_status(now) == RentalStatus::Overdue
            && rental.status == RentalStatus::Active
        {
            rental.status = RentalStatus::Overdue;
            changed.push(rental.id);
        }
    }
    changed
}

/// Sale status implied by how much has been paid
pub fn derive_sale_status(paid_amount: f64, total: f64) -> SaleStatus {
    if paid_amount <= MONEY_EPSILON {
        SaleStatus::PendingPayment
    } else if paid_amount + MONEY_EPSILON < total {
        SaleStatus::Partial
    } else {
        SaleStatus::Completed
    }
}

impl Sale {
    /// Re-derive the status from the paid amount. Cancelled sales stay cancelled.
    pub fn refresh_status(&mut self) {
        if self.status != SaleStatus::Cancelled {
            self.status = derive_sale_status(self.paid_amount, self.totals().total);
        }
    }

    /// Any sale that is not already cancelled may be cancelled, paid or not
    pub fn check_cancel(&self) -> Result<()> {
        if self.status == SaleStatus::Cancelled {
            return Err(DeskError::InvalidTransition {
                entity: "sale",
                from: self.status.to_string(),
                action: "cancel".to_string(),
            });
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.check_cancel()?;
        self.status = SaleStatus::Cancelled;
        Ok(())
    }
}
