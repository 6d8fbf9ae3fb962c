use chrono::{NaiveDate, NaiveDateTime};

use super::{quotation_key, rental_key, sale_key, Engine};
use crate::error::{DeskError, Result};
use crate::model::{Payment, Quotation, QuotationStatus, Rental, RentalStatus, Sale, SaleStatus};
use crate::status::{self, QuotationAction, RentalAction, MONEY_EPSILON};

impl<'a> Engine<'a> {
    /// Run `action` against the backend and update the quotation on success
    pub fn transition_quotation(
        &mut self,
        quotation: &mut Quotation,
        action: QuotationAction,
    ) -> Result<QuotationStatus> {
        let next = quotation.check(action).inspect_err(|err| {
            tracing::warn!(quotation = %quotation.quotation_number, error = %err, "transition rejected");
        })?;
        let _ticket = self.in_flight.begin(quotation_key(quotation.id))?;

        self.backend.update_quotation_status(quotation.id, next)?;
        quotation.status = next;
        tracing::info!(quotation = %quotation.quotation_number, status = %next, "quotation updated");
        Ok(next)
    }

    /// Editable locally and confirmed by the backend
    pub fn can_edit(&self, quotation: &Quotation) -> Result<bool> {
        if !quotation.can_edit() {
            return Ok(false);
        }
        self.backend.can_edit(quotation.id)
    }

    /// Expire every pending quotation whose validity ended before `today`
    pub fn expire_quotations(
        &mut self,
        quotations: &mut [Quotation],
        today: NaiveDate,
    ) -> Result<Vec<i64>> {
        let due = status::expired_quotations(quotations, today);
        for quotation in quotations.iter_mut().filter(|q| due.contains(&q.id)) {
            self.transition_quotation(quotation, QuotationAction::Expire)?;
        }
        Ok(due)
    }

    /// Write the overdue status for every active rental past its end date
    pub fn sweep_overdue(
        &mut self,
        rentals: &mut [Rental],
        now: NaiveDateTime,
    ) -> Result<Vec<i64>> {
        let mut changed = Vec::new();
        for rental in rentals.iter_mut() {
            if rental.status != RentalStatus::Active
                || rental.effective_status(now) != RentalStatus::Overdue
            {
                continue;
            }
            let next = rental.check(RentalAction::MarkOverdue)?;
            self.backend.update_rental_status(rental.id, next, None)?;
            rental.status = next;
            changed.push(rental.id);
        }
        if !changed.is_empty() {
            tracing::info!(count = changed.len(), "marked rentals overdue");
        }
        Ok(changed)
    }

    /// Cancel a rental and put each of its items back into stock once
    pub fn cancel_rental(&mut self, rental: &mut Rental) -> Result<()> {
        let next = rental.check(RentalAction::Cancel)?;
        let _ticket = self.in_flight.begin(rental_key(rental.id))?;

        self.backend.cancel_rental(rental.id)?;
        rental.status = next;
        tracing::info!(rental = %rental.rental_number, "rental cancelled");
        self.release_stock(rental)
    }

    pub fn return_rental(&mut self, rental: &mut Rental, condition_in: Option<String>) -> Result<()> {
        let next = rental.check(RentalAction::Return)?;
        let _ticket = self.in_flight.begin(rental_key(rental.id))?;

        self.backend
            .update_rental_status(rental.id, next, condition_in.as_deref())?;
        rental.status = next;
        if condition_in.is_some() {
            rental.condition_in = condition_in;
        }
        tracing::info!(rental = %rental.rental_number, "rental returned");
        self.release_stock(rental)
    }

    pub fn cancel_sale(&mut self, sale: &mut Sale) -> Result<()> {
        sale.check_cancel().inspect_err(|err| {
            tracing::warn!(sale = %sale.sale_number, error = %err, "cancel rejected");
        })?;
        let _ticket = self.in_flight.begin(sale_key(sale.id))?;

        self.backend.cancel_sale(sale.id)?;
        sale.cancel()?;
        tracing::info!(sale = %sale.sale_number, "sale cancelled");
        Ok(())
    }

    pub fn record_sale_payment(&mut self, sale: &mut Sale, payment: Payment) -> Result<()> {
        if sale.status == SaleStatus::Cancelled {
            return Err(DeskError::InvalidState(format!(
                "Sale {} is cancelled and cannot take payments",
                sale.sale_number
            )));
        }
        check_payment(&sale.sale_number, &payment, sale.balance())?;
        let _ticket = self.in_flight.begin(sale_key(sale.id))?;

        self.backend.record_sale_payment(sale.id, &payment)?;
        sale.paid_amount += payment.amount;
        sale.payments.push(payment);
        sale.refresh_status();
        tracing::info!(sale = %sale.sale_number, paid = sale.paid_amount, status = %sale.status, "payment recorded");
        Ok(())
    }

    pub fn record_rental_payment(&mut self, rental: &mut Rental, payment: Payment) -> Result<()> {
        if rental.status == RentalStatus::Cancelled {
            return Err(DeskError::InvalidState(format!(
                "Rental {} is cancelled and cannot take payments",
                rental.rental_number
            )));
        }
        check_payment(&rental.rental_number, &payment, rental.balance())?;
        let _ticket = self.in_flight.begin(rental_key(rental.id))?;

        self.backend.record_rental_payment(rental.id, &payment)?;
        rental.paid_amount += payment.amount;
        rental.payments.push(payment);
        tracing::info!(rental = %rental.rental_number, paid = rental.paid_amount, "payment recorded");
        Ok(())
    }

    /// Restock every item; keeps going past failures and reports the first one
    fn release_stock(&mut self, rental: &Rental) -> Result<()> {
        let mut first_error = None;
        for item in &rental.items {
            if let Err(err) = self.backend.restock(item.product_id, item.quantity) {
                tracing::error!(
                    rental = %rental.rental_number,
                    product = %item.product_name,
                    error = %err,
                    "restock failed"
                );
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn check_payment(document: &str, payment: &Payment, balance: f64) -> Result<()> {
    if !payment.amount.is_finite() || payment.amount <= 0.0 {
        return Err(DeskError::InvalidPaymentAmount);
    }
    let max = balance.max(0.0);
    if payment.amount > max + MONEY_EPSILON {
        return Err(DeskError::OverPayment {
            document: document.to_string(),
            max,
        });
    }
    Ok(())
}
