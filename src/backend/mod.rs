//! The seam to the system of record.
//!
//! [`HttpBackend`] talks to the REST API; [`LocalStore`] keeps a TOML ledger
//! in the config directory. The conversion engine only sees these traits.

mod http;
mod local;
pub mod wire;

pub use http::HttpBackend;
pub use local::LocalStore;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::model::{
    Client, LineItem, Payment, PaymentMethod, Product, Quotation, QuotationStatus, Rental,
    RentalStatus, Sale,
};
use crate::totals::Totals;

/// Everything needed to create a sale
#[derive(Debug, Clone, PartialEq)]
pub struct SaleDraft {
    pub client: Client,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    pub tax_rate: f64,
    pub discount_amount: f64,
    pub discount_percent: f64,
    /// Locally computed figures, sent along for the backend to cross-check
    pub totals: Totals,
    pub initial_payment: Option<Payment>,
    pub quotation_id: Option<i64>,
    pub notes: String,
    pub date: NaiveDate,
}

/// Everything needed to create a rental
#[derive(Debug, Clone, PartialEq)]
pub struct RentalDraft {
    pub client: Client,
    pub items: Vec<LineItem>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub deposit: f64,
    pub payment_method: PaymentMethod,
    pub condition_out: String,
    pub notes: String,
    pub tax_rate: f64,
    pub discount_amount: f64,
    pub discount_percent: f64,
    pub quotation_id: Option<i64>,
    pub date: NaiveDate,
}

/// Stock bookkeeping
pub trait Inventory {
    fn stock_available(&self, product_id: i64) -> Result<u32>;

    /// Put `quantity` units of a product back into stock
    fn restock(&mut self, product_id: i64, quantity: u32) -> Result<()>;
}

pub trait Backend: Inventory {
    /// Whether a rental line may carry more than one unit
    fn supports_multi_quantity(&self) -> bool;

    fn quotations(&self) -> Result<Vec<Quotation>>;
    fn sales(&self) -> Result<Vec<Sale>>;
    fn rentals(&self) -> Result<Vec<Rental>>;
    fn products(&self) -> Result<Vec<Product>>;

    fn can_edit(&self, quotation_id: i64) -> Result<bool>;
    fn update_quotation_status(&mut self, quotation_id: i64, status: QuotationStatus)
        -> Result<()>;

    fn create_sale(&mut self, draft: &SaleDraft) -> Result<Sale>;
    fn delete_sale(&mut self, sale_id: i64) -> Result<()>;
    fn cancel_sale(&mut self, sale_id: i64) -> Result<()>;
    fn record_sale_payment(&mut self, sale_id: i64, payment: &Payment) -> Result<()>;

    fn create_rental(&mut self, draft: &RentalDraft) -> Result<Rental>;
    fn delete_rental(&mut self, rental_id: i64) -> Result<()>;
    fn cancel_rental(&mut self, rental_id: i64) -> Result<()>;
    fn update_rental_status(
        &mut self,
        rental_id: i64,
        status: RentalStatus,
        condition_in: Option<&str>,
    ) -> Result<()>;
    fn record_rental_payment(&mut self, rental_id: i64, payment: &Payment) -> Result<()>;

    /// Create the sale and mark the quotation converted as one unit: if the
    /// status update fails the sale is deleted again.
    fn convert_quotation_to_sale(&mut self, quotation: &Quotation, draft: &SaleDraft) -> Result<Sale> {
        sequential_sale_conversion(self, quotation, draft)
    }

    /// Rental counterpart of [`Backend::convert_quotation_to_sale`]
    fn convert_quotation_to_rental(
        &mut self,
        quotation: &Quotation,
        drafts: &[RentalDraft],
    ) -> Result<Vec<Rental>> {
        sequential_rental_conversion(self, quotation, drafts)
    }

    /// Flush pending writes. A no-op for remote backends.
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Create first, then flip the quotation; undo the creation if the flip fails
pub fn sequential_sale_conversion<B: Backend + ?Sized>(
    backend: &mut B,
    quotation: &Quotation,
    draft: &SaleDraft,
) -> Result<Sale> {
    let sale = backend.create_sale(draft)?;

    if let Err(err) = backend.update_quotation_status(quotation.id, QuotationStatus::Converted) {
        tracing::error!(
            quotation = %quotation.quotation_number,
            sale = %sale.sale_number,
            error = %err,
            "quotation status update failed, deleting created sale"
        );
        if let Err(undo) = backend.delete_sale(sale.id) {
            tracing::error!(sale = %sale.sale_number, error = %undo, "could not delete sale");
        }
        return Err(err);
    }

    Ok(sale)
}

pub fn sequential_rental_conversion<B: Backend + ?Sized>(
    backend: &mut B,
    quotation: &Quotation,
    drafts: &[RentalDraft],
) -> Result<Vec<Rental>> {
    let mut created: Vec<Rental> = Vec::with_capacity(drafts.len());

    let mut outcome: Result<()> = Ok(());
    for draft in drafts {
        match backend.create_rental(draft) {
            Ok(rental) => created.push(rental),
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }
    if outcome.is_ok() {
        outcome = backend.update_quotation_status(quotation.id, QuotationStatus::Converted);
    }

    if let Err(err) = outcome {
        tracing::error!(
            quotation = %quotation.quotation_number,
            created = created.len(),
            error = %err,
            "rental conversion failed, deleting created rentals"
        );
        for rental in &created {
            if let Err(undo) = backend.delete_rental(rental.id) {
                tracing::error!(rental = %rental.rental_number, error = %undo, "could not delete rental");
            }
        }
        return Err(err);
    }

    Ok(created)
}
