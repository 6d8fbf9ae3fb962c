//! Quotation conversion and the other money-affecting workflows.
//!
//! Every operation checks the state machine locally before the backend is
//! called, and only mutates the caller's record after the backend reported
//! success. A failed conversion therefore leaves the quotation `accepted`.

pub mod fanout;
mod lifecycle;
pub mod notes;

use chrono::{NaiveDate, NaiveTime};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::backend::{Backend, RentalDraft, SaleDraft};
use crate::error::{DeskError, Result};
use crate::model::{LineItem, Payment, PaymentMethod, Quotation, QuotationType, Rental, Sale};
use crate::totals::{self, Priced, RemoteTotals};
use notes::PlannedFields;

/// Documents with a request in progress. Clones share the same set, so every
/// view holding a clone sees the same submissions.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` until the returned ticket is dropped
    pub fn begin(&self, key: impl Into<String>) -> Result<FlightTicket> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(key.clone()) {
            return Err(DeskError::InvalidState(format!(
                "{key} already has a request in progress"
            )));
        }
        Ok(FlightTicket {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(key)
    }
}

#[derive(Debug)]
pub struct FlightTicket {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for FlightTicket {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

pub fn quotation_key(id: i64) -> String {
    format!("quotation {id}")
}

pub fn rental_key(id: i64) -> String {
    format!("rental {id}")
}

pub fn sale_key(id: i64) -> String {
    format!("sale {id}")
}

/// Options for turning a sale quotation into a sale
#[derive(Debug, Clone)]
pub struct SaleConversion {
    pub payment_method: PaymentMethod,
    /// Record the full total as paid at conversion time
    pub mark_paid: bool,
    pub date: NaiveDate,
}

/// Options for turning a rental quotation into rentals. Unset fields come
/// from the quotation's plan, then from defaults.
#[derive(Debug, Clone)]
pub struct RentalConversion {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deposit: Option<f64>,
    pub payment_method: PaymentMethod,
    pub condition_out: String,
    pub today: NaiveDate,
}

pub struct Engine<'a> {
    backend: &'a mut dyn Backend,
    in_flight: InFlight,
}

impl<'a> Engine<'a> {
    pub fn new(backend: &'a mut dyn Backend) -> Self {
        Self::with_in_flight(backend, InFlight::new())
    }

    pub fn with_in_flight(backend: &'a mut dyn Backend, in_flight: InFlight) -> Self {
        Self { backend, in_flight }
    }

    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn convert_to_sale(
        &mut self,
        quotation: &mut Quotation,
        request: &SaleConversion,
    ) -> Result<Sale> {
        ensure_convertible(quotation, QuotationType::Sale)?;
        let _ticket = self.in_flight.begin(quotation_key(quotation.id))?;

        validate_items(&quotation.items)?;
        self.check_stock(&quotation.items)?;

        // recomputed from the items; whatever totals the quotation carries may be stale
        let totals = totals::calculate(
            &quotation.items,
            1,
            quotation.adjustments(),
            RemoteTotals::default(),
        );

        let initial_payment = request.mark_paid.then(|| Payment {
            amount: totals.display_total(),
            method: request.payment_method,
            reference: None,
            date: request.date,
        });

        let draft = SaleDraft {
            client: quotation.client.clone(),
            items: quotation.items.clone(),
            payment_method: request.payment_method,
            tax_rate: quotation.tax_rate,
            discount_amount: quotation.discount_amount,
            discount_percent: quotation.discount_percent,
            totals,
            initial_payment,
            quotation_id: Some(quotation.id),
            notes: quotation.notes.clone(),
            date: request.date,
        };

        let sale = match self.backend.convert_quotation_to_sale(quotation, &draft) {
            Ok(sale) => sale,
            // the sale exists remotely, so the quotation is converted regardless
            Err(err @ DeskError::PaymentNotRecorded { .. }) => {
                quotation.mark_converted()?;
                tracing::error!(
                    quotation = %quotation.quotation_number,
                    error = %err,
                    "converted to sale without the initial payment"
                );
                return Err(err);
            }
            Err(err) => {
                tracing::error!(
                    quotation = %quotation.quotation_number,
                    error = %err,
                    "conversion to sale failed"
                );
                return Err(err);
            }
        };

        quotation.mark_converted()?;
        tracing::info!(
            quotation = %quotation.quotation_number,
            sale = %sale.sale_number,
            total = totals.total,
            "converted quotation to sale"
        );
        Ok(sale)
    }

    pub fn convert_to_rental(
        &mut self,
        quotation: &mut Quotation,
        request: &RentalConversion,
    ) -> Result<Vec<Rental>> {
        ensure_convertible(quotation, QuotationType::Rental)?;
        let _ticket = self.in_flight.begin(quotation_key(quotation.id))?;

        let plan = quotation.planned_fields();
        let fields = PlannedFields {
            start_date: request.start_date.or(plan.start_date),
            end_date: request.end_date.or(plan.end_date),
            deposit: request.deposit.or(plan.deposit),
        }
        .resolve(request.today);

        let draft = RentalDraft {
            client: quotation.client.clone(),
            items: quotation.items.clone(),
            start_date: fields.start_date.and_time(NaiveTime::MIN),
            end_date: fields.end_date.and_time(NaiveTime::MIN),
            deposit: fields.deposit,
            payment_method: request.payment_method,
            condition_out: request.condition_out.clone(),
            notes: quotation.notes.clone(),
            tax_rate: quotation.tax_rate,
            discount_amount: quotation.discount_amount,
            discount_percent: quotation.discount_percent,
            quotation_id: Some(quotation.id),
            date: request.today,
        };

        validate_rental_draft(&draft)?;
        self.check_stock(&draft.items)?;
        let drafts = self.shape_for_backend(draft);

        let rentals = self
            .backend
            .convert_quotation_to_rental(quotation, &drafts)
            .map_err(|err| {
                tracing::error!(
                    quotation = %quotation.quotation_number,
                    error = %err,
                    "conversion to rental failed"
                );
                err
            })?;

        quotation.mark_converted()?;
        tracing::info!(
            quotation = %quotation.quotation_number,
            rentals = rentals.len(),
            "converted quotation to rental"
        );
        Ok(rentals)
    }

    /// Create rentals straight from a cart, validating stock for the whole
    /// cart before anything is written.
    pub fn create_rentals(&mut self, draft: RentalDraft) -> Result<Vec<Rental>> {
        validate_rental_draft(&draft)?;
        self.check_stock(&draft.items)?;

        let mut created: Vec<Rental> = Vec::new();
        for unit in self.shape_for_backend(draft) {
            match self.backend.create_rental(&unit) {
                Ok(rental) => created.push(rental),
                Err(err) => {
                    tracing::error!(
                        created = created.len(),
                        error = %err,
                        "rental creation failed, deleting created rentals"
                    );
                    for rental in &created {
                        if let Err(undo) = self.backend.delete_rental(rental.id) {
                            tracing::error!(rental = %rental.rental_number, error = %undo, "could not delete rental");
                        }
                    }
                    return Err(err);
                }
            }
        }

        tracing::info!(rentals = created.len(), "created rentals");
        Ok(created)
    }

    fn shape_for_backend(&self, draft: RentalDraft) -> Vec<RentalDraft> {
        if self.backend.supports_multi_quantity() {
            vec![draft]
        } else {
            fanout::fan_out(&draft)
        }
    }

    /// Reject the whole request when any product is short, counting repeated
    /// lines of the same product together.
    fn check_stock(&self, items: &[LineItem]) -> Result<()> {
        let mut requested: BTreeMap<i64, (u32, &str)> = BTreeMap::new();
        for item in items {
            let entry = requested
                .entry(item.product_id)
                .or_insert((0, item.product_name.as_str()));
            entry.0 += item.quantity;
        }

        for (product_id, (quantity, name)) in requested {
            let available = self.backend.stock_available(product_id)?;
            if available == 0 || quantity > available {
                tracing::warn!(product = name, quantity, available, "stock conflict");
                return Err(DeskError::StockConflict {
                    product: name.to_string(),
                    requested: quantity,
                    available,
                });
            }
        }
        Ok(())
    }
}

fn ensure_convertible(quotation: &Quotation, target: QuotationType) -> Result<()> {
    if quotation.quotation_type != target {
        return Err(DeskError::InvalidState(format!(
            "Quotation {} is a {} quotation and cannot become a {}",
            quotation.quotation_number, quotation.quotation_type, target
        )));
    }
    if !quotation.status.can_convert() {
        tracing::warn!(
            quotation = %quotation.quotation_number,
            status = %quotation.status,
            "conversion rejected"
        );
        return Err(DeskError::InvalidState(format!(
            "Quotation {} is {}; only accepted quotations can be converted",
            quotation.quotation_number, quotation.status
        )));
    }
    Ok(())
}

fn validate_items(items: &[LineItem]) -> Result<()> {
    if items.is_empty() {
        return Err(DeskError::Validation(
            "at least one line item is required".to_string(),
        ));
    }
    items.iter().try_for_each(LineItem::validate)
}

fn validate_rental_draft(draft: &RentalDraft) -> Result<()> {
    validate_items(&draft.items)?;
    if draft.end_date < draft.start_date {
        return Err(DeskError::Validation(format!(
            "end date {} is before start date {}",
            draft.end_date.date(),
            draft.start_date.date()
        )));
    }
    if !draft.deposit.is_finite() || draft.deposit < 0.0 {
        return Err(DeskError::Validation(
            "deposit must be zero or more".to_string(),
        ));
    }
    Ok(())
}
