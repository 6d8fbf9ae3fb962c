#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;

use desk::backend::{sequential_sale_conversion, Backend, Inventory, RentalDraft, SaleDraft};
use desk::error::{DeskError, Result};
use desk::model::{
    Client, LineItem, Payment, PaymentMethod, Product, Quotation, QuotationStatus, QuotationType,
    Rental, RentalStatus, Sale, SaleStatus,
};

/// In-memory backend that records every call and can be told to fail
#[derive(Default)]
pub struct FakeBackend {
    pub multi_quantity: bool,
    pub stock: HashMap<i64, u32>,
    pub quotations: Vec<Quotation>,
    pub sales: Vec<Sale>,
    pub rentals: Vec<Rental>,
    pub calls: Vec<String>,
    pub restocks: Vec<(i64, u32)>,
    pub fail_status_update: bool,
    /// Fail the n-th rental creation (0-based)
    pub fail_rental_create_at: Option<usize>,
    pub remote_can_edit: bool,
    /// Convert like the REST API does, then reject the initial payment
    pub fail_initial_payment: bool,
    next_id: i64,
    rental_creates: usize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            multi_quantity: true,
            remote_can_edit: true,
            next_id: 100,
            ..Self::default()
        }
    }

    /// Backend that stores one unit per rental record
    pub fn single_unit() -> Self {
        Self {
            multi_quantity: false,
            ..Self::new()
        }
    }

    pub fn with_stock(mut self, product_id: i64, quantity: u32) -> Self {
        self.stock.insert(product_id, quantity);
        self
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Inventory for FakeBackend {
    fn stock_available(&self, product_id: i64) -> Result<u32> {
        Ok(self.stock.get(&product_id).copied().unwrap_or(0))
    }

    fn restock(&mut self, product_id: i64, quantity: u32) -> Result<()> {
        self.calls.push(format!("restock {product_id} {quantity}"));
        self.restocks.push((product_id, quantity));
        Ok(())
    }
}

impl Backend for FakeBackend {
    fn supports_multi_quantity(&self) -> bool {
        self.multi_quantity
    }

    fn quotations(&self) -> Result<Vec<Quotation>> {
        Ok(self.quotations.clone())
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        Ok(self.sales.clone())
    }

    fn rentals(&self) -> Result<Vec<Rental>> {
        Ok(self.rentals.clone())
    }

    fn products(&self) -> Result<Vec<Product>> {
        Ok(Vec::new())
    }

    fn can_edit(&self, _quotation_id: i64) -> Result<bool> {
        Ok(self.remote_can_edit)
    }

    fn update_quotation_status(
        &mut self,
        quotation_id: i64,
        status: QuotationStatus,
    ) -> Result<()> {
        self.calls
            .push(format!("update_quotation_status {quotation_id} {status}"));
        if self.fail_status_update {
            return Err(DeskError::RemoteFailure {
                status: Some(500),
                detail: Some("status update failed".to_string()),
            });
        }
        if let Some(q) = self.quotations.iter_mut().find(|q| q.id == quotation_id) {
            q.status = status;
        }
        Ok(())
    }

    fn create_sale(&mut self, draft: &SaleDraft) -> Result<Sale> {
        self.calls.push("create_sale".to_string());
        let id = self.id();
        let payments: Vec<Payment> = draft.initial_payment.iter().cloned().collect();
        let mut sale = Sale {
            id,
            sale_number: format!("VEN-{id}"),
            status: SaleStatus::PendingPayment,
            client: draft.client.clone(),
            items: draft.items.clone(),
            payment_method: draft.payment_method,
            tax_rate: draft.tax_rate,
            discount_amount: draft.discount_amount,
            discount_percent: draft.discount_percent,
            paid_amount: payments.iter().map(|p| p.amount).sum(),
            payments,
            quotation_id: draft.quotation_id,
            created_at: Some(draft.date),
            notes: draft.notes.clone(),
            remote: Default::default(),
        };
        sale.refresh_status();
        self.sales.push(sale.clone());
        Ok(sale)
    }

    fn delete_sale(&mut self, sale_id: i64) -> Result<()> {
        self.calls.push(format!("delete_sale {sale_id}"));
        self.sales.retain(|s| s.id != sale_id);
        Ok(())
    }

    fn cancel_sale(&mut self, sale_id: i64) -> Result<()> {
        self.calls.push(format!("cancel_sale {sale_id}"));
        if let Some(sale) = self.sales.iter_mut().find(|s| s.id == sale_id) {
            sale.status = SaleStatus::Cancelled;
        }
        Ok(())
    }

    fn record_sale_payment(&mut self, sale_id: i64, _payment: &Payment) -> Result<()> {
        self.calls.push(format!("record_sale_payment {sale_id}"));
        if self.fail_initial_payment {
            return Err(DeskError::RemoteFailure {
                status: Some(422),
                detail: Some("payment rejected".to_string()),
            });
        }
        Ok(())
    }

    fn convert_quotation_to_sale(&mut self, quotation: &Quotation, draft: &SaleDraft) -> Result<Sale> {
        if !self.fail_initial_payment {
            return sequential_sale_conversion(self, quotation, draft);
        }
        let unpaid = SaleDraft {
            initial_payment: None,
            ..draft.clone()
        };
        let sale = sequential_sale_conversion(self, quotation, &unpaid)?;
        match &draft.initial_payment {
            Some(payment) => match self.record_sale_payment(sale.id, payment) {
                Ok(()) => Ok(sale),
                Err(err) => Err(DeskError::PaymentNotRecorded {
                    sale: sale.sale_number,
                    detail: err.user_message(),
                }),
            },
            None => Ok(sale),
        }
    }

    fn create_rental(&mut self, draft: &RentalDraft) -> Result<Rental> {
        self.calls.push("create_rental".to_string());
        let attempt = self.rental_creates;
        self.rental_creates += 1;
        if self.fail_rental_create_at == Some(attempt) {
            return Err(DeskError::RemoteFailure {
                status: Some(400),
                detail: Some("rental rejected".to_string()),
            });
        }
        let id = self.id();
        let rental = Rental {
            id,
            rental_number: format!("ALQ-{id}"),
            status: RentalStatus::Active,
            client: draft.client.clone(),
            items: draft.items.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            deposit: draft.deposit,
            paid_amount: 0.0,
            payments: Vec::new(),
            tax_rate: draft.tax_rate,
            discount_amount: draft.discount_amount,
            discount_percent: draft.discount_percent,
            payment_method: draft.payment_method,
            condition_out: draft.condition_out.clone(),
            condition_in: None,
            notes: draft.notes.clone(),
            quotation_id: draft.quotation_id,
            created_at: Some(draft.date),
            remote: Default::default(),
        };
        self.rentals.push(rental.clone());
        Ok(rental)
    }

    fn delete_rental(&mut self, rental_id: i64) -> Result<()> {
        self.calls.push(format!("delete_rental {rental_id}"));
        self.rentals.retain(|r| r.id != rental_id);
        Ok(())
    }

    fn cancel_rental(&mut self, rental_id: i64) -> Result<()> {
        self.calls.push(format!("cancel_rental {rental_id}"));
        Ok(())
    }

    fn update_rental_status(
        &mut self,
        rental_id: i64,
        status: RentalStatus,
        _condition_in: Option<&str>,
    ) -> Result<()> {
        self.calls
            .push(format!("update_rental_status {rental_id} {status}"));
        Ok(())
    }

    fn record_rental_payment(&mut self, rental_id: i64, _payment: &Payment) -> Result<()> {
        self.calls.push(format!("record_rental_payment {rental_id}"));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_time(NaiveTime::MIN)
}

/// Two lines: 2 x 100 exempt and 1 x 50 taxed, 18% tax
pub fn sale_quotation() -> Quotation {
    Quotation {
        id: 1,
        quotation_number: "COT-2024-0001".to_string(),
        quotation_type: QuotationType::Sale,
        status: QuotationStatus::Accepted,
        client: Client::named("Ferretería Central"),
        items: vec![
            LineItem::new(10, "Taladro", 2, 100.0),
            LineItem::new(11, "Broca", 1, 50.0).with_tax_type(desk::model::TaxType::Standard),
        ],
        tax_rate: 18.0,
        discount_amount: 0.0,
        discount_percent: 0.0,
        valid_until: Some(date(2024, 1, 31)),
        created_at: Some(date(2024, 1, 1)),
        notes: String::new(),
        payment_method: None,
        planned_start_date: None,
        planned_end_date: None,
        planned_deposit: None,
        remote: Default::default(),
    }
}

/// One line of 1 x 20/day, planned for 2024-01-01..2024-01-08 with deposit 140
pub fn rental_quotation() -> Quotation {
    Quotation {
        id: 2,
        quotation_number: "COT-2024-0002".to_string(),
        quotation_type: QuotationType::Rental,
        items: vec![LineItem::new(20, "Andamio", 1, 20.0)],
        tax_rate: 0.0,
        planned_start_date: Some(date(2024, 1, 1)),
        planned_end_date: Some(date(2024, 1, 8)),
        planned_deposit: Some(140.0),
        ..sale_quotation()
    }
}

pub fn active_rental(items: Vec<LineItem>) -> Rental {
    Rental {
        id: 50,
        rental_number: "ALQ-2024-0001".to_string(),
        status: RentalStatus::Active,
        client: Client::named("Constructora Sur"),
        items,
        start_date: midnight(2024, 1, 1),
        end_date: midnight(2024, 1, 8),
        deposit: 0.0,
        paid_amount: 0.0,
        payments: Vec::new(),
        tax_rate: 0.0,
        discount_amount: 0.0,
        discount_percent: 0.0,
        payment_method: PaymentMethod::Cash,
        condition_out: String::new(),
        condition_in: None,
        notes: String::new(),
        quotation_id: None,
        created_at: Some(date(2024, 1, 1)),
        remote: Default::default(),
    }
}

pub fn payment(amount: f64) -> Payment {
    Payment {
        amount,
        method: PaymentMethod::Cash,
        reference: None,
        date: date(2024, 1, 10),
    }
}
