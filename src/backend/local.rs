use chrono::Datelike;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Backend, Inventory, RentalDraft, SaleDraft};
use crate::config::{self, format_number, Ledger, NumberingSettings};
use crate::error::{DeskError, Result};
use crate::model::{
    LineItem, Payment, Product, Quotation, QuotationStatus, Rental, RentalStatus, Sale,
};
use crate::totals::RemoteTotals;

/// Backend over the `state.toml` ledger. Creating a sale or rental takes the
/// items out of stock and deleting one puts them back. Cancelling a sale puts
/// them back as well; cancelling or returning a rental only changes the
/// status, the caller restocks through [`Inventory::restock`].
pub struct LocalStore {
    dir: Option<PathBuf>,
    ledger: Ledger,
    numbering: NumberingSettings,
    dirty: bool,
}

impl LocalStore {
    pub fn open(config_dir: &Path, numbering: NumberingSettings) -> Result<Self> {
        let ledger = config::load_ledger(config_dir)?;
        Ok(Self {
            dir: Some(config_dir.to_path_buf()),
            ledger,
            numbering,
            dirty: false,
        })
    }

    /// In-memory store; `commit` is a no-op
    pub fn in_memory(ledger: Ledger, numbering: NumberingSettings) -> Self {
        Self {
            dir: None,
            ledger,
            numbering,
            dirty: false,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Numbers the next quotation, sale and rental of `year` would get
    pub fn next_numbers(&self, year: i32) -> [String; 3] {
        let counters = &self.ledger.counters;
        [
            format_number(&self.numbering.quotation_format, year, counters.quotation.peek(year)),
            format_number(&self.numbering.sale_format, year, counters.sale.peek(year)),
            format_number(&self.numbering.rental_format, year, counters.rental.peek(year)),
        ]
    }

    fn product_mut(&mut self, product_id: i64) -> Result<&mut Product> {
        self.ledger
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })
    }

    fn take_stock(&mut self, items: &[LineItem]) -> Result<()> {
        let mut requested: BTreeMap<i64, (u32, &str)> = BTreeMap::new();
        for item in items {
            let entry = requested
                .entry(item.product_id)
                .or_insert((0, item.product_name.as_str()));
            entry.0 += item.quantity;
        }
        for (&product_id, &(quantity, name)) in &requested {
            let available = self.stock_available(product_id)?;
            if quantity > available {
                return Err(DeskError::StockConflict {
                    product: name.to_string(),
                    requested: quantity,
                    available,
                });
            }
        }
        for (product_id, (quantity, _)) in requested {
            let product = self.product_mut(product_id)?;
            product.stock_available -= quantity;
        }
        Ok(())
    }

    fn give_back(&mut self, items: &[LineItem]) -> Result<()> {
        for item in items {
            self.restock(item.product_id, item.quantity)?;
        }
        Ok(())
    }

    fn sale_mut(&mut self, sale_id: i64) -> Result<&mut Sale> {
        self.ledger
            .sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Sale",
                id: sale_id.to_string(),
            })
    }

    fn rental_mut(&mut self, rental_id: i64) -> Result<&mut Rental> {
        self.ledger
            .rentals
            .iter_mut()
            .find(|r| r.id == rental_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Rental",
                id: rental_id.to_string(),
            })
    }

    fn quotation_mut(&mut self, quotation_id: i64) -> Result<&mut Quotation> {
        self.ledger
            .quotations
            .iter_mut()
            .find(|q| q.id == quotation_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Quotation",
                id: quotation_id.to_string(),
            })
    }
}

impl Inventory for LocalStore {
    fn stock_available(&self, product_id: i64) -> Result<u32> {
        self.ledger
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock_available)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })
    }

    fn restock(&mut self, product_id: i64, quantity: u32) -> Result<()> {
        let product = self.product_mut(product_id)?;
        product.stock_available = product.stock_available.saturating_add(quantity);
        self.dirty = true;
        Ok(())
    }
}

impl Backend for LocalStore {
    fn supports_multi_quantity(&self) -> bool {
        true
    }

    fn quotations(&self) -> Result<Vec<Quotation>> {
        Ok(self.ledger.quotations.clone())
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        Ok(self.ledger.sales.clone())
    }

    fn rentals(&self) -> Result<Vec<Rental>> {
        Ok(self.ledger.rentals.clone())
    }

    fn products(&self) -> Result<Vec<Product>> {
        Ok(self.ledger.products.clone())
    }

    fn can_edit(&self, quotation_id: i64) -> Result<bool> {
        self.ledger
            .quotations
            .iter()
            .find(|q| q.id == quotation_id)
            .map(Quotation::can_edit)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Quotation",
                id: quotation_id.to_string(),
            })
    }

    fn update_quotation_status(&mut self, quotation_id: i64, status: QuotationStatus) -> Result<()> {
        self.quotation_mut(quotation_id)?.status = status;
        self.dirty = true;
        Ok(())
    }

    fn create_sale(&mut self, draft: &SaleDraft) -> Result<Sale> {
        self.take_stock(&draft.items)?;

        let year = draft.date.year();
        let seq = self.ledger.counters.sale.advance(year);
        let id = self.ledger.counters.next_id();
        let payments: Vec<Payment> = draft.initial_payment.iter().cloned().collect();

        let mut sale = Sale {
            id,
            sale_number: format_number(&self.numbering.sale_format, year, seq),
            status: Default::default(),
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
            remote: RemoteTotals::default(),
        };
        sale.refresh_status();

        self.ledger.sales.push(sale.clone());
        self.dirty = true;
        tracing::debug!(sale = %sale.sale_number, "stored sale");
        Ok(sale)
    }

    fn delete_sale(&mut self, sale_id: i64) -> Result<()> {
        let idx = self
            .ledger
            .sales
            .iter()
            .position(|s| s.id == sale_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Sale",
                id: sale_id.to_string(),
            })?;
        let sale = self.ledger.sales.remove(idx);
        self.dirty = true;
        self.give_back(&sale.items)
    }

    /// The ledger owns the stock, so a cancelled sale hands its items back
    fn cancel_sale(&mut self, sale_id: i64) -> Result<()> {
        let sale = self.sale_mut(sale_id)?;
        sale.cancel()?;
        let items = sale.items.clone();
        self.dirty = true;
        self.give_back(&items)
    }

    fn record_sale_payment(&mut self, sale_id: i64, payment: &Payment) -> Result<()> {
        let sale = self.sale_mut(sale_id)?;
        sale.paid_amount += payment.amount;
        sale.payments.push(payment.clone());
        sale.refresh_status();
        self.dirty = true;
        Ok(())
    }

    fn create_rental(&mut self, draft: &RentalDraft) -> Result<Rental> {
        self.take_stock(&draft.items)?;

        let year = draft.date.year();
        let seq = self.ledger.counters.rental.advance(year);
        let id = self.ledger.counters.next_id();

        let rental = Rental {
            id,
            rental_number: format_number(&self.numbering.rental_format, year, seq),
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
            remote: RemoteTotals::default(),
        };

        self.ledger.rentals.push(rental.clone());
        self.dirty = true;
        tracing::debug!(rental = %rental.rental_number, "stored rental");
        Ok(rental)
    }

    fn delete_rental(&mut self, rental_id: i64) -> Result<()> {
        let idx = self
            .ledger
            .rentals
            .iter()
            .position(|r| r.id == rental_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Rental",
                id: rental_id.to_string(),
            })?;
        let rental = self.ledger.rentals.remove(idx);
        self.dirty = true;
        self.give_back(&rental.items)
    }

    fn cancel_rental(&mut self, rental_id: i64) -> Result<()> {
        self.rental_mut(rental_id)?.status = RentalStatus::Cancelled;
        self.dirty = true;
        Ok(())
    }

    fn update_rental_status(
        &mut self,
        rental_id: i64,
        status: RentalStatus,
        condition_in: Option<&str>,
    ) -> Result<()> {
        let rental = self.rental_mut(rental_id)?;
        rental.status = status;
        if let Some(condition) = condition_in {
            rental.condition_in = Some(condition.to_string());
        }
        self.dirty = true;
        Ok(())
    }

    fn record_rental_payment(&mut self, rental_id: i64, payment: &Payment) -> Result<()> {
        let rental = self.rental_mut(rental_id)?;
        rental.paid_amount += payment.amount;
        rental.payments.push(payment.clone());
        self.dirty = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(dir) = &self.dir {
            config::save_ledger(dir, &self.ledger)?;
        }
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Client, PaymentMethod, SaleStatus};
    use crate::totals;
    use chrono::NaiveDate;

    fn store() -> LocalStore {
        let mut ledger = Ledger::default();
        ledger.products.push(Product {
            id: 1,
            name: "Mixer".to_string(),
            stock_available: 3,
            sale_price: Some(100.0),
            rental_price: Some(20.0),
        });
        LocalStore::in_memory(ledger, NumberingSettings::default())
    }

    fn draft(quantity: u32) -> SaleDraft {
        let items = vec![LineItem::new(1, "Mixer", quantity, 100.0)];
        SaleDraft {
            client: Client::named("Ana"),
            totals: totals::compute_local(&items, 1, Default::default()),
            items,
            payment_method: PaymentMethod::Cash,
            tax_rate: 0.0,
            discount_amount: 0.0,
            discount_percent: 0.0,
            initial_payment: None,
            quotation_id: None,
            notes: String::new(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_create_sale_takes_stock_and_numbers() {
        let mut store = store();
        let sale = store.create_sale(&draft(2)).unwrap();
        assert_eq!(sale.sale_number, "VEN-2026-0001");
        assert_eq!(sale.status, SaleStatus::PendingPayment);
        assert_eq!(store.stock_available(1).unwrap(), 1);

        store.delete_sale(sale.id).unwrap();
        assert_eq!(store.stock_available(1).unwrap(), 3);
        assert!(store.ledger().sales.is_empty());
    }

    #[test]
    fn test_cancel_sale_returns_stock_once() {
        let mut store = store();
        let sale = store.create_sale(&draft(2)).unwrap();

        store.cancel_sale(sale.id).unwrap();
        assert_eq!(store.ledger().sales[0].status, SaleStatus::Cancelled);
        assert_eq!(store.stock_available(1).unwrap(), 3);

        let err = store.cancel_sale(sale.id).unwrap_err();
        assert!(matches!(err, DeskError::InvalidTransition { .. }));
        assert_eq!(store.stock_available(1).unwrap(), 3);
    }

    #[test]
    fn test_create_sale_rejects_short_stock() {
        let mut store = store();
        let err = store.create_sale(&draft(4)).unwrap_err();
        assert!(matches!(err, DeskError::StockConflict { available: 3, .. }));
        assert_eq!(store.stock_available(1).unwrap(), 3);
    }

    #[test]
    fn test_unknown_product() {
        let store = store();
        assert!(matches!(
            store.stock_available(9),
            Err(DeskError::NotFound { .. })
        ));
    }
}
