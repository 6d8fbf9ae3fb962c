//! Canonical internal schema. Backend payloads are mapped onto these types
//! once, in `backend::wire`.

mod line_item;
mod party;
mod quotation;
mod rental;
mod sale;

pub use line_item::{LineItem, TaxType};
pub use party::{Client, Organization, Product};
pub use quotation::{Quotation, QuotationStatus, QuotationType};
pub use rental::{Rental, RentalStatus};
pub use sale::{Payment, PaymentMethod, Sale, SaleStatus};
