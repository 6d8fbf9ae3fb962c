pub mod app;
pub mod backend;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod model;
pub mod pdf;
pub mod status;
pub mod totals;

pub use app::{AppContext, View};
pub use backend::{Backend, Inventory, RentalDraft, SaleDraft};
pub use config::Config;
pub use convert::{Engine, InFlight, RentalConversion, SaleConversion};
pub use error::{DeskError, ErrorKind, Result};
pub use totals::{Priced, Totals};
