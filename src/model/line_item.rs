use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};

/// Whether the document tax rate applies to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    #[default]
    #[serde(alias = "E", alias = "exento")]
    Exempt,
    #[serde(alias = "G", alias = "gravado")]
    Standard,
}

impl TaxType {
    /// Column label printed on documents
    pub fn label(&self) -> &'static str {
        match self {
            TaxType::Exempt => "E",
            TaxType::Standard => "G",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s.trim() {
            "G" | "g" | "standard" | "gravado" => TaxType::Standard,
            _ => TaxType::Exempt,
        }
    }
}

/// One product entry on a quotation, sale or rental.
///
/// `product_name` is a snapshot taken when the parent document was created,
/// so renaming the product later does not change printed documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub tax_type: TaxType,
}

impl LineItem {
    pub fn new(product_id: i64, product_name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            discount_percentage: 0.0,
            tax_type: TaxType::Exempt,
        }
    }

    pub fn with_tax_type(mut self, tax_type: TaxType) -> Self {
        self.tax_type = tax_type;
        self
    }

    pub fn with_discount(mut self, percentage: f64) -> Self {
        self.discount_percentage = percentage;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(DeskError::Validation(format!(
                "quantity for '{}' must be greater than 0",
                self.product_name
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(DeskError::Validation(format!(
                "unit price for '{}' must be zero or more",
                self.product_name
            )));
        }
        if !(0.0..=100.0).contains(&self.discount_percentage) {
            return Err(DeskError::Validation(format!(
                "discount for '{}' must be between 0 and 100",
                self.product_name
            )));
        }
        Ok(())
    }
}
