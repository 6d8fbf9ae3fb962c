use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::model::{Product, Quotation, Rental, Sale};

/// Contents of `state.toml`: the local ledger used when no API is configured
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Ledger {
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub quotations: Vec<Quotation>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub rentals: Vec<Rental>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Counters {
    #[serde(default)]
    pub quotation: Counter,
    #[serde(default)]
    pub sale: Counter,
    #[serde(default)]
    pub rental: Counter,
    /// Last record id handed out, shared by every kind
    #[serde(default)]
    pub last_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Counter {
    pub last_number: u32,
    pub last_year: i32,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            last_number: 0,
            last_year: chrono::Local::now().year(),
        }
    }
}

impl Counter {
    /// Sequence number the next document would get; resets every year
    pub fn peek(&self, year: i32) -> u32 {
        if self.last_year == year {
            self.last_number + 1
        } else {
            1
        }
    }

    pub fn advance(&mut self, year: i32) -> u32 {
        let seq = self.peek(year);
        self.last_number = seq;
        self.last_year = year;
        seq
    }
}

impl Counters {
    pub fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}
