//! Mapping between REST payloads and the internal schema.
//!
//! The API has changed shape over time: numbers sometimes arrive as strings,
//! totals live under `total_amount`, `total` or `amount`, older rentals carry
//! a single `product` instead of `items`, and clients come either embedded or
//! as `client_id` + `client_name`. All of that is absorbed here so nothing
//! downstream has to look at raw JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Map, Value};
use std::str::FromStr;

use super::{RentalDraft, SaleDraft};
use crate::error::{DeskError, Result};
use crate::model::{
    Client, LineItem, Payment, Product, Quotation, QuotationStatus, QuotationType,
    Rental, RentalStatus, Sale, SaleStatus, TaxType,
};
use crate::totals::RemoteTotals;

/// A number that may have been sent as a JSON string
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn field_number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| value.get(*key).and_then(number))
}

fn amount(value: &Value, keys: &[&str]) -> f64 {
    field_number(value, keys).unwrap_or(0.0)
}

fn id(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn enum_field<T: FromStr + Default>(value: &Value, key: &str) -> T {
    match value.get(key).and_then(Value::as_str) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(field = key, value = raw, "unknown value, using default");
            T::default()
        }),
        None => T::default(),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

/// Accepts RFC 3339, naive ISO datetimes and plain dates (read as midnight)
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn date_field(value: &Value, keys: &[&str]) -> Option<NaiveDate> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str).and_then(parse_date))
}

fn datetime_field(value: &Value, key: &str) -> Option<NaiveDateTime> {
    value.get(key).and_then(Value::as_str).and_then(parse_datetime)
}

fn malformed(endpoint: &str, reason: impl Into<String>) -> DeskError {
    DeskError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason: reason.into(),
    }
}

/// Top-level list: a bare array or an object wrapping one
pub fn list<'v>(body: &'v Value, endpoint: &str) -> Result<&'v [Value]> {
    let array = match body {
        Value::Array(items) => Some(items),
        Value::Object(map) => ["items", "results", "data"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    };
    array
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(endpoint, "expected a list"))
}

pub fn parse_client(value: &Value) -> Client {
    match value.get("client") {
        Some(client @ Value::Object(_)) => Client {
            id: id(client, "id"),
            name: text(client, &["name", "full_name"]).unwrap_or_default(),
            address: text(client, &["address"]),
            city: text(client, &["city"]),
            phone: text(client, &["phone"]),
            email: text(client, &["email"]),
            tax_id: text(client, &["tax_id", "rnc", "document_id"]),
        },
        _ => Client {
            id: id(value, "client_id"),
            name: text(value, &["client_name"]).unwrap_or_default(),
            ..Client::default()
        },
    }
}

fn parse_item(value: &Value) -> LineItem {
    let product = value.get("product").filter(|p| p.is_object());
    let product_id = id(value, "product_id")
        .or_else(|| product.and_then(|p| id(p, "id")))
        .unwrap_or_default();
    let product_name = text(value, &["product_name", "name"])
        .or_else(|| product.and_then(|p| text(p, &["name"])))
        .unwrap_or_default();
    let quantity = field_number(value, &["quantity"])
        .map(|q| q.max(0.0).round() as u32)
        .unwrap_or(1);

    LineItem {
        product_id,
        product_name,
        quantity,
        unit_price: amount(value, &["unit_price", "price", "rental_price", "daily_rate"]),
        discount_percentage: amount(value, &["discount_percentage", "discount_percent"]),
        tax_type: value
            .get("tax_type")
            .and_then(Value::as_str)
            .map(TaxType::from_wire)
            .unwrap_or_default(),
    }
}

/// `items[]`, or the single legacy `product` of an old rental record
pub fn parse_items(value: &Value) -> Vec<LineItem> {
    if let Some(items) = value.get("items").and_then(Value::as_array) {
        if !items.is_empty() {
            return items.iter().map(parse_item).collect();
        }
    }

    let legacy_product = value.get("product").filter(|p| p.is_object());
    if legacy_product.is_none() && value.get("product_id").is_none() {
        return Vec::new();
    }
    let mut item = parse_item(value);
    if item.unit_price == 0.0 {
        if let Some(price) = legacy_product.and_then(|p| field_number(p, &["rental_price", "price"])) {
            item.unit_price = price;
        }
    }
    vec![item]
}

fn remote_totals(value: &Value, total_keys: &[&str]) -> RemoteTotals {
    RemoteTotals {
        tax_amount: field_number(value, &["tax_amount"]),
        total: field_number(value, total_keys),
    }
}

fn parse_payments(value: &Value) -> Vec<Payment> {
    let Some(payments) = value.get("payments").and_then(Value::as_array) else {
        return Vec::new();
    };
    payments
        .iter()
        .filter_map(|p| {
            Some(Payment {
                amount: field_number(p, &["amount"])?,
                method: enum_field(p, "payment_method"),
                reference: text(p, &["reference"]),
                date: date_field(p, &["payment_date", "date", "created_at"])?,
            })
        })
        .collect()
}

fn paid_amount(value: &Value, payments: &[Payment]) -> f64 {
    field_number(value, &["paid_amount", "amount_paid"])
        .unwrap_or_else(|| payments.iter().map(|p| p.amount).sum())
}

fn require_id(value: &Value, endpoint: &str) -> Result<i64> {
    id(value, "id").ok_or_else(|| malformed(endpoint, "record without an id"))
}

pub fn parse_quotation(value: &Value, endpoint: &str) -> Result<Quotation> {
    let record_id = require_id(value, endpoint)?;
    let quotation_type: QuotationType = enum_field(value, "quotation_type");
    let status: QuotationStatus = enum_field(value, "status");

    Ok(Quotation {
        id: record_id,
        quotation_number: text(value, &["quotation_number", "number"])
            .unwrap_or_else(|| format!("COT-{record_id}")),
        quotation_type,
        status,
        client: parse_client(value),
        items: parse_items(value),
        tax_rate: amount(value, &["tax_rate"]),
        discount_amount: amount(value, &["discount_amount", "discount"]),
        discount_percent: amount(value, &["discount_percent"]),
        valid_until: date_field(value, &["valid_until"]),
        created_at: date_field(value, &["created_at", "date"]),
        notes: text(value, &["notes"]).unwrap_or_default(),
        payment_method: value
            .get("payment_method")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok()),
        planned_start_date: date_field(value, &["planned_start_date", "start_date"]),
        planned_end_date: date_field(value, &["planned_end_date", "end_date"]),
        planned_deposit: field_number(value, &["planned_deposit", "deposit"]),
        remote: remote_totals(value, &["total_amount", "total", "amount"]),
    })
}

pub fn parse_sale(value: &Value, endpoint: &str) -> Result<Sale> {
    let record_id = require_id(value, endpoint)?;
    let payments = parse_payments(value);
    let status: SaleStatus = enum_field(value, "status");

    Ok(Sale {
        id: record_id,
        sale_number: text(value, &["sale_number", "number"])
            .unwrap_or_else(|| format!("VEN-{record_id}")),
        status,
        client: parse_client(value),
        items: parse_items(value),
        payment_method: enum_field(value, "payment_method"),
        tax_rate: amount(value, &["tax_rate"]),
        discount_amount: amount(value, &["discount_amount", "discount"]),
        discount_percent: amount(value, &["discount_percent"]),
        paid_amount: paid_amount(value, &payments),
        payments,
        quotation_id: id(value, "quotation_id"),
        created_at: date_field(value, &["created_at", "sale_date", "date"]),
        notes: text(value, &["notes"]).unwrap_or_default(),
        remote: remote_totals(value, &["total_amount", "total", "amount"]),
    })
}

pub fn parse_rental(value: &Value, endpoint: &str) -> Result<Rental> {
    let record_id = require_id(value, endpoint)?;
    let start_date = datetime_field(value, "start_date")
        .ok_or_else(|| malformed(endpoint, format!("rental {record_id} has no start date")))?;
    let end_date = datetime_field(value, "end_date").unwrap_or(start_date);
    let payments = parse_payments(value);
    let status: RentalStatus = enum_field(value, "status");

    Ok(Rental {
        id: record_id,
        rental_number: text(value, &["rental_number", "number"])
            .unwrap_or_else(|| format!("ALQ-{record_id}")),
        status,
        client: parse_client(value),
        items: parse_items(value),
        start_date,
        end_date,
        deposit: amount(value, &["deposit", "deposit_amount"]),
        paid_amount: paid_amount(value, &payments),
        payments,
        tax_rate: amount(value, &["tax_rate"]),
        discount_amount: amount(value, &["discount_amount", "discount"]),
        discount_percent: amount(value, &["discount_percent"]),
        payment_method: enum_field(value, "payment_method"),
        condition_out: text(value, &["condition_out"]).unwrap_or_default(),
        condition_in: text(value, &["condition_in"]),
        notes: text(value, &["notes"]).unwrap_or_default(),
        quotation_id: id(value, "quotation_id"),
        created_at: date_field(value, &["created_at"]),
        remote: remote_totals(value, &["total_cost", "total_amount", "total", "amount"]),
    })
}

pub fn parse_product(value: &Value, endpoint: &str) -> Result<Product> {
    let record_id = require_id(value, endpoint)?;
    Ok(Product {
        id: record_id,
        name: text(value, &["name"]).unwrap_or_default(),
        stock_available: field_number(value, &["stock_available", "stock", "quantity_available"])
            .map(|s| s.max(0.0).floor() as u32)
            .unwrap_or(0),
        sale_price: field_number(value, &["sale_price", "price"]),
        rental_price: field_number(value, &["rental_price", "daily_rate"]),
    })
}

/// Human-readable detail of an error body. FastAPI sends either a string
/// or a list of validation entries with a `msg` each.
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|e| e.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn items_payload(items: &[LineItem]) -> Vec<Value> {
    items
        .iter()
        .map(|item| {
            json!({
                "product_id": item.product_id,
                "product_name": item.product_name,
                "quantity": item.quantity,
                "unit_price": item.unit_price,
                "discount_percentage": item.discount_percentage,
                "tax_type": item.tax_type.label(),
            })
        })
        .collect()
}

fn client_fields(map: &mut Map<String, Value>, client: &Client) {
    if let Some(client_id) = client.id {
        map.insert("client_id".to_string(), json!(client_id));
    }
    map.insert("client_name".to_string(), json!(client.name));
}

pub fn sale_payload(draft: &SaleDraft) -> Value {
    let mut body = json!({
        "items": items_payload(&draft.items),
        "payment_method": draft.payment_method.wire_name(),
        "tax_rate": draft.tax_rate,
        "discount_amount": draft.totals.discount_amount,
        "subtotal": draft.totals.subtotal,
        "tax_amount": draft.totals.tax_amount,
        "total_amount": draft.totals.display_total(),
        "notes": draft.notes,
        "sale_date": draft.date.format("%Y-%m-%d").to_string(),
        "paid_amount": draft.initial_payment.as_ref().map_or(0.0, |p| p.amount),
    });
    if let Value::Object(map) = &mut body {
        client_fields(map, &draft.client);
        if let Some(quotation_id) = draft.quotation_id {
            map.insert("quotation_id".to_string(), json!(quotation_id));
        }
    }
    body
}

pub fn rental_payload(draft: &RentalDraft) -> Value {
    let mut body = json!({
        "items": items_payload(&draft.items),
        "start_date": draft.start_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "end_date": draft.end_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "deposit": draft.deposit,
        "payment_method": draft.payment_method.wire_name(),
        "condition_out": draft.condition_out,
        "notes": draft.notes,
        "tax_rate": draft.tax_rate,
        "discount_amount": draft.discount_amount,
        "discount_percent": draft.discount_percent,
    });
    if let Value::Object(map) = &mut body {
        client_fields(map, &draft.client);
        if let [only] = draft.items.as_slice() {
            // single-unit records also carry the legacy flat fields
            map.insert("product_id".to_string(), json!(only.product_id));
            map.insert("rental_price".to_string(), json!(only.unit_price));
        }
        if let Some(quotation_id) = draft.quotation_id {
            map.insert("quotation_id".to_string(), json!(quotation_id));
        }
    }
    body
}

pub fn payment_payload(payment: &Payment) -> Value {
    json!({
        "amount": payment.amount,
        "payment_method": payment.method.wire_name(),
        "reference": payment.reference,
        "payment_date": payment.date.format("%Y-%m-%d").to_string(),
    })
}
