use serde_json::{json, Value};
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use super::wire;
use super::{Backend, Inventory, RentalDraft, SaleDraft};
use crate::config::ApiSettings;
use crate::error::{DeskError, Result};
use crate::model::{
    Payment, Product, Quotation, QuotationStatus, Rental, RentalStatus, Sale, SaleStatus,
};

/// Client for the desk REST API
pub struct HttpBackend {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(settings: &ApiSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone().filter(|t| !t.is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn get(&self, path: &str) -> Result<Value> {
        tracing::debug!(path, "GET");
        let outcome = self.authorize(self.agent.get(self.url(path))).call();
        self.finish(path, outcome)
    }

    fn delete(&self, path: &str) -> Result<Value> {
        tracing::debug!(path, "DELETE");
        let outcome = self.authorize(self.agent.delete(self.url(path))).call();
        self.finish(path, outcome)
    }

    fn post(&self, path: &str, query: &[(&str, &str)], body: Option<&Value>) -> Result<Value> {
        tracing::debug!(path, "POST");
        let mut request = self.authorize(self.agent.post(self.url(path)));
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let outcome = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .send(body.to_string()),
            None => request.send_empty(),
        };
        self.finish(path, outcome)
    }

    fn put(&self, path: &str, query: &[(&str, &str)], body: Option<&Value>) -> Result<Value> {
        tracing::debug!(path, "PUT");
        let mut request = self.authorize(self.agent.put(self.url(path)));
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let outcome = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .send(body.to_string()),
            None => request.send_empty(),
        };
        self.finish(path, outcome)
    }

    fn finish(
        &self,
        endpoint: &str,
        outcome: std::result::Result<Response<Body>, ureq::Error>,
    ) -> Result<Value> {
        let mut response = outcome.map_err(|err| {
            tracing::error!(endpoint, error = %err, "request failed");
            DeskError::RemoteFailure {
                status: None,
                detail: Some(format!("Could not reach the server: {err}")),
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| DeskError::MalformedResponse {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            })?;

        if status == 401 {
            tracing::warn!(endpoint, "token rejected");
            return Err(DeskError::Unauthorized);
        }
        if !(200..300).contains(&status) {
            let detail = wire::error_detail(&body);
            tracing::warn!(endpoint, status, detail = detail.as_deref(), "request rejected");
            return Err(DeskError::RemoteFailure {
                status: Some(status),
                detail,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| DeskError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        })
    }

    fn list<T>(&self, path: &str, parse: fn(&Value, &str) -> Result<T>) -> Result<Vec<T>> {
        let body = self.get(path)?;
        wire::list(&body, path)?
            .iter()
            .map(|value| parse(value, path))
            .collect()
    }
}

impl Inventory for HttpBackend {
    fn stock_available(&self, product_id: i64) -> Result<u32> {
        let path = format!("/products/{product_id}");
        let body = self.get(&path)?;
        Ok(wire::parse_product(&body, &path)?.stock_available)
    }

    fn restock(&mut self, product_id: i64, quantity: u32) -> Result<()> {
        let body = json!({
            "product_id": product_id,
            "movement_type": "entrada",
            "quantity": quantity,
            "reason": "Devolución de alquiler",
        });
        self.post("/inventory/movements", &[], Some(&body))?;
        Ok(())
    }
}

impl Backend for HttpBackend {
    // the API stores one unit per rental record
    fn supports_multi_quantity(&self) -> bool {
        false
    }

    fn quotations(&self) -> Result<Vec<Quotation>> {
        self.list("/quotations", wire::parse_quotation)
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        self.list("/sales", wire::parse_sale)
    }

    fn rentals(&self) -> Result<Vec<Rental>> {
        self.list("/rentals", wire::parse_rental)
    }

    fn products(&self) -> Result<Vec<Product>> {
        self.list("/products", wire::parse_product)
    }

    fn can_edit(&self, quotation_id: i64) -> Result<bool> {
        let path = format!("/quotations/{quotation_id}/can-edit");
        let body = self.get(&path)?;
        match &body {
            Value::Bool(flag) => Ok(*flag),
            other => other
                .get("can_edit")
                .and_then(Value::as_bool)
                .ok_or_else(|| DeskError::MalformedResponse {
                    endpoint: path.clone(),
                    reason: "missing can_edit flag".to_string(),
                }),
        }
    }

    fn update_quotation_status(&mut self, quotation_id: i64, status: QuotationStatus) -> Result<()> {
        let path = format!("/quotations/{quotation_id}/status");
        self.put(&path, &[("status", status.wire_name())], None)?;
        Ok(())
    }

    fn create_sale(&mut self, draft: &SaleDraft) -> Result<Sale> {
        let body = self.post("/sales", &[], Some(&wire::sale_payload(draft)))?;
        wire::parse_sale(&body, "/sales")
    }

    fn delete_sale(&mut self, sale_id: i64) -> Result<()> {
        self.delete(&format!("/sales/{sale_id}"))?;
        Ok(())
    }

    fn cancel_sale(&mut self, sale_id: i64) -> Result<()> {
        let body = json!({ "status": SaleStatus::Cancelled.wire_name() });
        self.put(&format!("/sales/{sale_id}"), &[], Some(&body))?;
        Ok(())
    }

    fn record_sale_payment(&mut self, sale_id: i64, payment: &Payment) -> Result<()> {
        let mut body = wire::payment_payload(payment);
        body["sale_id"] = json!(sale_id);
        self.post("/sales/payments", &[], Some(&body))?;
        Ok(())
    }

    fn create_rental(&mut self, draft: &RentalDraft) -> Result<Rental> {
        let body = self.post("/rentals/", &[], Some(&wire::rental_payload(draft)))?;
        wire::parse_rental(&body, "/rentals/")
    }

    fn delete_rental(&mut self, rental_id: i64) -> Result<()> {
        self.delete(&format!("/rentals/{rental_id}"))?;
        Ok(())
    }

    fn cancel_rental(&mut self, rental_id: i64) -> Result<()> {
        self.post(&format!("/rentals/{rental_id}/cancel"), &[], None)?;
        Ok(())
    }

    fn update_rental_status(
        &mut self,
        rental_id: i64,
        status: RentalStatus,
        condition_in: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({ "status": status.wire_name() });
        if let Some(condition) = condition_in {
            body["condition_in"] = json!(condition);
        }
        self.put(&format!("/rentals/{rental_id}"), &[], Some(&body))?;
        Ok(())
    }

    fn record_rental_payment(&mut self, rental_id: i64, payment: &Payment) -> Result<()> {
        let body = wire::payment_payload(payment);
        self.post(&format!("/rentals/{rental_id}/payments"), &[], Some(&body))?;
        Ok(())
    }

    /// The server converts and flips the status in one transaction
    fn convert_quotation_to_sale(&mut self, quotation: &Quotation, draft: &SaleDraft) -> Result<Sale> {
        let path = format!("/quotations/{}/convert-to-sale", quotation.id);
        let body = self.post(
            &path,
            &[("payment_method", draft.payment_method.wire_name())],
            None,
        )?;
        let mut sale = wire::parse_sale(&body, &path)?;

        // the conversion is committed at this point; a failed payment leaves the sale unpaid
        if let Some(payment) = &draft.initial_payment {
            if let Err(err) = self.record_sale_payment(sale.id, payment) {
                tracing::error!(sale = %sale.sale_number, error = %err, "initial payment not recorded");
                return Err(DeskError::PaymentNotRecorded {
                    sale: sale.sale_number,
                    detail: err.user_message(),
                });
            }
            sale.paid_amount += payment.amount;
            sale.payments.push(payment.clone());
            sale.refresh_status();
        }
        Ok(sale)
    }

    /// A single-unit rental goes through the server-side conversion; anything
    /// fanned out is created record by record.
    fn convert_quotation_to_rental(
        &mut self,
        quotation: &Quotation,
        drafts: &[RentalDraft],
    ) -> Result<Vec<Rental>> {
        match drafts {
            [only] => {
                let path = format!("/quotations/{}/convert-to-rental", quotation.id);
                let body = self.post(&path, &[], Some(&wire::rental_payload(only)))?;
                Ok(vec![wire::parse_rental(&body, &path)?])
            }
            _ => super::sequential_rental_conversion(self, quotation, drafts),
        }
    }
}
