//! Printable documents.
//!
//! A [`PrintModel`] is built from a sale, rental or quotation plus the
//! organization profile and a [`Formatter`]. Figures come from
//! [`Priced::totals`], the same function the list views use, so a printed
//! document never disagrees with what was shown on screen. Missing profile
//! fields print as empty strings.

mod format;
pub mod html;

pub use format::{Formatter, LocaleFormatter};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::model::{Client, LineItem, Organization, Quotation, QuotationType, Rental, Sale};
use crate::totals::{line_subtotal, Priced, Totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    RentalContract,
    Quotation,
}

impl DocumentKind {
    pub fn title(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "FACTURA",
            DocumentKind::RentalContract => "CONTRATO DE ALQUILER",
            DocumentKind::Quotation => "COTIZACIÓN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationBlock {
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub contact: String,
    pub logo_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientBlock {
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub tax_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRow {
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub discount_pct: String,
    pub tax_label: &'static str,
    pub line_subtotal: String,
}

/// Formatted totals for display; the raw figures stay in `PrintModel::totals`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsText {
    pub subtotal: String,
    pub tax_amount: String,
    pub discount_amount: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureBlock {
    pub stamp_ref: String,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintModel {
    pub document_type: DocumentKind,
    pub title: String,
    pub document_number: String,
    pub issue_date: String,
    pub due_date: String,
    pub organization: OrganizationBlock,
    pub client: ClientBlock,
    pub line_rows: Vec<LineRow>,
    /// Billed days for rental documents
    pub days: Option<u32>,
    pub tax_rate: f64,
    pub totals: Totals,
    pub totals_text: TotalsText,
    /// Extra rows under the totals: rental period, deposit, paid, balance
    pub summary_rows: Vec<SummaryRow>,
    pub notes: String,
    pub signature_block: SignatureBlock,
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn join_present(parts: &[&Option<String>], separator: &str) -> String {
    parts
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn organization_block(org: &Organization) -> OrganizationBlock {
    OrganizationBlock {
        name: or_empty(&org.name),
        tax_id: or_empty(&org.tax_id),
        address: join_present(&[&org.address, &org.city], ", "),
        contact: join_present(&[&org.phone, &org.email, &org.website], " | "),
        logo_ref: or_empty(&org.logo_url),
    }
}

fn client_block(client: &Client) -> ClientBlock {
    ClientBlock {
        name: client.name.clone(),
        address: or_empty(&client.address),
        city: or_empty(&client.city),
        phone: or_empty(&client.phone),
        tax_id: or_empty(&client.tax_id),
    }
}

fn line_rows(items: &[LineItem], days: u32, fmt: &dyn Formatter) -> Vec<LineRow> {
    items
        .iter()
        .map(|item| LineRow {
            name: item.product_name.clone(),
            unit_price: fmt.currency(item.unit_price),
            quantity: item.quantity,
            discount_pct: format!("{}%", item.discount_percentage),
            tax_label: item.tax_type.label(),
            line_subtotal: fmt.currency(line_subtotal(item, days)),
        })
        .collect()
}

fn totals_text(totals: &Totals, fmt: &dyn Formatter) -> TotalsText {
    TotalsText {
        subtotal: fmt.currency(totals.subtotal),
        tax_amount: fmt.currency(totals.tax_amount),
        discount_amount: fmt.currency(totals.discount_amount),
        total: fmt.currency(totals.display_total()),
    }
}

fn row(label: &str, value: String) -> SummaryRow {
    SummaryRow {
        label: label.to_string(),
        value,
    }
}

fn date_or_empty(date: Option<NaiveDate>, fmt: &dyn Formatter) -> String {
    date.map(|d| fmt.date(d)).unwrap_or_default()
}

struct Skeleton<'a> {
    kind: DocumentKind,
    number: &'a str,
    issue_date: String,
    due_date: String,
    client: &'a Client,
    items: &'a [LineItem],
    days: Option<u32>,
    tax_rate: f64,
    totals: Totals,
    summary_rows: Vec<SummaryRow>,
    notes: &'a str,
}

fn assemble(skeleton: Skeleton<'_>, org: &Organization, fmt: &dyn Formatter) -> PrintModel {
    let organization = organization_block(org);
    let signer = organization.name.clone();
    PrintModel {
        document_type: skeleton.kind,
        title: skeleton.kind.title().to_string(),
        document_number: skeleton.number.to_string(),
        issue_date: skeleton.issue_date,
        due_date: skeleton.due_date,
        client: client_block(skeleton.client),
        line_rows: line_rows(skeleton.items, skeleton.days.unwrap_or(1), fmt),
        days: skeleton.days,
        tax_rate: skeleton.tax_rate,
        totals_text: totals_text(&skeleton.totals, fmt),
        totals: skeleton.totals,
        summary_rows: skeleton.summary_rows,
        notes: skeleton.notes.trim().to_string(),
        signature_block: SignatureBlock {
            stamp_ref: or_empty(&org.stamp_url),
            signer,
        },
        organization,
    }
}

/// Sale invoice. The due date is the issue date plus `due_days`.
pub fn print_sale(
    sale: &Sale,
    org: &Organization,
    fmt: &dyn Formatter,
    due_days: i64,
) -> PrintModel {
    let totals = sale.totals();
    let summary_rows = vec![
        row("Método de pago", sale.payment_method.wire_name().to_string()),
        row("Pagado", fmt.currency(sale.paid_amount)),
        row("Pendiente", fmt.currency(totals.total - sale.paid_amount)),
    ];
    assemble(
        Skeleton {
            kind: DocumentKind::Invoice,
            number: &sale.sale_number,
            issue_date: date_or_empty(sale.created_at, fmt),
            due_date: date_or_empty(sale.created_at.map(|d| d + Duration::days(due_days)), fmt),
            client: &sale.client,
            items: &sale.items,
            days: None,
            tax_rate: sale.tax_rate,
            totals,
            summary_rows,
            notes: &sale.notes,
        },
        org,
        fmt,
    )
}

/// Rental contract. Line subtotals are multiplied by the billed days and the
/// due date is the end of the rental period.
pub fn print_rental(rental: &Rental, org: &Organization, fmt: &dyn Formatter) -> PrintModel {
    let totals = rental.totals();
    let days = rental.billed_days();
    let summary_rows = vec![
        row("Inicio", fmt.date(rental.start_date.date())),
        row("Fin", fmt.date(rental.end_date.date())),
        row(
            "Duración",
            format!("{days} día{}", if days == 1 { "" } else { "s" }),
        ),
        row("Depósito", fmt.currency(rental.deposit)),
        row("Pagado", fmt.currency(rental.paid_amount)),
        row("Pendiente", fmt.currency(totals.total - rental.paid_amount)),
    ];
    assemble(
        Skeleton {
            kind: DocumentKind::RentalContract,
            number: &rental.rental_number,
            issue_date: fmt.date(rental.created_at.unwrap_or_else(|| rental.start_date.date())),
            due_date: fmt.date(rental.end_date.date()),
            client: &rental.client,
            items: &rental.items,
            days: Some(days),
            tax_rate: rental.tax_rate,
            totals,
            summary_rows,
            notes: &rental.notes,
        },
        org,
        fmt,
    )
}

/// Quotation. Rental quotations with a planned period are priced per day.
pub fn print_quotation(quotation: &Quotation, org: &Organization, fmt: &dyn Formatter) -> PrintModel {
    let totals = quotation.totals();
    let days = (quotation.quotation_type == QuotationType::Rental).then(|| quotation.billed_days());
    let mut summary_rows = Vec::new();
    if quotation.quotation_type == QuotationType::Rental {
        let plan = quotation.planned_fields();
        if let (Some(start), Some(end)) = (plan.start_date, plan.end_date) {
            summary_rows.push(row("Inicio", fmt.date(start)));
            summary_rows.push(row("Fin", fmt.date(end)));
        }
        if let Some(deposit) = plan.deposit {
            summary_rows.push(row("Depósito", fmt.currency(deposit)));
        }
    }
    assemble(
        Skeleton {
            kind: DocumentKind::Quotation,
            number: &quotation.quotation_number,
            issue_date: date_or_empty(quotation.created_at, fmt),
            due_date: date_or_empty(quotation.valid_until, fmt),
            client: &quotation.client,
            items: &quotation.items,
            days,
            tax_rate: quotation.tax_rate,
            totals,
            summary_rows,
            notes: &quotation.notes,
        },
        org,
        fmt,
    )
}
