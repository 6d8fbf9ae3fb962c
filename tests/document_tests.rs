mod common;

use common::{active_rental, date, rental_quotation, sale_quotation, FakeBackend};
use desk::document::{self, html, DocumentKind, LocaleFormatter};
use desk::model::{LineItem, Organization, PaymentMethod};
use desk::{Engine, Priced, RentalConversion, SaleConversion};

fn organization() -> Organization {
    Organization {
        name: Some("Alquileres del Este".to_string()),
        tax_id: Some("131-00000-1".to_string()),
        address: Some("Av. Principal 12".to_string()),
        city: Some("La Romana".to_string()),
        phone: Some("809-555-0100".to_string()),
        ..Organization::default()
    }
}

#[test]
fn test_sale_document_matches_detail_totals() {
    let mut backend = FakeBackend::new().with_stock(10, 5).with_stock(11, 5);
    let mut quotation = sale_quotation();
    let request = SaleConversion {
        payment_method: PaymentMethod::Cash,
        mark_paid: false,
        date: date(2024, 1, 2),
    };
    let sale = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &request)
        .unwrap();
    let fmt = LocaleFormatter::default();

    let model = document::print_sale(&sale, &organization(), &fmt, 30);

    assert_eq!(model.document_type, DocumentKind::Invoice);
    assert_eq!(model.title, "FACTURA");
    assert_eq!(model.totals.total, sale.totals().total);
    assert_eq!(model.totals_text.total, "RD$295.00");
    assert_eq!(model.totals_text.tax_amount, "RD$45.00");
    assert_eq!(model.issue_date, "02/01/2024");
    assert_eq!(model.due_date, "01/02/2024");
    assert_eq!(model.days, None);
    assert_eq!(model.line_rows.len(), 2);
    assert_eq!(model.line_rows[0].line_subtotal, "RD$200.00");
    assert_eq!(model.line_rows[1].tax_label, "G");
    assert_eq!(model.organization.address, "Av. Principal 12, La Romana");
    assert_eq!(model.summary_rows[2].value, "RD$295.00");
}

#[test]
fn test_rental_document_multiplies_days() {
    let mut rental = active_rental(vec![
        LineItem::new(20, "Andamio", 2, 20.0),
        LineItem::new(21, "Mezcladora", 1, 35.0),
    ]);
    rental.deposit = 150.0;
    let fmt = LocaleFormatter::default();

    let model = document::print_rental(&rental, &organization(), &fmt);

    assert_eq!(model.document_type, DocumentKind::RentalContract);
    assert_eq!(model.days, Some(7));
    assert_eq!(model.line_rows[0].line_subtotal, "RD$280.00");
    assert_eq!(model.line_rows[1].line_subtotal, "RD$245.00");
    assert_eq!(model.totals_text.subtotal, "RD$525.00");
    assert_eq!(model.totals.total, rental.totals().total);
    assert_eq!(model.due_date, "08/01/2024");
    assert!(model
        .summary_rows
        .iter()
        .any(|r| r.label == "Duración" && r.value == "7 días"));
    assert!(model
        .summary_rows
        .iter()
        .any(|r| r.label == "Depósito" && r.value == "RD$150.00"));
}

#[test]
fn test_rental_quotation_priced_per_day() {
    let quotation = rental_quotation();
    let fmt = LocaleFormatter::default();

    let model = document::print_quotation(&quotation, &organization(), &fmt);

    assert_eq!(model.title, "COTIZACIÓN");
    assert_eq!(model.days, Some(7));
    assert_eq!(model.totals_text.subtotal, "RD$140.00");
    assert_eq!(model.due_date, "31/01/2024");
}

#[test]
fn test_unplanned_rental_quotation_matches_conversion() {
    let mut quotation = rental_quotation();
    quotation.planned_start_date = None;
    quotation.planned_end_date = None;
    quotation.planned_deposit = None;

    let model = document::print_quotation(&quotation, &organization(), &LocaleFormatter::default());
    assert_eq!(model.days, Some(7));
    assert_eq!(model.totals_text.subtotal, "RD$140.00");

    let mut backend = FakeBackend::new().with_stock(20, 3);
    let request = RentalConversion {
        start_date: None,
        end_date: None,
        deposit: None,
        payment_method: PaymentMethod::Cash,
        condition_out: String::new(),
        today: date(2024, 3, 1),
    };
    let quoted = quotation.totals();
    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &request)
        .unwrap();
    assert_eq!(rentals[0].totals().subtotal, quoted.subtotal);

    let mut start_only = rental_quotation();
    start_only.planned_end_date = None;
    assert_eq!(start_only.billed_days(), 7);
}

#[test]
fn test_sale_quotation_has_no_days() {
    let quotation = sale_quotation();
    let model = document::print_quotation(&quotation, &organization(), &LocaleFormatter::default());

    assert_eq!(model.days, None);
    assert_eq!(model.totals.total, quotation.totals().total);
    assert!(model.summary_rows.is_empty());
}

#[test]
fn test_missing_organization_fields_are_empty() {
    let quotation = sale_quotation();
    let model = document::print_quotation(
        &quotation,
        &Organization::default(),
        &LocaleFormatter::default(),
    );

    assert_eq!(model.organization.name, "");
    assert_eq!(model.organization.tax_id, "");
    assert_eq!(model.organization.address, "");
    assert_eq!(model.organization.contact, "");
    assert_eq!(model.signature_block.stamp_ref, "");
}

#[test]
fn test_html_render() {
    let mut quotation = sale_quotation();
    quotation.client.name = "Pérez & Hijos <SRL>".to_string();
    let model = document::print_quotation(&quotation, &organization(), &LocaleFormatter::default());

    let page = html::render(&model);

    assert!(page.contains("COTIZACIÓN"));
    assert!(page.contains("COT-2024-0001"));
    assert!(page.contains("Pérez &amp; Hijos &lt;SRL&gt;"));
    assert!(page.contains("RD$295.00"));
    assert!(page.contains("ITBIS"));
}
