mod common;

use common::{active_rental, date, midnight, payment, rental_quotation, sale_quotation, FakeBackend};
use desk::backend::RentalDraft;
use desk::convert::{fanout, notes, quotation_key};
use desk::error::{DeskError, ErrorKind};
use desk::model::{Client, LineItem, PaymentMethod, QuotationStatus, RentalStatus, SaleStatus};
use desk::status::QuotationAction;
use desk::{Engine, InFlight, Priced, RentalConversion, SaleConversion};

fn cash_sale() -> SaleConversion {
    SaleConversion {
        payment_method: PaymentMethod::Cash,
        mark_paid: false,
        date: date(2024, 1, 2),
    }
}

fn planned_rental() -> RentalConversion {
    RentalConversion {
        start_date: None,
        end_date: None,
        deposit: None,
        payment_method: PaymentMethod::Cash,
        condition_out: "Buen estado".to_string(),
        today: date(2024, 3, 1),
    }
}

fn sale_backend() -> FakeBackend {
    FakeBackend::new().with_stock(10, 5).with_stock(11, 5)
}

#[test]
fn test_convert_to_sale() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();

    let sale = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap();

    assert_eq!(sale.items, quotation.items);
    assert!((sale.totals().total - 295.0).abs() < 1e-9);
    assert_eq!(sale.paid_amount, 0.0);
    assert_eq!(sale.status, SaleStatus::PendingPayment);
    assert_eq!(sale.quotation_id, Some(1));
    assert_eq!(quotation.status, QuotationStatus::Converted);
    assert_eq!(
        backend.calls,
        vec!["create_sale", "update_quotation_status 1 converted"]
    );
}

#[test]
fn test_convert_to_sale_marked_paid() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    let request = SaleConversion {
        mark_paid: true,
        ..cash_sale()
    };

    let sale = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &request)
        .unwrap();

    assert_eq!(sale.payments.len(), 1);
    assert!((sale.paid_amount - 295.0).abs() < 1e-9);
    assert_eq!(sale.status, SaleStatus::Completed);
}

#[test]
fn test_second_conversion_rejected() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    let mut engine = Engine::new(&mut backend);

    engine.convert_to_sale(&mut quotation, &cash_sale()).unwrap();
    let err = engine
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    drop(engine);
    assert_eq!(backend.count_calls("create_sale"), 1);
}

#[test]
fn test_non_accepted_quotation_makes_no_calls() {
    for status in [
        QuotationStatus::Pending,
        QuotationStatus::Rejected,
        QuotationStatus::Expired,
    ] {
        let mut backend = sale_backend();
        let mut quotation = sale_quotation();
        quotation.status = status;

        let err = Engine::new(&mut backend)
            .convert_to_sale(&mut quotation, &cash_sale())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(quotation.status, status);
        assert!(backend.calls.is_empty());
    }
}

#[test]
fn test_wrong_quotation_type() {
    let mut backend = sale_backend();
    let mut quotation = rental_quotation();

    let err = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap_err();

    assert!(matches!(err, DeskError::InvalidState(_)));
    assert_eq!(quotation.status, QuotationStatus::Accepted);
}

#[test]
fn test_failed_status_update_deletes_sale() {
    let mut backend = sale_backend();
    backend.fail_status_update = true;
    let mut quotation = sale_quotation();

    let err = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert_eq!(err.user_message(), "status update failed");
    assert_eq!(quotation.status, QuotationStatus::Accepted);
    assert!(backend.sales.is_empty());
    assert_eq!(backend.count_calls("delete_sale"), 1);
}

#[test]
fn test_empty_quotation_is_validation_error() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    quotation.items.clear();

    let err = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(backend.calls.is_empty());
}

#[test]
fn test_convert_to_rental_uses_plan() {
    let mut backend = FakeBackend::new().with_stock(20, 3);
    let mut quotation = rental_quotation();

    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap();

    assert_eq!(rentals.len(), 1);
    let rental = &rentals[0];
    assert_eq!(rental.billed_days(), 7);
    assert!((rental.totals().subtotal - 140.0).abs() < 1e-9);
    assert_eq!(rental.deposit, 140.0);
    assert_eq!(rental.start_date, midnight(2024, 1, 1));
    assert_eq!(rental.end_date, midnight(2024, 1, 8));
    assert_eq!(rental.condition_out, "Buen estado");
    assert_eq!(quotation.status, QuotationStatus::Converted);
}

#[test]
fn test_explicit_fields_override_plan() {
    let mut backend = FakeBackend::new().with_stock(20, 3);
    let mut quotation = rental_quotation();
    let request = RentalConversion {
        end_date: Some(date(2024, 1, 4)),
        deposit: Some(50.0),
        ..planned_rental()
    };

    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &request)
        .unwrap();

    assert_eq!(rentals[0].start_date, midnight(2024, 1, 1));
    assert_eq!(rentals[0].end_date, midnight(2024, 1, 4));
    assert_eq!(rentals[0].deposit, 50.0);
}

#[test]
fn test_notes_fallback() {
    let mut backend = FakeBackend::new().with_stock(20, 3);
    let mut quotation = rental_quotation();
    quotation.planned_start_date = None;
    quotation.planned_end_date = None;
    quotation.planned_deposit = None;
    quotation.notes = "Entrega en obra\n\n--- Información de Alquiler ---\nFecha Inicio: 2024-02-01\nFecha Fin: 2024-02-05\nDepósito: 80".to_string();

    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap();

    assert_eq!(rentals[0].start_date, midnight(2024, 2, 1));
    assert_eq!(rentals[0].end_date, midnight(2024, 2, 5));
    assert_eq!(rentals[0].deposit, 80.0);
}

#[test]
fn test_notes_deposit_with_thousands_separator() {
    let fields = notes::extract_rental_fields_from_notes(
        "--- Información de Alquiler ---\nDepósito: 1,500.00",
        date(2024, 3, 1),
    );
    assert_eq!(fields.deposit, 1500.0);

    let fields = notes::extract_rental_fields_from_notes("Depósito: RD$ 2,250.50", date(2024, 3, 1));
    assert_eq!(fields.deposit, 2250.5);

    let mut backend = FakeBackend::new().with_stock(20, 3);
    let mut quotation = rental_quotation();
    quotation.planned_deposit = None;
    quotation.notes = "--- Información de Alquiler ---\nFecha Inicio: 2024-01-01\nFecha Fin: 2024-01-08\nDepósito: 1,500.00".to_string();

    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap();

    assert_eq!(rentals[0].deposit, 1500.0);
}

#[test]
fn test_defaults_without_plan() {
    let mut backend = FakeBackend::new().with_stock(20, 3);
    let mut quotation = rental_quotation();
    quotation.planned_start_date = None;
    quotation.planned_end_date = None;
    quotation.planned_deposit = None;

    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap();

    assert_eq!(rentals[0].start_date, midnight(2024, 3, 1));
    assert_eq!(rentals[0].end_date, midnight(2024, 3, 8));
    assert_eq!(rentals[0].deposit, 0.0);
}

#[test]
fn test_end_before_start_rejected() {
    let mut backend = FakeBackend::new().with_stock(20, 3);
    let mut quotation = rental_quotation();
    let request = RentalConversion {
        end_date: Some(date(2023, 12, 25)),
        ..planned_rental()
    };

    let err = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &request)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(quotation.status, QuotationStatus::Accepted);
    assert!(backend.calls.is_empty());
}

#[test]
fn test_fan_out_conserves_deposit() {
    let mut backend = FakeBackend::single_unit().with_stock(20, 5).with_stock(21, 5);
    let mut quotation = rental_quotation();
    quotation.items = vec![
        LineItem::new(20, "Andamio", 2, 20.0),
        LineItem::new(21, "Mezcladora", 1, 35.0),
    ];
    quotation.planned_deposit = Some(100.0);

    let rentals = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap();

    assert_eq!(rentals.len(), 3);
    assert!(rentals.iter().all(|r| r.items.len() == 1 && r.items[0].quantity == 1));
    let deposits: f64 = rentals.iter().map(|r| r.deposit).sum();
    assert!((deposits - 100.0).abs() < 1e-6);
    assert_eq!(rentals[2].items[0].product_id, 21);
}

#[test]
fn test_split_evenly_sums_exactly() {
    for (amount, units) in [(100.0, 3), (0.1, 7), (140.0, 1), (999.99, 13)] {
        let parts = fanout::split_evenly(amount, units);
        assert_eq!(parts.len(), units as usize);
        let sum: f64 = parts.iter().sum();
        assert!((sum - amount).abs() < 1e-6, "{amount} / {units}");
    }
    assert!(fanout::split_evenly(10.0, 0).is_empty());
}

#[test]
fn test_failed_fan_out_deletes_created() {
    let mut backend = FakeBackend::single_unit().with_stock(20, 5);
    backend.fail_rental_create_at = Some(2);
    let mut quotation = rental_quotation();
    quotation.items = vec![LineItem::new(20, "Andamio", 3, 20.0)];

    let err = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert_eq!(quotation.status, QuotationStatus::Accepted);
    assert_eq!(backend.count_calls("delete_rental"), 2);
    assert!(backend.rentals.is_empty());
    assert_eq!(backend.count_calls("update_quotation_status"), 0);
}

#[test]
fn test_stock_conflict_creates_nothing() {
    let mut backend = FakeBackend::new().with_stock(20, 1);
    let mut quotation = rental_quotation();
    quotation.items = vec![
        LineItem::new(20, "Andamio", 1, 20.0),
        LineItem::new(20, "Andamio", 1, 20.0),
    ];

    let err = Engine::new(&mut backend)
        .convert_to_rental(&mut quotation, &planned_rental())
        .unwrap_err();

    match err {
        DeskError::StockConflict {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.count_calls("create_rental"), 0);
    assert_eq!(quotation.status, QuotationStatus::Accepted);
}

#[test]
fn test_zero_stock_is_conflict() {
    let mut backend = FakeBackend::new();
    let draft = RentalDraft {
        client: Client::named("Constructora Sur"),
        items: vec![LineItem::new(30, "Compresor", 1, 15.0)],
        start_date: midnight(2024, 1, 1),
        end_date: midnight(2024, 1, 3),
        deposit: 0.0,
        payment_method: PaymentMethod::Cash,
        condition_out: String::new(),
        notes: String::new(),
        tax_rate: 0.0,
        discount_amount: 0.0,
        discount_percent: 0.0,
        quotation_id: None,
        date: date(2024, 1, 1),
    };

    let err = Engine::new(&mut backend).create_rentals(draft).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StockConflict);
    assert!(backend.calls.is_empty());
}

#[test]
fn test_in_flight_guard() {
    let in_flight = InFlight::new();
    let ticket = in_flight.begin(quotation_key(1)).unwrap();

    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    let err = Engine::with_in_flight(&mut backend, in_flight.clone())
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(backend.calls.is_empty());

    drop(ticket);
    assert!(!in_flight.is_busy(&quotation_key(1)));
    Engine::with_in_flight(&mut backend, in_flight.clone())
        .convert_to_sale(&mut quotation, &cash_sale())
        .unwrap();
    assert!(!in_flight.is_busy(&quotation_key(1)));
}

#[test]
fn test_transition_rejected_locally() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();

    let err = Engine::new(&mut backend)
        .transition_quotation(&mut quotation, QuotationAction::Reject)
        .unwrap_err();

    assert!(matches!(err, DeskError::InvalidTransition { .. }));
    assert_eq!(quotation.status, QuotationStatus::Accepted);
    assert!(backend.calls.is_empty());
}

#[test]
fn test_transition_applies_after_backend() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    quotation.status = QuotationStatus::Pending;

    let status = Engine::new(&mut backend)
        .transition_quotation(&mut quotation, QuotationAction::Accept)
        .unwrap();

    assert_eq!(status, QuotationStatus::Accepted);
    assert_eq!(quotation.status, QuotationStatus::Accepted);
    assert_eq!(backend.calls, vec!["update_quotation_status 1 accepted"]);
}

#[test]
fn test_can_edit_needs_both_sides() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    quotation.status = QuotationStatus::Pending;

    assert!(Engine::new(&mut backend).can_edit(&quotation).unwrap());
    backend.remote_can_edit = false;
    assert!(!Engine::new(&mut backend).can_edit(&quotation).unwrap());

    backend.remote_can_edit = true;
    quotation.status = QuotationStatus::Accepted;
    assert!(!Engine::new(&mut backend).can_edit(&quotation).unwrap());
}

#[test]
fn test_cancel_restocks_each_item_once() {
    let mut backend = FakeBackend::new();
    let mut rental = active_rental(vec![
        LineItem::new(20, "Andamio", 2, 20.0),
        LineItem::new(21, "Mezcladora", 1, 35.0),
    ]);

    Engine::new(&mut backend).cancel_rental(&mut rental).unwrap();

    assert_eq!(rental.status, RentalStatus::Cancelled);
    assert_eq!(backend.restocks, vec![(20, 2), (21, 1)]);
    assert_eq!(backend.calls[0], "cancel_rental 50");
}

#[test]
fn test_cancel_twice_rejected() {
    let mut backend = FakeBackend::new();
    let mut rental = active_rental(vec![LineItem::new(20, "Andamio", 1, 20.0)]);
    let mut engine = Engine::new(&mut backend);

    engine.cancel_rental(&mut rental).unwrap();
    let err = engine.cancel_rental(&mut rental).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    drop(engine);
    assert_eq!(backend.restocks.len(), 1);
}

#[test]
fn test_return_overdue_rental() {
    let mut backend = FakeBackend::new();
    let mut rental = active_rental(vec![LineItem::new(20, "Andamio", 1, 20.0)]);
    rental.status = RentalStatus::Overdue;

    Engine::new(&mut backend)
        .return_rental(&mut rental, Some("Rayado".to_string()))
        .unwrap();

    assert_eq!(rental.status, RentalStatus::Returned);
    assert_eq!(rental.condition_in.as_deref(), Some("Rayado"));
    assert_eq!(backend.restocks, vec![(20, 1)]);
}

#[test]
fn test_sweep_overdue_writes_status() {
    let mut backend = FakeBackend::new();
    let mut rentals = vec![active_rental(vec![LineItem::new(20, "Andamio", 1, 20.0)])];

    let changed = Engine::new(&mut backend)
        .sweep_overdue(&mut rentals, midnight(2024, 1, 20))
        .unwrap();

    assert_eq!(changed, vec![50]);
    assert_eq!(rentals[0].status, RentalStatus::Overdue);
    assert_eq!(backend.calls, vec!["update_rental_status 50 overdue"]);
}

#[test]
fn test_sale_payments() {
    let mut backend = sale_backend();
    let mut quotation = sale_quotation();
    let mut engine = Engine::new(&mut backend);
    let mut sale = engine.convert_to_sale(&mut quotation, &cash_sale()).unwrap();

    engine.record_sale_payment(&mut sale, payment(100.0)).unwrap();
    assert_eq!(sale.status, SaleStatus::Partial);

    let err = engine
        .record_sale_payment(&mut sale, payment(200.0))
        .unwrap_err();
    assert!(matches!(err, DeskError::OverPayment { .. }));

    let err = engine.record_sale_payment(&mut sale, payment(0.0)).unwrap_err();
    assert!(matches!(err, DeskError::InvalidPaymentAmount));

    engine.record_sale_payment(&mut sale, payment(195.0)).unwrap();
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(sale.payments.len(), 2);
    assert!((sale.paid_amount - 295.0).abs() < 1e-9);
}

#[test]
fn test_unrecorded_initial_payment_is_reported() {
    let mut backend = sale_backend();
    backend.fail_initial_payment = true;
    let mut quotation = sale_quotation();
    let request = SaleConversion {
        mark_paid: true,
        ..cash_sale()
    };

    let err = Engine::new(&mut backend)
        .convert_to_sale(&mut quotation, &request)
        .unwrap_err();

    assert!(matches!(err, DeskError::PaymentNotRecorded { ref sale, .. } if sale == "VEN-101"));
    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert!(err.to_string().contains("payment rejected"));
    assert_eq!(quotation.status, QuotationStatus::Converted);
    assert_eq!(backend.sales.len(), 1);
    assert_eq!(backend.sales[0].paid_amount, 0.0);
    assert_eq!(backend.sales[0].status, SaleStatus::PendingPayment);
    assert_eq!(backend.count_calls("record_sale_payment"), 1);
    assert_eq!(backend.count_calls("delete_sale"), 0);
}

#[test]
fn test_cancel_sale_from_any_open_status() {
    for (paid, before) in [
        (0.0, SaleStatus::PendingPayment),
        (100.0, SaleStatus::Partial),
        (295.0, SaleStatus::Completed),
    ] {
        let mut backend = sale_backend();
        let mut quotation = sale_quotation();
        let mut engine = Engine::new(&mut backend);
        let mut sale = engine.convert_to_sale(&mut quotation, &cash_sale()).unwrap();
        if paid > 0.0 {
            engine.record_sale_payment(&mut sale, payment(paid)).unwrap();
        }
        assert_eq!(sale.status, before);

        engine.cancel_sale(&mut sale).unwrap();
        assert_eq!(sale.status, SaleStatus::Cancelled);

        let err = engine.cancel_sale(&mut sale).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err = engine.record_sale_payment(&mut sale, payment(1.0)).unwrap_err();
        assert!(matches!(err, DeskError::InvalidState(_)));

        sale.refresh_status();
        assert_eq!(sale.status, SaleStatus::Cancelled);

        drop(engine);
        assert_eq!(backend.count_calls("cancel_sale"), 1, "from {before}");
        assert_eq!(backend.sales[0].status, SaleStatus::Cancelled);
    }
}

#[test]
fn test_rental_payment_overpayment() {
    let mut backend = FakeBackend::new();
    let mut rental = active_rental(vec![LineItem::new(20, "Andamio", 1, 20.0)]);
    let mut engine = Engine::new(&mut backend);

    engine.record_rental_payment(&mut rental, payment(100.0)).unwrap();
    let err = engine
        .record_rental_payment(&mut rental, payment(50.0))
        .unwrap_err();

    assert!(matches!(err, DeskError::OverPayment { .. }));
    assert_eq!(rental.paid_amount, 100.0);
}

#[test]
fn test_notes_round_trip_keeps_base_text() {
    let fields = notes::RentalFields {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 8),
        deposit: 140.0,
    };
    let encoded = notes::encode_rental_fields_into_notes("Entrega en obra", &fields);
    let reencoded = notes::encode_rental_fields_into_notes(&encoded, &fields);

    assert!(encoded.starts_with("Entrega en obra\n\n"));
    assert_eq!(encoded, reencoded);
    assert_eq!(
        notes::extract_rental_fields_from_notes(&encoded, date(2030, 1, 1)),
        fields
    );
}
