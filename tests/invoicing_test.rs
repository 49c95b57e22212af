//! Stage-wise invoicing against work order payment terms.

mod common;

use assert_matches::assert_matches;
use common::*;
use precast_api::{
    auth::Session,
    entities::{element_invoice_history, invoice, invoice_item, work_order},
    errors::ServiceError,
    models::{PaymentStatus, StageKey, StatusPatch, StatusValue},
    services::invoices::{CreateInvoiceInput, InvoiceEntry},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;
use std::collections::BTreeMap;

/// One WALL element (volume 2) that finished casting and dispatch.
async fn dispatched_element(app: &TestApp, admin: &Session) -> i32 {
    let created = app
        .state
        .services
        .element_types
        .create(admin, wall(&[CASTING, DISPATCH], vec![hierarchy(FLOOR_A, 2)]))
        .await
        .unwrap();
    let id = created.element_ids[0];
    let pipeline = &app.state.services.pipeline;
    pipeline.start_production(admin, id).await.unwrap();
    for _ in 0..2 {
        pipeline
            .update_activity(admin, id, StatusPatch::all(StatusValue::Completed))
            .await
            .unwrap();
    }
    id
}

fn bill(entries: &[(i32, StageKey)]) -> CreateInvoiceInput {
    CreateInvoiceInput {
        work_order_id: WORK_ORDER,
        billing_address: Some("Site office, Plot 4".to_string()),
        shipping_address: None,
        in_draft: false,
        entries: entries
            .iter()
            .map(|&(element_id, stage)| InvoiceEntry { element_id, stage })
            .collect(),
    }
}

// ==================== Creation and breakdown ====================

#[tokio::test]
async fn breakdown_applies_the_payment_term_per_stage() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let el = dispatched_element(&app, &admin).await;
    let invoices = &app.state.services.invoices;

    let created = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted), (el, StageKey::Dispatch)]))
        .await
        .unwrap();
    assert_eq!(created.revision_no, 1);
    assert_eq!(created.payment_status, PaymentStatus::Unpaid);
    assert_eq!(created.total_amount, dec!(141.60));
    assert_eq!(created.total_paid, Decimal::ZERO);

    let breakdown = invoices.breakdown(&admin, created.id).await.unwrap();
    assert_eq!(breakdown.wo_number, "WO-001");
    assert_eq!(breakdown.stages.len(), 2);

    let casted = &breakdown.stages[0];
    assert_eq!(casted.stage, StageKey::Casted);
    assert_eq!(casted.percent, dec!(40));
    assert_eq!(casted.total_amount, dec!(236.00));
    assert_eq!(casted.amount_paid_by_payment_term, dec!(94.40));
    assert_eq!(casted.items.len(), 1);
    assert_eq!(casted.items[0].element_count, 1);
    assert_eq!(casted.items[0].location.floor_name.as_deref(), Some("F1"));

    let dispatch = &breakdown.stages[1];
    assert_eq!(dispatch.stage, StageKey::Dispatch);
    assert_eq!(dispatch.total_amount, dec!(236.00));
    assert_eq!(dispatch.amount_paid_by_payment_term, dec!(47.20));
    assert_eq!(breakdown.total_amount, dec!(141.60));

    let history = element_invoice_history::Entity::find()
        .filter(element_invoice_history::Column::InvoiceId.eq(created.id))
        .count(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(history, 2);
    let items = invoice_item::Entity::find()
        .filter(invoice_item::Column::InvoiceId.eq(created.id))
        .count(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(items, 2);
}

#[tokio::test]
async fn an_element_is_billed_once_per_stage() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let el = dispatched_element(&app, &admin).await;
    let invoices = &app.state.services.invoices;

    let first = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted)]))
        .await
        .unwrap();
    let again = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted)]))
        .await;
    assert_matches!(again, Err(ServiceError::Conflict(_)));

    let second = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Dispatch)]))
        .await
        .unwrap();
    assert_eq!(first.revision_no, 1);
    assert_eq!(second.revision_no, 2);
}

#[tokio::test]
async fn unreached_stage_and_bad_entries_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let el = dispatched_element(&app, &admin).await;
    let invoices = &app.state.services.invoices;

    let unreached = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Erection)]))
        .await;
    assert_matches!(unreached, Err(ServiceError::InvalidInput(msg)) if msg.contains("erection"));

    let doubled = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted), (el, StageKey::Casted)]))
        .await;
    assert_matches!(doubled, Err(ServiceError::InvalidInput(_)));

    let empty = invoices.create_invoice(&admin, bill(&[])).await;
    assert_matches!(empty, Err(ServiceError::InvalidInput(_)));

    let (rows, total) = invoices.list_invoices(&admin, None, 1, 10).await.unwrap();
    assert_eq!(total, 0);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn invoices_are_for_admins_only() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let el = dispatched_element(&app, &admin).await;
    let planner = app.planner().await;
    let invoices = &app.state.services.invoices;

    let denied = invoices
        .create_invoice(&planner, bill(&[(el, StageKey::Casted)]))
        .await;
    assert_matches!(denied, Err(ServiceError::Forbidden(_)));
    assert_matches!(
        invoices.list_invoices(&planner, None, 1, 10).await,
        Err(ServiceError::Forbidden(_))
    );

    invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted)]))
        .await
        .unwrap();
    let superadmin = app.session(SUPERADMIN_TOKEN).await;
    let (_, total) = invoices
        .list_invoices(&superadmin, Some(WORK_ORDER), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn malformed_payment_term_bills_nothing_and_settles() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let el = dispatched_element(&app, &admin).await;
    work_order::ActiveModel {
        id: Set(WORK_ORDER),
        payment_term: Set(Some(json!("not json"))),
        ..Default::default()
    }
    .update(app.db.as_ref())
    .await
    .unwrap();
    let invoices = &app.state.services.invoices;

    let created = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted)]))
        .await
        .unwrap();
    assert_eq!(created.total_amount, Decimal::ZERO);
    assert_eq!(created.payment_status, PaymentStatus::FullyPaid);

    let stored = invoice::Entity::find_by_id(created.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.payment_status, "fully_paid");

    let breakdown = invoices.breakdown(&admin, created.id).await.unwrap();
    assert_eq!(breakdown.payment_status, PaymentStatus::FullyPaid);
    assert_eq!(breakdown.stages[0].amount_paid_by_payment_term, Decimal::ZERO);
}

// ==================== Payments ====================

#[tokio::test]
async fn payments_move_the_status_forward() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let el = dispatched_element(&app, &admin).await;
    let invoices = &app.state.services.invoices;
    let inv = invoices
        .create_invoice(&admin, bill(&[(el, StageKey::Casted), (el, StageKey::Dispatch)]))
        .await
        .unwrap();

    let partial = invoices
        .record_payment(&admin, inv.id, dec!(100), Some("NEFT-1".to_string()))
        .await
        .unwrap();
    assert_eq!(partial.payment_status, PaymentStatus::PartialPaid);
    assert_eq!(partial.total_paid, dec!(100));

    let settled = invoices
        .record_payment(&admin, inv.id, dec!(41.60), None)
        .await
        .unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::FullyPaid);

    let zero = invoices.record_payment(&admin, inv.id, Decimal::ZERO, None).await;
    assert_matches!(zero, Err(ServiceError::InvalidInput(_)));
    let missing = invoices.record_payment(&admin, 9999, dec!(1), None).await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

// ==================== Payment terms ====================

#[tokio::test]
async fn payment_term_must_sum_to_one_hundred() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let invoices = &app.state.services.invoices;

    let mut term = BTreeMap::new();
    term.insert("casted".to_string(), dec!(50));
    term.insert("dispatched".to_string(), dec!(30));
    let short = invoices.set_payment_term(&admin, WORK_ORDER, term.clone()).await;
    assert_matches!(short, Err(ServiceError::InvalidInput(_)));

    term.insert("Handover".to_string(), dec!(20));
    let view = invoices
        .set_payment_term(&admin, WORK_ORDER, term)
        .await
        .unwrap();
    assert_eq!(view.payment_term.get(&StageKey::Dispatch), Some(&dec!(30)));
    assert_eq!(view.payment_term.get(&StageKey::Handover), Some(&dec!(20)));
    assert_eq!(view.payment_term.len(), 3);

    let planner = app.planner().await;
    let mut full = BTreeMap::new();
    full.insert("casted".to_string(), dec!(100));
    assert_matches!(
        invoices.set_payment_term(&planner, WORK_ORDER, full).await,
        Err(ServiceError::Forbidden(_))
    );
}
