//! Invoice aggregator: payment terms, invoice creation, payments and the
//! stage-wise breakdown.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{ConditionalStatement, Query}, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::hierarchy::{resolve_locations, Location};
use super::pipeline::project_stages;
use crate::auth::{check_project_access, ScopePredicate, Session};
use crate::db::{for_update, require, Deadlines, DbPool};
use crate::entities::{
    complete_production, element, element_invoice_history, element_type, invoice, invoice_item,
    invoice_payment, precast_stock, work_order, work_order_material,
};
use crate::errors::ServiceError;
use crate::events::{ActivityEvent, EventSender};
use crate::models::invoice_math::{line_amount, money, paid_by_term};
use crate::models::{PaymentStatus, PaymentTerm, StageKey};

/// One element and stage to bill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceEntry {
    pub element_id: i32,
    pub stage: StageKey,
}

#[derive(Clone, Debug, Default)]
pub struct CreateInvoiceInput {
    pub work_order_id: i32,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub in_draft: bool,
    pub entries: Vec<InvoiceEntry>,
}

/// Rated input of the breakdown: one billed element at one stage.
#[derive(Clone, Debug, PartialEq)]
pub struct BreakdownLine {
    pub stage: StageKey,
    pub element_type: String,
    pub hierarchy_id: i32,
    pub location: Location,
    pub volume: Decimal,
    pub unit_rate: Decimal,
    pub tax: Decimal,
}

/// Element type and location sub-row of a stage.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct StageItem {
    pub element_type: String,
    pub hierarchy_id: i32,
    #[serde(flatten)]
    pub location: Location,
    pub element_count: u32,
    pub volume: Decimal,
    pub unit_rate: Decimal,
    pub tax: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct StageSummary {
    pub stage: StageKey,
    pub percent: Decimal,
    pub total_amount: Decimal,
    pub amount_paid_by_payment_term: Decimal,
    pub items: Vec<StageItem>,
}

/// Groups rated lines by stage and by element type and location within a
/// stage. Stages come out in canonical order; absent ones are skipped.
pub fn summarize(lines: &[BreakdownLine], term: &PaymentTerm) -> Vec<StageSummary> {
    let mut grouped: BTreeMap<StageKey, BTreeMap<(String, i32), StageItem>> = BTreeMap::new();
    let mut raw_totals: BTreeMap<StageKey, Decimal> = BTreeMap::new();

    for line in lines {
        let amount = line_amount(line.unit_rate, line.volume, line.tax);
        *raw_totals.entry(line.stage).or_default() += amount;

        let item = grouped
            .entry(line.stage)
            .or_default()
            .entry((line.element_type.clone(), line.hierarchy_id))
            .or_insert_with(|| StageItem {
                element_type: line.element_type.clone(),
                hierarchy_id: line.hierarchy_id,
                location: line.location.clone(),
                element_count: 0,
                volume: Decimal::ZERO,
                unit_rate: line.unit_rate,
                tax: line.tax,
                amount: Decimal::ZERO,
            });
        item.element_count += 1;
        item.volume += line.volume;
        item.amount += amount;
    }

    StageKey::canonical_order()
        .filter_map(|stage| {
            let items = grouped.remove(&stage)?;
            let total = raw_totals.get(&stage).copied().unwrap_or_default();
            let percent = term.percent(stage);
            Some(StageSummary {
                stage,
                percent,
                total_amount: money(total),
                amount_paid_by_payment_term: money(paid_by_term(total, percent)),
                items: items
                    .into_values()
                    .map(|mut item| {
                        item.amount = money(item.amount);
                        item
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Amount due for an invoice: the sum of the per-stage payment term shares.
pub fn invoice_total(stages: &[StageSummary]) -> Decimal {
    money(stages.iter().map(|s| s.amount_paid_by_payment_term).sum())
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct InvoiceView {
    pub id: i32,
    pub work_order_id: i32,
    pub revision_no: i32,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub in_draft: bool,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<invoice::Model> for InvoiceView {
    fn from(m: invoice::Model) -> Self {
        let payment_status = PaymentStatus::from_str(&m.payment_status).unwrap_or_else(|_| {
            warn!(invoice_id = m.id, status = %m.payment_status, "unknown payment status");
            PaymentStatus::derive(m.total_paid, m.total_amount)
        });
        Self {
            id: m.id,
            work_order_id: m.work_order_id,
            revision_no: m.revision_no,
            billing_address: m.billing_address,
            shipping_address: m.shipping_address,
            total_amount: m.total_amount,
            total_paid: m.total_paid,
            payment_status,
            in_draft: m.in_draft,
            created_by: m.created_by,
            created_at: m.created_at,
            warnings: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct InvoiceBreakdown {
    pub invoice_id: i32,
    pub work_order_id: i32,
    pub wo_number: String,
    pub revision_no: i32,
    pub stages: Vec<StageSummary>,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub payment_status: PaymentStatus,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PaymentTermView {
    pub work_order_id: i32,
    pub payment_term: BTreeMap<StageKey, Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DbPool>,
    deadlines: Deadlines,
    events: EventSender,
}

impl InvoiceService {
    pub fn new(db: Arc<DbPool>, deadlines: Deadlines, events: EventSender) -> Self {
        Self {
            db,
            deadlines,
            events,
        }
    }

    /// Stores a validated stage to percent map on a work order.
    #[instrument(skip(self, session, input), fields(user_id = session.user_id))]
    pub async fn set_payment_term(
        &self,
        session: &Session,
        work_order_id: i32,
        input: BTreeMap<String, Decimal>,
    ) -> Result<PaymentTermView, ServiceError> {
        let term =
            PaymentTerm::from_input(&input).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        let scope = privileged(session)?;
        let db = self.db.as_ref();
        let json = term.to_json();

        let wo = self
            .deadlines
            .run("set_payment_term", async move {
                let wo = require(
                    work_order::Entity::find_by_id(work_order_id).one(db).await?,
                    "work order",
                    work_order_id,
                )?;
                check_project_access(db, &scope, wo.project_id).await?;
                let mut active: work_order::ActiveModel = wo.into();
                active.payment_term = Set(Some(json));
                active.updated_at = Set(Utc::now());
                Ok(active.update(db).await?)
            })
            .await?;

        info!(work_order_id, "payment term updated");
        let warnings = self
            .events
            .send_or_warn(ActivityEvent::new(
                session,
                "work_order",
                "payment_term",
                format!("updated payment term of {}", wo.wo_number),
                Some(wo.project_id),
            ))
            .into_iter()
            .collect();

        Ok(PaymentTermView {
            work_order_id,
            payment_term: term.entries().collect(),
            warnings,
        })
    }

    /// Bills elements that reached the given stages under the next revision
    /// number of the work order.
    #[instrument(skip(self, session, input), fields(user_id = session.user_id, work_order_id = input.work_order_id))]
    pub async fn create_invoice(
        &self,
        session: &Session,
        input: CreateInvoiceInput,
    ) -> Result<InvoiceView, ServiceError> {
        if input.entries.is_empty() {
            return Err(ServiceError::InvalidInput("entries must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for entry in &input.entries {
            if !seen.insert((entry.element_id, entry.stage)) {
                return Err(ServiceError::InvalidInput(format!(
                    "element {} is listed twice for stage {}",
                    entry.element_id, entry.stage
                )));
            }
        }

        let scope = privileged(session)?;
        let db = self.db.as_ref();
        let actor = session.user_id;

        let (created, project_id) = self
            .deadlines
            .write("create_invoice", async move {
                let txn = db.begin().await?;
                let wo = require(
                    for_update(work_order::Entity::find_by_id(input.work_order_id), &txn)
                        .one(&txn)
                        .await?,
                    "work order",
                    input.work_order_id,
                )?;
                check_project_access(&txn, &scope, wo.project_id).await?;
                let term = PaymentTerm::parse_lenient(wo.payment_term.as_ref());

                let mut billed = Vec::with_capacity(input.entries.len());
                for entry in &input.entries {
                    let el = require(
                        element::Entity::find_by_id(entry.element_id).one(&txn).await?,
                        "element",
                        entry.element_id,
                    )?;
                    if el.project_id != wo.project_id {
                        return Err(ServiceError::InvalidInput(format!(
                            "element {} is not part of work order {}",
                            el.id, wo.id
                        )));
                    }
                    ensure_stage_reached(&txn, &el, entry.stage).await?;

                    let already = element_invoice_history::Entity::find()
                        .filter(element_invoice_history::Column::ElementId.eq(el.id))
                        .filter(element_invoice_history::Column::Stage.eq(entry.stage.as_str()))
                        .count(&txn)
                        .await?;
                    if already > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "element {} is already invoiced for {}",
                            el.id, entry.stage
                        )));
                    }

                    let et = require(
                        element_type::Entity::find_by_id(el.element_type_id)
                            .one(&txn)
                            .await?,
                        "element type",
                        el.element_type_id,
                    )?;
                    billed.push((el, et, entry.stage));
                }

                let materials = materials_by_code(&txn, wo.id).await?;
                let targets: Vec<i32> =
                    billed.iter().map(|(el, _, _)| el.target_location).collect();
                let locations = resolve_locations(&txn, &targets).await?;

                let mut lines = Vec::with_capacity(billed.len());
                for (el, et, stage) in &billed {
                    let material = materials.get(&et.element_type.to_lowercase()).ok_or_else(|| {
                        ServiceError::InvalidInput(format!(
                            "work order {} has no material for element type {}",
                            wo.wo_number, et.element_type
                        ))
                    })?;
                    lines.push(BreakdownLine {
                        stage: *stage,
                        element_type: et.element_type.clone(),
                        hierarchy_id: el.target_location,
                        location: locations.get(&el.target_location).cloned().unwrap_or_default(),
                        volume: et.volume,
                        unit_rate: material.unit_rate,
                        tax: material.tax,
                    });
                }
                let stages = summarize(&lines, &term);
                let total = invoice_total(&stages);

                let last_revision = invoice::Entity::find()
                    .filter(invoice::Column::WorkOrderId.eq(wo.id))
                    .order_by_desc(invoice::Column::RevisionNo)
                    .one(&txn)
                    .await?
                    .map_or(0, |i| i.revision_no);

                let now = Utc::now();
                let inv = invoice::ActiveModel {
                    work_order_id: Set(wo.id),
                    revision_no: Set(last_revision + 1),
                    billing_address: Set(input.billing_address.clone()),
                    shipping_address: Set(input.shipping_address.clone()),
                    total_amount: Set(total),
                    total_paid: Set(Decimal::ZERO),
                    payment_status: Set(PaymentStatus::derive(Decimal::ZERO, total).to_string()),
                    in_draft: Set(input.in_draft),
                    created_by: Set(actor),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;

                for (el, et, stage) in &billed {
                    element_invoice_history::ActiveModel {
                        invoice_id: Set(inv.id),
                        element_id: Set(el.id),
                        stage: Set(stage.as_str().to_string()),
                        volume: Set(et.volume),
                        created_at: Set(now),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                }

                for summary in &stages {
                    for item in &summary.items {
                        invoice_item::ActiveModel {
                            invoice_id: Set(inv.id),
                            item_name: Set(item.element_type.clone()),
                            stage: Set(summary.stage.as_str().to_string()),
                            volume: Set(item.volume),
                            unit_rate: Set(item.unit_rate),
                            tax: Set(item.tax),
                            amount: Set(item.amount),
                            ..Default::default()
                        }
                        .insert(&txn)
                        .await?;
                    }
                }

                txn.commit().await?;
                Ok((inv, wo.project_id))
            })
            .await?;

        info!(invoice_id = created.id, revision_no = created.revision_no, total = %created.total_amount, "invoice created");
        metrics::counter!("precast.invoice.created", 1);

        let mut view = InvoiceView::from(created);
        view.warnings.extend(self.events.send_or_warn(ActivityEvent::new(
            session,
            "invoice",
            "create",
            format!("created invoice revision {} for work order {}", view.revision_no, view.work_order_id),
            Some(project_id),
        )));
        Ok(view)
    }

    /// Appends a payment and recomputes the paid total and status.
    #[instrument(skip(self, session, reference), fields(user_id = session.user_id))]
    pub async fn record_payment(
        &self,
        session: &Session,
        invoice_id: i32,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<InvoiceView, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput("amount must be positive".into()));
        }
        let scope = privileged(session)?;
        let db = self.db.as_ref();
        let actor = session.user_id;

        let (updated, project_id) = self
            .deadlines
            .write("record_payment", async move {
                let txn = db.begin().await?;
                let inv = require(
                    for_update(invoice::Entity::find_by_id(invoice_id), &txn)
                        .one(&txn)
                        .await?,
                    "invoice",
                    invoice_id,
                )?;
                let wo = require(
                    work_order::Entity::find_by_id(inv.work_order_id).one(&txn).await?,
                    "work order",
                    inv.work_order_id,
                )?;
                check_project_access(&txn, &scope, wo.project_id).await?;

                let now = Utc::now();
                invoice_payment::ActiveModel {
                    invoice_id: Set(inv.id),
                    amount_paid: Set(money(amount)),
                    reference: Set(reference),
                    recorded_by: Set(actor),
                    paid_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;

                let paid: Decimal = invoice_payment::Entity::find()
                    .filter(invoice_payment::Column::InvoiceId.eq(inv.id))
                    .all(&txn)
                    .await?
                    .iter()
                    .map(|p| p.amount_paid)
                    .sum();
                let status = PaymentStatus::derive(paid, inv.total_amount);

                let mut active: invoice::ActiveModel = inv.into();
                active.total_paid = Set(paid);
                active.payment_status = Set(status.to_string());
                active.updated_at = Set(now);
                let updated = active.update(&txn).await?;
                txn.commit().await?;
                Ok((updated, wo.project_id))
            })
            .await?;

        info!(invoice_id, paid = %updated.total_paid, status = %updated.payment_status, "payment recorded");
        let mut view = InvoiceView::from(updated);
        view.warnings.extend(self.events.send_or_warn(ActivityEvent::new(
            session,
            "invoice",
            "payment",
            format!("recorded payment of {} on invoice {}", money(amount), invoice_id),
            Some(project_id),
        )));
        Ok(view)
    }

    /// Stage-wise breakdown of an invoice. A malformed payment term reads as
    /// empty and a missing material rates at zero.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn breakdown(&self, session: &Session, invoice_id: i32) -> Result<InvoiceBreakdown, ServiceError> {
        let scope = privileged(session)?;
        let db = self.db.as_ref();

        self.deadlines
            .run("invoice_breakdown", async move {
                let inv = require(
                    invoice::Entity::find_by_id(invoice_id).one(db).await?,
                    "invoice",
                    invoice_id,
                )?;
                let wo = require(
                    work_order::Entity::find_by_id(inv.work_order_id).one(db).await?,
                    "work order",
                    inv.work_order_id,
                )?;
                check_project_access(db, &scope, wo.project_id).await?;
                let term = PaymentTerm::parse_lenient(wo.payment_term.as_ref());

                let history = element_invoice_history::Entity::find()
                    .filter(element_invoice_history::Column::InvoiceId.eq(inv.id))
                    .order_by_asc(element_invoice_history::Column::Id)
                    .all(db)
                    .await?;
                let element_ids: Vec<i32> = history.iter().map(|h| h.element_id).collect();
                let elements: HashMap<i32, element::Model> = element::Entity::find()
                    .filter(element::Column::Id.is_in(element_ids))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|e| (e.id, e))
                    .collect();
                let type_ids: Vec<i32> = elements.values().map(|e| e.element_type_id).collect();
                let types: HashMap<i32, element_type::Model> = element_type::Entity::find()
                    .filter(element_type::Column::ElementTypeId.is_in(type_ids))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|t| (t.element_type_id, t))
                    .collect();
                let materials = materials_by_code(db, wo.id).await?;
                let targets: Vec<i32> = elements.values().map(|e| e.target_location).collect();
                let locations = resolve_locations(db, &targets).await?;

                let mut lines = Vec::with_capacity(history.len());
                for row in &history {
                    let Some(stage) = StageKey::normalize(&row.stage) else {
                        warn!(invoice_id, stage = %row.stage, "skipping unknown invoice stage");
                        continue;
                    };
                    let Some(el) = elements.get(&row.element_id) else {
                        warn!(invoice_id, element_id = row.element_id, "invoiced element is gone");
                        continue;
                    };
                    let code = types
                        .get(&el.element_type_id)
                        .map(|t| t.element_type.clone())
                        .unwrap_or_default();
                    let (unit_rate, tax) = match materials.get(&code.to_lowercase()) {
                        Some(m) => (m.unit_rate, m.tax),
                        None => {
                            warn!(invoice_id, element_type = %code, "no work order material, rating at zero");
                            (Decimal::ZERO, Decimal::ZERO)
                        }
                    };
                    lines.push(BreakdownLine {
                        stage,
                        element_type: code,
                        hierarchy_id: el.target_location,
                        location: locations.get(&el.target_location).cloned().unwrap_or_default(),
                        volume: row.volume,
                        unit_rate,
                        tax,
                    });
                }

                let stages = summarize(&lines, &term);
                let payment_status = PaymentStatus::derive(inv.total_paid, inv.total_amount);
                Ok(InvoiceBreakdown {
                    invoice_id: inv.id,
                    work_order_id: wo.id,
                    wo_number: wo.wo_number,
                    revision_no: inv.revision_no,
                    total_amount: invoice_total(&stages),
                    total_paid: inv.total_paid,
                    payment_status,
                    stages,
                })
            })
            .await
    }

    /// Invoices visible to an admin or superadmin, newest first.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn list_invoices(
        &self,
        session: &Session,
        work_order_id: Option<i32>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<InvoiceView>, u64), ServiceError> {
        let scope = privileged(session)?;
        let db = self.db.as_ref();

        self.deadlines
            .run("list_invoices", async move {
                let mut query = invoice::Entity::find().order_by_desc(invoice::Column::Id);
                if !matches!(scope, ScopePredicate::All) {
                    let visible_orders = Query::select()
                        .column(work_order::Column::Id)
                        .from(work_order::Entity)
                        .cond_where(scope.condition(work_order::Column::ProjectId))
                        .to_owned();
                    query = query.filter(invoice::Column::WorkOrderId.in_subquery(visible_orders));
                }
                if let Some(wo) = work_order_id {
                    query = query.filter(invoice::Column::WorkOrderId.eq(wo));
                }
                let paginator = query.paginate(db, page_size);
                let total = paginator.num_items().await?;
                let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
                Ok((rows.into_iter().map(InvoiceView::from).collect(), total))
            })
            .await
    }
}

fn privileged(session: &Session) -> Result<ScopePredicate, ServiceError> {
    let scope = session.privileged_scope();
    if scope.is_deny() {
        return Err(ServiceError::Forbidden(format!(
            "role {} cannot access invoices",
            session.role.name()
        )));
    }
    Ok(scope)
}

async fn materials_by_code<C: ConnectionTrait>(
    conn: &C,
    work_order_id: i32,
) -> Result<HashMap<String, work_order_material::Model>, ServiceError> {
    Ok(work_order_material::Entity::find()
        .filter(work_order_material::Column::WorkOrderId.eq(work_order_id))
        .order_by_asc(work_order_material::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.item_name.trim().to_lowercase(), m))
        .collect())
}

/// An element reached a stage when a completion was logged under a project
/// stage of that name. Dispatch and erection may also be read off the stock
/// row.
async fn ensure_stage_reached<C: ConnectionTrait>(
    conn: &C,
    el: &element::Model,
    stage: StageKey,
) -> Result<(), ServiceError> {
    let stages = project_stages(conn, el.project_id).await?;
    let completed = complete_production::Entity::find()
        .filter(complete_production::Column::ElementId.eq(el.id))
        .all(conn)
        .await?;
    let logged = completed.iter().any(|cp| {
        stages
            .get(&cp.stage_id)
            .and_then(|s| StageKey::normalize(&s.name))
            == Some(stage)
    });
    if logged {
        return Ok(());
    }

    let stock = precast_stock::Entity::find()
        .filter(precast_stock::Column::ElementId.eq(el.id))
        .one(conn)
        .await?;
    let from_stock = match (stage, stock) {
        (StageKey::Dispatch, Some(row)) => row.dispatch_status,
        (StageKey::Erection | StageKey::Handover, Some(row)) => row.erected,
        _ => false,
    };
    if from_stock {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "element {} has not reached stage {}",
            el.id, stage
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(stage: StageKey, code: &str, h: i32) -> BreakdownLine {
        BreakdownLine {
            stage,
            element_type: code.into(),
            hierarchy_id: h,
            location: Location::default(),
            volume: dec!(2),
            unit_rate: dec!(100),
            tax: dec!(18),
        }
    }

    fn term() -> PaymentTerm {
        PaymentTerm::from_input(&BTreeMap::from([
            ("casted".to_string(), dec!(40)),
            ("dispatched".to_string(), dec!(20)),
            ("erection".to_string(), dec!(30)),
            ("handover".to_string(), dec!(10)),
        ]))
        .unwrap()
    }

    #[test]
    fn casted_and_dispatch_breakdown() {
        let stages = summarize(
            &[line(StageKey::Dispatch, "WALL", 10), line(StageKey::Casted, "WALL", 10)],
            &term(),
        );
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage, StageKey::Casted);
        assert_eq!(stages[0].total_amount, dec!(236.00));
        assert_eq!(stages[0].amount_paid_by_payment_term, dec!(94.40));
        assert_eq!(stages[1].stage, StageKey::Dispatch);
        assert_eq!(stages[1].total_amount, dec!(236.00));
        assert_eq!(stages[1].amount_paid_by_payment_term, dec!(47.20));
        assert_eq!(invoice_total(&stages), dec!(141.60));
    }

    #[test]
    fn items_group_by_type_and_location() {
        let stages = summarize(
            &[
                line(StageKey::Casted, "WALL", 10),
                line(StageKey::Casted, "WALL", 10),
                line(StageKey::Casted, "WALL", 11),
                line(StageKey::Casted, "SLAB", 10),
            ],
            &term(),
        );
        assert_eq!(stages.len(), 1);
        let items = &stages[0].items;
        assert_eq!(items.len(), 3);
        let wall_10 = items
            .iter()
            .find(|i| i.element_type == "WALL" && i.hierarchy_id == 10)
            .unwrap();
        assert_eq!(wall_10.element_count, 2);
        assert_eq!(wall_10.volume, dec!(4));
        assert_eq!(wall_10.amount, dec!(472.00));
        assert_eq!(stages[0].total_amount, dec!(944.00));
    }

    #[test]
    fn empty_term_bills_nothing() {
        let stages = summarize(&[line(StageKey::Erection, "WALL", 10)], &PaymentTerm::default());
        assert_eq!(stages[0].percent, Decimal::ZERO);
        assert_eq!(stages[0].amount_paid_by_payment_term, Decimal::ZERO);
        assert_eq!(invoice_total(&stages), Decimal::ZERO);
    }
}
