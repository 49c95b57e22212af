use crate::auth::IdentityGate;
use crate::config::AppConfig;
use crate::db::{Deadlines, DbPool};
use crate::events::EventSender;
use crate::services::{ElementLedger, ElementTypeService, InvoiceService, StagePipeline, StockService};
use std::sync::Arc;

pub mod common;
pub mod element_types;
pub mod elements;
pub mod health;
pub mod invoices;
pub mod stock;
pub mod work_orders;

// Re-export AppState from lib.rs for handler modules
pub use crate::AppState;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub identity: Arc<IdentityGate>,
    pub element_types: Arc<ElementTypeService>,
    pub elements: Arc<ElementLedger>,
    pub pipeline: Arc<StagePipeline>,
    pub stock: Arc<StockService>,
    pub invoices: Arc<InvoiceService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig, events: EventSender) -> Self {
        let deadlines = Deadlines::from(config.deadlines());
        Self {
            identity: Arc::new(IdentityGate::new(
                db.clone(),
                deadlines,
                config.session_ttl_secs,
            )),
            element_types: Arc::new(ElementTypeService::new(
                db.clone(),
                deadlines,
                events.clone(),
                config.engine_options(),
            )),
            elements: Arc::new(ElementLedger::new(db.clone(), deadlines)),
            pipeline: Arc::new(StagePipeline::new(db.clone(), deadlines, events.clone())),
            stock: Arc::new(StockService::new(db.clone(), deadlines, events.clone())),
            invoices: Arc::new(InvoiceService::new(db, deadlines, events)),
        }
    }
}
