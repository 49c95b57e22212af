//! Domain services. Each owns a pool handle, the deadline tiers and the
//! post-commit event sender, and runs every mutation in one transaction.

pub mod element_types;
pub mod elements;
pub mod hierarchy;
pub mod invoices;
pub mod pipeline;
pub mod revisions;
pub mod stock;

pub use element_types::ElementTypeService;
pub use elements::ElementLedger;
pub use invoices::InvoiceService;
pub use pipeline::StagePipeline;
pub use stock::StockService;
