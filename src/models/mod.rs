//! Storage-independent domain values.

pub mod geometry;
pub mod hierarchy;
pub mod invoice_math;
pub mod lenient;
pub mod payment_term;
pub mod stage_path;
pub mod status;
pub mod stock;
pub mod version;

pub use geometry::Geometry;
pub use hierarchy::{QuantityChange, QuantityTarget};
pub use invoice_math::PaymentStatus;
pub use payment_term::{PaymentTerm, StageKey};
pub use stage_path::{StagePath, StagePathError};
pub use status::{ActivityStatuses, StatusPatch, StatusValue};
pub use stock::{StockAction, StockFlags, StockStatus};
