pub mod activity;
pub mod activity_log;
pub mod bom_line;
pub mod bom_revision;
pub mod client;
pub mod complete_production;
pub mod drawing;
pub mod drawing_revision;
pub mod element;
pub mod element_invoice_history;
pub mod element_type;
pub mod end_client;
pub mod hierarchy_quantity;
pub mod invoice;
pub mod invoice_item;
pub mod invoice_payment;
pub mod notification;
pub mod precast;
pub mod precast_stock;
pub mod project;
pub mod project_member;
pub mod project_stage;
pub mod role;
pub mod session;
pub mod user;
pub mod work_order;
pub mod work_order_material;
