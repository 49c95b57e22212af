use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "precast_stock")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub element_id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    pub stockyard: bool,
    pub dispatch_status: bool,
    pub dispatch_start: Option<DateTimeUtc>,
    pub dispatch_end: Option<DateTimeUtc>,
    pub erected: bool,
    pub order_by_erection: bool,
    pub receive_in_erection: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::element::Entity",
        from = "Column::ElementId",
        to = "super::element::Column::Id"
    )]
    Element,
}

impl Related<super::element::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Element.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for crate::models::StockFlags {
    fn from(row: &Model) -> Self {
        Self {
            stockyard: row.stockyard,
            dispatch_status: row.dispatch_status,
            erected: row.erected,
            order_by_erection: row.order_by_erection,
            receive_in_erection: row.receive_in_erection,
        }
    }
}
