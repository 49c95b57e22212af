use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "element_type_bom")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    pub product_id: i32,
    pub product_name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub rate: Decimal,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::element_type::Entity",
        from = "Column::ElementTypeId",
        to = "super::element_type::Column::ElementTypeId"
    )]
    ElementType,
}

impl Related<super::element_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ElementType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
