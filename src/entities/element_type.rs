use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameterised definition of a precast part.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "element_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub element_type_id: i32,
    pub project_id: i32,
    /// Short code such as `WALL`; matched against work order materials.
    pub element_type: String,
    pub element_type_name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub thickness: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub length: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub height: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub width: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub area: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub volume: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub mass: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub density: Decimal,
    pub element_type_version: String,
    pub total_count_element: i32,
    /// Brace serialised stage ids, e.g. `{76,75,74}`.
    pub stage_path: String,
    pub created_by: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::hierarchy_quantity::Entity")]
    HierarchyQuantity,
    #[sea_orm(has_many = "super::element::Entity")]
    Element,
    #[sea_orm(has_many = "super::drawing::Entity")]
    Drawing,
    #[sea_orm(has_many = "super::bom_line::Entity")]
    BomLine,
}

impl Related<super::hierarchy_quantity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HierarchyQuantity.def()
    }
}

impl Related<super::element::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Element.def()
    }
}

impl Related<super::drawing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drawing.def()
    }
}

impl Related<super::bom_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
