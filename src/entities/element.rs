use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A physical instance produced from an element type.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "element")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    pub element_name: String,
    /// Precast node the instance is built for.
    pub target_location: i32,
    pub in_stage: bool,
    pub disabled: bool,
    pub element_type_version: String,
    pub drawing_revision_id: Option<i32>,
    pub bom_revision_id: Option<i32>,
    pub created_by: i32,
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
    #[sea_orm(has_many = "super::activity::Entity")]
    Activity,
    #[sea_orm(has_many = "super::complete_production::Entity")]
    CompleteProduction,
}

impl Related<super::element_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ElementType.def()
    }
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl Related<super::complete_production::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompleteProduction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
