use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "element_type_hierarchy_quantity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    /// Precast node (floor or tower) the instances are placed at.
    pub hierarchy_id: i32,
    pub quantity: i32,
    pub naming_convention: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::element_type::Entity",
        from = "Column::ElementTypeId",
        to = "super::element_type::Column::ElementTypeId"
    )]
    ElementType,
    #[sea_orm(
        belongs_to = "super::precast::Entity",
        from = "Column::HierarchyId",
        to = "super::precast::Column::Id"
    )]
    Precast,
}

impl Related<super::element_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ElementType.def()
    }
}

impl Related<super::precast::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Precast.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
