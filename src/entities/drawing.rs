use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drawings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub drawing_id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    pub drawing_type_id: i32,
    pub current_version: i32,
    pub file: String,
    pub comments: Option<String>,
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
    #[sea_orm(has_many = "super::drawing_revision::Entity")]
    Revision,
}

impl Related<super::element_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ElementType.def()
    }
}

impl Related<super::drawing_revision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Revision.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
