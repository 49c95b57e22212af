use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only log of finished stages.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "complete_production")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub element_id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    pub stage_id: i32,
    pub user_id: Option<i32>,
    pub started_at: DateTimeUtc,
    pub status: Option<String>,
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
