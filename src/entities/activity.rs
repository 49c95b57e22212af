use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Work record of an element at one stage. The newest row per element is
/// the current one; completed rows stay behind as history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub element_id: i32,
    pub project_id: i32,
    pub stage_id: i32,
    pub task_id: Option<i32>,
    pub assigned_to: Option<i32>,
    pub qc_id: Option<i32>,
    pub paper_id: Option<i32>,
    pub completed: bool,
    pub status: String,
    pub qc_status: String,
    pub mesh_mold_status: String,
    pub reinforcement_status: String,
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
