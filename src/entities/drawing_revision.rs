use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only. Rows are inserted, never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drawings_revision")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub drawing_revision_id: i32,
    pub parent_drawing_id: i32,
    pub element_type_id: i32,
    pub drawing_type_id: i32,
    pub version: i32,
    pub file: String,
    pub comments: Option<String>,
    pub created_by: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::drawing::Entity",
        from = "Column::ParentDrawingId",
        to = "super::drawing::Column::DrawingId"
    )]
    Drawing,
}

impl Related<super::drawing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drawing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
