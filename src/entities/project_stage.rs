use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A production stage of a project with the crew defaults applied on entry.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_stages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub assigned_to: Option<i32>,
    pub qc_id: Option<i32>,
    pub paper_id: Option<i32>,
    pub task_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
