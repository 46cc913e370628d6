//! SeaORM Entity for audit_log table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// None for system-initiated actions (capacity eviction, reaper).
    pub admin_id: Option<i32>,
    pub action: String,
    #[sea_orm(column_type = "Custom(\"inet\".to_owned())")]
    pub ip_address: String,
    pub board_id: Option<i32>,
    pub thread_id: Option<i32>,
    pub post_id: Option<i32>,
    pub ban_id: Option<i32>,
    pub reason: Option<String>,
    pub detail: Option<Json>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
