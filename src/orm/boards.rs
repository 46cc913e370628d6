//! SeaORM Entity for boards table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "boards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_nsfw: bool,
    /// Derive pseudonymous poster IDs for posts on this board.
    pub show_poster_ids: bool,
    /// Display country codes next to posts.
    pub show_flags: bool,
    /// Per-board override; None falls back to the global default.
    pub max_active_threads: Option<i32>,
    /// Per-board override; None falls back to the global default, 0 = unlimited.
    pub bump_limit: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::threads::Entity")]
    Threads,
}

impl Related<super::threads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Threads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
