//! SeaORM Entity for threads table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "threads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub board_id: i32,
    pub subject: Option<String>,
    pub created_at: DateTime,
    /// Sort key for the board listing. Refreshed by accepted, non-saged
    /// posts while the thread is under its bump limit.
    pub bumped_at: DateTime,
    /// Random per-thread value mixed into poster-ID derivation.
    pub salt: String,
    pub is_sticky: bool,
    /// Invariant: retired_at is Some iff is_alive is false.
    pub is_alive: bool,
    pub retired_at: Option<DateTime>,
    /// Cached; incremented in the same transaction as each post insert.
    pub post_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::boards::Entity",
        from = "Column::BoardId",
        to = "super::boards::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Board,
    #[sea_orm(has_many = "super::posts::Entity")]
    Posts,
}

impl Related<super::boards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl Related<super::posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
