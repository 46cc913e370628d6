//! SeaORM Entity for bans table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Custom(\"inet\".to_owned())")]
    pub ip_address: String,
    /// None = global ban, Some = scoped to one board.
    pub board_id: Option<i32>,
    pub reason: String,
    pub expires_at: Option<DateTime>,
    pub is_active: bool,
    pub appeal: Option<String>,
    pub appeal_status: Option<String>,
    /// Snapshot of the offending post, kept after the post itself is gone.
    /// post_media_key keeps the blob referenced for the reconciler.
    pub post_content: Option<String>,
    pub post_media_key: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::boards::Entity",
        from = "Column::BoardId",
        to = "super::boards::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Board,
}

impl Related<super::boards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
