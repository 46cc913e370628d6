//! SeaORM Entity for posts table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "media_kind")]
pub enum MediaKind {
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "video")]
    Video,
    #[sea_orm(string_value = "audio")]
    Audio,
}

impl MediaKind {
    /// Classify an uploaded file by its MIME type.
    pub fn from_mime(mime: &mime::Mime) -> Option<Self> {
        match mime.type_() {
            mime::IMAGE => Some(Self::Image),
            mime::VIDEO => Some(Self::Video),
            mime::AUDIO => Some(Self::Audio),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub thread_id: i32,
    /// Denormalized from the thread for board-scoped queries.
    pub board_id: i32,
    /// May be empty only when media_key is set.
    pub content: String,
    pub media_key: Option<String>,
    pub media_kind: Option<MediaKind>,
    #[sea_orm(column_type = "Custom(\"inet\".to_owned())")]
    pub ip_address: String,
    pub poster_id: Option<String>,
    pub country_code: Option<String>,
    pub name_color: String,
    /// "sage": the poster opted out of bumping the thread.
    pub suppress_bump: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::threads::Entity",
        from = "Column::ThreadId",
        to = "super::threads::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Thread,
    #[sea_orm(
        belongs_to = "super::boards::Entity",
        from = "Column::BoardId",
        to = "super::boards::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Board,
}

impl Related<super::threads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Thread.def()
    }
}

impl Related<super::boards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
