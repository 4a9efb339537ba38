use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Weak reference from a ticket (or one of its comments) to a file.
/// Name and mimetype are cached here so the read path never has to join
/// against `files`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub ticket_id: i64,

    /// `None` means the file is attached to the ticket body itself.
    pub comment_id: Option<i64>,

    pub file_id: String,
    pub file_name: String,
    pub mimetype: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ticket::Entity",
        from = "Column::TicketId",
        to = "super::ticket::Column::Id"
    )]
    Ticket,

    #[sea_orm(
        belongs_to = "super::ticket_comment::Entity",
        from = "Column::CommentId",
        to = "super::ticket_comment::Column::Id"
    )]
    TicketComment,
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl Related<super::ticket_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketComment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &impl ConnectionTrait,
        ticket_id: i64,
        comment_id: Option<i64>,
        file: &super::file::Model,
    ) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            ticket_id: Set(ticket_id),
            comment_id: Set(comment_id),
            file_id: Set(file.id.clone()),
            file_name: Set(file.name.clone()),
            mimetype: Set(file.mimetype.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_all_for_ticket(db: &impl ConnectionTrait, ticket_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .all(db)
            .await
    }
}
