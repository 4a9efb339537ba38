use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::DeriveActiveEnum;
use sea_orm::{QueryFilter, QueryOrder, entity::prelude::*};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::user::UserSnapshot;

/// A structural timeline entry: status changes, assignments, open/close.
/// Append-only, like comments.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "ticket_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub ticket_id: i64,

    // Actor snapshot
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_role: String,

    pub event_type: EventType,

    /// Free-form context, e.g. `{"old_status": "open", "new_status": "closed"}`.
    pub data: Option<Json>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ticket_event_type")]
#[strum(ascii_case_insensitive)]
pub enum EventType {
    #[serde(rename = "create")]
    #[strum(serialize = "create")]
    #[sea_orm(string_value = "create")]
    Create,

    #[serde(rename = "status-change")]
    #[strum(serialize = "status-change")]
    #[sea_orm(string_value = "status-change")]
    StatusChange,

    #[serde(rename = "assign-agent")]
    #[strum(serialize = "assign-agent")]
    #[sea_orm(string_value = "assign-agent")]
    AssignAgent,

    #[serde(rename = "close")]
    #[strum(serialize = "close")]
    #[sea_orm(string_value = "close")]
    Close,

    #[serde(rename = "open")]
    #[strum(serialize = "open")]
    #[sea_orm(string_value = "open")]
    Open,

    #[serde(rename = "re-open")]
    #[strum(serialize = "re-open")]
    #[sea_orm(string_value = "re-open")]
    ReOpen,

    #[serde(rename = "transfer")]
    #[strum(serialize = "transfer")]
    #[sea_orm(string_value = "transfer")]
    Transfer,

    #[serde(rename = "comment")]
    #[strum(serialize = "comment")]
    #[sea_orm(string_value = "comment")]
    Comment,

    #[serde(rename = "agent-comment")]
    #[strum(serialize = "agent-comment")]
    #[sea_orm(string_value = "agent-comment")]
    AgentComment,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ticket::Entity",
        from = "Column::TicketId",
        to = "super::ticket::Column::Id"
    )]
    Ticket,
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &impl ConnectionTrait,
        ticket_id: i64,
        actor: &UserSnapshot,
        event_type: EventType,
        data: Option<Json>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            ticket_id: Set(ticket_id),
            user_id: Set(actor.id),
            user_name: Set(actor.name.clone()),
            user_email: Set(actor.email.clone()),
            user_role: Set(actor.role.to_string()),
            event_type: Set(event_type),
            data: Set(data),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_all_for_ticket(db: &impl ConnectionTrait, ticket_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}
