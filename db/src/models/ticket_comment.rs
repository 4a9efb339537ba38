use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::{QueryFilter, QueryOrder, entity::prelude::*};
use serde::{Deserialize, Serialize};

use super::user::UserSnapshot;

/// A timeline comment. Rows are append-only: no service exposes an update
/// or delete path, so the list can only grow in `created_at` order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "ticket_comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub ticket_id: i64,

    // Author snapshot
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_role: String,

    pub content: String,

    /// Time spent, in minutes. `None` contributes zero.
    pub minutes: Option<i64>,

    /// Legacy pre-migration records tracked hours instead of minutes.
    /// Converted at read time, never rewritten.
    pub hours: Option<f64>,

    /// Internal comments are visible to agents and admins only.
    pub internal: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: i64,
    pub author: UserSnapshot,
    pub content: String,
    pub minutes: Option<i64>,
    pub internal: bool,
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
    /// Minutes this comment contributes to the ticket total.
    ///
    /// Legacy rows carry `hours`; the conversion happens here at read time
    /// and is idempotent because the row itself is never rewritten.
    pub fn effective_minutes(&self) -> i64 {
        if let Some(minutes) = self.minutes {
            minutes
        } else if let Some(hours) = self.hours {
            (hours * 60.0).round() as i64
        } else {
            0
        }
    }

    pub async fn create(db: &impl ConnectionTrait, data: NewComment) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            ticket_id: Set(data.ticket_id),
            user_id: Set(data.author.id),
            user_name: Set(data.author.name),
            user_email: Set(data.author.email),
            user_role: Set(data.author.role.to_string()),
            content: Set(data.content),
            minutes: Set(data.minutes),
            hours: Set(None),
            internal: Set(data.internal),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_all_for_ticket(
        db: &impl ConnectionTrait,
        ticket_id: i64,
        include_internal: bool,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().filter(Column::TicketId.eq(ticket_id));

        if !include_internal {
            query = query.filter(Column::Internal.eq(false));
        }

        query
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Sum of effective minutes over all comments, internal ones included.
    /// The legacy hours conversion forces this through the domain layer
    /// instead of a SQL SUM.
    pub async fn total_minutes(db: &impl ConnectionTrait, ticket_id: i64) -> Result<i64, DbErr> {
        let comments = Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .all(db)
            .await?;

        Ok(comments.iter().map(Model::effective_minutes).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn comment(minutes: Option<i64>, hours: Option<f64>) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            ticket_id: 1,
            user_id: 1,
            user_name: "Agent".into(),
            user_email: "agent@example.com".into(),
            user_role: Role::Agent.to_string(),
            content: "Looking into it".into(),
            minutes,
            hours,
            internal: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn minutes_take_precedence() {
        assert_eq!(comment(Some(15), None).effective_minutes(), 15);
    }

    #[test]
    fn legacy_hours_convert_to_minutes() {
        assert_eq!(comment(None, Some(1.5)).effective_minutes(), 90);
    }

    #[test]
    fn migrated_rows_are_not_converted_twice() {
        // A migrated row has minutes populated; stale hours must be ignored.
        let c = comment(Some(90), Some(1.5));
        assert_eq!(c.effective_minutes(), 90);
        assert_eq!(c.effective_minutes(), c.effective_minutes());
    }

    #[test]
    fn missing_time_contributes_zero() {
        assert_eq!(comment(None, None).effective_minutes(), 0);
    }
}
