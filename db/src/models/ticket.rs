use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::DeriveActiveEnum;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::user::UserSnapshot;

/// Root aggregate of the help desk. Company, customer, agent and department
/// are denormalized snapshots, not references; cross-entity propagation keeps
/// them in sync when the source entities change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub company_id: i64,
    pub company_name: String,

    pub customer_id: i64,
    pub customer_name: String,
    pub customer_email: String,

    pub agent_id: Option<i64>,
    pub agent_name: Option<String>,
    pub agent_email: Option<String>,

    pub department_id: i64,
    pub department_name: String,

    pub subject: String,
    pub content: String,

    pub status: TicketStatus,
    pub priority: TicketPriority,

    /// Derived: always equals the sum of the comments' effective minutes.
    /// Recomputed after every comment append, never set directly.
    pub minutes: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ticket_status")]
#[strum(ascii_case_insensitive)]
pub enum TicketStatus {
    #[serde(rename = "open")]
    #[strum(serialize = "open")]
    #[sea_orm(string_value = "open")]
    Open,

    #[serde(rename = "in-progress")]
    #[strum(serialize = "in-progress")]
    #[sea_orm(string_value = "in-progress")]
    InProgress,

    #[serde(rename = "pending")]
    #[strum(serialize = "pending")]
    #[sea_orm(string_value = "pending")]
    Pending,

    #[serde(rename = "resolved")]
    #[strum(serialize = "resolved")]
    #[sea_orm(string_value = "resolved")]
    Resolved,

    #[serde(rename = "closed")]
    #[strum(serialize = "closed")]
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ticket_priority")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TicketPriority {
    #[sea_orm(string_value = "low")]
    Low,

    #[sea_orm(string_value = "medium")]
    Medium,

    #[sea_orm(string_value = "high")]
    High,

    #[sea_orm(string_value = "critical")]
    Critical,
}

/// Everything needed to open a ticket, snapshots included.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub company_id: i64,
    pub company_name: String,
    pub customer: UserSnapshot,
    pub department_id: i64,
    pub department_name: String,
    pub subject: String,
    pub content: String,
    pub priority: TicketPriority,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_comment::Entity")]
    TicketComment,

    #[sea_orm(has_many = "super::ticket_event::Entity")]
    TicketEvent,

    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachment,
}

impl Related<super::ticket_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketComment.def()
    }
}

impl Related<super::ticket_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketEvent.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creation always starts a ticket at `open` with zero tracked minutes.
    pub async fn create(db: &impl ConnectionTrait, data: NewTicket) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            company_id: Set(data.company_id),
            company_name: Set(data.company_name),
            customer_id: Set(data.customer.id),
            customer_name: Set(data.customer.name),
            customer_email: Set(data.customer.email),
            agent_id: Set(None),
            agent_name: Set(None),
            agent_email: Set(None),
            department_id: Set(data.department_id),
            department_name: Set(data.department_name),
            subject: Set(data.subject),
            content: Set(data.content),
            status: Set(TicketStatus::Open),
            priority: Set(data.priority),
            minutes: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id(db: &impl ConnectionTrait, ticket_id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(ticket_id).one(db).await
    }

    pub async fn set_status(self, db: &impl ConnectionTrait, status: TicketStatus) -> Result<Model, DbErr> {
        let mut active_model: ActiveModel = self.into();

        active_model.status = Set(status);
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    pub async fn set_agent(self, db: &impl ConnectionTrait, agent: &UserSnapshot) -> Result<Model, DbErr> {
        let mut active_model: ActiveModel = self.into();

        active_model.agent_id = Set(Some(agent.id));
        active_model.agent_name = Set(Some(agent.name.clone()));
        active_model.agent_email = Set(Some(agent.email.clone()));
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    /// Re-derives `minutes` from the comment rows and bumps `updated_at`.
    /// Invoked after every comment append so the invariant holds in the
    /// domain layer rather than in a database hook.
    pub async fn recompute_minutes(db: &impl ConnectionTrait, ticket_id: i64) -> Result<i64, DbErr> {
        let total = super::ticket_comment::Model::total_minutes(db, ticket_id).await?;

        Entity::update_many()
            .col_expr(Column::Minutes, Expr::value(total))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(ticket_id))
            .exec(db)
            .await?;

        Ok(total)
    }

    pub async fn find_all_for_company(
        db: &impl ConnectionTrait,
        company_id: i64,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().filter(Column::CompanyId.eq(company_id));

        if let Some(status) = status {
            query = query.filter(Column::Status.eq(status));
        }

        query.all(db).await
    }

    pub async fn find_all_for_customer(db: &impl ConnectionTrait, customer_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .all(db)
            .await
    }

    pub async fn find_all(db: &impl ConnectionTrait) -> Result<Vec<Model>, DbErr> {
        Entity::find().all(db).await
    }

    /// Force-closes every non-closed ticket of a company. Used when the
    /// company itself is deleted; tickets are audit records and never deleted.
    pub async fn close_open_for_company(db: &impl ConnectionTrait, company_id: i64) -> Result<u64, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(TicketStatus::Closed))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::CompanyId.eq(company_id))
            .filter(Column::Status.ne(TicketStatus::Closed))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn close_open_for_department(db: &impl ConnectionTrait, department_id: i64) -> Result<u64, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(TicketStatus::Closed))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::DepartmentId.eq(department_id))
            .filter(Column::Status.ne(TicketStatus::Closed))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket_comment::{self, NewComment};
    use crate::models::ticket_event::{self, EventType};
    use crate::models::user::{Role, UserSnapshot};
    use crate::test_utils::setup_test_db;
    use sea_orm::TransactionTrait;

    fn customer() -> UserSnapshot {
        UserSnapshot {
            id: 7,
            name: "Carol".into(),
            email: "carol@acme.test".into(),
            role: Role::Customer,
        }
    }

    fn new_ticket() -> NewTicket {
        NewTicket {
            company_id: 1,
            company_name: "Acme".into(),
            customer: customer(),
            department_id: 1,
            department_name: "Support".into(),
            subject: "Cannot login".into(),
            content: "I get a 500 error".into(),
            priority: TicketPriority::High,
        }
    }

    fn comment(ticket_id: i64, minutes: Option<i64>) -> NewComment {
        NewComment {
            ticket_id,
            author: customer(),
            content: "time entry".into(),
            minutes,
            internal: false,
        }
    }

    #[tokio::test]
    async fn tickets_open_with_zero_minutes() {
        let db = setup_test_db().await;

        let ticket = Model::create(&db, new_ticket()).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.minutes, 0);
        assert!(ticket.agent_id.is_none());
    }

    #[tokio::test]
    async fn recompute_sums_comment_minutes() {
        let db = setup_test_db().await;

        let ticket = Model::create(&db, new_ticket()).await.unwrap();
        ticket_comment::Model::create(&db, comment(ticket.id, Some(15)))
            .await
            .unwrap();
        ticket_comment::Model::create(&db, comment(ticket.id, Some(30)))
            .await
            .unwrap();

        let total = Model::recompute_minutes(&db, ticket.id).await.unwrap();
        assert_eq!(total, 45);

        let stored = Model::find_by_id(&db, ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.minutes, 45);
    }

    #[tokio::test]
    async fn uncommitted_timeline_writes_roll_back_together() {
        let db = setup_test_db().await;

        let ticket = Model::create(&db, new_ticket()).await.unwrap();

        let txn = db.begin().await.unwrap();
        ticket_comment::Model::create(&txn, comment(ticket.id, Some(15)))
            .await
            .unwrap();
        ticket_event::Model::create(&txn, ticket.id, &customer(), EventType::Comment, None)
            .await
            .unwrap();
        Model::recompute_minutes(&txn, ticket.id).await.unwrap();
        txn.rollback().await.unwrap();

        let comments = ticket_comment::Model::find_all_for_ticket(&db, ticket.id, true)
            .await
            .unwrap();
        assert!(comments.is_empty());
        let events = ticket_event::Model::find_all_for_ticket(&db, ticket.id)
            .await
            .unwrap();
        assert!(events.is_empty());
        let stored = Model::find_by_id(&db, ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.minutes, 0);
    }

    #[tokio::test]
    async fn bulk_close_touches_only_the_companys_open_tickets() {
        let db = setup_test_db().await;

        let open = Model::create(&db, new_ticket()).await.unwrap();
        let closed = Model::create(&db, new_ticket()).await.unwrap();
        closed.set_status(&db, TicketStatus::Closed).await.unwrap();

        let mut other = new_ticket();
        other.company_id = 2;
        let other = Model::create(&db, other).await.unwrap();

        let affected = Model::close_open_for_company(&db, 1).await.unwrap();
        assert_eq!(affected, 1);

        let open = Model::find_by_id(&db, open.id).await.unwrap().unwrap();
        assert_eq!(open.status, TicketStatus::Closed);
        let other = Model::find_by_id(&db, other.id).await.unwrap().unwrap();
        assert_eq!(other.status, TicketStatus::Open);
    }
}
