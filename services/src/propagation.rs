//! Cross-entity event propagation. Tickets embed denormalized snapshots of
//! company, department and user; when a source entity changes, listeners
//! here push the new fields into every embedded copy with bulk updates.
//! Deleting a company or department force-closes its open tickets instead
//! of deleting them.

use chrono::Utc;
use db::events::DomainEvent;
use db::models::{ticket, ticket_comment, ticket_event};
use log::{debug, error};
use once_cell::sync::Lazy;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter};
use tokio::sync::broadcast;

static BUS: Lazy<broadcast::Sender<DomainEvent>> = Lazy::new(|| broadcast::channel(256).0);

/// Observe the outward event stream (for notification senders, audit
/// pipelines and the like). Lagging receivers drop the oldest events.
pub fn subscribe() -> broadcast::Receiver<DomainEvent> {
    BUS.subscribe()
}

/// Emit a domain event: apply the propagation handlers, then forward to
/// subscribers. Called after the emitting use case has persisted its own
/// state. A propagation failure is logged, not bubbled — the originating
/// mutation has already committed.
pub async fn emit(db: &DbConn, event: DomainEvent) {
    debug!("domain event {}", event.event_type());

    if let Err(e) = apply(db, &event).await {
        error!("propagation for {} failed: {}", event.event_type(), e);
    }

    let _ = BUS.send(event);
}

/// The propagation handlers themselves. Public so tests can drive them
/// directly and check the resulting rows.
pub async fn apply(db: &DbConn, event: &DomainEvent) -> Result<(), DbErr> {
    match event {
        DomainEvent::CompanyUpdated {
            company_id, name, ..
        } => {
            ticket::Entity::update_many()
                .col_expr(ticket::Column::CompanyName, Expr::value(name.clone()))
                .filter(ticket::Column::CompanyId.eq(*company_id))
                .exec(db)
                .await?;
            Ok(())
        }

        DomainEvent::DepartmentUpdated {
            department_id,
            name,
            ..
        } => {
            ticket::Entity::update_many()
                .col_expr(ticket::Column::DepartmentName, Expr::value(name.clone()))
                .filter(ticket::Column::DepartmentId.eq(*department_id))
                .exec(db)
                .await?;
            Ok(())
        }

        DomainEvent::UserUpdated {
            user_id,
            name,
            email,
            ..
        } => {
            // The same user may appear as customer, agent, comment author
            // and event actor; each embedded copy gets its own bulk update.
            ticket::Entity::update_many()
                .col_expr(ticket::Column::CustomerName, Expr::value(name.clone()))
                .col_expr(ticket::Column::CustomerEmail, Expr::value(email.clone()))
                .filter(ticket::Column::CustomerId.eq(*user_id))
                .exec(db)
                .await?;

            ticket::Entity::update_many()
                .col_expr(ticket::Column::AgentName, Expr::value(name.clone()))
                .col_expr(ticket::Column::AgentEmail, Expr::value(email.clone()))
                .filter(ticket::Column::AgentId.eq(*user_id))
                .exec(db)
                .await?;

            ticket_comment::Entity::update_many()
                .col_expr(ticket_comment::Column::UserName, Expr::value(name.clone()))
                .col_expr(
                    ticket_comment::Column::UserEmail,
                    Expr::value(email.clone()),
                )
                .filter(ticket_comment::Column::UserId.eq(*user_id))
                .exec(db)
                .await?;

            ticket_event::Entity::update_many()
                .col_expr(ticket_event::Column::UserName, Expr::value(name.clone()))
                .col_expr(ticket_event::Column::UserEmail, Expr::value(email.clone()))
                .filter(ticket_event::Column::UserId.eq(*user_id))
                .exec(db)
                .await?;

            Ok(())
        }

        DomainEvent::CompanyDeleted { company_id, .. } => {
            let closed = ticket::Model::close_open_for_company(db, *company_id).await?;
            debug!(
                "company {} deleted, closed {} open tickets at {}",
                company_id,
                closed,
                Utc::now()
            );
            Ok(())
        }

        DomainEvent::DepartmentDeleted { department_id, .. } => {
            let closed = ticket::Model::close_open_for_department(db, *department_id).await?;
            debug!(
                "department {} deleted, closed {} open tickets",
                department_id, closed
            );
            Ok(())
        }

        // Everything else is informational to the outside world only.
        _ => Ok(()),
    }
}
