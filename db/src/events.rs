/// Domain events emitted by the use-case layer after successful persistence.
///
/// Listeners keep the denormalized snapshots embedded in tickets in sync
/// (cross-entity propagation) and let external consumers observe the
/// lifecycle. The `event_type()` strings are the outward contract.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ticket::{TicketPriority, TicketStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    TicketCreated {
        ticket_id: i64,
        company_id: i64,
        customer_id: i64,
        department_id: i64,
        priority: TicketPriority,
        created_at: DateTime<Utc>,
    },

    TicketUpdated {
        ticket_id: i64,
        company_id: i64,
        old_status: TicketStatus,
        new_status: TicketStatus,
        updated_at: DateTime<Utc>,
    },

    TicketClosed {
        ticket_id: i64,
        company_id: i64,
        closed_by: i64,
        closed_at: DateTime<Utc>,
    },

    TicketReplied {
        ticket_id: i64,
        comment_id: i64,
        author_id: i64,
        internal: bool,
        minutes: Option<i64>,
        replied_at: DateTime<Utc>,
    },

    TicketAssigned {
        ticket_id: i64,
        company_id: i64,
        agent_id: i64,
        previous_agent_id: Option<i64>,
        assigned_at: DateTime<Utc>,
    },

    CompanyCreated {
        company_id: i64,
        name: String,
        created_at: DateTime<Utc>,
    },

    CompanyUpdated {
        company_id: i64,
        name: String,
        updated_at: DateTime<Utc>,
    },

    CompanyDeleted {
        company_id: i64,
        deleted_at: DateTime<Utc>,
    },

    DepartmentCreated {
        department_id: i64,
        company_id: i64,
        name: String,
        created_at: DateTime<Utc>,
    },

    DepartmentUpdated {
        department_id: i64,
        name: String,
        updated_at: DateTime<Utc>,
    },

    DepartmentDeleted {
        department_id: i64,
        deleted_at: DateTime<Utc>,
    },

    UserUpdated {
        user_id: i64,
        name: String,
        email: String,
        updated_at: DateTime<Utc>,
    },

    FileUploaded {
        file_id: String,
        owner_user_id: i64,
        size: i64,
        uploaded_at: DateTime<Utc>,
    },

    FileActivated {
        file_ids: Vec<String>,
        activated_at: DateTime<Utc>,
    },

    FileDeleted {
        file_id: String,
        deleted_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The outward wire name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::TicketCreated { .. } => "ticket.created",
            DomainEvent::TicketUpdated { .. } => "ticket.updated",
            DomainEvent::TicketClosed { .. } => "ticket.closed",
            DomainEvent::TicketReplied { .. } => "ticket.replied",
            DomainEvent::TicketAssigned { .. } => "ticket.assigned",
            DomainEvent::CompanyCreated { .. } => "company.created",
            DomainEvent::CompanyUpdated { .. } => "company.updated",
            DomainEvent::CompanyDeleted { .. } => "company.deleted",
            DomainEvent::DepartmentCreated { .. } => "department.created",
            DomainEvent::DepartmentUpdated { .. } => "department.updated",
            DomainEvent::DepartmentDeleted { .. } => "department.deleted",
            DomainEvent::UserUpdated { .. } => "user.updated",
            DomainEvent::FileUploaded { .. } => "file.uploaded",
            DomainEvent::FileActivated { .. } => "file.activated",
            DomainEvent::FileDeleted { .. } => "file.deleted",
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn ticket_created(ticket: &crate::models::ticket::Model) -> Self {
        DomainEvent::TicketCreated {
            ticket_id: ticket.id,
            company_id: ticket.company_id,
            customer_id: ticket.customer_id,
            department_id: ticket.department_id,
            priority: ticket.priority,
            created_at: ticket.created_at,
        }
    }

    pub fn ticket_replied(comment: &crate::models::ticket_comment::Model) -> Self {
        DomainEvent::TicketReplied {
            ticket_id: comment.ticket_id,
            comment_id: comment.id,
            author_id: comment.user_id,
            internal: comment.internal,
            minutes: comment.minutes,
            replied_at: comment.created_at,
        }
    }
}
