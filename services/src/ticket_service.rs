//! The ticket use-case layer. Every mutation runs the authorization policy
//! first, then writes the aggregate inside one transaction: timeline event,
//! field mutation and derived-minutes update commit or roll back together.
//! File activation and outward event emission follow the commit.

use db::events::DomainEvent;
use db::models::ticket::{Model as Ticket, NewTicket, TicketPriority, TicketStatus};
use db::models::ticket_comment::{Model as Comment, NewComment};
use db::models::ticket_event::{EventType, Model as Event};
use db::models::user::UserSnapshot;
use db::models::{attachment, company, department, file, user};
use sea_orm::{DbConn, TransactionTrait};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::authorization::{Principal, TicketAction, can_access, can_create, can_view_internal};
use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::file_service::FileService;
use crate::propagation;

#[derive(Debug, Clone, Validate)]
pub struct CreateTicketData {
    #[validate(length(max = 60, code = "SUBJECT_TOO_LONG"))]
    pub subject: String,

    #[validate(length(max = 500, code = "CONTENT_TOO_LONG"))]
    pub content: String,

    pub priority: TicketPriority,
    pub department_id: i64,

    #[validate(length(max = 3, code = "MAX_FILES_EXCEEDED"))]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct ReplyData {
    #[validate(length(max = 500, code = "CONTENT_TOO_LONG"))]
    pub content: String,

    /// Time spent on this reply, in minutes.
    #[validate(range(min = 0, code = "INVALID_MINUTES"))]
    pub minutes: Option<i64>,

    #[validate(length(max = 3, code = "MAX_FILES_EXCEEDED"))]
    pub file_ids: Vec<String>,
}

/// A ticket with its timeline, filtered for the requesting principal.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub ticket: Ticket,
    pub comments: Vec<Comment>,
    pub events: Vec<Event>,
    pub attachments: Vec<attachment::Model>,
}

pub struct TicketService;

impl TicketService {
    async fn load_ticket(db: &DbConn, ticket_id: i64) -> ServiceResult<Ticket> {
        Ticket::find_by_id(db, ticket_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::TicketNotFound))
    }

    async fn author_snapshot(db: &DbConn, principal: &Principal) -> ServiceResult<UserSnapshot> {
        let author = user::Model::find_by_id(db, principal.id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::UserNotFound))?;
        Ok(author.snapshot())
    }

    /// Every referenced file must exist at the metadata level before the
    /// mutation proceeds; activation happens only after persistence.
    async fn fetch_files(db: &DbConn, file_ids: &[String]) -> ServiceResult<Vec<file::Model>> {
        let files = file::Model::find_by_ids(db, file_ids).await?;
        if files.len() != file_ids.len() {
            return Err(ServiceError::NotFound(ErrorCode::FileNotFound));
        }
        Ok(files)
    }

    pub async fn create_customer_ticket(
        db: &DbConn,
        files: &FileService,
        principal: &Principal,
        data: CreateTicketData,
    ) -> ServiceResult<Ticket> {
        data.validate()?;

        let company_id = can_create(principal)?;

        let (company, customer, dept) = tokio::try_join!(
            company::Model::find_by_id(db, company_id),
            user::Model::find_by_id(db, principal.id),
            department::Model::find_by_id(db, data.department_id),
        )?;

        let company = company.ok_or(ServiceError::NotFound(ErrorCode::CompanyNotFound))?;
        let customer = customer.ok_or(ServiceError::NotFound(ErrorCode::UserNotFound))?;
        let dept = dept.ok_or(ServiceError::NotFound(ErrorCode::DepartmentNotFound))?;
        if dept.company_id != company.id {
            return Err(ServiceError::NotFound(ErrorCode::DepartmentNotFound));
        }

        let referenced = Self::fetch_files(db, &data.file_ids).await?;

        let txn = db.begin().await?;

        let ticket = Ticket::create(
            &txn,
            NewTicket {
                company_id: company.id,
                company_name: company.name,
                customer: customer.snapshot(),
                department_id: dept.id,
                department_name: dept.name,
                subject: data.subject,
                content: data.content,
                priority: data.priority,
            },
        )
        .await?;

        for file in &referenced {
            attachment::Model::create(&txn, ticket.id, None, file).await?;
        }

        txn.commit().await?;

        // Activation comes after persistence: a stray activated file is
        // harmless, a referenced-but-temporal one would get swept.
        files.activate(db, &data.file_ids).await?;

        propagation::emit(db, DomainEvent::ticket_created(&ticket)).await;

        Ok(ticket)
    }

    pub async fn reply_customer_ticket(
        db: &DbConn,
        files: &FileService,
        principal: &Principal,
        ticket_id: i64,
        data: ReplyData,
    ) -> ServiceResult<Comment> {
        data.validate()?;

        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::CustomerReply)?;

        Self::append_comment(db, files, principal, &ticket, data, false, EventType::Comment).await
    }

    pub async fn reply_agent_ticket(
        db: &DbConn,
        files: &FileService,
        principal: &Principal,
        ticket_id: i64,
        data: ReplyData,
    ) -> ServiceResult<Comment> {
        data.validate()?;

        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::AgentReply)?;

        Self::append_comment(
            db,
            files,
            principal,
            &ticket,
            data,
            false,
            EventType::AgentComment,
        )
        .await
    }

    /// Staff-only note on the timeline, invisible to the customer.
    pub async fn add_internal_comment(
        db: &DbConn,
        files: &FileService,
        principal: &Principal,
        ticket_id: i64,
        data: ReplyData,
    ) -> ServiceResult<Comment> {
        data.validate()?;

        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::InternalComment)?;

        Self::append_comment(
            db,
            files,
            principal,
            &ticket,
            data,
            true,
            EventType::AgentComment,
        )
        .await
    }

    /// Shared append path: comment row, attachments, timeline event and
    /// minutes recomputation commit as one unit; file activation and the
    /// outward event follow.
    async fn append_comment(
        db: &DbConn,
        files: &FileService,
        principal: &Principal,
        ticket: &Ticket,
        data: ReplyData,
        internal: bool,
        event_type: EventType,
    ) -> ServiceResult<Comment> {
        let author = Self::author_snapshot(db, principal).await?;
        let referenced = Self::fetch_files(db, &data.file_ids).await?;

        let txn = db.begin().await?;

        let comment = Comment::create(
            &txn,
            NewComment {
                ticket_id: ticket.id,
                author: author.clone(),
                content: data.content,
                minutes: data.minutes,
                internal,
            },
        )
        .await?;

        for file in &referenced {
            attachment::Model::create(&txn, ticket.id, Some(comment.id), file).await?;
        }

        Event::create(
            &txn,
            ticket.id,
            &author,
            event_type,
            Some(json!({ "comment_id": comment.id, "internal": internal })),
        )
        .await?;

        Ticket::recompute_minutes(&txn, ticket.id).await?;

        txn.commit().await?;

        files.activate(db, &data.file_ids).await?;

        propagation::emit(db, DomainEvent::ticket_replied(&comment)).await;

        Ok(comment)
    }

    pub async fn assign_ticket(
        db: &DbConn,
        principal: &Principal,
        ticket_id: i64,
        agent_id: i64,
    ) -> ServiceResult<Ticket> {
        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::Assign)?;

        let agent = user::Model::find_by_id(db, agent_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::UserNotFound))?;
        if !agent.role.is_staff() {
            return Err(ServiceError::BadRequest(ErrorCode::InvalidAgentRole));
        }

        let actor = Self::author_snapshot(db, principal).await?;
        let previous_agent_id = ticket.agent_id;

        let txn = db.begin().await?;

        Event::create(
            &txn,
            ticket.id,
            &actor,
            EventType::AssignAgent,
            Some(json!({
                "previous_agent": previous_agent_id,
                "new_agent": agent.id,
            })),
        )
        .await?;

        let snapshot = agent.snapshot();
        let updated = ticket.set_agent(&txn, &snapshot).await?;

        txn.commit().await?;

        propagation::emit(
            db,
            DomainEvent::TicketAssigned {
                ticket_id: updated.id,
                company_id: updated.company_id,
                agent_id: agent.id,
                previous_agent_id,
                assigned_at: updated.updated_at,
            },
        )
        .await;

        Ok(updated)
    }

    /// Explicit status-update command: any state is reachable from any
    /// other. Reopening a closed ticket is tracked as `re-open`; everything
    /// else as `status-change` with the old and new status in the context.
    pub async fn update_ticket_status(
        db: &DbConn,
        principal: &Principal,
        ticket_id: i64,
        new_status: TicketStatus,
    ) -> ServiceResult<Ticket> {
        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::UpdateStatus)?;

        let old_status = ticket.status;
        if old_status == new_status {
            return Ok(ticket);
        }

        let actor = Self::author_snapshot(db, principal).await?;

        let event_type = if old_status == TicketStatus::Closed && new_status == TicketStatus::Open {
            EventType::ReOpen
        } else {
            EventType::StatusChange
        };

        let txn = db.begin().await?;

        Event::create(
            &txn,
            ticket.id,
            &actor,
            event_type,
            Some(json!({
                "old_status": old_status.to_string(),
                "new_status": new_status.to_string(),
            })),
        )
        .await?;

        let updated = ticket.set_status(&txn, new_status).await?;

        txn.commit().await?;

        propagation::emit(
            db,
            DomainEvent::TicketUpdated {
                ticket_id: updated.id,
                company_id: updated.company_id,
                old_status,
                new_status,
                updated_at: updated.updated_at,
            },
        )
        .await;

        Ok(updated)
    }

    pub async fn close_customer_ticket(
        db: &DbConn,
        principal: &Principal,
        ticket_id: i64,
    ) -> ServiceResult<Ticket> {
        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::CloseOwn)?;

        let actor = Self::author_snapshot(db, principal).await?;

        let txn = db.begin().await?;

        Event::create(
            &txn,
            ticket.id,
            &actor,
            EventType::Close,
            Some(json!({ "old_status": ticket.status.to_string() })),
        )
        .await?;

        let updated = ticket.set_status(&txn, TicketStatus::Closed).await?;

        txn.commit().await?;

        propagation::emit(
            db,
            DomainEvent::TicketClosed {
                ticket_id: updated.id,
                company_id: updated.company_id,
                closed_by: principal.id,
                closed_at: updated.updated_at,
            },
        )
        .await;

        Ok(updated)
    }

    /// No-op unless the ticket is currently closed.
    pub async fn reopen_ticket(
        db: &DbConn,
        principal: &Principal,
        ticket_id: i64,
    ) -> ServiceResult<Ticket> {
        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::UpdateStatus)?;

        if ticket.status != TicketStatus::Closed {
            return Ok(ticket);
        }

        Self::update_ticket_status(db, principal, ticket_id, TicketStatus::Open).await
    }

    /// `true` for the timeline event of an internal comment. Those carry
    /// `internal: true` in their context and must stay staff-only, like the
    /// comment rows they point at.
    fn marks_internal_comment(event: &Event) -> bool {
        event
            .data
            .as_ref()
            .and_then(|d| d.get("internal"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Read path. Internal comments are stripped for customers, event rows
    /// referencing them included.
    pub async fn get_ticket(
        db: &DbConn,
        principal: &Principal,
        ticket_id: i64,
    ) -> ServiceResult<TicketView> {
        let ticket = Self::load_ticket(db, ticket_id).await?;
        can_access(principal, &ticket, TicketAction::View)?;

        let include_internal = can_view_internal(principal);
        let comments = Comment::find_all_for_ticket(db, ticket.id, include_internal).await?;
        let mut events = Event::find_all_for_ticket(db, ticket.id).await?;
        if !include_internal {
            events.retain(|e| !Self::marks_internal_comment(e));
        }
        let attachments = attachment::Model::find_all_for_ticket(db, ticket.id).await?;

        Ok(TicketView {
            ticket,
            comments,
            events,
            attachments,
        })
    }

    /// Tenant-scoped listing: customers see their own tickets, agents and
    /// tenant admins their company's, superadmins everything.
    pub async fn list_tickets(
        db: &DbConn,
        principal: &Principal,
        status: Option<TicketStatus>,
    ) -> ServiceResult<Vec<Ticket>> {
        match principal.role {
            user::Role::Customer => {
                let mut tickets = Ticket::find_all_for_customer(db, principal.id).await?;
                if let Some(status) = status {
                    tickets.retain(|t| t.status == status);
                }
                Ok(tickets)
            }
            user::Role::Agent => {
                let company_id = principal
                    .company_id
                    .ok_or(ServiceError::Forbidden(ErrorCode::NoCompany))?;
                Ok(Ticket::find_all_for_company(db, company_id, status).await?)
            }
            user::Role::Admin => match principal.company_id {
                Some(company_id) => {
                    Ok(Ticket::find_all_for_company(db, company_id, status).await?)
                }
                None => {
                    let mut tickets = Ticket::find_all(db).await?;
                    if let Some(status) = status {
                        tickets.retain(|t| t.status == status);
                    }
                    Ok(tickets)
                }
            },
        }
    }
}
