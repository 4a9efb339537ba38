//! The single source of truth for access decisions. Every use case calls
//! `can_access` before touching persistence; on deny, nothing is written.

use db::models::ticket::{Model as Ticket, TicketStatus};
use db::models::user::{self, Role};

use crate::error::{ErrorCode, ServiceError, ServiceResult};

/// The authenticated caller, as handed over by the (external) token verifier.
/// Trusted unconditionally by this core.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
    pub company_id: Option<i64>,
}

impl Principal {
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            id: user.id,
            role: user.role,
            company_id: user.company_id,
        }
    }

    /// An admin without a company is a superadmin; with one it is scoped
    /// like an agent of that company.
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Admin && self.company_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    View,
    CustomerReply,
    AgentReply,
    InternalComment,
    Assign,
    UpdateStatus,
    CloseOwn,
}

impl TicketAction {
    fn requires_staff(&self) -> bool {
        matches!(
            self,
            TicketAction::AgentReply
                | TicketAction::InternalComment
                | TicketAction::Assign
                | TicketAction::UpdateStatus
        )
    }

    fn requires_customer(&self) -> bool {
        matches!(self, TicketAction::CustomerReply | TicketAction::CloseOwn)
    }
}

/// Pure decision function: may `principal` perform `action` on `ticket`?
pub fn can_access(principal: &Principal, ticket: &Ticket, action: TicketAction) -> ServiceResult<()> {
    match principal.role {
        Role::Admin => {
            if let Some(company_id) = principal.company_id {
                // Tenant admin: scoped like an agent to its own company.
                if ticket.company_id != company_id {
                    return Err(ServiceError::Forbidden(ErrorCode::CompanyMismatch));
                }
            }
            if action.requires_customer() {
                return Err(ServiceError::Forbidden(ErrorCode::RoleNotAllowed));
            }
            Ok(())
        }
        Role::Agent => {
            let company_id = principal
                .company_id
                .ok_or(ServiceError::Forbidden(ErrorCode::NoCompany))?;
            if ticket.company_id != company_id {
                return Err(ServiceError::Forbidden(ErrorCode::CompanyMismatch));
            }
            if action.requires_customer() {
                return Err(ServiceError::Forbidden(ErrorCode::RoleNotAllowed));
            }
            Ok(())
        }
        Role::Customer => {
            if action.requires_staff() {
                return Err(ServiceError::Forbidden(ErrorCode::RoleNotAllowed));
            }
            // Another customer's ticket is reported as absent, not as
            // forbidden, so its existence never leaks.
            if ticket.customer_id != principal.id {
                return Err(ServiceError::NotFound(ErrorCode::TicketNotFound));
            }
            match action {
                TicketAction::CustomerReply if ticket.status == TicketStatus::Closed => {
                    Err(ServiceError::BadRequest(ErrorCode::TicketNotOpen))
                }
                TicketAction::CloseOwn if ticket.status == TicketStatus::Closed => {
                    Err(ServiceError::BadRequest(ErrorCode::TicketAlreadyClosed))
                }
                _ => Ok(()),
            }
        }
    }
}

/// Ticket creation is a customer action bound to the customer's own
/// company. Returns that company id on success.
pub fn can_create(principal: &Principal) -> ServiceResult<i64> {
    if principal.role != Role::Customer {
        return Err(ServiceError::Forbidden(ErrorCode::RoleNotAllowed));
    }
    principal
        .company_id
        .ok_or(ServiceError::Forbidden(ErrorCode::NoCompany))
}

/// Internal comments are visible to staff only, under every read path.
pub fn can_view_internal(principal: &Principal) -> bool {
    principal.role.is_staff()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use db::models::ticket::TicketPriority;

    fn ticket(company_id: i64, customer_id: i64, status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: 1,
            company_id,
            company_name: "Acme".into(),
            customer_id,
            customer_name: "Carol".into(),
            customer_email: "carol@acme.test".into(),
            agent_id: None,
            agent_name: None,
            agent_email: None,
            department_id: 1,
            department_name: "Support".into(),
            subject: "Cannot login".into(),
            content: "I get a 500 error".into(),
            status,
            priority: TicketPriority::High,
            minutes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn principal(id: i64, role: Role, company_id: Option<i64>) -> Principal {
        Principal {
            id,
            role,
            company_id,
        }
    }

    #[test]
    fn superadmin_is_unrestricted() {
        let p = principal(9, Role::Admin, None);
        let t = ticket(42, 7, TicketStatus::Open);
        assert!(can_access(&p, &t, TicketAction::UpdateStatus).is_ok());
        assert!(can_access(&p, &t, TicketAction::Assign).is_ok());
    }

    #[test]
    fn tenant_admin_is_company_scoped() {
        let p = principal(9, Role::Admin, Some(1));
        let t = ticket(2, 7, TicketStatus::Open);
        let err = can_access(&p, &t, TicketAction::View).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::CompanyMismatch));
    }

    #[test]
    fn agent_cross_company_is_company_mismatch() {
        let p = principal(9, Role::Agent, Some(1));
        let t = ticket(2, 7, TicketStatus::Open);
        for action in [
            TicketAction::View,
            TicketAction::AgentReply,
            TicketAction::InternalComment,
            TicketAction::Assign,
            TicketAction::UpdateStatus,
        ] {
            let err = can_access(&p, &t, action).unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::CompanyMismatch));
        }
    }

    #[test]
    fn agent_same_company_may_act() {
        let p = principal(9, Role::Agent, Some(1));
        let t = ticket(1, 7, TicketStatus::Open);
        assert!(can_access(&p, &t, TicketAction::AgentReply).is_ok());
        assert!(can_access(&p, &t, TicketAction::InternalComment).is_ok());
    }

    #[test]
    fn agent_without_company_is_rejected() {
        let p = principal(9, Role::Agent, None);
        let t = ticket(1, 7, TicketStatus::Open);
        let err = can_access(&p, &t, TicketAction::View).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NoCompany));
    }

    #[test]
    fn customer_never_sees_someone_elses_ticket() {
        let p = principal(8, Role::Customer, Some(1));
        let t = ticket(1, 7, TicketStatus::Open);
        let err = can_access(&p, &t, TicketAction::View).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TicketNotFound));
    }

    #[test]
    fn customer_cannot_use_staff_actions() {
        let p = principal(7, Role::Customer, Some(1));
        let t = ticket(1, 7, TicketStatus::Open);
        let err = can_access(&p, &t, TicketAction::InternalComment).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RoleNotAllowed));
    }

    #[test]
    fn customer_cannot_reply_to_closed_ticket() {
        let p = principal(7, Role::Customer, Some(1));
        let t = ticket(1, 7, TicketStatus::Closed);
        let err = can_access(&p, &t, TicketAction::CustomerReply).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TicketNotOpen));
    }

    #[test]
    fn customer_cannot_close_twice() {
        let p = principal(7, Role::Customer, Some(1));
        let t = ticket(1, 7, TicketStatus::Closed);
        let err = can_access(&p, &t, TicketAction::CloseOwn).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TicketAlreadyClosed));
    }

    #[test]
    fn staff_cannot_use_customer_actions() {
        let p = principal(9, Role::Agent, Some(1));
        let t = ticket(1, 7, TicketStatus::Open);
        let err = can_access(&p, &t, TicketAction::CloseOwn).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RoleNotAllowed));
    }

    #[test]
    fn only_company_customers_may_create_tickets() {
        assert_eq!(can_create(&principal(7, Role::Customer, Some(1))).unwrap(), 1);

        let err = can_create(&principal(7, Role::Customer, None)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NoCompany));

        let err = can_create(&principal(9, Role::Agent, Some(1))).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RoleNotAllowed));
    }

    #[test]
    fn internal_visibility_is_staff_only() {
        assert!(can_view_internal(&principal(1, Role::Agent, Some(1))));
        assert!(can_view_internal(&principal(1, Role::Admin, None)));
        assert!(!can_view_internal(&principal(1, Role::Customer, Some(1))));
    }
}
