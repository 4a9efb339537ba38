use sea_orm::DbErr;
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;
use validator::ValidationErrors;

/// Stable machine-readable failure codes. Clients branch on these, never on
/// the human-readable message, so the string form must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TicketNotFound,
    CompanyNotFound,
    DepartmentNotFound,
    UserNotFound,
    FileNotFound,
    TokenNotFound,

    CompanyMismatch,
    RoleNotAllowed,
    NoCompany,
    TokenBlocked,
    TokenExpired,

    TicketNotOpen,
    TicketAlreadyClosed,
    SubjectTooLong,
    ContentTooLong,
    MaxFilesExceeded,
    InvalidAgentRole,
    InvalidMinutes,
    FileSizeTooLarge,
    ValidationFailed,

    CompanyAlreadyExists,
    EmailAlreadyExists,

    FileSaveFailed,
    FileReadFailed,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(ErrorCode),

    #[error("forbidden: {0}")]
    Forbidden(ErrorCode),

    #[error("bad request: {0}")]
    BadRequest(ErrorCode),

    #[error("conflict: {0}")]
    Conflict(ErrorCode),

    #[error("internal error: {0}")]
    Internal(ErrorCode),

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// The stable code carried by this error, if it has one. `Db` failures
    /// map to no code and surface as a generic internal error upstream.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ServiceError::NotFound(code)
            | ServiceError::Forbidden(code)
            | ServiceError::BadRequest(code)
            | ServiceError::Conflict(code)
            | ServiceError::Internal(code) => Some(*code),
            ServiceError::Db(_) => None,
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let code = common::validation_error_codes(&errors)
            .first()
            .and_then(|c| ErrorCode::from_str(c).ok())
            .unwrap_or(ErrorCode::ValidationFailed);
        ServiceError::BadRequest(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_as_screaming_snake_case() {
        assert_eq!(ErrorCode::TicketNotFound.to_string(), "TICKET_NOT_FOUND");
        assert_eq!(ErrorCode::CompanyMismatch.to_string(), "COMPANY_MISMATCH");
        assert_eq!(
            ErrorCode::MaxFilesExceeded.to_string(),
            "MAX_FILES_EXCEEDED"
        );
        assert_eq!(
            ErrorCode::FileSizeTooLarge.to_string(),
            "FILE_SIZE_TOO_LARGE"
        );
    }

    #[test]
    fn codes_parse_back_from_strings() {
        assert_eq!(
            ErrorCode::from_str("TICKET_NOT_OPEN").unwrap(),
            ErrorCode::TicketNotOpen
        );
    }
}
