pub mod auth_service;
pub mod authorization;
pub mod company_service;
pub mod department_service;
pub mod error;
pub mod file_service;
pub mod propagation;
pub mod storage;
pub mod ticket_service;
pub mod user_service;

pub use authorization::{Principal, TicketAction};
pub use error::{ErrorCode, ServiceError, ServiceResult};
