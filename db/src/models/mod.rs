pub mod attachment;
pub mod auth_token;
pub mod company;
pub mod department;
pub mod file;
pub mod ticket;
pub mod ticket_comment;
pub mod ticket_event;
pub mod user;
