pub mod m202608200001_create_companies;
pub mod m202608200002_create_departments;
pub mod m202608200003_create_users;
pub mod m202608200004_create_tickets;
pub mod m202608200005_create_ticket_comments;
pub mod m202608200006_create_ticket_events;
pub mod m202608200007_create_files;
pub mod m202608200008_create_attachments;
pub mod m202608200009_create_auth_tokens;
