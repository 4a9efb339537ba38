use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608200001_create_companies::Migration),
            Box::new(migrations::m202608200002_create_departments::Migration),
            Box::new(migrations::m202608200003_create_users::Migration),
            Box::new(migrations::m202608200004_create_tickets::Migration),
            Box::new(migrations::m202608200005_create_ticket_comments::Migration),
            Box::new(migrations::m202608200006_create_ticket_events::Migration),
            Box::new(migrations::m202608200007_create_files::Migration),
            Box::new(migrations::m202608200008_create_attachments::Migration),
            Box::new(migrations::m202608200009_create_auth_tokens::Migration),
        ]
    }
}
