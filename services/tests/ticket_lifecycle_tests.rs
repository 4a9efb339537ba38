use std::sync::Arc;

use db::models::ticket::TicketStatus;
use db::models::ticket_event::EventType;
use db::models::user::Role;
use db::models::{company, department, ticket_comment, user};
use db::test_utils::setup_test_db;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use services::authorization::Principal;
use services::error::ErrorCode;
use services::file_service::FileService;
use services::storage::MemoryStorage;
use services::ticket_service::{CreateTicketData, ReplyData, TicketService};

struct TestEnv {
    db: DatabaseConnection,
    files: FileService,
    department: department::Model,
    customer: user::Model,
    agent: user::Model,
}

async fn setup() -> TestEnv {
    let db = setup_test_db().await;

    let company = company::Model::create(&db, "Acme", Some("support@acme.test"))
        .await
        .unwrap();
    let department = department::Model::create(&db, company.id, "Support")
        .await
        .unwrap();
    let customer = user::Model::create(
        &db,
        "Carol Customer",
        "carol@acme.test",
        Role::Customer,
        Some(company.id),
    )
    .await
    .unwrap();
    let agent = user::Model::create(
        &db,
        "Alex Agent",
        "alex@acme.test",
        Role::Agent,
        Some(company.id),
    )
    .await
    .unwrap();

    TestEnv {
        db,
        files: FileService::new(Arc::new(MemoryStorage::new())),
        department,
        customer,
        agent,
    }
}

fn ticket_data(department_id: i64) -> CreateTicketData {
    CreateTicketData {
        subject: "Cannot login".into(),
        content: "I get a 500 error".into(),
        priority: db::models::ticket::TicketPriority::High,
        department_id,
        file_ids: vec![],
    }
}

fn reply(content: &str, minutes: Option<i64>) -> ReplyData {
    ReplyData {
        content: content.into(),
        minutes,
        file_ids: vec![],
    }
}

#[tokio::test]
async fn customer_ticket_starts_open_with_zero_minutes() {
    let env = setup().await;
    let principal = Principal::from_user(&env.customer);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &principal,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.minutes, 0);
    assert_eq!(ticket.subject, "Cannot login");
    assert_eq!(ticket.company_name, "Acme");
    assert_eq!(ticket.customer_name, "Carol Customer");
    assert_eq!(ticket.department_name, "Support");
    assert!(ticket.agent_id.is_none());
}

#[tokio::test]
async fn agent_replies_accumulate_minutes() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    TicketService::reply_agent_ticket(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("Checking the logs", Some(15)),
    )
    .await
    .unwrap();

    TicketService::reply_agent_ticket(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("Found a bad deploy, rolling back", Some(30)),
    )
    .await
    .unwrap();

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert_eq!(view.ticket.minutes, 45);
    assert_eq!(view.comments.len(), 2);
    assert!(
        view.events
            .iter()
            .all(|e| e.event_type == EventType::AgentComment)
    );
}

#[tokio::test]
async fn internal_comments_are_hidden_from_the_customer() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    TicketService::add_internal_comment(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("Customer called twice, escalate", Some(5)),
    )
    .await
    .unwrap();

    let customer_view = TicketService::get_ticket(&env.db, &customer, ticket.id)
        .await
        .unwrap();
    assert!(customer_view.comments.is_empty());

    let agent_view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert_eq!(agent_view.comments.len(), 1);
    assert!(agent_view.comments[0].internal);

    // Internal time still counts toward the ticket total.
    assert_eq!(customer_view.ticket.minutes, 5);
}

#[tokio::test]
async fn internal_comment_events_are_hidden_from_the_customer() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    TicketService::add_internal_comment(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("escalating internally", Some(5)),
    )
    .await
    .unwrap();
    TicketService::reply_agent_ticket(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("we are on it", Some(10)),
    )
    .await
    .unwrap();

    // The customer timeline must carry no trace of the internal note: not
    // its existence, author, or timestamp.
    let customer_view = TicketService::get_ticket(&env.db, &customer, ticket.id)
        .await
        .unwrap();
    assert_eq!(customer_view.events.len(), 1);
    assert!(customer_view.events.iter().all(|e| {
        e.data
            .as_ref()
            .and_then(|d| d.get("internal"))
            .and_then(|v| v.as_bool())
            != Some(true)
    }));

    let agent_view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert_eq!(agent_view.events.len(), 2);
}

#[tokio::test]
async fn negative_minutes_are_rejected() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    let err = TicketService::reply_agent_ticket(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("undoing time", Some(-5)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidMinutes));

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert_eq!(view.ticket.minutes, 0);
    assert!(view.comments.is_empty());
}

#[tokio::test]
async fn legacy_hour_records_convert_once() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    let comment = TicketService::reply_agent_ticket(
        &env.db,
        &env.files,
        &agent,
        ticket.id,
        reply("Long investigation", None),
    )
    .await
    .unwrap();

    // Rewrite the row into its pre-migration shape: hours only.
    let mut legacy: ticket_comment::ActiveModel = comment.into();
    legacy.minutes = Set(None);
    legacy.hours = Set(Some(1.5));
    legacy.update(&env.db).await.unwrap();

    let total = db::models::ticket::Model::recompute_minutes(&env.db, ticket.id)
        .await
        .unwrap();
    assert_eq!(total, 90);

    // Recomputing again must not double-convert.
    let total = db::models::ticket::Model::recompute_minutes(&env.db, ticket.id)
        .await
        .unwrap();
    assert_eq!(total, 90);
}

#[tokio::test]
async fn assignment_records_previous_and_new_agent() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    let updated = TicketService::assign_ticket(&env.db, &agent, ticket.id, env.agent.id)
        .await
        .unwrap();
    assert_eq!(updated.agent_id, Some(env.agent.id));
    assert_eq!(updated.agent_name.as_deref(), Some("Alex Agent"));

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    let event = view
        .events
        .iter()
        .find(|e| e.event_type == EventType::AssignAgent)
        .expect("assignment event missing");
    let data = event.data.as_ref().unwrap();
    assert!(data["previous_agent"].is_null());
    assert_eq!(data["new_agent"], env.agent.id);
}

#[tokio::test]
async fn assigning_a_customer_is_rejected() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    let err = TicketService::assign_ticket(&env.db, &agent, ticket.id, env.customer.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidAgentRole));
}

#[tokio::test]
async fn closed_tickets_reject_customer_replies_until_reopened() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    let closed = TicketService::close_customer_ticket(&env.db, &customer, ticket.id)
        .await
        .unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);

    let err = TicketService::reply_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket.id,
        reply("Are you there?", None),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::TicketNotOpen));

    let reopened = TicketService::reopen_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert_eq!(reopened.status, TicketStatus::Open);

    TicketService::reply_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket.id,
        reply("Thanks, it works again", None),
    )
    .await
    .unwrap();

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    let types: Vec<EventType> = view.events.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&EventType::Close));
    assert!(types.contains(&EventType::ReOpen));
    assert!(types.contains(&EventType::Comment));
}

#[tokio::test]
async fn reopening_an_open_ticket_is_a_noop() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    let same = TicketService::reopen_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert_eq!(same.status, TicketStatus::Open);

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    assert!(view.events.is_empty());
}

#[tokio::test]
async fn status_change_keeps_old_and_new_in_context() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    TicketService::update_ticket_status(&env.db, &agent, ticket.id, TicketStatus::InProgress)
        .await
        .unwrap();

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    let event = view
        .events
        .iter()
        .find(|e| e.event_type == EventType::StatusChange)
        .expect("status-change event missing");
    let data = event.data.as_ref().unwrap();
    assert_eq!(data["old_status"], "open");
    assert_eq!(data["new_status"], "in-progress");
}

#[tokio::test]
async fn validation_limits_are_enforced() {
    let env = setup().await;
    let principal = Principal::from_user(&env.customer);

    let mut data = ticket_data(env.department.id);
    data.subject = "x".repeat(61);
    let err = TicketService::create_customer_ticket(&env.db, &env.files, &principal, data)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SubjectTooLong));

    let mut data = ticket_data(env.department.id);
    data.content = "x".repeat(501);
    let err = TicketService::create_customer_ticket(&env.db, &env.files, &principal, data)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ContentTooLong));

    let mut data = ticket_data(env.department.id);
    data.file_ids = (0..4).map(|i| format!("file-{i}")).collect();
    let err = TicketService::create_customer_ticket(&env.db, &env.files, &principal, data)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MaxFilesExceeded));
}

#[tokio::test]
async fn department_of_another_company_reads_as_absent() {
    let env = setup().await;
    let principal = Principal::from_user(&env.customer);

    let other = company::Model::create(&env.db, "Globex", None).await.unwrap();
    let foreign_dept = department::Model::create(&env.db, other.id, "Sales")
        .await
        .unwrap();

    let err = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &principal,
        ticket_data(foreign_dept.id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DepartmentNotFound));
}

#[tokio::test]
async fn attachments_activate_with_the_ticket() {
    let env = setup().await;
    let principal = Principal::from_user(&env.customer);

    let file = env
        .files
        .upload(&env.db, b"screenshot bytes", "error.png", "image/png", env.customer.id)
        .await
        .unwrap();
    assert_eq!(file.status, db::models::file::FileStatus::Temporal);

    let mut data = ticket_data(env.department.id);
    data.file_ids = vec![file.id.clone()];
    let ticket = TicketService::create_customer_ticket(&env.db, &env.files, &principal, data)
        .await
        .unwrap();

    let stored = db::models::file::Model::find_by_id(&env.db, &file.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, db::models::file::FileStatus::Active);

    let view = TicketService::get_ticket(&env.db, &principal, ticket.id)
        .await
        .unwrap();
    assert_eq!(view.attachments.len(), 1);
    assert_eq!(view.attachments[0].file_id, file.id);
    assert_eq!(view.attachments[0].file_name, "error.png");
    assert!(view.attachments[0].comment_id.is_none());
}

#[tokio::test]
async fn timeline_stays_in_append_order() {
    let env = setup().await;
    let customer = Principal::from_user(&env.customer);
    let agent = Principal::from_user(&env.agent);

    let ticket = TicketService::create_customer_ticket(
        &env.db,
        &env.files,
        &customer,
        ticket_data(env.department.id),
    )
    .await
    .unwrap();

    for i in 0..5 {
        TicketService::reply_agent_ticket(
            &env.db,
            &env.files,
            &agent,
            ticket.id,
            reply(&format!("update {i}"), Some(1)),
        )
        .await
        .unwrap();
    }

    let view = TicketService::get_ticket(&env.db, &agent, ticket.id)
        .await
        .unwrap();
    for pair in view.comments.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
        assert!(pair[0].id < pair[1].id);
    }
    for pair in view.events.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
}
