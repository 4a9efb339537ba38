use std::sync::Arc;

use chrono::{Duration, Utc};
use db::models::file::{self, FileStatus};
use db::models::user::Role;
use db::models::{company, user};
use db::test_utils::setup_test_db;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use services::error::ErrorCode;
use services::file_service::FileService;
use services::storage::{LocalStorage, MemoryStorage, StorageProvider};

async fn setup() -> (DatabaseConnection, FileService, user::Model) {
    let db = setup_test_db().await;

    let company = company::Model::create(&db, "Acme", None).await.unwrap();
    let owner = user::Model::create(&db, "Ada Admin", "ada@acme.test", Role::Admin, Some(company.id))
        .await
        .unwrap();

    let files = FileService::new(Arc::new(MemoryStorage::new()));
    (db, files, owner)
}

/// Backdates a file row so it falls behind the sweep cutoff.
async fn age_file(db: &DatabaseConnection, file_id: &str, minutes: i64) {
    let model = file::Model::find_by_id(db, file_id).await.unwrap().unwrap();
    let mut active: file::ActiveModel = model.into();
    active.created_at = Set(Utc::now() - Duration::minutes(minutes));
    active.update(db).await.unwrap();
}

#[tokio::test]
async fn uploads_start_temporal_and_round_trip() {
    let (db, files, owner) = setup().await;

    let uploaded = files
        .upload(&db, b"hello world", "notes.txt", "text/plain", owner.id)
        .await
        .unwrap();

    assert_eq!(uploaded.status, FileStatus::Temporal);
    assert_eq!(uploaded.size, 11);
    assert_eq!(uploaded.mimetype, "text/plain");
    assert!(files.exists(&db, &uploaded.id).await.unwrap());

    let bytes = files.get(&db, &uploaded.id).await.unwrap();
    assert_eq!(bytes, b"hello world");
}

#[tokio::test]
async fn oversized_uploads_leave_no_metadata_behind() {
    let (db, files, owner) = setup().await;

    let oversized = vec![0u8; 6 * 1024 * 1024];
    let err = files
        .upload(&db, &oversized, "dump.bin", "application/octet-stream", owner.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::FileSizeTooLarge));

    let stale = file::Model::find_stale_temporal(&db, Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert!(stale.is_empty());
}

#[tokio::test]
async fn long_upload_names_are_truncated_with_extension() {
    let (db, files, owner) = setup().await;

    let uploaded = files
        .upload(
            &db,
            b"data",
            "a-very-long-screenshot-name-from-a-mac.png",
            "image/png",
            owner.id,
        )
        .await
        .unwrap();

    assert_eq!(uploaded.name, "a-very-long-screenshot-na.png");
}

#[tokio::test]
async fn activation_is_idempotent() {
    let (db, files, owner) = setup().await;

    let uploaded = files
        .upload(&db, b"data", "a.txt", "text/plain", owner.id)
        .await
        .unwrap();

    let ids = vec![uploaded.id.clone()];
    assert_eq!(files.activate(&db, &ids).await.unwrap(), 1);

    let model = file::Model::find_by_id(&db, &uploaded.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(model.status, FileStatus::Active);

    // Second activation flips nothing but still succeeds.
    files.activate(&db, &ids).await.unwrap();
    let model = file::Model::find_by_id(&db, &uploaded.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(model.status, FileStatus::Active);
}

#[tokio::test]
async fn sweep_reaps_only_stale_temporal_files() {
    let (db, files, owner) = setup().await;

    let stale = files
        .upload(&db, b"old", "old.txt", "text/plain", owner.id)
        .await
        .unwrap();
    let fresh = files
        .upload(&db, b"new", "new.txt", "text/plain", owner.id)
        .await
        .unwrap();
    let active = files
        .upload(&db, b"kept", "kept.txt", "text/plain", owner.id)
        .await
        .unwrap();
    files.activate(&db, &[active.id.clone()]).await.unwrap();

    age_file(&db, &stale.id, 45).await;
    age_file(&db, &active.id, 45).await;

    let deleted = files.cleanup_sweep(&db).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(!files.exists(&db, &stale.id).await.unwrap());
    assert!(files.exists(&db, &fresh.id).await.unwrap());
    assert!(files.exists(&db, &active.id).await.unwrap());

    // Bytes of the reaped file are gone from storage too.
    let err = files.get(&db, &stale.id).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::FileNotFound));
}

#[tokio::test]
async fn delete_reports_whether_the_row_existed() {
    let (db, files, owner) = setup().await;

    let uploaded = files
        .upload(&db, b"data", "a.txt", "text/plain", owner.id)
        .await
        .unwrap();

    assert!(files.delete(&db, &uploaded.id).await.unwrap());
    assert!(!files.delete(&db, &uploaded.id).await.unwrap());
    assert!(!files.exists(&db, &uploaded.id).await.unwrap());
}

#[tokio::test]
async fn exists_rejects_malformed_ids() {
    let (db, files, _owner) = setup().await;
    assert!(!files.exists(&db, "not-a-uuid").await.unwrap());
}

#[tokio::test]
async fn local_storage_writes_under_the_root() {
    let root = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(root.path().to_path_buf());

    let stored = storage.upload_file("abc-123", b"payload").await.unwrap();
    assert_eq!(stored.path, "files/abc-123");
    assert!(root.path().join("files/abc-123").is_file());

    assert_eq!(storage.get_file(&stored.path).await.unwrap(), b"payload");
    storage.delete_file(&stored.path).await.unwrap();
    assert!(!root.path().join("files/abc-123").exists());
}
