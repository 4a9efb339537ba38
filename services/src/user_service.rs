//! User management. Profile updates ripple into every denormalized copy of
//! the user (tickets, comments, events) via the emitted `user.updated`
//! event; an optional avatar upload follows the temporal→active file flow.

use db::events::DomainEvent;
use db::models::user::{self, Role};
use sea_orm::DbConn;
use validator::Validate;

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::file_service::FileService;
use crate::propagation;

#[derive(Debug, Clone, Validate)]
pub struct UpdateProfileData {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    /// Previously uploaded avatar file, activated on success.
    pub avatar_file_id: Option<String>,
}

pub struct UserService;

impl UserService {
    pub async fn create(
        db: &DbConn,
        name: &str,
        email: &str,
        role: Role,
        company_id: Option<i64>,
    ) -> ServiceResult<user::Model> {
        if user::Model::find_by_email(db, email).await?.is_some() {
            return Err(ServiceError::Conflict(ErrorCode::EmailAlreadyExists));
        }

        Ok(user::Model::create(db, name, email, role, company_id).await?)
    }

    pub async fn get(db: &DbConn, user_id: i64) -> ServiceResult<user::Model> {
        user::Model::find_by_id(db, user_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::UserNotFound))
    }

    pub async fn update_profile(
        db: &DbConn,
        files: &FileService,
        user_id: i64,
        data: UpdateProfileData,
    ) -> ServiceResult<user::Model> {
        data.validate()?;

        if let Some(existing) = user::Model::find_by_email(db, &data.email).await? {
            if existing.id != user_id {
                return Err(ServiceError::Conflict(ErrorCode::EmailAlreadyExists));
            }
        }

        if let Some(avatar_id) = &data.avatar_file_id {
            if !files.exists(db, avatar_id).await? {
                return Err(ServiceError::NotFound(ErrorCode::FileNotFound));
            }
        }

        let user = Self::get(db, user_id).await?;
        let updated = user.update_profile(db, &data.name, &data.email).await?;

        if let Some(avatar_id) = &data.avatar_file_id {
            files.activate(db, std::slice::from_ref(avatar_id)).await?;
        }

        propagation::emit(
            db,
            DomainEvent::UserUpdated {
                user_id: updated.id,
                name: updated.name.clone(),
                email: updated.email.clone(),
                updated_at: updated.updated_at,
            },
        )
        .await;

        Ok(updated)
    }
}
