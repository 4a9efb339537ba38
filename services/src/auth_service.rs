//! Session lifecycle. Credential checking and JWT issuance live outside
//! this core; here a session is an opaque token pair with a blocked flag
//! and a fixed expiration horizon.

use db::models::{auth_token, user};
use log::info;
use sea_orm::{DatabaseConnection, DbConn};
use std::sync::Arc;

use crate::error::{ErrorCode, ServiceError, ServiceResult};

pub const TOKEN_TTL_HOURS: i64 = 24;

pub struct AuthService {
    token_ttl_hours: i64,
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new(TOKEN_TTL_HOURS)
    }
}

impl AuthService {
    pub fn new(token_ttl_hours: i64) -> Self {
        Self { token_ttl_hours }
    }

    pub fn from_config() -> Self {
        Self::new(common::config::Config::get().token_ttl_hours)
    }

    /// Opens a session for an already-authenticated user.
    pub async fn sign_in(&self, db: &DbConn, user_id: i64) -> ServiceResult<auth_token::Model> {
        let user = user::Model::find_by_id(db, user_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::UserNotFound))?;

        let token = auth_token::Model::create(db, user.id, self.token_ttl_hours).await?;
        info!("user {} signed in, session {}", user.id, token.id);
        Ok(token)
    }

    /// Exchanges a valid token pair for a rotated access token. Blocked and
    /// expired sessions are rejected; an unknown pair reads as absent.
    pub async fn refresh(
        &self,
        db: &DbConn,
        access_token: &str,
        refresh_token: &str,
    ) -> ServiceResult<auth_token::Model> {
        let token = auth_token::Model::find_by_pair(db, access_token, refresh_token)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::TokenNotFound))?;

        if token.blocked {
            return Err(ServiceError::Forbidden(ErrorCode::TokenBlocked));
        }
        if token.is_expired() {
            return Err(ServiceError::Forbidden(ErrorCode::TokenExpired));
        }

        Ok(token.rotate_access_token(db).await?)
    }

    /// Ends the session. Signing out an unknown pair is a no-op.
    pub async fn sign_out(
        &self,
        db: &DbConn,
        access_token: &str,
        refresh_token: &str,
    ) -> ServiceResult<()> {
        if let Some(token) = auth_token::Model::find_by_pair(db, access_token, refresh_token).await?
        {
            auth_token::Model::delete(db, token.id).await?;
            info!("session {} signed out", token.id);
        }
        Ok(())
    }

    pub async fn block(&self, db: &DbConn, token_id: i64) -> ServiceResult<()> {
        auth_token::Model::block(db, token_id).await?;
        Ok(())
    }

    /// Reaps expired sessions; the schedule equals the expiration horizon.
    pub async fn purge_expired(&self, db: &DbConn) -> ServiceResult<u64> {
        let purged = auth_token::Model::delete_expired(db).await?;
        if purged > 0 {
            info!("purged {purged} expired sessions");
        }
        Ok(purged)
    }

    pub fn spawn_purge(
        self: Arc<Self>,
        db: DatabaseConnection,
        period: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(e) = self.purge_expired(&db).await {
                    log::warn!("session purge failed: {e}");
                }
            }
        })
    }
}
