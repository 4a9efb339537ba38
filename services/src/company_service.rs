//! Company CRUD. Mutations emit the matching domain event so the
//! propagation layer can fan the change out to the embedded snapshots.

use db::events::DomainEvent;
use db::models::company;
use sea_orm::DbConn;

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::propagation;

pub struct CompanyService;

impl CompanyService {
    pub async fn create(
        db: &DbConn,
        name: &str,
        email: Option<&str>,
    ) -> ServiceResult<company::Model> {
        if company::Model::find_by_name(db, name).await?.is_some() {
            return Err(ServiceError::Conflict(ErrorCode::CompanyAlreadyExists));
        }

        let created = company::Model::create(db, name, email).await?;

        propagation::emit(
            db,
            DomainEvent::CompanyCreated {
                company_id: created.id,
                name: created.name.clone(),
                created_at: created.created_at,
            },
        )
        .await;

        Ok(created)
    }

    pub async fn get(db: &DbConn, company_id: i64) -> ServiceResult<company::Model> {
        company::Model::find_by_id(db, company_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::CompanyNotFound))
    }

    /// Renaming ripples into every ticket's `company_name` snapshot via the
    /// emitted event.
    pub async fn rename(db: &DbConn, company_id: i64, name: &str) -> ServiceResult<company::Model> {
        if let Some(existing) = company::Model::find_by_name(db, name).await? {
            if existing.id != company_id {
                return Err(ServiceError::Conflict(ErrorCode::CompanyAlreadyExists));
            }
        }

        let company = Self::get(db, company_id).await?;
        let updated = company.rename(db, name).await?;

        propagation::emit(
            db,
            DomainEvent::CompanyUpdated {
                company_id: updated.id,
                name: updated.name.clone(),
                updated_at: updated.updated_at,
            },
        )
        .await;

        Ok(updated)
    }

    /// Deleting a company force-closes its open tickets (via propagation)
    /// rather than deleting them; tickets are audit records.
    pub async fn delete(db: &DbConn, company_id: i64) -> ServiceResult<()> {
        let company = Self::get(db, company_id).await?;

        company::Model::delete(db, company.id).await?;

        propagation::emit(
            db,
            DomainEvent::CompanyDeleted {
                company_id: company.id,
                deleted_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(())
    }
}
