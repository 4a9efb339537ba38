//! Department CRUD, scoped to a company.

use db::events::DomainEvent;
use db::models::{company, department};
use sea_orm::DbConn;

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::propagation;

pub struct DepartmentService;

impl DepartmentService {
    pub async fn create(
        db: &DbConn,
        company_id: i64,
        name: &str,
    ) -> ServiceResult<department::Model> {
        if company::Model::find_by_id(db, company_id).await?.is_none() {
            return Err(ServiceError::NotFound(ErrorCode::CompanyNotFound));
        }

        let created = department::Model::create(db, company_id, name).await?;

        propagation::emit(
            db,
            DomainEvent::DepartmentCreated {
                department_id: created.id,
                company_id: created.company_id,
                name: created.name.clone(),
                created_at: created.created_at,
            },
        )
        .await;

        Ok(created)
    }

    pub async fn get(db: &DbConn, department_id: i64) -> ServiceResult<department::Model> {
        department::Model::find_by_id(db, department_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::DepartmentNotFound))
    }

    pub async fn list_for_company(
        db: &DbConn,
        company_id: i64,
    ) -> ServiceResult<Vec<department::Model>> {
        Ok(department::Model::find_all_for_company(db, company_id).await?)
    }

    pub async fn rename(
        db: &DbConn,
        department_id: i64,
        name: &str,
    ) -> ServiceResult<department::Model> {
        let department = Self::get(db, department_id).await?;
        let updated = department.rename(db, name).await?;

        propagation::emit(
            db,
            DomainEvent::DepartmentUpdated {
                department_id: updated.id,
                name: updated.name.clone(),
                updated_at: updated.updated_at,
            },
        )
        .await;

        Ok(updated)
    }

    pub async fn delete(db: &DbConn, department_id: i64) -> ServiceResult<()> {
        let department = Self::get(db, department_id).await?;

        department::Model::delete(db, department.id).await?;

        propagation::emit(
            db,
            DomainEvent::DepartmentDeleted {
                department_id: department.id,
                deleted_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(())
    }
}
