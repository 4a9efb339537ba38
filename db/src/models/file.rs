use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::DeriveActiveEnum;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Metadata row for an uploaded file. Bytes live behind the storage
/// provider; tickets reference files weakly through `attachments`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    /// Uuid v4, assigned at upload.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name, truncated to 25 chars preserving the extension.
    pub name: String,

    /// Provider-assigned storage path.
    pub path: String,

    pub mimetype: String,
    pub size: i64,

    pub status: FileStatus,

    pub owner_user_id: i64,

    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "file_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FileStatus {
    /// Just uploaded, not yet referenced by any ticket/comment/profile.
    /// Reaped by the cleanup sweep once stale.
    #[sea_orm(string_value = "temporal")]
    Temporal,

    /// Referenced by a successful use case; never swept.
    #[sea_orm(string_value = "active")]
    Active,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("No RelationDef implemented")
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create_temporal(
        db: &impl ConnectionTrait,
        id: &str,
        name: &str,
        path: &str,
        mimetype: &str,
        size: i64,
        owner_user_id: i64,
    ) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            id: Set(id.to_owned()),
            name: Set(name.to_owned()),
            path: Set(path.to_owned()),
            mimetype: Set(mimetype.to_owned()),
            size: Set(size),
            status: Set(FileStatus::Temporal),
            owner_user_id: Set(owner_user_id),
            created_at: Set(Utc::now()),
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id(db: &impl ConnectionTrait, file_id: &str) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(file_id).one(db).await
    }

    pub async fn find_by_ids(db: &impl ConnectionTrait, file_ids: &[String]) -> Result<Vec<Model>, DbErr> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        Entity::find()
            .filter(Column::Id.is_in(file_ids.to_vec()))
            .all(db)
            .await
    }

    /// Bulk status flip to `active`. Idempotent: flipping an already-active
    /// file is a no-op at the row level.
    pub async fn activate_many(db: &impl ConnectionTrait, file_ids: &[String]) -> Result<u64, DbErr> {
        if file_ids.is_empty() {
            return Ok(0);
        }

        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(FileStatus::Active))
            .filter(Column::Id.is_in(file_ids.to_vec()))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Temporal files created before `cutoff`, i.e. the sweep candidates.
    /// A file activated concurrently no longer matches the status filter.
    pub async fn find_stale_temporal(
        db: &impl ConnectionTrait,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.eq(FileStatus::Temporal))
            .filter(Column::CreatedAt.lt(cutoff))
            .all(db)
            .await
    }

    /// Returns `false` if the metadata row was already gone.
    pub async fn delete_by_id(db: &impl ConnectionTrait, file_id: &str) -> Result<bool, DbErr> {
        let result = Entity::delete_by_id(file_id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}
