use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A company department that tickets are filed against.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub company_id: i64,
    pub name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(db: &impl ConnectionTrait, company_id: i64, name: &str) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            company_id: Set(company_id),
            name: Set(name.to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id(db: &impl ConnectionTrait, department_id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(department_id).one(db).await
    }

    pub async fn find_all_for_company(db: &impl ConnectionTrait, company_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CompanyId.eq(company_id))
            .all(db)
            .await
    }

    pub async fn rename(self, db: &impl ConnectionTrait, name: &str) -> Result<Model, DbErr> {
        let mut active_model: ActiveModel = self.into();

        active_model.name = Set(name.to_owned());
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    pub async fn delete(db: &impl ConnectionTrait, department_id: i64) -> Result<bool, DbErr> {
        let result = Entity::delete_by_id(department_id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}
