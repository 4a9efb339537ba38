use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A tenant. Every ticket, agent and customer is scoped to one company.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub name: String,
    pub email: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::department::Entity")]
    Department,

    #[sea_orm(has_many = "super::user::Entity")]
    User,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(db: &impl ConnectionTrait, name: &str, email: Option<&str>) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            name: Set(name.to_owned()),
            email: Set(email.map(str::to_owned)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id(db: &impl ConnectionTrait, company_id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(company_id).one(db).await
    }

    pub async fn find_by_name(db: &impl ConnectionTrait, name: &str) -> Result<Option<Model>, DbErr> {
        Entity::find().filter(Column::Name.eq(name)).one(db).await
    }

    pub async fn rename(self, db: &impl ConnectionTrait, name: &str) -> Result<Model, DbErr> {
        let mut active_model: ActiveModel = self.into();

        active_model.name = Set(name.to_owned());
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    pub async fn delete(db: &impl ConnectionTrait, company_id: i64) -> Result<bool, DbErr> {
        let result = Entity::delete_by_id(company_id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}
