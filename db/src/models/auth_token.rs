use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;

/// A sign-in session. Tokens are opaque random strings; the JWT layer in
/// front of this core is a separate concern.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i64,

    pub access_token: String,
    pub refresh_token: String,

    pub blocked: bool,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Model {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub async fn create(db: &impl ConnectionTrait, user_id: i64, ttl_hours: i64) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            user_id: Set(user_id),
            access_token: Set(generate_token()),
            refresh_token: Set(generate_token()),
            blocked: Set(false),
            expires_at: Set(now + Duration::hours(ttl_hours)),
            created_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_pair(
        db: &impl ConnectionTrait,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::AccessToken.eq(access_token))
            .filter(Column::RefreshToken.eq(refresh_token))
            .one(db)
            .await
    }

    /// Rotates the access token on refresh, keeping the same session row.
    pub async fn rotate_access_token(self, db: &impl ConnectionTrait) -> Result<Model, DbErr> {
        let mut active_model: ActiveModel = self.into();

        active_model.access_token = Set(generate_token());
        active_model.update(db).await
    }

    pub async fn block(db: &impl ConnectionTrait, token_id: i64) -> Result<(), DbErr> {
        let model = Entity::find_by_id(token_id).one(db).await?;

        let model = match model {
            Some(m) => m,
            None => return Err(DbErr::RecordNotFound("Token not found".to_string())),
        };

        let mut active_model: ActiveModel = model.into();
        active_model.blocked = Set(true);
        active_model.update(db).await?;
        Ok(())
    }

    pub async fn delete(db: &impl ConnectionTrait, token_id: i64) -> Result<(), DbErr> {
        Entity::delete_by_id(token_id).exec(db).await?;
        Ok(())
    }

    /// SQLite stand-in for a TTL index: periodically reap expired sessions.
    pub async fn delete_expired(db: &impl ConnectionTrait) -> Result<u64, DbErr> {
        let result = Entity::delete_many()
            .filter(Column::ExpiresAt.lte(Utc::now()))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }
}
