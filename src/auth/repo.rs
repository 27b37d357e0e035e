use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_verified, otp, otp_expires, created_at, updated_at";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    /// Inserts the user unless the email is taken, in which case `None` is returned.
    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    async fn set_otp(&self, id: i64, otp: &str, expires: OffsetDateTime) -> anyhow::Result<()>;
    /// Marks the user verified and clears both OTP columns.
    async fn mark_verified(&self, id: i64) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, is_verified, otp, otp_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_verified)
        .bind(&user.otp)
        .bind(user.otp_expires)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(created)
    }

    async fn set_otp(&self, id: i64, otp: &str, expires: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET otp = $2, otp_expires = $3, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expires)
        .execute(&self.db)
        .await
        .context("update user otp")?;
        Ok(())
    }

    async fn mark_verified(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET is_verified = TRUE, otp = NULL, otp_expires = NULL, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await
        .context("mark user verified")?;
        Ok(())
    }
}
