use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Account role. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Passenger,
    Authority,
}

impl Role {
    /// Only an explicit `"authority"` grants the privileged role.
    pub fn from_requested(requested: Option<&str>) -> Self {
        match requested {
            Some("authority") => Role::Authority,
            _ => Role::Passenger,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,          // Argon2 PHC string
    pub role: Role,
    pub is_verified: bool,
    pub otp: Option<String>,            // set together with otp_expires
    pub otp_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub otp: Option<String>,
    pub otp_expires: Option<OffsetDateTime>,
}
