use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys, repo_types::Role};
use crate::error::AppError;

/// Extracts and validates the bearer JWT, exposing its claims.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".into()))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err(AppError::Unauthorized("Invalid token".into()))
            }
        }
    }
}

/// Fails with `Forbidden` unless the principal holds `required`.
pub fn require_role(claims: &Claims, required: Role) -> Result<(), AppError> {
    let allowed = match (required, claims.role) {
        (Role::Authority, Role::Authority) => true,
        (Role::Passenger, Role::Passenger) => true,
        (Role::Authority, Role::Passenger) | (Role::Passenger, Role::Authority) => false,
    };
    if allowed {
        return Ok(());
    }
    warn!(user_id = claims.id, role = ?claims.role, required = ?required, "role check failed");
    Err(AppError::Forbidden(match required {
        Role::Authority => "Forbidden: authority role required".into(),
        Role::Passenger => "Forbidden: passenger role required".into(),
    }))
}

/// An authenticated principal holding the `authority` role.
pub struct AuthorityUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthorityUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&claims, Role::Authority)?;
        Ok(AuthorityUser(claims))
    }
}
