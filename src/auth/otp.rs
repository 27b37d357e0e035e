use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::auth::{repo_types::User, services::AuthError};

/// Six-digit numeric code, never with a leading zero.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn expiry_from(now: OffsetDateTime, ttl_minutes: i64) -> OffsetDateTime {
    now + Duration::minutes(ttl_minutes)
}

/// Decides whether `submitted` verifies `user` at `now`.
///
/// Checks run in a fixed order: already verified, no pending code, expired,
/// then mismatch. A code is still valid at the exact expiry instant.
pub fn check_otp(user: &User, submitted: &str, now: OffsetDateTime) -> Result<(), AuthError> {
    if user.is_verified {
        return Err(AuthError::AlreadyVerified);
    }
    let (Some(code), Some(expires)) = (user.otp.as_deref(), user.otp_expires) else {
        return Err(AuthError::NoOtpPending);
    };
    if now > expires {
        return Err(AuthError::OtpExpired);
    }
    if code != submitted {
        return Err(AuthError::OtpMismatch);
    }
    Ok(())
}
