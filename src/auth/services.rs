use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        otp::{check_otp, expiry_from, generate_otp},
        password::{hash_password, verify_password},
        repo_types::{NewUser, Role, User},
    },
    error::AppError,
    mail::otp_mail,
    state::AppState,
};

/// Failures of the signup / verification / login flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    Conflict,
    #[error("User not found")]
    UserNotFound,
    #[error("User already verified")]
    AlreadyVerified,
    #[error("No OTP found, request a new one")]
    NoOtpPending,
    #[error("OTP expired, request a new one")]
    OtpExpired,
    #[error("Invalid OTP")]
    OtpMismatch,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email not verified. Please verify using the OTP sent to your email.")]
    NotVerified,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Conflict => AppError::Conflict(e.to_string()),
            AuthError::UserNotFound => AppError::NotFound(e.to_string()),
            AuthError::AlreadyVerified
            | AuthError::NoOtpPending
            | AuthError::OtpExpired
            | AuthError::OtpMismatch
            | AuthError::InvalidCredentials
            | AuthError::NotVerified => AppError::Validation(e.to_string()),
            AuthError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Sends the OTP mail. Delivery problems are logged and swallowed so the
/// caller's request still succeeds; the user can ask for a resend.
async fn deliver_otp(state: &AppState, email: &str, otp: &str) {
    let mail = otp_mail(email, otp, state.config.otp.ttl_minutes);
    if let Err(e) = state.mailer.send(mail).await {
        error!(error = ?e, email = %email, "failed to send OTP email");
    }
}

pub async fn signup(state: &AppState, input: Signup) -> Result<User, AuthError> {
    if state.users.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AuthError::Conflict);
    }

    // The insert is conflict-safe as well, for signups racing past the check above.
    let password_hash = hash_password(&input.password)?;
    let otp = generate_otp();
    let otp_expires = expiry_from(OffsetDateTime::now_utc(), state.config.otp.ttl_minutes);

    let user = state
        .users
        .create(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
            role: input.role,
            is_verified: false,
            otp: Some(otp.clone()),
            otp_expires: Some(otp_expires),
        })
        .await?
        .ok_or(AuthError::Conflict)?;

    info!(user_id = user.id, email = %user.email, role = ?user.role, "user signed up");
    deliver_otp(state, &user.email, &otp).await;
    Ok(user)
}

pub async fn verify_otp(state: &AppState, email: &str, otp: &str) -> Result<(), AuthError> {
    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if let Err(e) = check_otp(&user, otp, OffsetDateTime::now_utc()) {
        warn!(user_id = user.id, reason = %e, "otp rejected");
        return Err(e);
    }

    state.users.mark_verified(user.id).await?;
    info!(user_id = user.id, "otp verified");
    Ok(())
}

pub async fn resend_otp(state: &AppState, email: &str) -> Result<(), AuthError> {
    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if user.is_verified {
        return Err(AuthError::AlreadyVerified);
    }

    let otp = generate_otp();
    let expires = expiry_from(OffsetDateTime::now_utc(), state.config.otp.ttl_minutes);
    state.users.set_otp(user.id, &otp, expires).await?;
    info!(user_id = user.id, "otp reissued");

    deliver_otp(state, &user.email, &otp).await;
    Ok(())
}

/// Checks credentials and verification state, then issues a session token.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(String, User), AuthError> {
    let Some(user) = state.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    if !user.is_verified {
        warn!(user_id = user.id, "login before verification");
        return Err(AuthError::NotVerified);
    }

    let token = JwtKeys::from(&state.config.jwt).sign(&user)?;
    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((token, user))
}

pub async fn current_user(state: &AppState, id: i64) -> Result<User, AuthError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotFound)
}
