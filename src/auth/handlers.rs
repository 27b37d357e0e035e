use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MeResponse, MessageResponse, PublicUser,
            ResendOtpRequest, SignupRequest, SignupResponse, VerifyOtpRequest,
        },
        extractors::AuthUser,
        repo_types::Role,
        services::{self, is_valid_email, normalize_email, Signup},
    },
    error::{present, ApiJson, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/resend-otp", post(resend_otp))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

/// Passwords are taken verbatim; only an empty one counts as missing.
fn password(value: Option<String>) -> Option<String> {
    value.filter(|p| !p.is_empty())
}

fn email(value: Option<String>) -> Option<String> {
    present(value).map(|e| normalize_email(&e))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<Json<SignupResponse>, AppError> {
    let (Some(name), Some(email), Some(password)) = (
        present(payload.name),
        email(payload.email),
        password(payload.password),
    ) else {
        return Err(AppError::Validation(
            "name, email and password are required".into(),
        ));
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let user = services::signup(
        &state,
        Signup {
            name,
            email,
            password,
            role: Role::from_requested(payload.role.as_deref()),
        },
    )
    .await?;

    Ok(Json(SignupResponse {
        message: "Signup successful. OTP sent to your email.".into(),
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(email), Some(otp)) = (email(payload.email), present(payload.otp)) else {
        return Err(AppError::Validation("email and otp are required".into()));
    };

    services::verify_otp(&state, &email, &otp).await?;

    Ok(Json(MessageResponse {
        message: "Email verified. You can now log in.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResendOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let Some(email) = email(payload.email) else {
        return Err(AppError::Validation("email is required".into()));
    };

    services::resend_otp(&state, &email).await?;

    Ok(Json(MessageResponse {
        message: "OTP resent to your email".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (Some(email), Some(password)) = (email(payload.email), password(payload.password)) else {
        return Err(AppError::Validation(
            "email and password are required".into(),
        ));
    };

    let (token, user) = services::login(&state, &email, &password).await?;

    Ok(Json(LoginResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, claims), fields(user_id = claims.id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = services::current_user(&state, claims.id).await?;
    Ok(Json(MeResponse { user: user.into() }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use time::{Duration, OffsetDateTime};

    use crate::testing::FakeState;

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn signup_twice_gives_conflict_body() {
        let fake = FakeState::new();
        let body = json!({ "name": "A", "email": "a@x.com", "password": "p1" });

        let (status, first) = fake.call(post_json("/api/auth/signup", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["email"], "a@x.com");
        assert!(first["message"].as_str().unwrap().starts_with("Signup successful"));

        let (status, second) = fake.call(post_json("/api/auth/signup", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(second, json!({ "error": "Email already registered" }));
        assert_eq!(fake.users.count(), 1);
    }

    #[tokio::test]
    async fn signup_requires_fields() {
        let fake = FakeState::new();
        let (status, body) = fake
            .call(post_json("/api/auth/signup", json!({ "email": "a@x.com" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name, email and password are required");
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_error() {
        let fake = FakeState::new();
        let req = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = fake.call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn full_flow_signup_verify_login_me() {
        let fake = FakeState::new();
        fake.call(post_json(
            "/api/auth/signup",
            json!({ "name": "A", "email": "A@X.com", "password": "p1", "role": "authority" }),
        ))
        .await;
        let otp = fake.users.get("a@x.com").unwrap().otp.unwrap();

        let (status, body) = fake
            .call(post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "p1" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Email not verified. Please verify using the OTP sent to your email."
        );

        let (status, body) = fake
            .call(post_json("/api/auth/verify-otp", json!({ "email": "a@x.com", "otp": otp })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email verified. You can now log in.");

        let (status, body) = fake
            .call(post_json("/api/auth/verify-otp", json!({ "email": "a@x.com", "otp": otp })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User already verified");

        let (status, body) = fake
            .call(post_json("/api/auth/login", json!({ "email": "a@x.com", "password": "p1" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["role"], "authority");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = fake.call(get_with_token("/api/auth/me", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "A");
        assert_eq!(body["user"]["isVerified"], true);
        assert!(body["user"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn verify_sixteen_minutes_late_is_expired() {
        let fake = FakeState::new();
        fake.call(post_json(
            "/api/auth/signup",
            json!({ "name": "A", "email": "a@x.com", "password": "p1" }),
        ))
        .await;
        let user = fake.users.get("a@x.com").unwrap();
        // Issued 16 minutes ago with a 15 minute lifetime.
        let issued = OffsetDateTime::now_utc() - Duration::minutes(16);
        fake.users.expire_otp("a@x.com", issued + Duration::minutes(15));

        let (status, body) = fake
            .call(post_json(
                "/api/auth/verify-otp",
                json!({ "email": "a@x.com", "otp": user.otp.unwrap() }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "OTP expired, request a new one" }));
    }

    #[tokio::test]
    async fn resend_for_unknown_user_is_not_found() {
        let fake = FakeState::new();
        let (status, body) = fake
            .call(post_json("/api/auth/resend-otp", json!({ "email": "ghost@x.com" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn me_requires_valid_bearer() {
        let fake = FakeState::new();

        let req = Request::get("/api/auth/me").body(Body::empty()).unwrap();
        let (status, body) = fake.call(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing Authorization header");

        let req = Request::get("/api/auth/me")
            .header(header::AUTHORIZATION, "Token abc")
            .body(Body::empty())
            .unwrap();
        let (status, _) = fake.call(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = fake.call(get_with_token("/api/auth/me", "abc.def.ghi")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn me_for_deleted_user_is_not_found() {
        let fake = FakeState::new();
        let token = fake.token_for_missing_user();
        let (status, body) = fake.call(get_with_token("/api/auth/me", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }
}
