use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            FaceLoginRequest, LoginRequest, MessageResponse, RegisterRequest,
            ResetPasswordRequest, SendOtpRequest, TokenResponse, VerifyOtpRequest,
        },
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        recovery::{self, PendingOtp},
        repo_types::User,
    },
    error::ApiError,
    matcher::FaceMatcher,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/face-login", post(face_login))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/reset-password", post(reset_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn matcher_for(state: &AppState) -> FaceMatcher {
    FaceMatcher::new(state.config.face.distance_threshold)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.name.trim().is_empty()
        || payload.email.is_empty()
        || payload.password.is_empty()
        || payload.descriptors.is_empty()
        || payload.descriptors.iter().any(|d| d.is_empty())
    {
        warn!("register missing fields");
        return Err(ApiError::Validation(
            "Name, email, password, and at least one face descriptor are required.".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    // Hold the enrollment lock across check-then-insert so two concurrent
    // registrations cannot both pass the duplicate scans.
    let _guard = state.enroll_lock.lock().await;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered."));
    }

    let enrolled = User::find_all_with_descriptors(&state.db).await?;
    if let Some(owner) = matcher_for(&state).check_duplicate(&payload.descriptors, &enrolled)? {
        warn!(existing_user = %owner.id, "near-duplicate face enrollment rejected");
        return Err(ApiError::Conflict("A similar face is already registered."));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        &payload.descriptors,
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(MessageResponse {
        message: "User registered".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        warn!("login missing fields");
        return Err(ApiError::Validation("Email and password required.".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::UserNotFound
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse {
        token,
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn face_login(
    State(state): State<AppState>,
    Json(payload): Json<FaceLoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let enrolled = User::find_all_with_descriptors(&state.db).await?;

    // First user within threshold wins, in enumeration order.
    let Some(user) = matcher_for(&state).identify(&payload.descriptor, &enrolled)? else {
        warn!("face not recognized");
        return Err(ApiError::NotRecognized);
    };

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "face login");
    Ok(Json(TokenResponse {
        token,
        email: user.email.clone(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "otp requested for unknown email");
            ApiError::UserNotFound
        })?;

    let ttl_minutes = state.config.face.otp_ttl_minutes;
    let pending = PendingOtp::issue(OffsetDateTime::now_utc(), Duration::minutes(ttl_minutes));

    // Deliver before persisting: a failed send must not leave a pending
    // code the user never received.
    state
        .mailer
        .send(
            &user.email,
            "Your OTP for Password Reset",
            &format!(
                "<h3>Your OTP: <b>{}</b></h3><p>Valid for {ttl_minutes} minutes.</p>",
                pending.code
            ),
        )
        .await?;

    User::set_otp(&state.db, user.id, &pending.code, pending.expires_at).await?;

    info!(user_id = %user.id, "otp issued");
    Ok(Json(MessageResponse {
        message: "OTP sent to your email.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    // Unknown user collapses into the same error as a bad code.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidOrExpired)?;

    recovery::validate(user.pending_otp(), &payload.otp, OffsetDateTime::now_utc())?;

    info!(user_id = %user.id, "otp verified");
    Ok(Json(MessageResponse {
        message: "OTP verified.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.len() < 8 {
        warn!("new password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidOrExpired)?;

    let now = OffsetDateTime::now_utc();
    recovery::validate(user.pending_otp(), &payload.otp, now)?;

    let hash = hash_password(&payload.new_password)?;

    // Conditional write: re-checks the code so a concurrent reset that
    // already consumed it fails here instead of double-consuming.
    let consumed = User::consume_otp(&state.db, &payload.email, &payload.otp, &hash, now).await?;
    if consumed.is_none() {
        warn!(user_id = %user.id, "otp consumed concurrently");
        return Err(ApiError::InvalidOrExpired);
    }

    info!(user_id = %user.id, "password reset, otp consumed");
    Ok(Json(MessageResponse {
        message: "Password reset successful!".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("no-tld@example"));
    }
}
