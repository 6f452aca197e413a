use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use std::sync::Arc;

use crate::crypto::{hash_password, verify_password, Identity};
use crate::db::{AuthResponse, LoginRequest, RegisterRequest, StoreError, User, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{require, validate_registration};

fn email_taken() -> ApiError {
    ApiError::conflict("Email already registered").with_status(StatusCode::BAD_REQUEST)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let valid = validate_registration(&request, state.config.auth.min_password_length)?;

    if state.store.find_user_by_email(&valid.email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&valid.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    let user = User::new(valid.email, password_hash, valid.name, valid.role);

    // A concurrent registration may have claimed the email since the lookup
    match state.store.insert_user(user.clone()).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => return Err(email_taken()),
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, role = %user.role, "Registered user");

    let token = state.tokens.issue(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;

    let mut errors = ValidationErrorBuilder::new();
    let email = require(&request.email, "Email").unwrap_or_else(|e| {
        errors.add("email", e);
        ""
    });
    let password = match request.password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => {
            errors.add("password", "Password is required");
            ""
        }
    };
    errors.finish()?;

    let user = state
        .store
        .find_user_by_email(email)
        .await?
        .filter(|user| verify_password(password, &user.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    tracing::debug!(user_id = %user.id, "User logged in");

    let token = state.tokens.issue(&user)?;
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserResponse>, ApiError> {
    state
        .store
        .get_user(&identity.id)
        .await?
        .map(|user| Json(UserResponse::from(user)))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Bearer token from the Authorization header, if one was sent
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Auth middleware: a missing token is 401, a rejected one 403.
/// On success the caller's `Identity` is added to the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let identity = state.tokens.verify(token).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
