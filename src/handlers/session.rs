use axum::{Json, extract::State};
use chrono::Utc;

use super::{MAX_PERSON_NAME_CHARS, required_text};
use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{LoginRequest, LoginResponse, UpdateMeRequest, UserProfile},
};

/// login
///
/// [Public Route] Exchanges email and password for a session token. The password is
/// checked before the activation flag so a wrong guess never reveals account state.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    const INVALID: AppError = AppError::Unauthorized("Invalid email or password");

    let Some(mut user) = state.repo.find_user_by_email(&payload.email).await? else {
        // Same bcrypt work as a wrong password, so timing does not reveal unknown emails.
        let decoy = auth::decoy_hash(state.config.bcrypt_cost).await?;
        auth::verify_password(&payload.password, decoy).await?;
        return Err(INVALID);
    };

    if !auth::verify_password(&payload.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "rejected login attempt");
        return Err(INVALID);
    }
    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated"));
    }

    let now = Utc::now();
    state.repo.touch_last_login(user.id, now).await?;
    user.last_login_at = Some(now);

    let (token, expires_at) = auth::issue_token(&user, &state.config)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: UserProfile::from(&user),
    }))
}

/// get_me
///
/// [Authenticated Route] Profile of the caller.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(UserProfile::from(&user)))
}

/// update_me
///
/// [Authenticated Route] Self-service name and password change. A new password needs
/// the current one.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Current password is wrong")
    )
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMeRequest>,
) -> AppResult<Json<UserProfile>> {
    let mut user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if let Some(name) = &payload.name {
        user.name = required_text("Name", name, MAX_PERSON_NAME_CHARS)?;
    }

    if let Some(new_password) = &payload.new_password {
        let current = payload
            .current_password
            .as_deref()
            .ok_or_else(|| AppError::Validation("Current password is required".to_string()))?;
        if !auth::verify_password(current, &user.password_hash).await? {
            return Err(AppError::Unauthorized("Current password is incorrect"));
        }
        auth::validate_password(new_password)?;
        user.password_hash = auth::hash_password(new_password, state.config.bcrypt_cost).await?;
    }

    user.updated_at = Utc::now();
    state.repo.save_user(&user).await?;
    Ok(Json(UserProfile::from(&user)))
}
