use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{MAX_PERSON_NAME_CHARS, optional_text, required_text};
use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{CreateUserRequest, Role, UpdateUserRequest, User, UserProfile},
};

/// UserFilter
///
/// Query parameters of GET /admin/users.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
}

/// list_users
///
/// [Admin Route] Staff accounts, alphabetical by name.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Users", body = [UserProfile]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<Vec<UserProfile>>> {
    user.require(|role| role.can_manage_users())?;

    let mut users = state.repo.list_users().await?;
    if let Some(role) = filter.role {
        users.retain(|u| u.role == role);
    }
    if let Some(search) = optional_text(filter.search) {
        let needle = search.to_lowercase();
        users.retain(|u| {
            u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
        });
    }
    users.sort_by_cached_key(|u| u.name.to_lowercase());

    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    user.require(|role| role.can_manage_users())?;

    let found = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(UserProfile::from(&found)))
}

/// create_user
///
/// [Admin Route] Creates a staff account. Emails are unique regardless of case.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Invalid email, name or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    user.require(|role| role.can_manage_users())?;

    let email = auth::normalize_email(&payload.email)?;
    let name = required_text("Name", &payload.name, MAX_PERSON_NAME_CHARS)?;
    auth::validate_password(&payload.password)?;

    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let now = Utc::now();
    let created = User {
        id: Uuid::new_v4(),
        email,
        name,
        password_hash: auth::hash_password(&payload.password, state.config.bcrypt_cost).await?,
        role: payload.role,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    };
    state.repo.save_user(&created).await?;

    tracing::info!(user_id = %created.id, role = ?created.role, by = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserProfile::from(&created))))
}

/// update_user
///
/// [Admin Route] Changes name, role, activation or resets the password. An admin
/// cannot demote or deactivate their own account.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserProfile>> {
    user.require(|role| role.can_manage_users())?;

    let mut target = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if target.id == user.id {
        if payload.role.is_some_and(|role| role != Role::Admin) {
            return Err(AppError::Validation(
                "You cannot remove your own admin role".to_string(),
            ));
        }
        if payload.is_active == Some(false) {
            return Err(AppError::Validation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
    }

    if let Some(name) = &payload.name {
        target.name = required_text("Name", name, MAX_PERSON_NAME_CHARS)?;
    }
    if let Some(role) = payload.role {
        target.role = role;
    }
    if let Some(is_active) = payload.is_active {
        target.is_active = is_active;
    }
    if let Some(password) = &payload.password {
        auth::validate_password(password)?;
        target.password_hash = auth::hash_password(password, state.config.bcrypt_cost).await?;
    }
    target.updated_at = Utc::now();

    state.repo.save_user(&target).await?;
    tracing::info!(user_id = %target.id, by = %user.id, "user updated");
    Ok(Json(UserProfile::from(&target)))
}

/// delete_user
///
/// [Admin Route] Removes an account. Articles keep their denormalized author name.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(|role| role.can_manage_users())?;

    if id == user.id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    if !state.repo.delete_user(id).await? {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(user_id = %id, by = %user.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
