use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    middleware::observer::deny_observer_write,
    models::{
        auth::AuthenticatedUser,
        user::{RemindPasswordRequest, UpdatePasswordRequest, UpdateProfileRequest},
    },
    services::users::UserService,
    AppState,
};

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let profile = UserService::get_profile(&state.db, user.account_id).await?;
    Ok(Json(serde_json::to_value(profile).map_err(ApiError::internal)?))
}

// Profile mutations carry the unscoped observer guard: the public demo
// account may look at its profile but never change or delete it.

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    deny_observer_write(&state, &headers, None)?;
    UserService::update_profile(&state.db, user.account_id, user.role, &body).await?;
    Ok(Json(json!({ "message": "Profile updated" })))
}

pub async fn update_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    deny_observer_write(&state, &headers, None)?;
    UserService::update_password(&state.db, user.account_id, &body).await?;
    Ok(Json(json!({ "message": "Password updated" })))
}

pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    deny_observer_write(&state, &headers, None)?;
    UserService::delete_account(&state.db, user.account_id).await?;
    Ok(Json(json!({ "message": "Account deleted" })))
}

/// Unauthenticated: starts the reset flow by emailing a time-limited link.
pub async fn remind_password(
    State(state): State<AppState>,
    Json(body): Json<RemindPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    UserService::remind_password(
        &state.db,
        &state.store,
        state.email.as_deref(),
        &state.config.frontend_url,
        state.config.reset_link_ttl_seconds,
        &body,
    )
    .await?;
    Ok(Json(json!({ "message": "Reset link sent" })))
}

/// Unauthenticated but link-keyed: only works while the reset record stored
/// by `remind_password` is still alive.
pub async fn renew_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    UserService::renew_password(&state.db, &state.store, id, &body).await?;
    Ok(Json(json!({ "message": "Password updated" })))
}
