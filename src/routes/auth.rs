use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    errors::ApiError,
    middleware::authorize::require_role,
    models::{
        auth::AuthenticatedUser,
        user::{
            AccessTokenResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
            Role, TokenPair,
        },
    },
    services::auth::AuthService,
    AppState,
};

// The variant (user vs CMS admin) is declared by the route, never by the
// request body: /login authenticates user accounts, /cms/login admin
// accounts. Each pair of handlers below delegates to one shared body.

pub async fn login_user(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    login(state, Role::User, body).await
}

pub async fn login_admin(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    login(state, Role::Admin, body).await
}

async fn login(state: AppState, role: Role, body: LoginRequest) -> Result<Json<TokenPair>, ApiError> {
    AuthService::login(&state.db, &state.codec, state.validator.as_ref(), role, &body)
        .await
        .map(Json)
}

pub async fn refresh_user(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    refresh(state, Role::User, body).await
}

pub async fn refresh_admin(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    refresh(state, Role::Admin, body).await
}

async fn refresh(
    state: AppState,
    role: Role,
    body: RefreshRequest,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let access_token =
        AuthService::refresh(&state.codec, state.validator.as_ref(), role, &body).await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

/// Shared by both variants: revocation works on the tokens themselves, the
/// route prefix adds nothing.
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> Result<Json<Value>, ApiError> {
    AuthService::logout(&state.store, &state.codec, state.validator.as_ref(), &body).await?;
    Ok(Json(json!({ "message": "Logout successed" })))
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    register(state, Role::User, body).await
}

pub async fn register_admin(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    register(state, Role::Admin, body).await
}

async fn register(
    state: AppState,
    role: Role,
    body: RegisterRequest,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let profile = AuthService::register(&state.db, role, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(profile).map_err(ApiError::internal)?),
    ))
}

// Sample guarded routes: the authentication gate runs as the extractor, the
// role authorizer as the first statement. Returns the verified-identity
// contract exactly as downstream handlers see it.

pub async fn protected_user(user: AuthenticatedUser) -> Result<Json<Value>, ApiError> {
    require_role(&user, Role::User)?;
    Ok(Json(json!({ "id": user.account_id, "role": user.role })))
}

pub async fn protected_admin(user: AuthenticatedUser) -> Result<Json<Value>, ApiError> {
    require_role(&user, Role::Admin)?;
    Ok(Json(json!({ "id": user.account_id, "role": user.role })))
}
