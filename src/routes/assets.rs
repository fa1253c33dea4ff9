use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    middleware::{authorize::require_role, observer::deny_observer_write},
    models::{
        asset::{AssetKind, ListQuery, UpsertAssetRequest},
        auth::AuthenticatedUser,
        user::Role,
    },
    services::assets::AssetService,
    AppState,
};

/// One route set serves all four narrative-asset resources; the kind is bound
/// when the router is nested under its path. Reads are open to any
/// authenticated identity; writes require the admin role and pass the
/// observer guard (scoped to the path id where there is one, unscoped on
/// create).
pub fn router(kind: AssetKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state, user, query| list(state, kind, user, query))
                .post(move |state, user, headers, body| create(state, kind, user, headers, body)),
        )
        .route(
            "/{id}",
            get(move |state, user, path| fetch(state, kind, user, path))
                .put(move |state, user, headers, path, body| {
                    update(state, kind, user, headers, path, body)
                })
                .delete(move |state, user, headers, path| {
                    remove(state, kind, user, headers, path)
                }),
        )
}

async fn list(
    State(state): State<AppState>,
    kind: AssetKind,
    _user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let (items, total_items) =
        AssetService::list(&state.db, kind, query.page, query.limit).await?;
    Ok(Json(json!({ "items": items, "totalItems": total_items })))
}

async fn fetch(
    State(state): State<AppState>,
    kind: AssetKind,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let asset = AssetService::get(&state.db, kind, id).await?;
    Ok(Json(serde_json::to_value(asset).map_err(ApiError::internal)?))
}

async fn create(
    State(state): State<AppState>,
    kind: AssetKind,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(body): Json<UpsertAssetRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_role(&user, Role::Admin)?;
    deny_observer_write(&state, &headers, None)?;
    let asset = AssetService::create(&state.db, kind, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(asset).map_err(ApiError::internal)?),
    ))
}

async fn update(
    State(state): State<AppState>,
    kind: AssetKind,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpsertAssetRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&user, Role::Admin)?;
    deny_observer_write(&state, &headers, Some(id))?;
    let asset = AssetService::update(&state.db, kind, id, &body).await?;
    Ok(Json(serde_json::to_value(asset).map_err(ApiError::internal)?))
}

async fn remove(
    State(state): State<AppState>,
    kind: AssetKind,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require_role(&user, Role::Admin)?;
    deny_observer_write(&state, &headers, Some(id))?;
    AssetService::delete(&state.db, kind, id).await?;
    Ok(Json(json!({ "message": format!("{} deleted", kind.singular()) })))
}
