use axum::http::HeaderMap;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::middleware::auth::bearer_token;
use crate::AppState;

/// Blocks mutating calls by the designated observer account. The observer is
/// a public demo identity that may browse everything but never corrupt the
/// curated example content.
///
/// Decodes the caller's token itself rather than relying on the
/// authentication extractor, so it also covers routes that skip the full
/// pipeline. `resource_id = None` means the call is blocked for the observer
/// unconditionally; `Some(id)` blocks only when `id` belongs to the
/// configured protected set.
pub fn deny_observer_write(
    state: &AppState,
    headers: &HeaderMap,
    resource_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let Some(observer_id) = state.config.observer_account_id else {
        return Ok(());
    };

    let token = bearer_token(headers)?;
    let claims = state
        .codec
        .verify_access(token)
        .map_err(|_| ApiError::unauthorized("Unauthorized"))?;

    let caller: Uuid = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("Unauthorized"))?;
    if caller != observer_id {
        return Ok(());
    }

    let protected = match resource_id {
        Some(id) => state.config.protected_asset_ids.contains(&id),
        None => true,
    };
    if protected {
        return Err(ApiError::forbidden(
            "You don't have sufficient privilege to perform that action",
        ));
    }
    Ok(())
}
