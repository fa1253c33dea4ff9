use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::errors::ApiError;
use crate::models::auth::AuthenticatedUser;
use crate::services::store;
use crate::AppState;

/// Pulls the bearer token out of the `Authorization` header. The header must
/// contain exactly two whitespace-separated tokens (scheme + value); any other
/// shape is rejected before signature verification.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("Bearer") => Ok(token),
        _ => Err(ApiError::unauthorized("Unauthorized")),
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        // Denylist before signature: logout must win over an otherwise valid
        // token. A store failure rejects the request; this gate never fails
        // open.
        let revoked = state
            .store
            .exists(&store::access_denylist_key(token))
            .await
            .map_err(ApiError::internal)?;
        if revoked {
            return Err(ApiError::unauthorized("Unauthorized"));
        }

        let claims = state
            .codec
            .verify_access(token)
            .map_err(|_| ApiError::unauthorized("Unauthorized"))?;

        let account_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::unauthorized("Unauthorized"))?;

        Ok(AuthenticatedUser {
            account_id,
            role: claims.role,
        })
    }
}
