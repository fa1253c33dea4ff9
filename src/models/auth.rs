use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String, // account UUID
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Claims embedded in the JWT refresh token. Deliberately carries no role:
/// refreshing re-derives the role from the variant requested at refresh time
/// instead of trusting a stale embedded one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String, // account UUID
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT — available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub account_id: Uuid,
    pub role: Role,
}

/// Server-side record persisted per refresh token in the stateful design,
/// keyed by the raw token value. Deleted on logout or the first time the
/// token is presented after expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub account_id: Uuid,
    pub is_admin: bool,
}
