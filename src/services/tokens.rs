use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{AccessClaims, RefreshClaims};
use crate::models::user::Role;

/// Verification failures are classified so callers can branch on expiry:
/// logout skips denylisting an already-expired token, the stateful refresh
/// path consumes its record on expiry, and everything else is rejected
/// uniformly.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("could not sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies the two token families. Access and refresh tokens use
/// separate secrets so one leaked key never compromises both.
#[derive(Clone)]
pub struct TokenCodec {
    access_secret: String,
    refresh_secret: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenCodec {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            access_secret: access_secret.to_string(),
            refresh_secret: refresh_secret.to_string(),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    pub fn sign_access(&self, account_id: Uuid, role: Role) -> Result<String, TokenError> {
        let now = Utc::now().timestamp() as usize;
        let claims = AccessClaims {
            sub: account_id.to_string(),
            role,
            iat: now,
            exp: now + self.access_ttl_seconds as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    pub fn sign_refresh(&self, account_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now().timestamp() as usize;
        let claims = RefreshClaims {
            sub: account_id.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_seconds as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &validation(),
        )
        .map(|data| data.claims)
        .map_err(classify)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &validation(),
        )
        .map(|data| data.claims)
        .map_err(classify)
    }
}

/// Zero clock tolerance: a token is invalid the moment its `exp` passes.
/// The crate's default 60s leeway would let verification outlive the
/// `exp`-bounded denylist entries, and logout would skip denylisting a token
/// that still verifies.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn classify(error: jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    }
}

/// Seconds the token remains valid, from its `exp` claim. Non-positive when
/// already expired.
pub fn remaining_ttl(exp: usize) -> i64 {
    exp as i64 - Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("access-secret", "refresh-secret", 300, 3600)
    }

    #[test]
    fn access_token_round_trips_identity_and_role() {
        let codec = codec();
        let id = Uuid::new_v4();
        let token = codec.sign_access(id, Role::Admin).unwrap();
        let claims = codec.verify_access(&token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_no_role() {
        let codec = codec();
        let token = codec.sign_refresh(Uuid::new_v4()).unwrap();
        let claims = codec.verify_refresh(&token).unwrap();
        // RefreshClaims has no role field at all; the round trip proves the
        // payload deserializes without one.
        assert!(remaining_ttl(claims.exp) > 0);
    }

    fn access_token_expired_for(seconds: usize) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = AccessClaims {
            sub: Uuid::new_v4().to_string(),
            role: Role::User,
            iat: now - 7200,
            exp: now - seconds,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret("access-secret".as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn expired_token_is_classified_as_expired() {
        let codec = codec();
        let token = access_token_expired_for(3600);
        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn expiry_has_no_clock_leeway() {
        // 30s past exp sits inside the crate's default 60s leeway; it must
        // still be rejected, or a token would outlive its denylist entry.
        let codec = codec();
        let token = access_token_expired_for(30);
        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn tampered_token_is_invalid_not_expired() {
        let codec = codec();
        let token = codec.sign_access(Uuid::new_v4(), Role::User).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(
            codec.verify_access(&tampered),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn token_families_do_not_cross_verify() {
        let codec = codec();
        let refresh = codec.sign_refresh(Uuid::new_v4()).unwrap();
        // Signed with the refresh secret, so the access verifier must reject it.
        assert!(matches!(
            codec.verify_access(&refresh),
            Err(TokenError::Invalid)
        ));
    }
}
