use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::auth::RefreshRecord;
use crate::models::user::{
    Account, AccountProfile, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest, Role,
    TokenPair,
};
use crate::services::store::{self, TokenStore};
use crate::services::tokens::{remaining_ttl, TokenCodec, TokenError};

/// One error for "no such account" and "wrong password", so callers cannot
/// probe which emails are registered.
const LOGIN_FAILED: &str = "Account with that email and password does not exist";

const SESSION_EXPIRED: &str = "Your refresh token session expired. Log in again.";

/// How long a refresh record outlives its token. An expired token presented
/// within this window still finds its record, gets the distinct
/// "session expired" answer and consumes the record; after the window the
/// store has reclaimed it and the caller sees a plain rejection.
const EXPIRED_RECORD_GRACE_SECONDS: i64 = 86_400;

pub struct AuthService;

impl AuthService {
    /// Verifies credentials against the account matching both the email and
    /// the variant's role flag, then mints an access/refresh pair.
    pub async fn login(
        pool: &PgPool,
        codec: &TokenCodec,
        validator: &dyn RefreshTokenValidator,
        role: Role,
        body: &LoginRequest,
    ) -> Result<TokenPair, ApiError> {
        let email = require_field(&body.email, "email was not provided")?;
        let password = require_field(&body.password, "password was not provided")?;

        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, name, surname, is_admin, created_at, updated_at
             FROM accounts WHERE email = $1 AND is_admin = $2",
        )
        .bind(email)
        .bind(role.is_admin())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::unauthorized(LOGIN_FAILED))?;

        if !bcrypt::verify(password, &account.password_hash)? {
            tracing::warn!("login refused for {} account id={}", role, account.id);
            return Err(ApiError::unauthorized(LOGIN_FAILED));
        }

        let access_token = codec
            .sign_access(account.id, role)
            .map_err(ApiError::internal)?;
        let refresh_token = codec.sign_refresh(account.id).map_err(ApiError::internal)?;

        validator
            .on_issued(&refresh_token, account.id, role.is_admin())
            .await
            .map_err(ApiError::internal)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchanges a refresh token for a new access token. The minted role
    /// comes from the route variant, not from the refresh token, which
    /// deliberately carries no role claim.
    pub async fn refresh(
        codec: &TokenCodec,
        validator: &dyn RefreshTokenValidator,
        role: Role,
        body: &RefreshRequest,
    ) -> Result<String, ApiError> {
        let token = require_field(&body.refresh_token, "refreshToken was not provided")?;
        let account_id = validator.validate(token).await?;
        codec.sign_access(account_id, role).map_err(ApiError::internal)
    }

    /// Revokes both tokens. A still-valid token is denylisted for exactly its
    /// remaining lifetime; an already-expired one is skipped (it can no longer
    /// be used, and recording it would only grow the store). A token that
    /// fails verification for any other reason is tampered and is a hard
    /// error. Idempotent: a second logout re-inserts with a smaller TTL.
    pub async fn logout(
        store: &TokenStore,
        codec: &TokenCodec,
        validator: &dyn RefreshTokenValidator,
        body: &LogoutRequest,
    ) -> Result<(), ApiError> {
        let (Some(access_token), Some(refresh_token)) = (
            body.access_token.as_deref().filter(|t| !t.is_empty()),
            body.refresh_token.as_deref().filter(|t| !t.is_empty()),
        ) else {
            return Err(ApiError::validation(
                "refreshToken and/or accessToken was not provided",
            ));
        };

        match codec.verify_refresh(refresh_token) {
            Ok(claims) => {
                store
                    .set_ex(
                        &store::refresh_denylist_key(refresh_token),
                        &claims.sub,
                        remaining_ttl(claims.exp),
                    )
                    .await
                    .map_err(ApiError::internal)?;
            }
            Err(TokenError::Expired) => {}
            Err(err) => return Err(ApiError::internal(err)),
        }

        match codec.verify_access(access_token) {
            Ok(claims) => {
                store
                    .set_ex(
                        &store::access_denylist_key(access_token),
                        &claims.sub,
                        remaining_ttl(claims.exp),
                    )
                    .await
                    .map_err(ApiError::internal)?;
            }
            Err(TokenError::Expired) => {}
            Err(err) => return Err(ApiError::internal(err)),
        }

        validator
            .on_logout(refresh_token)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Creates an account under the variant's role flag. The same email may
    /// register once as a user and once as an admin.
    pub async fn register(
        pool: &PgPool,
        role: Role,
        body: &RegisterRequest,
    ) -> Result<AccountProfile, ApiError> {
        let password = validate_password_pair(&body.password, &body.repeated_password)?;
        let email = require_field(&body.email, "email was not provided")?;
        let name = require_field(&body.name, "name was not provided")?;
        let surname = require_field(&body.surname, "surname was not provided")?;
        validate_password_strength(password)?;
        validate_email_format(email)?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 AND is_admin = $2)",
        )
        .bind(email)
        .bind(role.is_admin())
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(ApiError::validation(format!(
                "{} with that email already exists",
                role.label()
            )));
        }

        let password_hash = bcrypt::hash(password, 12)?;

        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (email, password_hash, name, surname, is_admin)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, email, password_hash, name, surname, is_admin, created_at, updated_at",
        )
        .bind(email)
        .bind(&password_hash)
        .bind(name)
        .bind(surname)
        .bind(role.is_admin())
        .fetch_one(pool)
        .await?;

        tracing::info!("new {} account registered with email {}", role, email);

        Ok(account.into())
    }
}

/// Presence check matching the wire contract: an absent or empty field gets a
/// field-specific 422.
pub(crate) fn require_field<'a>(
    field: &'a Option<String>,
    message: &'static str,
) -> Result<&'a str, ApiError> {
    field
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}

/// Password + repeated-password presence and equality, shared by register and
/// the password-change flows. Returns the validated password.
pub(crate) fn validate_password_pair<'a>(
    password: &'a Option<String>,
    repeated: &Option<String>,
) -> Result<&'a str, ApiError> {
    let password = require_field(password, "Password was not provided")?;
    let repeated = require_field(repeated, "Repeated password was not provided")?;
    if password != repeated {
        return Err(ApiError::validation("Different passwords"));
    }
    Ok(password)
}

pub(crate) fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

pub(crate) fn validate_email_format(email: &str) -> Result<(), ApiError> {
    if !email.contains('@') || !email.contains('.') {
        return Err(ApiError::validation("wrong email format"));
    }
    Ok(())
}

/// The two historical refresh-token designs, behind one interface. One
/// implementation is chosen at startup and injected through the application
/// state; requests never branch between them.
#[async_trait]
pub trait RefreshTokenValidator: Send + Sync {
    /// Checks a presented refresh token and returns the account it was issued
    /// to. Every rejection carries its final status: expired tokens are
    /// `Unauthorized` with the distinct "session expired" reason (the client
    /// should log in again), everything else invalid is `Forbidden`.
    async fn validate(&self, token: &str) -> Result<Uuid, ApiError>;

    /// Invoked after login mints a refresh token.
    async fn on_issued(&self, token: &str, account_id: Uuid, is_admin: bool)
        -> anyhow::Result<()>;

    /// Invoked during logout, after the denylist inserts.
    async fn on_logout(&self, token: &str) -> anyhow::Result<()>;
}

/// Validity is the signature plus expiry alone; revocation works by
/// denylisting the raw value until natural expiry.
pub struct StatelessValidator {
    store: TokenStore,
    codec: TokenCodec,
}

impl StatelessValidator {
    pub fn new(store: TokenStore, codec: TokenCodec) -> Self {
        Self { store, codec }
    }
}

#[async_trait]
impl RefreshTokenValidator for StatelessValidator {
    async fn validate(&self, token: &str) -> Result<Uuid, ApiError> {
        let revoked = self
            .store
            .exists(&store::refresh_denylist_key(token))
            .await
            .map_err(ApiError::internal)?;
        if revoked {
            return Err(ApiError::unauthorized(
                "Unauthorized - blacklisted refreshToken",
            ));
        }

        let claims = match self.codec.verify_refresh(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Err(ApiError::unauthorized(SESSION_EXPIRED)),
            Err(_) => return Err(ApiError::forbidden("Forbidden")),
        };

        claims
            .sub
            .parse()
            .map_err(|_| ApiError::forbidden("Forbidden"))
    }

    async fn on_issued(&self, _token: &str, _account_id: Uuid, _is_admin: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_logout(&self, _token: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A server-side record gates every refresh: created at login, deleted on
/// logout or the first time the token is presented after expiry. A refresh
/// token without a live record is rejected even with a valid signature.
pub struct StatefulValidator {
    store: TokenStore,
    codec: TokenCodec,
    record_ttl_seconds: i64,
}

impl StatefulValidator {
    pub fn new(store: TokenStore, codec: TokenCodec) -> Self {
        let record_ttl_seconds = codec.refresh_ttl_seconds() + EXPIRED_RECORD_GRACE_SECONDS;
        Self {
            store,
            codec,
            record_ttl_seconds,
        }
    }
}

#[async_trait]
impl RefreshTokenValidator for StatefulValidator {
    async fn validate(&self, token: &str) -> Result<Uuid, ApiError> {
        let key = store::refresh_record_key(token);
        let record = self
            .store
            .get(&key)
            .await
            .map_err(ApiError::internal)?
            .ok_or_else(|| ApiError::forbidden("Forbidden"))?;

        let claims = match self.codec.verify_refresh(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                // Single-use invalidation: the expired token consumes its
                // record here, so replaying it can never succeed.
                self.store.del(&key).await.map_err(ApiError::internal)?;
                return Err(ApiError::unauthorized(SESSION_EXPIRED));
            }
            Err(_) => return Err(ApiError::forbidden("Forbidden")),
        };

        let record: RefreshRecord = serde_json::from_str(&record).map_err(ApiError::internal)?;

        let account_id: Uuid = claims
            .sub
            .parse()
            .map_err(|_| ApiError::forbidden("Forbidden"))?;
        debug_assert_eq!(account_id, record.account_id);
        Ok(account_id)
    }

    async fn on_issued(&self, token: &str, account_id: Uuid, is_admin: bool) -> anyhow::Result<()> {
        let record = serde_json::to_string(&RefreshRecord {
            account_id,
            is_admin,
        })?;
        self.store
            .set_ex(&store::refresh_record_key(token), &record, self.record_ttl_seconds)
            .await
    }

    async fn on_logout(&self, token: &str) -> anyhow::Result<()> {
        self.store.del(&store::refresh_record_key(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    use crate::models::auth::RefreshClaims;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-access", "test-refresh", 300, 3600)
    }

    fn expired_refresh_token(account_id: Uuid) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = RefreshClaims {
            sub: account_id.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret("test-refresh".as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stateless_validate_returns_the_account_id() {
        let validator = StatelessValidator::new(TokenStore::memory(), codec());
        let id = Uuid::new_v4();
        let token = codec().sign_refresh(id).unwrap();
        assert_eq!(validator.validate(&token).await.unwrap(), id);
    }

    #[tokio::test]
    async fn stateless_rejects_a_denylisted_token_before_verification() {
        let store = TokenStore::memory();
        let validator = StatelessValidator::new(store.clone(), codec());
        let token = codec().sign_refresh(Uuid::new_v4()).unwrap();

        store
            .set_ex(&store::refresh_denylist_key(&token), "revoked", 3600)
            .await
            .unwrap();

        let err = validator.validate(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn stateless_distinguishes_expired_from_invalid() {
        let validator = StatelessValidator::new(TokenStore::memory(), codec());

        let expired = expired_refresh_token(Uuid::new_v4());
        assert!(matches!(
            validator.validate(&expired).await.unwrap_err(),
            ApiError::Unauthorized(msg) if msg == SESSION_EXPIRED
        ));

        assert!(matches!(
            validator.validate("not-a-token").await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn stateful_rejects_a_token_without_a_record() {
        let validator = StatefulValidator::new(TokenStore::memory(), codec());
        let token = codec().sign_refresh(Uuid::new_v4()).unwrap();
        assert!(matches!(
            validator.validate(&token).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn stateful_validates_an_issued_token() {
        let validator = StatefulValidator::new(TokenStore::memory(), codec());
        let id = Uuid::new_v4();
        let token = codec().sign_refresh(id).unwrap();
        validator.on_issued(&token, id, false).await.unwrap();
        assert_eq!(validator.validate(&token).await.unwrap(), id);
    }

    #[tokio::test]
    async fn stateful_expired_token_is_single_use() {
        let validator = StatefulValidator::new(TokenStore::memory(), codec());
        let id = Uuid::new_v4();
        let token = expired_refresh_token(id);
        validator.on_issued(&token, id, true).await.unwrap();

        // First presentation finds the record, consumes it, reports expiry.
        assert!(matches!(
            validator.validate(&token).await.unwrap_err(),
            ApiError::Unauthorized(msg) if msg == SESSION_EXPIRED
        ));
        // Replay: record is gone, plain rejection.
        assert!(matches!(
            validator.validate(&token).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn stateful_logout_consumes_the_record() {
        let validator = StatefulValidator::new(TokenStore::memory(), codec());
        let id = Uuid::new_v4();
        let token = codec().sign_refresh(id).unwrap();
        validator.on_issued(&token, id, false).await.unwrap();
        validator.on_logout(&token).await.unwrap();
        assert!(matches!(
            validator.validate(&token).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn logout_denylists_live_tokens_for_their_remaining_lifetime() {
        let store = TokenStore::memory();
        let codec = codec();
        let validator = StatelessValidator::new(store.clone(), codec.clone());
        let id = Uuid::new_v4();
        let access = codec.sign_access(id, Role::User).unwrap();
        let refresh = codec.sign_refresh(id).unwrap();

        let body = LogoutRequest {
            access_token: Some(access.clone()),
            refresh_token: Some(refresh.clone()),
        };
        AuthService::logout(&store, &codec, &validator, &body)
            .await
            .unwrap();

        let access_ttl = store
            .ttl(&store::access_denylist_key(&access))
            .await
            .unwrap()
            .unwrap();
        let refresh_ttl = store
            .ttl(&store::refresh_denylist_key(&refresh))
            .await
            .unwrap()
            .unwrap();
        // Never longer than the token's own lifetime.
        assert!(access_ttl <= 300);
        assert!(refresh_ttl <= 3600);

        // Idempotent: a second logout still succeeds.
        AuthService::logout(&store, &codec, &validator, &body)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn logout_skips_expired_tokens_but_still_acknowledges() {
        let store = TokenStore::memory();
        let codec = codec();
        let validator = StatelessValidator::new(store.clone(), codec.clone());
        let id = Uuid::new_v4();
        let refresh = expired_refresh_token(id);

        let body = LogoutRequest {
            access_token: Some(codec.sign_access(id, Role::User).unwrap()),
            refresh_token: Some(refresh.clone()),
        };
        AuthService::logout(&store, &codec, &validator, &body)
            .await
            .unwrap();

        // Already unusable, so no entry was recorded for it.
        assert!(!store
            .exists(&store::refresh_denylist_key(&refresh))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn logout_treats_a_tampered_token_as_a_hard_error() {
        let store = TokenStore::memory();
        let codec = codec();
        let validator = StatelessValidator::new(store.clone(), codec.clone());
        let id = Uuid::new_v4();

        let body = LogoutRequest {
            access_token: Some(codec.sign_access(id, Role::User).unwrap()),
            refresh_token: Some("tampered.refresh.token".to_string()),
        };
        let err = AuthService::logout(&store, &codec, &validator, &body)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn register_validation_order_matches_the_wire_contract() {
        let empty = RegisterRequest {
            email: None,
            password: None,
            repeated_password: None,
            name: None,
            surname: None,
        };
        assert!(matches!(
            validate_password_pair(&empty.password, &empty.repeated_password).unwrap_err(),
            ApiError::Validation(msg) if msg == "Password was not provided"
        ));

        assert!(matches!(
            validate_password_pair(&Some("secret123".into()), &None).unwrap_err(),
            ApiError::Validation(msg) if msg == "Repeated password was not provided"
        ));

        assert!(matches!(
            validate_password_pair(&Some("secret123".into()), &Some("secret124".into()))
                .unwrap_err(),
            ApiError::Validation(msg) if msg == "Different passwords"
        ));

        assert!(matches!(
            validate_password_strength("short").unwrap_err(),
            ApiError::Validation(msg) if msg == "Password must be at least 8 characters"
        ));

        assert!(validate_email_format("a@b.com").is_ok());
        assert!(matches!(
            validate_email_format("missing-at.com").unwrap_err(),
            ApiError::Validation(msg) if msg == "wrong email format"
        ));
    }

    #[test]
    fn empty_strings_count_as_missing_fields() {
        assert!(require_field(&Some(String::new()), "email was not provided").is_err());
        assert_eq!(
            require_field(&Some("a@b.com".to_string()), "email was not provided").unwrap(),
            "a@b.com"
        );
    }
}
