use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::user::{
    Account, AccountProfile, RemindPasswordRequest, Role, UpdatePasswordRequest,
    UpdateProfileRequest,
};
use crate::services::auth::{
    require_field, validate_email_format, validate_password_pair, validate_password_strength,
};
use crate::services::email::EmailService;
use crate::services::store::{self, TokenStore};

const PROFILE_NOT_FOUND: &str = "Account profile not found";

pub struct UserService;

impl UserService {
    pub async fn get_profile(pool: &PgPool, account_id: Uuid) -> Result<AccountProfile, ApiError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, name, surname, is_admin, created_at, updated_at
             FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;
        Ok(account.into())
    }

    pub async fn update_profile(
        pool: &PgPool,
        account_id: Uuid,
        role: Role,
        body: &UpdateProfileRequest,
    ) -> Result<(), ApiError> {
        let (Some(name), Some(surname), Some(email)) = (
            body.name.as_deref().filter(|v| !v.is_empty()),
            body.surname.as_deref().filter(|v| !v.is_empty()),
            body.email.as_deref().filter(|v| !v.is_empty()),
        ) else {
            return Err(ApiError::validation(
                "Missing required data (name or surname or email)",
            ));
        };
        validate_email_format(email)?;

        // The new email must stay unique within the variant, excluding the
        // caller's own row.
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 AND is_admin = $2 AND id <> $3)",
        )
        .bind(email)
        .bind(role.is_admin())
        .bind(account_id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(ApiError::validation(format!(
                "{} with that email already exists",
                role.label()
            )));
        }

        let result = sqlx::query(
            "UPDATE accounts SET name = $1, surname = $2, email = $3, updated_at = NOW()
             WHERE id = $4",
        )
        .bind(name)
        .bind(surname)
        .bind(email)
        .bind(account_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(PROFILE_NOT_FOUND));
        }
        Ok(())
    }

    /// Re-hashes and stores a new password for the caller. Possession of a
    /// live access token is the identity proof; there is no current-password
    /// challenge.
    pub async fn update_password(
        pool: &PgPool,
        account_id: Uuid,
        body: &UpdatePasswordRequest,
    ) -> Result<(), ApiError> {
        let password = validate_password_pair(&body.password, &body.repeated_password)?;
        validate_password_strength(password)?;

        let password_hash = bcrypt::hash(password, 12)?;
        let result =
            sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2")
                .bind(&password_hash)
                .bind(account_id)
                .execute(pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(PROFILE_NOT_FOUND));
        }
        Ok(())
    }

    /// Stores a reset-link record per matching account and emails the links.
    /// The same email may exist once per variant, and the reset flow is not
    /// variant-scoped, so every account holding the address gets its own
    /// link; each is keyed by account id and self-evicts after the
    /// configured TTL.
    pub async fn remind_password(
        pool: &PgPool,
        token_store: &TokenStore,
        email_service: Option<&EmailService>,
        frontend_url: &str,
        reset_ttl_seconds: i64,
        body: &RemindPasswordRequest,
    ) -> Result<(), ApiError> {
        let email = require_field(&body.email, "email was not provided")?;

        let account_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE email = $1 ORDER BY is_admin")
                .bind(email)
                .fetch_all(pool)
                .await?;
        if account_ids.is_empty() {
            return Err(ApiError::not_found("Account with that email does not exist"));
        }

        Self::issue_reset_links(
            token_store,
            email_service,
            frontend_url,
            reset_ttl_seconds,
            email,
            &account_ids,
        )
        .await
    }

    /// One record and one mail per account id. Records are written first so
    /// a transport failure never loses an already-issued link.
    pub(crate) async fn issue_reset_links(
        token_store: &TokenStore,
        email_service: Option<&EmailService>,
        frontend_url: &str,
        reset_ttl_seconds: i64,
        email: &str,
        account_ids: &[Uuid],
    ) -> Result<(), ApiError> {
        for account_id in account_ids {
            token_store
                .set_ex(
                    &store::reset_link_key(*account_id),
                    &account_id.to_string(),
                    reset_ttl_seconds,
                )
                .await
                .map_err(ApiError::internal)?;
        }

        let email_service = email_service
            .ok_or_else(|| ApiError::internal(anyhow::anyhow!("SMTP is not configured")))?;
        for account_id in account_ids {
            let reset_url = format!("{frontend_url}/reset-password/{account_id}");
            email_service
                .send_password_reset(email, &reset_url, reset_ttl_seconds / 60)
                .await
                .map_err(ApiError::internal)?;
        }

        Ok(())
    }

    /// Completes the reset flow started by `remind_password`. Only works
    /// while the reset-link record is alive, and consumes it on success.
    pub async fn renew_password(
        pool: &PgPool,
        token_store: &TokenStore,
        account_id: Uuid,
        body: &UpdatePasswordRequest,
    ) -> Result<(), ApiError> {
        let password = validate_password_pair(&body.password, &body.repeated_password)?;
        validate_password_strength(password)?;

        let link_key = store::reset_link_key(account_id);
        let link_alive = token_store
            .exists(&link_key)
            .await
            .map_err(ApiError::internal)?;
        if !link_alive {
            return Err(ApiError::unauthorized(
                "Changing password link expired or user didn't request to change password",
            ));
        }

        let password_hash = bcrypt::hash(password, 12)?;
        let result =
            sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2")
                .bind(&password_hash)
                .bind(account_id)
                .execute(pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(PROFILE_NOT_FOUND));
        }

        token_store.del(&link_key).await.map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn delete_account(pool: &PgPool, account_id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(PROFILE_NOT_FOUND));
        }
        tracing::info!("account {} deleted", account_id);
        Ok(())
    }
}
