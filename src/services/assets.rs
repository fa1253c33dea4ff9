use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::asset::{Asset, AssetKind, UpsertAssetRequest};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 20;

/// One handler shape serves all four narrative-asset tables; the table name
/// comes from `AssetKind`, never from request input.
pub struct AssetService;

impl AssetService {
    pub async fn list(
        pool: &PgPool,
        kind: AssetKind,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<(Vec<Asset>, i64), ApiError> {
        let page = page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);

        let assets = sqlx::query_as::<_, Asset>(&format!(
            "SELECT id, name, description, created_at, updated_at FROM {}
             ORDER BY created_at LIMIT $1 OFFSET $2",
            kind.table()
        ))
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(pool)
        .await?;

        let total_items: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
                .fetch_one(pool)
                .await?;

        Ok((assets, total_items))
    }

    pub async fn get(pool: &PgPool, kind: AssetKind, id: Uuid) -> Result<Asset, ApiError> {
        sqlx::query_as::<_, Asset>(&format!(
            "SELECT id, name, description, created_at, updated_at FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(kind))
    }

    pub async fn create(
        pool: &PgPool,
        kind: AssetKind,
        body: &UpsertAssetRequest,
    ) -> Result<Asset, ApiError> {
        let name = validate_name(&body.name)?;

        let taken: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE name = $1)",
            kind.table()
        ))
        .bind(name)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(ApiError::validation(format!(
                "{} with that name already exists",
                kind.singular()
            )));
        }

        let asset = sqlx::query_as::<_, Asset>(&format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2)
             RETURNING id, name, description, created_at, updated_at",
            kind.table()
        ))
        .bind(name)
        .bind(&body.description)
        .fetch_one(pool)
        .await?;

        Ok(asset)
    }

    pub async fn update(
        pool: &PgPool,
        kind: AssetKind,
        id: Uuid,
        body: &UpsertAssetRequest,
    ) -> Result<Asset, ApiError> {
        let name = validate_name(&body.name)?;

        sqlx::query_as::<_, Asset>(&format!(
            "UPDATE {} SET name = $1, description = $2, updated_at = NOW() WHERE id = $3
             RETURNING id, name, description, created_at, updated_at",
            kind.table()
        ))
        .bind(name)
        .bind(&body.description)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(kind))
    }

    pub async fn delete(pool: &PgPool, kind: AssetKind, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(kind));
        }
        Ok(())
    }
}

fn not_found(kind: AssetKind) -> ApiError {
    ApiError::not_found(format!("Could not find any {} with that id", kind.singular()))
}

fn validate_name(name: &Option<String>) -> Result<&str, ApiError> {
    let name = name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("name was not provided"))?;
    if name.len() > 200 {
        return Err(ApiError::validation(
            "name must be at most 200 characters",
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation_bounds() {
        assert!(validate_name(&None).is_err());
        assert!(validate_name(&Some(String::new())).is_err());
        assert!(validate_name(&Some("The Cellar Door".into())).is_ok());
        assert!(validate_name(&Some("x".repeat(200))).is_ok());
        assert!(validate_name(&Some("x".repeat(201))).is_err());
    }
}
