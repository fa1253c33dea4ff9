use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The four narrative-asset resources. They share one table shape and one
/// handler set; the kind picks the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Act,
    Scene,
    Character,
    Scenery,
}

impl AssetKind {
    pub fn table(self) -> &'static str {
        match self {
            AssetKind::Act => "acts",
            AssetKind::Scene => "scenes",
            AssetKind::Character => "characters",
            AssetKind::Scenery => "sceneries",
        }
    }

    /// Singular label for messages ("Act with that name already exists").
    pub fn singular(self) -> &'static str {
        match self {
            AssetKind::Act => "Act",
            AssetKind::Scene => "Scene",
            AssetKind::Character => "Character",
            AssetKind::Scenery => "Scenery",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertAssetRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
