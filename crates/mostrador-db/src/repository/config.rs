//! # Configuration Repositories
//!
//! Key-value settings (`config_entries`) and the single company profile row.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use mostrador_core::{CompanyProfile, ConfigEntry};

// =============================================================================
// Key-value settings
// =============================================================================

#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM config_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Inserts or replaces a setting.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<ConfigEntry> {
        let entry = ConfigEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO config_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        info!(key = %key, "Config entry set");
        Ok(entry)
    }

    pub async fn all(&self) -> DbResult<Vec<ConfigEntry>> {
        let entries = sqlx::query_as::<_, ConfigEntry>(
            "SELECT key, value, updated_at FROM config_entries ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = entries.len(), "Loaded config entries");
        Ok(entries)
    }

    /// Removes a setting. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM config_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Company profile
// =============================================================================

/// Editable fields of the company profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfileInput {
    pub name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// The profile, or `None` before it has been saved once.
    pub async fn get(&self) -> DbResult<Option<CompanyProfile>> {
        let profile = sqlx::query_as::<_, CompanyProfile>(
            r#"
            SELECT name, tax_id, address, phone, email, logo_url, updated_at
            FROM company_profile
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn upsert(&self, input: &CompanyProfileInput) -> DbResult<CompanyProfile> {
        let profile = CompanyProfile {
            name: input.name.clone(),
            tax_id: input.tax_id.clone(),
            address: input.address.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            logo_url: input.logo_url.clone(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO company_profile (id, name, tax_id, address, phone, email, logo_url, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                tax_id = excluded.tax_id,
                address = excluded.address,
                phone = excluded.phone,
                email = excluded.email,
                logo_url = excluded.logo_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.tax_id)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.email)
        .bind(&profile.logo_url)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        info!(name = %profile.name, "Company profile saved");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::db;

    use super::*;

    #[tokio::test]
    async fn test_config_set_overwrites() {
        let db = db().await;
        assert_eq!(db.config().get("tax_rate").await.unwrap(), None);

        db.config().set("tax_rate", "16").await.unwrap();
        db.config().set("tax_rate", "8").await.unwrap();
        db.config().set("store_name", "Abarrotes Don Memo").await.unwrap();

        assert_eq!(db.config().get("tax_rate").await.unwrap().as_deref(), Some("8"));

        let keys: Vec<String> = db.config().all().await.unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["store_name", "tax_rate"]);

        assert!(db.config().delete("tax_rate").await.unwrap());
        assert!(!db.config().delete("tax_rate").await.unwrap());
    }

    #[tokio::test]
    async fn test_company_profile_single_row() {
        let db = db().await;
        assert!(db.company().get().await.unwrap().is_none());

        let mut input = CompanyProfileInput {
            name: "Abarrotes Don Memo".to_string(),
            tax_id: Some("MEMO900101AB1".to_string()),
            ..Default::default()
        };
        db.company().upsert(&input).await.unwrap();

        input.logo_url = Some("https://cdn.example.com/logo.png".to_string());
        db.company().upsert(&input).await.unwrap();

        let profile = db.company().get().await.unwrap().unwrap();
        assert_eq!(profile.tax_id.as_deref(), Some("MEMO900101AB1"));
        assert_eq!(profile.logo_url.as_deref(), Some("https://cdn.example.com/logo.png"));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM company_profile")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
