//! # Client and Supplier Repositories
//!
//! Parties the business sells to and buys from. Both are soft-deleted so
//! their past sales and purchases stay readable.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use mostrador_core::{Client, Supplier};

const CLIENT_COLUMNS: &str =
    "id, name, tax_id, phone, email, address, is_active, created_at, updated_at";

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_name, tax_id, phone, email, address, is_active, created_at, updated_at";

// =============================================================================
// Clients
// =============================================================================

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Active clients whose name, tax id or email contains `query`.
    /// An empty query lists all active clients.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Client>> {
        let query = query.trim();
        debug!(query = %query, "Searching clients");

        let sql = format!(
            r#"
            SELECT {}
            FROM clients
            WHERE is_active = 1
              AND (?1 = '' OR name LIKE ?2 ESCAPE '\' OR tax_id LIKE ?2 ESCAPE '\'
                   OR email LIKE ?2 ESCAPE '\')
            ORDER BY name
            LIMIT ?3
            "#,
            CLIENT_COLUMNS
        );

        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLUMNS);

        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    pub async fn insert(&self, client: &Client) -> DbResult<Client> {
        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, tax_id, phone, email, address, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .bind(client.is_active)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %client.id, name = %client.name, "Client created");
        Ok(client.clone())
    }

    pub async fn update(&self, client: &Client) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?2, tax_id = ?3, phone = ?4, email = ?5, address = ?6,
                is_active = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .bind(client.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", &client.id));
        }

        Ok(())
    }

    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE clients SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }
}

// =============================================================================
// Suppliers
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Active suppliers whose name, contact or tax id contains `query`.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Supplier>> {
        let query = query.trim();
        debug!(query = %query, "Searching suppliers");

        let sql = format!(
            r#"
            SELECT {}
            FROM suppliers
            WHERE is_active = 1
              AND (?1 = '' OR name LIKE ?2 ESCAPE '\' OR contact_name LIKE ?2 ESCAPE '\'
                   OR tax_id LIKE ?2 ESCAPE '\')
            ORDER BY name
            LIMIT ?3
            "#,
            SUPPLIER_COLUMNS
        );

        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(suppliers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {} FROM suppliers WHERE id = ?1", SUPPLIER_COLUMNS);

        let supplier = sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(supplier)
    }

    pub async fn insert(&self, supplier: &Supplier) -> DbResult<Supplier> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_name, tax_id, phone, email, address,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.tax_id)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier.clone())
    }

    pub async fn update(&self, supplier: &Supplier) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2, contact_name = ?3, tax_id = ?4, phone = ?5, email = ?6,
                address = ?7, is_active = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.tax_id)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", &supplier.id));
        }

        Ok(())
    }

    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE suppliers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{client, db, supplier};

    #[tokio::test]
    async fn test_client_crud() {
        let db = db().await;
        let mut c = client("Abarrotes Lupita");
        c.tax_id = Some("LUPA800101XX1".to_string());
        db.clients().insert(&c).await.unwrap();

        assert_eq!(db.clients().search("lupita", 10).await.unwrap().len(), 1);
        assert_eq!(db.clients().search("LUPA8", 10).await.unwrap().len(), 1);
        assert_eq!(db.clients().search("", 10).await.unwrap().len(), 1);

        c.phone = Some("555-0101".to_string());
        db.clients().update(&c).await.unwrap();
        let stored = db.clients().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("555-0101"));

        db.clients().soft_delete(&c.id).await.unwrap();
        assert!(db.clients().search("", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_supplier_crud() {
        let db = db().await;
        let mut s = supplier("Distribuidora del Norte");
        s.contact_name = Some("Ramiro".to_string());
        db.suppliers().insert(&s).await.unwrap();

        assert_eq!(db.suppliers().search("ramiro", 10).await.unwrap().len(), 1);

        s.name = "Distribuidora Norte".to_string();
        db.suppliers().update(&s).await.unwrap();
        let stored = db.suppliers().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Distribuidora Norte");

        db.suppliers().soft_delete(&s.id).await.unwrap();
        assert!(matches!(
            db.suppliers().update(&supplier("ghost")).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
