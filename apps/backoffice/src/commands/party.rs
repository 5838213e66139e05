//! # Client and Supplier Commands

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use mostrador_core::validation::{validate_email, validate_party_name, validate_search_query};
use mostrador_core::{Client, Supplier};

use super::{non_blank, page_size};
use crate::error::ApiError;
use crate::state::AppState;

/// Form fields shared by clients and suppliers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInput {
    pub name: String,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Suppliers only.
    pub contact_name: Option<String>,
}

impl PartyInput {
    /// Validates and trims the form; blank optional fields become `None`.
    fn normalized(self) -> Result<PartyInput, ApiError> {
        validate_party_name(&self.name)?;

        let email = non_blank(self.email);
        if let Some(email) = &email {
            validate_email(email)?;
        }

        Ok(PartyInput {
            name: self.name.trim().to_string(),
            tax_id: non_blank(self.tax_id).map(|t| t.to_uppercase()),
            phone: non_blank(self.phone),
            email,
            address: non_blank(self.address),
            contact_name: non_blank(self.contact_name),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDto {
    pub id: String,
    pub name: String,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

impl From<Client> for ClientDto {
    fn from(c: Client) -> Self {
        ClientDto {
            id: c.id,
            name: c.name,
            tax_id: c.tax_id,
            phone: c.phone,
            email: c.email,
            address: c.address,
            is_active: c.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierDto {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

impl From<Supplier> for SupplierDto {
    fn from(s: Supplier) -> Self {
        SupplierDto {
            id: s.id,
            name: s.name,
            contact_name: s.contact_name,
            tax_id: s.tax_id,
            phone: s.phone,
            email: s.email,
            address: s.address,
            is_active: s.is_active,
        }
    }
}

// =============================================================================
// Clients
// =============================================================================

pub async fn search_clients(
    state: &AppState,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<ClientDto>, ApiError> {
    let query = validate_search_query(query)?;
    debug!(query = %query, "search_clients command");

    let clients = state
        .db()
        .clients()
        .search(&query, page_size(limit, 20))
        .await?;
    Ok(clients.into_iter().map(ClientDto::from).collect())
}

pub async fn get_client(state: &AppState, id: &str) -> Result<ClientDto, ApiError> {
    let client = state
        .db()
        .clients()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", id))?;
    Ok(ClientDto::from(client))
}

pub async fn create_client(state: &AppState, input: PartyInput) -> Result<ClientDto, ApiError> {
    debug!(name = %input.name, "create_client command");
    let input = input.normalized()?;
    let now = Utc::now();

    let client = state
        .db()
        .clients()
        .insert(&Client {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            tax_id: input.tax_id,
            phone: input.phone,
            email: input.email,
            address: input.address,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(ClientDto::from(client))
}

pub async fn update_client(
    state: &AppState,
    id: &str,
    input: PartyInput,
) -> Result<ClientDto, ApiError> {
    debug!(id = %id, "update_client command");
    let input = input.normalized()?;

    let clients = state.db().clients();
    let mut client = clients
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", id))?;

    client.name = input.name;
    client.tax_id = input.tax_id;
    client.phone = input.phone;
    client.email = input.email;
    client.address = input.address;
    clients.update(&client).await?;

    Ok(ClientDto::from(client))
}

pub async fn delete_client(state: &AppState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_client command");
    state.db().clients().soft_delete(id).await?;
    Ok(())
}

// =============================================================================
// Suppliers
// =============================================================================

pub async fn search_suppliers(
    state: &AppState,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<SupplierDto>, ApiError> {
    let query = validate_search_query(query)?;
    debug!(query = %query, "search_suppliers command");

    let suppliers = state
        .db()
        .suppliers()
        .search(&query, page_size(limit, 20))
        .await?;
    Ok(suppliers.into_iter().map(SupplierDto::from).collect())
}

pub async fn get_supplier(state: &AppState, id: &str) -> Result<SupplierDto, ApiError> {
    let supplier = state
        .db()
        .suppliers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", id))?;
    Ok(SupplierDto::from(supplier))
}

pub async fn create_supplier(state: &AppState, input: PartyInput) -> Result<SupplierDto, ApiError> {
    debug!(name = %input.name, "create_supplier command");
    let input = input.normalized()?;
    let now = Utc::now();

    let supplier = state
        .db()
        .suppliers()
        .insert(&Supplier {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            contact_name: input.contact_name,
            tax_id: input.tax_id,
            phone: input.phone,
            email: input.email,
            address: input.address,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(SupplierDto::from(supplier))
}

pub async fn update_supplier(
    state: &AppState,
    id: &str,
    input: PartyInput,
) -> Result<SupplierDto, ApiError> {
    debug!(id = %id, "update_supplier command");
    let input = input.normalized()?;

    let suppliers = state.db().suppliers();
    let mut supplier = suppliers
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", id))?;

    supplier.name = input.name;
    supplier.contact_name = input.contact_name;
    supplier.tax_id = input.tax_id;
    supplier.phone = input.phone;
    supplier.email = input.email;
    supplier.address = input.address;
    suppliers.update(&supplier).await?;

    Ok(SupplierDto::from(supplier))
}

pub async fn delete_supplier(state: &AppState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_supplier command");
    state.db().suppliers().soft_delete(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::app;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_client_form_is_normalized() {
        let state = app().await;
        let client = create_client(
            &state,
            PartyInput {
                name: "  Fonda Doña Rosy ".to_string(),
                tax_id: Some("rosy800101ab1".to_string()),
                email: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(client.name, "Fonda Doña Rosy");
        assert_eq!(client.tax_id.as_deref(), Some("ROSY800101AB1"));
        assert_eq!(client.email, None);

        let found = search_clients(&state, "doña", None).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_email_rejected() {
        let state = app().await;
        let err = create_supplier(
            &state,
            PartyInput {
                name: "Lácteos La Vaquita".to_string(),
                email: Some("ventas@".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_supplier_update_and_delete() {
        let state = app().await;
        let supplier = create_supplier(
            &state,
            PartyInput {
                name: "Distribuidora del Bajío".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let updated = update_supplier(
            &state,
            &supplier.id,
            PartyInput {
                name: "Distribuidora del Bajío".to_string(),
                contact_name: Some("Ramiro Ortega".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.contact_name.as_deref(), Some("Ramiro Ortega"));

        delete_supplier(&state, &supplier.id).await.unwrap();
        assert!(search_suppliers(&state, "", None).await.unwrap().is_empty());

        let err = get_client(&state, &supplier.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
