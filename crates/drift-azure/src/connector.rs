//! Workspace bootstrap from vault secrets.

use crate::client::{AzureMlClient, DEFAULT_ARM_ENDPOINT};
use crate::credential::{ClientSecretCredential, DEFAULT_AUTHORITY_HOST};
use crate::mltable::MlTableCatalog;
use async_trait::async_trait;
use drift_abstraction::{
    PlatformResult, SecretProvider, ServicePrincipal, WorkspaceConnector, WorkspaceHandle, WorkspaceSettings,
};
use std::sync::Arc;
use tracing::info;

pub const APPLICATION_ID_SECRET: &str = "ApplicationID";
pub const APPLICATION_PASSWORD_SECRET: &str = "ApplicationPassword";
pub const TENANT_ID_SECRET: &str = "TenantID";

/// Connects to an Azure ML workspace with the service principal stored in
/// the vault named by the settings.
pub struct AzureWorkspaceConnector {
    secrets: Arc<dyn SecretProvider>,
    tenant_id: Option<String>,
    endpoint: String,
    authority_host: String,
}

impl AzureWorkspaceConnector {
    #[must_use]
    pub fn new(secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            secrets,
            tenant_id: None,
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    /// Uses `tenant_id` instead of the vault's `TenantID` secret.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    pub async fn service_principal(&self, vault_name: &str) -> PlatformResult<ServicePrincipal> {
        let client_id = self.secrets.get_secret(vault_name, APPLICATION_ID_SECRET).await?;
        let client_secret = self.secrets.get_secret(vault_name, APPLICATION_PASSWORD_SECRET).await?;
        let tenant_id = match &self.tenant_id {
            Some(tenant_id) => tenant_id.clone(),
            None => self.secrets.get_secret(vault_name, TENANT_ID_SECRET).await?,
        };
        Ok(ServicePrincipal { tenant_id, client_id, client_secret })
    }
}

#[async_trait]
impl WorkspaceConnector for AzureWorkspaceConnector {
    async fn connect(&self, settings: &WorkspaceSettings) -> PlatformResult<WorkspaceHandle> {
        info!(vault = %settings.vault_name, "Initializing credential...");
        let service_principal = self.service_principal(&settings.vault_name).await?;

        let credential = ClientSecretCredential::new(
            service_principal.tenant_id.clone(),
            service_principal.client_id.clone(),
            service_principal.client_secret.clone(),
        )
        .with_authority_host(self.authority_host.clone());

        let client = Arc::new(
            AzureMlClient::new(Arc::new(credential), settings)
                .with_endpoint(self.endpoint.clone())
                .with_authority_host(self.authority_host.clone()),
        );

        let tracking_uri = client.mlflow_tracking_uri().await?;
        info!(
            workspace = %settings.workspace_name,
            tracking_uri = tracking_uri.as_deref().unwrap_or("<none>"),
            "Connected to ML workspace"
        );

        Ok(WorkspaceHandle {
            jobs: client.clone(),
            assets: client,
            tables: Arc::new(MlTableCatalog),
            service_principal,
            tracking_uri,
        })
    }
}
