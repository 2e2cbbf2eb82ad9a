//! Secret retrieval and workspace bootstrap.

use crate::asset::{AssetClient, ServicePrincipal, TableCatalog};
use crate::error::PlatformResult;
use crate::job::JobClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves named secrets from a vault / secret scope.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, scope: &str, key: &str) -> PlatformResult<String>;
}

/// Coordinates of the ML workspace plus the vault holding its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    pub subscription_id: String,
    pub resource_group: String,
    pub workspace_name: String,
    pub vault_name: String,
}

/// Everything a pipeline stage needs from a connected workspace.
#[derive(Clone)]
pub struct WorkspaceHandle {
    pub jobs: Arc<dyn JobClient>,
    pub assets: Arc<dyn AssetClient>,
    pub tables: Arc<dyn TableCatalog>,
    pub service_principal: ServicePrincipal,
    pub tracking_uri: Option<String>,
}

impl std::fmt::Debug for WorkspaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceHandle")
            .field("service_principal", &self.service_principal)
            .field("tracking_uri", &self.tracking_uri)
            .finish_non_exhaustive()
    }
}

/// Authenticates against a workspace and hands out its clients.
#[async_trait]
pub trait WorkspaceConnector: Send + Sync {
    async fn connect(&self, settings: &WorkspaceSettings) -> PlatformResult<WorkspaceHandle>;
}
