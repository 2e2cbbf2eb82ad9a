//! Datastores, data assets and the table catalog used by dataset registration.

use crate::error::PlatformResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Service principal credentials, shared with datastores so the platform can
/// read the underlying storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ServicePrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePrincipal")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Datastore pointing at an Azure Data Lake Storage Gen2 filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastore {
    pub name: String,
    pub description: String,
    pub account_name: String,
    pub filesystem: String,
    pub credentials: ServicePrincipal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Mltable,
    UriFolder,
}

impl AssetType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mltable => "mltable",
            Self::UriFolder => "uri_folder",
        }
    }
}

/// A versioned data asset. `path` is either a platform URI or a local folder
/// that the client uploads before registering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAsset {
    pub name: String,
    pub version: String,
    pub path: String,
    pub asset_type: AssetType,
    pub description: String,
}

#[async_trait]
pub trait AssetClient: Send + Sync {
    async fn create_or_update_datastore(&self, datastore: &Datastore) -> PlatformResult<Datastore>;

    async fn create_or_update_data(&self, asset: &DataAsset) -> PlatformResult<DataAsset>;
}

/// Materializes point-in-time table references.
pub trait TableCatalog: Send + Sync {
    /// Writes a table definition reading the Delta Lake table at `source_uri`
    /// as of `timestamp_as_of` into the folder `dest`, returning that folder.
    fn materialize_delta_table(
        &self,
        source_uri: &str,
        timestamp_as_of: &str,
        dest: &Path,
    ) -> PlatformResult<PathBuf>;
}
