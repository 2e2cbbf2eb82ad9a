//! Registers the datastore and the two data assets backing a training set.

use crate::config::RegistrationParameters;
use crate::error::TrainingResult;
use drift_abstraction::{AssetClient, AssetType, DataAsset, Datastore, ServicePrincipal, TableCatalog};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const DATASTORE_DESCRIPTION: &str = "Datastore pointing to an Azure Data Lake Storage Gen2.";
const MLTABLE_DESCRIPTION: &str = "data asset using mltable.";
const URI_DESCRIPTION: &str = "Uri Data Asset";

pub struct DataAssetRegistrator {
    assets: Arc<dyn AssetClient>,
    tables: Arc<dyn TableCatalog>,
    service_principal: ServicePrincipal,
    parameters: RegistrationParameters,
    version: String,
    delta_timestamp: String,
    staging_dir: PathBuf,
    mltable_name: String,
    uri_asset_name: String,
}

impl DataAssetRegistrator {
    #[must_use]
    pub fn new(
        assets: Arc<dyn AssetClient>,
        tables: Arc<dyn TableCatalog>,
        service_principal: ServicePrincipal,
        parameters: RegistrationParameters,
        version: impl Into<String>,
        delta_timestamp: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        let path_asset_name = path_asset_name(&parameters.container_path);
        let mltable_name = format!("{}-{}-mltable", parameters.container_name, path_asset_name);
        let uri_asset_name = format!("{}-{}-uri", parameters.container_name, path_asset_name);

        Self {
            assets,
            tables,
            service_principal,
            parameters,
            version: version.into(),
            delta_timestamp: delta_timestamp.into(),
            staging_dir: staging_dir.into(),
            mltable_name,
            uri_asset_name,
        }
    }

    #[must_use]
    pub fn mltable_name(&self) -> &str {
        &self.mltable_name
    }

    #[must_use]
    pub fn uri_asset_name(&self) -> &str {
        &self.uri_asset_name
    }

    #[must_use]
    pub fn datastore_name(&self) -> String {
        self.parameters.container_name.replace('-', "_")
    }

    /// `azureml://` URI of the container path inside the datastore.
    #[must_use]
    pub fn datastore_path(&self) -> String {
        let p = &self.parameters;
        format!(
            "azureml://subscriptions/{}/resourcegroups/{}/workspaces/{}/datastores/{}/paths/{}",
            p.subscription_id,
            p.resource_group,
            p.ml_workspace_name,
            self.datastore_name(),
            p.container_path
        )
    }

    pub async fn register_dataset(&self) -> TrainingResult<()> {
        let datastore = Datastore {
            name: self.datastore_name(),
            description: DATASTORE_DESCRIPTION.to_string(),
            account_name: self.parameters.storage_account_name.clone(),
            filesystem: self.parameters.container_name.clone(),
            credentials: self.service_principal.clone(),
        };
        let created = self.assets.create_or_update_datastore(&datastore).await?;
        debug!(datastore = ?created, "Datastore created or updated");

        let datastore_path = self.datastore_path();
        info!(path = %datastore_path, version = %self.version, "Registering data assets");

        self.register_mltable(&datastore_path).await?;
        self.register_uri_data_asset(&datastore_path).await?;
        Ok(())
    }

    pub async fn register_mltable(&self, datastore_path: &str) -> TrainingResult<DataAsset> {
        let dest = self.staging_dir.join(&self.mltable_name);
        let folder = self.tables.materialize_delta_table(datastore_path, &self.delta_timestamp, &dest)?;
        debug!(mltable = %self.mltable_name, folder = %folder.display(), "MLTable saved");

        let asset = DataAsset {
            name: self.mltable_name.clone(),
            version: self.version.clone(),
            path: folder.to_string_lossy().into_owned(),
            asset_type: AssetType::Mltable,
            description: MLTABLE_DESCRIPTION.to_string(),
        };
        let created = self.assets.create_or_update_data(&asset).await?;
        debug!(asset = ?created, "MLTable data asset created or updated");
        Ok(created)
    }

    pub async fn register_uri_data_asset(&self, datastore_path: &str) -> TrainingResult<DataAsset> {
        let asset = DataAsset {
            name: self.uri_asset_name.clone(),
            version: self.version.clone(),
            path: datastore_path.to_string(),
            asset_type: AssetType::UriFolder,
            description: URI_DESCRIPTION.to_string(),
        };
        let created = self.assets.create_or_update_data(&asset).await?;
        debug!(asset = ?created, "URI data asset created or updated");
        Ok(created)
    }
}

/// Container path turned into an asset name fragment: `/` becomes `-` and
/// outer dashes are dropped.
#[must_use]
pub fn path_asset_name(container_path: &str) -> String {
    container_path.replace('/', "-").trim_matches('-').to_string()
}
