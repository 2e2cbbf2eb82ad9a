//! Azure Machine Learning workspace client.
//!
//! Talks to the Azure Resource Manager REST API of a single workspace:
//! - jobs (list, get, create or update)
//! - datastores and data asset versions
//! - the workspace resource itself, for its MLflow tracking URI
//!
//! Data assets whose path is a local folder are first uploaded to the
//! workspace default blob datastore.

use crate::credential::{TokenCredential, DEFAULT_AUTHORITY_HOST, MANAGEMENT_SCOPE, STORAGE_SCOPE};
use crate::wire::{
    data_asset_from_resource, data_version_body, datastore_body, job_from_resource, job_to_resource,
    BlobDatastoreResource, Resource, ResourcePage, WorkspaceResource,
};
use async_trait::async_trait;
use drift_abstraction::{
    AssetClient, DataAsset, Datastore, JobClient, JobRecord, PlatformError, PlatformResult, WorkspaceSettings,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;
use walkdir::WalkDir;

pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
pub const API_VERSION: &str = "2024-04-01";
pub const DEFAULT_DATASTORE: &str = "workspaceblobstore";
const STORAGE_API_VERSION: &str = "2021-08-06";
const LOCAL_UPLOAD_PREFIX: &str = "LocalUpload";

/// Client for one Azure ML workspace.
pub struct AzureMlClient {
    credential: Arc<dyn TokenCredential>,
    subscription_id: String,
    resource_group: String,
    workspace_name: String,
    endpoint: String,
    blob_endpoint: Option<String>,
    authority_host: String,
    client: Client,
}

impl AzureMlClient {
    #[must_use]
    pub fn new(credential: Arc<dyn TokenCredential>, settings: &WorkspaceSettings) -> Self {
        Self {
            credential,
            subscription_id: settings.subscription_id.clone(),
            resource_group: settings.resource_group.clone(),
            workspace_name: settings.workspace_name.clone(),
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            blob_endpoint: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            client: Client::new(),
        }
    }

    /// Overrides the Resource Manager endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the blob service endpoint, normally
    /// `https://<account>.blob.core.windows.net`.
    #[must_use]
    pub fn with_blob_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.blob_endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self
    }

    /// Authority recorded in service-principal datastore credentials.
    #[must_use]
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    fn workspace_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.endpoint, self.subscription_id, self.resource_group, self.workspace_name
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.workspace_url(), path, API_VERSION)
    }

    /// `azureml://` URI of `path` inside `datastore`.
    #[must_use]
    pub fn datastore_uri(&self, datastore: &str, path: &str) -> String {
        format!(
            "azureml://subscriptions/{}/resourcegroups/{}/workspaces/{}/datastores/{}/paths/{}",
            self.subscription_id, self.resource_group, self.workspace_name, datastore, path
        )
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> PlatformResult<Response> {
        let token = self.credential.token(MANAGEMENT_SCOPE).await?;
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            error!(error = %e, what = %what, "Failed to send request to Azure ML");
            PlatformError::Request(format!("{}: {}", what, e))
        })?;
        check_status(response, what).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> PlatformResult<T> {
        let response = self.send(self.client.get(url), what).await?;
        parse_json(response, what).await
    }

    async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        what: &str,
    ) -> PlatformResult<T> {
        let response = self.send(self.client.put(url).json(body), what).await?;
        parse_json(response, what).await
    }

    async fn get_workspace(&self) -> PlatformResult<WorkspaceResource> {
        let url = format!("{}?api-version={}", self.workspace_url(), API_VERSION);
        self.get_json(&url, "workspace").await
    }

    pub async fn mlflow_tracking_uri(&self) -> PlatformResult<Option<String>> {
        Ok(self.get_workspace().await?.properties.ml_flow_tracking_uri)
    }

    /// Uploads every file under `local` to the default blob datastore and
    /// returns the `azureml://` URI of the uploaded folder.
    pub async fn upload_folder(&self, local: &Path, asset: &DataAsset) -> PlatformResult<String> {
        let datastore: BlobDatastoreResource =
            self.get_json(&self.url(&format!("datastores/{DEFAULT_DATASTORE}")), "default datastore").await?;
        let account = &datastore.properties.account_name;
        let container = &datastore.properties.container_name;
        let prefix = format!("{LOCAL_UPLOAD_PREFIX}/{}/{}", asset.name, asset.version);
        let blob_base = self
            .blob_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{account}.blob.core.windows.net"));
        let token = self.credential.token(STORAGE_SCOPE).await?;

        let files = local_files(local)?;
        for (file, relative) in &files {
            let url = format!("{blob_base}/{container}/{prefix}/{relative}");
            let bytes = tokio::fs::read(file).await?;

            let response = self
                .client
                .put(&url)
                .bearer_auth(&token)
                .header("x-ms-blob-type", "BlockBlob")
                .header("x-ms-version", STORAGE_API_VERSION)
                .body(bytes)
                .send()
                .await
                .map_err(|e| PlatformError::Request(format!("upload {}: {}", relative, e)))?;
            check_status(response, &format!("upload {relative}")).await?;
            debug!(blob = %format!("{container}/{prefix}/{relative}"), "Uploaded file");
        }

        info!(files = files.len(), local = %local.display(), asset = %asset.name, "Uploaded local data asset");
        Ok(self.datastore_uri(DEFAULT_DATASTORE, &format!("{prefix}/")))
    }
}

#[async_trait]
impl JobClient for AzureMlClient {
    async fn list_jobs(&self) -> PlatformResult<Vec<JobRecord>> {
        let mut jobs = Vec::new();
        let mut next = Some(self.url("jobs"));

        while let Some(url) = next {
            let page: ResourcePage<Resource> = self.get_json(&url, "jobs").await?;
            for resource in page.value {
                jobs.push(job_from_resource(resource)?);
            }
            next = page.next_link;
        }

        debug!(count = jobs.len(), "Listed jobs");
        Ok(jobs)
    }

    async fn get_job(&self, name: &str) -> PlatformResult<JobRecord> {
        let resource: Resource = self.get_json(&self.url(&format!("jobs/{name}")), &format!("job {name}")).await?;
        job_from_resource(resource)
    }

    async fn create_or_update_job(&self, job: &JobRecord) -> PlatformResult<JobRecord> {
        let name = job.name.clone().unwrap_or_else(generate_job_name);
        let mut resource = job_to_resource(job);
        resource.name = None;

        let created: Resource =
            self.put_json(&self.url(&format!("jobs/{name}")), &resource, &format!("job {name}")).await?;
        let mut record = job_from_resource(created)?;
        if record.name.is_none() {
            record.name = Some(name);
        }
        Ok(record)
    }
}

#[async_trait]
impl AssetClient for AzureMlClient {
    async fn create_or_update_datastore(&self, datastore: &Datastore) -> PlatformResult<Datastore> {
        let body = datastore_body(datastore, &self.authority_host);
        let what = format!("datastore {}", datastore.name);
        let _: Resource = self.put_json(&self.url(&format!("datastores/{}", datastore.name)), &body, &what).await?;
        Ok(datastore.clone())
    }

    async fn create_or_update_data(&self, asset: &DataAsset) -> PlatformResult<DataAsset> {
        let data_uri = if is_local_path(&asset.path) {
            self.upload_folder(Path::new(&asset.path), asset).await?
        } else {
            asset.path.clone()
        };

        let url = self.url(&format!("data/{}/versions/{}", asset.name, asset.version));
        let what = format!("data {}:{}", asset.name, asset.version);
        let resource: Resource = self.put_json(&url, &data_version_body(asset, &data_uri), &what).await?;
        Ok(data_asset_from_resource(asset, &resource))
    }
}

fn generate_job_name() -> String {
    format!("drift_{}", Uuid::new_v4().simple())
}

fn is_local_path(path: &str) -> bool {
    !path.contains("://") && !path.starts_with("azureml:")
}

/// Files under `root` (or `root` itself) with their `/`-separated blob paths.
fn local_files(root: &Path) -> PlatformResult<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| PlatformError::Io(e.to_string()))?;
        if entry.file_type().is_file() {
            let relative = relative_blob_path(root, entry.path())?;
            files.push((entry.into_path(), relative));
        }
    }
    Ok(files)
}

fn relative_blob_path(root: &Path, file: &Path) -> PlatformResult<String> {
    let relative = if root.is_file() {
        file.file_name().map(Path::new).unwrap_or(file)
    } else {
        file.strip_prefix(root).map_err(|e| PlatformError::Io(e.to_string()))?
    };
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

async fn check_status(response: Response, what: &str) -> PlatformResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    error!(status = %status, what = %what, error = %body, "Azure ML returned error status");
    if status == StatusCode::NOT_FOUND {
        return Err(PlatformError::NotFound(format!("{}: {}", what, body)));
    }
    Err(PlatformError::Response { status: status.as_u16(), message: body })
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> PlatformResult<T> {
    response.json::<T>().await.map_err(|e| {
        error!(error = %e, what = %what, "Failed to parse Azure ML response");
        PlatformError::Serialization(format!("{}: {}", what, e))
    })
}
