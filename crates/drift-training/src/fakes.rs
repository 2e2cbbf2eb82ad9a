//! In-memory collaborators for unit tests.

use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use drift_abstraction::{
    AssetClient, DataAsset, Datastore, JobClient, JobInput, JobRecord, JobStatus, PlatformError, PlatformResult,
    ServicePrincipal, TableCatalog, WorkspaceConnector, WorkspaceHandle, WorkspaceSettings,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TRAIN: &str = "azureml://datastores/data/paths/train";
pub const VAL: &str = "azureml://datastores/data/paths/val";

/// A job carrying both monitored inputs at version `v1`.
pub fn pipeline_job(display_name: &str, name: &str) -> JobRecord {
    let mut job = JobRecord {
        name: Some(name.to_string()),
        display_name: display_name.to_string(),
        status: JobStatus::Completed,
        ..Default::default()
    };
    job.inputs.insert("training_data".to_string(), JobInput::with_path(format!("{TRAIN}:v1")));
    job.inputs.insert("validation_data".to_string(), JobInput::with_path(format!("{VAL}:v1")));
    job
}

pub fn submitted(display_name: &str, name: &str) -> JobRecord {
    JobRecord {
        name: Some(name.to_string()),
        display_name: display_name.to_string(),
        status: JobStatus::Other("NotStarted".to_string()),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeJobClient {
    listed: Vec<JobRecord>,
    statuses: Mutex<HashMap<String, VecDeque<PlatformResult<JobStatus>>>>,
    get_calls: Mutex<Vec<String>>,
    created: Mutex<Vec<JobRecord>>,
}

impl FakeJobClient {
    pub fn new(listed: Vec<JobRecord>) -> Self {
        Self { listed, ..Default::default() }
    }

    /// Successive statuses returned by `get_job(name)`; the last one repeats.
    pub fn with_statuses(self, name: &str, statuses: Vec<JobStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(name.to_string(), statuses.into_iter().map(Ok).collect());
        self
    }

    pub fn with_get_error(self, name: &str, error: PlatformError) -> Self {
        self.statuses.lock().unwrap().insert(name.to_string(), VecDeque::from([Err(error)]));
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.get_calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<JobRecord> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobClient for FakeJobClient {
    async fn list_jobs(&self) -> PlatformResult<Vec<JobRecord>> {
        Ok(self.listed.clone())
    }

    async fn get_job(&self, name: &str) -> PlatformResult<JobRecord> {
        self.get_calls.lock().unwrap().push(name.to_string());

        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            let queue = statuses
                .get_mut(name)
                .ok_or_else(|| PlatformError::NotFound(format!("job {name}")))?;
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        }?;

        let display_name = self
            .created
            .lock()
            .unwrap()
            .iter()
            .chain(self.listed.iter())
            .find(|job| job.name.as_deref() == Some(name))
            .map_or_else(|| name.to_string(), |job| job.display_name.clone());

        Ok(JobRecord { name: Some(name.to_string()), display_name, status, ..Default::default() })
    }

    async fn create_or_update_job(&self, job: &JobRecord) -> PlatformResult<JobRecord> {
        let mut created = self.created.lock().unwrap();
        let mut stored = job.clone();
        if stored.name.is_none() {
            stored.name = Some(format!("created_{}", created.len() + 1));
        }
        stored.status = JobStatus::Other("NotStarted".to_string());
        created.push(stored.clone());
        Ok(stored)
    }
}

/// Clock that only moves when slept on.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }
}

#[derive(Default)]
pub struct FakeAssetClient {
    error: Option<PlatformError>,
    datastores: Mutex<Vec<Datastore>>,
    data: Mutex<Vec<DataAsset>>,
}

impl FakeAssetClient {
    pub fn failing(error: PlatformError) -> Self {
        Self { error: Some(error), ..Default::default() }
    }

    pub fn datastores(&self) -> Vec<Datastore> {
        self.datastores.lock().unwrap().clone()
    }

    pub fn data(&self) -> Vec<DataAsset> {
        self.data.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetClient for FakeAssetClient {
    async fn create_or_update_datastore(&self, datastore: &Datastore) -> PlatformResult<Datastore> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.datastores.lock().unwrap().push(datastore.clone());
        Ok(datastore.clone())
    }

    async fn create_or_update_data(&self, asset: &DataAsset) -> PlatformResult<DataAsset> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.data.lock().unwrap().push(asset.clone());
        Ok(asset.clone())
    }
}

/// Records materialization requests without touching the filesystem.
#[derive(Default)]
pub struct FakeTableCatalog {
    calls: Mutex<Vec<(String, String, PathBuf)>>,
}

impl FakeTableCatalog {
    pub fn calls(&self) -> Vec<(String, String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TableCatalog for FakeTableCatalog {
    fn materialize_delta_table(&self, source_uri: &str, timestamp_as_of: &str, dest: &Path) -> PlatformResult<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((source_uri.to_string(), timestamp_as_of.to_string(), dest.to_path_buf()));
        Ok(dest.to_path_buf())
    }
}

pub struct FakeConnector {
    pub jobs: Arc<FakeJobClient>,
    pub assets: Arc<FakeAssetClient>,
    pub tables: Arc<FakeTableCatalog>,
    connections: Mutex<Vec<WorkspaceSettings>>,
}

impl FakeConnector {
    pub fn new(jobs: FakeJobClient) -> Self {
        Self {
            jobs: Arc::new(jobs),
            assets: Arc::default(),
            tables: Arc::default(),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn connections(&self) -> Vec<WorkspaceSettings> {
        self.connections.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceConnector for FakeConnector {
    async fn connect(&self, settings: &WorkspaceSettings) -> PlatformResult<WorkspaceHandle> {
        self.connections.lock().unwrap().push(settings.clone());
        Ok(WorkspaceHandle {
            jobs: self.jobs.clone(),
            assets: self.assets.clone(),
            tables: self.tables.clone(),
            service_principal: ServicePrincipal {
                tenant_id: "tenant".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            },
            tracking_uri: None,
        })
    }
}
