//! Platform abstraction layer for drift.
//!
//! This crate defines the types and traits the retraining and registration
//! stages use to talk to the managed ML platform:
//! - Job records and the `JobClient`
//! - Datastores, data assets and the `TableCatalog`
//! - Secret retrieval and workspace bootstrap

pub mod asset;
pub mod error;
pub mod job;
pub mod workspace;

pub use asset::{AssetClient, AssetType, DataAsset, Datastore, ServicePrincipal, TableCatalog};
pub use error::{PlatformError, PlatformResult};
pub use job::{JobClient, JobInput, JobRecord, JobStatus};
pub use workspace::{SecretProvider, WorkspaceConnector, WorkspaceHandle, WorkspaceSettings};
