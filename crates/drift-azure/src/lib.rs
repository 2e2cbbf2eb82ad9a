//! Azure implementations of the drift platform traits.
//!
//! # Components
//!
//! - **Credential**: client-secret OAuth2 tokens, cached per scope
//! - **Secrets**: Databricks secret scopes
//! - **Client**: Azure ML workspace REST client (jobs, datastores, data assets)
//! - **MLTable**: point-in-time table definitions over Delta Lake
//! - **Connector**: workspace bootstrap from vault secrets

pub mod client;
pub mod connector;
pub mod credential;
pub mod mltable;
pub mod secrets;
mod wire;

pub use client::{AzureMlClient, API_VERSION, DEFAULT_ARM_ENDPOINT};
pub use connector::AzureWorkspaceConnector;
pub use credential::{ClientSecretCredential, TokenCredential};
pub use mltable::{MlTableCatalog, MlTableSpec};
pub use secrets::DatabricksSecretProvider;
