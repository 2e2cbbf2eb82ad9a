//! Azure Machine Learning REST payloads and their mapping to platform records.

use drift_abstraction::{AssetType, DataAsset, Datastore, JobInput, JobRecord, JobStatus, PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One page of a list operation.
#[derive(Debug, Deserialize)]
pub(crate) struct ResourcePage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, rename = "nextLink")]
    pub next_link: Option<String>,
}

/// ARM envelope: resource name plus its `properties` bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkspaceProperties {
    #[serde(default)]
    pub ml_flow_tracking_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WorkspaceResource {
    pub properties: WorkspaceProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlobDatastoreProperties {
    pub account_name: String,
    pub container_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlobDatastoreResource {
    pub properties: BlobDatastoreProperties,
}

const DISPLAY_NAME: &str = "displayName";
const STATUS: &str = "status";
const INPUTS: &str = "inputs";
const INPUT_URI: &str = "uri";

/// Properties the service computes and rejects on submission.
const READ_ONLY_JOB_PROPERTIES: [&str; 3] = [STATUS, "services", "creationContext"];

pub(crate) fn job_from_resource(resource: Resource) -> PlatformResult<JobRecord> {
    let mut properties = resource.properties;

    let display_name = match properties.remove(DISPLAY_NAME) {
        Some(Value::String(name)) => name,
        _ => resource.name.clone().unwrap_or_default(),
    };
    let status = match properties.remove(STATUS) {
        Some(Value::String(status)) => JobStatus::from(status),
        _ => JobStatus::default(),
    };

    let mut inputs = BTreeMap::new();
    if let Some(Value::Object(raw_inputs)) = properties.remove(INPUTS) {
        for (input_name, raw) in raw_inputs {
            let Value::Object(mut fields) = raw else {
                return Err(PlatformError::Serialization(format!("job input {input_name} is not an object")));
            };
            let path = match fields.remove(INPUT_URI) {
                Some(Value::String(uri)) => Some(uri),
                _ => None,
            };
            inputs.insert(input_name, JobInput { path, extra: fields });
        }
    }

    Ok(JobRecord { name: resource.name, display_name, status, inputs, properties })
}

pub(crate) fn job_to_resource(job: &JobRecord) -> Resource {
    let mut properties = job.properties.clone();
    for key in READ_ONLY_JOB_PROPERTIES {
        properties.remove(key);
    }
    properties.insert(DISPLAY_NAME.to_string(), Value::String(job.display_name.clone()));

    let inputs: Map<String, Value> = job
        .inputs
        .iter()
        .map(|(input_name, input)| {
            let mut fields = input.extra.clone();
            if let Some(path) = &input.path {
                fields.insert(INPUT_URI.to_string(), Value::String(path.clone()));
            }
            (input_name.clone(), Value::Object(fields))
        })
        .collect();
    properties.insert(INPUTS.to_string(), Value::Object(inputs));

    Resource { name: job.name.clone(), properties }
}

pub(crate) fn datastore_body(datastore: &Datastore, authority_host: &str) -> Value {
    let sp = &datastore.credentials;
    json!({
        "properties": {
            "datastoreType": "AzureDataLakeGen2",
            "description": datastore.description,
            "accountName": datastore.account_name,
            "filesystem": datastore.filesystem,
            "endpoint": "core.windows.net",
            "protocol": "https",
            "credentials": {
                "credentialsType": "ServicePrincipal",
                "tenantId": sp.tenant_id,
                "clientId": sp.client_id,
                "authorityUrl": authority_host,
                "resourceUrl": "https://storage.azure.com/",
                "secrets": {
                    "secretsType": "ServicePrincipal",
                    "clientSecret": sp.client_secret,
                }
            }
        }
    })
}

pub(crate) fn data_version_body(asset: &DataAsset, data_uri: &str) -> Value {
    json!({
        "properties": {
            "dataType": asset.asset_type.as_str(),
            "dataUri": data_uri,
            "description": asset.description,
        }
    })
}

/// Reads the registered asset back; the stored URI replaces the local path.
pub(crate) fn data_asset_from_resource(asset: &DataAsset, resource: &Resource) -> DataAsset {
    let path = resource
        .properties
        .get("dataUri")
        .and_then(Value::as_str)
        .map_or_else(|| asset.path.clone(), str::to_string);
    let asset_type = match resource.properties.get("dataType").and_then(Value::as_str) {
        Some("mltable") => AssetType::Mltable,
        Some("uri_folder") => AssetType::UriFolder,
        _ => asset.asset_type,
    };
    DataAsset { path, asset_type, ..asset.clone() }
}
