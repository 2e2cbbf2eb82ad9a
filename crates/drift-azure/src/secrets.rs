//! Databricks secret scopes.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use drift_abstraction::{PlatformError, PlatformResult, SecretProvider};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::env;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
struct SecretResponse {
    value: String,
}

/// Reads secrets from a Databricks workspace with a personal access token.
#[derive(Clone)]
pub struct DatabricksSecretProvider {
    host: String,
    token: String,
    client: Client,
}

impl std::fmt::Debug for DatabricksSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabricksSecretProvider").field("host", &self.host).finish_non_exhaustive()
    }
}

impl DatabricksSecretProvider {
    #[must_use]
    pub fn new(host: &str, token: String) -> Self {
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };
        Self { host, token, client: Client::new() }
    }

    /// Builds the provider from `DATABRICKS_HOST` and `DATABRICKS_TOKEN`.
    #[allow(clippy::disallowed_methods)] // env::var is needed for credential loading
    pub fn from_env() -> PlatformResult<Self> {
        let host = env::var("DATABRICKS_HOST")
            .map_err(|_| PlatformError::Secret("DATABRICKS_HOST environment variable not set".to_string()))?;
        let token = env::var("DATABRICKS_TOKEN")
            .map_err(|_| PlatformError::Secret("DATABRICKS_TOKEN environment variable not set".to_string()))?;
        Ok(Self::new(&host, token))
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl SecretProvider for DatabricksSecretProvider {
    async fn get_secret(&self, scope: &str, key: &str) -> PlatformResult<String> {
        debug!(scope = %scope, key = %key, "Fetching secret");
        let url = format!("{}/api/2.0/secrets/get", self.host);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("scope", scope), ("key", key)])
            .send()
            .await
            .map_err(|e| PlatformError::Secret(format!("failed to reach secret store: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, scope = %scope, key = %key, "Secret lookup failed");
            let reason = if status == StatusCode::NOT_FOUND { "not found" } else { "lookup failed" };
            return Err(PlatformError::Secret(format!("secret {}/{} {} ({}): {}", scope, key, reason, status, body)));
        }

        let secret: SecretResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Secret(format!("invalid secret response: {}", e)))?;
        let bytes = STANDARD
            .decode(secret.value.as_bytes())
            .map_err(|e| PlatformError::Secret(format!("secret {}/{} is not base64: {}", scope, key, e)))?;
        String::from_utf8(bytes).map_err(|e| PlatformError::Secret(format!("secret {}/{} is not UTF-8: {}", scope, key, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_host_gets_scheme() {
        assert_eq!(DatabricksSecretProvider::new("adb-1.azuredatabricks.net/", "t".to_string()).host(), "https://adb-1.azuredatabricks.net");
        assert_eq!(DatabricksSecretProvider::new("http://localhost:1234", "t".to_string()).host(), "http://localhost:1234");
    }

    #[tokio::test]
    async fn test_get_secret_decodes_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/2.0/secrets/get")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("scope".into(), "kv-prod".into()),
                Matcher::UrlEncoded("key".into(), "ApplicationID".into()),
            ]))
            .match_header("authorization", "Bearer pat")
            .with_status(200)
            .with_body(format!(r#"{{"key":"ApplicationID","value":"{}"}}"#, STANDARD.encode("app-123")))
            .create_async()
            .await;

        let provider = DatabricksSecretProvider::new(&server.url(), "pat".to_string());
        assert_eq!(provider.get_secret("kv-prod", "ApplicationID").await.unwrap(), "app-123");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_secret_is_secret_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/2.0/secrets/get")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error_code":"RESOURCE_DOES_NOT_EXIST"}"#)
            .create_async()
            .await;

        let provider = DatabricksSecretProvider::new(&server.url(), "pat".to_string());
        let err = provider.get_secret("kv-prod", "TenantID").await.unwrap_err();

        match err {
            PlatformError::Secret(message) => {
                assert!(message.contains("kv-prod/TenantID"));
                assert!(message.contains("not found"));
            }
            other => panic!("expected Secret error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_base64_is_secret_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/2.0/secrets/get")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"key":"k","value":"%%%"}"#)
            .create_async()
            .await;

        let provider = DatabricksSecretProvider::new(&server.url(), "pat".to_string());
        assert!(matches!(provider.get_secret("s", "k").await, Err(PlatformError::Secret(_))));
    }
}
