//! OAuth2 client-credentials tokens for Azure Resource Manager and Storage.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use drift_abstraction::{PlatformError, PlatformResult};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, error};

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 120;

/// Source of bearer tokens for a given scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self, scope: &str) -> PlatformResult<String>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Service principal credential using the client-secret grant.
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    client: Client,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl ClientSecretCredential {
    #[must_use]
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Self {
        Self {
            tenant_id,
            client_id,
            client_secret,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            client: Client::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into().trim_end_matches('/').to_string();
        self
    }

    fn cached(&self, scope: &str) -> PlatformResult<Option<String>> {
        let cache = self.cache.lock().map_err(|_| PlatformError::Auth("token cache poisoned".to_string()))?;
        let margin = Duration::seconds(EXPIRY_MARGIN_SECS);
        Ok(cache
            .get(scope)
            .filter(|token| token.expires_at - margin > Utc::now())
            .map(|token| token.access_token.clone()))
    }

    async fn request_token(&self, scope: &str) -> PlatformResult<TokenResponse> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self.client.post(&url).form(&form).send().await.map_err(|e| {
            error!(error = %e, "Failed to reach token endpoint");
            PlatformError::Auth(format!("token request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, tenant = %self.tenant_id, "Token endpoint rejected credentials");
            return Err(PlatformError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| PlatformError::Auth(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn token(&self, scope: &str) -> PlatformResult<String> {
        if let Some(token) = self.cached(scope)? {
            return Ok(token);
        }

        let response = self.request_token(scope).await?;
        let expires_at = Utc::now() + Duration::seconds(response.expires_in);
        debug!(scope = %scope, expires_at = %expires_at, "Acquired access token");

        let mut cache = self.cache.lock().map_err(|_| PlatformError::Auth("token cache poisoned".to_string()))?;
        cache.insert(
            scope.to_string(),
            CachedToken { access_token: response.access_token.clone(), expires_at },
        );
        Ok(response.access_token)
    }
}
