//! OpenID Connect provider discovery.
//!
//! This module fetches the provider's `.well-known/openid-configuration`
//! document, which names the canonical issuer and the JWKS endpoint used for
//! signature verification.

use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// The subset of the discovery document the gateway relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    /// Canonical issuer identifier; must match the token `iss` claim.
    pub issuer: String,
    /// JWKS endpoint.
    pub jwks_uri: String,
    /// Signing algorithms the provider advertises.
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// Client for the provider's discovery endpoint.
pub struct DiscoveryClient {
    config: AuthConfig,
    client: reqwest::Client,
}

impl DiscoveryClient {
    /// Create a discovery client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Fetch and validate the provider metadata.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryFailed` if the document cannot be fetched or parsed,
    /// or if the advertised issuer does not match the configured one.
    pub async fn fetch(&self) -> Result<ProviderMetadata> {
        let url = self.config.discovery_url();
        tracing::debug!(url = %url, "Fetching OIDC discovery document");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::DiscoveryFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::DiscoveryFailed(format!("HTTP {status}")));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| AuthError::DiscoveryFailed(format!("invalid document: {e}")))?;

        if metadata.issuer.trim_end_matches('/') != self.config.issuer().trim_end_matches('/') {
            return Err(AuthError::DiscoveryFailed(format!(
                "issuer mismatch: expected {}, provider reported {}",
                self.config.issuer(),
                metadata.issuer
            )));
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AuthConfig {
        AuthConfig {
            issuer_url: format!("{}/realms/avalon", server.uri()),
            ..AuthConfig::default()
        }
    }

    #[tokio::test]
    async fn fetches_metadata() {
        let server = MockServer::start().await;
        let issuer = format!("{}/realms/avalon", server.uri());

        Mock::given(method("GET"))
            .and(path("/realms/avalon/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": issuer,
                "jwks_uri": format!("{issuer}/protocol/openid-connect/certs"),
                "id_token_signing_alg_values_supported": ["RS256"]
            })))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new(config_for(&server)).unwrap();
        let metadata = client.fetch().await.unwrap();

        assert_eq!(metadata.issuer, issuer);
        assert!(metadata.jwks_uri.ends_with("/protocol/openid-connect/certs"));
        assert_eq!(metadata.id_token_signing_alg_values_supported, ["RS256"]);
    }

    #[tokio::test]
    async fn rejects_issuer_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/realms/avalon/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": "https://evil.example.com",
                "jwks_uri": "https://evil.example.com/certs"
            })))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new(config_for(&server)).unwrap();
        let result = client.fetch().await;

        assert!(matches!(result, Err(AuthError::DiscoveryFailed(_))));
    }

    #[tokio::test]
    async fn reports_http_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new(config_for(&server)).unwrap();
        let err = client.fetch().await.unwrap_err();

        assert!(err.is_provider_failure());
        assert!(err.to_string().contains("503"));
    }
}
