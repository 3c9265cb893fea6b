//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! This module handles fetching public keys from the provider's JWKS endpoint
//! and caching them for efficient validation. Fetches are serialized, and a
//! lookup miss only refetches once the minimum refetch interval has passed,
//! so unknown key IDs cannot drive traffic to the provider.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AuthError, Result};

/// Shortest gap between two fetches triggered by lookup misses.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(10);

/// JWKS document. Keys are parsed one by one so a single bad entry does not
/// invalidate the set.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Value>,
}

/// Cached JWKS keys.
#[derive(Default)]
struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
    attempted_at: Option<Instant>,
}

impl CachedKeys {
    fn fresh_key(&self, kid: &str, ttl: Duration) -> Option<DecodingKey> {
        if self.fetched_at.is_some_and(|t| t.elapsed() < ttl) {
            self.keys.get(kid).cloned()
        } else {
            None
        }
    }

    fn attempted_within(&self, interval: Duration) -> bool {
        self.attempted_at.is_some_and(|t| t.elapsed() < interval)
    }
}

/// JWKS key provider that fetches and caches keys.
pub struct JwksProvider {
    jwks_url: String,
    refresh_interval: Duration,
    min_refetch_interval: Duration,
    client: reqwest::Client,
    cache: RwLock<CachedKeys>,
    fetch_lock: Mutex<()>,
}

impl JwksProvider {
    /// Create a new JWKS provider for the given endpoint.
    #[must_use]
    pub fn new(
        jwks_url: impl Into<String>,
        refresh_interval: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            refresh_interval,
            min_refetch_interval: MIN_REFETCH_INTERVAL,
            client,
            cache: RwLock::new(CachedKeys::default()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Override the minimum gap between miss-triggered fetches.
    #[must_use]
    pub const fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    /// The JWKS endpoint this provider reads from.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a decoding key by key ID, fetching from JWKS if necessary.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is unknown and the set was fetched
    /// too recently to fetch again, or an error if the JWKS fetch fails.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey> {
        let cached = self.cache.read().fresh_key(kid, self.refresh_interval);
        if let Some(key) = cached {
            return Ok(key);
        }

        let _guard = self.fetch_lock.lock().await;

        {
            // Another task may have fetched while this one waited.
            let cache = self.cache.read();
            if let Some(key) = cache.fresh_key(kid, self.refresh_interval) {
                return Ok(key);
            }
            if cache.attempted_within(self.min_refetch_interval) {
                tracing::debug!(kid = kid, "Unknown key ID, refetch suppressed");
                return cache
                    .keys
                    .get(kid)
                    .cloned()
                    .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()));
            }
        }

        // Unknown kid or stale cache: the provider may have rotated keys.
        self.fetch_keys().await?;

        self.cache
            .read()
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    /// Fetch the key set and replace the cache. Callers hold `fetch_lock`.
    async fn fetch_keys(&self) -> Result<()> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");
        self.cache.write().attempted_at = Some(Instant::now());

        let document: JwksDocument = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let keys: HashMap<_, _> = document.keys.into_iter().filter_map(parse_key).collect();

        tracing::debug!(count = keys.len(), "Cached JWKS keys");

        let mut cache = self.cache.write();
        cache.keys = keys;
        cache.fetched_at = Some(Instant::now());

        Ok(())
    }

    /// Force a refresh of the JWKS cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS fetch fails.
    pub async fn force_refresh(&self) -> Result<()> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch_keys().await
    }
}

/// Parse one JWK into a signing key, skipping anything unusable.
fn parse_key(raw: Value) -> Option<(String, DecodingKey)> {
    let jwk: Jwk = match serde_json::from_value(raw) {
        Ok(jwk) => jwk,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed JWK");
            return None;
        }
    };

    if matches!(
        jwk.common.public_key_use,
        Some(PublicKeyUse::Encryption | PublicKeyUse::Other(_))
    ) {
        return None;
    }

    let Some(kid) = jwk.common.key_id.clone() else {
        tracing::warn!("Skipping JWK without kid");
        return None;
    };

    if matches!(jwk.algorithm, AlgorithmParameters::OctetKey(_)) {
        tracing::warn!(kid = %kid, "Skipping symmetric JWK");
        return None;
    }

    match DecodingKey::from_jwk(&jwk) {
        Ok(key) => Some((kid, key)),
        Err(e) => {
            tracing::warn!(kid = %kid, error = %e, "Skipping unusable JWK");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // RFC 7517 appendix A.1 example modulus.
    const RSA_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    fn rsa_jwk(kid: &str) -> Value {
        json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": RSA_N,
            "e": "AQAB"
        })
    }

    async fn serve_keys(keys: Value, expected_fetches: u64) -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .expect(expected_fetches)
            .mount(&server)
            .await;

        server
    }

    fn provider_for(server: &MockServer) -> JwksProvider {
        JwksProvider::new(
            format!("{}/certs", server.uri()),
            Duration::from_secs(300),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn parse_rsa_key() {
        let (kid, _) = parse_key(rsa_jwk("test-key")).unwrap();
        assert_eq!(kid, "test-key");
    }

    #[test]
    fn rsa_key_requires_components() {
        let mut key = rsa_jwk("test-key");
        key.as_object_mut().unwrap().remove("e");
        assert!(parse_key(key).is_none());
    }

    #[test]
    fn parse_ed25519_key() {
        let key = json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "kid": "test-key",
            "use": "sig",
            "alg": "EdDSA"
        });

        assert!(parse_key(key).is_some());
    }

    #[test]
    fn skip_unusable_keys() {
        let symmetric = json!({ "kty": "oct", "kid": "hmac", "k": "c2VjcmV0" });
        let encryption = json!({
            "kty": "RSA",
            "kid": "enc",
            "use": "enc",
            "n": RSA_N,
            "e": "AQAB"
        });
        let no_kid = json!({ "kty": "RSA", "use": "sig", "n": RSA_N, "e": "AQAB" });

        assert!(parse_key(symmetric).is_none());
        assert!(parse_key(encryption).is_none());
        assert!(parse_key(no_kid).is_none());
    }

    #[tokio::test]
    async fn fetches_and_caches_keys() {
        let server = serve_keys(json!([rsa_jwk("k1")]), 1).await;
        let provider = provider_for(&server);

        assert!(provider.get_key("k1").await.is_ok());
        // Served from cache, no second fetch.
        assert!(provider.get_key("k1").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_kid_is_not_found() {
        let server = serve_keys(json!([]), 1).await;
        let provider = provider_for(&server);

        let result = provider.get_key("missing").await;
        assert!(matches!(result, Err(AuthError::KeyNotFound(kid)) if kid == "missing"));
    }

    #[tokio::test]
    async fn unknown_kids_do_not_refetch_within_interval() {
        let server = serve_keys(json!([rsa_jwk("k1")]), 1).await;
        let provider = provider_for(&server);

        for i in 0..20 {
            let result = provider.get_key(&format!("forged-{i}")).await;
            assert!(matches!(result, Err(AuthError::KeyNotFound(_))));
        }

        // The real key is still served from the one fetch.
        assert!(provider.get_key("k1").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_kid_refetches_after_interval() {
        let server = serve_keys(json!([rsa_jwk("k1")]), 2).await;
        let provider = provider_for(&server).with_min_refetch_interval(Duration::ZERO);

        assert!(provider.get_key("rotated").await.is_err());
        assert!(provider.get_key("rotated").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let server = serve_keys(json!([rsa_jwk("k1")]), 1).await;
        let provider = provider_for(&server);

        let (a, b, c, d) = tokio::join!(
            provider.get_key("k1"),
            provider.get_key("k1"),
            provider.get_key("k1"),
            provider.get_key("k1"),
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
    }

    #[tokio::test]
    async fn bad_key_does_not_poison_the_set() {
        let broken_ec = json!({
            "kty": "EC",
            "crv": "P-256",
            "kid": "broken",
            "use": "sig",
            "x": "AAAA"
        });
        let server = serve_keys(json!([broken_ec, rsa_jwk("good")]), 1).await;
        let provider = provider_for(&server);

        assert!(provider.get_key("good").await.is_ok());
    }

    #[tokio::test]
    async fn failed_fetch_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        let provider = provider_for(&server);

        assert!(matches!(
            provider.get_key("k1").await,
            Err(AuthError::JwksFetchFailed(_))
        ));
        assert!(matches!(
            provider.get_key("k1").await,
            Err(AuthError::KeyNotFound(_))
        ));
    }
}
