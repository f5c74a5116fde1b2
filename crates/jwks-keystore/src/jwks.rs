//! JWKS fetching and decoding.
//!
//! One bounded HTTP GET against the configured JWKS endpoint, decoded into
//! a map from key identifier to RSA public key. Entries that are not RSA
//! signing keys, or whose key material does not decode, are skipped
//! individually; a document yielding zero usable keys fails the fetch as a
//! whole, so an empty keyset never masquerades as a valid refresh.

use crate::errors::KeyStoreError;
use crate::keys::PublicKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maximum accepted JWKS response body size (1 MiB).
///
/// Bounds memory use against a misbehaving or compromised endpoint.
pub(crate) const MAX_JWKS_BODY_BYTES: usize = 1024 * 1024;

/// JSON Web Key entry from the JWKS endpoint (RFC 7517).
#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)] // Fields used for deserialization and future validation
pub(crate) struct Jwk {
    /// Key type ("RSA" is the only type this store keeps).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key use (must be "sig" or absent).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Algorithm (e.g. "RS256"). Informational only.
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url encoded, big-endian).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded, big-endian).
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS response document.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JwksDocument {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// HTTP client for one JWKS endpoint.
pub(crate) struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client with the configured fetch timeout.
    http_client: reqwest::Client,
}

impl JwksClient {
    pub(crate) fn new(jwks_url: String, http_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "keystore.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    /// Fetch the JWKS document and decode it into usable signing keys.
    ///
    /// # Errors
    ///
    /// Returns `KeyStoreError::Fetch` on network failure, non-200 status,
    /// oversized body, malformed JSON, or a document with no usable keys.
    pub(crate) async fn fetch_keys(
        &self,
    ) -> Result<HashMap<String, Arc<PublicKey>>, KeyStoreError> {
        tracing::debug!(target: "keystore.jwks", url = %self.jwks_url, "Fetching JWKS");

        let mut response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyStoreError::Fetch(format!("request failed: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(KeyStoreError::Fetch(format!(
                "endpoint returned status {status}"
            )));
        }

        // Read the body chunk-wise so an oversized response is abandoned
        // as soon as it crosses the cap, not after full buffering.
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| KeyStoreError::Fetch(format!("failed to read response body: {e}")))?
        {
            if body.len() + chunk.len() > MAX_JWKS_BODY_BYTES {
                return Err(KeyStoreError::Fetch(format!(
                    "response body exceeds {MAX_JWKS_BODY_BYTES} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        let document: JwksDocument = serde_json::from_slice(&body)
            .map_err(|e| KeyStoreError::Fetch(format!("failed to parse JWKS document: {e}")))?;

        keys_from_document(document)
    }
}

/// Convert a JWKS document into a key map, skipping unusable entries.
///
/// A single malformed key in a large document must not deny service for
/// the valid ones, so per-entry failures are logged and skipped. Zero
/// survivors is a fetch failure.
pub(crate) fn keys_from_document(
    document: JwksDocument,
) -> Result<HashMap<String, Arc<PublicKey>>, KeyStoreError> {
    let entry_count = document.keys.len();
    let mut keys = HashMap::new();

    for jwk in document.keys {
        if jwk.kty != "RSA" {
            tracing::debug!(target: "keystore.jwks", kid = %jwk.kid, kty = %jwk.kty, "Skipping non-RSA JWK");
            continue;
        }

        if let Some(key_use) = &jwk.key_use {
            if key_use != "sig" {
                tracing::debug!(target: "keystore.jwks", kid = %jwk.kid, key_use = %key_use, "Skipping non-signature JWK");
                continue;
            }
        }

        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            tracing::warn!(target: "keystore.jwks", kid = %jwk.kid, "Skipping RSA JWK missing n or e component");
            continue;
        };

        match PublicKey::from_components(n, e) {
            Ok(key) => {
                keys.insert(jwk.kid, Arc::new(key));
            }
            Err(err) => {
                tracing::warn!(target: "keystore.jwks", kid = %jwk.kid, error = %err, "Skipping JWK with undecodable key material");
            }
        }
    }

    if keys.is_empty() {
        return Err(KeyStoreError::Fetch(format!(
            "document yielded no usable RSA signing keys ({entry_count} entries)"
        )));
    }

    Ok(keys)
}
