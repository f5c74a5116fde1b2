//! Key store error types.
//!
//! The taxonomy separates transient fetch failures (retried implicitly on
//! the next lookup, masked when a stale cached key can still answer) from
//! the permanent "unknown key identifier" outcome and from token-shape
//! rejections that never reach the cache or the network.

use thiserror::Error;

/// Errors returned by [`KeyStore`](crate::KeyStore) operations.
///
/// The type is `Clone` so that a single fetch outcome can be handed to
/// every caller that joined the same in-flight refresh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// The JWKS endpoint could not be fetched or its document yielded no
    /// usable keys. Transient: the next lookup retries.
    #[error("JWKS fetch failed: {0}")]
    Fetch(String),

    /// The JWKS document was fetched successfully but does not contain the
    /// requested key identifier. Permanent: the token is unverifiable.
    #[error("unknown key identifier: {0}")]
    UnknownKeyId(String),

    /// The token header declares an algorithm outside the RSA family.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token header carries no `kid` claim.
    #[error("token header is missing a key identifier")]
    MissingKeyId,
}

impl KeyStoreError {
    /// Whether a retry on a later lookup could succeed.
    ///
    /// Only fetch-level failures are transient; the other variants describe
    /// the token or the key set itself and will not change on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, KeyStoreError::Fetch(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_fetch() {
        let error = KeyStoreError::Fetch("connection refused".to_string());
        assert_eq!(
            format!("{}", error),
            "JWKS fetch failed: connection refused"
        );
    }

    #[test]
    fn test_display_unknown_key_id() {
        let error = KeyStoreError::UnknownKeyId("key-42".to_string());
        assert_eq!(format!("{}", error), "unknown key identifier: key-42");
    }

    #[test]
    fn test_display_unsupported_algorithm() {
        let error = KeyStoreError::UnsupportedAlgorithm("HS256".to_string());
        assert_eq!(format!("{}", error), "unsupported token algorithm: HS256");
    }

    #[test]
    fn test_display_missing_key_id() {
        let error = KeyStoreError::MissingKeyId;
        assert_eq!(
            format!("{}", error),
            "token header is missing a key identifier"
        );
    }

    #[test]
    fn test_only_fetch_is_transient() {
        assert!(KeyStoreError::Fetch("timeout".to_string()).is_transient());
        assert!(!KeyStoreError::UnknownKeyId("k".to_string()).is_transient());
        assert!(!KeyStoreError::UnsupportedAlgorithm("HS256".to_string()).is_transient());
        assert!(!KeyStoreError::MissingKeyId.is_transient());
    }

    #[test]
    fn test_clone_preserves_variant() {
        let error = KeyStoreError::Fetch("status 503".to_string());
        assert_eq!(error.clone(), error);
    }
}
