//! RSA public key material.
//!
//! A [`PublicKey`] is built once from the base64url `n`/`e` components of a
//! JWK entry and never mutated afterwards, so it can be shared freely
//! between concurrent token validations behind an `Arc`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use std::fmt;
use thiserror::Error;

/// Errors raised while decoding JWK key material.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    /// The `n` or `e` component is not valid base64url.
    #[error("invalid base64url key component: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The components decoded but do not form a usable RSA key.
    ///
    /// `jsonwebtoken` 9.x only rejects malformed base64, which
    /// [`KeyMaterialError::InvalidBase64`] already catches; this variant
    /// covers stricter component validation in future library releases.
    #[error("invalid RSA key material: {0}")]
    InvalidKey(String),
}

/// An RSA public key (modulus + public exponent), immutable once built.
///
/// Keeps the raw big-endian component bytes for inspection alongside the
/// [`DecodingKey`] handed to JWT-parsing libraries for signature checks.
pub struct PublicKey {
    n: Vec<u8>,
    e: Vec<u8>,
    decoding_key: DecodingKey,
}

impl PublicKey {
    /// Build a key from base64url-encoded modulus and exponent
    /// (RFC 7518 `n`/`e` conventions).
    pub(crate) fn from_components(n_b64: &str, e_b64: &str) -> Result<Self, KeyMaterialError> {
        let n = URL_SAFE_NO_PAD.decode(n_b64)?;
        let e = URL_SAFE_NO_PAD.decode(e_b64)?;

        // jsonwebtoken takes the base64url forms directly
        let decoding_key = DecodingKey::from_rsa_components(n_b64, e_b64)
            .map_err(|err| KeyMaterialError::InvalidKey(err.to_string()))?;

        Ok(Self { n, e, decoding_key })
    }

    /// Big-endian modulus bytes.
    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.n
    }

    /// Big-endian public exponent bytes.
    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.e
    }

    /// Public exponent as a `u64`, or `None` if it is wider than 8 bytes.
    #[must_use]
    pub fn exponent_u64(&self) -> Option<u64> {
        if self.e.len() > 8 {
            return None;
        }
        Some(
            self.e
                .iter()
                .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)),
        )
    }

    /// Modulus size in bits, ignoring leading zero bytes.
    #[must_use]
    pub fn modulus_bits(&self) -> usize {
        let mut bytes = self.n.iter().skip_while(|b| **b == 0);
        match bytes.next() {
            Some(first) => {
                let remaining = bytes.count();
                (8 - first.leading_zeros() as usize) + remaining * 8
            }
            None => 0,
        }
    }

    /// The decoding key to tender to a JWT-parsing library.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// `DecodingKey` has no `Debug`; print component sizes, not key bytes.
impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("modulus_bits", &self.modulus_bits())
            .field("exponent", &self.exponent_u64())
            .finish()
    }
}
