//! Signing-key resolution cache for RSA-signed JWTs.
//!
//! Validating a JWT requires the public key named by its `kid` header
//! claim, published as a JSON Web Key Set (JWKS) at a remote HTTP
//! endpoint. This crate caches those keys per endpoint and coordinates
//! refreshes so that many simultaneous token validations never stampede
//! the endpoint:
//!
//! - Fresh cache hits are served without any I/O
//! - Concurrent misses coalesce into exactly one in-flight fetch
//! - A failed refresh falls back to previously cached keys
//! - Keys of unsupported type or usage are filtered at decode time
//!
//! Token parsing and signature verification stay with the caller; the
//! integration surface is [`KeyStore::get_key`] for direct lookup and
//! [`KeyStore::key_fn`] for plugging into a generic JWT parser.
//!
//! # Example
//!
//! ```rust,ignore
//! use jwks_keystore::{KeyStore, KeyStoreConfig};
//!
//! let store = KeyStore::new(KeyStoreConfig::from_env()?);
//! let key = store.get_key("key-2024-01").await?;
//! let decoding_key = key.decoding_key();
//! ```
//!
//! # Modules
//!
//! - `config` - Construction options from environment
//! - `errors` - Error taxonomy (transient fetch vs. permanent unknown-kid)
//! - `keys` - RSA public key material
//! - `jwks` - Bounded JWKS fetch and decode (crate-internal)
//! - `keystore` - The cache and its single-flight refresh protocol

pub mod config;
pub mod errors;
pub mod keys;
pub mod keystore;

mod jwks;

pub use config::{KeyStoreConfig, DEFAULT_CACHE_TTL, DEFAULT_HTTP_TIMEOUT};
pub use errors::KeyStoreError;
pub use keys::PublicKey;
pub use keystore::{KeyLookup, KeyLookupFuture, KeyStore};
