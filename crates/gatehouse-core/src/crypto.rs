//! Key material for bearer tokens.
//!
//! The authentication layer holds a [`Keypair`] and signs token claims; every
//! process that checks tokens only needs the [`PublicKey`], which serializes
//! as a hex string so it can sit in a JSON configuration file.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Hex of the first 8 bytes of the blake3 digest of `data`.
pub fn short_digest(data: &[u8]) -> String {
    hex::encode(&blake3::hash(data).as_bytes()[..8])
}

/// Ed25519 verifying key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        // Reject points that are not valid keys up front.
        VerifyingKey::from_bytes(&bytes).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// EdDSA decoding key built from the JWK `x` component.
    pub fn decoding_key(&self) -> Result<DecodingKey, CoreError> {
        DecodingKey::from_ed_components(&URL_SAFE_NO_PAD.encode(self.0))
            .map_err(|_| CoreError::InvalidPublicKey)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", hex::encode(&self.0[..6]))
    }
}

impl TryFrom<String> for PublicKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_string()
    }
}

/// Token signing key. Never serialized.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Fresh key from the thread rng.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Key derived from a fixed 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// EdDSA encoding key. jsonwebtoken takes the private key as PKCS#8 DER.
    pub fn encoding_key(&self) -> Result<EncodingKey, CoreError> {
        let der = self
            .signing
            .to_pkcs8_der()
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(EncodingKey::from_ed_der(der.as_bytes()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}
