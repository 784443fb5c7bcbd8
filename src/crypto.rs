//! Optional symmetric transform for result payloads, plus token generation.
//!
//! The cipher key is derived as urlsafe-base64(sha256(passphrase)) so the
//! wire format stays compatible with Fernet tokens produced by workers
//! sharing the same passphrase.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use fernet::Fernet;
use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::config::EncryptionConfig;
use crate::error::CryptoError;

/// Generate `bytes` cryptographically strong random bytes, hex-encoded.
///
/// Used for the process bearer token and task ids — both must be
/// unguessable, never counter-derived.
pub fn token_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Payload cipher resolved once at startup from [`EncryptionConfig`].
pub enum ResultCipher {
    Plain,
    Fernet(Fernet),
}

impl ResultCipher {
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, CryptoError> {
        match config {
            EncryptionConfig::Disabled => Ok(ResultCipher::Plain),
            EncryptionConfig::Enabled { passphrase } => {
                let key = URL_SAFE.encode(Sha256::digest(passphrase.expose_secret().as_bytes()));
                let fernet = Fernet::new(&key).ok_or(CryptoError::InvalidKey)?;
                Ok(ResultCipher::Fernet(fernet))
            }
        }
    }

    /// Wrap a serialized payload for the wire.
    pub fn encrypt(&self, data: &[u8]) -> String {
        match self {
            ResultCipher::Plain => String::from_utf8_lossy(data).into_owned(),
            ResultCipher::Fernet(f) => f.encrypt(data),
        }
    }

    /// Decode an inbound result payload into JSON.
    ///
    /// With the cipher enabled we first try decrypt-then-parse, then fall
    /// back to treating the raw payload as plain JSON (workers may run
    /// without the passphrase). Both failing surfaces an error — a corrupt
    /// result is never recorded.
    pub fn decode(&self, payload: &str) -> Result<serde_json::Value, CryptoError> {
        if let ResultCipher::Fernet(f) = self
            && let Ok(plain) = f.decrypt(payload)
        {
            return serde_json::from_slice(&plain)
                .map_err(|e| CryptoError::MalformedPayload(format!("decrypted payload: {e}")));
        }
        serde_json::from_str(payload).map_err(|e| CryptoError::MalformedPayload(e.to_string()))
    }
}
