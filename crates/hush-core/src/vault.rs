use crate::crypto::{decrypt, encrypt, generate_nonce, NONCE_LEN};
use crate::keyfile;
use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use zeroize::Zeroizing;

/// Authenticated encryption for small credential strings.
///
/// Sealed tokens carry their nonce: base64(nonce || ciphertext). `open`
/// never fails; a wrong key, a tampered token or garbage input all yield
/// `None`, so callers degrade to "no saved credential" instead of crashing.
pub struct CredentialVault {
    key: Zeroizing<Vec<u8>>,
}

impl CredentialVault {
    /// Loads the key file at `key_path`, regenerating it when missing or
    /// structurally invalid.
    pub fn load_or_create(key_path: &Path) -> Result<Self> {
        let key = keyfile::load_or_create(key_path)?;
        Ok(Self { key })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = generate_nonce();
        let ciphertext = encrypt(&self.key, &nonce, plaintext.as_bytes())?;
        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(blob))
    }

    pub fn open(&self, token: &str) -> Option<String> {
        let blob = general_purpose::STANDARD.decode(token).ok()?;
        if blob.len() <= NONCE_LEN {
            return None;
        }
        let nonce: [u8; NONCE_LEN] = blob[..NONCE_LEN].try_into().ok()?;
        let plaintext = decrypt(&self.key, &nonce, &blob[NONCE_LEN..]).ok()?;
        String::from_utf8(plaintext).ok()
    }
}
