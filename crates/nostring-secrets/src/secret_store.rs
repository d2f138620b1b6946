//! C2: save/get/delete/list over OS-keychain-backed ciphertext.

use std::collections::BTreeSet;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

const VAULT_KEY_SERVICE: &str = "nostring-vault";
const VAULT_KEY_USER: &str = "vault-key";
const INDEX_SERVICE: &str = "nostring-vault-index";
const INDEX_USER: &str = "refs";
const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("OS keychain unavailable: {0}")]
    Unavailable(String),
    #[error("stored ciphertext could not be decrypted -- likely corruption after a key change")]
    DecryptionFailure,
}

/// Opaque-ciphertext secret store backed by the platform keychain.
///
/// Every ref is its own keychain entry under `service`; a parallel index
/// entry (also keychain-resident, per the "C2 suspends only on keychain
/// syscalls" resource policy) tracks which refs exist, since the keychain
/// itself offers no enumeration API.
pub struct SecretStore {
    service: String,
}

impl SecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    fn vault_key(&self) -> Result<[u8; 32], SecretError> {
        let entry = keyring::Entry::new(VAULT_KEY_SERVICE, VAULT_KEY_USER)
            .map_err(|e| SecretError::Unavailable(e.to_string()))?;
        match entry.get_password() {
            Ok(key_b64) => {
                let bytes = BASE64.decode(key_b64).map_err(|_| SecretError::DecryptionFailure)?;
                bytes.try_into().map_err(|_| SecretError::DecryptionFailure)
            }
            Err(keyring::Error::NoEntry) => {
                let mut key = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                entry
                    .set_password(&BASE64.encode(key))
                    .map_err(|e| SecretError::Unavailable(e.to_string()))?;
                Ok(key)
            }
            Err(e) => Err(SecretError::Unavailable(e.to_string())),
        }
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        let key = self.vault_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretError::DecryptionFailure)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| SecretError::DecryptionFailure)?;
        let mut packed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(packed))
    }

    fn decrypt(&self, encoded: &str) -> Result<String, SecretError> {
        let key = self.vault_key()?;
        let packed = BASE64.decode(encoded).map_err(|_| SecretError::DecryptionFailure)?;
        if packed.len() < NONCE_LEN {
            return Err(SecretError::DecryptionFailure);
        }
        let (nonce_bytes, ciphertext) = packed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretError::DecryptionFailure)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SecretError::DecryptionFailure)?;
        String::from_utf8(plaintext).map_err(|_| SecretError::DecryptionFailure)
    }

    fn index_entry(&self) -> Result<keyring::Entry, SecretError> {
        keyring::Entry::new(&format!("{INDEX_SERVICE}:{}", self.service), INDEX_USER)
            .map_err(|e| SecretError::Unavailable(e.to_string()))
    }

    fn read_index(&self) -> Result<BTreeSet<String>, SecretError> {
        let entry = self.index_entry()?;
        match entry.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json).unwrap_or_default()),
            Err(keyring::Error::NoEntry) => Ok(BTreeSet::new()),
            Err(e) => Err(SecretError::Unavailable(e.to_string())),
        }
    }

    fn write_index(&self, refs: &BTreeSet<String>) -> Result<(), SecretError> {
        let entry = self.index_entry()?;
        let json = serde_json::to_string(refs).expect("ref set serializes");
        entry.set_password(&json).map_err(|e| SecretError::Unavailable(e.to_string()))
    }

    fn entry_for(&self, reference: &str) -> Result<keyring::Entry, SecretError> {
        keyring::Entry::new(&self.service, reference).map_err(|e| SecretError::Unavailable(e.to_string()))
    }

    /// Persist `plaintext` under `reference`, encrypted with the vault key.
    ///
    /// Idempotent: saving the same `(reference, plaintext)` pair again just
    /// re-encrypts and overwrites -- the caller never sees a conflict.
    pub fn save(&self, reference: &str, plaintext: &str) -> Result<(), SecretError> {
        let ciphertext = self.encrypt(plaintext)?;
        self.entry_for(reference)?
            .set_password(&ciphertext)
            .map_err(|e| SecretError::Unavailable(e.to_string()))?;
        let mut refs = self.read_index()?;
        if refs.insert(reference.to_string()) {
            self.write_index(&refs)?;
        }
        Ok(())
    }

    /// Look up `reference`. `None` for a missing ref; `Err` only when the
    /// stored ciphertext fails to decrypt (corruption, not absence).
    pub fn get(&self, reference: &str) -> Result<Option<String>, SecretError> {
        let entry = self.entry_for(reference)?;
        match entry.get_password() {
            Ok(ciphertext) => self.decrypt(&ciphertext).map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SecretError::Unavailable(e.to_string())),
        }
    }

    /// Remove `reference`. Returns whether it previously existed; idempotent.
    pub fn delete(&self, reference: &str) -> Result<bool, SecretError> {
        let entry = self.entry_for(reference)?;
        let existed = match entry.delete_credential() {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false,
            Err(e) => return Err(SecretError::Unavailable(e.to_string())),
        };
        let mut refs = self.read_index()?;
        if refs.remove(reference) {
            self.write_index(&refs)?;
        }
        Ok(existed)
    }

    /// All refs currently saved, in no particular order guarantee beyond
    /// the `BTreeSet`'s lexicographic one.
    pub fn list_refs(&self) -> Result<Vec<String>, SecretError> {
        Ok(self.read_index()?.into_iter().collect())
    }
}
