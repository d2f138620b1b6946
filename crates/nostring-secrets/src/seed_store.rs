//! C3: seed storage, a thin validating wrapper over [`crate::SecretStore`].

use thiserror::Error;

use crate::secret_store::{SecretError, SecretStore};

const SEED_PREFIX: &str = "nostr-seed";
/// Legacy reference kept readable for backward compatibility; never written.
const LEGACY_MNEMONIC_PREFIX: &str = "nostr-mnemonic";

#[derive(Error, Debug)]
pub enum SeedError {
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("seed must be exactly 128 lowercase or uppercase hex characters")]
    InvalidSeedFormat,
}

fn is_valid_seed_hex(seed_hex: &str) -> bool {
    seed_hex.len() == 128 && seed_hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub struct SeedStore {
    inner: SecretStore,
}

impl SeedStore {
    pub fn new(inner: SecretStore) -> Self {
        Self { inner }
    }

    /// Save a 64-byte seed (128 hex chars) for `identity_id`.
    pub fn save_seed(&self, identity_id: &str, seed_hex: &str) -> Result<(), SeedError> {
        if !is_valid_seed_hex(seed_hex) {
            return Err(SeedError::InvalidSeedFormat);
        }
        self.inner.save(&format!("{SEED_PREFIX}:{identity_id}"), seed_hex)?;
        Ok(())
    }

    /// Fetch the seed for `identity_id`, falling back to the legacy
    /// `nostr-mnemonic:{id}` ref (read-only) if the seed ref is absent.
    pub fn get_seed(&self, identity_id: &str) -> Result<Option<String>, SeedError> {
        if let Some(seed) = self.inner.get(&format!("{SEED_PREFIX}:{identity_id}"))? {
            return Ok(Some(seed));
        }
        Ok(self.inner.get(&format!("{LEGACY_MNEMONIC_PREFIX}:{identity_id}"))?)
    }

    pub fn has_seed(&self, identity_id: &str) -> Result<bool, SeedError> {
        Ok(self.get_seed(identity_id)?.is_some())
    }

    pub fn delete_seed(&self, identity_id: &str) -> Result<bool, SeedError> {
        Ok(self.inner.delete(&format!("{SEED_PREFIX}:{identity_id}"))?)
    }
}
