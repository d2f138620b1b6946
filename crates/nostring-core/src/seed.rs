//! BIP-39 mnemonic generation and parsing.
//!
//! Encryption-at-rest for the derived seed lives in [`crate::crypto`]; this
//! module only handles mnemonic<->seed conversion (see [`crate::keys`] for
//! the NIP-06 derivation that consumes the seed).

use bip39::{Language, Mnemonic};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
}

/// Generate a new 24-word BIP-39 mnemonic (English wordlist).
pub fn generate_mnemonic_24() -> Result<Mnemonic, SeedError> {
    Mnemonic::generate_in(Language::English, 24).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Parse a mnemonic from space-separated words, validating wordlist and checksum.
pub fn parse_mnemonic(words: &str) -> Result<Mnemonic, SeedError> {
    Mnemonic::parse_in(Language::English, words).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Derive the 64-byte BIP-39 seed from a mnemonic and optional passphrase.
pub fn derive_seed(mnemonic: &Mnemonic, passphrase: &str) -> [u8; 64] {
    mnemonic.to_seed(passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_parse_roundtrip() {
        let m = generate_mnemonic_24().unwrap();
        let words = m.to_string();
        let parsed = parse_mnemonic(&words).unwrap();
        assert_eq!(m.to_seed(""), parsed.to_seed(""));
    }

    #[test]
    fn test_invalid_checksum_rejected() {
        let result = parse_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon",
        );
        assert!(result.is_err());
    }
}
