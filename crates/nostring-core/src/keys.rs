//! Key derivation: BIP-39 mnemonic -> BIP-32 seed -> Nostr secp256k1 keypair (NIP-06),
//! nsec import, and bech32 (NIP-19) codecs.
//!
//! Default derivation path is `m/44'/1237'/{account}'/0/0` (NIP-06).

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::Network;
use nostr_sdk::{FromBech32, Keys as NostrKeys, PublicKey, SecretKey, ToBech32};
use thiserror::Error;

/// NIP-06 purpose/coin-type prefix; account index is filled in per call.
const NIP06_PREFIX: &str = "m/44'/1237'";

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid encoding")]
    InvalidEncoding,
    #[error("invalid mnemonic checksum")]
    InvalidChecksum,
    #[error("invalid account index")]
    InvalidAccountIndex,
    #[error("key derivation failed")]
    DerivationFailed,
}

/// A derived Nostr identity: secret key plus its public encodings.
///
/// The secret key lives only inside `nostr_sdk::Keys`, which zeroizes its
/// inner buffer on drop; callers that need to persist it must go through
/// `nostring-secrets`, never write it to storage directly.
pub struct Keypair {
    keys: NostrKeys,
}

impl Keypair {
    pub fn pubkey_hex(&self) -> String {
        self.keys.public_key().to_hex()
    }

    pub fn npub(&self) -> Result<String, KeyError> {
        self.keys.public_key().to_bech32().map_err(|_| KeyError::InvalidEncoding)
    }

    pub fn nsec(&self) -> Result<String, KeyError> {
        self.keys.secret_key().to_bech32().map_err(|_| KeyError::InvalidEncoding)
    }

    pub fn secret_key(&self) -> &SecretKey {
        self.keys.secret_key()
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    pub fn nostr_keys(&self) -> &NostrKeys {
        &self.keys
    }
}

/// Result of deriving from a mnemonic: the keypair plus the raw seed
/// material and path used, for callers that persist the seed (via
/// `nostring-secrets`) rather than just the derived key.
pub struct MnemonicDerivation {
    pub keypair: Keypair,
    pub seed_hex: String,
    pub path: String,
}

/// Decode a bech32 `nsec1...` string into a keypair.
///
/// Fails with `InvalidEncoding` on prefix mismatch or a payload that is not
/// exactly 32 bytes.
pub fn derive_keypair_from_nsec(nsec: &str) -> Result<Keypair, KeyError> {
    if !nsec.starts_with("nsec1") {
        return Err(KeyError::InvalidEncoding);
    }
    let secret_key = SecretKey::from_bech32(nsec).map_err(|_| KeyError::InvalidEncoding)?;
    Ok(Keypair { keys: NostrKeys::new(secret_key) })
}

/// Generate a fresh random keypair from the OS CSPRNG.
pub fn generate_keypair() -> Keypair {
    Keypair { keys: NostrKeys::generate() }
}

/// Derive a Nostr keypair from a BIP-39 mnemonic at `m/44'/1237'/{account}'/0/0`.
///
/// `account_index` must be non-negative and small enough to be a valid
/// hardened BIP-32 child (< 2^31).
pub fn derive_keypair_from_mnemonic(
    mnemonic: &str,
    passphrase: &str,
    account_index: i64,
) -> Result<MnemonicDerivation, KeyError> {
    if account_index < 0 || account_index >= (1 << 31) {
        return Err(KeyError::InvalidAccountIndex);
    }
    let mnemonic = crate::seed::parse_mnemonic(mnemonic).map_err(|_| KeyError::InvalidChecksum)?;
    let seed: [u8; 64] = mnemonic.to_seed(passphrase);
    let path_str = format!("{}/{}'/0/0", NIP06_PREFIX, account_index);
    let keypair = derive_keypair_from_seed(&seed, &path_str)?;
    Ok(MnemonicDerivation { keypair, seed_hex: hex::encode(seed), path: path_str })
}

/// Derive a Nostr keypair from a raw 64-byte seed and an explicit BIP-32
/// path (apostrophe-denoted hardened segments). Used both by the mnemonic
/// path above and by seed-store restoration, where only the seed survives.
pub fn derive_keypair_from_seed(seed: &[u8; 64], path: &str) -> Result<Keypair, KeyError> {
    let master = Xpriv::new_master(Network::Bitcoin, seed).map_err(|_| KeyError::DerivationFailed)?;
    let path: DerivationPath = path.parse().map_err(|_| KeyError::InvalidEncoding)?;
    let derived = master
        .derive_priv(&bitcoin::secp256k1::Secp256k1::new(), &path)
        .map_err(|_| KeyError::DerivationFailed)?;
    let secret_key = SecretKey::from_slice(&derived.private_key.secret_bytes())
        .map_err(|_| KeyError::DerivationFailed)?;
    Ok(Keypair { keys: NostrKeys::new(secret_key) })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Official NIP-06 test vector.
    #[test]
    fn test_nip06_official_vector() {
        let d = derive_keypair_from_mnemonic(
            "leader monkey parrot ring guide accident before fence cannon height naive bean",
            "",
            0,
        )
        .unwrap();

        assert_eq!(
            hex::encode(d.keypair.secret_key().to_secret_bytes()),
            "7f7ff03d123792d6ac594bfa67bf6d0c0ab55b6b1fdb6249303fe861f1ccba9a"
        );
        assert_eq!(
            d.keypair.nsec().unwrap(),
            "nsec10allq0gjx7fddtzef0ax00mdps9t2kmtrldkyjfs8l5xruwvh2dq0lhhkp"
        );
        assert_eq!(
            d.keypair.pubkey_hex(),
            "17162c921dc4d2518f9a101db33695df1afb56ab82f5ff3e5da6eec3ca5cd917"
        );
        assert_eq!(
            d.keypair.npub().unwrap(),
            "npub1zutzeysacnf9rru6zqwmxd54mud0k44tst6l70ja5mhv8jjumytsd2x7nu"
        );
        assert_eq!(d.path, "m/44'/1237'/0'/0/0");
    }

    /// Scenario 1: the official all-"abandon" mnemonic at account 0 produces
    /// a 128-char lowercase hex seed and an npub starting with "npub1".
    #[test]
    fn test_scenario_derive_and_sign_seed_shape() {
        let d = derive_keypair_from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
            0,
        )
        .unwrap();
        assert_eq!(d.seed_hex.len(), 128);
        assert!(d.seed_hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(d.keypair.npub().unwrap().starts_with("npub1"));
    }

    #[test]
    fn test_different_mnemonics_different_keys() {
        let a = derive_keypair_from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
            0,
        )
        .unwrap();
        let b = derive_keypair_from_mnemonic(
            "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong",
            "",
            0,
        )
        .unwrap();
        assert_ne!(a.keypair.pubkey_hex(), b.keypair.pubkey_hex());
    }

    #[test]
    fn test_passphrase_changes_keys() {
        let no_pass = derive_keypair_from_mnemonic(
            "leader monkey parrot ring guide accident before fence cannon height naive bean",
            "",
            0,
        )
        .unwrap();
        let with_pass = derive_keypair_from_mnemonic(
            "leader monkey parrot ring guide accident before fence cannon height naive bean",
            "secret passphrase",
            0,
        )
        .unwrap();
        assert_ne!(no_pass.keypair.pubkey_hex(), with_pass.keypair.pubkey_hex());
    }

    #[test]
    fn test_path_independence_different_accounts_different_pubkeys() {
        let a0 = derive_keypair_from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
            0,
        )
        .unwrap();
        let a1 = derive_keypair_from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
            1,
        )
        .unwrap();
        assert_ne!(a0.keypair.pubkey_hex(), a1.keypair.pubkey_hex());
    }

    #[test]
    fn test_negative_account_index_rejected() {
        let result = derive_keypair_from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
            -1,
        );
        assert!(matches!(result, Err(KeyError::InvalidAccountIndex)));
    }

    #[test]
    fn test_nsec_roundtrip() {
        let generated = generate_keypair();
        let nsec = generated.nsec().unwrap();
        let restored = derive_keypair_from_nsec(&nsec).unwrap();
        assert_eq!(generated.pubkey_hex(), restored.pubkey_hex());
    }

    #[test]
    fn test_nsec_wrong_prefix_rejected() {
        let result = derive_keypair_from_nsec(
            "npub1zutzeysacnf9rru6zqwmxd54mud0k44tst6l70ja5mhv8jjumytsd2x7nu",
        );
        assert!(matches!(result, Err(KeyError::InvalidEncoding)));
    }
}
