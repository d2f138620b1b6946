//! NIP-04 legacy direct-message encryption: AES-256-CBC over an ECDH shared
//! secret. Superseded by NIP-17/NIP-44 but kept for interop with older
//! clients (see [`crate::nip17`] for the modern path).
//!
//! Decryption never propagates an error to the caller: wrong key, corrupt
//! ciphertext, and malformed framing all collapse to `None`, so a listener
//! scanning a relay firehose for messages addressed to it can try every
//! event without matching on error variants.

use nostr_sdk::nips::nip04;
use nostr_sdk::{PublicKey, SecretKey};

/// Encrypt `plaintext` for `their_pubkey` using our `our_secret`.
///
/// Returns `"<base64 ciphertext>?iv=<base64 iv>"` per NIP-04.
pub fn encrypt_nip04(plaintext: &str, our_secret: &SecretKey, their_pubkey: &PublicKey) -> Option<String> {
    nip04::encrypt(our_secret, their_pubkey, plaintext).ok()
}

/// Decrypt NIP-04 `content` sent by `their_pubkey` to us.
///
/// Never errors: any failure (bad base64, wrong key, missing `?iv=`
/// separator, invalid padding) is logged at the pubkey level only and
/// surfaced as `None`.
pub fn decrypt_nip04(content: &str, our_secret: &SecretKey, their_pubkey: &PublicKey) -> Option<String> {
    match nip04::decrypt(our_secret, their_pubkey, content) {
        Ok(plaintext) => Some(plaintext),
        Err(e) => {
            log::debug!("nip04 decrypt failed for sender {}: {}", their_pubkey.to_hex(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    #[test]
    fn test_nip04_roundtrip() {
        let alice = generate_keypair();
        let bob = generate_keypair();

        let encrypted = encrypt_nip04("hello bob", alice.secret_key(), &bob.public_key()).unwrap();
        let decrypted = decrypt_nip04(&encrypted, bob.secret_key(), &alice.public_key()).unwrap();
        assert_eq!(decrypted, "hello bob");
    }

    #[test]
    fn test_nip04_wrong_key_returns_none() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let mallory = generate_keypair();

        let encrypted = encrypt_nip04("secret", alice.secret_key(), &bob.public_key()).unwrap();
        let result = decrypt_nip04(&encrypted, mallory.secret_key(), &alice.public_key());
        assert!(result.is_none());
    }

    #[test]
    fn test_nip04_malformed_content_returns_none() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let result = decrypt_nip04("not-valid-nip04-content", bob.secret_key(), &alice.public_key());
        assert!(result.is_none());
    }
}
