//! NIP-01 event construction and Schnorr signing.
//!
//! Event `id` is `sha256([0, pubkey, created_at, kind, tags, content])`; `sig`
//! is the BIP-340 Schnorr signature over that id. Both are computed by
//! `nostr_sdk::EventBuilder::sign_with_keys`, not re-derived here.

use nostr_sdk::{Event, EventBuilder, Kind, PublicKey, Tag};
use thiserror::Error;

use crate::keys::Keypair;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("event signing failed")]
    SigningFailed,
}

/// Build and sign a kind-4 legacy encrypted direct message.
///
/// `ciphertext` is the already-NIP-04-encrypted content; this function only
/// wraps it in a signed event addressed to `recipient` via a `p` tag.
pub fn build_kind4_event(
    ciphertext: &str,
    sender: &Keypair,
    recipient: &PublicKey,
) -> Result<Event, EventError> {
    EventBuilder::new(Kind::EncryptedDirectMessage, ciphertext)
        .tag(Tag::public_key(*recipient))
        .sign_with_keys(sender.nostr_keys())
        .map_err(|_| EventError::SigningFailed)
}

/// Verify an event's `id` matches its contents and its `sig` is valid for `pubkey`.
pub fn verify_event(event: &Event) -> bool {
    event.verify().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    #[test]
    fn test_build_kind4_event_is_valid_and_addressed() {
        let sender = generate_keypair();
        let recipient = generate_keypair();

        let event = build_kind4_event("ciphertext-blob", &sender, &recipient.public_key()).unwrap();

        assert_eq!(event.kind, Kind::EncryptedDirectMessage);
        assert_eq!(event.pubkey, sender.public_key());
        assert_eq!(event.content, "ciphertext-blob");
        assert!(event.tags.iter().any(|t| t.content() == Some(recipient.pubkey_hex().as_str())));
        assert!(verify_event(&event));
    }

    #[test]
    fn test_tampered_content_fails_verification() {
        let sender = generate_keypair();
        let recipient = generate_keypair();
        let mut event = build_kind4_event("original", &sender, &recipient.public_key()).unwrap();
        event.content = "tampered".to_string();
        assert!(!verify_event(&event));
    }
}
