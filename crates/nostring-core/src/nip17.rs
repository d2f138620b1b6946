//! NIP-17 private direct messages over a NIP-59 gift-wrap envelope.
//!
//! Three layers, innermost first:
//!
//! - **rumor** (kind 14): the actual message, built but never signed.
//! - **seal** (kind 13): the rumor, NIP-44-encrypted and signed by the real
//!   sender. Its `created_at` is the real send time.
//! - **gift wrap** (kind 1059): the seal, NIP-44-encrypted and signed by a
//!   throwaway ephemeral key, with a `created_at` jittered up to two days
//!   into the past so relays can't correlate send time across wraps.
//!
//! A peer unwraps by decrypting the gift wrap with its own key (recovering
//! the seal), checking the seal's signature, then decrypting the seal with
//! its own key again (recovering the rumor). The sender identity a caller
//! should trust is the seal's `pubkey`, never the gift wrap's.

use nostr_sdk::nips::nip44;
use nostr_sdk::{EventBuilder, Kind, PublicKey, Tag, Timestamp, UnsignedEvent};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::Keypair;

const TWO_DAYS_SECS: u64 = 172_800;

/// Private-range rumor kind for P2P signaling payloads, distinct from kind
/// 14 (regular DMs) so an unwrapped message's `kind` field alone tells a
/// caller which handler it belongs to (spec §6: "a private kind range for
/// P2P signaling"). The signaling coordinator itself still keys routing off
/// `session_id`, never this kind.
pub const SIGNALING_KIND: u16 = 30_100;

#[derive(Error, Debug)]
pub enum GiftWrapError {
    #[error("rumor content must not be empty")]
    EmptyContent,
    #[error("recipient key is invalid")]
    InvalidRecipient,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("signing failed")]
    SigningFailed,
}

/// A fully unwrapped NIP-17 message: the rumor's content plus the identity
/// and timing metadata a caller needs to act on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedMessage {
    pub sender_pubkey: PublicKey,
    pub plaintext: String,
    pub rumor_id: Option<String>,
    pub created_at: u64,
    pub kind: u16,
}

/// Structured payload carried over a NIP-17 gift wrap for WebRTC signaling
/// (see `nostring-signaling`). Kept here, not in the signaling crate, since
/// it rides the same envelope this module builds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocalSignal {
    Offer(String),
    Answer(String),
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u32>,
    },
}

fn jittered_past_timestamp() -> Timestamp {
    let now = Timestamp::now();
    let jitter = rand::thread_rng().gen_range(0..TWO_DAYS_SECS);
    Timestamp::from(now.as_u64().saturating_sub(jitter))
}

fn build_rumor(kind: Kind, content: &str, tags: Vec<Tag>, sender: &Keypair) -> UnsignedEvent {
    let mut builder = EventBuilder::new(kind, content);
    for tag in tags {
        builder = builder.tag(tag);
    }
    builder.build(sender.public_key())
}

fn seal_rumor(rumor: &UnsignedEvent, sender: &Keypair, recipient: &PublicKey) -> Result<nostr_sdk::Event, GiftWrapError> {
    let rumor_json = serde_json::to_string(rumor).map_err(|_| GiftWrapError::EncryptionFailed)?;
    let encrypted = nip44::encrypt(sender.secret_key(), recipient, &rumor_json, nip44::Version::V2)
        .map_err(|_| GiftWrapError::EncryptionFailed)?;
    EventBuilder::new(Kind::Seal, encrypted)
        .custom_created_at(Timestamp::now())
        .sign_with_keys(sender.nostr_keys())
        .map_err(|_| GiftWrapError::SigningFailed)
}

fn wrap_seal(seal: &nostr_sdk::Event, recipient: &PublicKey) -> Result<nostr_sdk::Event, GiftWrapError> {
    let ephemeral = crate::keys::generate_keypair();
    let seal_json = serde_json::to_string(seal).map_err(|_| GiftWrapError::EncryptionFailed)?;
    let encrypted = nip44::encrypt(ephemeral.secret_key(), recipient, &seal_json, nip44::Version::V2)
        .map_err(|_| GiftWrapError::EncryptionFailed)?;
    EventBuilder::new(Kind::GiftWrap, encrypted)
        .tag(Tag::public_key(*recipient))
        .custom_created_at(jittered_past_timestamp())
        .sign_with_keys(ephemeral.nostr_keys())
        .map_err(|_| GiftWrapError::SigningFailed)
}

/// Build a gift-wrapped NIP-17 message addressed to `recipient`.
///
/// Returns the gift-wrap event ready to publish. Does not touch the network
/// or a relay pool; that is `nostring-relay`'s job.
pub fn wrap_message(
    plaintext: &str,
    sender: &Keypair,
    recipient: &PublicKey,
) -> Result<nostr_sdk::Event, GiftWrapError> {
    wrap_rumor(Kind::PrivateDirectMessage, plaintext, sender, recipient)
}

fn wrap_rumor(
    kind: Kind,
    plaintext: &str,
    sender: &Keypair,
    recipient: &PublicKey,
) -> Result<nostr_sdk::Event, GiftWrapError> {
    if plaintext.is_empty() {
        return Err(GiftWrapError::EmptyContent);
    }
    let tags = vec![Tag::public_key(*recipient)];
    let rumor = build_rumor(kind, plaintext, tags, sender);
    let seal = seal_rumor(&rumor, sender, recipient)?;
    wrap_seal(&seal, recipient)
}

/// A signal plus the P2P session id it belongs to -- the wire payload a
/// signaling coordinator actually exchanges (spec §4.5: `{session_id, kind,
/// sdp?, candidate?}`). `LocalSignal` alone has no way to route an inbound
/// event to the right session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub session_id: String,
    #[serde(flatten)]
    pub signal: LocalSignal,
}

/// Build a gift-wrapped signal payload for WebRTC signaling.
pub fn wrap_signal(
    session_id: &str,
    signal: &LocalSignal,
    sender: &Keypair,
    recipient: &PublicKey,
) -> Result<nostr_sdk::Event, GiftWrapError> {
    let envelope = SignalEnvelope { session_id: session_id.to_string(), signal: signal.clone() };
    let payload = serde_json::to_string(&envelope).map_err(|_| GiftWrapError::EncryptionFailed)?;
    wrap_rumor(Kind::Custom(SIGNALING_KIND), &payload, sender, recipient)
}

/// Unwrap a gift-wrapped NIP-17 event addressed to us.
///
/// Returns `None` (not an error) whenever the wrap wasn't meant for us, was
/// corrupted, or the seal's signature doesn't check out -- callers scanning
/// a relay subscription for gift wraps should try every kind-1059 event they
/// see without special-casing failures.
pub fn unwrap_message(gift_wrap: &nostr_sdk::Event, our: &Keypair) -> Option<UnwrappedMessage> {
    if gift_wrap.kind != Kind::GiftWrap {
        return None;
    }
    let seal_json = nip44::decrypt(our.secret_key(), &gift_wrap.pubkey, &gift_wrap.content).ok()?;
    let seal: nostr_sdk::Event = serde_json::from_str(&seal_json).ok()?;
    if seal.kind != Kind::Seal || seal.verify().is_err() {
        return None;
    }
    let rumor_json = nip44::decrypt(our.secret_key(), &seal.pubkey, &seal.content).ok()?;
    let rumor: UnsignedEvent = serde_json::from_str(&rumor_json).ok()?;
    if rumor.pubkey != seal.pubkey {
        log::warn!("rumor pubkey does not match seal pubkey; dropping gift wrap {}", gift_wrap.id);
        return None;
    }
    Some(UnwrappedMessage {
        sender_pubkey: seal.pubkey,
        plaintext: rumor.content.clone(),
        rumor_id: rumor.id.map(|id| id.to_hex()),
        created_at: rumor.created_at.as_u64(),
        kind: rumor.kind.as_u16(),
    })
}

/// Unwrap a gift-wrapped signal envelope. Returns `None` on any failure,
/// including a body that doesn't deserialize as a `SignalEnvelope`.
pub fn unwrap_signal(gift_wrap: &nostr_sdk::Event, our: &Keypair) -> Option<(PublicKey, SignalEnvelope)> {
    let msg = unwrap_message(gift_wrap, our)?;
    if msg.kind != SIGNALING_KIND {
        return None;
    }
    let envelope: SignalEnvelope = serde_json::from_str(&msg.plaintext).ok()?;
    Some((msg.sender_pubkey, envelope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    #[test]
    fn test_gift_wrap_roundtrip() {
        let alice = generate_keypair();
        let bob = generate_keypair();

        let wrap = wrap_message("hello bob", &alice, &bob.public_key()).unwrap();
        assert_eq!(wrap.kind, Kind::GiftWrap);

        let unwrapped = unwrap_message(&wrap, &bob).unwrap();
        assert_eq!(unwrapped.plaintext, "hello bob");
        assert_eq!(unwrapped.sender_pubkey, alice.public_key());
        assert_eq!(unwrapped.kind, 14);
    }

    #[test]
    fn test_wrong_recipient_cannot_unwrap() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let mallory = generate_keypair();

        let wrap = wrap_message("secret", &alice, &bob.public_key()).unwrap();
        assert!(unwrap_message(&wrap, &mallory).is_none());
        assert!(unwrap_message(&wrap, &bob).is_some());
    }

    #[test]
    fn test_empty_content_rejected() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let result = wrap_message("", &alice, &bob.public_key());
        assert!(matches!(result, Err(GiftWrapError::EmptyContent)));
    }

    #[test]
    fn test_gift_wrap_pubkey_is_ephemeral_not_sender() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let wrap = wrap_message("hi", &alice, &bob.public_key()).unwrap();
        assert_ne!(wrap.pubkey, alice.public_key());
    }

    #[test]
    fn test_signal_roundtrip() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let signal = LocalSignal::IceCandidate {
            candidate: "candidate:1 1 UDP 2122260223 10.0.0.1 5000 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
        };
        let wrap = wrap_signal("session-123", &signal, &alice, &bob.public_key()).unwrap();
        let (sender, envelope) = unwrap_signal(&wrap, &bob).unwrap();
        assert_eq!(sender, alice.public_key());
        assert_eq!(envelope.session_id, "session-123");
        assert_eq!(envelope.signal, signal);
    }

    #[test]
    fn test_tampered_gift_wrap_fails_closed() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let mut wrap = wrap_message("hello", &alice, &bob.public_key()).unwrap();
        wrap.content = "not-valid-nip44-payload".to_string();
        assert!(unwrap_message(&wrap, &bob).is_none());
    }
}
