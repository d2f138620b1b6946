//! NoString Core
//!
//! Cryptographic primitives for the NoString engine: NIP-06 key derivation
//! from a BIP-39 seed, NIP-01 event construction and Schnorr signing, NIP-04
//! legacy direct-message encryption, and NIP-17/NIP-59 sealed gift-wrap
//! envelopes.
//!
//! # Key Derivation
//!
//! From a single BIP-39 seed, Nostr keys are derived via NIP-06:
//! `m/44'/1237'/{account}'/0/0`.

pub mod crypto;
pub mod events;
pub mod keys;
pub mod memory;
pub mod nip04;
pub mod nip17;
pub mod password;
pub mod seed;

pub use events::*;
pub use keys::*;
pub use seed::*;
