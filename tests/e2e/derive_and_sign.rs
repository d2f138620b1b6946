//! Scenario 1 (spec §8): derive from the canonical all-"abandon" mnemonic at
//! account 0, then build and sign a kind-4 event with the result.

use nostring_core::{build_kind4_event, derive_keypair_from_mnemonic, verify_event};

const ABANDON_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

#[test]
fn derive_and_sign_end_to_end() {
    let derivation = derive_keypair_from_mnemonic(ABANDON_MNEMONIC, "", 0).unwrap();

    assert_eq!(derivation.seed_hex.len(), 128);
    assert!(derivation.seed_hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(derivation.path, "m/44'/1237'/0'/0/0");

    let npub = derivation.keypair.npub().unwrap();
    assert!(npub.starts_with("npub1"));

    let recipient = derivation.keypair.public_key();
    let event = build_kind4_event("x", &derivation.keypair, &recipient).unwrap();

    assert_eq!(event.pubkey.to_hex(), derivation.keypair.pubkey_hex());
    assert!(verify_event(&event));
}
