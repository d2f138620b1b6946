//! Scenario 2 (spec §8): Alice encrypts "Hello" to Bob via NIP-04. Bob
//! decrypts it back to exactly "Hello"; a third party's decrypt yields None.

use nostring_core::generate_keypair;
use nostring_core::nip04::{decrypt_nip04, encrypt_nip04};

#[test]
fn legacy_dm_roundtrip_and_third_party_miss() {
    let alice = generate_keypair();
    let bob = generate_keypair();
    let mallory = generate_keypair();

    let ciphertext = encrypt_nip04("Hello", alice.secret_key(), &bob.public_key()).unwrap();

    let bob_plaintext = decrypt_nip04(&ciphertext, bob.secret_key(), &alice.public_key());
    assert_eq!(bob_plaintext.as_deref(), Some("Hello"));

    let mallory_plaintext = decrypt_nip04(&ciphertext, mallory.secret_key(), &alice.public_key());
    assert!(mallory_plaintext.is_none());
}
