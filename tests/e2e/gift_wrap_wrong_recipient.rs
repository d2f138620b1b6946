//! Scenario 5 (spec §8): sender S gift-wraps a message to recipient R. An
//! attacker T who intercepts the wrap cannot unwrap it; R can, and recovers
//! both the plaintext and S's real pubkey (never the wrap's ephemeral one).

use nostring_core::generate_keypair;
use nostring_core::nip17::{unwrap_message, wrap_message};

#[test]
fn gift_wrap_wrong_recipient_fails_closed() {
    let sender = generate_keypair();
    let recipient = generate_keypair();
    let attacker = generate_keypair();

    let wrap = wrap_message("top secret", &sender, &recipient.public_key()).unwrap();

    assert!(unwrap_message(&wrap, &attacker).is_none());

    let unwrapped = unwrap_message(&wrap, &recipient).unwrap();
    assert_eq!(unwrapped.plaintext, "top secret");
    assert_eq!(unwrapped.sender_pubkey, sender.public_key());
}
