//! Scenario 6 (spec §8): a manifest listing two files verifies under the
//! paired public key; flipping one character of a file's hash breaks the
//! signature check.

use nostring_manifest::{sign, verify, FileEntry, ManifestBody};
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

#[test]
fn manifest_verify_and_tamper_detection() {
    let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let public_key = RsaPublicKey::from(&private_key);

    let body = ManifestBody {
        version: "1.0.0".to_string(),
        files: vec![
            FileEntry { url: "a.zip".to_string(), sha256: "a".repeat(64) },
            FileEntry { url: "b.zip".to_string(), sha256: "b".repeat(64) },
        ],
    };

    let manifest = sign(&body, &private_key).unwrap();
    assert!(verify(&manifest, &public_key).is_ok());

    let mut tampered = manifest.clone();
    let last = tampered.files[1].sha256.pop().unwrap();
    let flipped = if last == 'b' { 'c' } else { 'b' };
    tampered.files[1].sha256.push(flipped);

    assert!(verify(&tampered, &public_key).is_err());
}
