//! Canonical JSON + RSA-SHA256-PKCS1v15 detached signature over a file-hash
//! list (C7). No corpus file in the retrieval pack signs anything with RSA
//! (the teacher's own signing is all Schnorr, via `nostr-sdk`'s `Keys`), so
//! this module is grounded directly on the spec's own wire format and the
//! `rsa` crate's own documented `sign`/`verify` API rather than an existing
//! usage site -- noted here rather than papered over.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("canonical serialization failed")]
    Serialization,
    #[error("signing failed")]
    SigningFailed,
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("signature is not valid base64")]
    InvalidSignatureEncoding,
}

/// One file entry: its address and the hex-encoded SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub url: String,
    pub sha256: String,
}

/// The part of the manifest that gets signed: `{version, files}`, in
/// caller-provided order, with no key sorting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBody {
    pub version: String,
    pub files: Vec<FileEntry>,
}

/// The full manifest as shipped over the wire: body plus its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedManifest {
    pub version: String,
    pub files: Vec<FileEntry>,
    pub signature: String,
}

impl SignedManifest {
    pub fn body(&self) -> ManifestBody {
        ManifestBody { version: self.version.clone(), files: self.files.clone() }
    }
}

/// `json_encode({version, files}, no_whitespace)`. `serde_json::to_string`
/// already emits no extra whitespace and preserves struct field order and
/// `Vec` element order, so this is the canonical form with no further
/// normalization needed.
pub fn canonical_json(body: &ManifestBody) -> Result<String, ManifestError> {
    serde_json::to_string(body).map_err(|_| ManifestError::Serialization)
}

fn digest(canonical: &str) -> Vec<u8> {
    Sha256::digest(canonical.as_bytes()).to_vec()
}

/// Sign `body` with a 2048-bit RSA private key, returning a base64 PKCS#1
/// v1.5 signature. Deterministic: same body + same key always produces the
/// same signature, since PKCS#1 v1.5 has no randomized padding.
pub fn sign(body: &ManifestBody, private_key: &RsaPrivateKey) -> Result<SignedManifest, ManifestError> {
    let canonical = canonical_json(body)?;
    let hashed = digest(&canonical);
    let sig = private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
        .map_err(|_| ManifestError::SigningFailed)?;
    Ok(SignedManifest { version: body.version.clone(), files: body.files.clone(), signature: BASE64.encode(sig) })
}

/// Recompute the canonical form from `manifest`'s `{version, files}` and
/// verify its signature against `public_key`. Any mutation of `version` or
/// any `files` entry invalidates the signature, since it changes the
/// canonical bytes that were actually signed.
pub fn verify(manifest: &SignedManifest, public_key: &RsaPublicKey) -> Result<(), ManifestError> {
    let canonical = canonical_json(&manifest.body())?;
    let hashed = digest(&canonical);
    let sig = BASE64.decode(&manifest.signature).map_err(|_| ManifestError::InvalidSignatureEncoding)?;
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, &sig)
        .map_err(|_| ManifestError::InvalidSignature)
}
