//! Signed manifest (C7): canonical JSON over `{version, files}` plus a
//! detached RSA-SHA256-PKCS1v15 signature.

pub mod manifest;

pub use manifest::{canonical_json, sign, verify, FileEntry, ManifestBody, ManifestError, SignedManifest};
