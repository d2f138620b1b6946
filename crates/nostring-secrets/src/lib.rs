//! OS-keychain-backed secret storage.
//!
//! [`SecretStore`] (C2) persists opaque ciphertext under a caller-chosen
//! reference, encrypting with a vault key that itself lives in the OS
//! keychain -- the same belt-and-suspenders pattern as encrypting
//! credentials before handing them to the platform secret service, rather
//! than trusting the service's own at-rest encryption alone. [`SeedStore`]
//! (C3) is a thin validating wrapper over it for the one seed-shaped secret
//! this engine persists per identity.

pub mod secret_store;
pub mod seed_store;

pub use secret_store::{SecretError, SecretStore};
pub use seed_store::{SeedError, SeedStore};
