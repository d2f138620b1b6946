//! The daemon loop: load or derive the identity, start the relay pool,
//! subscribe for inbound gift-wrapped events, route P2P signals to the
//! coordinator, and keep the image cache ready for external fetchers.

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use nostr_sdk::{Event, Filter, Kind};
use nostring_cache::ImageCache;
use nostring_core::nip17::unwrap_message;
use nostring_core::{derive_keypair_from_seed, generate_mnemonic_24, parse_mnemonic, Keypair};
use nostring_relay::RelayPool;
use nostring_secrets::{SecretStore, SeedStore};
use nostring_signaling::Coordinator;
use std::sync::Arc;

/// Derivation material for this daemon's identity. Kept instead of a single
/// `Keypair` since `Keypair` has no `Clone` -- every collaborator that needs
/// its own copy of the identity derives one afresh from the seed, which is a
/// pure, deterministic, CPU-only operation (spec §5: "C1 ... pure CPU, no
/// suspension").
struct IdentityMaterial {
    seed: [u8; 64],
    path: String,
}

impl IdentityMaterial {
    fn derive(&self) -> Keypair {
        derive_keypair_from_seed(&self.seed, &self.path)
            .expect("seed/path were validated at load time")
    }
}

/// Run the daemon: blocks forever until the caller's select arm (ctrl-c) wins.
pub async fn run(config: ServerConfig) -> Result<()> {
    log::info!("NoString server starting…");
    log::info!("  Data dir:  {}", config.server.data_dir.display());
    log::info!("  Relays:    {}", config.relays.urls.join(", "));
    log::info!("  P2P:       {}", config.p2p.enabled);
    log::info!("  Cache cap: {} bytes", config.cache.max_cache_size_bytes);

    std::fs::create_dir_all(&config.server.data_dir)
        .with_context(|| format!("failed to create data dir: {}", config.server.data_dir.display()))?;

    let identity = Arc::new(load_or_create_identity(&config)?);
    log::info!("identity pubkey: {}", identity.derive().pubkey_hex());

    let pool = Arc::new(RelayPool::new());
    for url in &config.relays.urls {
        pool.add_relay(url).await;
    }

    let signaling_db = config.server.data_dir.join("p2p_sessions.sqlite");
    let coordinator = Arc::new(
        Coordinator::new(identity.derive(), pool.clone(), &signaling_db, config.p2p.enabled)
            .context("failed to open P2P session store")?,
    );

    {
        let coordinator = coordinator.clone();
        let identity = identity.clone();
        pool.set_event_handler(move |relay_url, event| {
            let coordinator = coordinator.clone();
            let identity = identity.clone();
            tokio::spawn(async move {
                handle_inbound_event(&coordinator, &identity, &relay_url, event).await;
            });
        })
        .await;
    }

    let my_pubkey = identity.derive().public_key();
    let inbound_filter = Filter::new().kind(Kind::GiftWrap).pubkey(my_pubkey);
    let _subscription = pool.subscribe(vec![inbound_filter]).await;

    let cache_dir = config.server.data_dir.join("image_cache");
    let cache = ImageCache::initialize(cache_dir.clone(), config.cache.max_cache_size_bytes)
        .await
        .with_context(|| format!("failed to initialize image cache at {}", cache_dir.display()))?;
    let stats = cache.stats().await;
    log::info!("image cache ready: {} entries, {} bytes", stats.entry_count, stats.total_size);
    // `cache` stays alive for the rest of this function (past the pending
    // await below) so a future adapter (HTTP handler, IPC, ...) can be
    // wired to it without restructuring this loop; nothing in this engine's
    // scope drives image fetches itself (spec §1: image-fetch HTTP client
    // details are an external collaborator).

    if let Some(manifest) = &config.manifest {
        if manifest.signing_key_path.exists() {
            log::info!("manifest signing key present at {}", manifest.signing_key_path.display());
        } else {
            log::warn!(
                "manifest signing key configured but missing on disk: {}",
                manifest.signing_key_path.display()
            );
        }
    }

    log::info!("daemon ready; awaiting inbound events");
    std::future::pending::<()>().await;
    Ok(())
}

/// Route one inbound event: first offer it to the P2P signaling coordinator
/// (it discriminates signaling traffic from everything else by event kind
/// and session id), then fall back to logging a plain gift-wrapped DM.
async fn handle_inbound_event(coordinator: &Coordinator, identity: &IdentityMaterial, relay_url: &str, event: Event) {
    match coordinator.handle_inbound_event(&event).await {
        Ok(true) => return,
        Ok(false) => {}
        Err(e) => {
            log::error!("signaling coordinator rejected event from {relay_url}: {e}");
            return;
        }
    }

    if event.kind != Kind::GiftWrap {
        return;
    }
    let keys = identity.derive();
    if let Some(msg) = unwrap_message(&event, &keys) {
        log::info!(
            "inbound DM from {} via {relay_url}: {} bytes",
            msg.sender_pubkey.to_hex(),
            msg.plaintext.len()
        );
    }
}

/// Load this identity's seed from the secret store, generating and
/// persisting a fresh one on first run if none exists yet.
fn load_or_create_identity(config: &ServerConfig) -> Result<IdentityMaterial> {
    let secrets = SecretStore::new("nostring");
    let seeds = SeedStore::new(secrets);
    let identity_id = &config.identity.id;

    let seed_hex = match seeds.get_seed(identity_id).context("seed store unavailable")? {
        Some(hex) => hex,
        None => {
            let mnemonic = match &config.identity.mnemonic {
                Some(words) => parse_mnemonic(words).context("configured mnemonic is invalid")?,
                None => {
                    log::info!("no seed on file for identity '{identity_id}', generating a new one");
                    generate_mnemonic_24().context("mnemonic generation failed")?
                }
            };
            let seed = nostring_core::derive_seed(&mnemonic, &config.identity.passphrase);
            let seed_hex = hex::encode(seed);
            seeds.save_seed(identity_id, &seed_hex).context("failed to persist derived seed")?;
            seed_hex
        }
    };

    let seed_bytes: [u8; 64] = hex::decode(&seed_hex)
        .ok()
        .and_then(|v| v.try_into().ok())
        .context("stored seed is not valid 64-byte hex")?;
    let path = format!("m/44'/1237'/{}'/0/0", config.identity.account_index);
    // Validate the derivation succeeds once here so `IdentityMaterial::derive`
    // can unconditionally expect it later.
    derive_keypair_from_seed(&seed_bytes, &path).context("seed/path does not derive a valid keypair")?;

    Ok(IdentityMaterial { seed: seed_bytes, path })
}
