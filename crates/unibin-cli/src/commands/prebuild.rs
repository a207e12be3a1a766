//! Prebuild command: compile and cache a carrier
//!
//! Drives the build orchestrator over an unpacked runtime source tree,
//! reserving a placeholder for the requested bucket, then stores the result
//! in the local cache and optionally publishes it to the remote store.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use unibin_builder::CarrierBuild;
use unibin_core::BucketMb;
use unibin_registry::{Arch, CarrierCache, CarrierId, CarrierRegistry, Platform, RemoteStore};

use crate::output::StyledOutput;

/// Environment variable holding the remote store upload token.
const UPLOAD_TOKEN_ENV: &str = "UNIBIN_TOKEN";

#[derive(Debug)]
pub struct PrebuildOptions {
    pub source_dir: PathBuf,
    pub runtime: String,
    pub size: String,
    pub bootstrap: PathBuf,
    pub patch_dir: Option<PathBuf>,
    pub upload: bool,
}

pub fn run(options: PrebuildOptions) -> anyhow::Result<()> {
    let mut out = StyledOutput::auto();

    let bucket = BucketMb::new(super::build::parse_size_mb(&options.size)?)?;
    let id = CarrierId::new(
        Platform::current(),
        Arch::current(),
        options.runtime.clone(),
        bucket,
    );

    let mut build = CarrierBuild::new(id.clone(), &options.source_dir);
    if let Some(patch_dir) = &options.patch_dir {
        build.patches = list_patches(patch_dir)?;
    }

    let bootstrap_entry = fs::read(&options.bootstrap)
        .with_context(|| format!("failed to read {}", options.bootstrap.display()))?;

    out.status(&format!("building carrier {} (this can take a while)", id));
    let carrier = build.produce(&bootstrap_entry)?;

    let cache = CarrierCache::open_default()?;
    let remote = if options.upload {
        let token = std::env::var(UPLOAD_TOKEN_ENV)
            .with_context(|| format!("{} must be set to upload", UPLOAD_TOKEN_ENV))?;
        Some(RemoteStore::new()?.with_auth_token(token))
    } else {
        None
    };
    let registry = CarrierRegistry::new(cache, remote);
    registry.store(&id, &carrier, options.upload)?;

    out.success(&format!("carrier {} cached ({} bytes)", id, carrier.len()));
    Ok(())
}

/// Collect `*.patch` files from a directory in a stable order.
fn list_patches(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut patches = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "patch") {
            patches.push(path);
        }
    }
    patches.sort();
    Ok(patches)
}
