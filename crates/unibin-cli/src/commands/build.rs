//! Build command: patch an application into a cached carrier
//!
//! Encodes the application source, picks the capacity bucket, resolves the
//! matching carrier through the registry, patches the payload in and writes
//! the output executable next to the working directory.

use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use unibin_core::{encode, patch, select_with_override};
use unibin_registry::{Arch, CarrierCache, CarrierId, CarrierRegistry, Platform, RemoteStore};

use crate::output::StyledOutput;

#[derive(Debug)]
pub struct BuildOptions {
    pub app: PathBuf,
    pub name: Option<String>,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub runtime: String,
    pub output: Option<PathBuf>,
    pub size: Option<String>,
    /// Keep the carrier in the local cache after patching.
    pub keep_carrier: bool,
}

pub fn run(options: BuildOptions) -> anyhow::Result<()> {
    let mut out = StyledOutput::auto();

    let platform = match &options.platform {
        Some(s) => Platform::from_str(s)?,
        None => Platform::current(),
    };
    let arch = match &options.arch {
        Some(s) => Arch::from_str(s)?,
        None => Arch::current(),
    };

    let source = fs::read(&options.app)
        .with_context(|| format!("failed to read {}", options.app.display()))?;
    let app_name = options
        .name
        .clone()
        .unwrap_or_else(|| infer_app_name(&options.app));

    let encoded = encode(&app_name, &source)?;
    let override_mb = options.size.as_deref().map(parse_size_mb).transpose()?;
    let bucket = select_with_override(encoded.len(), override_mb)?;

    let id = CarrierId::new(platform, arch, options.runtime.clone(), bucket);
    out.status(&format!("using carrier {}", id));

    let cache = CarrierCache::open_default()?;
    let registry = CarrierRegistry::new(cache, Some(RemoteStore::new()?));
    let carrier = registry.resolve(&id)?;

    let patched = patch(&carrier, bucket, &encoded)?;

    let output_path = options.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!("app-{}-{}-{}", platform, arch, options.runtime))
    });
    write_executable(&output_path, &patched)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if !options.keep_carrier {
        registry.cache().remove(&id)?;
    }

    out.success(&format!(
        "wrote {} ({} bytes, app {:?})",
        output_path.display(),
        patched.len(),
        app_name
    ));
    Ok(())
}

/// Infer the application name from its main file: the file stem unless the
/// file is `index.js`, then the parent directory name, then `app_main`.
pub fn infer_app_name(app_file: &Path) -> String {
    let file_name = app_file.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if file_name != "index.js" {
        if let Some(stem) = app_file.file_stem().and_then(|s| s.to_str()) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }
    if let Some(parent) = app_file
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
    {
        if !parent.is_empty() {
            return parent.to_string();
        }
    }
    "app_main".to_string()
}

/// Parse an explicit bucket size like "4MB" (suffix optional,
/// case-insensitive).
pub fn parse_size_mb(size: &str) -> anyhow::Result<u32> {
    let digits = size.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &size.trim()[digits.len()..];
    if !suffix.is_empty() && !suffix.eq_ignore_ascii_case("mb") {
        bail!("unrecognized size suffix in {:?}, expected e.g. \"4MB\"", size);
    }
    digits
        .parse::<u32>()
        .with_context(|| format!("invalid size {:?}", size))
}

/// Write the output binary and mark it executable.
fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}
