//! Cache command: inspect or clean the local carrier cache

use unibin_registry::CarrierCache;

use crate::output::StyledOutput;

pub fn ls() -> anyhow::Result<()> {
    let cache = CarrierCache::open_default()?;
    let names = cache.list()?;
    if names.is_empty() {
        println!("carrier cache is empty ({})", cache.root().display());
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn clean() -> anyhow::Result<()> {
    let mut out = StyledOutput::auto();
    let cache = CarrierCache::open_default()?;
    cache.clear()?;
    out.success(&format!("cleared {}", cache.root().display()));
    Ok(())
}
