//! Key command - print the build-state cache key of a manifest

use crate::cache::{derive_key, BuildTarget, CacheKey};
use crate::cli::args::KeyArgs;
use crate::error::FlatterResult;
use crate::flatpak::ManifestFormat;

/// Execute the key command
pub async fn execute(args: KeyArgs) -> FlatterResult<()> {
    match resolve(&args).await? {
        Some(key) => println!("{}", key),
        None => eprintln!("Caching disabled (empty base key)"),
    }
    Ok(())
}

async fn resolve(args: &KeyArgs) -> FlatterResult<Option<CacheKey>> {
    ManifestFormat::from_path(&args.manifest)?;

    let arch = args
        .arch
        .clone()
        .unwrap_or_else(|| std::env::consts::ARCH.to_string());
    derive_key(&args.base_key, &BuildTarget::new(&args.manifest, arch)).await
}
