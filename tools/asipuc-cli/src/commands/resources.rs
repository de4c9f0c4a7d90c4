//! Manage fonts, backgrounds and logos.

use std::path::PathBuf;

use asipuc_storage::resources::ResourceKind;

use super::Context;

pub fn list(ctx: &Context, kind: Option<String>) -> anyhow::Result<()> {
    let library = ctx.library();
    let kinds = match kind {
        Some(kind) => vec![parse_kind(&kind)?],
        None => ResourceKind::ALL.to_vec(),
    };

    for kind in kinds {
        let entries = library
            .list_available(kind)
            .map_err(|e| anyhow::anyhow!("Failed to list {kind} resources: {e}"))?;
        println!("{} ({}):", kind.folder(), entries.len());
        for entry in entries {
            println!("  {:<32} {:<7} {}", entry.name, format!("{:?}", entry.origin), entry.url);
        }
    }
    Ok(())
}

pub fn add(ctx: &Context, kind: String, path: PathBuf) -> anyhow::Result<()> {
    let kind = parse_kind(&kind)?;
    let library = ctx.library();
    library
        .ensure_dirs()
        .map_err(|e| anyhow::anyhow!("Failed to create resource folders: {e}"))?;
    let entry = library
        .import(kind, &path)
        .map_err(|e| anyhow::anyhow!("Failed to import {}: {e}", path.display()))?;
    println!("Added {kind} {} ({})", entry.name, entry.url);
    Ok(())
}

pub fn remove(ctx: &Context, url: String) -> anyhow::Result<()> {
    ctx.library()
        .delete(&url)
        .map_err(|e| anyhow::anyhow!("Failed to delete resource: {e}"))?;
    println!("Deleted {url}");
    Ok(())
}

fn parse_kind(raw: &str) -> anyhow::Result<ResourceKind> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Failed to parse resource kind: {e}"))
}
