//! Show or initialise the configuration file.

use asipuc_common::config::{config_file_path, AppConfig};

use super::Context;

pub fn run(ctx: &Context, init: bool) -> anyhow::Result<()> {
    let path = config_file_path();

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            AppConfig::default()
                .save_to(&path)
                .map_err(|e| anyhow::anyhow!("Failed to write config {}: {e}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    Ok(())
}
