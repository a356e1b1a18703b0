use std::fs;

use anyhow::{anyhow, Context, Result};
use pbxpatch_core::patch::PatchConfig;

use crate::{canonicalize_or_current, resolve_under_root, DEFAULT_CONFIG_FILE};

/// Write the built-in configuration as YAML so it can be edited.
pub fn init_config_command(root: &str, path: Option<&str>, force: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let config_path = resolve_under_root(&root_path, path.unwrap_or(DEFAULT_CONFIG_FILE));

    if config_path.exists() && !force {
        return Err(anyhow!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
    }

    let config = PatchConfig::default();
    let body = if config_path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::to_string_pretty(&config).context("Failed to serialize config to JSON")?
    } else {
        serde_yaml::to_string(&config).context("Failed to serialize config to YAML")?
    };
    fs::write(&config_path, body)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    println!("Wrote patch config:");
    println!("  Path: {}", config_path.display());
    println!("  Manifest: {}", config.manifest);
    println!("  Resources: {}", config.resource_names().join(", "));

    Ok(())
}
