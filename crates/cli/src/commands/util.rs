use std::path::{Path, PathBuf};

use anyhow::Result;
use pbxpatch_core::patch::{
    load_patch_config, GroupSelector, PatchConfig, PhaseSelector, ResourceDescriptor,
};

use crate::{resolve_under_root, DEFAULT_CONFIG_FILE};

/// Command-line values that override the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub manifest: Option<String>,
    /// Replaces the configured resource list when non-empty.
    pub resources: Vec<String>,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub phase_id: Option<String>,
    pub target: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut PatchConfig) {
        if let Some(manifest) = &self.manifest {
            config.manifest = manifest.clone();
        }
        if !self.resources.is_empty() {
            config.resources = self.resources.iter().map(ResourceDescriptor::new).collect();
        }
        if self.group_id.is_some() || self.group_name.is_some() {
            config.group =
                GroupSelector { id: self.group_id.clone(), name: self.group_name.clone() };
        }
        if self.phase_id.is_some() || self.target.is_some() {
            config.build_phase =
                PhaseSelector { id: self.phase_id.clone(), target: self.target.clone() };
        }
    }
}

/// Load the effective configuration.
///
/// Precedence: explicit `--config` file (relative to `root`), then
/// `<root>/pbxpatch.yaml` if present, then built-in defaults; command-line
/// overrides are applied last.
pub fn load_config(
    root: &Path,
    config_file: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<PatchConfig> {
    let mut config = match config_file {
        Some(file) => load_patch_config(&resolve_under_root(root, file))?,
        None => {
            let implicit = root.join(DEFAULT_CONFIG_FILE);
            if implicit.is_file() {
                log::debug!("using configuration at {}", implicit.display());
                load_patch_config(&implicit)?
            } else {
                PatchConfig::default()
            }
        }
    };
    overrides.apply(&mut config);
    Ok(config)
}

/// Effective configuration plus the absolute manifest path it points at.
pub fn load_config_and_manifest(
    root: &Path,
    config_file: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<(PatchConfig, PathBuf)> {
    let config = load_config(root, config_file, overrides)?;
    let manifest = resolve_under_root(root, &config.manifest);
    Ok((config, manifest))
}
