use anyhow::{anyhow, Context, Result};
use pbxpatch_core::patch::{audit_resources, read_manifest, ResourceAudit};

use crate::commands::{load_config_and_manifest, ConfigOverrides};
use crate::{canonicalize_or_current, display_relative};

fn audit_line(audit: &ResourceAudit) -> String {
    let verdict = if audit.is_consistent() {
        "OK"
    } else if audit.is_registered() {
        "INCONSISTENT"
    } else {
        "MISSING"
    };
    format!(
        "- {}: {} (refs: {}, groups: {}, build files: {}, phases: {})",
        audit.name,
        verdict,
        audit.reference_ids.len(),
        audit.group_memberships,
        audit.build_ids.len(),
        audit.phase_memberships
    )
}

/// Cross-check how every configured resource is registered.
///
/// Fails when any resource is missing or registered more or less than once.
pub fn status_command(
    root: &str,
    config_file: Option<&str>,
    overrides: &ConfigOverrides,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, manifest_path) = load_config_and_manifest(&root_path, config_file, overrides)?;
    let (manifest, _) = read_manifest(&manifest_path)
        .with_context(|| format!("Failed to read manifest at {}", manifest_path.display()))?;

    let audits = audit_resources(&manifest, &config);
    let broken = audits.iter().filter(|a| !a.is_consistent()).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&audits)?);
    } else {
        println!("Manifest: {}", display_relative(&root_path, &manifest_path));
        println!("Resources ({}):", audits.len());
        for audit in &audits {
            println!("  {}", audit_line(audit));
        }
    }

    if broken > 0 {
        return Err(anyhow!(
            "{} of {} resources are not registered exactly once",
            broken,
            audits.len()
        ));
    }
    Ok(())
}
