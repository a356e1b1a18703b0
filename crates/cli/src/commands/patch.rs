use anyhow::{Context, Result};
use chrono::Utc;
use pbxpatch_core::patch::{patch_file, EntryState, FileOptions, ResourceOutcome};
use serde::Serialize;

use crate::commands::{load_config_and_manifest, ConfigOverrides};
use crate::{canonicalize_or_current, display_relative};

#[derive(Debug, Serialize)]
pub struct PatchSnapshot {
    pub tool_version: String,
    pub manifest: String,
    pub patched_at: String,
    pub dry_run: bool,
    pub written: bool,
    pub backup: Option<String>,
    pub digest_before: String,
    pub digest_after: String,
    pub group_id: Option<String>,
    pub build_phase_id: Option<String>,
    pub skipped: Vec<String>,
    pub resources: Vec<ResourceOutcome>,
}

fn state_label(state: EntryState) -> &'static str {
    match state {
        EntryState::Added => "added",
        EntryState::Existing => "present",
        EntryState::Skipped => "skipped",
    }
}

/// Register the configured resources in the manifest under `root`.
pub fn patch_command(
    root: &str,
    config_file: Option<&str>,
    overrides: &ConfigOverrides,
    options: FileOptions,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, manifest_path) = load_config_and_manifest(&root_path, config_file, overrides)?;
    log::debug!("patching {} with {} resources", manifest_path.display(), config.resources.len());

    let outcome = patch_file(&manifest_path, &config, options)
        .with_context(|| format!("Failed to patch manifest at {}", manifest_path.display()))?;
    let report = &outcome.report;

    if json {
        let snapshot = PatchSnapshot {
            tool_version: pbxpatch_core::version().to_string(),
            manifest: outcome.path.display().to_string(),
            patched_at: Utc::now().to_rfc3339(),
            dry_run: options.dry_run,
            written: outcome.written,
            backup: outcome.backup.as_ref().map(|p| p.display().to_string()),
            digest_before: outcome.digest_before.clone(),
            digest_after: outcome.digest_after.clone(),
            group_id: report.group_id.clone(),
            build_phase_id: report.build_phase_id.clone(),
            skipped: report.skipped.clone(),
            resources: report.resources.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let manifest_display = display_relative(&root_path, &outcome.path);
    if !report.changed() {
        println!("Xcode project already up to date: {manifest_display}");
    } else if outcome.written {
        println!("Successfully added resources to Xcode project: {manifest_display}");
    } else {
        println!("Dry run, not written: {manifest_display}");
    }
    if let Some(group) = &report.group_id {
        println!("  Group: {group}");
    }
    if let Some(phase) = &report.build_phase_id {
        println!("  Build phase: {phase}");
    }
    if let Some(backup) = &outcome.backup {
        println!("  Backup: {}", display_relative(&root_path, backup));
    }
    for skipped in &report.skipped {
        println!("  Skipped: {skipped} not found");
    }

    println!("Resources ({}):", report.resources.len());
    for item in &report.resources {
        let res = &item.resource;
        println!(
            "  - {} (FileRef: {} [{}], BuildFile: {} [{}], group: {}, phase: {})",
            res.name,
            res.reference_id,
            state_label(item.file_reference),
            res.build_id,
            state_label(item.build_file),
            state_label(item.group_child),
            state_label(item.phase_file),
        );
    }

    Ok(())
}
