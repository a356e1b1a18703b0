//! Registering resources in a manifest.
//!
//! The procedure is an upsert: for every configured resource it makes sure
//! that
//! - a `PBXFileReference` names the file,
//! - a `PBXBuildFile` points at that reference,
//! - the reference is a child of the selected group, and
//! - the build file is listed in the selected resources build phase,
//!
//! creating only the pieces that are missing. Running it twice is a no-op.
//!
//! Anchors (group and build phase) are resolved before anything is touched,
//! so a strict run that cannot find one leaves the manifest unchanged.

mod audit;
mod config;
mod file;

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::manifest::{Manifest, ISA_BUILD_FILE, ISA_FILE_REFERENCE};
use crate::model::{build_comment, IdAllocator, ResourceFile, MAX_ALLOCATION_ATTEMPTS};
use crate::pbx::{Atom, Dict, ParseError, Value};

pub use audit::{audit_resources, ResourceAudit};
pub use config::{
    load_patch_config, GroupSelector, PatchConfig, PhaseSelector, ResourceDescriptor,
    DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME, DEFAULT_MANIFEST_PATH, DEFAULT_RESOURCES,
};
pub use file::{backup_path, patch_file, read_manifest, sha256_hex, FileOptions, FilePatchOutcome};

/// Error type for patch operations.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("manifest has no top-level `objects` dictionary")]
    MissingObjects,

    #[error("group not found ({0})")]
    GroupNotFound(String),

    #[error("resources build phase not found ({0})")]
    BuildPhaseNotFound(String),

    #[error("object {id} has no `{key}` list")]
    MissingList { id: String, key: &'static str },

    #[error("invalid patch configuration: {0}")]
    InvalidConfig(String),

    #[error("no unused object identifier after {0} attempts")]
    IdsExhausted(usize),

    /// The file on disk no longer matches what was read at the start.
    #[error("{0} changed on disk while it was being patched; nothing was written")]
    ConcurrentModification(PathBuf),
}

/// Convenience result type for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// Knobs for [`patch_manifest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Skip (and report) a missing group or build phase instead of failing.
    pub allow_partial: bool,
}

/// What happened to one piece of a resource's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Added,
    Existing,
    Skipped,
}

/// Per-resource result of a patch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    #[serde(flatten)]
    pub resource: ResourceFile,
    pub file_reference: EntryState,
    pub build_file: EntryState,
    pub group_child: EntryState,
    pub phase_file: EntryState,
}

impl ResourceOutcome {
    pub fn changed(&self) -> bool {
        [self.file_reference, self.build_file, self.group_child, self.phase_file]
            .contains(&EntryState::Added)
    }
}

/// Summary of a patch run over an in-memory manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub group_id: Option<String>,
    pub build_phase_id: Option<String>,
    pub resources: Vec<ResourceOutcome>,
    /// Human-readable descriptions of anchors that were skipped.
    pub skipped: Vec<String>,
}

impl PatchReport {
    pub fn changed(&self) -> bool {
        self.resources.iter().any(ResourceOutcome::changed)
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Resolve the group selector against the manifest: id first, then name.
pub fn resolve_group(manifest: &Manifest, selector: &GroupSelector) -> Option<String> {
    selector
        .id
        .as_deref()
        .and_then(|id| manifest.find_group_by_id(id))
        .or_else(|| selector.name.as_deref().and_then(|name| manifest.find_group_by_name(name)))
}

/// Resolve the build phase selector: explicit id, then target, then default.
pub fn resolve_build_phase(manifest: &Manifest, selector: &PhaseSelector) -> Option<String> {
    match (&selector.id, &selector.target) {
        (Some(id), _) => manifest.find_resources_phase_by_id(id),
        (None, Some(target)) => manifest.resources_phase_of_target(target),
        (None, None) => manifest.default_resources_phase(),
    }
}

/// Register every configured resource in `manifest`, adding only what is missing.
pub fn patch_manifest(
    manifest: &mut Manifest,
    config: &PatchConfig,
    options: PatchOptions,
) -> PatchResult<PatchReport> {
    let ids = IdAllocator::new(manifest.object_ids());
    patch_with_ids(manifest, config, options, ids)
}

fn patch_with_ids(
    manifest: &mut Manifest,
    config: &PatchConfig,
    options: PatchOptions,
    mut ids: IdAllocator,
) -> PatchResult<PatchReport> {
    config.validate()?;
    if !manifest.has_objects() {
        return Err(PatchError::MissingObjects);
    }

    let mut skipped = Vec::new();
    let group_id = resolve_group(manifest, &config.group);
    if group_id.is_none() {
        let what = config.group.describe();
        if !options.allow_partial {
            return Err(PatchError::GroupNotFound(what));
        }
        log::warn!("group not found ({what}); group membership will be skipped");
        skipped.push(format!("group ({what})"));
    }
    let build_phase_id = resolve_build_phase(manifest, &config.build_phase);
    if build_phase_id.is_none() {
        let what = config.build_phase.describe();
        if !options.allow_partial {
            return Err(PatchError::BuildPhaseNotFound(what));
        }
        log::warn!("resources build phase not found ({what}); phase membership will be skipped");
        skipped.push(format!("build phase ({what})"));
    }
    for (id, key) in [(&group_id, "children"), (&build_phase_id, "files")] {
        if let Some(id) = id {
            if manifest.list_ids(id, key).is_none() {
                return Err(PatchError::MissingList { id: id.clone(), key });
            }
        }
    }

    let mut resources = Vec::with_capacity(config.resources.len());
    for descriptor in &config.resources {
        let outcome = upsert_resource(
            manifest,
            descriptor,
            group_id.as_deref(),
            build_phase_id.as_deref(),
            &mut ids,
        )?;
        log::debug!(
            "{}: reference {} ({:?}), build file {} ({:?})",
            outcome.resource.name,
            outcome.resource.reference_id,
            outcome.file_reference,
            outcome.resource.build_id,
            outcome.build_file
        );
        resources.push(outcome);
    }

    Ok(PatchReport { group_id, build_phase_id, resources, skipped })
}

fn allocate(ids: &mut IdAllocator) -> PatchResult<String> {
    ids.allocate().ok_or(PatchError::IdsExhausted(MAX_ALLOCATION_ATTEMPTS))
}

fn upsert_resource(
    manifest: &mut Manifest,
    descriptor: &ResourceDescriptor,
    group_id: Option<&str>,
    phase_id: Option<&str>,
    ids: &mut IdAllocator,
) -> PatchResult<ResourceOutcome> {
    let name = descriptor.name.trim();

    let (reference_id, file_reference) = match manifest.file_references_named(name).first() {
        Some(existing) => (existing.clone(), EntryState::Existing),
        None => {
            let id = allocate(ids)?;
            let object = Dict::new()
                .with("isa", Value::string(ISA_FILE_REFERENCE))
                .with("lastKnownFileType", Value::string(descriptor.file_type()))
                .with("path", Value::string(name))
                .with("sourceTree", Value::string("<group>"));
            manifest.add_object(Atom::with_comment(&id, name), object);
            (id, EntryState::Added)
        }
    };

    let build_files = manifest.build_files_for(&reference_id);
    let in_phase = phase_id.and_then(|phase| {
        let listed = manifest.list_ids(phase, "files")?;
        build_files.iter().find(|id| listed.contains(&id.as_str())).cloned()
    });
    let (build_id, build_file) = match in_phase.or_else(|| build_files.first().cloned()) {
        Some(existing) => (existing, EntryState::Existing),
        None => {
            let id = allocate(ids)?;
            let object = Dict::new()
                .with("isa", Value::string(ISA_BUILD_FILE))
                .with("fileRef", Value::reference(&reference_id, name));
            manifest.add_object(Atom::with_comment(&id, build_comment(name)), object);
            (id, EntryState::Added)
        }
    };

    let group_child = append_member(manifest, group_id, "children", &reference_id, name);
    let phase_file = append_member(manifest, phase_id, "files", &build_id, &build_comment(name));

    Ok(ResourceOutcome {
        resource: ResourceFile::new(name, reference_id, build_id),
        file_reference,
        build_file,
        group_child,
        phase_file,
    })
}

/// Append `id` to `object[key]` unless it is already listed.
fn append_member(
    manifest: &mut Manifest,
    object_id: Option<&str>,
    key: &'static str,
    id: &str,
    comment: &str,
) -> EntryState {
    let Some(object_id) = object_id else {
        return EntryState::Skipped;
    };
    let Some(list) = manifest.list_mut(object_id, key) else {
        return EntryState::Skipped;
    };
    if list.iter().any(|item| item.as_str() == Some(id)) {
        return EntryState::Existing;
    }
    list.push(Value::reference(id, comment));
    EntryState::Added
}
