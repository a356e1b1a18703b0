use serde::Serialize;

use crate::manifest::Manifest;
use crate::patch::{resolve_build_phase, resolve_group, PatchConfig};

/// Cross-check of how a resource is registered in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAudit {
    pub name: String,
    /// `PBXFileReference` keys naming the resource.
    pub reference_ids: Vec<String>,
    /// Occurrences of those keys in the selected group's `children`.
    pub group_memberships: usize,
    /// `PBXBuildFile` keys pointing at any of the references.
    pub build_ids: Vec<String>,
    /// Occurrences of those keys in the selected build phase's `files`.
    pub phase_memberships: usize,
}

impl ResourceAudit {
    /// Exactly one of each piece: one reference, listed once, with one build
    /// file listed once in the selected build phase.
    pub fn is_consistent(&self) -> bool {
        self.reference_ids.len() == 1
            && self.group_memberships == 1
            && self.build_ids.len() == 1
            && self.phase_memberships == 1
    }

    pub fn is_registered(&self) -> bool {
        !self.reference_ids.is_empty()
    }
}

/// Count every registration piece for each configured resource.
///
/// Group and phase memberships are counted in the anchors `config` resolves
/// to, so an entry listed only in some other target's phase does not count.
pub fn audit_resources(manifest: &Manifest, config: &PatchConfig) -> Vec<ResourceAudit> {
    let group_id = resolve_group(manifest, &config.group);
    let phase_id = resolve_build_phase(manifest, &config.build_phase);
    let listed = |anchor: &Option<String>, key: &str, id: &str| {
        anchor.as_deref().map_or(0, |anchor| manifest.count_in_list(anchor, key, id))
    };

    config
        .resource_names()
        .into_iter()
        .map(|name| {
            let reference_ids = manifest.file_references_named(&name);
            let group_memberships =
                reference_ids.iter().map(|id| listed(&group_id, "children", id.as_str())).sum();
            let build_ids: Vec<String> =
                reference_ids.iter().flat_map(|id| manifest.build_files_for(id)).collect();
            let phase_memberships =
                build_ids.iter().map(|id| listed(&phase_id, "files", id.as_str())).sum();
            ResourceAudit { name, reference_ids, group_memberships, build_ids, phase_memberships }
        })
        .collect()
}
