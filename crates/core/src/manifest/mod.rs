//! Typed view over a parsed `project.pbxproj`.
//!
//! `Manifest` owns the top-level dictionary and answers the structural
//! questions the patcher needs: which objects exist, which group or build
//! phase to anchor on, and which references already name a resource.

use crate::pbx::{self, Atom, Dict, ParseError, Value};

pub const ISA_BUILD_FILE: &str = "PBXBuildFile";
pub const ISA_FILE_REFERENCE: &str = "PBXFileReference";
pub const ISA_GROUP: &str = "PBXGroup";
pub const ISA_VARIANT_GROUP: &str = "PBXVariantGroup";
pub const ISA_NATIVE_TARGET: &str = "PBXNativeTarget";
pub const ISA_RESOURCES_PHASE: &str = "PBXResourcesBuildPhase";

/// `productType` of an app target, as opposed to test bundles or extensions.
pub const PRODUCT_TYPE_APPLICATION: &str = "com.apple.product-type.application";

/// Display name of a resources build phase.
pub const RESOURCES_PHASE_NAME: &str = "Resources";

/// A parsed project manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    root: Dict,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Self { root: pbx::parse(text)? })
    }

    pub fn from_root(root: Dict) -> Self {
        Self { root }
    }

    /// Serialize back to Xcode's textual layout.
    pub fn to_text(&self) -> String {
        pbx::write(&self.root)
    }

    pub fn root(&self) -> &Dict {
        &self.root
    }

    pub fn objects(&self) -> Option<&Dict> {
        self.root.get("objects").and_then(Value::as_dict)
    }

    fn objects_mut(&mut self) -> Option<&mut Dict> {
        self.root.get_mut("objects").and_then(Value::as_dict_mut)
    }

    pub fn has_objects(&self) -> bool {
        self.objects().is_some()
    }

    pub fn object(&self, id: &str) -> Option<&Dict> {
        self.objects()?.get(id).and_then(Value::as_dict)
    }

    pub fn isa(&self, id: &str) -> Option<&str> {
        self.object(id)?.get_str("isa")
    }

    /// Keys of every object in the manifest.
    pub fn object_ids(&self) -> Vec<String> {
        self.objects()
            .map(|objects| objects.iter().map(|entry| entry.key.text.clone()).collect())
            .unwrap_or_default()
    }

    /// All objects of the given isa, in manifest order, with their keys.
    pub fn objects_of_isa<'a>(
        &'a self,
        isa: &'a str,
    ) -> impl Iterator<Item = (&'a Atom, &'a Dict)> + 'a {
        self.objects().into_iter().flat_map(move |objects| {
            objects.iter().filter_map(move |entry| {
                let dict = entry.value.as_dict()?;
                (dict.get_str("isa") == Some(isa)).then_some((&entry.key, dict))
            })
        })
    }

    /// Append an object at the end of its section. Returns `false` when the
    /// manifest has no `objects` dictionary.
    pub fn add_object(&mut self, key: Atom, object: Dict) -> bool {
        match self.objects_mut() {
            Some(objects) => {
                objects.insert(key, Value::Dict(object));
                true
            }
            None => false,
        }
    }

    /// Identifiers listed in `object[key]`, or `None` if that is not an array.
    pub fn list_ids(&self, object_id: &str, key: &str) -> Option<Vec<&str>> {
        let items = self.object(object_id)?.get(key)?.as_array()?;
        Some(items.iter().filter_map(Value::as_str).collect())
    }

    /// Mutable handle on the `object[key]` array.
    pub fn list_mut(&mut self, object_id: &str, key: &str) -> Option<&mut Vec<Value>> {
        self.objects_mut()?
            .get_mut(object_id)?
            .as_dict_mut()?
            .get_mut(key)?
            .as_array_mut()
    }

    /// Locate a group by object key; only `PBXGroup`/`PBXVariantGroup` objects qualify.
    pub fn find_group_by_id(&self, id: &str) -> Option<String> {
        matches!(self.isa(id), Some(ISA_GROUP | ISA_VARIANT_GROUP)).then(|| id.to_string())
    }

    /// Locate the first group whose `name`, `path`, or key comment equals `name`.
    pub fn find_group_by_name(&self, name: &str) -> Option<String> {
        self.objects_of_isa(ISA_GROUP)
            .find(|(key, group)| {
                group.get_str("name") == Some(name)
                    || group.get_str("path") == Some(name)
                    || key.comment.as_deref() == Some(name)
            })
            .map(|(key, _)| key.text.clone())
    }

    pub fn find_resources_phase_by_id(&self, id: &str) -> Option<String> {
        (self.isa(id) == Some(ISA_RESOURCES_PHASE)).then(|| id.to_string())
    }

    /// The resources build phase listed in the named native target's `buildPhases`.
    pub fn resources_phase_of_target(&self, target: &str) -> Option<String> {
        let (key, _) =
            self.objects_of_isa(ISA_NATIVE_TARGET).find(|(_, t)| t.get_str("name") == Some(target))?;
        self.resources_phase_of(&key.text)
    }

    fn resources_phase_of(&self, target_id: &str) -> Option<String> {
        self.list_ids(target_id, "buildPhases")?
            .into_iter()
            .find(|phase| self.isa(phase) == Some(ISA_RESOURCES_PHASE))
            .map(str::to_string)
    }

    /// Resources phase of the application target.
    ///
    /// With exactly one native target of product type
    /// `com.apple.product-type.application`, that target's resources phase.
    /// With several application targets there is no default. Without any,
    /// the first phase annotated or named `Resources`, else the only one.
    pub fn default_resources_phase(&self) -> Option<String> {
        let apps: Vec<&Atom> = self
            .objects_of_isa(ISA_NATIVE_TARGET)
            .filter(|(_, target)| target.get_str("productType") == Some(PRODUCT_TYPE_APPLICATION))
            .map(|(key, _)| key)
            .collect();
        match apps.as_slice() {
            [app] => return self.resources_phase_of(&app.text),
            [] => {}
            _ => {
                log::debug!("{} application targets; no default resources phase", apps.len());
                return None;
            }
        }

        let phases: Vec<(&Atom, &Dict)> = self.objects_of_isa(ISA_RESOURCES_PHASE).collect();
        let named = phases.iter().find(|(key, phase)| {
            key.comment.as_deref() == Some(RESOURCES_PHASE_NAME)
                || phase.get_str("name") == Some(RESOURCES_PHASE_NAME)
        });
        match (named, phases.as_slice()) {
            (Some((key, _)), _) => Some(key.text.clone()),
            (None, [(key, _)]) => Some(key.text.clone()),
            _ => None,
        }
    }

    /// Keys of file references whose `path` (or `name`) equals `name`.
    pub fn file_references_named(&self, name: &str) -> Vec<String> {
        self.objects_of_isa(ISA_FILE_REFERENCE)
            .filter(|(_, file)| {
                file.get_str("path") == Some(name) || file.get_str("name") == Some(name)
            })
            .map(|(key, _)| key.text.clone())
            .collect()
    }

    /// Keys of build files pointing at the given file reference.
    pub fn build_files_for(&self, reference_id: &str) -> Vec<String> {
        self.objects_of_isa(ISA_BUILD_FILE)
            .filter(|(_, build)| build.get_str("fileRef") == Some(reference_id))
            .map(|(key, _)| key.text.clone())
            .collect()
    }

    /// How many times `id` appears in `object[key]`; zero if that list is absent.
    pub fn count_in_list(&self, object_id: &str, key: &str, id: &str) -> usize {
        self.list_ids(object_id, key)
            .map(|items| items.into_iter().filter(|listed| *listed == id).count())
            .unwrap_or(0)
    }
}
