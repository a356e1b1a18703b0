use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::file_type_for;
use crate::patch::PatchError;

/// Manifest location used when no configuration says otherwise.
pub const DEFAULT_MANIFEST_PATH: &str = "ios/Runner.xcodeproj/project.pbxproj";

/// Key of the `Runner` group in projects generated by `flutter create`.
pub const DEFAULT_GROUP_ID: &str = "97C146F01CF9000F007C117D";

pub const DEFAULT_GROUP_NAME: &str = "Runner";

/// Sounds bundled by default.
pub const DEFAULT_RESOURCES: [&str; 3] = ["alarm_1.caf", "chime_1.caf", "bell_1.caf"];

/// A resource to register: its file name and optional `lastKnownFileType`.
///
/// Deserializes from either a bare string or `{ name, file_type }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDescriptor")]
pub struct ResourceDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        file_type: Option<String>,
    },
}

impl From<RawDescriptor> for ResourceDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        match raw {
            RawDescriptor::Name(name) => Self::new(name),
            RawDescriptor::Full { name, file_type } => Self { file_type, ..Self::new(name) },
        }
    }
}

impl ResourceDescriptor {
    /// Surrounding whitespace is dropped from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into().trim().to_string(), file_type: None }
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    /// Explicit type, or the default derived from the extension.
    pub fn file_type(&self) -> &str {
        self.file_type.as_deref().unwrap_or_else(|| file_type_for(&self.name))
    }
}

/// Which group receives the new file references.
///
/// The id is tried first, then the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GroupSelector {
    pub fn describe(&self) -> String {
        describe_selector(&[("id", &self.id), ("name", &self.name)])
    }
}

/// Which resources build phase receives the new build files.
///
/// With neither field set, the project's `Resources` phase is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl PhaseSelector {
    pub fn describe(&self) -> String {
        describe_selector(&[("id", &self.id), ("target", &self.target)])
    }
}

fn describe_selector(fields: &[(&str, &Option<String>)]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|&(label, value)| value.as_ref().map(|v| format!("{label}={v}")))
        .collect();
    if parts.is_empty() {
        "default".to_string()
    } else {
        parts.join(", ")
    }
}

/// Everything one patch run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Manifest path, relative to the project root unless absolute.
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Resources to register, in insertion order.
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceDescriptor>,
    #[serde(default = "default_group")]
    pub group: GroupSelector,
    #[serde(default)]
    pub build_phase: PhaseSelector,
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST_PATH.to_string()
}

fn default_resources() -> Vec<ResourceDescriptor> {
    DEFAULT_RESOURCES.iter().map(|name| ResourceDescriptor::new(*name)).collect()
}

fn default_group() -> GroupSelector {
    GroupSelector {
        id: Some(DEFAULT_GROUP_ID.to_string()),
        name: Some(DEFAULT_GROUP_NAME.to_string()),
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            resources: default_resources(),
            group: default_group(),
            build_phase: PhaseSelector::default(),
        }
    }
}

impl PatchConfig {
    pub fn resource_names(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.name.trim().to_string()).collect()
    }

    pub fn validate(&self) -> Result<(), PatchError> {
        if self.resources.is_empty() {
            return Err(PatchError::InvalidConfig("at least one resource is required".into()));
        }
        let mut seen = HashSet::new();
        for resource in &self.resources {
            let name = resource.name.trim();
            if name.is_empty() {
                return Err(PatchError::InvalidConfig("resource names must not be empty".into()));
            }
            if name.contains("*/") || name.chars().any(char::is_control) {
                return Err(PatchError::InvalidConfig(format!(
                    "resource name {name:?} cannot be written inside a manifest comment"
                )));
            }
            if !seen.insert(name) {
                return Err(PatchError::InvalidConfig(format!("duplicate resource '{name}'")));
            }
        }
        if self.group.id.is_none() && self.group.name.is_none() {
            return Err(PatchError::InvalidConfig("group needs an id or a name".into()));
        }
        Ok(())
    }
}

/// Load a patch configuration from YAML (`.yaml`/`.yml`) or JSON (`.json`).
pub fn load_patch_config(path: &Path) -> Result<PatchConfig> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read patch config at {}", path.display()))?;
    let config: PatchConfig = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&body).context("Failed to parse patch config JSON")?
    } else {
        serde_yaml::from_str(&body).context("Failed to parse patch config YAML")?
    };
    Ok(config)
}
