//! Resource and identifier model.
//!
//! Every resource registered in a manifest carries two object identifiers:
//! - a *reference identifier* for its `PBXFileReference` object, and
//! - a *build identifier* for its `PBXBuildFile` object.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the identifiers Xcode uses as object keys.
pub const OBJECT_ID_LEN: usize = 24;

/// How many fresh identifiers [`IdAllocator`] tries before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 64;

/// Produce a 24-character uppercase hexadecimal identifier from a random v4 UUID.
pub fn generate_object_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    id.truncate(OBJECT_ID_LEN);
    id
}

/// Whether `text` looks like an Xcode object identifier.
pub fn is_object_id(text: &str) -> bool {
    text.len() == OBJECT_ID_LEN && text.chars().all(|c| c.is_ascii_hexdigit())
}

/// Hands out identifiers that collide neither with each other nor with the
/// identifiers already present in a manifest.
pub struct IdAllocator {
    used: HashSet<String>,
    generator: Box<dyn FnMut() -> String>,
}

impl IdAllocator {
    /// Allocator seeded with the identifiers already in use.
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_generator(existing, generate_object_id)
    }

    /// Same as [`IdAllocator::new`] with a custom identifier source.
    pub fn with_generator<I, S>(existing: I, generator: impl FnMut() -> String + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            used: existing.into_iter().map(Into::into).collect(),
            generator: Box::new(generator),
        }
    }

    /// Next unused identifier, or `None` when the source keeps colliding.
    pub fn allocate(&mut self) -> Option<String> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let candidate = (self.generator)();
            if self.used.insert(candidate.clone()) {
                return Some(candidate);
            }
            log::debug!("identifier {candidate} already in use; drawing another");
        }
        None
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}

/// A resource registered in a manifest, with both of its identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    /// File name, also used as the reference's `path`.
    pub name: String,
    /// Key of the `PBXFileReference` object.
    pub reference_id: String,
    /// Key of the `PBXBuildFile` object.
    pub build_id: String,
}

impl ResourceFile {
    pub fn new(
        name: impl Into<String>,
        reference_id: impl Into<String>,
        build_id: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), reference_id: reference_id.into(), build_id: build_id.into() }
    }

    /// Comment Xcode attaches to the build file and its phase entry.
    pub fn build_comment(&self) -> String {
        build_comment(&self.name)
    }
}

/// `"<name> in Resources"`, the annotation of a resources build file.
pub fn build_comment(name: &str) -> String {
    format!("{name} in Resources")
}

/// Default `lastKnownFileType` for a resource file name.
pub fn file_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "caf" => "audio",
        "wav" => "audio.wav",
        "mp3" => "audio.mp3",
        "aif" | "aiff" => "audio.aiff",
        _ => "file",
    }
}
