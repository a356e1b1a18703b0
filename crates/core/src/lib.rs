//! pbxpatch-core
//!
//! Core library for registering bundled resource files in Xcode project
//! manifests (`project.pbxproj`).
//!
//! This crate holds the manifest grammar (parser, editable tree, writer), the
//! identifier model, patch configuration, the patch procedure itself, and a
//! registration audit. Frontends (the `pbxpatch` CLI) stay thin so all of the
//! behaviour here is testable without spawning a process.

pub mod manifest;
pub mod model;
pub mod patch;
pub mod pbx;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
