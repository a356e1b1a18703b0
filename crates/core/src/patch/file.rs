use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::manifest::Manifest;
use crate::patch::{patch_manifest, PatchConfig, PatchError, PatchOptions, PatchReport, PatchResult};

/// Options for patching a manifest on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    pub patch: PatchOptions,
    /// Compute the result without writing it.
    pub dry_run: bool,
    /// Copy the original to `<file>.bak` before overwriting it.
    pub backup: bool,
}

/// Result of [`patch_file`].
#[derive(Debug, Clone)]
pub struct FilePatchOutcome {
    pub path: PathBuf,
    pub report: PatchReport,
    /// Whether the manifest on disk was rewritten.
    pub written: bool,
    pub backup: Option<PathBuf>,
    pub digest_before: String,
    pub digest_after: String,
    /// The patched manifest text (identical to the input when nothing changed).
    pub text: String,
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `<file>.bak` next to the manifest.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Read and parse a manifest, returning it with its raw text.
pub fn read_manifest(path: &Path) -> PatchResult<(Manifest, String)> {
    let text = fs::read_to_string(path)
        .map_err(|source| PatchError::Read { path: path.to_path_buf(), source })?;
    let manifest = Manifest::parse(&text)
        .map_err(|source| PatchError::Parse { path: path.to_path_buf(), source })?;
    Ok((manifest, text))
}

/// Read, patch, and (unless nothing changed or `dry_run` is set) atomically
/// rewrite the manifest at `path`.
pub fn patch_file(
    path: &Path,
    config: &PatchConfig,
    options: FileOptions,
) -> PatchResult<FilePatchOutcome> {
    let (mut manifest, original) = read_manifest(path)?;
    let digest_before = sha256_hex(original.as_bytes());

    let report = patch_manifest(&mut manifest, config, options.patch)?;
    let text = if report.changed() { manifest.to_text() } else { original };
    let digest_after = sha256_hex(text.as_bytes());

    let mut outcome = FilePatchOutcome {
        path: path.to_path_buf(),
        report,
        written: false,
        backup: None,
        digest_before,
        digest_after,
        text,
    };
    if !outcome.report.changed() {
        log::info!("{} already registers every resource; nothing to write", path.display());
        return Ok(outcome);
    }
    if options.dry_run {
        log::info!("dry run: leaving {} untouched", path.display());
        return Ok(outcome);
    }

    let current = ensure_unchanged(path, &outcome.digest_before)?;

    if options.backup {
        let backup = backup_path(path);
        fs::write(&backup, &current)
            .map_err(|source| PatchError::Write { path: backup.clone(), source })?;
        log::info!("backed up {} to {}", path.display(), backup.display());
        outcome.backup = Some(backup);
    }

    write_atomic(path, outcome.text.as_bytes())?;
    outcome.written = true;
    log::info!("wrote {} ({} -> {})", path.display(), outcome.digest_before, outcome.digest_after);
    Ok(outcome)
}

/// Re-read `path` and return its bytes if they still hash to `digest`.
fn ensure_unchanged(path: &Path, digest: &str) -> PatchResult<Vec<u8>> {
    let current = fs::read(path)
        .map_err(|source| PatchError::Read { path: path.to_path_buf(), source })?;
    if sha256_hex(&current) != digest {
        return Err(PatchError::ConcurrentModification(path.to_path_buf()));
    }
    Ok(current)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> PatchResult<()> {
    let write_err = |source: std::io::Error| PatchError::Write { path: path.to_path_buf(), source };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    // Temp files are created owner-only; keep the manifest's own mode.
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions()).map_err(write_err)?;
    }
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
