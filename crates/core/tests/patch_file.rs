use std::fs;

use pbxpatch_core::patch::{
    backup_path, load_patch_config, patch_file, sha256_hex, FileOptions, PatchConfig, PatchError,
};
use tempfile::tempdir;

const RUNNER: &str = include_str!("fixtures/Runner.pbxproj");

#[test]
fn patch_file_rewrites_once_then_leaves_the_file_alone() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.pbxproj");
    fs::write(&path, RUNNER).expect("write fixture");
    let config = PatchConfig::default();

    let first = patch_file(&path, &config, FileOptions::default()).expect("first patch");
    assert!(first.written);
    assert_eq!(first.digest_before, sha256_hex(RUNNER.as_bytes()));
    let on_disk = fs::read_to_string(&path).expect("read patched");
    assert_eq!(on_disk, first.text);
    assert_eq!(sha256_hex(on_disk.as_bytes()), first.digest_after);

    let second = patch_file(&path, &config, FileOptions::default()).expect("second patch");
    assert!(!second.written);
    assert!(!second.report.changed());
    assert_eq!(second.digest_before, second.digest_after);
    assert_eq!(fs::read_to_string(&path).expect("read again"), on_disk);
}

#[test]
fn dry_run_does_not_write() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.pbxproj");
    fs::write(&path, RUNNER).expect("write fixture");

    let options = FileOptions { dry_run: true, ..FileOptions::default() };
    let outcome = patch_file(&path, &PatchConfig::default(), options).expect("dry run");
    assert!(!outcome.written);
    assert!(outcome.report.changed());
    assert!(outcome.text.contains("alarm_1.caf in Resources"));
    assert_eq!(fs::read_to_string(&path).expect("read"), RUNNER);
}

#[test]
fn backup_keeps_the_original_text() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.pbxproj");
    fs::write(&path, RUNNER).expect("write fixture");

    let options = FileOptions { backup: true, ..FileOptions::default() };
    let outcome = patch_file(&path, &PatchConfig::default(), options).expect("patch");
    let backup = outcome.backup.expect("backup path");
    assert_eq!(backup, backup_path(&path));
    assert_eq!(fs::read_to_string(&backup).expect("read backup"), RUNNER);
    assert_ne!(fs::read_to_string(&path).expect("read patched"), RUNNER);
}

#[test]
fn missing_manifest_is_a_read_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.pbxproj");
    let err = patch_file(&path, &PatchConfig::default(), FileOptions::default()).unwrap_err();
    assert!(matches!(err, PatchError::Read { .. }), "unexpected error: {err}");
    assert!(!path.exists());
}

#[test]
fn corrupt_manifest_is_a_parse_error_and_untouched() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.pbxproj");
    let corrupt = RUNNER.replacen("isa = PBXGroup;", "isa = PBXGroup", 1);
    fs::write(&path, &corrupt).expect("write corrupt");

    let err = patch_file(&path, &PatchConfig::default(), FileOptions::default()).unwrap_err();
    match err {
        PatchError::Parse { source, .. } => assert!(source.line > 1),
        other => panic!("expected parse error, got {other}"),
    }
    assert_eq!(fs::read_to_string(&path).expect("read"), corrupt);
}

#[test]
fn loads_yaml_and_json_configs() {
    let dir = tempdir().expect("tempdir");
    let yaml = dir.path().join("sounds.yaml");
    fs::write(
        &yaml,
        "manifest: App.xcodeproj/project.pbxproj\nresources:\n  - ding.wav\ngroup:\n  name: App\n",
    )
    .expect("write yaml");
    let config = load_patch_config(&yaml).expect("load yaml");
    assert_eq!(config.manifest, "App.xcodeproj/project.pbxproj");
    assert_eq!(config.resource_names(), vec!["ding.wav"]);
    assert_eq!(config.group.id, None);
    assert_eq!(config.group.name.as_deref(), Some("App"));

    let json = dir.path().join("sounds.json");
    fs::write(&json, serde_json::to_string_pretty(&config).expect("serialize"))
        .expect("write json");
    assert_eq!(load_patch_config(&json).expect("load json"), config);

    fs::write(&json, "not-json").expect("write bad json");
    let err = load_patch_config(&json).unwrap_err();
    assert!(err.to_string().contains("Failed to parse patch config JSON"));
}
