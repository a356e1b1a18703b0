use std::collections::HashSet;

use pbxpatch_core::manifest::Manifest;
use pbxpatch_core::model::is_object_id;
use pbxpatch_core::patch::{
    audit_resources, patch_manifest, EntryState, GroupSelector, PatchConfig, PatchError,
    PatchOptions, PhaseSelector, ResourceDescriptor,
};

const RUNNER: &str = include_str!("fixtures/Runner.pbxproj");
const RUNNER_GROUP: &str = "97C146F01CF9000F007C117D";
const RESOURCES_PHASE: &str = "97C146EC1CF9000F007C117D";

fn patched(config: &PatchConfig) -> (Manifest, pbxpatch_core::patch::PatchReport) {
    let mut manifest = Manifest::parse(RUNNER).expect("parse fixture");
    let report = patch_manifest(&mut manifest, config, PatchOptions::default()).expect("patch");
    (manifest, report)
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn default_sounds_gain_exactly_one_entry_of_each_kind() {
    let (manifest, report) = patched(&PatchConfig::default());
    let text = manifest.to_text();

    assert_eq!(report.group_id.as_deref(), Some(RUNNER_GROUP));
    assert_eq!(report.build_phase_id.as_deref(), Some(RESOURCES_PHASE));
    assert_eq!(report.resources.len(), 3);
    for outcome in &report.resources {
        let res = &outcome.resource;
        assert_eq!(outcome.file_reference, EntryState::Added);
        assert_eq!(outcome.build_file, EntryState::Added);
        assert_eq!(outcome.group_child, EntryState::Added);
        assert_eq!(outcome.phase_file, EntryState::Added);

        let file_ref_line = format!(
            "\t\t{} /* {} */ = {{isa = PBXFileReference; lastKnownFileType = audio; path = {}; sourceTree = \"<group>\"; }};\n",
            res.reference_id, res.name, res.name
        );
        let build_file_line = format!(
            "\t\t{} /* {} in Resources */ = {{isa = PBXBuildFile; fileRef = {} /* {} */; }};\n",
            res.build_id, res.name, res.reference_id, res.name
        );
        let child_line = format!("\t\t\t\t{} /* {} */,\n", res.reference_id, res.name);
        let phase_line = format!("\t\t\t\t{} /* {} in Resources */,\n", res.build_id, res.name);
        assert_eq!(count(&text, &file_ref_line), 1, "file reference for {}", res.name);
        assert_eq!(count(&text, &build_file_line), 1, "build file for {}", res.name);
        assert_eq!(count(&text, &child_line), 1, "group child for {}", res.name);
        assert_eq!(count(&text, &phase_line), 1, "phase file for {}", res.name);

        assert_eq!(manifest.file_references_named(&res.name), vec![res.reference_id.clone()]);
        assert_eq!(manifest.build_files_for(&res.reference_id), vec![res.build_id.clone()]);
    }
}

#[test]
fn patch_only_adds_lines() {
    let (manifest, _) = patched(&PatchConfig::default());
    let text = manifest.to_text();
    let before: Vec<&str> = RUNNER.lines().collect();
    let after: Vec<&str> = text.lines().collect();
    assert_eq!(after.len(), before.len() + 12);

    // The original lines survive in order.
    let mut remaining = after.iter();
    for line in &before {
        assert!(remaining.any(|candidate| candidate == line), "lost line: {line}");
    }
}

#[test]
fn new_objects_land_at_the_end_of_their_sections() {
    let (manifest, report) = patched(&PatchConfig::default());
    let text = manifest.to_text();
    let bell = &report.resources[2].resource;
    assert_eq!(bell.name, "bell_1.caf");
    assert!(text
        .contains("path = bell_1.caf; sourceTree = \"<group>\"; };\n/* End PBXFileReference section */"));
    assert!(text.contains(&format!(
        "fileRef = {} /* bell_1.caf */; }};\n/* End PBXBuildFile section */",
        bell.reference_id
    )));
    assert!(text.contains(&format!(
        "\t\t\t\t74858FAD1ED2DC5600515810 /* Runner-Bridging-Header.h */,\n\t\t\t\t{} /* alarm_1.caf */,\n",
        report.resources[0].resource.reference_id
    )));
}

#[test]
fn generated_identifiers_are_unique_and_fresh() {
    let existing: HashSet<String> =
        Manifest::parse(RUNNER).expect("parse fixture").object_ids().into_iter().collect();
    let (_, report) = patched(&PatchConfig::default());

    let mut seen = HashSet::new();
    for outcome in &report.resources {
        for id in [&outcome.resource.reference_id, &outcome.resource.build_id] {
            assert!(is_object_id(id), "malformed id {id}");
            assert!(!existing.contains(id), "collides with existing object {id}");
            assert!(seen.insert(id.clone()), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn second_patch_is_a_no_op() {
    let config = PatchConfig::default();
    let (mut manifest, first) = patched(&config);
    let once = manifest.to_text();

    let second = patch_manifest(&mut manifest, &config, PatchOptions::default()).expect("repatch");
    assert!(!second.changed());
    assert_eq!(manifest.to_text(), once);
    for (a, b) in first.resources.iter().zip(&second.resources) {
        assert_eq!(a.resource, b.resource);
        assert_eq!(b.file_reference, EntryState::Existing);
        assert_eq!(b.phase_file, EntryState::Existing);
    }
    assert!(audit_resources(&manifest, &config)
        .iter()
        .all(|audit| audit.is_consistent()));
}

#[test]
fn repairs_a_half_registered_resource() {
    // A reference that exists but was never added to the group or a build phase.
    let stray = "\t\t0123456789ABCDEF01234567 /* alarm_1.caf */ = {isa = PBXFileReference; lastKnownFileType = audio; path = alarm_1.caf; sourceTree = \"<group>\"; };\n/* End PBXFileReference section */";
    let text = RUNNER.replace("/* End PBXFileReference section */", stray);
    let mut manifest = Manifest::parse(&text).expect("parse");

    let config = PatchConfig {
        resources: vec![ResourceDescriptor::new("alarm_1.caf")],
        ..PatchConfig::default()
    };
    let report = patch_manifest(&mut manifest, &config, PatchOptions::default()).expect("patch");
    let outcome = &report.resources[0];
    assert_eq!(outcome.resource.reference_id, "0123456789ABCDEF01234567");
    assert_eq!(outcome.file_reference, EntryState::Existing);
    assert_eq!(outcome.build_file, EntryState::Added);
    assert_eq!(outcome.group_child, EntryState::Added);
    assert_eq!(outcome.phase_file, EntryState::Added);
    assert!(audit_resources(&manifest, &config)[0].is_consistent());
}

#[test]
fn missing_group_fails_without_touching_the_manifest() {
    let mut manifest = Manifest::parse(RUNNER).expect("parse fixture");
    let config = PatchConfig {
        group: GroupSelector { id: Some("000000000000000000000000".into()), name: None },
        ..PatchConfig::default()
    };
    let err = patch_manifest(&mut manifest, &config, PatchOptions::default()).unwrap_err();
    assert!(matches!(err, PatchError::GroupNotFound(_)), "unexpected error: {err}");
    assert_eq!(manifest.to_text(), RUNNER);
}

#[test]
fn missing_phase_is_skipped_and_reported_when_partial_is_allowed() {
    let mut manifest = Manifest::parse(RUNNER).expect("parse fixture");
    let config = PatchConfig {
        build_phase: PhaseSelector { id: None, target: Some("RunnerTests".into()) },
        ..PatchConfig::default()
    };

    let strict = patch_manifest(&mut manifest.clone(), &config, PatchOptions::default());
    assert!(matches!(strict, Err(PatchError::BuildPhaseNotFound(_))));

    let report =
        patch_manifest(&mut manifest, &config, PatchOptions { allow_partial: true }).expect("patch");
    assert!(report.is_partial());
    assert_eq!(report.skipped, vec!["build phase (target=RunnerTests)".to_string()]);
    assert!(report.resources.iter().all(|r| r.phase_file == EntryState::Skipped));
    assert!(report.resources.iter().all(|r| r.group_child == EntryState::Added));

    // Registered and grouped, but never built into the bundle.
    for audit in audit_resources(&manifest, &config) {
        assert_eq!(audit.reference_ids.len(), 1);
        assert_eq!(audit.group_memberships, 1);
        assert_eq!(audit.build_ids.len(), 1);
        assert_eq!(audit.phase_memberships, 0);
        assert!(!audit.is_consistent());
    }
}

#[test]
fn explicit_file_type_and_group_name_are_honoured() {
    let config = PatchConfig {
        resources: vec![ResourceDescriptor::new("tick.raw").with_file_type("audio.wav")],
        group: GroupSelector { id: None, name: Some("Flutter".into()) },
        build_phase: PhaseSelector { id: Some(RESOURCES_PHASE.into()), target: None },
        ..PatchConfig::default()
    };
    let (manifest, report) = patched(&config);
    let reference = &report.resources[0].resource.reference_id;
    assert_eq!(report.group_id.as_deref(), Some("9740EEB11CF90186004384FC"));
    assert_eq!(manifest.object(reference).unwrap().get_str("lastKnownFileType"), Some("audio.wav"));
    assert!(manifest
        .list_ids("9740EEB11CF90186004384FC", "children")
        .unwrap()
        .contains(&reference.as_str()));
}

#[test]
fn invalid_config_is_rejected_before_lookup() {
    let mut manifest = Manifest::parse(RUNNER).expect("parse fixture");
    let config = PatchConfig { resources: vec![], ..PatchConfig::default() };
    let err = patch_manifest(&mut manifest, &config, PatchOptions::default()).unwrap_err();
    assert!(matches!(err, PatchError::InvalidConfig(_)));
}

const RUNNER_WITH_TESTS: &str = include_str!("fixtures/RunnerWithTests.pbxproj");
const TESTS_RESOURCES_PHASE: &str = "331C807F294A63A400263BE5";

#[test]
fn default_phase_is_the_app_target_not_the_test_bundle() {
    let mut manifest = Manifest::parse(RUNNER_WITH_TESTS).expect("parse fixture");
    let config = PatchConfig::default();
    let report = patch_manifest(&mut manifest, &config, PatchOptions::default()).expect("patch");

    assert_eq!(report.build_phase_id.as_deref(), Some(RESOURCES_PHASE));
    assert_eq!(manifest.list_ids(RESOURCES_PHASE, "files").map(|f| f.len()), Some(7));
    assert_eq!(manifest.list_ids(TESTS_RESOURCES_PHASE, "files").map(|f| f.len()), Some(0));
    assert!(audit_resources(&manifest, &config).iter().all(|audit| audit.is_consistent()));
}

#[test]
fn audit_only_counts_the_selected_phase() {
    let mut manifest = Manifest::parse(RUNNER_WITH_TESTS).expect("parse fixture");
    let into_tests = PatchConfig {
        build_phase: PhaseSelector { id: None, target: Some("RunnerTests".into()) },
        ..PatchConfig::default()
    };
    let report = patch_manifest(&mut manifest, &into_tests, PatchOptions::default()).expect("patch");
    assert_eq!(report.build_phase_id.as_deref(), Some(TESTS_RESOURCES_PHASE));
    assert!(audit_resources(&manifest, &into_tests).iter().all(|audit| audit.is_consistent()));

    // Listed in the test bundle only: not part of the app.
    for audit in audit_resources(&manifest, &PatchConfig::default()) {
        assert_eq!(audit.build_ids.len(), 1);
        assert_eq!(audit.phase_memberships, 0);
        assert!(!audit.is_consistent());
    }
}

#[test]
fn several_app_targets_leave_no_default_phase() {
    let text = RUNNER_WITH_TESTS.replace(
        "com.apple.product-type.bundle.unit-test",
        "com.apple.product-type.application",
    );
    let mut manifest = Manifest::parse(&text).expect("parse");
    assert_eq!(manifest.default_resources_phase(), None);

    let err =
        patch_manifest(&mut manifest, &PatchConfig::default(), PatchOptions::default()).unwrap_err();
    assert!(matches!(err, PatchError::BuildPhaseNotFound(_)), "unexpected error: {err}");

    let by_target = PatchConfig {
        build_phase: PhaseSelector { id: None, target: Some("Runner".into()) },
        ..PatchConfig::default()
    };
    let report = patch_manifest(&mut manifest, &by_target, PatchOptions::default()).expect("patch");
    assert_eq!(report.build_phase_id.as_deref(), Some(RESOURCES_PHASE));
}

#[test]
fn names_that_would_close_a_comment_are_refused() {
    let mut manifest = Manifest::parse(RUNNER).expect("parse fixture");
    let config = PatchConfig {
        resources: vec![ResourceDescriptor::new("a*/b.caf")],
        ..PatchConfig::default()
    };
    let err = patch_manifest(&mut manifest, &config, PatchOptions::default()).unwrap_err();
    assert!(matches!(err, PatchError::InvalidConfig(_)), "unexpected error: {err}");
    assert_eq!(manifest.to_text(), RUNNER);
}

#[test]
fn unusual_but_legal_names_survive_a_reparse() {
    let config = PatchConfig {
        resources: vec![
            ResourceDescriptor::new("wake up \"now\".caf"),
            ResourceDescriptor::new("a*b/c.caf"),
        ],
        ..PatchConfig::default()
    };
    let (manifest, _) = patched(&config);
    let reparsed = Manifest::parse(&manifest.to_text()).expect("patched manifest parses");
    assert_eq!(reparsed.file_references_named("wake up \"now\".caf").len(), 1);
    assert_eq!(reparsed.file_references_named("a*b/c.caf").len(), 1);
    assert!(audit_resources(&reparsed, &config).iter().all(|audit| audit.is_consistent()));
}

#[test]
fn padded_names_patch_and_audit_the_same_file() {
    let config = PatchConfig {
        resources: vec![ResourceDescriptor::new(" alarm_1.caf ")],
        ..PatchConfig::default()
    };
    let (manifest, report) = patched(&config);
    assert_eq!(report.resources[0].resource.name, "alarm_1.caf");
    let audits = audit_resources(&manifest, &config);
    assert_eq!(audits[0].name, "alarm_1.caf");
    assert!(audits[0].is_consistent());
}
