use std::path::PathBuf;

use blame_track::{
    TrackConfig,
    blame::{render_blame, validate_blame_map},
    script::replay_script,
};

const CASES: [(&str, &str); 3] = [
    ("basic.script", "basic.blame"),
    ("batches.script", "batches.blame"),
    ("unicode.script", "unicode.blame"),
];

fn fixtures_dir() -> PathBuf {
    #[cfg(target_os = "wasi")]
    {
        PathBuf::from("/workspace/fixtures")
    }

    #[cfg(not(target_os = "wasi"))]
    {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
    }
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(name)).expect("read fixture")
}

fn strict() -> TrackConfig {
    TrackConfig {
        verify_base: true,
        verify_coverage: true,
    }
}

#[test]
fn fixtures_match_expected_blame() {
    for (script_name, expected_name) in CASES {
        let replay = replay_script(&read_fixture(script_name), &strict()).unwrap();
        let expected = read_fixture(expected_name);

        assert_eq!(
            render_blame(replay.state.blame_map()),
            expected,
            "blame mismatch: {script_name}"
        );
        validate_blame_map(replay.state.blame_map(), replay.doc.len()).unwrap();
    }
}

#[test]
fn fixtures_reconstruct_every_revision() {
    for (script_name, _) in CASES {
        let replay = replay_script(&read_fixture(script_name), &strict()).unwrap();
        let state = &replay.state;

        assert_eq!(
            state.revision(&replay.doc, 0).unwrap(),
            replay.initial,
            "initial document not restored: {script_name}"
        );
        for index in 0..=state.commits().len() {
            state
                .revision(&replay.doc, index)
                .unwrap_or_else(|e| panic!("{script_name}: revision {index}: {e}"));
        }
    }
}

#[test]
fn fixture_commit_metadata() {
    let replay = replay_script(&read_fixture("batches.script"), &strict()).unwrap();
    let commits = replay.state.commits();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].message, "first");
    assert_eq!(commits[0].steps.len(), 2);
    assert!(commits[1].hidden);
    assert_eq!(replay.state.visible_commits().count(), 1);
    assert!(replay.state.has_uncommitted());
    assert_eq!(replay.doc, ">01a--YZ89");
}
