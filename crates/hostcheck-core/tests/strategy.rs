//! RepairStrategy: declarative construction, the synthetic root, and the
//! verify / repair entry points.

use hostcheck_core::fakes::{RecordingHost, StubRepairAction, StubVerifier};
use hostcheck_core::{
    BuildError, CheckError, Checker, DependencyFailure, RepairSpec, RepairStatus, RepairStrategy,
    VerifierId, VerifierSpec, ROOT_TAG,
};

const SILENT_MODES: [bool; 2] = [false, true];

fn verifier(tag: &str) -> VerifierSpec {
    VerifierSpec::new(tag, StubVerifier::new(tag, 0))
}

fn tags_of(strategy: &RepairStrategy, ids: &[VerifierId]) -> Vec<String> {
    ids.iter()
        .map(|id| strategy.verifier(*id).tag().to_string())
        .collect()
}

fn root_dependency_tags(strategy: &RepairStrategy) -> Vec<String> {
    tags_of(strategy, strategy.dependencies(strategy.root()))
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_single_verifier_hangs_off_root() {
    let strategy = RepairStrategy::new(vec![verifier("tester")], vec![]).unwrap();

    let root = strategy.root();
    assert_eq!(strategy.verifier(root).tag(), ROOT_TAG);
    assert_eq!(
        strategy.graph().verifier_description(root),
        "All host verification checks pass"
    );
    assert_eq!(root_dependency_tags(&strategy), vec!["tester"]);

    let tester = strategy.lookup("tester").unwrap();
    assert!(strategy.dependencies(tester).is_empty());
    assert!(strategy.actions().is_empty());
}

#[test]
fn test_chain_exposes_only_top_to_root() {
    let strategy = RepairStrategy::new(
        vec![verifier("child"), verifier("parent").depends_on(["child"])],
        vec![],
    )
    .unwrap();

    assert_eq!(root_dependency_tags(&strategy), vec!["parent"]);
    let parent = strategy.lookup("parent").unwrap();
    assert_eq!(tags_of(&strategy, strategy.dependencies(parent)), vec!["child"]);
}

#[test]
fn test_shared_dependency_is_one_node() {
    let strategy = RepairStrategy::new(
        vec![
            verifier("bottom"),
            verifier("left").depends_on(["bottom"]),
            verifier("right").depends_on(["bottom"]),
        ],
        vec![],
    )
    .unwrap();

    assert_eq!(root_dependency_tags(&strategy), vec!["left", "right"]);
    let bottom = strategy.lookup("bottom").unwrap();
    let left = strategy.lookup("left").unwrap();
    let right = strategy.lookup("right").unwrap();
    assert_eq!(strategy.dependencies(left), &[bottom]);
    assert_eq!(strategy.dependencies(right), &[bottom]);
    // bottom + left + right + root
    assert_eq!(strategy.graph().verifier_count(), 4);
}

#[test]
fn test_independent_verifiers_keep_declaration_order() {
    let strategy = RepairStrategy::new(
        vec![verifier("charlie"), verifier("alpha"), verifier("bravo")],
        vec![],
    )
    .unwrap();

    assert_eq!(root_dependency_tags(&strategy), vec!["charlie", "alpha", "bravo"]);
}

#[test]
fn test_repair_action_is_wired_to_its_triggers() {
    let tester = StubVerifier::new("tester", 0);
    let fix = StubRepairAction::new("fix", true, vec![tester.clone()]);
    let strategy = RepairStrategy::new(
        vec![VerifierSpec::new("tester", tester)],
        vec![RepairSpec::new("fix", fix).triggered_by(["tester"])],
    )
    .unwrap();

    let actions = strategy.actions();
    assert_eq!(actions.len(), 1);
    let action = actions[0];
    assert_eq!(strategy.action(action).tag(), "fix");
    assert!(strategy.action_dependencies(action).is_empty());
    assert_eq!(tags_of(&strategy, strategy.action_triggers(action)), vec!["tester"]);
    assert_eq!(strategy.lookup_action("fix"), Some(action));
    assert_eq!(strategy.lookup("fix"), None);
}

#[test]
fn test_repair_may_be_triggered_by_root() {
    let strategy = RepairStrategy::new(
        vec![verifier("tester")],
        vec![RepairSpec::new("fix", StubRepairAction::new("fix", true, vec![]))
            .triggered_by([ROOT_TAG])],
    )
    .unwrap();

    let action = strategy.lookup_action("fix").unwrap();
    assert_eq!(strategy.action_triggers(action), &[strategy.root()]);
}

#[test]
fn test_repair_actions_keep_declaration_order() {
    let repairs = ["zulu", "alpha", "mike"]
        .into_iter()
        .map(|tag| {
            RepairSpec::new(tag, StubRepairAction::new(tag, true, vec![])).triggered_by(["tester"])
        })
        .collect();
    let strategy = RepairStrategy::new(vec![verifier("tester")], repairs).unwrap();

    let tags: Vec<&str> = strategy
        .actions()
        .into_iter()
        .map(|id| strategy.action(id).tag())
        .collect();
    assert_eq!(tags, vec!["zulu", "alpha", "mike"]);
}

#[test]
fn test_repair_dependency_is_separate_from_triggers() {
    let strategy = RepairStrategy::new(
        vec![verifier("network"), verifier("service")],
        vec![RepairSpec::new("restart", StubRepairAction::new("restart", true, vec![]))
            .depends_on(["network"])
            .triggered_by(["service"])],
    )
    .unwrap();

    let action = strategy.lookup_action("restart").unwrap();
    assert_eq!(tags_of(&strategy, strategy.action_dependencies(action)), vec!["network"]);
    assert_eq!(tags_of(&strategy, strategy.action_triggers(action)), vec!["service"]);
}

// ---------------------------------------------------------------------------
// Build errors
// ---------------------------------------------------------------------------

#[test]
fn test_forward_reference_is_rejected() {
    let err = RepairStrategy::new(
        vec![verifier("parent").depends_on(["child"]), verifier("child")],
        vec![],
    )
    .unwrap_err();

    assert_eq!(
        err,
        BuildError::UnknownTag {
            tag: "child".to_string(),
            referenced_by: "parent".to_string(),
        }
    );
}

#[test]
fn test_root_tag_is_reserved() {
    let err = RepairStrategy::new(vec![verifier(ROOT_TAG)], vec![]).unwrap_err();
    assert_eq!(
        err,
        BuildError::ReservedTag {
            tag: ROOT_TAG.to_string(),
        }
    );
}

#[test]
fn test_unknown_trigger_is_rejected() {
    let err = RepairStrategy::new(
        vec![verifier("tester")],
        vec![RepairSpec::new("fix", StubRepairAction::new("fix", true, vec![]))
            .triggered_by(["missing"])],
    )
    .unwrap_err();

    assert_eq!(
        err,
        BuildError::UnknownTag {
            tag: "missing".to_string(),
            referenced_by: "fix".to_string(),
        }
    );
}

#[test]
fn test_repair_cannot_be_used_as_trigger() {
    let err = RepairStrategy::new(
        vec![verifier("tester")],
        vec![
            RepairSpec::new("first", StubRepairAction::new("first", true, vec![]))
                .triggered_by(["tester"]),
            RepairSpec::new("second", StubRepairAction::new("second", true, vec![]))
                .triggered_by(["first"]),
        ],
    )
    .unwrap_err();

    assert_eq!(
        err,
        BuildError::NotAVerifier {
            tag: "first".to_string(),
            referenced_by: "second".to_string(),
        }
    );
}

#[test]
fn test_duplicate_tag_is_rejected() {
    let err = RepairStrategy::new(vec![verifier("dup"), verifier("dup")], vec![]).unwrap_err();
    assert_eq!(
        err,
        BuildError::DuplicateTag {
            tag: "dup".to_string(),
        }
    );
}

// ---------------------------------------------------------------------------
// verify / repair
// ---------------------------------------------------------------------------

#[test]
fn test_verify_reevaluates_on_every_call() {
    for silent in SILENT_MODES {
        let host = RecordingHost::new("fake");
        let tester = StubVerifier::new("tester", 1);
        let strategy =
            RepairStrategy::new(vec![VerifierSpec::new("tester", tester.clone())], vec![])
                .unwrap();

        for call in 1..=2 {
            let err = strategy.verify(&host, silent).unwrap_err();
            match err {
                CheckError::Dependency(e) => {
                    let failures: Vec<_> = e.failures().iter().cloned().collect();
                    assert_eq!(
                        failures,
                        vec![DependencyFailure::new(tester.description(), tester.message())]
                    );
                }
                other => panic!("expected dependency failure, got {other:?}"),
            }
            assert_eq!(tester.verify_count(), call);
        }

        tester.try_repair();
        strategy.verify(&host, silent).expect("tester now passes");
        assert_eq!(tester.verify_count(), 3);
        assert_eq!(host.records().is_empty(), silent);
    }
}

#[test]
fn test_verify_records_root_only_when_everything_passes() {
    let host = RecordingHost::new("fake");
    let strategy = RepairStrategy::new(vec![verifier("tester")], vec![]).unwrap();

    strategy.verify(&host, false).unwrap();
    let operations: Vec<String> = host.records().into_iter().map(|r| r.operation).collect();
    assert_eq!(operations, vec!["verify.tester", "verify.PASS"]);
}

#[test]
fn test_repair_runs_every_action_and_reports_all_failures() {
    for silent in SILENT_MODES {
        let host = RecordingHost::new("fake");
        let a = StubVerifier::new("a", 2);
        let b = StubVerifier::new("b", 2);
        let afix = StubRepairAction::new("afix", true, vec![a.clone()]);
        let bfix = StubRepairAction::new("bfix", true, vec![b.clone()]);
        let strategy = RepairStrategy::new(
            vec![
                VerifierSpec::new("a", a.clone()),
                VerifierSpec::new("b", b.clone()),
            ],
            vec![
                RepairSpec::new("afix", afix.clone()).triggered_by(["a"]),
                RepairSpec::new("bfix", bfix.clone()).triggered_by(["b"]),
            ],
        )
        .unwrap();

        // a: 2 -> 1, b: 2 -> 1; both still failing.
        let err = strategy.repair(&host, silent).unwrap_err();
        assert_eq!(err.tags(), vec!["afix", "bfix"]);
        assert_eq!((afix.repair_count(), bfix.repair_count()), (1, 1));

        // a: 2 -> 1, b: 1 -> 0
        a.unrepair();
        let err = strategy.repair(&host, silent).unwrap_err();
        assert_eq!(err.tags(), vec!["afix"]);
        assert_eq!((afix.repair_count(), bfix.repair_count()), (2, 2));

        // a: 1 -> 0, b: 2 -> 1
        b.unrepair();
        b.unrepair();
        let err = strategy.repair(&host, silent).unwrap_err();
        assert_eq!(err.tags(), vec!["bfix"]);
        assert_eq!((afix.repair_count(), bfix.repair_count()), (3, 3));

        // a passes untouched, b: 1 -> 0
        strategy.repair(&host, silent).expect("all repairs succeed");
        assert_eq!((afix.repair_count(), bfix.repair_count()), (3, 4));

        strategy.verify(&host, silent).expect("host is healthy");
        assert_eq!(host.records().is_empty(), silent);
    }
}

#[test]
fn test_session_reports_status_per_action() {
    let host = RecordingHost::new("fake");
    let ok = StubVerifier::new("ok", 0);
    let broken = StubVerifier::new("broken", 1);
    let stuck = StubVerifier::new("stuck", 1);
    let strategy = RepairStrategy::new(
        vec![
            VerifierSpec::new("ok", ok.clone()),
            VerifierSpec::new("broken", broken.clone()),
            VerifierSpec::new("stuck", stuck.clone()),
        ],
        vec![
            RepairSpec::new("idle", StubRepairAction::new("idle", true, vec![])).triggered_by(["ok"]),
            RepairSpec::new("mend", StubRepairAction::new("mend", true, vec![broken.clone()]))
                .triggered_by(["broken"]),
            RepairSpec::new("bust", StubRepairAction::new("bust", false, vec![]))
                .triggered_by(["stuck"]),
            RepairSpec::new("gated", StubRepairAction::new("gated", true, vec![]))
                .depends_on(["stuck"])
                .triggered_by(["ok"]),
        ],
    )
    .unwrap();

    let mut session = strategy.session();
    let err = session.repair_all(&host, true).unwrap_err();
    assert_eq!(err.tags(), vec!["bust", "gated"]);

    let status = |tag: &str| session.status(strategy.lookup_action(tag).unwrap());
    assert_eq!(status("idle"), Some(RepairStatus::Untriggered));
    assert_eq!(status("mend"), Some(RepairStatus::Repaired));
    assert_eq!(status("bust"), Some(RepairStatus::FailedAction));
    assert_eq!(status("gated"), Some(RepairStatus::Blocked));
}

#[test]
fn test_one_strategy_serves_hosts_concurrently() {
    let tester = StubVerifier::new("tester", 0);
    let strategy =
        RepairStrategy::new(vec![VerifierSpec::new("tester", tester.clone())], vec![]).unwrap();

    std::thread::scope(|scope| {
        for n in 0..4 {
            let strategy = &strategy;
            scope.spawn(move || {
                let host = RecordingHost::new(format!("dut-{n}"));
                strategy.verify(&host, false).unwrap();
                assert_eq!(host.records().len(), 2);
            });
        }
    });

    assert_eq!(tester.verify_count(), 4);
}
