// tests/rebuild_props.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;
use sitepipe::engine::{CoreCommand, PendingChanges, RebuildCore, RebuildEvent, TaskOutcome};
use sitepipe::types::TaskKind;

#[derive(Debug, Clone)]
enum Input {
    Change(u8),
    Finish(bool),
}

fn input_strategy() -> impl Strategy<Value = Input> {
    prop_oneof![
        3 => (0u8..6).prop_map(Input::Change),
        1 => any::<bool>().prop_map(Input::Finish),
    ]
}

fn path(n: u8) -> PathBuf {
    PathBuf::from(format!("src/scss/_{n}.scss"))
}

proptest! {
    /// Drives the core the way the runtime does: completions only arrive while
    /// a rebuild is in flight. At most one rebuild may ever be running, and no
    /// change is lost.
    #[test]
    fn at_most_one_rebuild_in_flight(inputs in proptest::collection::vec(input_strategy(), 1..60)) {
        let mut core = RebuildCore::new(TaskKind::Styles);
        let mut in_flight = false;
        let mut unbuilt: BTreeSet<PathBuf> = BTreeSet::new();

        for input in inputs {
            let event = match input {
                Input::Change(n) => {
                    unbuilt.insert(path(n));
                    RebuildEvent::ChangeObserved { path: path(n) }
                }
                Input::Finish(ok) => {
                    if !in_flight {
                        continue;
                    }
                    in_flight = false;
                    let outcome = if ok {
                        TaskOutcome::Succeeded { warnings: 0 }
                    } else {
                        TaskOutcome::Failed
                    };
                    RebuildEvent::RebuildFinished { outcome }
                }
            };

            let step = core.step(event);
            prop_assert!(step.keep_running);

            let mut reloads = 0;
            for command in step.commands {
                match command {
                    CoreCommand::StartRebuild { changed } => {
                        prop_assert!(!in_flight, "second rebuild started while one was running");
                        prop_assert!(!changed.is_empty());
                        for p in &changed {
                            unbuilt.remove(p);
                        }
                        in_flight = true;
                    }
                    CoreCommand::Reload { kind } => {
                        prop_assert_eq!(kind, TaskKind::Styles);
                        reloads += 1;
                    }
                }
            }
            prop_assert!(reloads <= 1);
            prop_assert_eq!(core.is_running(), in_flight);
        }

        // Anything still unbuilt must be waiting behind the current rebuild.
        if !unbuilt.is_empty() {
            prop_assert!(in_flight);
            prop_assert!(core.has_pending());
        }
    }

    #[test]
    fn pending_changes_drain_sorted_and_unique(names in proptest::collection::vec("[a-z]{1,4}", 0..30)) {
        let mut pending = PendingChanges::new();
        for name in &names {
            pending.record(PathBuf::from(name));
        }

        let expected: Vec<PathBuf> = names
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(PathBuf::from)
            .collect();
        prop_assert_eq!(pending.len(), expected.len());
        prop_assert_eq!(pending.drain(), expected);
        prop_assert!(pending.is_empty());
    }
}
