// tests/property/supervisor.rs

#[path = "../common/mod.rs"]
mod common;
use crate::common::fakes::{modified, ChildBehaviour, FakeLauncher, ScriptedSource};
use crate::common::fast_options;

use proptest::prelude::*;
use watchrun::engine::{NoCallback, ShutdownFlag, Supervisor};
use watchrun::exec::StopSignal;

fn behaviour() -> impl Strategy<Value = ChildBehaviour> {
    prop_oneof![
        (0i32..3).prop_map(ChildBehaviour::ExitsOnInterrupt),
        Just(ChildBehaviour::IgnoresInterrupt),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// One launch at start plus one per batch; every launched child is
    /// stopped exactly once with an interrupt, by one termination sequence.
    #[test]
    fn launches_track_batches(
        batch_sizes in prop::collection::vec(1usize..4, 0..6),
        child in behaviour(),
    ) {
        let shutdown = ShutdownFlag::new();
        let script = batch_sizes
            .iter()
            .enumerate()
            .map(|(i, n)| (0..*n).map(|j| modified(&format!("/proj/{i}/{j}.py"))).collect())
            .collect();
        let source = ScriptedSource::new(script, shutdown.clone());
        let launcher = FakeLauncher::new(child);
        let log = launcher.log();

        let mut supervisor = Supervisor::new(source, launcher, fast_options()).with_shutdown(shutdown);
        let outcome = supervisor.run_blocking(NoCallback).unwrap();

        let log = log.lock().unwrap();
        prop_assert_eq!(outcome.restarts(), batch_sizes.len());
        // One sequence per restart plus the final one for the live child.
        prop_assert_eq!(supervisor.stats().terminations, batch_sizes.len() + 1);
        prop_assert_eq!(log.launch_count(), batch_sizes.len() + 1);
        prop_assert_eq!(log.signals_of(StopSignal::Graceful), log.launch_count());

        let kills = log.signals_of(StopSignal::Forceful);
        if child == ChildBehaviour::IgnoresInterrupt {
            prop_assert_eq!(kills, log.launch_count());
        } else {
            prop_assert_eq!(kills, 0);
        }
    }
}
