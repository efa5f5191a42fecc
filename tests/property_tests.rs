//! Property-based tests for runs.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated contexts and event sequences.

use proptest::prelude::*;
use stagehand::core::State;
use stagehand::runtime::{Machine, Next};
use stagehand::{event_enum, state_enum, MachineBuilder};

state_enum! {
    enum Phase {
        Idle,
        Active,
    }
}

event_enum! {
    enum Input {
        Inc,
        Toggle,
        Noise(u8),
    }
}

fn counter() -> Machine<u32, Phase, Input> {
    MachineBuilder::<u32, Phase, Input>::new()
        .initial(Phase::Idle)
        .state(Phase::Idle, |s| {
            s.on_receive(|r| {
                r.on("Inc", |_, set, _| {
                    set.update(|count| *count += 1);
                    Next::Stay
                })
                .on("Toggle", |_, _, _| Next::To(Phase::Active))
            })
        })
        .state(Phase::Active, |s| {
            s.on_receive(|r| r.on("Toggle", |_, _, _| Next::To(Phase::Idle)))
        })
        .build()
        .unwrap()
}

fn guarded(threshold: u32) -> Machine<u32, Phase, Input> {
    MachineBuilder::<u32, Phase, Input>::new()
        .initial(Phase::Active)
        .state(Phase::Idle, |s| s)
        .state(Phase::Active, move |s| {
            s.guard(move |count: &u32| *count < threshold, Phase::Idle)
        })
        .build()
        .unwrap()
}

prop_compose! {
    fn arbitrary_input()(variant in 0..3u8, payload in any::<u8>()) -> Input {
        match variant {
            0 => Input::Inc,
            1 => Input::Toggle,
            _ => Input::Noise(payload),
        }
    }
}

proptest! {
    #[test]
    fn unmatched_events_change_nothing(
        start in any::<u32>(),
        noise in prop::collection::vec(any::<u8>(), 0..20),
    ) {
        let run = counter().start(start);

        for payload in noise {
            run.emit(Input::Noise(payload));
        }

        prop_assert_eq!(run.get(), start);
        prop_assert_eq!(run.state(), Phase::Idle);
        prop_assert!(run.history().is_empty());
        prop_assert!(!run.completion().is_settled());
    }

    #[test]
    fn runs_of_one_machine_are_isolated(
        first in 0..50usize,
        second in 0..50usize,
    ) {
        let machine = counter();
        let a = machine.start(0);
        let b = machine.start(100);

        for _ in 0..first {
            a.emit(Input::Inc);
        }
        for _ in 0..second {
            b.emit(Input::Inc);
        }
        a.emit(Input::Toggle);

        prop_assert_eq!(a.get(), first as u32);
        prop_assert_eq!(b.get(), 100 + second as u32);
        prop_assert_eq!(a.state(), Phase::Active);
        prop_assert_eq!(b.state(), Phase::Idle);
    }

    #[test]
    fn failed_guard_lands_on_fallback(count in 0..20u32, threshold in 0..20u32) {
        let run = guarded(threshold).start(count);

        let expected = if count < threshold { Phase::Active } else { Phase::Idle };
        prop_assert_eq!(run.state(), expected);
    }

    #[test]
    fn entry_pipeline_runs_once_at_start(start in 0..1_000u32) {
        let machine = MachineBuilder::<u32, Phase, Input>::new()
            .initial(Phase::Idle)
            .state(Phase::Idle, |s| s.on_entry(|_, set, _| set.update(|count| *count += 1)))
            .build()
            .unwrap();

        let run = machine.start(start);

        prop_assert_eq!(run.get(), start + 1);
    }

    #[test]
    fn history_records_every_state_write(inputs in prop::collection::vec(arbitrary_input(), 0..40)) {
        let run = counter().start(0);
        let toggles = inputs.iter().filter(|input| matches!(input, Input::Toggle)).count();

        for input in inputs {
            run.emit(input);
        }

        let history = run.history();
        prop_assert_eq!(history.len(), toggles);
        for transition in history.transitions() {
            prop_assert_ne!(transition.from.name(), transition.to.name());
        }
    }
}
