//! Cancellation-path integration tests.
//!
//! An abort must interrupt the pour at the next checkpoint, leave the
//! controller in a recoverable state, and never let a later component
//! start. The gated rig makes the timing deterministic: the test knows
//! exactly which component is mid-pour when the abort lands.

use crate::mock_rig::{GatedRig, RecordingRig, attach_event_log};

use std::thread;

use barmatic::bartender::{Bartender, BartenderState};
use barmatic::config::BarConfig;
use barmatic::error::{Error, PourError};
use barmatic::recipe::{PourStep, Recipe};

fn quick_config() -> BarConfig {
    BarConfig {
        inter_step_settle_ms: 0,
        ..BarConfig::default()
    }
}

fn negroni() -> Recipe {
    Recipe::new(
        "Negroni",
        vec![
            PourStep::new("Gin", 30.0),
            PourStep::new("Campari", 30.0),
            PourStep::new("Vermouth", 30.0),
        ],
        None,
    )
    .unwrap()
}

#[test]
fn abort_during_second_component_stops_before_the_third() {
    let (rig, started, release) = GatedRig::new();
    let bar = Bartender::new(rig, quick_config());
    let log = attach_event_log(&bar);

    let result = thread::scope(|scope| {
        let worker = scope.spawn(|| bar.make_drink(negroni().sequence()));

        assert_eq!(started.recv().unwrap(), "Gin");
        release.send(()).unwrap();

        // Campari is mid-pour when the abort lands.
        assert_eq!(started.recv().unwrap(), "Campari");
        bar.abort().unwrap();
        assert_eq!(bar.state(), BartenderState::Aborted);
        release.send(()).unwrap();

        worker.join().unwrap()
    });

    // The worker observed the cancellation at the next checkpoint.
    assert_eq!(result.unwrap_err(), Error::Pour(PourError::Cancelled));

    {
        let entries = log.lock().unwrap();
        let pourings: Vec<&String> =
            entries.iter().filter(|e| e.starts_with("POURING")).collect();
        assert_eq!(
            pourings,
            ["POURING Gin", "POURING Campari"],
            "two components started, the third never did"
        );
        // Campari's completion report arrived after the abort was armed,
        // so only Gin produced a progress entry.
        let progress = entries.iter().filter(|e| e.starts_with("PROGRESS")).count();
        assert_eq!(progress, 1);
        assert!(entries.contains(&"ABORTED".to_string()));
    }

    bar.discard().unwrap();
    assert_eq!(bar.state(), BartenderState::Idle);
}

#[test]
fn abort_during_first_component_cancels_everything_after_it() {
    let (rig, started, release) = GatedRig::new();
    let bar = Bartender::new(rig, quick_config());

    let result = thread::scope(|scope| {
        let worker = scope.spawn(|| bar.make_drink(negroni().sequence()));

        assert_eq!(started.recv().unwrap(), "Gin");
        bar.abort().unwrap();
        release.send(()).unwrap();

        worker.join().unwrap()
    });

    assert_eq!(result.unwrap_err(), Error::Pour(PourError::Cancelled));
    // No further components were announced.
    assert!(started.try_recv().is_err());

    bar.discard().unwrap();
    assert_eq!(bar.state(), BartenderState::Idle);
}

#[test]
fn aborted_controller_refuses_new_drinks_until_discarded() {
    let (rig, started, release) = GatedRig::new();
    let bar = Bartender::new(rig, quick_config());

    thread::scope(|scope| {
        let worker = scope.spawn(|| bar.make_drink(negroni().sequence()));

        started.recv().unwrap();
        bar.abort().unwrap();
        release.send(()).unwrap();
        assert!(worker.join().unwrap().is_err());
    });

    // Still holding the half-made glass.
    let err = bar.make_drink(negroni().sequence()).unwrap_err();
    assert!(matches!(err, Error::Transition(_)));

    bar.discard().unwrap();
    assert_eq!(bar.state(), BartenderState::Idle);
}

#[test]
fn second_abort_fails_but_cancellation_stays_armed() {
    let (rig, started, release) = GatedRig::new();
    let bar = Bartender::new(rig, quick_config());

    let result = thread::scope(|scope| {
        let worker = scope.spawn(|| bar.make_drink(negroni().sequence()));

        started.recv().unwrap();
        bar.abort().unwrap();
        // Pressing the button twice: the second request has nothing to
        // abort and must not un-cancel the pour.
        assert!(matches!(bar.abort(), Err(Error::Transition(_))));
        release.send(()).unwrap();

        worker.join().unwrap()
    });

    assert_eq!(result.unwrap_err(), Error::Pour(PourError::Cancelled));
    bar.discard().unwrap();
}

#[test]
fn abort_after_completion_fails_and_keeps_the_drink() {
    let bar = Bartender::new(RecordingRig::new(), quick_config());
    bar.make_drink(negroni().sequence()).unwrap();

    assert!(matches!(bar.abort(), Err(Error::Transition(_))));
    assert_eq!(bar.state(), BartenderState::Ready);
    bar.serve().unwrap();
}

#[test]
fn abort_while_idle_is_a_usage_error() {
    let bar = Bartender::new(RecordingRig::new(), quick_config());
    assert!(matches!(bar.abort(), Err(Error::Transition(_))));
    assert_eq!(bar.state(), BartenderState::Idle);
}

#[test]
fn discarded_controller_accepts_the_next_drink() {
    let (rig, started, release) = GatedRig::new();
    let bar = Bartender::new(rig, quick_config());

    thread::scope(|scope| {
        let worker = scope.spawn(|| bar.make_drink(negroni().sequence()));
        started.recv().unwrap();
        bar.abort().unwrap();
        release.send(()).unwrap();
        assert!(worker.join().unwrap().is_err());
    });

    bar.discard().unwrap();

    // Fresh pour on the same controller: the stale cancellation flag must
    // not leak into it.
    thread::scope(|scope| {
        let worker = scope.spawn(|| bar.make_drink(negroni().sequence()));
        for _ in 0..3 {
            started.recv().unwrap();
            release.send(()).unwrap();
        }
        worker.join().unwrap().unwrap();
    });
    assert_eq!(bar.state(), BartenderState::Ready);
}
