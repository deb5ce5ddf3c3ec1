//! Engine behavior against mock adapters: manual control, transitions,
//! session lifecycle and timing updates.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lightshow::app::ports::{ObserverId, Resolution};
use lightshow::behavior::BehaviorKind;
use lightshow::channels::{CHANNEL_COUNT, ChannelState};
use lightshow::config::LightConfig;
use lightshow::error::{Error, InputError};

use crate::mock_hw::{Notification, fast_config, make_engine, make_engine_with, settle};

// ── Construction ──────────────────────────────────────────────

#[test]
fn starts_dark_in_default() {
    let (engine, out, notifier) = make_engine(Resolution::Pwm);
    let snap = engine.snapshot();
    assert_eq!(snap.lights, ChannelState::dark());
    assert_eq!(snap.behavior, BehaviorKind::Default);
    assert!(!snap.all_lights);
    assert!(!engine.is_session_active());
    assert_eq!(out.frames(), vec![ChannelState::dark()]);
    assert_eq!(notifier.frames(), vec![ChannelState::dark()]);
}

#[test]
fn rejects_invalid_config() {
    let config = LightConfig {
        tick_interval_ms: 0,
        ..fast_config(Resolution::Pwm)
    };
    let out = crate::mock_hw::MockOutput::new(Resolution::Pwm);
    let result = lightshow::BehaviorEngine::new(
        &config,
        out.clone(),
        crate::mock_hw::RecordingNotifier::new(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(out.frame_count(), 0);
}

#[test]
fn sink_resolution_wins_over_config() {
    let config = fast_config(Resolution::Pwm);
    let out = crate::mock_hw::MockOutput::new(Resolution::Binary);
    let engine = lightshow::BehaviorEngine::new(
        &config,
        out,
        crate::mock_hw::RecordingNotifier::new(),
    )
    .unwrap();
    assert_eq!(engine.resolution(), Resolution::Binary);
}

// ── Manual control ────────────────────────────────────────────

#[test]
fn set_channel_changes_only_that_channel() {
    let (engine, out, notifier) = make_engine(Resolution::Pwm);
    engine.set_channel(2, 128).unwrap();
    let expected = ChannelState::from_array([0, 0, 128, 0]);
    assert_eq!(engine.snapshot().lights, expected);
    assert_eq!(out.last(), Some(expected));
    assert_eq!(notifier.frames().last(), Some(&expected));
}

#[test]
fn invalid_manual_writes_leave_state_alone() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    engine.set_channel(1, 40).unwrap();
    let before = out.frame_count();

    assert_eq!(
        engine.set_channel(CHANNEL_COUNT, 10),
        Err(Error::Input(InputError::ChannelOutOfRange(CHANNEL_COUNT)))
    );
    engine.set_intensity_bounds(0, 200).unwrap();
    assert_eq!(
        engine.set_channel(0, 201),
        Err(Error::Input(InputError::IntensityOutOfRange { value: 201, max: 200 }))
    );
    assert_eq!(
        engine.set_all_channels(255),
        Err(Error::Input(InputError::IntensityOutOfRange { value: 255, max: 200 }))
    );

    assert_eq!(out.frame_count(), before);
    assert_eq!(engine.snapshot().lights, ChannelState::from_array([0, 40, 0, 0]));
}

#[test]
fn binary_output_takes_only_off_or_max() {
    let (engine, _, _) = make_engine(Resolution::Binary);
    assert_eq!(
        engine.set_channel(0, 100),
        Err(Error::Input(InputError::NotBinaryLevel(100)))
    );
    engine.set_channel(0, 255).unwrap();
    engine.set_channel(1, 0).unwrap();
    assert_eq!(engine.snapshot().lights, ChannelState::from_array([255, 0, 0, 0]));
}

#[test]
fn set_all_tracks_all_lights_flag() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    engine.set_all_channels(255).unwrap();
    assert!(engine.snapshot().all_lights);
    assert!(engine.snapshot().lights.is_uniform(255));

    engine.set_all_channels(90).unwrap();
    assert!(!engine.snapshot().all_lights);
    assert!(engine.snapshot().lights.is_uniform(90));
}

// ── Transitions ───────────────────────────────────────────────

#[test]
fn entering_a_pattern_zeroes_then_animates() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    engine.set_all_channels(255).unwrap();
    let before = out.frame_count();

    assert_eq!(engine.set_behavior_kind(BehaviorKind::Marquee), Ok(BehaviorKind::Marquee));
    assert!(engine.is_session_active());
    assert_eq!(engine.current_kind(), BehaviorKind::Marquee);

    settle(60);
    let frames = out.frames();
    assert_eq!(frames[before], ChannelState::dark());
    assert!(frames.len() > before + 2, "session should be producing frames");
}

#[test]
fn default_restores_all_on_after_pattern() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    engine.set_all_channels(255).unwrap();
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(30);
    engine.set_behavior_kind(BehaviorKind::Default).unwrap();

    let snap = engine.snapshot();
    assert_eq!(snap.behavior, BehaviorKind::Default);
    assert!(snap.lights.is_uniform(255));
    assert!(!engine.is_session_active());
}

#[test]
fn default_restores_dark_without_all_lights() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    engine.set_channel(3, 200).unwrap();
    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    settle(30);
    engine.set_behavior_kind(BehaviorKind::Default).unwrap();
    assert_eq!(engine.snapshot().lights, ChannelState::dark());
}

#[test]
fn same_kind_is_a_no_op() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    let before = out.frame_count();
    assert_eq!(engine.set_behavior_kind(BehaviorKind::Default), Ok(BehaviorKind::Default));
    assert_eq!(out.frame_count(), before);
    assert_eq!(engine.session_id(), None);

    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(20);
    let session = engine.session_id();
    assert!(session.is_some());
    let resent_at = out.frame_count();

    assert_eq!(engine.set_behavior_kind(BehaviorKind::Marquee), Ok(BehaviorKind::Marquee));
    settle(20);

    assert_eq!(engine.session_id(), session, "no second session");
    assert!(engine.is_session_active());
    assert_eq!(engine.current_kind(), BehaviorKind::Marquee);
    // A running marquee always has a lit channel, so a dark frame here could
    // only be a zero-reset.
    let after = &out.frames()[resent_at..];
    assert!(!after.is_empty());
    assert!(after.iter().all(|f| *f != ChannelState::dark()), "{after:?}");
}

#[test]
fn join_completes_within_two_ticks() {
    let config = LightConfig {
        minimum_on_time_secs: 0.1,
        ..LightConfig::default()
    };
    let (engine, _, _) = make_engine_with(config);
    assert_eq!(engine.tick_interval(), Duration::from_millis(50));
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(120);

    let started = Instant::now();
    engine.set_behavior_kind(BehaviorKind::Default).unwrap();
    let took = started.elapsed();

    assert!(!engine.is_session_active());
    assert!(took <= engine.tick_interval() * 2, "join took {took:?}");
}

#[test]
fn no_frames_after_transition_returns() {
    let (engine, out, notifier) = make_engine(Resolution::Pwm);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(40);
    engine.set_behavior_kind(BehaviorKind::Default).unwrap();

    let applied = out.frame_count();
    let published = notifier.frames().len();
    settle(50);
    assert_eq!(out.frame_count(), applied);
    assert_eq!(notifier.frames().len(), published);
}

#[test]
fn switching_patterns_replaces_the_session() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(20);
    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    let switch_at = out.frame_count();
    settle(30);

    assert_eq!(engine.current_kind(), BehaviorKind::Alternating);
    // Alternating writes every channel, so the even/odd pairs always match.
    for frame in &out.frames()[switch_at..] {
        assert_eq!(frame[0], frame[2]);
        assert_eq!(frame[1], frame[3]);
    }
}

#[test]
fn manual_write_cancels_pattern() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(30);

    engine.set_channel(2, 255).unwrap();
    assert_eq!(engine.current_kind(), BehaviorKind::Default);
    assert!(!engine.is_session_active());
    assert_eq!(engine.snapshot().lights[2], 255);

    let applied = out.frame_count();
    settle(30);
    assert_eq!(out.frame_count(), applied);
}

// ── Rendering ─────────────────────────────────────────────────

#[test]
fn pwm_frames_stay_within_max() {
    let config = LightConfig {
        min_intensity: 20,
        max_intensity: 200,
        ..fast_config(Resolution::Pwm)
    };
    let (engine, out, _) = make_engine_with(config);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(250);
    engine.shutdown();

    let frames = out.frames();
    assert!(frames.iter().all(|f| f.iter().all(|v| v <= 200)));
    // After a full phase the chase has lit channel 1 at some point.
    assert!(frames.iter().any(|f| f[1] > 20));
}

#[test]
fn binary_patterns_emit_only_off_or_max() {
    let config = LightConfig {
        minimum_on_time_secs: 0.0,
        ..fast_config(Resolution::Binary)
    };
    let (engine, out, _) = make_engine_with(config);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(150);
    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    settle(150);
    engine.shutdown();

    for frame in out.frames() {
        assert!(frame.iter().all(|v| v == 0 || v == 255), "{frame:?}");
    }
}

#[test]
fn sink_failures_do_not_stop_the_session() {
    let (engine, out, notifier) = make_engine(Resolution::Pwm);
    out.set_failing(true);
    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    settle(80);

    assert!(engine.is_session_active());
    assert!(notifier.frames().len() > 2);
    out.set_failing(false);
    let before = out.frame_count();
    settle(30);
    assert!(out.frame_count() > before);
}

// ── Timing ────────────────────────────────────────────────────

#[test]
fn timing_setters_clamp() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    assert_eq!(engine.set_speed_adjustment(250), 100);
    assert_eq!(engine.set_speed_adjustment(-400), -100);
    assert_eq!(engine.set_minimum_on_time(0.01), 0.1);
    assert_eq!(engine.set_minimum_on_time(1.5), 1.5);

    let timing = engine.snapshot().timing;
    assert_eq!(timing.speed_adjustment, -100);
    assert_eq!(timing.minimum_on_time, 1.5);
}

#[test]
fn timing_changes_keep_the_session_running() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    let session = engine.session_id();
    engine.set_speed_adjustment(50);
    engine.set_minimum_on_time(0.5);
    assert!(engine.is_session_active());
    assert_eq!(engine.session_id(), session);
    assert_eq!(engine.current_kind(), BehaviorKind::Marquee);
}

#[test]
fn shorter_on_time_applies_to_the_running_phase() {
    let config = LightConfig {
        minimum_on_time_secs: 60.0,
        ..fast_config(Resolution::Binary)
    };
    let (engine, out, _) = make_engine_with(config);
    let even = ChannelState::from_array([255, 0, 255, 0]);
    let odd = ChannelState::from_array([0, 255, 0, 255]);

    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    settle(40);
    assert!(out.frames().contains(&even));
    assert!(!out.frames().contains(&odd), "a 60 s phase must not flip yet");

    // Phase length drops to the 100 ms floor; the flip follows within it.
    engine.set_minimum_on_time(0.0);
    settle(150);
    assert!(out.frames().contains(&odd));
}

#[test]
fn faster_speed_applies_to_the_running_phase() {
    let config = LightConfig {
        minimum_on_time_secs: 0.4,
        speed_adjustment_percent: -90,
        ..fast_config(Resolution::Binary)
    };
    let (engine, out, _) = make_engine_with(config);
    let odd = ChannelState::from_array([0, 255, 0, 255]);

    // -90 % stretches the phase to 4 s.
    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    settle(40);
    assert!(!out.frames().contains(&odd));

    // +100 % halves it to 200 ms.
    engine.set_speed_adjustment(100);
    settle(250);
    assert!(out.frames().contains(&odd));
}

#[test]
fn intensity_bounds_validated() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    assert_eq!(
        engine.set_intensity_bounds(100, 50),
        Err(Error::Input(InputError::InvalidBounds { min: 100, max: 50 }))
    );
    assert_eq!(
        engine.set_intensity_bounds(0, 0),
        Err(Error::Input(InputError::InvalidBounds { min: 0, max: 0 }))
    );
    let bounds = engine.set_intensity_bounds(10, 180).unwrap();
    assert_eq!((bounds.min, bounds.max), (10, 180));
    assert_eq!(engine.snapshot().timing.max_intensity, 180);
    assert_eq!(engine.max_intensity(), 180);
}

#[test]
fn lowering_max_pulls_channels_down() {
    let (engine, out, notifier) = make_engine(Resolution::Pwm);
    engine.set_channel(0, 250).unwrap();
    engine.set_channel(1, 40).unwrap();

    engine.set_intensity_bounds(0, 100).unwrap();
    let expected = ChannelState::from_array([100, 40, 0, 0]);
    let snap = engine.snapshot();
    assert_eq!(snap.lights, expected);
    assert!(snap.lights.iter().all(|v| v <= snap.timing.max_intensity));
    assert_eq!(out.last(), Some(expected));
    assert_eq!(notifier.frames().last(), Some(&expected));

    // The level already shown stays writable.
    engine.set_channel(0, 100).unwrap();
}

#[test]
fn lowering_max_on_relays_keeps_lit_channels_at_max() {
    let (engine, _, _) = make_engine(Resolution::Binary);
    engine.set_channel(0, 255).unwrap();

    engine.set_intensity_bounds(0, 100).unwrap();
    let snap = engine.snapshot();
    assert_eq!(snap.lights, ChannelState::from_array([100, 0, 0, 0]));
    assert!(snap.lights.iter().all(|v| v == 0 || v == snap.timing.max_intensity));

    engine.set_channel(1, 100).unwrap();
    engine.set_channel(0, 0).unwrap();
    assert_eq!(engine.snapshot().lights, ChannelState::from_array([0, 100, 0, 0]));
}

#[test]
fn lowering_max_during_a_pattern_caps_later_frames() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(30);

    engine.set_intensity_bounds(0, 60).unwrap();
    let changed_at = out.frame_count();
    settle(150);

    assert!(engine.is_session_active());
    let after = &out.frames()[changed_at..];
    assert!(!after.is_empty());
    assert!(after.iter().all(|f| f.iter().all(|v| v <= 60)), "{after:?}");
    assert!(engine.snapshot().lights.iter().all(|v| v <= 60));
}

// ── Observers and lifecycle ───────────────────────────────────

#[test]
fn attached_observer_gets_current_snapshot() {
    let (engine, _, notifier) = make_engine(Resolution::Pwm);
    engine.set_channel(1, 77).unwrap();
    engine.attach_observer(ObserverId(4));

    let expected = engine.snapshot();
    assert_eq!(
        notifier.events().last(),
        Some(&Notification::Initial(ObserverId(4), expected))
    );
}

#[test]
fn unchanged_frames_are_not_republished() {
    let (engine, out, notifier) = make_engine(Resolution::Pwm);
    engine.set_channel(0, 0).unwrap();
    engine.set_all_channels(0).unwrap();
    assert_eq!(out.frame_count(), 3);
    assert_eq!(notifier.frames(), vec![ChannelState::dark()]);
}

#[test]
fn drop_joins_the_session() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    engine.set_behavior_kind(BehaviorKind::Marquee).unwrap();
    settle(20);
    drop(engine);

    let applied = out.frame_count();
    settle(30);
    assert_eq!(out.frame_count(), applied);
}

#[test]
fn crashed_session_is_not_reported_active() {
    let (engine, out, _) = make_engine(Resolution::Pwm);
    out.set_panic_in_session(true);
    engine.set_behavior_kind(BehaviorKind::Alternating).unwrap();
    settle(50);

    assert!(!engine.is_session_active());

    // The engine is still usable; the dead session is joined on the way out.
    out.set_panic_in_session(false);
    engine.set_behavior_kind(BehaviorKind::Default).unwrap();
    assert_eq!(engine.session_id(), None);
    engine.set_channel(0, 9).unwrap();
    assert_eq!(engine.snapshot().lights[0], 9);
}

#[test]
fn concurrent_callers_leave_one_consistent_session() {
    let (engine, _, _) = make_engine(Resolution::Pwm);
    let engine = Arc::new(engine);

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..20 {
                    let kind = BehaviorKind::ALL[(n + i) % BehaviorKind::ALL.len()];
                    engine.set_behavior_kind(kind).unwrap();
                    if i % 5 == 0 {
                        engine.set_channel(n, 255).unwrap();
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let kind = engine.current_kind();
    assert_eq!(engine.is_session_active(), kind != BehaviorKind::Default);
    engine.shutdown();
    assert_eq!(engine.current_kind(), BehaviorKind::Default);
    assert!(!engine.is_session_active());
}
