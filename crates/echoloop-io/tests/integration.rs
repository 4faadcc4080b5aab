//! Integration tests for echoloop-io: the live signal graph on the mock backend.

use echoloop_core::{MAX_FEEDBACK_GAIN, ParameterSnapshot};
use echoloop_io::{
    AudioBackend, AudioDevice, Error, InputConstraints, MockBackend, SignalGraph, StreamConfig,
    detect_wireless_output,
};

const BLOCK: usize = 256;

fn construct(backend: &MockBackend, snapshot: ParameterSnapshot) -> SignalGraph {
    SignalGraph::construct(backend, &StreamConfig::default(), snapshot).unwrap()
}

/// Pumps `input` through the backend block by block, collecting channel 0.
fn run(backend: &MockBackend, input: &[f32]) -> Vec<f32> {
    input
        .chunks(BLOCK)
        .flat_map(|block| backend.pump_mono(block))
        .collect()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn construct_then_teardown_twice() {
    let backend = MockBackend::new();
    let mut graph = construct(&backend, ParameterSnapshot::default());
    assert_eq!(backend.open_streams(), 2);

    graph.teardown();
    assert_eq!(backend.open_streams(), 0);
    assert!(!graph.is_active());

    graph.teardown();
    assert_eq!(backend.open_streams(), 0);
}

#[test]
fn dropping_the_graph_closes_streams() {
    let backend = MockBackend::new();
    {
        let _graph = construct(&backend, ParameterSnapshot::default());
        assert_eq!(backend.open_streams(), 2);
    }
    assert_eq!(backend.open_streams(), 0);
}

#[test]
fn permission_denied_surfaces_and_allocates_nothing() {
    let backend = MockBackend::new().deny_input();
    let err = SignalGraph::construct(
        &backend,
        &StreamConfig::default(),
        ParameterSnapshot::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)), "{err}");
    assert_eq!(backend.open_streams(), 0);
    assert_eq!(backend.streams_built(), 0);
}

#[test]
fn a_new_graph_can_follow_a_teardown() {
    let backend = MockBackend::new();
    let mut first = construct(&backend, ParameterSnapshot::default());
    first.teardown();
    let _second = construct(&backend, ParameterSnapshot::default());
    assert_eq!(backend.open_streams(), 2);
    assert_eq!(backend.streams_built(), 4);
}

#[test]
fn microphone_is_mono_and_raw() {
    let backend = MockBackend::new();
    let _graph = construct(&backend, ParameterSnapshot::default());
    let input = backend.last_input_config().unwrap();
    assert_eq!(input.channels, 1);
    let constraints = backend.last_input_constraints().unwrap();
    assert!(constraints.is_raw());
    assert_eq!(constraints, InputConstraints::raw());
}

#[test]
fn graph_runs_at_the_device_rate() {
    let backend = MockBackend::new().with_sample_rate(44100);
    let graph = construct(&backend, ParameterSnapshot::default());
    assert_eq!(graph.sample_rate(), 44100);
}

// ---------------------------------------------------------------------------
// Audio path
// ---------------------------------------------------------------------------

#[test]
fn impulse_echoes_through_the_live_streams() {
    let backend = MockBackend::new();
    // 0.25 s at 48 kHz = 12000 samples.
    let _graph = construct(
        &backend,
        ParameterSnapshot {
            gain: 1.0,
            delay_time_secs: 0.25,
            feedback_gain: 0.5,
        },
    );

    let mut input = vec![0.0_f32; BLOCK * 100];
    input[0] = 1.0;
    let out = run(&backend, &input);

    // The output lags the microphone by one block of prefilled silence.
    let dry = BLOCK;
    assert!((out[dry] - 1.0).abs() < 1e-4, "dry = {}", out[dry]);
    assert!((out[dry + 12000] - 1.0).abs() < 1e-3);
    assert!((out[dry + 24000] - 0.5).abs() < 1e-3);
    assert!(out[..dry].iter().all(|&s| s == 0.0));
}

#[test]
fn parameter_changes_reach_the_audio_thread() {
    let backend = MockBackend::new();
    let graph = construct(
        &backend,
        ParameterSnapshot {
            gain: 1.0,
            delay_time_secs: 1.0,
            feedback_gain: 0.0,
        },
    );
    run(&backend, &[1.0; BLOCK * 4]);

    graph.apply_parameters(ParameterSnapshot {
        gain: 0.0,
        delay_time_secs: 1.0,
        feedback_gain: 0.0,
    });
    // 10 ms smoothing settles well within 20 blocks.
    let out = run(&backend, &[1.0; BLOCK * 20]);
    assert!(out.last().unwrap().abs() < 1e-3);
}

#[test]
fn applied_feedback_is_capped() {
    let backend = MockBackend::new();
    let graph = construct(&backend, ParameterSnapshot::default());
    graph.apply_parameters(ParameterSnapshot {
        feedback_gain: 7.0,
        ..ParameterSnapshot::default()
    });
    assert_eq!(graph.parameters().feedback_gain, MAX_FEEDBACK_GAIN);
}

#[test]
fn tap_sees_the_gained_signal() {
    let backend = MockBackend::new();
    let mut graph = construct(
        &backend,
        ParameterSnapshot {
            gain: 0.5,
            delay_time_secs: 1.0,
            feedback_gain: 0.0,
        },
    );
    let mut tap = graph.tap_analysis().unwrap();
    assert!(graph.tap_analysis().is_none());

    run(&backend, &[1.0; BLOCK * 4]);
    let (block, fresh) = tap.latest();
    assert!(fresh);
    assert!(block.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn silence_after_teardown() {
    let backend = MockBackend::new();
    let mut graph = construct(&backend, ParameterSnapshot::default());
    run(&backend, &[1.0; BLOCK]);
    graph.teardown();
    assert!(run(&backend, &[1.0; BLOCK * 4]).iter().all(|&s| s == 0.0));
}

#[test]
fn stream_errors_are_counted() {
    let backend = MockBackend::new();
    let graph = construct(&backend, ParameterSnapshot::default());
    backend.raise_error("device hiccup");
    assert_eq!(graph.stream_errors(), 2);
    assert!(graph.is_active());
}

#[test]
fn starved_output_counts_underruns() {
    let backend = MockBackend::new();
    let graph = construct(&backend, ParameterSnapshot::default());
    // The prefilled block covers the first pull.
    backend.pull(BLOCK);
    assert_eq!(graph.underruns(), 0);

    let out = backend.pull(BLOCK);
    assert_eq!(graph.underruns(), BLOCK as u64);
    assert!(out.iter().all(|&s| s == 0.0));
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[test]
fn wireless_output_is_reported() {
    let backend = MockBackend::new().with_devices(vec![
        AudioDevice::input("Built-in Microphone", 48000),
        AudioDevice::output("JBL Flip 5 (Bluetooth)", 48000),
    ]);
    let report = detect_wireless_output(&backend.list_devices().unwrap());
    assert!(report.is_wireless());
    assert_eq!(report.device.as_deref(), Some("JBL Flip 5 (Bluetooth)"));
}

#[test]
fn missing_output_fails_construction() {
    let backend = MockBackend::new().without_output();
    let err = SignalGraph::construct(
        &backend,
        &StreamConfig::default(),
        ParameterSnapshot::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DeviceUnavailable(_)));
    assert_eq!(backend.open_streams(), 0);
}
