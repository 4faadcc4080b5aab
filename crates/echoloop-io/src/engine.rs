//! Live signal graph: microphone in, echo graph, speakers out.
//!
//! [`SignalGraph`] owns the two platform streams of one session. The input
//! callback forwards mono samples through a bounded lock-free channel; the
//! output callback owns the compiled [`GraphProcessor`], pulls those samples
//! (silence on underrun), runs the graph and writes the mono result to every
//! output channel. Live parameters reach the processor through the shared
//! [`ParameterStore`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use echoloop_core::{
    GraphProcessor, ParameterSnapshot, ParameterStore, TapReader, graph::build_karaoke_graph,
};

use crate::backend::{AudioBackend, BackendStreamConfig, InputConstraints, StreamHandle};
use crate::Result;

/// Largest block handed to the processor in one call.
const MAX_BLOCK: usize = 1024;

/// Stream configuration for a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Input device name (uses default if `None`).
    pub input_device: Option<String>,
    /// Output device name (uses default if `None`).
    pub output_device: Option<String>,
    /// Output channel count; the mono graph output is copied to each.
    pub output_channels: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            input_device: None,
            output_device: None,
            output_channels: 2,
        }
    }
}

impl StreamConfig {
    fn input_stream_config(&self) -> BackendStreamConfig {
        BackendStreamConfig {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            channels: 1,
            device_name: self.input_device.clone(),
        }
    }

    fn output_stream_config(&self) -> BackendStreamConfig {
        BackendStreamConfig {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            channels: self.output_channels.max(1),
            device_name: self.output_device.clone(),
        }
    }
}

/// Counters shared with the audio callbacks.
#[derive(Debug, Default)]
struct StreamStats {
    underruns: AtomicU64,
    overruns: AtomicU64,
    errors: AtomicU64,
}

/// One live session's audio graph and its platform streams.
///
/// Constructed in one step, torn down in one step. The node topology never
/// changes in between; only the three live parameters do.
pub struct SignalGraph {
    params: Arc<ParameterStore>,
    tap: Option<TapReader>,
    input: Option<StreamHandle>,
    output: Option<StreamHandle>,
    active: Arc<AtomicBool>,
    stats: Arc<StreamStats>,
    sample_rate: u32,
}

impl SignalGraph {
    /// Builds the karaoke graph and starts capture and playback.
    ///
    /// The microphone is opened raw (no echo cancellation, noise suppression,
    /// or auto gain). On error nothing stays allocated: a stream that was
    /// already opened is dropped before returning.
    pub fn construct(
        backend: &dyn AudioBackend,
        config: &StreamConfig,
        snapshot: ParameterSnapshot,
    ) -> Result<Self> {
        let input_config = config.input_stream_config();
        let output_config = config.output_stream_config();
        let sample_rate = backend.actual_sample_rate(&output_config);

        let params = Arc::new(ParameterStore::with_snapshot(snapshot));
        let built = build_karaoke_graph(sample_rate as f32, Arc::clone(&params))?;
        tracing::debug!(
            nodes = built.processor.node_count(),
            sample_rate,
            "karaoke graph compiled"
        );

        let active = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(StreamStats::default());

        // Room for several callbacks' worth of input; one block of silence
        // keeps the output from starting on an underrun.
        let capacity = (config.buffer_size as usize * 8).max(4096);
        let (tx, rx) = bounded::<f32>(capacity);
        for _ in 0..config.buffer_size {
            let _ = tx.try_send(0.0);
        }

        let input = backend.build_input_stream(
            &input_config,
            &InputConstraints::raw(),
            input_callback(tx, input_config.channels, &active, &stats),
            error_callback("input", &stats),
        )?;

        let output = backend.build_output_stream(
            &output_config,
            output_callback(built.processor, rx, output_config.channels, &active, &stats),
            error_callback("output", &stats),
        )?;

        tracing::info!(
            backend = backend.name(),
            sample_rate,
            buffer_size = config.buffer_size,
            "signal graph running"
        );

        Ok(Self {
            params,
            tap: Some(built.tap),
            input: Some(input),
            output: Some(output),
            active,
            stats,
            sample_rate,
        })
    }

    /// Hands new live values to the audio thread.
    ///
    /// Lock-free; callable from any thread. Values are clamped (feedback stays
    /// below unity) and take effect at the next block boundary.
    pub fn apply_parameters(&self, snapshot: ParameterSnapshot) {
        self.params.apply(snapshot);
    }

    /// Values currently handed to the audio thread.
    pub fn parameters(&self) -> ParameterSnapshot {
        self.params.snapshot()
    }

    /// Takes the analysis tap reader. Returns `None` after the first call.
    pub fn tap_analysis(&mut self) -> Option<TapReader> {
        self.tap.take()
    }

    /// Stops audio and frees both streams. Safe to call repeatedly.
    ///
    /// The active flag is cleared first so a callback already in flight
    /// produces silence; then input and output are dropped in that order.
    /// Dropping the output stream frees the processor and its delay line.
    pub fn teardown(&mut self) {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        drop(self.input.take());
        drop(self.output.take());
        if was_active {
            tracing::info!(
                underruns = self.underruns(),
                stream_errors = self.stream_errors(),
                "signal graph torn down"
            );
        }
    }

    /// True until [`teardown`](Self::teardown).
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Sample rate the graph runs at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output samples that found no input waiting.
    pub fn underruns(&self) -> u64 {
        self.stats.underruns.load(Ordering::Relaxed)
    }

    /// Input samples dropped because the channel was full.
    pub fn overruns(&self) -> u64 {
        self.stats.overruns.load(Ordering::Relaxed)
    }

    /// Errors reported by either stream.
    pub fn stream_errors(&self) -> u64 {
        self.stats.errors.load(Ordering::Relaxed)
    }
}

impl Drop for SignalGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalGraph")
            .field("active", &self.is_active())
            .field("sample_rate", &self.sample_rate)
            .field("parameters", &self.parameters())
            .finish_non_exhaustive()
    }
}

fn input_callback(
    tx: Sender<f32>,
    channels: u16,
    active: &Arc<AtomicBool>,
    stats: &Arc<StreamStats>,
) -> crate::InputCallback {
    let active = Arc::clone(active);
    let stats = Arc::clone(stats);
    let channels = channels.max(1) as usize;
    Box::new(move |data: &[f32]| {
        if !active.load(Ordering::Relaxed) {
            return;
        }
        // First channel only.
        for frame in data.chunks(channels) {
            if tx.try_send(frame[0]).is_err() {
                stats.overruns.fetch_add(1, Ordering::Relaxed);
            }
        }
    })
}

fn output_callback(
    mut processor: GraphProcessor,
    rx: Receiver<f32>,
    channels: u16,
    active: &Arc<AtomicBool>,
    stats: &Arc<StreamStats>,
) -> crate::OutputCallback {
    let active = Arc::clone(active);
    let stats = Arc::clone(stats);
    let channels = channels.max(1) as usize;
    let mut input = vec![0.0_f32; MAX_BLOCK];
    let mut output = vec![0.0_f32; MAX_BLOCK];

    Box::new(move |data: &mut [f32]| {
        if !active.load(Ordering::Relaxed) {
            data.fill(0.0);
            return;
        }
        for chunk in data.chunks_mut(MAX_BLOCK * channels) {
            let frames = chunk.len() / channels;
            let mut missing = 0u64;
            for s in &mut input[..frames] {
                *s = rx.try_recv().unwrap_or_else(|_| {
                    missing += 1;
                    0.0
                });
            }
            if missing > 0 {
                stats.underruns.fetch_add(missing, Ordering::Relaxed);
            }

            processor.process_block(&input[..frames], &mut output[..frames]);

            let mut frames_out = chunk.chunks_exact_mut(channels);
            for (frame, &y) in (&mut frames_out).zip(&output[..frames]) {
                frame.fill(y);
            }
            // A trailing partial frame gets silence.
            frames_out.into_remainder().fill(0.0);
        }
    })
}

fn error_callback(direction: &'static str, stats: &Arc<StreamStats>) -> crate::ErrorCallback {
    let stats = Arc::clone(stats);
    Box::new(move |err: &str| {
        stats.errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(direction, error = err, "audio stream error");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, MockBackend};

    #[test]
    fn construct_opens_both_streams_raw() {
        let backend = MockBackend::new();
        let graph =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default())
                .unwrap();
        assert!(graph.is_active());
        assert_eq!(backend.open_streams(), 2);
        assert_eq!(backend.last_input_constraints(), Some(InputConstraints::raw()));
        assert_eq!(graph.sample_rate(), 48000);
    }

    #[test]
    fn teardown_is_idempotent_and_closes_streams() {
        let backend = MockBackend::new();
        let mut graph =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default())
                .unwrap();
        graph.teardown();
        graph.teardown();
        assert!(!graph.is_active());
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn tap_is_handed_out_once() {
        let backend = MockBackend::new();
        let mut graph =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default())
                .unwrap();
        assert!(graph.tap_analysis().is_some());
        assert!(graph.tap_analysis().is_none());
    }

    #[test]
    fn permission_denied_leaves_nothing_open() {
        let backend = MockBackend::new().deny_input();
        let result =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default());
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn output_failure_drops_input_stream() {
        let backend = MockBackend::new().without_output();
        let result =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default());
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn apply_parameters_clamps_feedback() {
        let backend = MockBackend::new();
        let graph =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default())
                .unwrap();
        graph.apply_parameters(ParameterSnapshot {
            gain: 0.5,
            delay_time_secs: 0.2,
            feedback_gain: 1.0,
        });
        let applied = graph.parameters();
        assert_eq!(applied.gain, 0.5);
        assert!(applied.feedback_gain < 1.0);
    }

    #[test]
    fn mic_reaches_every_output_channel() {
        let backend = MockBackend::new();
        let snapshot = ParameterSnapshot {
            gain: 0.5,
            delay_time_secs: 1.0,
            feedback_gain: 0.0,
        };
        let _graph = SignalGraph::construct(&backend, &StreamConfig::default(), snapshot).unwrap();

        let frames = backend.pump(&[1.0; 1024]);
        // One buffer of prefilled silence, then the gained signal.
        assert_eq!(frames.len(), 1024 * 2);
        assert_eq!(frames[0], 0.0);
        let last = &frames[frames.len() - 2..];
        assert!((last[0] - 0.5).abs() < 1e-6);
        assert_eq!(last[0], last[1]);
    }

    #[test]
    fn partial_trailing_frame_is_silenced() {
        let params = Arc::new(ParameterStore::with_snapshot(ParameterSnapshot {
            gain: 1.0,
            delay_time_secs: 1.0,
            feedback_gain: 0.0,
        }));
        let built = build_karaoke_graph(48000.0, params).unwrap();
        let (tx, rx) = bounded::<f32>(8);
        for _ in 0..3 {
            tx.send(0.5).unwrap();
        }
        let active = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(StreamStats::default());
        let mut callback = output_callback(built.processor, rx, 2, &active, &stats);

        // Three stereo frames plus one stray sample.
        let mut data = [9.0_f32; 7];
        callback(&mut data);
        assert!(data[..6].iter().all(|&s| (s - 0.5).abs() < 1e-6), "{data:?}");
        assert_eq!(data[6], 0.0);
        assert_eq!(stats.underruns.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn silent_after_teardown() {
        let backend = MockBackend::new();
        let mut graph =
            SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default())
                .unwrap();
        graph.teardown();
        let frames = backend.pump(&[1.0; 256]);
        assert!(frames.iter().all(|&s| s == 0.0));
    }
}
