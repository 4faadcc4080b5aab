//! Frame-paced spectrum drawing.
//!
//! [`RenderLoop`] is a two-state machine. While **Running** a dedicated
//! thread samples the [`SpectrumAnalyzer`], maps the bands to bar heights and
//! pushes them to the sink, then waits one frame interval. The wait doubles as
//! the cancellation check: [`stop`](RenderLoop::stop) drops the cancel sender,
//! the wait wakes immediately and the thread exits before drawing again.
//! Frames never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use echoloop_analysis::SpectrumAnalyzer;
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::visual::{VisualizationSink, bar_heights};

/// Default time between frames, about 60 per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Render loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No thread running.
    Idle,
    /// Drawing frames.
    Running,
}

struct Worker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic driver from analyzer to sink.
///
/// The sink is shared so the caller can inspect it and so it outlives
/// individual sessions.
pub struct RenderLoop<S: VisualizationSink + 'static> {
    sink: Arc<Mutex<S>>,
    frame_interval: Duration,
    frames: Arc<AtomicU64>,
    worker: Option<Worker>,
}

impl<S: VisualizationSink + 'static> RenderLoop<S> {
    /// Creates an idle loop drawing into `sink`.
    pub fn new(sink: Arc<Mutex<S>>, frame_interval: Duration) -> Self {
        Self {
            sink,
            frame_interval,
            frames: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Starts drawing from `analyzer`.
    ///
    /// Fails with [`SessionError::Render`] if already running or if the
    /// thread cannot be spawned.
    pub fn start(&mut self, analyzer: SpectrumAnalyzer) -> Result<(), SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::Render("render loop already running".into()));
        }

        let (cancel, cancelled) = bounded::<()>(0);
        let sink = Arc::clone(&self.sink);
        let frames = Arc::clone(&self.frames);
        let interval = self.frame_interval;

        let handle = std::thread::Builder::new()
            .name("echoloop-render".into())
            .spawn(move || run_frames(analyzer, &sink, &frames, &cancelled, interval))
            .map_err(|e| SessionError::Render(e.to_string()))?;

        self.worker = Some(Worker { cancel, handle });
        tracing::debug!(interval_ms = interval.as_millis() as u64, "render loop started");
        Ok(())
    }

    /// Halts drawing and resets the sink to the floor.
    ///
    /// Returns once the render thread has exited. No-op when idle.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        drop(worker.cancel);
        if worker.handle.join().is_err() {
            tracing::warn!("render thread panicked");
        }
        self.sink.lock().reset();
        tracing::debug!(frames = self.frames_rendered(), "render loop stopped");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RenderState {
        if self.worker.is_some() {
            RenderState::Running
        } else {
            RenderState::Idle
        }
    }

    /// Frames drawn since construction.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Shared handle to the sink.
    pub fn sink(&self) -> &Arc<Mutex<S>> {
        &self.sink
    }

    /// Time between frames.
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

impl<S: VisualizationSink + 'static> Drop for RenderLoop<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: VisualizationSink + 'static> std::fmt::Debug for RenderLoop<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("state", &self.state())
            .field("frame_interval", &self.frame_interval)
            .field("frames_rendered", &self.frames_rendered())
            .finish_non_exhaustive()
    }
}

fn run_frames<S: VisualizationSink>(
    mut analyzer: SpectrumAnalyzer,
    sink: &Mutex<S>,
    frames: &AtomicU64,
    cancelled: &Receiver<()>,
    interval: Duration,
) {
    loop {
        let heights = bar_heights(&analyzer.sample());
        sink.lock().push(&heights);
        frames.fetch_add(1, Ordering::Relaxed);

        match cancelled.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
