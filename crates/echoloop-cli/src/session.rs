//! Start/stop orchestration for one karaoke session at a time.
//!
//! [`SessionController`] is the single entry point for callers. It owns the
//! live parameter values, the injected [`AudioBackend`], the render loop and,
//! while active, the [`SignalGraph`]. Everything a session allocates lives in
//! one `Session` value, so stopping is a matter of dropping it.

use std::fmt;
use std::sync::Arc;

use echoloop_analysis::{AnalyzerConfig, SpectrumAnalyzer};
use echoloop_core::{ParameterSnapshot, ParameterStore};
use echoloop_io::{AudioBackend, SignalGraph, StreamConfig, TransportReport, detect_wireless_output};
use parking_lot::Mutex;

use crate::config::AppConfig;
use crate::error::{STATUS_LIVE, STATUS_READY, STATUS_STARTING, SessionError};
use crate::render::RenderLoop;
use crate::visual::VisualizationSink;

/// Whether a session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No streams open.
    Idle,
    /// Microphone, graph and render loop running.
    Active,
}

/// Which transport controls are usable. Exactly one is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    /// Start is offered.
    pub start_enabled: bool,
    /// Stop is offered.
    pub stop_enabled: bool,
}

/// Display strings for the three live values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readouts {
    /// Output gain in percent, e.g. `"100"`.
    pub gain: String,
    /// Delay time in seconds, e.g. `"0.30"`.
    pub delay: String,
    /// Feedback gain, e.g. `"0.40"`.
    pub feedback: String,
}

impl Readouts {
    fn from_snapshot(snapshot: ParameterSnapshot) -> Self {
        Self {
            gain: format!("{:.0}", snapshot.gain * 100.0),
            delay: format!("{:.2}", snapshot.delay_time_secs),
            feedback: format!("{:.2}", snapshot.feedback_gain),
        }
    }
}

impl fmt::Display for Readouts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gain {}% | delay {} s | feedback {}",
            self.gain, self.delay, self.feedback
        )
    }
}

/// Resources held by a live session.
struct Session {
    graph: SignalGraph,
}

/// Owns the session lifecycle and the live parameters.
pub struct SessionController<S: VisualizationSink + 'static> {
    backend: Box<dyn AudioBackend>,
    stream_config: StreamConfig,
    analyzer_config: AnalyzerConfig,
    params: ParameterStore,
    render: RenderLoop<S>,
    session: Option<Session>,
    status: String,
}

impl<S: VisualizationSink + 'static> SessionController<S> {
    /// Creates an idle controller.
    ///
    /// Initial parameter values, stream and display settings come from
    /// `config`; frames are drawn into `sink`.
    pub fn new(backend: Box<dyn AudioBackend>, config: &AppConfig, sink: Arc<Mutex<S>>) -> Self {
        let render = RenderLoop::new(sink, config.frame_interval());
        render.sink().lock().reset();
        Self {
            backend,
            stream_config: config.stream_config(),
            analyzer_config: config.analyzer_config(),
            params: ParameterStore::with_snapshot(config.snapshot()),
            render,
            session: None,
            status: STATUS_READY.to_string(),
        }
    }

    /// Acquires the microphone, builds the graph and starts drawing.
    ///
    /// On failure nothing stays open, the state is Idle and
    /// [`status`](Self::status) names the reason. A second start while
    /// active returns [`SessionError::AlreadyActive`] and changes nothing.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.session.is_some() {
            tracing::debug!("start ignored, session already active");
            return Err(SessionError::AlreadyActive);
        }

        self.status = STATUS_STARTING.to_string();
        tracing::info!(backend = self.backend.name(), "starting session");

        match self.open_session() {
            Ok(session) => {
                self.session = Some(session);
                self.status = STATUS_LIVE.to_string();
                tracing::info!(parameters = ?self.params.snapshot(), "session live");
                Ok(())
            }
            Err(err) => {
                self.status = err.status_message();
                tracing::warn!(error = %err, "session failed to start");
                Err(err)
            }
        }
    }

    fn open_session(&mut self) -> Result<Session, SessionError> {
        let mut graph = SignalGraph::construct(
            self.backend.as_ref(),
            &self.stream_config,
            self.params.snapshot(),
        )?;
        let tap = graph
            .tap_analysis()
            .ok_or_else(|| SessionError::Render("analysis tap already taken".into()))?;
        let analyzer = SpectrumAnalyzer::new(tap, self.analyzer_config)
            .map_err(|e| SessionError::Render(e.to_string()))?;
        // On failure `graph` drops here and closes its streams.
        self.render.start(analyzer)?;
        Ok(Session { graph })
    }

    /// Tears down the graph and halts drawing; bars drop to the floor.
    ///
    /// Returns [`SessionError::AlreadyIdle`] and changes nothing when idle.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let Some(mut session) = self.session.take() else {
            tracing::debug!("stop ignored, session already idle");
            return Err(SessionError::AlreadyIdle);
        };
        session.graph.teardown();
        self.render.stop();
        self.status = STATUS_READY.to_string();
        tracing::info!(
            underruns = session.graph.underruns(),
            stream_errors = session.graph.stream_errors(),
            frames = self.render.frames_rendered(),
            "session stopped"
        );
        Ok(())
    }

    /// Sets output gain (linear). Returns the stored value.
    pub fn set_gain(&mut self, gain: f32) -> f32 {
        let stored = self.params.set_gain(gain);
        self.push_parameters();
        stored
    }

    /// Sets output gain from percent (0-150). Returns the stored linear value.
    pub fn set_gain_percent(&mut self, percent: f32) -> f32 {
        let stored = self.params.set_gain_percent(percent);
        self.push_parameters();
        stored
    }

    /// Sets delay time in seconds. Returns the stored value.
    pub fn set_delay_time(&mut self, secs: f32) -> f32 {
        let stored = self.params.set_delay_time(secs);
        self.push_parameters();
        stored
    }

    /// Sets feedback gain. Returns the stored value, always below 1.
    pub fn set_feedback_gain(&mut self, feedback: f32) -> f32 {
        let stored = self.params.set_feedback_gain(feedback);
        self.push_parameters();
        stored
    }

    fn push_parameters(&self) {
        if let Some(session) = &self.session {
            session.graph.apply_parameters(self.params.snapshot());
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    /// One-line status for the user.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Start/stop enablement.
    pub fn controls(&self) -> Controls {
        let active = self.session.is_some();
        Controls {
            start_enabled: !active,
            stop_enabled: active,
        }
    }

    /// Controller-side parameter values.
    pub fn parameters(&self) -> ParameterSnapshot {
        self.params.snapshot()
    }

    /// Values the running graph holds, or `None` when idle.
    pub fn live_parameters(&self) -> Option<ParameterSnapshot> {
        self.session.as_ref().map(|s| s.graph.parameters())
    }

    /// Display strings for the live values.
    pub fn readouts(&self) -> Readouts {
        Readouts::from_snapshot(self.params.snapshot())
    }

    /// Scans output devices for a wireless speaker.
    pub fn transport(&self) -> TransportReport {
        match self.backend.list_devices() {
            Ok(devices) => detect_wireless_output(&devices),
            Err(err) => {
                tracing::warn!(error = %err, "device list unavailable");
                detect_wireless_output(&[])
            }
        }
    }

    /// Human-readable output transport hint.
    pub fn transport_hint(&self) -> String {
        self.transport().hint()
    }

    /// Frames drawn since the controller was created.
    pub fn frames_rendered(&self) -> u64 {
        self.render.frames_rendered()
    }

    /// Shared handle to the visualization sink.
    pub fn sink(&self) -> &Arc<Mutex<S>> {
        self.render.sink()
    }
}

impl<S: VisualizationSink + 'static> Drop for SessionController<S> {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.stop();
        }
    }
}

impl<S: VisualizationSink + 'static> fmt::Debug for SessionController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("status", &self.status)
            .field("parameters", &self.params.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{FLOOR, RecordingSink};
    use echoloop_io::{AudioDevice, MockBackend};

    fn controller(backend: &MockBackend) -> SessionController<RecordingSink> {
        SessionController::new(
            Box::new(backend.clone()),
            &AppConfig::default(),
            Arc::new(Mutex::new(RecordingSink::new())),
        )
    }

    #[test]
    fn new_controller_is_idle_and_ready() {
        let backend = MockBackend::new();
        let ctl = controller(&backend);
        assert_eq!(ctl.state(), SessionState::Idle);
        assert_eq!(ctl.status(), "Ready to start");
        assert_eq!(
            ctl.controls(),
            Controls {
                start_enabled: true,
                stop_enabled: false
            }
        );
        assert_eq!(ctl.sink().lock().last(), Some(&FLOOR));
    }

    #[test]
    fn start_then_stop_flips_controls() {
        let backend = MockBackend::new();
        let mut ctl = controller(&backend);
        ctl.start().unwrap();
        assert_eq!(ctl.status(), "Live - sing along!");
        assert!(ctl.controls().stop_enabled);
        assert!(!ctl.controls().start_enabled);

        ctl.stop().unwrap();
        assert_eq!(ctl.state(), SessionState::Idle);
        assert_eq!(ctl.status(), "Ready to start");
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn readouts_follow_setters() {
        let backend = MockBackend::new();
        let mut ctl = controller(&backend);
        ctl.set_gain_percent(75.0);
        ctl.set_delay_time(0.5);
        ctl.set_feedback_gain(0.25);
        let r = ctl.readouts();
        assert_eq!(r.gain, "75");
        assert_eq!(r.delay, "0.50");
        assert_eq!(r.feedback, "0.25");
        assert_eq!(r.to_string(), "gain 75% | delay 0.50 s | feedback 0.25");
    }

    #[test]
    fn setters_reach_the_live_graph() {
        let backend = MockBackend::new();
        let mut ctl = controller(&backend);
        assert!(ctl.live_parameters().is_none());
        ctl.start().unwrap();
        assert_eq!(ctl.set_feedback_gain(3.0), 0.95);
        assert_eq!(ctl.live_parameters().map(|p| p.feedback_gain), Some(0.95));
        ctl.stop().unwrap();
    }

    #[test]
    fn transport_hint_names_wireless_speaker() {
        let backend = MockBackend::new().with_devices(vec![
            AudioDevice::input("Built-in Microphone", 48000),
            AudioDevice::output("JBL Charge 5 Bluetooth", 48000),
        ]);
        let ctl = controller(&backend);
        assert!(ctl.transport().is_wireless());
        assert!(ctl.transport_hint().contains("JBL Charge 5 Bluetooth"));
    }
}
