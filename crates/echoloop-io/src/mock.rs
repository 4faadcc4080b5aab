//! Deterministic in-process backend.
//!
//! [`MockBackend`] never touches hardware. Streams it builds are stored as
//! callback slots; a test drives them with [`MockBackend::pump`], which runs
//! the input callback and then the output callback on the calling thread.
//! Dropping a [`StreamHandle`] clears its slot, so nothing runs after a
//! stream is torn down.
//!
//! Clones share state: keep one clone in the test and hand another to the
//! code under test.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, InputConstraints,
    OutputCallback, StreamHandle,
};
use crate::{AudioDevice, Error, Result};

#[derive(Default)]
struct Slots {
    input: Option<(InputCallback, ErrorCallback)>,
    output: Option<(OutputCallback, ErrorCallback)>,
    input_constraints: Option<InputConstraints>,
    input_config: Option<BackendStreamConfig>,
    output_config: Option<BackendStreamConfig>,
    streams_built: usize,
}

impl Slots {
    /// Interleaved width of the most recent output stream.
    fn output_channels(&self) -> usize {
        self.output_config
            .as_ref()
            .map_or(2, |c| usize::from(c.channels.max(1)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// Clears a callback slot when the owning [`StreamHandle`] is dropped.
struct SlotGuard {
    slots: Arc<Mutex<Slots>>,
    direction: Direction,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        match self.direction {
            Direction::Input => slots.input = None,
            Direction::Output => slots.output = None,
        }
    }
}

/// Scripted audio backend for tests and headless runs.
#[derive(Clone)]
pub struct MockBackend {
    slots: Arc<Mutex<Slots>>,
    devices: Vec<AudioDevice>,
    sample_rate: u32,
    deny_input: bool,
    fail_output: bool,
}

impl MockBackend {
    /// A backend with one wired input and one wired output at 48 kHz.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            devices: vec![
                AudioDevice::input("Mock Microphone", 48000),
                AudioDevice::output("Mock Speakers", 48000),
            ],
            sample_rate: 48000,
            deny_input: false,
            fail_output: false,
        }
    }

    /// Refuse microphone access, as a user declining the permission prompt.
    #[must_use]
    pub fn deny_input(mut self) -> Self {
        self.deny_input = true;
        self
    }

    /// Report no output device.
    #[must_use]
    pub fn without_output(mut self) -> Self {
        self.fail_output = true;
        self
    }

    /// Replace the device list.
    #[must_use]
    pub fn with_devices(mut self, devices: Vec<AudioDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// Run streams at `sample_rate` regardless of what is requested.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Feeds `input` (mono) to the input stream, then pulls the same number
    /// of frames from the output stream.
    ///
    /// Returns interleaved output samples. Missing streams contribute
    /// silence.
    pub fn pump(&self, input: &[f32]) -> Vec<f32> {
        if let Some((callback, _)) = self.slots.lock().input.as_mut() {
            callback(input);
        }
        self.pull(input.len())
    }

    /// Runs only the output callback for `frames` frames.
    pub fn pull(&self, frames: usize) -> Vec<f32> {
        let mut slots = self.slots.lock();
        let channels = slots.output_channels();
        let mut out = vec![0.0; frames * channels];
        if let Some((callback, _)) = slots.output.as_mut() {
            callback(&mut out);
        }
        out
    }

    /// Like [`pump`](Self::pump), returning only the first output channel.
    pub fn pump_mono(&self, input: &[f32]) -> Vec<f32> {
        let channels = self.slots.lock().output_channels();
        self.pump(input).into_iter().step_by(channels).collect()
    }

    /// Delivers `message` to every open stream's error callback.
    pub fn raise_error(&self, message: &str) {
        let mut slots = self.slots.lock();
        if let Some((_, on_error)) = slots.input.as_mut() {
            on_error(message);
        }
        if let Some((_, on_error)) = slots.output.as_mut() {
            on_error(message);
        }
    }

    /// Streams currently alive.
    pub fn open_streams(&self) -> usize {
        let slots = self.slots.lock();
        usize::from(slots.input.is_some()) + usize::from(slots.output.is_some())
    }

    /// Streams built over the backend's lifetime.
    pub fn streams_built(&self) -> usize {
        self.slots.lock().streams_built
    }

    /// Constraints passed to the most recent input stream.
    pub fn last_input_constraints(&self) -> Option<InputConstraints> {
        self.slots.lock().input_constraints
    }

    /// Config of the most recent input stream.
    pub fn last_input_config(&self) -> Option<BackendStreamConfig> {
        self.slots.lock().input_config.clone()
    }

    /// Config of the most recent output stream.
    pub fn last_output_config(&self) -> Option<BackendStreamConfig> {
        self.slots.lock().output_config.clone()
    }

    fn handle(&self, direction: Direction) -> StreamHandle {
        StreamHandle::new(SlotGuard {
            slots: Arc::clone(&self.slots),
            direction,
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("devices", &self.devices)
            .field("sample_rate", &self.sample_rate)
            .field("open_streams", &self.open_streams())
            .finish_non_exhaustive()
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(self.devices.clone())
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        if self.fail_output {
            return Ok(None);
        }
        Ok(self.devices.iter().find(|d| d.is_output).cloned())
    }

    fn default_input_device(&self) -> Result<Option<AudioDevice>> {
        Ok(self.devices.iter().find(|d| d.is_input).cloned())
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        if self.fail_output {
            return Err(Error::DeviceUnavailable("no output device".into()));
        }
        let mut slots = self.slots.lock();
        slots.output = Some((callback, error_callback));
        slots.output_config = Some(config.clone());
        slots.streams_built += 1;
        drop(slots);
        Ok(self.handle(Direction::Output))
    }

    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        constraints: &InputConstraints,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let mut slots = self.slots.lock();
        slots.input_constraints = Some(*constraints);
        slots.input_config = Some(config.clone());
        if self.deny_input {
            return Err(Error::PermissionDenied(
                "microphone permission refused".into(),
            ));
        }
        slots.input = Some((callback, error_callback));
        slots.streams_built += 1;
        drop(slots);
        Ok(self.handle(Direction::Input))
    }

    fn actual_sample_rate(&self, _config: &BackendStreamConfig) -> u32 {
        self.sample_rate
    }
}
