//! Audio-thread executor for a compiled [`SignalTopology`](super::SignalTopology).

use std::sync::Arc;

use crate::math::flush_denormal;
use crate::params::{FEEDBACK_RANGE, GAIN_RANGE, MAX_FEEDBACK_GAIN, ParameterStore};

use super::node::{GainRole, NodeKind};

/// Compiled graph owned by the audio thread.
///
/// All buffers are allocated at compile time; [`process_block`](Self::process_block)
/// neither allocates nor locks. Live parameters are read from the shared
/// [`ParameterStore`] once per block and then ramped per sample.
pub struct GraphProcessor {
    nodes: Vec<NodeKind>,
    /// Per node, the arena indices of the nodes feeding it (feedback included).
    incoming: Vec<Vec<usize>>,
    /// Non-delay nodes in topological order.
    order: Vec<usize>,
    /// Delay nodes, in arena order.
    delays: Vec<usize>,
    /// Latest output of every node for the current sample.
    values: Vec<f32>,
    sink: usize,
    sample_rate: f32,
    params: Arc<ParameterStore>,
}

impl GraphProcessor {
    pub(crate) fn new(
        nodes: Vec<NodeKind>,
        incoming: Vec<Vec<usize>>,
        topo_order: &[usize],
        sample_rate: f32,
        params: Arc<ParameterStore>,
    ) -> Self {
        let delays: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].is_delay()).collect();
        let order: Vec<usize> = topo_order
            .iter()
            .copied()
            .filter(|&i| !nodes[i].is_delay())
            .collect();
        let sink = nodes
            .iter()
            .position(|n| matches!(n, NodeKind::Sink))
            .unwrap_or(0);

        let mut processor = Self {
            values: vec![0.0; nodes.len()],
            nodes,
            incoming,
            order,
            delays,
            sink,
            sample_rate,
            params,
        };
        processor.sync_params();
        processor.snap_params();
        processor
    }

    /// Processes one block of mono samples.
    ///
    /// Parameter changes made since the previous call take effect at the start
    /// of this block and are ramped from there. If `input` is shorter than
    /// `output`, the missing input is treated as silence.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        self.sync_params();
        for (i, out) in output.iter_mut().enumerate() {
            let x = input.get(i).copied().unwrap_or(0.0);
            *out = self.tick(x);
        }
    }

    /// Sample rate the graph was compiled for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Shared parameter store this processor reads from.
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Silences every delay line. Smoother state is kept.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            if let NodeKind::Delay { line, .. } = node {
                line.clear();
            }
        }
        self.values.fill(0.0);
    }

    /// Reads the store and retargets every smoother.
    fn sync_params(&mut self) {
        let snap = self.params.snapshot();
        for node in &mut self.nodes {
            match node {
                NodeKind::Gain { role, level } => {
                    let target = match role {
                        GainRole::Master => GAIN_RANGE.clamp(snap.gain),
                        GainRole::Feedback => FEEDBACK_RANGE.clamp(snap.feedback_gain),
                    };
                    level.set_target(target);
                }
                NodeKind::Delay { time_secs, .. } => time_secs.set_target(snap.delay_time_secs),
                _ => {}
            }
        }
    }

    fn snap_params(&mut self) {
        for node in &mut self.nodes {
            match node {
                NodeKind::Gain { level, .. } => level.snap_to_target(),
                NodeKind::Delay { time_secs, .. } => time_secs.snap_to_target(),
                _ => {}
            }
        }
    }

    /// Runs one sample through the three evaluation phases.
    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let sample_rate = self.sample_rate;

        // Phase 1: delays emit what was written on earlier samples.
        for &d in &self.delays {
            if let NodeKind::Delay { line, time_secs } = &mut self.nodes[d] {
                let delay_samples = time_secs.advance() * sample_rate;
                // Read happens before this sample's write, which adds one.
                self.values[d] = line.read((delay_samples - 1.0).max(0.0));
            }
        }

        // Phase 2: everything else in topological order.
        for &n in &self.order {
            let sum: f32 = self.incoming[n].iter().map(|&i| self.values[i]).sum();
            self.values[n] = match &mut self.nodes[n] {
                NodeKind::Source => input,
                NodeKind::Gain { role, level } => {
                    let g = level.advance();
                    let g = match role {
                        GainRole::Master => g,
                        GainRole::Feedback => g.min(MAX_FEEDBACK_GAIN),
                    };
                    sum * g
                }
                NodeKind::Sink => sum,
                NodeKind::AnalysisTap(writer) => {
                    writer.push(sum);
                    sum
                }
                NodeKind::Delay { .. } => continue,
            };
        }

        // Phase 3: delays take the sum of their inputs, feedback included.
        for &d in &self.delays {
            let sum: f32 = self.incoming[d].iter().map(|&i| self.values[i]).sum();
            if let NodeKind::Delay { line, .. } = &mut self.nodes[d] {
                line.write(flush_denormal(sum));
            }
        }

        self.values[self.sink]
    }
}

#[cfg(test)]
mod tests {
    use super::super::build_karaoke_graph;
    use super::*;
    use crate::params::ParameterSnapshot;

    const SR: f32 = 48000.0;

    fn impulse_response(snapshot: ParameterSnapshot, len: usize) -> Vec<f32> {
        let params = Arc::new(ParameterStore::with_snapshot(snapshot));
        let mut built = build_karaoke_graph(SR, params).unwrap();
        let mut input = vec![0.0; len];
        input[0] = 1.0;
        let mut output = vec![0.0; len];
        built.processor.process_block(&input, &mut output);
        output
    }

    #[test]
    fn dry_path_passes_at_gain() {
        let out = impulse_response(
            ParameterSnapshot {
                gain: 0.5,
                delay_time_secs: 0.01,
                feedback_gain: 0.0,
            },
            16,
        );
        assert!((out[0] - 0.5).abs() < 1e-6, "dry sample was {}", out[0]);
    }

    #[test]
    fn first_echo_lands_after_delay_time() {
        // 1/64 s at 48 kHz = 750 samples
        let out = impulse_response(
            ParameterSnapshot {
                gain: 1.0,
                delay_time_secs: 0.015625,
                feedback_gain: 0.5,
            },
            2400,
        );
        assert!((out[750] - 1.0).abs() < 1e-4, "echo 1 = {}", out[750]);
        assert!((out[1500] - 0.5).abs() < 1e-4, "echo 2 = {}", out[1500]);
        assert!((out[2250] - 0.25).abs() < 1e-4, "echo 3 = {}", out[2250]);
        assert!(out[1..750].iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn zero_delay_time_still_delays_one_sample() {
        let out = impulse_response(
            ParameterSnapshot {
                gain: 1.0,
                delay_time_secs: 0.0,
                feedback_gain: 0.0,
            },
            4,
        );
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(out[2].abs() < 1e-6);
    }

    #[test]
    fn parameter_change_applies_at_block_boundary_and_ramps() {
        let params = Arc::new(ParameterStore::with_snapshot(ParameterSnapshot {
            gain: 1.0,
            delay_time_secs: 0.5,
            feedback_gain: 0.0,
        }));
        let mut built = build_karaoke_graph(SR, Arc::clone(&params)).unwrap();
        let input = [1.0_f32; 256];
        let mut output = [0.0_f32; 256];
        built.processor.process_block(&input, &mut output);
        assert!(output.iter().all(|&s| (s - 1.0).abs() < 1e-6));

        params.set_gain(0.0);
        built.processor.process_block(&input, &mut output);
        // Ramped, not stepped.
        assert!(output[0] > 0.9, "first sample after change: {}", output[0]);
        assert!(output[255] < output[0]);
    }

    /// 110 Hz puts the 0.3 s and 0.05 s echoes half a cycle apart, so a
    /// stepped delay would flip the echo's sign in one sample.
    fn sine_110(n: usize) -> f32 {
        (0.5 * (std::f64::consts::TAU * 110.0 * n as f64 / f64::from(SR)).sin()) as f32
    }

    fn render_sine(processor: &mut GraphProcessor, start: usize, blocks: usize) -> Vec<f32> {
        let mut rendered = Vec::with_capacity(blocks * 256);
        let mut output = [0.0_f32; 256];
        for b in 0..blocks {
            let offset = start + b * 256;
            let input: Vec<f32> = (offset..offset + 256).map(sine_110).collect();
            processor.process_block(&input, &mut output);
            rendered.extend_from_slice(&output);
        }
        rendered
    }

    #[test]
    fn delay_time_change_glides_from_the_old_delay() {
        let params = Arc::new(ParameterStore::with_snapshot(ParameterSnapshot {
            gain: 1.0,
            delay_time_secs: 0.3,
            feedback_gain: 0.0,
        }));
        let mut built = build_karaoke_graph(SR, Arc::clone(&params)).unwrap();
        let old_delay = 14400;
        let new_delay = 2400;

        let before = render_sine(&mut built.processor, 0, 64);
        let boundary = before.len();
        let last = before[boundary - 1];
        let expected = sine_110(boundary - 1) + sine_110(boundary - 1 - old_delay);
        assert!((last - expected).abs() < 1e-3, "steady echo: {last} vs {expected}");

        params.set_delay_time(0.05);
        let after = render_sine(&mut built.processor, boundary, 120);

        // The first sample after the change still reads close to 0.3 s back.
        let near_old = sine_110(boundary) + sine_110(boundary - old_delay);
        assert!(
            (after[0] - near_old).abs() < 0.05,
            "first sample after change: {} vs {near_old}",
            after[0]
        );

        let max_jump = std::iter::once(last)
            .chain(after.iter().copied())
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0_f32, f32::max);
        assert!(max_jump < 0.1, "largest sample step during glide: {max_jump}");

        // Settled on the new delay well after 50 ms.
        let n = boundary + after.len() - 1;
        let settled = sine_110(n) + sine_110(n - new_delay);
        let tail = after[after.len() - 1];
        assert!((tail - settled).abs() < 0.01, "settled echo: {tail} vs {settled}");
    }

    #[test]
    fn reset_clears_echo_tail() {
        let params = Arc::new(ParameterStore::with_snapshot(ParameterSnapshot {
            gain: 1.0,
            delay_time_secs: 0.001,
            feedback_gain: 0.9,
        }));
        let mut built = build_karaoke_graph(SR, Arc::clone(&params)).unwrap();
        let mut out = [0.0_f32; 128];
        built.processor.process_block(&[1.0; 128], &mut out);
        built.processor.reset();
        built.processor.process_block(&[0.0; 128], &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn short_input_is_padded_with_silence() {
        let params = Arc::new(ParameterStore::new());
        let mut built = build_karaoke_graph(SR, params).unwrap();
        let mut out = [1.0_f32; 8];
        built.processor.process_block(&[], &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tap_receives_gained_signal() {
        let params = Arc::new(ParameterStore::with_snapshot(ParameterSnapshot {
            gain: 0.5,
            ..ParameterSnapshot::default()
        }));
        let mut built = build_karaoke_graph(SR, params).unwrap();
        let mut out = [0.0_f32; 64];
        built.processor.process_block(&[1.0; 64], &mut out);
        let (block, fresh) = built.tap.latest();
        assert!(fresh);
        assert!(block.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }
}
