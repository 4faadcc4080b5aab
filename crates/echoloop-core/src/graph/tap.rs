//! Analysis tap: hands the latest block of samples to the analyzer.
//!
//! The writer lives in the audio thread and publishes every full block of
//! [`TAP_BLOCK_SIZE`] samples through a triple buffer. The reader never
//! blocks and always sees a complete block: the newest one published, or the
//! previous one again if nothing new arrived.

/// Samples per published tap block. Matches the analyzer's FFT frame.
pub const TAP_BLOCK_SIZE: usize = 64;

/// One block of tapped samples.
pub type TapBlock = [f32; TAP_BLOCK_SIZE];

/// Audio-thread side of the tap.
pub(crate) struct TapWriter {
    input: triple_buffer::Input<TapBlock>,
    pending: TapBlock,
    fill: usize,
}

impl TapWriter {
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.pending[self.fill] = sample;
        self.fill += 1;
        if self.fill == TAP_BLOCK_SIZE {
            self.input.write(self.pending);
            self.fill = 0;
        }
    }
}

/// Analyzer side of the tap.
pub struct TapReader {
    output: triple_buffer::Output<TapBlock>,
}

impl TapReader {
    /// Returns the newest complete block and whether it was published since
    /// the previous call.
    pub fn latest(&mut self) -> (&TapBlock, bool) {
        let fresh = self.output.updated();
        (self.output.read(), fresh)
    }
}

impl std::fmt::Debug for TapReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapReader").finish_non_exhaustive()
    }
}

/// Creates a connected writer/reader pair, initially holding silence.
pub(crate) fn tap_channel() -> (TapWriter, TapReader) {
    let (input, output) = triple_buffer::triple_buffer(&[0.0; TAP_BLOCK_SIZE]);
    (
        TapWriter {
            input,
            pending: [0.0; TAP_BLOCK_SIZE],
            fill: 0,
        },
        TapReader { output },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_starts_with_silence_not_fresh() {
        let (_writer, mut reader) = tap_channel();
        let (block, fresh) = reader.latest();
        assert!(block.iter().all(|&s| s == 0.0));
        assert!(!fresh);
    }

    #[test]
    fn publishes_only_full_blocks() {
        let (mut writer, mut reader) = tap_channel();
        for _ in 0..TAP_BLOCK_SIZE - 1 {
            writer.push(1.0);
        }
        assert!(!reader.latest().1);

        writer.push(1.0);
        let (block, fresh) = reader.latest();
        assert!(fresh);
        assert!(block.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn stale_block_is_reused() {
        let (mut writer, mut reader) = tap_channel();
        for i in 0..TAP_BLOCK_SIZE {
            writer.push(i as f32);
        }
        let first = *reader.latest().0;
        let (again, fresh) = reader.latest();
        assert!(!fresh);
        assert_eq!(&first, again);
    }
}
