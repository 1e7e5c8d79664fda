//! Planar audio block, the host buffer contract.
//!
//! A block is a `[channel][frame]` container with a fixed frame capacity, a
//! valid-frame count and a stream state. The same type backs both the host
//! input/output buffers and the bus's shared aggregate; the aggregate is
//! zeroed in place at epoch boundaries so its allocation survives the session.

/// Data-readiness state of a block, reported back to the host after each
/// processing quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// The stream has ended; no further input will arrive.
    NoMoreData,
    /// The block is full and ready to be consumed.
    DataReady,
    /// More input is needed before the block is full.
    #[default]
    DataNeeded,
}

/// Planar multi-channel f32 sample container.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    max_frames: usize,
    valid_frames: usize,
    state: StreamState,
}

impl AudioBlock {
    /// Create a zeroed block with the given shape. Valid frames start at 0.
    pub fn new(num_channels: usize, max_frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; max_frames]; num_channels],
            max_frames,
            valid_frames: 0,
            state: StreamState::default(),
        }
    }

    /// Create a block from planar sample data. All channels are padded to the
    /// longest one; every frame is marked valid and the state is `DataReady`.
    pub fn from_planar(data: Vec<Vec<f32>>) -> Self {
        let max_frames = data.iter().map(Vec::len).max().unwrap_or(0);
        let mut channels = data;
        for ch in &mut channels {
            ch.resize(max_frames, 0.0);
        }
        Self {
            channels,
            max_frames,
            valid_frames: max_frames,
            state: StreamState::DataReady,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn valid_frames(&self) -> usize {
        self.valid_frames
    }

    /// Set the valid-frame count, clamped to capacity.
    pub fn set_valid_frames(&mut self, frames: usize) {
        self.valid_frames = frames.min(self.max_frames);
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn set_state(&mut self, state: StreamState) {
        self.state = state;
    }

    /// Full-capacity sample slice for one channel.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    pub fn has_data(&self) -> bool {
        self.valid_frames > 0
    }

    /// Zero every sample in place, preserving shape and allocation.
    pub fn zero(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    /// Resize to the given shape, growing allocations only when needed.
    /// Overlapping contents are preserved; new channels and frames are zeroed.
    pub fn reshape(&mut self, num_channels: usize, frames: usize) {
        if frames > self.max_frames {
            self.max_frames = frames;
            for ch in &mut self.channels {
                ch.resize(frames, 0.0);
            }
        }
        self.channels
            .resize(num_channels, vec![0.0; self.max_frames]);
        self.valid_frames = frames.min(self.max_frames);
    }

    /// Sum another block into this one at matching `[channel][frame]`
    /// positions, over the overlapping valid region.
    pub fn accumulate(&mut self, other: &AudioBlock) {
        let channels = self.num_channels().min(other.num_channels());
        let frames = self.valid_frames.min(other.valid_frames);
        for c in 0..channels {
            let src = &other.channels[c][..frames];
            let dst = &mut self.channels[c][..frames];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += *s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_is_zeroed() {
        let block = AudioBlock::new(2, 64);
        assert_eq!(block.num_channels(), 2);
        assert_eq!(block.max_frames(), 64);
        assert_eq!(block.valid_frames(), 0);
        assert!(block.channel(0).iter().all(|&s| s == 0.0));
        assert!(!block.has_data());
    }

    #[test]
    fn test_from_planar_marks_all_frames_valid() {
        let block = AudioBlock::from_planar(vec![vec![0.5; 8], vec![0.25; 8]]);
        assert_eq!(block.valid_frames(), 8);
        assert_eq!(block.state(), StreamState::DataReady);
        assert_eq!(block.channel(1)[7], 0.25);
    }

    #[test]
    fn test_accumulate_sums_matching_positions() {
        let mut sum = AudioBlock::new(2, 4);
        sum.set_valid_frames(4);
        let a = AudioBlock::from_planar(vec![vec![1.0, 2.0, 3.0, 4.0], vec![0.1, 0.2, 0.3, 0.4]]);
        let b = AudioBlock::from_planar(vec![vec![0.5; 4], vec![0.5; 4]]);
        sum.accumulate(&a);
        sum.accumulate(&b);
        assert_eq!(sum.channel(0), &[1.5, 2.5, 3.5, 4.5]);
        assert!((sum.channel(1)[3] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_accumulate_respects_min_valid_frames() {
        let mut sum = AudioBlock::new(1, 4);
        sum.set_valid_frames(2);
        let src = AudioBlock::from_planar(vec![vec![1.0; 4]]);
        sum.accumulate(&src);
        assert_eq!(sum.channel(0), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_preserves_shape() {
        let mut block = AudioBlock::from_planar(vec![vec![1.0; 16]]);
        block.zero();
        assert_eq!(block.max_frames(), 16);
        assert_eq!(block.valid_frames(), 16);
        assert!(block.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reshape_grows_and_zeroes_new_space() {
        let mut block = AudioBlock::new(1, 4);
        block.reshape(2, 8);
        assert_eq!(block.num_channels(), 2);
        assert_eq!(block.max_frames(), 8);
        assert_eq!(block.valid_frames(), 8);
        assert!(block.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_valid_frames_clamps_to_capacity() {
        let mut block = AudioBlock::new(1, 4);
        block.set_valid_frames(100);
        assert_eq!(block.valid_frames(), 4);
    }
}
