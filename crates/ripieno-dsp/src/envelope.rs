//! Running-RMS envelope over the group aggregate.

use ripieno_core::AudioBlock;

/// One-pole running-RMS recurrence with per-channel carry.
///
/// For channel `c`, frame `n`:
///
/// ```text
/// rms[c][n] = sqrt((rms[c][n-1]^2 * (W - 1) + x[c][n]^2) / W)
/// ```
///
/// with `W = frames_per_10ms * num_channels`. This is an exponential moving
/// average of squared amplitude; `W` sets the time constant. The value at
/// `n = 0` continues from the carry of the previous quantum so the envelope
/// never restarts from zero at a block boundary. Everything stays in linear
/// amplitude; conversion to dB happens at gain time.
#[derive(Debug, Clone)]
pub struct RmsEnvelope {
    frames_per_10ms: u32,
}

impl RmsEnvelope {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            frames_per_10ms: ((sample_rate / 100.0) as u32).max(1),
        }
    }

    pub fn frames_per_10ms(&self) -> u32 {
        self.frames_per_10ms
    }

    /// Smoothing window in sample-count terms for the given channel count.
    pub fn window(&self, num_channels: usize) -> f32 {
        (self.frames_per_10ms as usize * num_channels.max(1)) as f32
    }

    /// Run the recurrence over `aggregate`, writing `table` and updating
    /// `carry` in place. `carry` must hold one value per aggregate channel;
    /// [`ripieno_core::SidechainBus::fill_envelope`] guarantees that.
    pub fn fill(&self, aggregate: &AudioBlock, table: &mut Vec<Vec<f32>>, carry: &mut [f32]) {
        let channels = aggregate.num_channels();
        let frames = aggregate.valid_frames();
        let window = self.window(channels);

        table.resize(channels, Vec::new());
        for (c, row) in table.iter_mut().enumerate() {
            row.clear();
            row.reserve(frames);

            let mut rms = carry.get(c).copied().unwrap_or(0.0);
            for &sample in &aggregate.channel(c)[..frames] {
                rms = ((rms * rms * (window - 1.0) + sample * sample) / window).sqrt();
                row.push(rms);
            }
            if let Some(slot) = carry.get_mut(c) {
                *slot = rms;
            }
        }
    }
}
