//! Per-instance ducking processor.
//!
//! One `DuckerVoice` is created per sound-emitting object and driven once
//! per audio quantum by the host. Each `process` call contributes the
//! voice's block and rank to the shared bus, waits (bounded) for the group,
//! then applies priority-weighted gain reduction from the group envelope to
//! the voice's own private output block. Timeouts fall back to the last
//! known percentile and envelope carry; audio continues with stale
//! compression parameters rather than dropping out.

use crate::envelope::RmsEnvelope;
use crate::error::{Error, Result};
use crate::gain::{ratio_for, GainCurve};
use crate::params::DuckerParams;
use crate::utils::{amplitude_to_db, db_to_amplitude};
use ripieno_core::{
    AudioBlock, InstanceId, QuantumReport, SidechainBus, StreamState, DEFAULT_PERCENTILE,
};
use std::sync::Weak;

pub struct DuckerVoice {
    bus: Weak<SidechainBus>,
    id: InstanceId,
    params: DuckerParams,
    envelope: RmsEnvelope,
    last_percentile: f32,
    last_gain_db: f32,
    frames_processed: u64,
    registered: bool,
}

impl DuckerVoice {
    /// Register a voice on the bus. Fails only for configuration errors:
    /// a dead bus handle or a non-positive sample rate. The voice keeps a
    /// non-owning handle; the bus outlives all voices.
    pub fn new(
        bus: Weak<SidechainBus>,
        id: InstanceId,
        params: DuckerParams,
        sample_rate: f64,
    ) -> Result<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        let Some(live) = bus.upgrade() else {
            return Err(Error::BusUnavailable);
        };

        live.register(id);
        live.set_priority(id, params.priority_rank());

        Ok(Self {
            bus,
            id,
            params,
            envelope: RmsEnvelope::new(sample_rate),
            last_percentile: DEFAULT_PERCENTILE,
            last_gain_db: 0.0,
            frames_processed: 0,
            registered: true,
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn params(&self) -> &DuckerParams {
        &self.params
    }

    /// Gain applied at the final frame of the last quantum, in dB.
    pub fn last_gain_db(&self) -> f32 {
        self.last_gain_db
    }

    pub fn last_percentile(&self) -> f32 {
        self.last_percentile
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Process one quantum: `input` from `frame_offset` into `output`,
    /// appending after `output`'s current valid frames. Stream states are
    /// updated on both blocks for the host.
    pub fn process(&mut self, input: &mut AudioBlock, frame_offset: usize, output: &mut AudioBlock) {
        let Some(bus) = self.bus.upgrade() else {
            // Session over: unity pass-through, never silence.
            self.passthrough(input, frame_offset, output);
            return;
        };
        if input.num_channels() == 0 || output.num_channels() != input.num_channels() {
            // Malformed host block; do not touch shared state this quantum.
            self.passthrough(input, frame_offset, output);
            return;
        }

        bus.begin_quantum();
        bus.mix_in(self.id, input);
        bus.set_priority(self.id, self.params.priority_rank());

        let synced = bus.wait_mix_and_priority();
        let mut env_ready = false;
        if synced {
            let envelope = &self.envelope;
            bus.fill_envelope(|aggregate, table, carry| envelope.fill(aggregate, table, carry));
            env_ready = bus.wait_envelope();
        }

        if synced {
            self.last_percentile = bus.percentile_of(self.id);
        }
        let ratio = ratio_for(self.last_percentile, self.params.max_ratio());
        let curve = GainCurve::new(self.params.threshold_db(), self.params.knee_db(), ratio);

        let channels = input.num_channels();
        let out_start = output.valid_frames();
        let budget = input
            .valid_frames()
            .min(output.max_frames() - out_start)
            .min(input.max_frames().saturating_sub(frame_offset));

        let report_wanted = bus.telemetry().is_enabled();
        let mut env_snapshot = Vec::new();
        let mut final_gain_db = 0.0f32;

        bus.with_envelope(|view| {
            let use_table = env_ready && view.ready;
            for c in 0..channels {
                for frame in 0..budget {
                    let level = if use_table {
                        view.table
                            .get(c)
                            .and_then(|row| row.get(frame))
                            .copied()
                            .or_else(|| view.carry.get(c).copied())
                            .unwrap_or(0.0)
                    } else {
                        view.carry.get(c).copied().unwrap_or(0.0)
                    };
                    let gain_db = curve.gain_db(amplitude_to_db(level)).min(0.0);
                    let sample = input.channel(c)[frame_offset + frame];
                    output.channel_mut(c)[out_start + frame] = sample * db_to_amplitude(gain_db);
                    if c == 0 {
                        final_gain_db = gain_db;
                    }
                }
            }
            if report_wanted {
                env_snapshot = view.carry.to_vec();
            }
        });

        self.last_gain_db = final_gain_db;
        let consumed = budget;
        let produced = budget;
        input.set_valid_frames(input.valid_frames() - consumed);
        output.set_valid_frames(out_start + produced);
        Self::update_stream_state(input, output);

        if report_wanted {
            let snap = bus.snapshot();
            bus.telemetry().emit(QuantumReport {
                epoch: snap.epoch,
                instance: self.id,
                envelope: env_snapshot,
                gain_db: self.last_gain_db,
                percentile: self.last_percentile,
                active_instances: snap.active,
                ranked_instances: snap.ranked,
            });
        }

        self.frames_processed += produced as u64;
        bus.finish_quantum(self.id);
    }

    /// Unity-gain copy for degraded quanta.
    fn passthrough(&mut self, input: &mut AudioBlock, frame_offset: usize, output: &mut AudioBlock) {
        let channels = input.num_channels().min(output.num_channels());
        let out_start = output.valid_frames();
        let budget = input
            .valid_frames()
            .min(output.max_frames() - out_start)
            .min(input.max_frames().saturating_sub(frame_offset));

        for c in 0..channels {
            for frame in 0..budget {
                let sample = input.channel(c)[frame_offset + frame];
                output.channel_mut(c)[out_start + frame] = sample;
            }
        }

        input.set_valid_frames(input.valid_frames() - budget);
        output.set_valid_frames(out_start + budget);
        Self::update_stream_state(input, output);

        self.last_gain_db = 0.0;
        self.frames_processed += budget as u64;
    }

    fn update_stream_state(input: &AudioBlock, output: &mut AudioBlock) {
        if input.state() == StreamState::NoMoreData && input.valid_frames() == 0 {
            output.set_state(StreamState::NoMoreData);
        } else if output.valid_frames() == output.max_frames() {
            output.set_state(StreamState::DataReady);
        } else {
            output.set_state(StreamState::DataNeeded);
        }
    }

    /// Unregister from the bus. Idempotent; also runs on `Drop`.
    pub fn terminate(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.unregister(self.id);
        }
    }

    /// Host `reset` hook: stream position only, epoch data untouched.
    pub fn reset(&mut self) {
        self.frames_processed = 0;
    }

    /// Advance the stream position without processing.
    pub fn time_skip(&mut self, frames: u32) -> StreamState {
        self.frames_processed += u64::from(frames);
        StreamState::DataReady
    }
}

impl Drop for DuckerVoice {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    const SR: f64 = 48000.0;

    fn test_bus() -> Arc<SidechainBus> {
        SidechainBus::builder()
            .wait_timeout(Duration::from_millis(50))
            .channels(2)
            .max_frames(512)
            .build()
            .unwrap()
    }

    fn voice(bus: &Arc<SidechainBus>, id: u64, params: DuckerParams) -> DuckerVoice {
        DuckerVoice::new(Arc::downgrade(bus), InstanceId::new(id), params, SR).unwrap()
    }

    fn dc_input(value: f32, frames: usize) -> AudioBlock {
        AudioBlock::from_planar(vec![vec![value; frames], vec![value; frames]])
    }

    #[test]
    fn test_rejects_invalid_sample_rate() {
        let bus = test_bus();
        let result = DuckerVoice::new(
            Arc::downgrade(&bus),
            InstanceId::new(1),
            DuckerParams::default(),
            0.0,
        );
        assert!(matches!(result, Err(Error::InvalidSampleRate(_))));
    }

    #[test]
    fn test_rejects_dead_bus() {
        let weak = {
            let bus = test_bus();
            Arc::downgrade(&bus)
        };
        let result = DuckerVoice::new(weak, InstanceId::new(1), DuckerParams::default(), SR);
        assert!(matches!(result, Err(Error::BusUnavailable)));
    }

    #[test]
    fn test_single_voice_ducks_loud_input() {
        let bus = test_bus();
        let params = DuckerParams::builder()
            .threshold_db(-40.0)
            .max_ratio(8.0)
            .knee_db(0.0)
            .build();
        let mut voice = voice(&bus, 1, params);

        // Several quanta so the running RMS converges well above threshold.
        let mut last_frame = 1.0;
        for _ in 0..8 {
            let mut input = dc_input(1.0, 256);
            let mut output = AudioBlock::new(2, 256);
            voice.process(&mut input, 0, &mut output);
            last_frame = output.channel(0)[255];
        }

        assert!(
            last_frame < 0.9,
            "loud input should be attenuated, got {last_frame}"
        );
        assert!(voice.last_gain_db() < 0.0);
    }

    #[test]
    fn test_quiet_input_passes_at_unity() {
        let bus = test_bus();
        let params = DuckerParams::builder()
            .threshold_db(-12.0)
            .max_ratio(8.0)
            .knee_db(0.0)
            .build();
        let mut voice = voice(&bus, 1, params);

        let mut input = dc_input(0.001, 128);
        let mut output = AudioBlock::new(2, 128);
        voice.process(&mut input, 0, &mut output);

        for c in 0..2 {
            for frame in 0..128 {
                assert!(
                    (output.channel(c)[frame] - 0.001).abs() < 1e-7,
                    "below-threshold audio must be untouched"
                );
            }
        }
        assert_eq!(voice.last_gain_db(), 0.0);
    }

    #[test]
    fn test_channel_mismatch_passes_through_without_contributing() {
        let bus = test_bus();
        let mut voice = voice(&bus, 1, DuckerParams::default());

        let mut input = AudioBlock::from_planar(vec![vec![0.5; 64]]);
        let mut output = AudioBlock::new(2, 64);
        voice.process(&mut input, 0, &mut output);

        assert_eq!(bus.snapshot().contributed, 0);
        assert_eq!(output.valid_frames(), 64);
        assert!((output.channel(0)[0] - 0.5).abs() < 1e-7);
    }

    #[test]
    fn test_stream_state_bookkeeping() {
        let bus = test_bus();
        let mut voice = voice(&bus, 1, DuckerParams::default());

        // Output larger than input: more data needed.
        let mut input = dc_input(0.1, 64);
        let mut output = AudioBlock::new(2, 128);
        voice.process(&mut input, 0, &mut output);
        assert_eq!(input.valid_frames(), 0);
        assert_eq!(output.valid_frames(), 64);
        assert_eq!(output.state(), StreamState::DataNeeded);

        // Exact fit: output full and ready.
        bus.begin_quantum();
        let mut input = dc_input(0.1, 128);
        let mut output = AudioBlock::new(2, 128);
        voice.process(&mut input, 0, &mut output);
        assert_eq!(output.state(), StreamState::DataReady);

        // End of stream, fully drained.
        bus.begin_quantum();
        let mut input = dc_input(0.1, 32);
        input.set_state(StreamState::NoMoreData);
        let mut output = AudioBlock::new(2, 128);
        voice.process(&mut input, 0, &mut output);
        assert_eq!(output.state(), StreamState::NoMoreData);
    }

    #[test]
    fn test_terminate_unregisters() {
        let bus = test_bus();
        let mut voice = voice(&bus, 1, DuckerParams::default());
        assert_eq!(bus.active_count(), 1);

        voice.terminate();
        assert_eq!(bus.active_count(), 0);
        voice.terminate(); // idempotent
        assert_eq!(bus.active_count(), 0);
    }

    #[test]
    fn test_drop_unregisters() {
        let bus = test_bus();
        {
            let _voice = voice(&bus, 1, DuckerParams::default());
            assert_eq!(bus.active_count(), 1);
        }
        assert_eq!(bus.active_count(), 0);
    }

    #[test]
    fn test_reset_and_time_skip() {
        let bus = test_bus();
        let mut voice = voice(&bus, 1, DuckerParams::default());

        assert_eq!(voice.time_skip(480), StreamState::DataReady);
        assert_eq!(voice.frames_processed(), 480);

        voice.reset();
        assert_eq!(voice.frames_processed(), 0);
    }

    #[test]
    fn test_process_after_bus_dropped_is_passthrough() {
        let bus = test_bus();
        let mut voice = voice(&bus, 1, DuckerParams::default());
        drop(bus);

        let mut input = dc_input(0.5, 32);
        let mut output = AudioBlock::new(2, 32);
        voice.process(&mut input, 0, &mut output);
        assert!((output.channel(1)[31] - 0.5).abs() < 1e-7);
    }
}
