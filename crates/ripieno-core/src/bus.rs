//! Shared sidechain bus: the single source of truth for one engine session.
//!
//! Every active voice mixes its block into the aggregate once per quantum,
//! publishes its priority rank, waits (bounded) for the group to be ready,
//! and reads the group envelope back out. One `RwLock` domain protects the
//! aggregate, the priority ladder and the counters; readiness lives in the
//! [`EpochGate`] atomics so spin-waits never touch the lock.
//!
//! The bus is explicitly constructed and shared as `Arc<SidechainBus>`;
//! voices hold `Weak` handles and never extend its lifetime.

use crate::block::AudioBlock;
use crate::epoch::{spin_wait, EpochGate, EpochPhase};
use crate::error::{Error, Result};
use crate::priority::{InstanceId, PriorityLadder};
use crate::telemetry::TelemetryHub;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Bus configuration. The wait timeout is explicit so hosts with tighter
/// deadlines can shrink it; timed-out voices degrade to stale data instead
/// of blocking.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Upper bound for each synchronization spin-wait.
    pub wait_timeout: Duration,
    /// Preallocated frame capacity of the aggregate buffer.
    pub max_frames: usize,
    /// Expected channel count; the aggregate reshapes on the first
    /// contribution of an epoch if the host disagrees.
    pub channels: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(20),
            max_frames: 1024,
            channels: 2,
        }
    }
}

/// Builder for a shared bus.
#[derive(Debug, Clone, Default)]
pub struct BusBuilder {
    config: BusConfig,
}

impl BusBuilder {
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    pub fn max_frames(mut self, frames: usize) -> Self {
        self.config.max_frames = frames;
        self
    }

    pub fn channels(mut self, channels: usize) -> Self {
        self.config.channels = channels;
        self
    }

    pub fn build(self) -> Result<Arc<SidechainBus>> {
        if self.config.channels == 0 {
            return Err(Error::InvalidChannelCount(self.config.channels));
        }
        if self.config.max_frames == 0 {
            return Err(Error::InvalidBlockCapacity(self.config.max_frames));
        }
        Ok(Arc::new(SidechainBus::new(self.config)))
    }
}

/// Consistent view of the bus counters, for tests and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSnapshot {
    pub active: usize,
    pub ranked: usize,
    pub contributed: usize,
    pub finished: usize,
    pub epoch: u64,
    pub phase: EpochPhase,
}

/// Read-guard view over the envelope table for a whole gain pass.
pub struct EnvelopeView<'a> {
    /// Smoothed RMS per `[channel][frame]` of the current aggregate.
    pub table: &'a [Vec<f32>],
    /// Final envelope value per channel from the last filled epoch. This is
    /// the continuity seed for the next epoch and the fallback level when a
    /// voice timed out before the table was (re)filled.
    pub carry: &'a [f32],
    /// Whether the table belongs to the current epoch. When false the table
    /// holds the previous epoch's values and callers should fall back to
    /// `carry`.
    pub ready: bool,
}

#[derive(Debug)]
struct BusInner {
    active: HashSet<InstanceId>,
    ladder: PriorityLadder,
    aggregate: AudioBlock,
    envelope: Vec<Vec<f32>>,
    carry: Vec<f32>,
    contributed: usize,
    finished: usize,
    epoch: u64,
}

/// Process-wide shared aggregation state for one engine session.
#[derive(Debug)]
pub struct SidechainBus {
    inner: RwLock<BusInner>,
    gate: EpochGate,
    telemetry: TelemetryHub,
    config: BusConfig,
}

impl SidechainBus {
    fn new(config: BusConfig) -> Self {
        Self {
            inner: RwLock::new(BusInner {
                active: HashSet::new(),
                ladder: PriorityLadder::new(),
                aggregate: AudioBlock::new(config.channels, config.max_frames),
                envelope: Vec::new(),
                carry: Vec::new(),
                contributed: 0,
                finished: 0,
                epoch: 0,
            }),
            gate: EpochGate::new(),
            telemetry: TelemetryHub::new(),
            config,
        }
    }

    pub fn builder() -> BusBuilder {
        BusBuilder::default()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetryHub {
        &self.telemetry
    }

    /// Add `id` to the active set. Idempotent against duplicate registration.
    pub fn register(&self, id: InstanceId) {
        let mut inner = self.inner.write();
        inner.active.insert(id);
        self.reevaluate_gates(&inner);
    }

    /// Remove `id` from the active set and drop its rank. No-op for unknown
    /// ids. A mid-epoch departure shrinks the expected contributor count at
    /// once so the remaining voices' epoch can still complete; the last
    /// departure clears all epoch state including the envelope carry.
    pub fn unregister(&self, id: InstanceId) {
        let mut inner = self.inner.write();
        inner.active.remove(&id);
        inner.ladder.remove(id);

        if inner.active.is_empty() {
            inner.aggregate.zero();
            inner.envelope.clear();
            inner.carry.clear();
            inner.contributed = 0;
            inner.finished = 0;
            self.gate.reset();
        } else {
            self.reevaluate_gates(&inner);
        }
    }

    /// Sum `block` into the shared aggregate at matching positions. The
    /// first contribution of an epoch reshapes the aggregate to the block's
    /// shape. Returns false for unregistered ids, which do not count toward
    /// epoch completion.
    pub fn mix_in(&self, id: InstanceId, block: &AudioBlock) -> bool {
        let mut inner = self.inner.write();
        if !inner.active.contains(&id) {
            return false;
        }

        if inner.contributed == 0 {
            let channels = block.num_channels();
            let frames = block.valid_frames();
            inner.aggregate.reshape(channels, frames);
        }
        inner.aggregate.accumulate(block);
        inner.contributed += 1;

        if inner.contributed >= inner.active.len() {
            self.gate
                .try_advance(EpochPhase::Collecting, EpochPhase::Aggregated);
        }
        true
    }

    /// Insert or overwrite `id`'s priority rank. Marks priority-ready once
    /// every active instance is ranked.
    pub fn set_priority(&self, id: InstanceId, rank: f32) {
        let mut inner = self.inner.write();
        inner.ladder.insert(id, rank);
        self.reevaluate_gates(&inner);
    }

    /// Percentile of `id` over the currently ranked instances, in `[0, 1]`.
    /// Reads a consistent snapshot; safe to call at any time.
    pub fn percentile_of(&self, id: InstanceId) -> f32 {
        self.inner.read().ladder.percentile_of(id)
    }

    /// Fill the envelope table from the aggregate, exactly once per epoch.
    ///
    /// The first caller that observes `Aggregated` wins the CAS, runs
    /// `filler` over the aggregate under the write lock and publishes
    /// `EnvelopeReady`; every later call is a no-op returning false. The
    /// filler receives the aggregate, the table to fill and the per-channel
    /// carry (resized to the aggregate's channel count, preserved across
    /// epochs). An aggregate with no valid frames is never filled; readers
    /// fall back to the carry.
    pub fn fill_envelope<F>(&self, filler: F) -> bool
    where
        F: FnOnce(&AudioBlock, &mut Vec<Vec<f32>>, &mut [f32]),
    {
        if self.gate.at_least(EpochPhase::EnvelopeReady) {
            return false;
        }
        let mut inner = self.inner.write();
        // An empty aggregate has nothing to smooth; leave the phase at
        // Aggregated so readers fall back to the carry.
        if !inner.aggregate.has_data() {
            return false;
        }
        if !self
            .gate
            .try_advance(EpochPhase::Aggregated, EpochPhase::EnvelopeReady)
        {
            return false;
        }

        let channels = inner.aggregate.num_channels();
        inner.carry.resize(channels, 0.0);

        let BusInner {
            aggregate,
            envelope,
            carry,
            ..
        } = &mut *inner;
        filler(aggregate, envelope, carry);
        true
    }

    /// Epoch boundary detection and reset. The first caller of a new quantum
    /// that observes the prior epoch fully drained resets the shared state:
    /// aggregate zeroed in place, ladder cleared so every voice must re-rank,
    /// counters cleared, phase back to `Collecting`. Never fires mid-epoch,
    /// so a late co-instance can still land its contribution. Returns true
    /// for the caller that reset.
    pub fn begin_quantum(&self) -> bool {
        if self.gate.phase() != EpochPhase::Draining {
            return false;
        }
        let mut inner = self.inner.write();
        // Re-check under the lock: another thread may have reset first.
        if self.gate.phase() != EpochPhase::Draining {
            return false;
        }

        inner.aggregate.zero();
        inner.ladder.clear();
        inner.contributed = 0;
        inner.finished = 0;
        inner.epoch += 1;
        // The envelope table is left in place; the phase regression below
        // invalidates it, and its stale contents double as the last-known
        // fallback until the new epoch's fill.
        self.gate.reset();
        true
    }

    /// Signal that `id` finished its quantum. Once every active instance has
    /// finished, the epoch moves to `Draining` and the next quantum's first
    /// arrival may reset.
    pub fn finish_quantum(&self, _id: InstanceId) {
        let mut inner = self.inner.write();
        inner.finished += 1;
        if !inner.active.is_empty() && inner.finished >= inner.active.len() {
            self.gate.force(EpochPhase::Draining);
        }
    }

    /// Bounded wait until the aggregate is complete and every instance is
    /// ranked. False on timeout: proceed with best-available data.
    pub fn wait_mix_and_priority(&self) -> bool {
        spin_wait(self.config.wait_timeout, || {
            self.gate.at_least(EpochPhase::Aggregated) && self.gate.priority_ready()
        })
    }

    /// Bounded wait until the envelope table is filled for this epoch.
    pub fn wait_envelope(&self) -> bool {
        spin_wait(self.config.wait_timeout, || {
            self.gate.at_least(EpochPhase::EnvelopeReady)
        })
    }

    /// Visit the envelope table and carry under the read lock. The guard is
    /// held for the whole visit, so an epoch reset can never tear the table
    /// out from under a gain pass.
    pub fn with_envelope<R>(&self, reader: impl FnOnce(EnvelopeView<'_>) -> R) -> R {
        let inner = self.inner.read();
        reader(EnvelopeView {
            table: &inner.envelope,
            carry: &inner.carry,
            ready: self.gate.at_least(EpochPhase::EnvelopeReady),
        })
    }

    /// Visit the aggregate buffer under the read lock.
    pub fn with_aggregate<R>(&self, reader: impl FnOnce(&AudioBlock) -> R) -> R {
        reader(&self.inner.read().aggregate)
    }

    pub fn active_count(&self) -> usize {
        self.inner.read().active.len()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    pub fn snapshot(&self) -> BusSnapshot {
        let inner = self.inner.read();
        BusSnapshot {
            active: inner.active.len(),
            ranked: inner.ladder.len(),
            contributed: inner.contributed,
            finished: inner.finished,
            epoch: inner.epoch,
            phase: self.gate.phase(),
        }
    }

    /// Re-derive the gate flags after the active set or ladder changed.
    /// Counts compare with `>=` so overshoot self-heals within one quantum.
    fn reevaluate_gates(&self, inner: &BusInner) {
        let n = inner.active.len();
        if n == 0 {
            return;
        }
        if inner.contributed >= n {
            self.gate
                .try_advance(EpochPhase::Collecting, EpochPhase::Aggregated);
        }
        if inner.active.iter().all(|id| inner.ladder.contains(*id)) {
            self.gate.set_priority_ready(true);
        }
        if inner.finished >= n {
            self.gate.force(EpochPhase::Draining);
        }
    }
}
