//! Priority ranks and percentile derivation.

use std::collections::HashMap;
use std::fmt;

/// Percentile returned for degenerate cases: a single instance, all ranks
/// equal, or an unranked id. The midpoint avoids both "always maximum
/// ducking" and "never ducking" for a lone voice.
pub const DEFAULT_PERCENTILE: f32 = 0.5;

/// Opaque per-instance identity assigned by the host, one per
/// sound-emitting object. Keys every per-instance map; must never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rank map from instance identity to priority, with on-demand percentile.
///
/// Percentiles are never stored; they are derived from the current min/max
/// span so a rank change or departure is reflected at the next query.
#[derive(Debug, Default)]
pub struct PriorityLadder {
    ranks: HashMap<InstanceId, f32>,
}

impl PriorityLadder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the rank for `id`.
    pub fn insert(&mut self, id: InstanceId, rank: f32) {
        self.ranks.insert(id, rank);
    }

    /// Remove the rank entry for `id`. No-op for unknown ids.
    pub fn remove(&mut self, id: InstanceId) {
        self.ranks.remove(&id);
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.ranks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranks.clear();
    }

    /// Relative position of `id`'s rank in the current span, in `[0, 1]`.
    /// Higher rank gives a higher percentile. Degenerate spans return
    /// [`DEFAULT_PERCENTILE`].
    pub fn percentile_of(&self, id: InstanceId) -> f32 {
        let Some(&rank) = self.ranks.get(&id) else {
            return DEFAULT_PERCENTILE;
        };

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &r in self.ranks.values() {
            min = min.min(r);
            max = max.max(r);
        }

        if max - min <= f32::EPSILON {
            return DEFAULT_PERCENTILE;
        }

        ((rank - min) / (max - min)).clamp(0.0, 1.0)
    }
}
