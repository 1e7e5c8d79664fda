//! Time-varying ducking parameters.
//!
//! Each control is an `Arc<AtomicFloat>` handle shared with the host's
//! parameter subsystem; the voice reads every value fresh each quantum and
//! never caches across quanta.

use ripieno_core::AtomicFloat;
use std::sync::Arc;

/// Threshold, max ratio, priority rank and knee width handles.
#[derive(Debug, Clone)]
pub struct DuckerParams {
    threshold_db: Arc<AtomicFloat>,
    max_ratio: Arc<AtomicFloat>,
    priority_rank: Arc<AtomicFloat>,
    knee_db: Arc<AtomicFloat>,
}

impl DuckerParams {
    /// Create a builder for configuring parameters.
    pub fn builder() -> DuckerParamsBuilder {
        DuckerParamsBuilder::default()
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db.get()
    }

    pub fn max_ratio(&self) -> f32 {
        self.max_ratio.get()
    }

    pub fn priority_rank(&self) -> f32 {
        self.priority_rank.get()
    }

    pub fn knee_db(&self) -> f32 {
        self.knee_db.get()
    }

    pub fn set_threshold_db(&self, db: f32) {
        self.threshold_db.set(db);
    }

    pub fn set_max_ratio(&self, ratio: f32) {
        self.max_ratio.set(ratio.max(1.0));
    }

    pub fn set_priority_rank(&self, rank: f32) {
        self.priority_rank.set(rank);
    }

    pub fn set_knee_db(&self, db: f32) {
        self.knee_db.set(db.max(0.0));
    }

    pub fn threshold_handle(&self) -> Arc<AtomicFloat> {
        Arc::clone(&self.threshold_db)
    }

    pub fn max_ratio_handle(&self) -> Arc<AtomicFloat> {
        Arc::clone(&self.max_ratio)
    }

    pub fn priority_rank_handle(&self) -> Arc<AtomicFloat> {
        Arc::clone(&self.priority_rank)
    }

    pub fn knee_handle(&self) -> Arc<AtomicFloat> {
        Arc::clone(&self.knee_db)
    }
}

impl Default for DuckerParams {
    fn default() -> Self {
        DuckerParamsBuilder::default().build()
    }
}

/// Builder for configuring [`DuckerParams`] with a fluent API.
#[derive(Clone, Debug)]
pub struct DuckerParamsBuilder {
    threshold_db: f32,
    max_ratio: f32,
    priority_rank: f32,
    knee_db: f32,
}

impl Default for DuckerParamsBuilder {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            max_ratio: 4.0,
            priority_rank: 0.5,
            knee_db: 6.0,
        }
    }
}

impl DuckerParamsBuilder {
    /// Set the threshold in decibels (-60.0 to 0.0 dB typical)
    pub fn threshold_db(mut self, db: f32) -> Self {
        self.threshold_db = db;
        self
    }

    /// Set the maximum compression ratio (must be >= 1.0)
    pub fn max_ratio(mut self, ratio: f32) -> Self {
        self.max_ratio = ratio.max(1.0);
        self
    }

    /// Set the priority rank (arbitrary range; only the relative position
    /// among active voices matters)
    pub fn priority_rank(mut self, rank: f32) -> Self {
        self.priority_rank = rank;
        self
    }

    /// Set knee width in decibels (0.0 = hard knee)
    pub fn knee_db(mut self, db: f32) -> Self {
        self.knee_db = db.max(0.0);
        self
    }

    /// Build the configured parameter block
    pub fn build(self) -> DuckerParams {
        DuckerParams {
            threshold_db: Arc::new(AtomicFloat::new(self.threshold_db)),
            max_ratio: Arc::new(AtomicFloat::new(self.max_ratio)),
            priority_rank: Arc::new(AtomicFloat::new(self.priority_rank)),
            knee_db: Arc::new(AtomicFloat::new(self.knee_db)),
        }
    }
}
