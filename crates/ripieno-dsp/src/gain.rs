//! Priority-weighted soft-knee gain computer.

/// Effective compression ratio for a voice at `percentile` of the priority
/// span: `(1 - percentile) * (max_ratio - 1) + 1`.
///
/// Higher priority gives a higher percentile and a ratio nearer 1, so the
/// highest-ranked voice passes untouched while the lowest takes the full
/// `max_ratio`.
pub fn ratio_for(percentile: f32, max_ratio: f32) -> f32 {
    let max_ratio = max_ratio.max(1.0);
    let percentile = percentile.clamp(0.0, 1.0);
    (1.0 - percentile) * (max_ratio - 1.0) + 1.0
}

/// Static soft-knee compression curve in the dB domain.
///
/// For input level `x`, threshold `T`, knee `K` and ratio `R` the returned
/// gain is `0` below `T - K/2`, `(1/R - 1)(x - T)` above `T + K/2`, and a
/// parabolic blend in between; the curve is continuous at both knee edges.
/// `K = 0` is a hard knee. Gain is always <= 0 dB.
#[derive(Debug, Clone, Copy)]
pub struct GainCurve {
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,
}

impl GainCurve {
    pub fn new(threshold_db: f32, knee_db: f32, ratio: f32) -> Self {
        Self {
            threshold_db,
            knee_db: knee_db.max(0.0),
            ratio: ratio.max(1.0),
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Gain reduction in dB for an input level in dB.
    #[inline]
    pub fn gain_db(&self, input_db: f32) -> f32 {
        let slope = 1.0 / self.ratio - 1.0;
        if slope >= 0.0 {
            return 0.0;
        }

        if self.knee_db <= 0.0 {
            return slope * (input_db - self.threshold_db).max(0.0);
        }

        let half_knee = self.knee_db / 2.0;
        let below = self.threshold_db - half_knee;
        let above = self.threshold_db + half_knee;

        if input_db <= below {
            0.0
        } else if input_db >= above {
            slope * (input_db - self.threshold_db)
        } else {
            let x = input_db - below;
            (slope / (2.0 * self.knee_db)) * x * x
        }
    }
}
