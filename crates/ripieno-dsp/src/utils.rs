//! Shared level conversions for the ducking DSP.

/// Convert linear amplitude to decibels
#[inline]
pub(crate) fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        -96.0 // Floor
    } else {
        20.0 * amp.log10()
    }
}

/// Convert decibels to linear amplitude
#[inline]
pub(crate) fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amplitude_db_conversion() {
        assert!((amplitude_to_db(1.0) - 0.0).abs() < 0.001);
        assert!((amplitude_to_db(0.5) - (-6.02)).abs() < 0.1);
        assert!((db_to_amplitude(0.0) - 1.0).abs() < 0.001);
        assert!((db_to_amplitude(-6.0) - 0.501).abs() < 0.01);
    }

    #[test]
    fn test_silence_hits_floor_not_infinity() {
        assert_eq!(amplitude_to_db(0.0), -96.0);
        assert_eq!(amplitude_to_db(-1.0), -96.0);
        assert!(amplitude_to_db(1e-30).is_finite());
    }
}
