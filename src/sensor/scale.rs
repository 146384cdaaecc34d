// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! 4-20 mA unit scaling
//!
//! Converts the raw transducer current (microamps, as read from the fieldbus
//! register) into the engineering unit the loop represents. The conversion is
//! the standard two-point linear map from the fixed [4 mA, 20 mA] input span
//! to the configured sensor range.

use serde::{Deserialize, Serialize};

/// Physical quantity spanned by the 4-20 mA loop.
///
/// 4 mA maps to `low`, 20 mA maps to `high`. For the reference deployment
/// this is a submersible level transmitter spanning 0 to 30 ft of water.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    /// Engineering value at 4 mA.
    pub low: f64,
    /// Engineering value at 20 mA.
    pub high: f64,
}

impl Default for SensorRange {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 30.0,
        }
    }
}

/// Lower end of the current-loop input span, in milliamps.
const LOOP_MIN_MA: f64 = 4.0;
/// Upper end of the current-loop input span, in milliamps.
const LOOP_MAX_MA: f64 = 20.0;

/// Scale a raw microamp reading to the configured engineering range.
///
/// The reading is converted to milliamps and linearly interpolated from
/// [4 mA, 20 mA] onto [`range.low`, `range.high`]. The result is NOT
/// clamped: a current below 4 mA (wire break, dead loop) or above 20 mA
/// (loop saturation) yields an out-of-range value so that downstream
/// consumers can recognize the fault condition. Total over all i16 inputs.
pub fn scale_current_to_range(raw_microamps: i16, range: &SensorRange) -> f64 {
    let milliamps = f64::from(raw_microamps) / 1000.0;
    let span_fraction = (milliamps - LOOP_MIN_MA) / (LOOP_MAX_MA - LOOP_MIN_MA);
    range.low + span_fraction * (range.high - range.low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_endpoints_and_midpoint() {
        let range = SensorRange {
            low: 0.0,
            high: 30.0,
        };

        // 4 mA -> low, 20 mA -> high, midpoint -> midpoint
        assert_relative_eq!(scale_current_to_range(4_000, &range), 0.0);
        assert_relative_eq!(scale_current_to_range(20_000, &range), 30.0);
        assert_relative_eq!(scale_current_to_range(12_000, &range), 15.0);
    }

    #[test]
    fn test_scale_reference_reading() {
        // 16000 uA = 16 mA -> (16 - 4) / 16 * 30 = 22.5 ft
        let range = SensorRange::default();
        assert_relative_eq!(scale_current_to_range(16_000, &range), 22.5);
    }

    #[test]
    fn test_scale_nonzero_low() {
        let range = SensorRange {
            low: 10.0,
            high: 50.0,
        };
        assert_relative_eq!(scale_current_to_range(4_000, &range), 10.0);
        assert_relative_eq!(scale_current_to_range(12_000, &range), 30.0);
        assert_relative_eq!(scale_current_to_range(20_000, &range), 50.0);
    }

    #[test]
    fn test_scale_out_of_span_passthrough() {
        let range = SensorRange::default();

        // Below 4 mA extrapolates below the range instead of erroring
        assert!(scale_current_to_range(2_000, &range) < 0.0);
        // Above 20 mA extrapolates past the top of the range
        assert!(scale_current_to_range(22_000, &range) > 30.0);
    }

    #[test]
    fn test_scale_total_over_i16_domain() {
        let range = SensorRange::default();
        for raw in [i16::MIN, -1, 0, 1, i16::MAX] {
            assert!(scale_current_to_range(raw, &range).is_finite());
        }
    }
}
