// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Sweep specification and pre-start validation.
//!
//! Every configuration fault is detected here, before a worker thread is
//! spawned, so a running session only ever encounters instrument errors.

use serde::{Deserialize, Serialize};

use waveform::device_traits::SHFQA_TRAITS;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("a sweep axis needs at least 2 points, got {0}")]
    AxisTooShort(usize),
    #[error("digital LO frequency {0} Hz is outside the ±{1} Hz baseband range")]
    LoOutOfRange(f64, f64),
    #[error("center frequency {0} Hz is not a multiple of the {1} Hz resolution step")]
    CenterFrequencyNotAligned(f64, f64),
    #[error("the current-frequency sweep needs a current source")]
    NoCurrentSource,
}

/// One linearly sampled sweep axis, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

impl AxisSpec {
    pub fn new(start: f64, stop: f64, points: usize) -> Self {
        AxisSpec {
            start,
            stop,
            points,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.points < 2 {
            return Err(ConfigError::AxisTooShort(self.points));
        }
        Ok(())
    }

    fn validate_lo_range(&self) -> Result<(), ConfigError> {
        for value in [self.start, self.stop] {
            check_lo_frequency(value)?;
        }
        Ok(())
    }
}

fn check_lo_frequency(value: f64) -> Result<(), ConfigError> {
    let limit = SHFQA_TRAITS.digital_lo_range;
    if value.abs() > limit {
        return Err(ConfigError::LoOutOfRange(value, limit));
    }
    Ok(())
}

/// Static instrument configuration shared by every point of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub input_range_dbm: f64,
    pub output_range_dbm: f64,
    /// Analog up/down conversion frequency in Hz.
    pub center_frequency: f64,
    pub averages: usize,
    /// Acquisition window duration in seconds.
    pub window_duration: f64,
    pub trigger_delay: f64,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            input_range_dbm: -10.0,
            output_range_dbm: -15.0,
            center_frequency: 5e9,
            averages: 1,
            window_duration: 700e-9,
            trigger_delay: SHFQA_TRAITS.default_trigger_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasurementMode {
    /// Single-shot time-domain acquisition.
    TimeDomain,
    /// Single-shot frequency-domain acquisition via the hardware sweeper.
    /// Bypasses per-point waveform synthesis entirely.
    Spectrum {
        lo_start: f64,
        lo_stop: f64,
        points: usize,
        integration_time: f64,
    },
    AmplitudeSweep(AxisSpec),
    FrequencySweep(AxisSpec),
    /// Two-dimensional sweep, current outer and frequency inner.
    CurrentFrequencySweep {
        current: AxisSpec,
        frequency: AxisSpec,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    pub instrument: InstrumentConfig,
    pub mode: MeasurementMode,
}

impl SweepSpec {
    pub fn new(instrument: InstrumentConfig, mode: MeasurementMode) -> Self {
        SweepSpec { instrument, mode }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let step = SHFQA_TRAITS.center_freq_step;
        let center = self.instrument.center_frequency;
        if ((center / step).round() * step - center).abs() > 1e-3 {
            return Err(ConfigError::CenterFrequencyNotAligned(center, step));
        }
        match &self.mode {
            MeasurementMode::TimeDomain => {}
            MeasurementMode::Spectrum {
                lo_start,
                lo_stop,
                points,
                ..
            } => {
                if *points < 2 {
                    return Err(ConfigError::AxisTooShort(*points));
                }
                check_lo_frequency(*lo_start)?;
                check_lo_frequency(*lo_stop)?;
            }
            MeasurementMode::AmplitudeSweep(axis) => axis.validate()?,
            MeasurementMode::FrequencySweep(axis) => {
                axis.validate()?;
                axis.validate_lo_range()?;
            }
            MeasurementMode::CurrentFrequencySweep { current, frequency } => {
                current.validate()?;
                frequency.validate()?;
                frequency.validate_lo_range()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(mode: MeasurementMode) -> SweepSpec {
        SweepSpec::new(InstrumentConfig::default(), mode)
    }

    #[test]
    fn test_time_domain_spec_valid() {
        assert!(spec(MeasurementMode::TimeDomain).validate().is_ok());
    }

    #[test]
    fn test_misaligned_center_frequency_rejected() {
        let mut s = spec(MeasurementMode::TimeDomain);
        s.instrument.center_frequency = 4.9e9;
        assert_eq!(
            s.validate(),
            Err(ConfigError::CenterFrequencyNotAligned(4.9e9, 200e6))
        );
    }

    #[test]
    fn test_axis_needs_two_points() {
        let s = spec(MeasurementMode::AmplitudeSweep(AxisSpec::new(
            0.1, 1.0, 1,
        )));
        assert_eq!(s.validate(), Err(ConfigError::AxisTooShort(1)));
    }

    #[test]
    fn test_frequency_axis_limited_to_baseband() {
        let s = spec(MeasurementMode::FrequencySweep(AxisSpec::new(
            -100e6, 600e6, 11,
        )));
        assert_eq!(s.validate(), Err(ConfigError::LoOutOfRange(600e6, 500e6)));
    }

    #[test]
    fn test_spectrum_bounds_checked() {
        let s = spec(MeasurementMode::Spectrum {
            lo_start: -700e6,
            lo_stop: 0.0,
            points: 101,
            integration_time: 100e-6,
        });
        assert_eq!(s.validate(), Err(ConfigError::LoOutOfRange(-700e6, 500e6)));
    }

    #[test]
    fn test_two_d_spec_valid() {
        let s = spec(MeasurementMode::CurrentFrequencySweep {
            current: AxisSpec::new(0.0, 1e-3, 3),
            frequency: AxisSpec::new(-200e6, 200e6, 4),
        });
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_spec_serde_round_trip() {
        let s = spec(MeasurementMode::FrequencySweep(AxisSpec::new(
            -200e6, 200e6, 21,
        )));
        let text = serde_json::to_string(&s).unwrap();
        let restored: SweepSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(s, restored);
    }
}
