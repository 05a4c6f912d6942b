// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Events streamed from the worker thread to observers, and the terminal
//! aggregated result.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::axes::{Coordinate, linspace};
use crate::spec::MeasurementMode;

/// Message type of the worker → observer channel. Delivery preserves
/// per-point ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SweepEvent {
    Progress {
        percent: f64,
        eta_seconds: f64,
    },
    PointResult {
        coordinate: Coordinate,
        samples: Vec<Complex64>,
    },
    SessionComplete(SweepResult),
    Error(String),
    /// Sent last on every exit path, regardless of terminal state.
    Finished,
}

/// Aggregated result of one session, shaped per measurement mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SweepResult {
    TimeDomain {
        samples: Vec<Complex64>,
    },
    Spectrum {
        /// Absolute frequency axis: digital-LO span shifted by the center
        /// frequency.
        frequencies: Vec<f64>,
        samples: Vec<Complex64>,
    },
    Amplitude {
        amplitudes: Vec<f64>,
        traces: Vec<Vec<Complex64>>,
    },
    Frequency {
        frequencies: Vec<f64>,
        traces: Vec<Vec<Complex64>>,
    },
    /// Indexed `traces[current_index][frequency_index]`.
    CurrentFrequency {
        currents: Vec<f64>,
        frequencies: Vec<f64>,
        traces: Vec<Vec<Vec<Complex64>>>,
    },
}

impl SweepResult {
    /// Assemble the terminal result from the points actually received.
    ///
    /// Coordinate arrays are derived from the collected points, never from
    /// the declared axis lengths, so a cancelled run yields a truncated
    /// but consistent structure. For the two-axis sweep the trailing inner
    /// row may be partial.
    pub(crate) fn from_collected(
        mode: &MeasurementMode,
        center_frequency: f64,
        collected: Vec<(Coordinate, Vec<Complex64>)>,
    ) -> SweepResult {
        match mode {
            MeasurementMode::TimeDomain => SweepResult::TimeDomain {
                samples: collected
                    .into_iter()
                    .next_back()
                    .map(|(_, samples)| samples)
                    .unwrap_or_default(),
            },
            MeasurementMode::Spectrum {
                lo_start, lo_stop, ..
            } => {
                let samples = collected
                    .into_iter()
                    .next_back()
                    .map(|(_, samples)| samples)
                    .unwrap_or_default();
                let frequencies = linspace(*lo_start, *lo_stop, samples.len())
                    .into_iter()
                    .map(|f| f + center_frequency)
                    .collect();
                SweepResult::Spectrum {
                    frequencies,
                    samples,
                }
            }
            MeasurementMode::AmplitudeSweep(_) => {
                let mut amplitudes = Vec::with_capacity(collected.len());
                let mut traces = Vec::with_capacity(collected.len());
                for (coordinate, samples) in collected {
                    if let Coordinate::Amplitude(amplitude) = coordinate {
                        amplitudes.push(amplitude);
                        traces.push(samples);
                    }
                }
                SweepResult::Amplitude { amplitudes, traces }
            }
            MeasurementMode::FrequencySweep(_) => {
                let mut frequencies = Vec::with_capacity(collected.len());
                let mut traces = Vec::with_capacity(collected.len());
                for (coordinate, samples) in collected {
                    if let Coordinate::Frequency(frequency) = coordinate {
                        frequencies.push(frequency);
                        traces.push(samples);
                    }
                }
                SweepResult::Frequency { frequencies, traces }
            }
            MeasurementMode::CurrentFrequencySweep { frequency, .. } => {
                assemble_two_d(frequency.points, collected)
            }
        }
    }
}

fn assemble_two_d(
    inner_len: usize,
    collected: Vec<(Coordinate, Vec<Complex64>)>,
) -> SweepResult {
    let mut currents = Vec::new();
    let mut frequencies = Vec::new();
    let mut traces: Vec<Vec<Vec<Complex64>>> = Vec::new();
    for (index, (coordinate, samples)) in collected.into_iter().enumerate() {
        let Coordinate::CurrentFrequency { current, frequency } = coordinate else {
            continue;
        };
        if index % inner_len == 0 {
            currents.push(current);
            traces.push(Vec::with_capacity(inner_len));
        }
        if index < inner_len {
            frequencies.push(frequency);
        }
        if let Some(row) = traces.last_mut() {
            row.push(samples);
        }
    }
    SweepResult::CurrentFrequency {
        currents,
        frequencies,
        traces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::AxisSpec;

    fn trace(value: f64) -> Vec<Complex64> {
        vec![Complex64::new(value, 0.0)]
    }

    fn two_d_mode(inner: usize) -> MeasurementMode {
        MeasurementMode::CurrentFrequencySweep {
            current: AxisSpec::new(0.0, 2.0, 3),
            frequency: AxisSpec::new(10.0, 10.0 + (inner - 1) as f64, inner),
        }
    }

    fn two_d_points(outer: usize, inner: usize) -> Vec<(Coordinate, Vec<Complex64>)> {
        let mut collected = Vec::new();
        for i in 0..outer {
            for j in 0..inner {
                collected.push((
                    Coordinate::CurrentFrequency {
                        current: i as f64,
                        frequency: 10.0 + j as f64,
                    },
                    trace((i * inner + j) as f64),
                ));
            }
        }
        collected
    }

    #[test]
    fn test_two_d_full_run_shape() {
        let result = SweepResult::from_collected(&two_d_mode(4), 5e9, two_d_points(3, 4));
        match result {
            SweepResult::CurrentFrequency {
                currents,
                frequencies,
                traces,
            } => {
                assert_eq!(currents, vec![0.0, 1.0, 2.0]);
                assert_eq!(frequencies, vec![10.0, 11.0, 12.0, 13.0]);
                assert_eq!(traces.len(), 3);
                assert!(traces.iter().all(|row| row.len() == 4));
                assert_eq!(traces[2][1], trace(9.0));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_two_d_truncated_run_keeps_partial_row() {
        let mut collected = two_d_points(3, 4);
        collected.truncate(6); // cancelled during the second inner pass
        let result = SweepResult::from_collected(&two_d_mode(4), 5e9, collected);
        match result {
            SweepResult::CurrentFrequency {
                currents,
                frequencies,
                traces,
            } => {
                assert_eq!(currents, vec![0.0, 1.0]);
                assert_eq!(frequencies.len(), 4);
                assert_eq!(traces.len(), 2);
                assert_eq!(traces[0].len(), 4);
                assert_eq!(traces[1].len(), 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_spectrum_axis_is_shifted_by_center() {
        let mode = MeasurementMode::Spectrum {
            lo_start: -200e6,
            lo_stop: 200e6,
            points: 5,
            integration_time: 100e-6,
        };
        let collected = vec![(Coordinate::None, vec![Complex64::new(1.0, 0.0); 5])];
        let result = SweepResult::from_collected(&mode, 4e9, collected);
        match result {
            SweepResult::Spectrum {
                frequencies,
                samples,
            } => {
                assert_eq!(samples.len(), 5);
                assert!((frequencies[0] - 3.8e9).abs() < 1.0);
                assert!((frequencies[4] - 4.2e9).abs() < 1.0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_empty_collection_yields_empty_result() {
        let result =
            SweepResult::from_collected(&MeasurementMode::TimeDomain, 5e9, Vec::new());
        match result {
            SweepResult::TimeDomain { samples } => assert!(samples.is_empty()),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
