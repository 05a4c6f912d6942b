// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Sweep point enumeration.
//!
//! The axis sequence is finite and recomputed fresh per session. Two-axis
//! sweeps enumerate in row-major order: current outer, frequency inner,
//! matching the aggregation layout of the final result.

use serde::{Deserialize, Serialize};

use crate::spec::MeasurementMode;

/// Coordinate of one sweep point in the Cartesian product of declared axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coordinate {
    /// The no-axis modes have exactly one point with no coordinate.
    None,
    Amplitude(f64),
    Frequency(f64),
    CurrentFrequency { current: f64, frequency: f64 },
}

/// Uniform linear sample of `points` values between `start` and `stop`
/// inclusive.
pub fn linspace(start: f64, stop: f64, points: usize) -> Vec<f64> {
    if points < 2 {
        return vec![start; points];
    }
    let step = (stop - start) / (points - 1) as f64;
    (0..points).map(|i| start + step * i as f64).collect()
}

pub fn total_points(mode: &MeasurementMode) -> usize {
    match mode {
        MeasurementMode::TimeDomain | MeasurementMode::Spectrum { .. } => 1,
        MeasurementMode::AmplitudeSweep(axis) | MeasurementMode::FrequencySweep(axis) => {
            axis.points
        }
        MeasurementMode::CurrentFrequencySweep { current, frequency } => {
            current.points * frequency.points
        }
    }
}

/// Lazily enumerate the sweep points of a mode.
pub fn sweep_points(mode: &MeasurementMode) -> Box<dyn Iterator<Item = Coordinate> + Send> {
    match mode {
        MeasurementMode::TimeDomain | MeasurementMode::Spectrum { .. } => {
            Box::new(std::iter::once(Coordinate::None))
        }
        MeasurementMode::AmplitudeSweep(axis) => Box::new(
            linspace(axis.start, axis.stop, axis.points)
                .into_iter()
                .map(Coordinate::Amplitude),
        ),
        MeasurementMode::FrequencySweep(axis) => Box::new(
            linspace(axis.start, axis.stop, axis.points)
                .into_iter()
                .map(Coordinate::Frequency),
        ),
        MeasurementMode::CurrentFrequencySweep { current, frequency } => {
            let inner = linspace(frequency.start, frequency.stop, frequency.points);
            Box::new(
                linspace(current.start, current.stop, current.points)
                    .into_iter()
                    .flat_map(move |current| {
                        inner
                            .clone()
                            .into_iter()
                            .map(move |frequency| Coordinate::CurrentFrequency {
                                current,
                                frequency,
                            })
                    }),
            )
        }
    }
}
