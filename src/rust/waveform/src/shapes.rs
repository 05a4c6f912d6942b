// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Envelope construction for the built-in pulse shapes.
//!
//! Every shape is a unit-amplitude core of `pulse_length` samples with a
//! rise segment prepended and a fall segment appended.

use num_complex::Complex64;

fn assemble(rise: Vec<f64>, pulse_length: usize, fall: Vec<f64>) -> Vec<Complex64> {
    let mut samples = Vec::with_capacity(rise.len() + pulse_length + fall.len());
    samples.extend(rise.into_iter().map(|v| Complex64::new(v, 0.0)));
    samples.resize(samples.len() + pulse_length, Complex64::new(1.0, 0.0));
    samples.extend(fall.into_iter().map(|v| Complex64::new(v, 0.0)));
    samples
}

pub(crate) fn square(pulse_length: usize, rise: usize, fall: usize) -> Vec<Complex64> {
    assemble(vec![0.0; rise], pulse_length, vec![0.0; fall])
}

/// Symmetric Gaussian window of length `len`, `w(n) = exp(-((n-(len-1)/2)/σ)²/2)`.
fn gaussian_window(len: usize, sigma: f64) -> Vec<f64> {
    let center = (len as f64 - 1.0) / 2.0;
    (0..len)
        .map(|n| {
            let x = (n as f64 - center) / sigma;
            (-0.5 * x * x).exp()
        })
        .collect()
}

/// Rise and fall segments are the first/last half of a Gaussian window of
/// twice the segment length, so each segment ends (resp. starts) near the
/// unit-amplitude core.
pub(crate) fn gaussian(
    pulse_length: usize,
    rise: usize,
    fall: usize,
    rise_sigma: f64,
    fall_sigma: f64,
) -> Vec<Complex64> {
    let rise_segment = {
        let mut window = gaussian_window(2 * rise, rise_sigma);
        window.truncate(rise);
        window
    };
    let fall_segment = gaussian_window(2 * fall, fall_sigma).split_off(fall);
    assemble(rise_segment, pulse_length, fall_segment)
}

/// Exponential edges.
///
/// The fall segment with `fall_concave_up == false` reuses the *rise* time
/// constant. This mirrors the long-standing behavior of the measurement
/// scripts this code replaces; see the waveform tests for the explicit
/// record of it.
pub(crate) fn exponential(
    pulse_length: usize,
    rise: usize,
    fall: usize,
    rise_tau: f64,
    fall_tau: f64,
    rise_concave_up: bool,
    fall_concave_up: bool,
) -> Vec<Complex64> {
    let rise_segment: Vec<f64> = if rise_concave_up {
        let mut segment: Vec<f64> = (0..rise).map(|n| (-(n as f64) / rise_tau).exp()).collect();
        segment.reverse();
        segment
    } else {
        (0..rise)
            .map(|n| 1.0 - (-(n as f64) / rise_tau).exp())
            .collect()
    };
    let fall_segment: Vec<f64> = if fall_concave_up {
        (0..fall).map(|n| (-(n as f64) / fall_tau).exp()).collect()
    } else {
        let mut segment: Vec<f64> = (0..fall)
            .map(|n| 1.0 - (-(n as f64) / rise_tau).exp())
            .collect();
        segment.reverse();
        segment
    };
    assemble(rise_segment, pulse_length, fall_segment)
}
