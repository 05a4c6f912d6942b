// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Pulse waveform synthesis for the QA channel.
//!
//! Synthesis runs in two stages: an envelope stage producing the pulse shape
//! and a shared post-processing stage applying gain and digital-LO mixing.
//! The split lets the sweep engine cache an envelope and rescale it per
//! amplitude point instead of resynthesizing from scratch.

pub mod device_traits;
pub(crate) mod shapes;

use indexmap::IndexMap;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::device_traits::SHFQA_TRAITS;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] formula::ParseError),
    #[error(transparent)]
    Eval(#[from] formula::EvalError),
    #[error("gain {0} is outside [0, 1]")]
    GainOutOfRange(f64),
    #[error("custom waveform formula is empty")]
    EmptyFormula,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Envelope shape of a pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PulseShape {
    Square,
    Gaussian {
        rise_sigma: f64,
        fall_sigma: f64,
    },
    Exponential {
        rise_tau: f64,
        fall_tau: f64,
        rise_concave_up: bool,
        fall_concave_up: bool,
    },
    Custom {
        formula: String,
        points: usize,
        duration: f64,
        parameters: IndexMap<String, Complex64>,
    },
}

/// Immutable description of one waveform to synthesize.
///
/// Constructed fresh per sweep point whenever a swept quantity changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformParams {
    pub shape: PulseShape,
    /// Unit-amplitude core length in samples. Ignored for custom shapes.
    pub pulse_length: usize,
    pub rise_samples: usize,
    pub fall_samples: usize,
    /// Amplitude scale in [0, 1].
    pub gain: f64,
    /// Digital local-oscillator frequency in Hz. Zero disables mixing.
    pub digital_lo_frequency: f64,
    /// LO phase offset in radians.
    pub lo_phase: f64,
}

impl WaveformParams {
    pub fn square(pulse_length: usize, rise_samples: usize, fall_samples: usize) -> Self {
        WaveformParams {
            shape: PulseShape::Square,
            pulse_length,
            rise_samples,
            fall_samples,
            gain: 1.0,
            digital_lo_frequency: 0.0,
            lo_phase: 0.0,
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_digital_lo(mut self, frequency: f64) -> Self {
        self.digital_lo_frequency = frequency;
        self
    }
}

/// Synthesize the complete waveform: envelope, gain, digital-LO mixing.
///
/// Pure and deterministic: identical parameters produce bit-identical
/// output.
pub fn synthesize(params: &WaveformParams) -> Result<Vec<Complex64>> {
    let samples = envelope(params)?;
    Ok(apply_gain_and_mixing(
        samples,
        params.gain,
        params.digital_lo_frequency,
        params.lo_phase,
    ))
}

/// The envelope stage alone, before gain and mixing.
pub fn envelope(params: &WaveformParams) -> Result<Vec<Complex64>> {
    if !(0.0..=1.0).contains(&params.gain) {
        return Err(Error::GainOutOfRange(params.gain));
    }
    match &params.shape {
        PulseShape::Square => Ok(shapes::square(
            params.pulse_length,
            params.rise_samples,
            params.fall_samples,
        )),
        PulseShape::Gaussian {
            rise_sigma,
            fall_sigma,
        } => Ok(shapes::gaussian(
            params.pulse_length,
            params.rise_samples,
            params.fall_samples,
            *rise_sigma,
            *fall_sigma,
        )),
        PulseShape::Exponential {
            rise_tau,
            fall_tau,
            rise_concave_up,
            fall_concave_up,
        } => Ok(shapes::exponential(
            params.pulse_length,
            params.rise_samples,
            params.fall_samples,
            *rise_tau,
            *fall_tau,
            *rise_concave_up,
            *fall_concave_up,
        )),
        PulseShape::Custom {
            formula,
            points,
            duration,
            parameters,
        } => custom_envelope(formula, *points, *duration, parameters),
    }
}

fn custom_envelope(
    formula_text: &str,
    points: usize,
    duration: f64,
    parameters: &IndexMap<String, Complex64>,
) -> Result<Vec<Complex64>> {
    if formula_text.trim().is_empty() {
        return Err(Error::EmptyFormula);
    }
    let formula = formula::Formula::parse(formula_text)?;
    // Half-open time axis [0, duration).
    let t_array: Vec<f64> = (0..points)
        .map(|n| n as f64 * duration / points as f64)
        .collect();
    Ok(formula.evaluate(parameters, &t_array)?)
}

/// Shared post-processing: amplitude gain, then element-wise multiplication
/// with `exp(i(2π·f·t + φ))` sampled at the instrument sampling rate when
/// the LO frequency is nonzero.
pub fn apply_gain_and_mixing(
    mut samples: Vec<Complex64>,
    gain: f64,
    lo_frequency: f64,
    lo_phase: f64,
) -> Vec<Complex64> {
    for sample in &mut samples {
        *sample *= gain;
    }
    if lo_frequency != 0.0 {
        let dt = 1.0 / SHFQA_TRAITS.sampling_rate;
        for (n, sample) in samples.iter_mut().enumerate() {
            let angle = std::f64::consts::TAU * lo_frequency * n as f64 * dt + lo_phase;
            *sample *= Complex64::new(0.0, angle).exp();
        }
    }
    samples
}

/// Rescale a cached waveform by a real factor.
pub fn scale(samples: &[Complex64], factor: f64) -> Vec<Complex64> {
    samples.iter().map(|sample| sample * factor).collect()
}
