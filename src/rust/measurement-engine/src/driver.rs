// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Traits the orchestrator drives the hardware through.
//!
//! Wire protocol and transport details live behind these traits; the
//! engine only sees the operations below.

use num_complex::Complex64;

#[derive(thiserror::Error, Debug)]
pub enum InstrumentError {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error("center frequency {frequency} Hz violates the {step} Hz resolution step")]
    CenterFrequencyResolution { frequency: f64, step: f64 },
}

impl InstrumentError {
    pub fn new(msg: &str) -> Self {
        InstrumentError::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}

/// The signal-acquisition instrument.
///
/// `acquire` is blocking and dominates the per-point cost; it runs to
/// completion once issued since the hardware has no safe mid-acquisition
/// abort.
pub trait InstrumentDriver {
    /// Fails when `center_frequency` is not on the hardware resolution grid.
    fn configure(
        &mut self,
        input_range_dbm: f64,
        output_range_dbm: f64,
        center_frequency: f64,
    ) -> Result<(), InstrumentError>;

    /// Replaces the single active waveform slot.
    fn upload_waveform(&mut self, samples: &[Complex64]) -> Result<(), InstrumentError>;

    fn configure_acquisition_window(
        &mut self,
        duration: f64,
        averages: usize,
        trigger_delay: f64,
    ) -> Result<(), InstrumentError>;

    fn acquire(&mut self, averages: usize, duration: f64)
        -> Result<Vec<Complex64>, InstrumentError>;

    /// Hardware-driven spectrum measurement used by the frequency-domain
    /// single-shot mode.
    #[allow(clippy::too_many_arguments)]
    fn measure_spectrum(
        &mut self,
        center_frequency: f64,
        lo_start: f64,
        lo_stop: f64,
        points: usize,
        averages: usize,
        integration_time: f64,
    ) -> Result<Vec<Complex64>, InstrumentError>;

    fn set_input(&mut self, on: bool) -> Result<(), InstrumentError>;

    fn set_output(&mut self, on: bool) -> Result<(), InstrumentError>;
}

/// A programmable DC current source, used by the current-frequency sweep.
pub trait CurrentSource {
    fn set_output_level(&mut self, amperes: f64) -> Result<(), InstrumentError>;
}

/// Placeholder source for engines that drive no current hardware.
pub struct NoCurrentSource;

impl CurrentSource for NoCurrentSource {
    fn set_output_level(&mut self, _amperes: f64) -> Result<(), InstrumentError> {
        Err(InstrumentError::new("no current source attached"))
    }
}
