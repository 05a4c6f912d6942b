// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Hardware constants of the QA channel used for waveform generation
/// and sweep validation.
pub struct DeviceTraits {
    pub sampling_rate: f64,
    pub center_freq_step: f64,
    pub digital_lo_range: f64,
    pub default_trigger_delay: f64,
}

pub const SHFQA_TRAITS: DeviceTraits = DeviceTraits {
    sampling_rate: 2e9,
    center_freq_step: 200e6,
    digital_lo_range: 500e6,
    default_trigger_delay: 200e-9,
};
