// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Measurement orchestration for parametrized sweeps on the QA channel.
//!
//! A sweep runs on a dedicated worker thread that regenerates the stimulus
//! waveform per point, drives the instrument through the [`driver`] traits,
//! and streams partial results to observers over a channel. The observer
//! side owns translating events into presentation state; the engine carries
//! no presentation dependencies.

pub mod axes;
pub mod driver;
pub mod events;
pub mod session;
pub mod spec;

pub use axes::Coordinate;
pub use driver::{CurrentSource, InstrumentDriver, InstrumentError, NoCurrentSource};
pub use events::{SweepEvent, SweepResult};
pub use session::{MeasurementEngine, SessionHandle, SessionState};
pub use spec::{AxisSpec, ConfigError, InstrumentConfig, MeasurementMode, SweepSpec};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error(transparent)]
    Config(#[from] spec::ConfigError),
    #[error(transparent)]
    Waveform(#[from] waveform::Error),
    #[error("another measurement session is already running")]
    SessionActive,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
