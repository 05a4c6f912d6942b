// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Session lifecycle and the sweep worker thread.
//!
//! [`MeasurementEngine::start`] spawns exactly one worker per session. The
//! worker owns the sweep loop; callers observe it through the
//! [`SessionHandle`] and its event receiver. Cancellation is cooperative
//! and only takes effect between points, so an in-flight acquisition always
//! runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use num_complex::Complex64;

use waveform::WaveformParams;

use crate::axes::{self, Coordinate};
use crate::driver::{CurrentSource, InstrumentDriver, InstrumentError, NoCurrentSource};
use crate::events::{SweepEvent, SweepResult};
use crate::spec::{ConfigError, MeasurementMode, SweepSpec};
use crate::{Error, Result};

/// Number of per-point durations the ETA estimate averages over.
const ROLLING_WINDOW_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Aborted,
    Failed,
}

/// Circular buffer of recent per-point durations.
///
/// The mean covers only the slots recorded so far; a window that has seen
/// three points averages three values, not ten.
struct RollingWindow {
    slots: [f64; ROLLING_WINDOW_SIZE],
    len: usize,
    next: usize,
}

impl RollingWindow {
    fn new() -> Self {
        RollingWindow {
            slots: [0.0; ROLLING_WINDOW_SIZE],
            len: 0,
            next: 0,
        }
    }

    fn push(&mut self, seconds: f64) {
        self.slots[self.next] = seconds;
        self.next = (self.next + 1) % ROLLING_WINDOW_SIZE;
        self.len = (self.len + 1).min(ROLLING_WINDOW_SIZE);
    }

    fn mean(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.slots[..self.len].iter().sum::<f64>() / self.len as f64
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observer side of a running session.
pub struct SessionHandle {
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    events: Receiver<SweepEvent>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    /// Request cancellation. The worker honors it at the next
    /// between-points check.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// A receiver for the session's event stream.
    ///
    /// All receivers drain the same queue, so each event is delivered to
    /// exactly one of them. A single consumer owns the stream and fans
    /// events out to any further observers; handing clones to independent
    /// observers would split the sequence between them.
    pub fn events(&self) -> Receiver<SweepEvent> {
        self.events.clone()
    }

    /// Block until the worker exits and return the terminal state.
    pub fn wait(self) -> SessionState {
        let _ = self.join.join();
        *lock(&self.state)
    }
}

/// Owns the instrument binding and enforces session exclusivity.
pub struct MeasurementEngine<D, S = NoCurrentSource> {
    driver: Arc<Mutex<D>>,
    source: Option<Arc<Mutex<S>>>,
    active: Option<Arc<AtomicBool>>,
}

impl<D> MeasurementEngine<D> {
    pub fn new(driver: D) -> Self {
        MeasurementEngine {
            driver: Arc::new(Mutex::new(driver)),
            source: None,
            active: None,
        }
    }
}

impl<D, S> MeasurementEngine<D, S>
where
    D: InstrumentDriver + Send + 'static,
    S: CurrentSource + Send + 'static,
{
    pub fn with_current_source(driver: D, source: S) -> Self {
        MeasurementEngine {
            driver: Arc::new(Mutex::new(driver)),
            source: Some(Arc::new(Mutex::new(source))),
            active: None,
        }
    }

    /// Validate the sweep and start a worker thread for it.
    ///
    /// Synthesis is exercised once before any hardware access, so formula
    /// and parameter faults surface here instead of mid-sweep. Fails with
    /// [`Error::SessionActive`] while a previous session is still running;
    /// sessions are never queued.
    pub fn start(&mut self, spec: SweepSpec, waveform: WaveformParams) -> Result<SessionHandle> {
        if let Some(active) = &self.active {
            if !active.load(Ordering::SeqCst) {
                return Err(Error::SessionActive);
            }
        }
        spec.validate()?;
        if matches!(spec.mode, MeasurementMode::CurrentFrequencySweep { .. })
            && self.source.is_none()
        {
            return Err(Error::Config(ConfigError::NoCurrentSource));
        }
        if !matches!(spec.mode, MeasurementMode::Spectrum { .. }) {
            waveform::synthesize(&waveform)?;
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(SessionState::Running));

        let worker = Worker {
            driver: Arc::clone(&self.driver),
            source: self.source.clone(),
            spec,
            waveform,
            cancel: Arc::clone(&cancel),
            events: sender,
        };
        let worker_state = Arc::clone(&state);
        let worker_finished = Arc::clone(&finished);
        let join = std::thread::Builder::new()
            .name("measurement-sweep".into())
            .spawn(move || worker.run(worker_state, worker_finished))
            .map_err(anyhow::Error::from)?;

        self.active = Some(Arc::clone(&finished));
        Ok(SessionHandle {
            cancel,
            finished,
            state,
            events: receiver,
            join,
        })
    }
}

struct Worker<D, S> {
    driver: Arc<Mutex<D>>,
    source: Option<Arc<Mutex<S>>>,
    spec: SweepSpec,
    waveform: WaveformParams,
    cancel: Arc<AtomicBool>,
    events: Sender<SweepEvent>,
}

impl<D: InstrumentDriver, S: CurrentSource> Worker<D, S> {
    fn run(self, state: Arc<Mutex<SessionState>>, finished: Arc<AtomicBool>) {
        let mut collected = Vec::new();
        let terminal = match self.execute(&mut collected) {
            Ok(false) => SessionState::Completed,
            Ok(true) => SessionState::Aborted,
            Err(err) => {
                log::error!("sweep failed: {err}");
                let _ = self.events.send(SweepEvent::Error(err.to_string()));
                SessionState::Failed
            }
        };
        let result = SweepResult::from_collected(
            &self.spec.mode,
            self.spec.instrument.center_frequency,
            collected,
        );
        let _ = self.events.send(SweepEvent::SessionComplete(result));
        self.shutdown_outputs();
        *lock(&state) = terminal;
        let _ = self.events.send(SweepEvent::Finished);
        finished.store(true, Ordering::SeqCst);
    }

    /// Run the sweep loop. Returns whether the run was cancelled.
    fn execute(
        &self,
        collected: &mut Vec<(Coordinate, Vec<Complex64>)>,
    ) -> Result<bool, InstrumentError> {
        let config = &self.spec.instrument;
        {
            let mut driver = lock(&self.driver);
            driver.configure(
                config.input_range_dbm,
                config.output_range_dbm,
                config.center_frequency,
            )?;
            driver.set_input(true)?;
            driver.set_output(true)?;
            driver.configure_acquisition_window(
                config.window_duration,
                config.averages,
                config.trigger_delay,
            )?;
        }

        if let MeasurementMode::Spectrum {
            lo_start,
            lo_stop,
            points,
            integration_time,
        } = self.spec.mode
        {
            let samples = lock(&self.driver).measure_spectrum(
                config.center_frequency,
                lo_start,
                lo_stop,
                points,
                config.averages,
                integration_time,
            )?;
            self.emit_point(Coordinate::None, &samples, 1, 1, 0.0);
            collected.push((Coordinate::None, samples));
            return Ok(false);
        }

        // Amplitude points rescale this waveform instead of resynthesizing,
        // so the configured gain stays applied underneath the swept factor.
        let base = waveform::synthesize(&self.waveform).map_err(synthesis_error)?;

        let total = axes::total_points(&self.spec.mode);
        let mut window = RollingWindow::new();
        let mut last_current: Option<f64> = None;
        let mut done = 0usize;

        for coordinate in axes::sweep_points(&self.spec.mode) {
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(true);
            }
            let samples = match coordinate {
                Coordinate::None => base.clone(),
                Coordinate::Amplitude(amplitude) => waveform::scale(&base, amplitude),
                Coordinate::Frequency(frequency) => self.resynthesize(frequency)?,
                Coordinate::CurrentFrequency { current, frequency } => {
                    if last_current != Some(current) {
                        self.set_current(current)?;
                        last_current = Some(current);
                    }
                    self.resynthesize(frequency)?
                }
            };
            let started = Instant::now();
            let acquired = {
                let mut driver = lock(&self.driver);
                driver.upload_waveform(&samples)?;
                driver.acquire(config.averages, config.window_duration)?
            };
            window.push(started.elapsed().as_secs_f64());
            done += 1;
            let eta = (total - done) as f64 * window.mean();
            self.emit_point(coordinate, &acquired, done, total, eta);
            collected.push((coordinate, acquired));
        }
        Ok(false)
    }

    fn resynthesize(&self, lo_frequency: f64) -> Result<Vec<Complex64>, InstrumentError> {
        waveform::synthesize(&self.waveform.clone().with_digital_lo(lo_frequency))
            .map_err(synthesis_error)
    }

    fn set_current(&self, amperes: f64) -> Result<(), InstrumentError> {
        match &self.source {
            Some(source) => lock(source).set_output_level(amperes),
            None => Err(InstrumentError::new("no current source attached")),
        }
    }

    fn emit_point(
        &self,
        coordinate: Coordinate,
        samples: &[Complex64],
        done: usize,
        total: usize,
        eta_seconds: f64,
    ) {
        let _ = self.events.send(SweepEvent::PointResult {
            coordinate,
            samples: samples.to_vec(),
        });
        let _ = self.events.send(SweepEvent::Progress {
            percent: done as f64 / total as f64 * 100.0,
            eta_seconds,
        });
    }

    /// Disable both front-panel paths. Runs on every exit; failures are
    /// logged and never shadow the error that ended the sweep.
    fn shutdown_outputs(&self) {
        let mut driver = lock(&self.driver);
        if let Err(err) = driver.set_input(false) {
            log::warn!("could not disable the input path: {err}");
        }
        if let Err(err) = driver.set_output(false) {
            log::warn!("could not disable the output path: {err}");
        }
    }
}

fn synthesis_error(err: waveform::Error) -> InstrumentError {
    InstrumentError::Anyhow(anyhow::Error::new(err))
}
