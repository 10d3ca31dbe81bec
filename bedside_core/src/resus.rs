//! Resuscitation (CPR) timer with metronome and event log.
//!
//! The timer does not own a thread or an OS timer. The host calls
//! [`ResuscitationTimer::advance`] with the wall-clock time that passed and
//! the timer fires whole elapsed-seconds and metronome beats out of its
//! phase accumulators. Pausing disarms both accumulators, so no tick can
//! fire after a pause.
//!
//! ## State machine
//! - `Paused` (initial): nothing fires
//! - `Running`: one-second tick armed; metronome beat armed when enabled
//!
//! Every `round_seconds` (120 by default) of running time a round
//! completes: alarm tone, info log entry, vibration.

use crate::audio::Tone;
use crate::clock::Clock;
use crate::config::ResuscitationConfig;
use crate::effects::PlatformEffects;
use crate::event_log::{self, EventCategory, EventLog, LogEntry, ReportSummary};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Vibration pattern at a round boundary, on/off/on in ms
pub const ROUND_VIBRATION_MS: [u32; 3] = [500, 200, 500];

/// Timer parameters
#[derive(Clone, Debug, PartialEq)]
pub struct TimerSettings {
    pub round_seconds: u64,
    pub beat_period: Duration,
    pub adrenaline_dose_mg: f64,
    pub metronome_enabled: bool,
}

impl TimerSettings {
    /// Beat period for a tempo in beats per minute
    pub fn beat_period_for(bpm: u32) -> Duration {
        Duration::from_secs(60) / bpm.max(1)
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from(&ResuscitationConfig::default())
    }
}

impl From<&ResuscitationConfig> for TimerSettings {
    fn from(config: &ResuscitationConfig) -> Self {
        Self {
            round_seconds: config.round_seconds.max(1),
            beat_period: Self::beat_period_for(config.metronome_bpm),
            adrenaline_dose_mg: config.adrenaline_dose_mg,
            metronome_enabled: config.metronome_enabled,
        }
    }
}

/// Published state for rendering
#[derive(Clone, Debug, Serialize)]
pub struct ResuscitationSnapshot {
    pub elapsed_seconds: u64,
    pub formatted_elapsed: String,
    pub running: bool,
    pub round_count: u32,
    pub metronome_enabled: bool,
    pub metronome_active: bool,
    pub adrenaline_count: u32,
    pub shock_count: u32,
    pub events: Vec<LogEntry>,
}

/// One resuscitation session
pub struct ResuscitationTimer<E: PlatformEffects, C: Clock> {
    settings: TimerSettings,
    effects: E,
    clock: C,

    elapsed_seconds: u64,
    running: bool,
    round_count: u32,
    metronome_enabled: bool,
    adrenaline_count: u32,
    shock_count: u32,
    log: EventLog,

    /// Time since the last elapsed-second tick; only advances while running
    second_phase: Duration,
    /// Time since the last beat; `None` when the metronome loop is stopped
    beat_phase: Option<Duration>,
    beats_played: u64,
    wake_lock_held: bool,
}

impl<E: PlatformEffects, C: Clock> ResuscitationTimer<E, C> {
    pub fn new(settings: TimerSettings, effects: E, clock: C) -> Self {
        let metronome_enabled = settings.metronome_enabled;
        Self {
            settings,
            effects,
            clock,
            elapsed_seconds: 0,
            running: false,
            round_count: 0,
            metronome_enabled,
            adrenaline_count: 0,
            shock_count: 0,
            log: EventLog::default(),
            second_phase: Duration::ZERO,
            beat_phase: None,
            beats_played: 0,
            wake_lock_held: false,
        }
    }

    // ------------------------------------------------------------------
    // Timer actions
    // ------------------------------------------------------------------

    /// Start when paused, pause when running
    pub fn toggle(&mut self) {
        if self.running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Start the session; no-op if already running
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        // Audio may still be locked until the first user gesture
        let resumed = self.effects.resume_audio();
        best_effort("audio output", resumed);

        self.running = true;
        self.second_phase = Duration::ZERO;
        tracing::info!("Resuscitation timer started at {}", self.formatted_elapsed());

        if self.metronome_enabled {
            self.start_metronome();
        }

        match self.effects.acquire_wake_lock() {
            Ok(()) => self.wake_lock_held = true,
            Err(e) => best_effort("wake lock", Err(e)),
        }
    }

    /// Stop both periodic ticks; counters are kept
    pub fn pause(&mut self) {
        if self.running {
            tracing::info!("Resuscitation timer paused at {}", self.formatted_elapsed());
        }
        self.running = false;
        self.second_phase = Duration::ZERO;
        self.stop_metronome();

        if self.wake_lock_held {
            self.wake_lock_held = false;
            let released = self.effects.release_wake_lock();
            best_effort("wake lock release", released);
        }
    }

    /// Pause and clear the session
    pub fn reset(&mut self) {
        self.pause();
        self.elapsed_seconds = 0;
        self.round_count = 0;
        self.adrenaline_count = 0;
        self.shock_count = 0;
        self.log.clear();
        tracing::info!("Resuscitation session reset");
    }

    /// Flip the metronome; takes effect immediately while running
    pub fn toggle_metronome(&mut self) {
        self.metronome_enabled = !self.metronome_enabled;
        tracing::debug!("Metronome enabled: {}", self.metronome_enabled);

        if self.running {
            if self.metronome_enabled {
                self.start_metronome();
            } else {
                self.stop_metronome();
            }
        }
    }

    /// Let `dt` of wall-clock time pass.
    ///
    /// Seconds and beats fire in time order; a long `dt` catches up on every
    /// tick it covers.
    pub fn advance(&mut self, dt: Duration) {
        let mut remaining = dt;

        while self.running {
            let until_second = ONE_SECOND - self.second_phase;
            let until_beat = self
                .beat_phase
                .map(|phase| self.settings.beat_period.saturating_sub(phase));
            let step = until_beat.map_or(until_second, |beat| beat.min(until_second));

            if step > remaining {
                self.second_phase += remaining;
                if let Some(phase) = self.beat_phase.as_mut() {
                    *phase += remaining;
                }
                return;
            }

            remaining -= step;
            self.second_phase += step;
            if let Some(phase) = self.beat_phase.as_mut() {
                *phase += step;
            }

            if self.second_phase >= ONE_SECOND {
                self.second_phase = Duration::ZERO;
                self.on_second();
            }
            if matches!(self.beat_phase, Some(phase) if phase >= self.settings.beat_period) {
                self.beat_phase = Some(Duration::ZERO);
                self.beat();
            }
        }
    }

    // ------------------------------------------------------------------
    // Log actions
    // ------------------------------------------------------------------

    /// Record one adrenaline dose
    pub fn record_adrenaline(&mut self) {
        self.adrenaline_count += 1;
        let message = format!(
            "Adrenaline {} mg (dose {})",
            event_log::format_mg(self.settings.adrenaline_dose_mg),
            self.adrenaline_count
        );
        self.log_event(message, EventCategory::Medication);
    }

    /// Record one defibrillation shock at `joules`
    pub fn record_shock(&mut self, joules: f64) {
        self.shock_count += 1;
        let message = format!("Shock {} delivered ({} J)", self.shock_count, joules);
        self.log_event(message, EventCategory::Shock);
    }

    /// Add a free-text info entry
    pub fn record_note(&mut self, message: impl Into<String>) {
        self.log_event(message.into(), EventCategory::Info);
    }

    // ------------------------------------------------------------------
    // Published state
    // ------------------------------------------------------------------

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn metronome_enabled(&self) -> bool {
        self.metronome_enabled
    }

    /// True while beats are actually being scheduled
    pub fn metronome_active(&self) -> bool {
        self.beat_phase.is_some()
    }

    pub fn adrenaline_count(&self) -> u32 {
        self.adrenaline_count
    }

    pub fn shock_count(&self) -> u32 {
        self.shock_count
    }

    /// Metronome beats played since the timer was created
    pub fn beats_played(&self) -> u64 {
        self.beats_played
    }

    /// Event log, newest first
    pub fn event_log(&self) -> &[LogEntry] {
        self.log.newest_first()
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    /// Elapsed time as `MM:SS`
    pub fn formatted_elapsed(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.elapsed_seconds / 60,
            self.elapsed_seconds % 60
        )
    }

    pub fn snapshot(&self) -> ResuscitationSnapshot {
        ResuscitationSnapshot {
            elapsed_seconds: self.elapsed_seconds,
            formatted_elapsed: self.formatted_elapsed(),
            running: self.running,
            round_count: self.round_count,
            metronome_enabled: self.metronome_enabled,
            metronome_active: self.metronome_active(),
            adrenaline_count: self.adrenaline_count,
            shock_count: self.shock_count,
            events: self.log.newest_first().to_vec(),
        }
    }

    /// Human-readable report, events in chronological order
    pub fn export_log(&self) -> String {
        let summary = ReportSummary {
            generated_at: self.clock.now(),
            elapsed: self.formatted_elapsed(),
            rounds: self.round_count,
            shocks: self.shock_count,
            adrenaline_mg: f64::from(self.adrenaline_count) * self.settings.adrenaline_dose_mg,
        };
        event_log::render_report(&summary, &self.log)
    }

    /// Write the event log as CSV; returns the number of rows
    pub fn export_log_csv(&self, path: &Path) -> Result<usize> {
        event_log::write_csv(&self.log, path)
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    fn on_second(&mut self) {
        self.elapsed_seconds += 1;
        self.check_round();
    }

    fn check_round(&mut self) {
        if self.elapsed_seconds == 0 || self.elapsed_seconds % self.settings.round_seconds != 0 {
            return;
        }

        self.round_count += 1;
        tracing::info!(
            "Round {} completed at {}",
            self.round_count,
            self.formatted_elapsed()
        );

        let played = self.effects.play(Tone::Alarm);
        best_effort("alarm tone", played);

        let message = format!("Round {} completed - switch!", self.round_count);
        self.log_event(message, EventCategory::Info);

        let vibrated = self.effects.vibrate(&ROUND_VIBRATION_MS);
        best_effort("vibration", vibrated);
    }

    fn start_metronome(&mut self) {
        if self.beat_phase.is_some() {
            return;
        }
        // First beat plays right away, not after one period
        self.beat_phase = Some(Duration::ZERO);
        self.beat();
    }

    fn stop_metronome(&mut self) {
        self.beat_phase = None;
    }

    fn beat(&mut self) {
        self.beats_played += 1;
        let played = self.effects.play(Tone::Tick);
        best_effort("metronome tone", played);
    }

    fn log_event(&mut self, message: String, category: EventCategory) {
        tracing::info!("[{}] {}", category.as_str(), message);
        self.log.push(LogEntry {
            timestamp: self.clock.now(),
            message,
            category,
        });
    }
}

/// Swallow and log a failed optional platform effect
fn best_effort(what: &str, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(Error::Unsupported(reason)) => {
            tracing::debug!("{} not supported: {}", what, reason);
        }
        Err(e) => tracing::warn!("{} unavailable: {}", what, e),
    }
}
