#![forbid(unsafe_code)]

//! Core domain model and state for the Bedside ICU reference.
//!
//! This crate provides:
//! - Bed records and the patient store (with schema backfill on load)
//! - Derived body measures and physiology calculators
//! - The resuscitation timer, metronome and event log
//! - Shift notes and reminders
//! - Key-value persistence, configuration and logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod storage;
pub mod derived;
pub mod patient;
pub mod physiology;
pub mod clock;
pub mod audio;
pub mod effects;
pub mod event_log;
pub mod resus;
pub mod reminders;
pub mod notes;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use patient::PatientStore;
pub use physiology::BedIndices;
pub use clock::{Clock, ManualClock, SystemClock};
pub use audio::Tone;
pub use effects::{NullEffects, PlatformEffects};
pub use event_log::{EventCategory, LogEntry};
pub use resus::{ResuscitationSnapshot, ResuscitationTimer, TimerSettings};
pub use reminders::ReminderQueue;
pub use notes::ShiftNotes;
