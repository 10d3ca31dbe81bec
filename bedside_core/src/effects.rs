//! Platform capabilities used by the resuscitation timer.
//!
//! Audio output, vibration and the screen wake lock are optional: the timer
//! calls them best-effort and logs failures instead of propagating them.

use crate::audio::Tone;
use crate::Result;

/// Side effects a host platform may provide
pub trait PlatformEffects {
    /// Unlock or resume audio output; hosts that gate audio behind a user
    /// gesture need this before the first tone
    fn resume_audio(&mut self) -> Result<()>;

    /// Play one tone
    fn play(&mut self, tone: Tone) -> Result<()>;

    /// Vibrate with an on/off pattern in milliseconds
    fn vibrate(&mut self, pattern_ms: &[u32]) -> Result<()>;

    /// Keep the screen awake while the timer runs
    fn acquire_wake_lock(&mut self) -> Result<()>;

    fn release_wake_lock(&mut self) -> Result<()>;
}

/// Headless platform: every effect succeeds and does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEffects;

impl PlatformEffects for NullEffects {
    fn resume_audio(&mut self) -> Result<()> {
        Ok(())
    }

    fn play(&mut self, _tone: Tone) -> Result<()> {
        Ok(())
    }

    fn vibrate(&mut self, _pattern_ms: &[u32]) -> Result<()> {
        Ok(())
    }

    fn acquire_wake_lock(&mut self) -> Result<()> {
        Ok(())
    }

    fn release_wake_lock(&mut self) -> Result<()> {
        Ok(())
    }
}
