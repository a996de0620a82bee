//! Typewriter state machine.
//!
//! Pure and clock-free: callers ask for [`Typewriter::next_delay`], wait however
//! they like, then call [`Typewriter::tick`].

use std::time::Duration;

/// One pacing band: applies while at least `min_remaining` chars are hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingTier {
    pub min_remaining: usize,
    pub step: usize,
    pub delay: Duration,
}

impl PacingTier {
    pub const fn new(min_remaining: usize, step: usize, delay_ms: u64) -> Self {
        Self {
            min_remaining,
            step,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

const CONTENT_TIERS: &[PacingTier] = &[
    PacingTier::new(101, 15, 10),
    PacingTier::new(51, 8, 15),
    PacingTier::new(21, 4, 20),
    PacingTier::new(6, 2, 25),
    PacingTier::new(0, 1, 30),
];

const REASONING_TIERS: &[PacingTier] = &[
    PacingTier::new(101, 25, 5),
    PacingTier::new(51, 12, 8),
    PacingTier::new(21, 6, 10),
    PacingTier::new(6, 3, 12),
    PacingTier::new(0, 2, 15),
];

/// Catch-up curve: more hidden text means bigger steps and shorter delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingProfile {
    /// Tiers ordered by descending `min_remaining`
    tiers: &'static [PacingTier],
}

impl PacingProfile {
    /// Custom profile. Tiers must be ordered by descending `min_remaining`
    /// and end with a `min_remaining: 0` tier.
    pub const fn new(tiers: &'static [PacingTier]) -> Self {
        Self { tiers }
    }

    /// Final-answer pacing: 1 char per 30ms up to 15 chars per 10ms
    pub const fn content() -> Self {
        Self::new(CONTENT_TIERS)
    }

    /// Reasoning pacing, faster than content
    pub const fn reasoning() -> Self {
        Self::new(REASONING_TIERS)
    }

    /// Step size (chars) and delay for `remaining` hidden chars
    pub fn pace(&self, remaining: usize) -> (usize, Duration) {
        let tier = self
            .tiers
            .iter()
            .find(|tier| remaining >= tier.min_remaining)
            .or(self.tiers.last());

        match tier {
            Some(tier) => (tier.step.max(1), tier.delay),
            None => (remaining.max(1), Duration::ZERO),
        }
    }
}

impl Default for PacingProfile {
    fn default() -> Self {
        Self::content()
    }
}

/// Lifecycle of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypewriterState {
    /// Everything received is displayed
    Idle,
    /// Hidden text remains; ticks are due
    Ticking,
    /// Completed; displayed equals accumulated
    Finished,
    /// Cancelled; displayed is frozen
    Halted,
}

/// Paced reveal of received text.
///
/// `displayed()` is always a prefix of `accumulated()`.
#[derive(Debug, Clone)]
pub struct Typewriter {
    accumulated: String,

    /// Byte offset of the displayed prefix, always on a char boundary
    shown: usize,

    /// Chars not yet displayed
    hidden_chars: usize,

    profile: PacingProfile,
    state: TypewriterState,
}

impl Typewriter {
    pub fn new(profile: PacingProfile) -> Self {
        Self {
            accumulated: String::new(),
            shown: 0,
            hidden_chars: 0,
            profile,
            state: TypewriterState::Idle,
        }
    }

    /// Append received text. Ignored once finished or halted.
    ///
    /// Returns true when this push started ticking.
    pub fn push(&mut self, text: &str) -> bool {
        if text.is_empty() || self.is_stopped() {
            return false;
        }

        self.accumulated.push_str(text);
        self.hidden_chars += text.chars().count();

        let started = self.state == TypewriterState::Idle;
        self.state = TypewriterState::Ticking;
        started
    }

    /// Delay before the next tick, or `None` when no tick is due
    pub fn next_delay(&self) -> Option<Duration> {
        match self.state {
            TypewriterState::Ticking => Some(self.profile.pace(self.hidden_chars).1),
            _ => None,
        }
    }

    /// Reveal the next step. Returns whether `displayed()` changed.
    pub fn tick(&mut self) -> bool {
        if self.state != TypewriterState::Ticking {
            return false;
        }

        let (step, _) = self.profile.pace(self.hidden_chars);
        let step = step.min(self.hidden_chars);

        let hidden = &self.accumulated[self.shown..];
        let advance = hidden
            .char_indices()
            .nth(step)
            .map(|(idx, _)| idx)
            .unwrap_or(hidden.len());

        self.shown += advance;
        self.hidden_chars -= step;
        if self.hidden_chars == 0 {
            self.state = TypewriterState::Idle;
        }

        advance > 0
    }

    /// Reveal everything and stop ticking
    pub fn finish(&mut self) {
        if self.state == TypewriterState::Halted {
            return;
        }
        self.shown = self.accumulated.len();
        self.hidden_chars = 0;
        self.state = TypewriterState::Finished;
    }

    /// Stop without revealing anything further
    pub fn halt(&mut self) {
        if self.state != TypewriterState::Finished {
            self.state = TypewriterState::Halted;
        }
    }

    pub fn displayed(&self) -> &str {
        &self.accumulated[..self.shown]
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Chars received but not yet displayed
    pub fn remaining(&self) -> usize {
        self.hidden_chars
    }

    pub fn state(&self) -> TypewriterState {
        self.state
    }

    pub fn is_ticking(&self) -> bool {
        self.state == TypewriterState::Ticking
    }

    /// Finished or halted
    pub fn is_stopped(&self) -> bool {
        matches!(
            self.state,
            TypewriterState::Finished | TypewriterState::Halted
        )
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new(PacingProfile::default())
    }
}
