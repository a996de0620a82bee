//! Typewriter Scheduler
//!
//! Decouples "received" from "displayed": bursty network delivery is revealed
//! at a readable, self-accelerating pace. The state machine is clock-free; the
//! driver runs it on tokio timers.

pub mod driver;
pub mod machine;

pub use driver::{DisplayFn, TypewriterHandle};
pub use machine::{PacingProfile, PacingTier, Typewriter, TypewriterState};
