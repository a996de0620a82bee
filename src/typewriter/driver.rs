//! Async driver for a [`Typewriter`] channel.

use crate::typewriter::machine::{PacingProfile, Typewriter};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives the displayed text after every visible change
pub type DisplayFn = Arc<dyn Fn(&str) + Send + Sync>;

/// One paced channel running on its own tokio task and timer.
///
/// Each handle owns a child token of the session token: cancelling the session
/// stops every channel, while finishing or cancelling one channel leaves the
/// others untouched.
pub struct TypewriterHandle {
    machine: Arc<Mutex<Typewriter>>,

    /// Held across every `on_display` call; the machine lock never is
    gate: Arc<ReentrantMutex<()>>,

    wake: Arc<Notify>,
    token: CancellationToken,
    on_display: DisplayFn,
    task: JoinHandle<()>,
}

impl TypewriterHandle {
    /// Spawn a channel. Must be called within a tokio runtime.
    pub fn spawn(profile: PacingProfile, session: &CancellationToken, on_display: DisplayFn) -> Self {
        let machine = Arc::new(Mutex::new(Typewriter::new(profile)));
        let gate = Arc::new(ReentrantMutex::new(()));
        let wake = Arc::new(Notify::new());
        let token = session.child_token();

        let task = tokio::spawn(run(
            machine.clone(),
            gate.clone(),
            wake.clone(),
            token.clone(),
            on_display.clone(),
        ));

        Self {
            machine,
            gate,
            wake,
            token,
            on_display,
            task,
        }
    }

    /// Queue received text for display
    pub fn push(&self, text: &str) {
        if self.machine.lock().push(text) {
            self.wake.notify_one();
        }
    }

    /// Stop the timer and reveal everything received.
    ///
    /// Returns the final text. No-op (returning the frozen text) if the
    /// channel was cancelled.
    pub fn finish(&self) -> String {
        let _gate = self.gate.lock();
        let revealed = {
            let mut machine = self.machine.lock();
            if self.token.is_cancelled() && !machine.is_stopped() {
                machine.halt();
            }
            if machine.is_stopped() {
                None
            } else {
                machine.finish();
                Some(machine.displayed().to_string())
            }
        };

        if let Some(text) = &revealed {
            (self.on_display)(text);
        }
        self.token.cancel();

        match revealed {
            Some(text) => text,
            None => self.displayed(),
        }
    }

    /// Stop the timer with no further display updates
    pub fn cancel(&self) {
        self.machine.lock().halt();
        self.token.cancel();
        // Wait out a display already in flight on the driver task
        drop(self.gate.lock());
    }

    pub fn displayed(&self) -> String {
        self.machine.lock().displayed().to_string()
    }

    pub fn accumulated(&self) -> String {
        self.machine.lock().accumulated().to_string()
    }

    /// Whether the channel has stopped (finished, halted or its task exited)
    pub fn is_stopped(&self) -> bool {
        self.machine.lock().is_stopped() || self.task.is_finished()
    }
}

impl Drop for TypewriterHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    machine: Arc<Mutex<Typewriter>>,
    gate: Arc<ReentrantMutex<()>>,
    wake: Arc<Notify>,
    token: CancellationToken,
    on_display: DisplayFn,
) {
    loop {
        let delay = machine.lock().next_delay();

        match delay {
            Some(delay) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                let _gate = gate.lock();
                // Checked under the gate so nothing is shown after a cancel returns
                if token.is_cancelled() {
                    break;
                }
                let shown = {
                    let mut machine = machine.lock();
                    machine.tick().then(|| machine.displayed().to_string())
                };
                if let Some(text) = shown {
                    on_display(&text);
                }
            }
            None => {
                if machine.lock().is_stopped() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = wake.notified() => {}
                }
            }
        }
    }

    // Session-level cancellation reaches us through the token alone
    let mut machine = machine.lock();
    if !machine.is_stopped() {
        machine.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recorder() -> (DisplayFn, Arc<Mutex<Vec<String>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        let on_display: DisplayFn = Arc::new(move |text: &str| sink.lock().push(text.to_string()));
        (on_display, frames)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveals_over_time() {
        let session = CancellationToken::new();
        let (on_display, frames) = recorder();
        let handle = TypewriterHandle::spawn(PacingProfile::content(), &session, on_display);

        handle.push("abc");
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(handle.displayed(), "a");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.displayed(), "abc");
        assert_eq!(*frames.lock(), vec!["a", "ab", "abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_channel_wakes_on_push() {
        let session = CancellationToken::new();
        let (on_display, _frames) = recorder();
        let handle = TypewriterHandle::spawn(PacingProfile::content(), &session, on_display);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.displayed(), "");

        handle.push("hi");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.displayed(), "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_reveals_everything() {
        let session = CancellationToken::new();
        let (on_display, frames) = recorder();
        let handle = TypewriterHandle::spawn(PacingProfile::content(), &session, on_display);

        handle.push(&"w".repeat(400));
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(handle.displayed().len() < 400);

        let final_text = handle.finish();
        assert_eq!(final_text.len(), 400);
        assert_eq!(frames.lock().last().map(|s| s.len()), Some(400));

        let frame_count = frames.lock().len();
        handle.push("more");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(frames.lock().len(), frame_count);
        assert_eq!(handle.displayed().len(), 400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_display_updates() {
        let session = CancellationToken::new();
        let (on_display, frames) = recorder();
        let handle = TypewriterHandle::spawn(PacingProfile::content(), &session, on_display);

        handle.push("abcdefghij");
        tokio::time::sleep(Duration::from_millis(60)).await;
        let shown = handle.displayed();
        assert!(!shown.is_empty());

        handle.cancel();
        let frame_count = frames.lock().len();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(handle.displayed(), shown);
        assert_eq!(frames.lock().len(), frame_count);
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cancel_stops_all_channels() {
        let session = CancellationToken::new();
        let (content_display, content_frames) = recorder();
        let (reasoning_display, reasoning_frames) = recorder();
        let content = TypewriterHandle::spawn(PacingProfile::content(), &session, content_display);
        let reasoning =
            TypewriterHandle::spawn(PacingProfile::reasoning(), &session, reasoning_display);

        content.push("the answer is forty-two");
        reasoning.push("thinking about it carefully");
        tokio::time::sleep(Duration::from_millis(40)).await;

        session.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let counts = (content_frames.lock().len(), reasoning_frames.lock().len());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            (content_frames.lock().len(), reasoning_frames.lock().len()),
            counts
        );
        assert!(content.displayed().len() < content.accumulated().len());

        // finish after cancellation reveals nothing new
        let frozen = content.displayed();
        assert_eq!(content.finish(), frozen);
    }

    type Slot = Arc<Mutex<Option<Arc<TypewriterHandle>>>>;

    /// Display callback that reads its own handle back
    fn reading_back(slot: Slot, seen: Arc<Mutex<Vec<(String, String)>>>) -> DisplayFn {
        Arc::new(move |text: &str| {
            let handle = slot.lock().clone();
            if let Some(handle) = handle {
                seen.lock().push((text.to_string(), handle.displayed()));
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_callback_can_read_handle() {
        let session = CancellationToken::new();
        let slot: Slot = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = Arc::new(TypewriterHandle::spawn(
            PacingProfile::content(),
            &session,
            reading_back(slot.clone(), seen.clone()),
        ));
        *slot.lock() = Some(handle.clone());

        handle.push("abc");
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.push("de");
        assert_eq!(handle.finish(), "abcde");

        let seen = seen.lock().clone();
        assert_eq!(seen.len(), 4);
        for (shown, read_back) in &seen {
            assert_eq!(shown, read_back);
        }
        assert_eq!(seen.last().map(|(shown, _)| shown.as_str()), Some("abcde"));
        slot.lock().take();
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_callback_can_cancel() {
        let session = CancellationToken::new();
        let slot: Slot = Arc::new(Mutex::new(None));
        let frames = Arc::new(Mutex::new(Vec::new()));
        let (slot_ref, frames_ref) = (slot.clone(), frames.clone());
        let on_display: DisplayFn = Arc::new(move |text: &str| {
            frames_ref.lock().push(text.to_string());
            let handle = slot_ref.lock().clone();
            if let Some(handle) = handle {
                handle.cancel();
            }
        });
        let handle = Arc::new(TypewriterHandle::spawn(
            PacingProfile::content(),
            &session,
            on_display,
        ));
        *slot.lock() = Some(handle.clone());

        handle.push("abcd");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*frames.lock(), vec!["a"]);
        assert!(handle.is_stopped());
        slot.lock().take();
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_are_independent() {
        let session = CancellationToken::new();
        let (content_display, _) = recorder();
        let (reasoning_display, _) = recorder();
        let content = TypewriterHandle::spawn(PacingProfile::content(), &session, content_display);
        let reasoning =
            TypewriterHandle::spawn(PacingProfile::reasoning(), &session, reasoning_display);

        reasoning.push("step one, step two");
        reasoning.finish();

        content.push("ok");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(content.displayed(), "ok");
        assert_eq!(reasoning.displayed(), "step one, step two");
    }
}
