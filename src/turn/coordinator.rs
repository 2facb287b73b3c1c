//! The turn-taking coordinator.
//!
//! Buffers final transcripts and commits them as one utterance after a
//! quiet period with no new finals. Partial transcripts are unreliable for
//! segmentation, so only finals accumulate; the grace period absorbs the
//! mid-sentence "final" segments streaming recognizers emit at
//! punctuation-level pauses. While the assistant is speaking, recognition
//! of its own voice through the microphone is ignored entirely.

use crate::pipeline::types::Transcript;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Conversation turn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nobody is speaking.
    Idle,
    /// Final transcripts are buffered, the debounce timer is running.
    UserSpeaking,
    /// The assistant is speaking; transcripts are ignored.
    AssistantSpeaking,
}

struct TurnInner {
    turn: TurnState,
    /// Pending utterance text, space-joined from trimmed finals.
    pending: String,
    /// Bumped on every (re)arm; a fire with a stale epoch is ignored.
    timer_epoch: u64,
    timer: Option<AbortHandle>,
}

struct CoordinatorShared {
    grace_period: Duration,
    utterance_tx: mpsc::Sender<String>,
    inner: Mutex<TurnInner>,
}

impl CoordinatorShared {
    fn lock(&self) -> MutexGuard<'_, TurnInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Debounce timer fired: commit whatever is buffered.
    ///
    /// Runs under the same lock as the event handlers. A fire whose epoch
    /// no longer matches lost a race with a re-arm and does nothing. The
    /// fire is otherwise unconditional: if the state moved to
    /// `AssistantSpeaking` after the timer was armed, buffered text is
    /// still flushed and the state still resets to `Idle` (see the open
    /// question notes in DESIGN.md).
    fn flush(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.timer_epoch != epoch {
            return;
        }
        inner.timer = None;
        inner.turn = TurnState::Idle;
        if inner.pending.is_empty() {
            return;
        }

        let utterance = std::mem::take(&mut inner.pending);
        drop(inner);

        // Never block the timer context: under backpressure the utterance
        // is dropped and logged rather than waiting on the queue.
        match self.utterance_tx.try_send(utterance) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                log::warn!("utterance queue full, dropping: {:?}", dropped);
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("utterance queue closed, pipeline is shutting down");
            }
        }
    }
}

/// Owns the conversation's turn state.
///
/// Cheap to clone; all clones share one state machine. `on_transcript` and
/// `set_assistant_speaking` may be called concurrently from different
/// tasks; a single mutex serializes them and the timer fire, so the machine
/// is correct under any interleaving of the two call sites.
#[derive(Clone)]
pub struct TurnCoordinator {
    shared: Arc<CoordinatorShared>,
}

impl TurnCoordinator {
    /// Creates a coordinator committing utterances to `utterance_tx` after
    /// `grace_period` of final-transcript silence.
    pub fn new(grace_period: Duration, utterance_tx: mpsc::Sender<String>) -> Self {
        Self {
            shared: Arc::new(CoordinatorShared {
                grace_period,
                utterance_tx,
                inner: Mutex::new(TurnInner {
                    turn: TurnState::Idle,
                    pending: String::new(),
                    timer_epoch: 0,
                    timer: None,
                }),
            }),
        }
    }

    /// Current turn state.
    pub fn state(&self) -> TurnState {
        self.shared.lock().turn
    }

    /// Feed one transcript event into the state machine.
    pub fn on_transcript(&self, event: Transcript) {
        let mut inner = self.shared.lock();

        if inner.turn == TurnState::AssistantSpeaking {
            log::debug!("ignoring transcript while assistant speaks: {:?}", event.text);
            return;
        }

        if !event.is_final {
            log::debug!("partial transcript (ignored for turn): {:?}", event.text);
            return;
        }

        let text = event.text.trim();
        if text.is_empty() {
            return;
        }

        log::info!("buffering final transcript: {:?}", text);
        if !inner.pending.is_empty() {
            inner.pending.push(' ');
        }
        inner.pending.push_str(text);
        inner.turn = TurnState::UserSpeaking;

        self.arm_debounce(&mut inner);
    }

    /// Toggle assistant speech. `true` moves to `AssistantSpeaking` without
    /// touching the buffer or an armed timer; `false` always yields `Idle`.
    pub fn set_assistant_speaking(&self, speaking: bool) {
        let mut inner = self.shared.lock();
        if speaking {
            log::debug!("turn state -> assistant speaking");
            inner.turn = TurnState::AssistantSpeaking;
        } else {
            log::debug!("turn state -> idle");
            inner.turn = TurnState::Idle;
        }
    }

    /// (Re)arm the debounce timer. The previous timer, if any, is aborted
    /// and its epoch invalidated, so re-arming never races two flushes:
    /// total wait before commit is always exactly one grace period of
    /// silence since the last final.
    fn arm_debounce(&self, inner: &mut TurnInner) {
        inner.timer_epoch += 1;
        let epoch = inner.timer_epoch;
        if let Some(previous) = inner.timer.take() {
            previous.abort();
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(shared.grace_period).await;
            shared.flush(epoch);
        });
        inner.timer = Some(handle.abort_handle());
    }

    /// Consume transcripts until the queue closes or cancellation fires.
    pub async fn run(
        &self,
        mut transcript_rx: mpsc::Receiver<Transcript>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = transcript_rx.recv() => match event {
                    Some(event) => self.on_transcript(event),
                    None => break,
                },
            }
        }
    }
}
