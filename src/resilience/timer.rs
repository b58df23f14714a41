//! Cancellable retry timer.
//!
//! A tracker owns exactly one `TimerSlot`. Arming it cancels whatever was
//! armed before; the waiting side learns about cancellation through a
//! oneshot whose sender lives in the slot.

use std::time::Duration;

use tokio::sync::oneshot;

/// Identifies one arming of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket(u64);

/// Result of waiting on an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Elapsed,
    Cancelled,
}

/// Holder for at most one live timer.
#[derive(Debug, Default)]
pub struct TimerSlot {
    current: Option<(TimerTicket, oneshot::Sender<()>)>,
    next_id: u64,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a new timer, cancelling the previous one.
    pub fn arm(&mut self) -> (TimerTicket, oneshot::Receiver<()>) {
        self.cancel();
        self.next_id = self.next_id.wrapping_add(1);
        let ticket = TimerTicket(self.next_id);
        let (tx, rx) = oneshot::channel();
        self.current = Some((ticket, tx));
        (ticket, rx)
    }

    /// Cancel the live timer. Returns false if nothing was armed.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some((_, tx)) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Clear the slot if `ticket` is still the live timer.
    ///
    /// Returns false when the timer was cancelled or replaced meanwhile.
    pub fn release(&mut self, ticket: TimerTicket) -> bool {
        match &self.current {
            Some((live, _)) if *live == ticket => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.current.is_some()
    }
}

/// Sleep for `delay` unless the slot signals cancellation first.
pub async fn wait(delay: Duration, cancelled: oneshot::Receiver<()>) -> TimerOutcome {
    tokio::select! {
        _ = tokio::time::sleep(delay) => TimerOutcome::Elapsed,
        // Both an explicit cancel and a dropped sender land here.
        _ = cancelled => TimerOutcome::Cancelled,
    }
}
