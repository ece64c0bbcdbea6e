//! Bookkeeping for replies that are scheduled but not yet delivered

use crate::state_machine::{ConversationState, StateUpdate};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Result of cancelling a non-empty set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled {
    pub channel: String,
    pub replies: usize,
    /// State as of the last fully delivered batch
    pub rollback: Option<ConversationState>,
}

/// Replies scheduled by one transition
#[derive(Debug, Clone, Copy)]
struct Batch {
    id: u64,
    undelivered: usize,
    /// State the transition started from
    before: ConversationState,
}

/// Cancellation set for one conversation's outstanding replies.
///
/// Every timer races a child of `token`; cancelling swaps in a fresh token and
/// bumps `epoch`, so a delivery that was already in flight when the set was
/// cancelled is recognized as stale and dropped.
///
/// Batches are kept in scheduling order until every reply in them and in all
/// earlier batches has landed. The oldest one left is where a cancel rolls
/// the conversation back to.
#[derive(Debug)]
pub struct PendingReplies {
    token: CancellationToken,
    epoch: u64,
    outstanding: usize,
    channel: Option<String>,
    next_batch: u64,
    batches: VecDeque<Batch>,
}

impl PendingReplies {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            epoch: 0,
            outstanding: 0,
            channel: None,
            next_batch: 0,
            batches: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outstanding == 0
    }

    /// Open a batch for the replies of one transition that started from
    /// `before`, and return its id for [`Self::track`].
    pub fn begin_batch(&mut self, before: ConversationState) -> u64 {
        let id = self.next_batch;
        self.next_batch += 1;
        self.batches.push_back(Batch {
            id,
            undelivered: 0,
            before,
        });
        id
    }

    /// Register one more reply of `batch` for `channel`. The returned token
    /// must be raced by the reply's timer and the epoch stamped on its
    /// delivery.
    pub fn track(&mut self, channel: &str, batch: u64) -> (CancellationToken, u64) {
        self.outstanding += 1;
        if let Some(entry) = self.batches.iter_mut().find(|b| b.id == batch) {
            entry.undelivered += 1;
        }
        if self.channel.as_deref() != Some(channel) {
            self.channel = Some(channel.to_string());
        }
        (self.token.child_token(), self.epoch)
    }

    /// Account for a delivery. Returns false if it belongs to a cancelled epoch.
    ///
    /// A deferred `update` carried by the delivered reply is folded into the
    /// starting state of every later batch, so rolling back to one of them
    /// keeps it.
    pub fn settle(&mut self, epoch: u64, batch: u64, update: Option<StateUpdate>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.outstanding = self.outstanding.saturating_sub(1);

        for entry in &mut self.batches {
            if entry.id == batch {
                entry.undelivered = entry.undelivered.saturating_sub(1);
            } else if let Some(update) = update.filter(|_| entry.id > batch) {
                entry.before = entry.before.with_update(update);
            }
        }
        while self.batches.front().is_some_and(|b| b.undelivered == 0) {
            self.batches.pop_front();
        }
        true
    }

    /// Cancel every outstanding reply, or return `None` if nothing was pending.
    pub fn cancel_all(&mut self) -> Option<Cancelled> {
        if self.outstanding == 0 {
            return None;
        }
        self.token.cancel();
        self.token = CancellationToken::new();
        self.epoch += 1;
        let replies = std::mem::take(&mut self.outstanding);
        let rollback = self.batches.front().map(|b| b.before);
        self.batches.clear();
        self.channel.take().map(|channel| Cancelled {
            channel,
            replies,
            rollback,
        })
    }
}

impl Default for PendingReplies {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PendingReplies {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNEL: &str = "Helper AI";

    fn at_step(step: u32) -> ConversationState {
        ConversationState {
            step,
            ..ConversationState::default()
        }
    }

    #[test]
    fn test_cancel_with_nothing_pending_is_noop() {
        let mut pending = PendingReplies::new();
        assert_eq!(pending.cancel_all(), None);
        assert_eq!(pending.cancel_all(), None);
    }

    #[test]
    fn test_cancel_trips_tokens_and_stales_epoch() {
        let mut pending = PendingReplies::new();
        let batch = pending.begin_batch(at_step(3));
        let (first, epoch) = pending.track(CHANNEL, batch);
        let (second, _) = pending.track(CHANNEL, batch);
        assert_eq!(pending.outstanding(), 2);

        let cancelled = pending.cancel_all().unwrap();
        assert_eq!(cancelled.channel, CHANNEL);
        assert_eq!(cancelled.replies, 2);
        assert_eq!(cancelled.rollback, Some(at_step(3)));
        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        assert!(pending.is_empty());

        // In-flight delivery from before the cancel is rejected
        assert!(!pending.settle(epoch, batch, None));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_new_replies_after_cancel_are_live() {
        let mut pending = PendingReplies::new();
        let batch = pending.begin_batch(at_step(0));
        let _ = pending.track(CHANNEL, batch);
        pending.cancel_all();

        let batch = pending.begin_batch(at_step(0));
        let (token, epoch) = pending.track(CHANNEL, batch);
        assert!(!token.is_cancelled());
        assert!(pending.settle(epoch, batch, None));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_partial_batch_rolls_back_to_its_start() {
        let mut pending = PendingReplies::new();
        let batch = pending.begin_batch(at_step(3));
        let (_, epoch) = pending.track(CHANNEL, batch);
        let _ = pending.track(CHANNEL, batch);

        assert!(pending.settle(epoch, batch, None));
        let cancelled = pending.cancel_all().unwrap();
        assert_eq!(cancelled.replies, 1);
        assert_eq!(cancelled.rollback, Some(at_step(3)));
    }

    #[test]
    fn test_later_batch_landing_first_does_not_move_rollback() {
        let mut pending = PendingReplies::new();
        let question = pending.begin_batch(at_step(3));
        let (_, epoch) = pending.track(CHANNEL, question);
        let nudge = pending.begin_batch(at_step(4));
        let _ = pending.track(CHANNEL, nudge);

        assert!(pending.settle(epoch, nudge, None));
        assert_eq!(pending.cancel_all().unwrap().rollback, Some(at_step(3)));
    }

    #[test]
    fn test_deferred_update_carries_into_later_batches() {
        let mut pending = PendingReplies::new();
        let question = pending.begin_batch(at_step(3));
        let (_, epoch) = pending.track(CHANNEL, question);
        let retry = pending.begin_batch(at_step(4));
        let _ = pending.track(CHANNEL, retry);

        assert!(pending.settle(epoch, question, Some(StateUpdate::AwaitAnswer)));
        let rollback = pending.cancel_all().unwrap().rollback.unwrap();
        assert_eq!(rollback.step, 4);
        assert!(rollback.awaiting_answer);
    }

    #[test]
    fn test_drop_cancels_timers() {
        let mut pending = PendingReplies::new();
        let batch = pending.begin_batch(at_step(0));
        let (token, _) = pending.track(CHANNEL, batch);
        drop(pending);
        assert!(token.is_cancelled());
    }
}
