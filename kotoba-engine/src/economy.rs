//! Hearts and diamonds. Hearts gate challenge play and regenerate on a fixed
//! wall-clock cadence; diamonds are earned currency that can buy hearts back.
//! Regeneration state is just `(hearts, last_heart_loss)`, so it survives
//! reloads and needs no persisted timers; [`EconomyClock`] merely polls.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::state::LearnerState;
use crate::store::SharedProgressionStore;

pub const MAX_HEARTS: u8 = 5;

/// One heart regenerates per this many minutes away from the cap.
pub const HEART_REGEN_MINUTES: i64 = 30;

/// How often the clock re-checks the store.
const CLOCK_TICK: Duration = Duration::from_secs(1);

fn regen_period() -> chrono::Duration {
    chrono::Duration::minutes(HEART_REGEN_MINUTES)
}

impl LearnerState {
    /// Spends a heart. At 0 this is a quiet no-op. Only the transition away
    /// from a full set stamps `last_heart_loss`; losses below the cap keep
    /// the existing stamp so partially elapsed regeneration is not discarded.
    pub(crate) fn lose_heart(&mut self, now: DateTime<Utc>) -> bool {
        if self.hearts == 0 {
            return false;
        }
        if self.hearts == MAX_HEARTS {
            self.last_heart_loss = Some(now);
        }
        self.hearts -= 1;
        true
    }

    /// Regenerates one heart. Reaching the cap clears the stamp; otherwise
    /// the stamp advances by one period (clamped to `now`) so the next heart
    /// is measured from this gain. The clamp keeps stamps out of the future;
    /// the period advance keeps unconsumed elapsed time, which is what lets a
    /// long absence pay out several hearts one at a time.
    pub(crate) fn gain_heart(&mut self, now: DateTime<Utc>) -> bool {
        if self.hearts >= MAX_HEARTS {
            return false;
        }
        self.hearts += 1;
        if self.hearts == MAX_HEARTS {
            self.last_heart_loss = None;
        } else {
            let advanced = match self.last_heart_loss {
                Some(stamp) => (stamp + regen_period()).min(now),
                None => now,
            };
            self.last_heart_loss = Some(advanced);
        }
        true
    }

    /// Whether a regenerated heart is owed at `now`.
    pub fn heart_due(&self, now: DateTime<Utc>) -> bool {
        self.hearts < MAX_HEARTS
            && self
                .last_heart_loss
                .is_some_and(|stamp| now - stamp >= regen_period())
    }

    /// Trades diamonds for hearts. All or nothing: requires the full cost in
    /// diamonds and room below the cap, otherwise nothing is deducted.
    pub(crate) fn purchase_hearts(&mut self, count: u8, cost: u32) -> bool {
        if self.diamonds < cost || self.hearts >= MAX_HEARTS {
            return false;
        }
        self.diamonds -= cost;
        self.hearts = self.hearts.saturating_add(count).min(MAX_HEARTS);
        if self.hearts == MAX_HEARTS {
            self.last_heart_loss = None;
        }
        true
    }

    pub(crate) fn add_diamonds(&mut self, amount: u32) {
        self.diamonds = self.diamonds.saturating_add(amount);
    }
}

/// Background task that converts elapsed wall-clock time into heart gains.
///
/// Polls the shared store every second and grants due hearts one at a time
/// through the normal store operation, so every grant is committed, persisted
/// and announced like any other mutation. Dropping the handle (or calling
/// [`EconomyClock::dispose`]) aborts the task; grants happen synchronously
/// under the store lock, so an abort can never land mid-grant.
pub struct EconomyClock {
    task: tokio::task::JoinHandle<()>,
}

impl EconomyClock {
    pub fn spawn(store: SharedProgressionStore) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLOCK_TICK);
            loop {
                interval.tick().await;
                // If the store is busy this tick, skip it; the next tick
                // re-derives everything from the stamp, so nothing is lost.
                let Ok(mut store) = store.try_lock() else {
                    continue;
                };
                let granted = store.grant_due_hearts(Utc::now());
                if granted > 0 {
                    log::debug!(
                        "Regenerated {granted} heart(s) for learner {}",
                        store.learner_id()
                    );
                }
            }
        });
        Self { task }
    }

    /// Stops the clock. No further gains can come from this instance.
    pub fn dispose(self) {
        self.task.abort();
    }
}

impl Drop for EconomyClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}
