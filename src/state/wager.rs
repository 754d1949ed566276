//! Daily-double wager scratch state.

use crate::{
    dto::{
        common::PlayerId,
        snapshot::{CATEGORY_HEIGHT, Location},
    },
    state::activity::Activity,
};

/// Smallest wager the authority accepts on a daily double.
pub const MIN_DAILY_DOUBLE_WAGER: i64 = 5;

/// Inclusive wager bounds for a player with `score` on a board with `multiplier`.
///
/// The ceiling is the larger of the score and the most valuable square on the board.
pub fn daily_double_bounds(score: i64, multiplier: i64) -> (i64, i64) {
    let max = score.max(CATEGORY_HEIGHT as i64 * multiplier);
    (MIN_DAILY_DOUBLE_WAGER, max.max(MIN_DAILY_DOUBLE_WAGER))
}

/// Pending wager held by the controlling player's surface.
///
/// The value is kept inside the bounds at all times; bounds move whenever a snapshot changes
/// the player's score or the board multiplier. A draft belongs to one daily-double square and is
/// dropped as soon as wagering on that square is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerDraft {
    value: Option<i64>,
    min: i64,
    max: i64,
    square: Option<Location>,
}

impl Default for WagerDraft {
    fn default() -> Self {
        Self {
            value: None,
            min: MIN_DAILY_DOUBLE_WAGER,
            max: MIN_DAILY_DOUBLE_WAGER,
            square: None,
        }
    }
}

impl WagerDraft {
    /// Empty draft with the minimum bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the designated controller may edit while a daily-double wager is open.
    pub fn can_edit(
        activity: Option<Activity>,
        viewer: Option<PlayerId>,
        controller: Option<PlayerId>,
    ) -> bool {
        activity.is_some_and(Activity::is_wagering) && viewer.is_some() && viewer == controller
    }

    /// Follow the square currently open for wagering, `None` outside a daily-double wager.
    ///
    /// Any change of square drops the pending value.
    pub fn track(&mut self, square: Option<Location>) {
        if self.square != square {
            self.value = None;
            self.square = square;
        }
    }

    /// Recompute bounds from the latest snapshot and pull the pending value back into range.
    pub fn rebound(&mut self, score: i64, multiplier: i64) {
        (self.min, self.max) = daily_double_bounds(score, multiplier);
        self.value = self.value.map(|value| value.clamp(self.min, self.max));
    }

    /// Record a user edit, clamped into range.
    pub fn set(&mut self, value: i64) -> i64 {
        let clamped = value.clamp(self.min, self.max);
        self.value = Some(clamped);
        clamped
    }

    /// Pending value; 0 when nothing has been entered.
    pub fn value(&self) -> i64 {
        self.value.unwrap_or(0)
    }

    /// Inclusive `(min, max)` range edits are clamped into.
    pub fn bounds(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    /// Hand out the value to submit and reset the draft to 0.
    pub fn take_submission(&mut self) -> Option<i64> {
        self.value.take()
    }
}
