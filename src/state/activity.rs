use crate::{
    dto::snapshot::RemoteGameState,
    state::{Role, timer::TimerEvent},
};

/// What the moderator may do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeratorActivity {
    /// Free to load boards, pick squares, edit scores.
    Moderate,
    /// A regular square is open; the buzzer is still closed.
    EnableBuzzer,
    /// Buzzer open; waiting for a player.
    WaitForBuzz,
    /// The controller is wagering on a daily double.
    WaitForDailyDoubleWager,
    /// A player is answering and must be judged.
    EvaluateAnswer,
    /// Final round.
    FinalJeopardy,
}

/// What a player (or spectator) may do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerActivity {
    /// Nothing to do.
    Wait,
    /// The buzzer is open.
    Buzz,
    /// A daily double wager is pending.
    DailyDoubleWager,
    /// Someone is answering.
    WaitForEval,
    /// Final round.
    FinalJeopardy,
}

/// Locally derived interaction permission, never stored authoritatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Moderator vocabulary.
    Moderator(ModeratorActivity),
    /// Player vocabulary.
    Player(PlayerActivity),
}

impl Activity {
    /// Map a remote phase onto the viewer's activity. Total over every variant and role.
    pub fn derive(state: &RemoteGameState, role: Role) -> Self {
        match role {
            Role::Moderator => Activity::Moderator(match state {
                RemoteGameState::NoBoard | RemoteGameState::WaitingForSquareSelection { .. } => {
                    ModeratorActivity::Moderate
                }
                RemoteGameState::WaitingForEnableBuzzer { .. } => ModeratorActivity::EnableBuzzer,
                RemoteGameState::WaitingForBuzzer { .. } => ModeratorActivity::WaitForBuzz,
                RemoteGameState::WaitingForDailyDoubleWager { .. } => {
                    ModeratorActivity::WaitForDailyDoubleWager
                }
                RemoteGameState::WaitingForAnswer { .. } => ModeratorActivity::EvaluateAnswer,
                RemoteGameState::FinalJeopardy { .. } => ModeratorActivity::FinalJeopardy,
            }),
            Role::Player => Activity::Player(match state {
                RemoteGameState::NoBoard
                | RemoteGameState::WaitingForSquareSelection { .. }
                | RemoteGameState::WaitingForEnableBuzzer { .. } => PlayerActivity::Wait,
                RemoteGameState::WaitingForBuzzer { .. } => PlayerActivity::Buzz,
                RemoteGameState::WaitingForDailyDoubleWager { .. } => {
                    PlayerActivity::DailyDoubleWager
                }
                RemoteGameState::WaitingForAnswer { .. } => PlayerActivity::WaitForEval,
                RemoteGameState::FinalJeopardy { .. } => PlayerActivity::FinalJeopardy,
            }),
        }
    }

    /// True while an answer is being collected, i.e. while the countdown should run.
    pub fn is_answer_window(self) -> bool {
        matches!(
            self,
            Activity::Moderator(ModeratorActivity::EvaluateAnswer)
                | Activity::Player(PlayerActivity::WaitForEval)
        )
    }

    /// True while a daily double wager is being collected.
    pub fn is_wagering(self) -> bool {
        matches!(
            self,
            Activity::Moderator(ModeratorActivity::WaitForDailyDoubleWager)
                | Activity::Player(PlayerActivity::DailyDoubleWager)
        )
    }
}

/// Edge-triggered timer signal for an activity change.
///
/// Only the (old, new) pair matters: entering an answer window starts the countdown, leaving it
/// stops the countdown, anything else (including re-applying the same activity) is silent.
pub fn timer_edge(old: Option<Activity>, new: Activity) -> Option<TimerEvent> {
    let was_open = old.is_some_and(Activity::is_answer_window);
    match (was_open, new.is_answer_window()) {
        (false, true) => Some(TimerEvent::Start),
        (true, false) => Some(TimerEvent::Stop),
        _ => None,
    }
}
