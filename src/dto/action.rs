//! Outbound actions and the argument maps they are sent with.

use serde::Serialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::dto::{
    common::{Identity, PlayerId},
    snapshot::{BOARD_CATEGORIES, CATEGORY_HEIGHT, Location},
    validation::validate_seed_phrase,
};

/// Moderator verdict on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerType {
    /// Award the square value.
    Correct,
    /// Deduct the square value.
    Incorrect,
    /// No score change; the square is closed.
    Skip,
}

/// Which part of a player's final-round submission to reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RevealInfoType {
    /// The player's final-round wager.
    Wager,
    /// The player's final-round answer.
    Answer,
}

/// Arguments of the `new_board` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct NewBoardRequest {
    /// Reproducible clue selection; random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_seed_phrase"))]
    pub seed: Option<String>,
    /// Value of a first-row square.
    #[validate(range(min = 1))]
    pub multiplier: i64,
    /// Daily doubles hidden on the board.
    #[validate(range(max = 30))]
    pub daily_doubles: usize,
    /// Categories drawn for the board.
    #[validate(range(min = 1, max = 6))]
    pub categories: usize,
}

impl NewBoardRequest {
    /// Standard first-round board.
    pub fn standard(multiplier: i64) -> Self {
        Self {
            seed: None,
            multiplier,
            daily_doubles: 1,
            categories: BOARD_CATEGORIES,
        }
    }

    /// Reject requests asking for more daily doubles than the board has squares.
    pub fn check(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        if self.daily_doubles > self.categories * CATEGORY_HEIGHT {
            let mut errors = validator::ValidationErrors::new();
            let mut err = validator::ValidationError::new("too_many_daily_doubles");
            err.message = Some(
                format!(
                    "{} daily doubles do not fit on {} categories",
                    self.daily_doubles, self.categories
                )
                .into(),
            );
            errors.add("daily_doubles", err);
            return Err(errors);
        }
        Ok(())
    }
}

/// Every call the client can issue once joined. Identity is added at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Action {
    /// Open a square.
    SelectSquare {
        /// Column, zero-based.
        category: usize,
        /// Row, zero-based.
        row: usize,
    },
    /// Daily-double wager of the controlling player.
    SubmitWager {
        /// Amount, already clamped.
        wager: i64,
    },
    /// Verdict on the current answer.
    Answer {
        /// Correct, incorrect or skip.
        answer: AnswerType,
    },
    /// Claim the right to answer.
    Buzz,
    /// Open the buzzers once the clue has been read.
    EnableBuzzer,
    /// Replace the board.
    NewBoard(NewBoardRequest),
    /// Enter the final round.
    StartFinalJeopardy {
        /// Seed for the final clue.
        #[serde(skip_serializing_if = "Option::is_none")]
        seed: Option<String>,
    },
    /// Show one part of a player's final-round submission.
    RevealFinalJeopardyInfo {
        /// Player whose submission is shown.
        target: PlayerId,
        /// Wager or answer.
        info_type: RevealInfoType,
    },
    /// Stop accepting final-round answers.
    LockFinalJeopardyAnswers,
    /// Show the final-round clue.
    RevealFinalJeopardyQuestion,
    /// Judge a player's final-round answer.
    EvaluateFinalJeopardyAnswer {
        /// Player being judged.
        target: PlayerId,
        /// Verdict.
        answer: AnswerType,
    },
    /// The viewer's final-round wager.
    SubmitFinalJeopardyWager {
        /// Amount within `0..=max(score, 0)`.
        wager: i64,
    },
    /// The viewer's final-round answer.
    SubmitFinalJeopardyAnswer {
        /// Free text.
        answer: String,
    },
    /// Overwrite a player's score.
    ChangePlayerScore {
        /// Player whose score changes.
        target: PlayerId,
        /// Replacement score.
        new_score: i64,
    },
    /// Remove a player; players leave by targeting themselves.
    Leave {
        /// Player leaving the game.
        target: PlayerId,
    },
    /// Finish the game for everyone.
    EndGame,
}

impl Action {
    /// `select_square` for `location`.
    pub fn select_square(location: Location) -> Self {
        Action::SelectSquare {
            category: location.category,
            row: location.row,
        }
    }

    /// Procedure name without the namespace prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectSquare { .. } => "select_square",
            Action::SubmitWager { .. } => "submit_wager",
            Action::Answer { .. } => "answer",
            Action::Buzz => "buzz",
            Action::EnableBuzzer => "enable_buzzer",
            Action::NewBoard(_) => "new_board",
            Action::StartFinalJeopardy { .. } => "final_jeopardy.start",
            Action::RevealFinalJeopardyInfo { .. } => "final_jeopardy.reveal_info",
            Action::LockFinalJeopardyAnswers => "final_jeopardy.lock_answers",
            Action::RevealFinalJeopardyQuestion => "final_jeopardy.reveal_question",
            Action::EvaluateFinalJeopardyAnswer { .. } => "final_jeopardy.evaluate_answer",
            Action::SubmitFinalJeopardyWager { .. } => "final_jeopardy.submit_wager",
            Action::SubmitFinalJeopardyAnswer { .. } => "final_jeopardy.submit_answer",
            Action::ChangePlayerScore { .. } => "change_player_score",
            Action::Leave { .. } => "leave",
            Action::EndGame => "end_game",
        }
    }

    /// Build the keyword arguments for this action, identity first.
    pub fn to_kwargs(&self, identity: &Identity) -> serde_json::Result<Map<String, Value>> {
        let mut kwargs = identity_kwargs(identity)?;
        if let Value::Object(args) = serde_json::to_value(self)? {
            kwargs.extend(args);
        }
        Ok(kwargs)
    }
}

/// Identity-only argument map, used for actions with no payload and for the state request.
pub fn identity_kwargs(identity: &Identity) -> serde_json::Result<Map<String, Value>> {
    match serde_json::to_value(identity)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "identity encoded as {other}, expected an object"
        ))),
    }
}

/// A fully-built outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCall {
    /// Full procedure name, prefix included.
    pub procedure: String,
    /// Keyword arguments, identity included.
    pub kwargs: Map<String, Value>,
}
