//! Inbound snapshot shapes pushed by the game authority.
//!
//! A snapshot is always a complete replacement of everything previously known; nothing in here is
//! ever patched in place.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::dto::common::PlayerId;

/// Number of categories on every board.
pub const BOARD_CATEGORIES: usize = 6;
/// Number of squares in every category column.
pub const CATEGORY_HEIGHT: usize = 5;

/// Wrapper used both by pushed messages and by the initial `game_state` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEnvelope {
    /// The wrapped snapshot.
    pub state: GameSnapshot,
}

/// Complete description of the game as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameSnapshot {
    /// Set once the authority ends the game.
    pub is_ended: bool,
    /// Roster in authority order.
    #[serde(default)]
    pub players: IndexMap<PlayerId, Player>,
    /// Current phase.
    pub state: RemoteGameState,
    /// Whether this payload was rendered for the moderator.
    pub is_moderator: bool,
    /// Display name of the moderator.
    #[serde(default)]
    pub moderator_name: String,
    /// Earliest air year in the clue set.
    #[serde(default)]
    pub min_year: Option<u16>,
    /// Latest air year in the clue set.
    #[serde(default)]
    pub max_year: Option<u16>,
}

impl GameSnapshot {
    /// Reject payloads whose board does not have the fixed 6x5 shape.
    pub fn check_shape(&self) -> Result<(), String> {
        let Some(board) = self.state.board() else {
            return Ok(());
        };
        if board.categories.len() != BOARD_CATEGORIES {
            return Err(format!(
                "board {} has {} categories, expected {BOARD_CATEGORIES}",
                board.id,
                board.categories.len()
            ));
        }
        if board.id < 0 {
            return Err(format!("board id {} collides with the placeholder id", board.id));
        }
        Ok(())
    }

    /// Score of `player`, if they are on the roster.
    pub fn score_of(&self, player: &PlayerId) -> Option<i64> {
        self.players.get(player).map(|p| p.score)
    }
}

/// Current game phase and its payload, one active variant at a time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteGameState {
    /// No board yet, or the previous one is exhausted.
    NoBoard,
    /// The controller picks the next square.
    WaitingForSquareSelection {
        /// Current board.
        board: Box<Board>,
        /// Player picking; absent before anyone has control.
        #[serde(default)]
        controller: Option<PlayerId>,
    },
    /// A daily double was found; its finder wagers.
    WaitingForDailyDoubleWager {
        /// Current board.
        board: Box<Board>,
        /// Player who found the daily double.
        controller: PlayerId,
        /// The daily-double square.
        location: Location,
    },
    /// Clue shown; the moderator has not opened the buzzers yet.
    WaitingForEnableBuzzer {
        /// Current board.
        board: Box<Board>,
        /// Player who picked the square.
        controller: PlayerId,
        /// Square in play.
        location: Location,
    },
    /// Buzzers are open.
    WaitingForBuzzer {
        /// Current board.
        board: Box<Board>,
        /// Player who picked the square.
        controller: PlayerId,
        /// Square in play.
        location: Location,
    },
    /// A player is answering.
    WaitingForAnswer {
        /// Current board.
        board: Box<Board>,
        /// Player who picked the square.
        controller: PlayerId,
        /// Square in play.
        location: Location,
        /// Player who won the buzz (or the daily-double finder).
        active_player: PlayerId,
    },
    /// Final round; the sub-stage follows from the two flags.
    FinalJeopardy {
        /// Category announced before wagering.
        category: String,
        /// Air year of the final clue.
        air_year: u16,
        /// No more answers accepted.
        answers_locked: bool,
        /// Clue visible to players.
        question_revealed: bool,
        /// The clue, once revealed (always for the moderator).
        #[serde(default)]
        question: Option<Clue>,
        /// Expected answer; moderator payload only.
        #[serde(default)]
        answer: Option<String>,
    },
}

/// Board coordinates; both axes are zero-based.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    /// Column, `0..6`.
    pub category: usize,
    /// Row, `0..5`; also the value step.
    pub row: usize,
}

impl Location {
    /// Build a location, rejecting coordinates outside the board.
    pub fn new(category: usize, row: usize) -> Option<Self> {
        (category < BOARD_CATEGORIES && row < CATEGORY_HEIGHT).then_some(Self { category, row })
    }
}

/// One 6x5 board.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Board {
    /// Columns left to right.
    pub categories: Vec<Category>,
    /// Base values are 1, 2, 3, ... going down a column.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub value_multiplier: i64,
    /// Stable per-game board counter.
    pub id: i64,
    /// Bumped by the authority whenever anything on the board changes.
    #[serde(default)]
    pub etag: u64,
    /// Seed the clues were drawn with.
    #[serde(default)]
    pub seed: String,
}

impl Board {
    /// Square at `location`, if it is on the board.
    pub fn square(&self, location: &Location) -> Option<&Square> {
        self.categories
            .get(location.category)?
            .squares
            .get(location.row)
    }

    /// Points awarded for `location`.
    pub fn square_value(&self, location: &Location) -> i64 {
        self.value_multiplier * (1 + location.row as i64)
    }
}

/// A board column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    /// Column heading.
    pub title: String,
    /// Year the category aired.
    #[serde(default)]
    pub air_year: u16,
    /// Host remark read with the heading.
    #[serde(default)]
    pub commentary: Option<String>,
    /// Squares top to bottom.
    pub squares: [Square; CATEGORY_HEIGHT],
}

/// One clue slot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Square {
    /// Lifecycle position.
    pub state: SquareState,
    /// Hidden until the square is flipped.
    #[serde(default)]
    pub clue: Option<Clue>,
    /// Only present in the moderator's payload (or once the square is finished).
    #[serde(default)]
    pub answer: Option<String>,
    /// Withheld from non-controllers until revealed.
    #[serde(default)]
    pub is_daily_double: Option<bool>,
}

/// Where a square is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SquareState {
    /// Face down and selectable.
    Normal,
    /// Selected and revealed as a daily double; clue still hidden.
    DailyDoubleRevealed,
    /// Clue showing.
    Flipped,
    /// Played out.
    Finished,
}

/// Clue content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Clue {
    /// Clue text.
    #[serde(default)]
    pub text: Option<String>,
    /// Media link shown with the clue.
    #[serde(default)]
    pub link: Option<String>,
}

/// Roster entry.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Player {
    /// Display name.
    pub name: String,
    /// May go negative.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub score: i64,
    /// Avatar image; empty when unset.
    #[serde(default)]
    pub avatar_url: String,
    /// Final-round disclosure as visible to this viewer.
    #[serde(default)]
    pub final_jeopardy_info: FinalJeopardyInfo,
}

/// Final-round disclosure for one player.
///
/// Outer `None` means the field is unknown to this viewer, `Some(None)` means it is known to be
/// absent and `Some(Some(v))` means it is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FinalJeopardyInfo {
    /// Final-round wager.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub wager: Option<Option<i64>>,
    /// Whether the moderator showed the wager.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub wager_revealed: Option<Option<bool>>,
    /// Final-round answer.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub answer: Option<Option<String>>,
    /// Whether the moderator showed the answer.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub answer_revealed: Option<Option<bool>>,
}

impl FinalJeopardyInfo {
    /// True only when the authority says the wager is shown.
    pub fn is_wager_revealed(&self) -> bool {
        matches!(self.wager_revealed, Some(Some(true)))
    }

    /// True only when the authority says the answer is shown.
    pub fn is_answer_revealed(&self) -> bool {
        matches!(self.answer_revealed, Some(Some(true)))
    }
}
