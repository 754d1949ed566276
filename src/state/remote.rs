//! Read-only projections over [`RemoteGameState`].

use crate::dto::{
    common::PlayerId,
    snapshot::{BOARD_CATEGORIES, Board, Category, Location, RemoteGameState, Square, SquareState},
};

/// Id carried by the placeholder board shown before any board exists.
pub const PLACEHOLDER_BOARD_ID: i64 = -1;

impl RemoteGameState {
    /// Board of every board-carrying variant.
    pub fn board(&self) -> Option<&Board> {
        match self {
            RemoteGameState::WaitingForSquareSelection { board, .. }
            | RemoteGameState::WaitingForDailyDoubleWager { board, .. }
            | RemoteGameState::WaitingForEnableBuzzer { board, .. }
            | RemoteGameState::WaitingForBuzzer { board, .. }
            | RemoteGameState::WaitingForAnswer { board, .. } => Some(board.as_ref()),
            RemoteGameState::NoBoard | RemoteGameState::FinalJeopardy { .. } => None,
        }
    }

    /// Square currently in play, if any.
    pub fn location(&self) -> Option<Location> {
        match self {
            RemoteGameState::WaitingForDailyDoubleWager { location, .. }
            | RemoteGameState::WaitingForEnableBuzzer { location, .. }
            | RemoteGameState::WaitingForBuzzer { location, .. }
            | RemoteGameState::WaitingForAnswer { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// Controlling player after this snapshot.
    ///
    /// Variants that carry no controller field keep `previous`; a square selection with an empty
    /// controller clears it.
    pub fn controller(&self, previous: Option<PlayerId>) -> Option<PlayerId> {
        match self {
            RemoteGameState::NoBoard | RemoteGameState::FinalJeopardy { .. } => previous,
            RemoteGameState::WaitingForSquareSelection { controller, .. } => *controller,
            RemoteGameState::WaitingForDailyDoubleWager { controller, .. }
            | RemoteGameState::WaitingForEnableBuzzer { controller, .. }
            | RemoteGameState::WaitingForBuzzer { controller, .. }
            | RemoteGameState::WaitingForAnswer { controller, .. } => Some(*controller),
        }
    }

    /// Player currently answering.
    pub fn active_player(&self) -> Option<PlayerId> {
        match self {
            RemoteGameState::WaitingForAnswer { active_player, .. } => Some(*active_player),
            _ => None,
        }
    }

    /// The real board, or an empty 6x5 stand-in when none is loaded.
    pub fn board_or_placeholder(&self) -> Board {
        self.board().cloned().unwrap_or_else(placeholder_board)
    }
}

fn placeholder_board() -> Board {
    let category = Category {
        title: String::new(),
        air_year: 0,
        commentary: None,
        squares: std::array::from_fn(|_| Square {
            state: SquareState::Normal,
            clue: None,
            answer: None,
            is_daily_double: None,
        }),
    };
    Board {
        categories: vec![category; BOARD_CATEGORIES],
        value_multiplier: 1,
        id: PLACEHOLDER_BOARD_ID,
        etag: 0,
        seed: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::dto::snapshot::{CATEGORY_HEIGHT, fixtures::board_json};

    fn decode(value: serde_json::Value) -> RemoteGameState {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn controller_survives_variants_without_one() {
        let previous = Some(PlayerId(Uuid::new_v4()));
        assert_eq!(decode(json!({ "type": "NoBoard" })).controller(previous), previous);
        let final_round = decode(json!({
            "type": "FinalJeopardy",
            "category": "Opera",
            "air_year": 1995,
            "answers_locked": false,
            "question_revealed": false,
        }));
        assert_eq!(final_round.controller(previous), previous);
    }

    #[test]
    fn empty_controller_on_selection_clears_it() {
        let previous = Some(PlayerId(Uuid::new_v4()));
        let state = decode(json!({ "type": "WaitingForSquareSelection", "board": board_json(1, 100) }));
        assert_eq!(state.controller(previous), None);
    }

    #[test]
    fn placeholder_has_full_shape_and_sentinel_id() {
        let board = RemoteGameState::NoBoard.board_or_placeholder();
        assert_eq!(board.id, PLACEHOLDER_BOARD_ID);
        assert_eq!(board.categories.len(), BOARD_CATEGORIES);
        assert!(board.categories.iter().all(|c| c.squares.len() == CATEGORY_HEIGHT
            && c.squares.iter().all(|s| s.state == SquareState::Normal)));
    }

    #[test]
    fn active_player_only_while_answering() {
        let player = Uuid::new_v4();
        let answering = decode(json!({
            "type": "WaitingForAnswer",
            "board": board_json(1, 100),
            "controller": player,
            "location": { "category": 2, "row": 3 },
            "active_player": player,
        }));
        assert_eq!(answering.active_player(), Some(PlayerId(player)));
        assert_eq!(answering.location(), Location::new(2, 3));
        assert_eq!(RemoteGameState::NoBoard.active_player(), None);
    }
}
