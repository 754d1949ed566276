//! Final-round sub-flow: stage inference, the moderator's target selection and the player's
//! optimistic self-view.

use crate::dto::{
    common::PlayerId,
    snapshot::{FinalJeopardyInfo, GameSnapshot, RemoteGameState},
};

/// Final-round sub-phase, inferred from the snapshot flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStage {
    /// Question hidden; players wager.
    WagerCollection,
    /// Question shown; players answer.
    AnswerCollection,
    /// Answers locked; the moderator reveals and evaluates one player at a time.
    Locked,
}

impl FinalStage {
    /// `None` outside the final round.
    pub fn infer(state: &RemoteGameState) -> Option<Self> {
        match state {
            RemoteGameState::FinalJeopardy {
                answers_locked: true,
                ..
            } => Some(FinalStage::Locked),
            RemoteGameState::FinalJeopardy {
                question_revealed: true,
                ..
            } => Some(FinalStage::AnswerCollection),
            RemoteGameState::FinalJeopardy { .. } => Some(FinalStage::WagerCollection),
            _ => None,
        }
    }
}

/// Inclusive final-round wager bounds; a player in the red may only wager nothing.
pub fn final_wager_bounds(score: i64) -> (i64, i64) {
    (0, score.max(0))
}

/// Player the moderator is currently revealing/evaluating. Local only; cleared on every snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TargetSelection {
    selected: Option<PlayerId>,
}

impl TargetSelection {
    /// Make `player` the target.
    pub fn select(&mut self, player: PlayerId) {
        self.selected = Some(player);
    }

    /// Clear the target.
    pub fn reset(&mut self) {
        self.selected = None;
    }

    /// Current target, if any.
    pub fn selected(&self) -> Option<PlayerId> {
        self.selected
    }

    /// Evaluation opens once both the wager and the answer of the target are revealed.
    pub fn evaluation_enabled(&self, snapshot: &GameSnapshot) -> bool {
        self.selected
            .and_then(|id| snapshot.players.get(&id))
            .is_some_and(|player| {
                let info = &player.final_jeopardy_info;
                info.is_wager_revealed() && info.is_answer_revealed()
            })
    }
}

/// The viewer's own submissions, shown until the authority reports them.
///
/// Reads are two-layered: a defined authoritative value always wins, the pending value only fills
/// in while the authority's field is still unknown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelfView {
    pending_wager: Option<i64>,
    pending_answer: Option<String>,
}

impl SelfView {
    /// Remember a wager just submitted.
    pub fn record_wager(&mut self, wager: i64) {
        self.pending_wager = Some(wager);
    }

    /// Remember an answer just submitted.
    pub fn record_answer(&mut self, answer: impl Into<String>) {
        self.pending_answer = Some(answer.into());
    }

    /// Drop pending values the authority now defines.
    pub fn reconcile(&mut self, authority: &FinalJeopardyInfo) {
        if authority.wager.is_some() {
            self.pending_wager = None;
        }
        if authority.answer.is_some() {
            self.pending_answer = None;
        }
    }

    /// Wager to display: the authority's when defined, else the pending one.
    pub fn wager(&self, authority: &FinalJeopardyInfo) -> Option<i64> {
        match authority.wager {
            Some(known) => known,
            None => self.pending_wager,
        }
    }

    /// Answer to display, read the same way as [`SelfView::wager`].
    pub fn answer(&self, authority: &FinalJeopardyInfo) -> Option<String> {
        match &authority.answer {
            Some(known) => known.clone(),
            None => self.pending_answer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::dto::snapshot::fixtures::{player_json, snapshot_json};

    fn final_state(revealed: bool, locked: bool) -> serde_json::Value {
        json!({
            "type": "FinalJeopardy",
            "category": "Islands",
            "air_year": 2004,
            "answers_locked": locked,
            "question_revealed": revealed,
        })
    }

    fn snapshot_with(players: &[(Uuid, serde_json::Value)]) -> GameSnapshot {
        let mut roster = serde_json::Map::new();
        for (id, info) in players {
            let mut player = player_json("P", 1000);
            player["final_jeopardy_info"] = info.clone();
            roster.insert(id.to_string(), player);
        }
        serde_json::from_value(snapshot_json(final_state(true, true), roster.into(), true))
            .unwrap()
    }

    #[test]
    fn stage_follows_flags() {
        let decode = |v| serde_json::from_value::<RemoteGameState>(v).unwrap();
        assert_eq!(
            FinalStage::infer(&decode(final_state(false, false))),
            Some(FinalStage::WagerCollection)
        );
        assert_eq!(
            FinalStage::infer(&decode(final_state(true, false))),
            Some(FinalStage::AnswerCollection)
        );
        assert_eq!(
            FinalStage::infer(&decode(final_state(true, true))),
            Some(FinalStage::Locked)
        );
        assert_eq!(FinalStage::infer(&RemoteGameState::NoBoard), None);
    }

    #[test]
    fn evaluation_waits_for_both_reveals_of_selected_player() {
        let p = Uuid::new_v4();
        let q = Uuid::new_v4();
        let revealed = json!({ "wager": 100, "wager_revealed": true, "answer": "Malta", "answer_revealed": true });
        let half = json!({ "wager": 100, "wager_revealed": true, "answer_revealed": false });

        let mut selection = TargetSelection::default();
        let before = snapshot_with(&[(p, half.clone()), (q, half.clone())]);
        selection.select(PlayerId(p));
        assert!(!selection.evaluation_enabled(&before));

        let after = snapshot_with(&[(p, revealed.clone()), (q, half)]);
        assert!(selection.evaluation_enabled(&after));

        selection.reset();
        selection.select(PlayerId(q));
        assert!(!selection.evaluation_enabled(&after));

        let both = snapshot_with(&[(p, revealed.clone()), (q, revealed)]);
        assert!(selection.evaluation_enabled(&both));
    }

    #[test]
    fn nothing_selected_means_evaluation_disabled() {
        let snapshot = snapshot_with(&[]);
        assert!(!TargetSelection::default().evaluation_enabled(&snapshot));
    }

    #[test]
    fn self_view_defers_to_authority_once_defined() {
        let mut view = SelfView::default();
        view.record_wager(400);
        view.record_answer("Crete");

        let unknown = FinalJeopardyInfo::default();
        view.reconcile(&unknown);
        assert_eq!(view.wager(&unknown), Some(400));
        assert_eq!(view.answer(&unknown).as_deref(), Some("Crete"));

        let known: FinalJeopardyInfo =
            serde_json::from_value(json!({ "wager": 350, "answer": null })).unwrap();
        assert_eq!(view.wager(&known), Some(350));
        assert_eq!(view.answer(&known), None);
        view.reconcile(&known);
        assert_eq!(view.wager(&unknown), None);
    }

    #[test]
    fn final_wager_cannot_exceed_positive_score() {
        assert_eq!(final_wager_bounds(1200), (0, 1200));
        assert_eq!(final_wager_bounds(-300), (0, 0));
    }
}
