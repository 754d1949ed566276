//! Role surfaces: the moderator and player control sets.
//!
//! Exactly one surface is mounted per session. Each owns its own countdown, fed by the timer bus
//! of the reconciliation controller, plus whatever scratch state its role needs. Intents are
//! checked against the current activity here; nothing that fails a check reaches the transport.

use tokio::{
    sync::broadcast::{self, error::TryRecvError},
    time::Instant,
};
use tracing::{debug, info};

use crate::{
    config::ClientConfig,
    dto::{
        action::{Action, AnswerType, NewBoardRequest, RevealInfoType},
        common::PlayerId,
        snapshot::{FinalJeopardyInfo, GameSnapshot, Location, SquareState},
    },
    error::IntentError,
    services::{dispatcher::ActionDispatcher, scheduler::TickScheduler},
    state::{
        Activity, ModeratorActivity, PlayerActivity, Role, TimerBus, TimerEvent,
        final_jeopardy::{FinalStage, SelfView, TargetSelection, final_wager_bounds},
        throttle::BuzzerThrottle,
        timer::{Countdown, TickOutcome},
        wager::WagerDraft,
    },
};

/// Borrowed view of the reconciled state handed to a surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceView<'a> {
    /// Last applied snapshot, `None` before the first one arrives.
    pub snapshot: Option<&'a GameSnapshot>,
    /// Activity derived from that snapshot.
    pub activity: Option<Activity>,
    /// Controller as persisted across boardless phases.
    pub controller: Option<PlayerId>,
    /// `None` for spectators.
    pub viewer: Option<PlayerId>,
    /// Joined without credentials.
    pub spectator: bool,
}

impl SurfaceView<'_> {
    fn final_stage(&self) -> Option<FinalStage> {
        self.snapshot.and_then(|s| FinalStage::infer(&s.state))
    }

    fn viewer_score(&self) -> i64 {
        match (self.snapshot, self.viewer) {
            (Some(snapshot), Some(viewer)) => snapshot.score_of(&viewer).unwrap_or(0),
            _ => 0,
        }
    }

    fn viewer_final_info(&self) -> FinalJeopardyInfo {
        self.snapshot
            .zip(self.viewer)
            .and_then(|(s, id)| s.players.get(&id))
            .map(|p| p.final_jeopardy_info.clone())
            .unwrap_or_default()
    }

    fn wager_square(&self) -> Option<Location> {
        if !self.activity.is_some_and(Activity::is_wagering) {
            return None;
        }
        self.snapshot.and_then(|s| s.state.location())
    }

    fn multiplier(&self) -> i64 {
        self.snapshot
            .and_then(|s| s.state.board())
            .map_or(1, |board| board.value_multiplier)
    }
}

/// A user interaction on either surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Open a square on the board.
    SelectSquare(Location),
    /// Let players buzz on the open clue.
    EnableBuzzer,
    /// Judge the current answer (or skip the open square).
    Judge(AnswerType),
    /// Request a fresh board.
    NewBoard(NewBoardRequest),
    /// Move to the final round.
    StartFinalJeopardy {
        /// Seed phrase for the clue draw.
        seed: Option<String>,
    },
    /// Pick which player's final-round submission to work on.
    SelectFinalTarget(PlayerId),
    /// Show the selected player's final wager or answer.
    RevealFinalInfo(RevealInfoType),
    /// Close final-round answer collection.
    LockFinalAnswers,
    /// Show the final-round question.
    RevealFinalQuestion,
    /// Judge the selected player's final answer.
    EvaluateFinal(AnswerType),
    /// Overwrite a player's score.
    ChangeScore {
        /// Player whose score changes.
        target: PlayerId,
        /// Score after the change.
        new_score: i64,
    },
    /// Remove a player from the game.
    Kick(PlayerId),
    /// Finish the game for everyone.
    EndGame,
    /// Try to claim the open clue.
    Buzz,
    /// Type a daily-double wager; the value is clamped locally.
    EditWager(i64),
    /// Send the pending daily-double wager.
    SubmitWager,
    /// Send a final-round wager.
    SubmitFinalWager(i64),
    /// Send a final-round answer.
    SubmitFinalAnswer(String),
    /// Leave the game. Spectators may do this too.
    Leave,
}

impl Intent {
    /// Stable name used in logs and rejections.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::SelectSquare(_) => "select_square",
            Intent::EnableBuzzer => "enable_buzzer",
            Intent::Judge(_) => "answer",
            Intent::NewBoard(_) => "new_board",
            Intent::StartFinalJeopardy { .. } => "start_final_jeopardy",
            Intent::SelectFinalTarget(_) => "select_final_target",
            Intent::RevealFinalInfo(_) => "reveal_final_info",
            Intent::LockFinalAnswers => "lock_final_answers",
            Intent::RevealFinalQuestion => "reveal_final_question",
            Intent::EvaluateFinal(_) => "evaluate_final_answer",
            Intent::ChangeScore { .. } => "change_player_score",
            Intent::Kick(_) => "kick",
            Intent::EndGame => "end_game",
            Intent::Buzz => "buzz",
            Intent::EditWager(_) => "edit_wager",
            Intent::SubmitWager => "submit_wager",
            Intent::SubmitFinalWager(_) => "submit_final_wager",
            Intent::SubmitFinalAnswer(_) => "submit_final_answer",
            Intent::Leave => "leave",
        }
    }
}

/// Shared contract of the two surfaces.
pub trait RoleSurface: Send {
    /// Role this surface serves.
    fn role(&self) -> Role;

    /// Absorb the snapshot just applied: drain countdown edges and refresh local scratch state.
    fn on_snapshot(&mut self, view: &SurfaceView<'_>);

    /// Deliver a scheduled tick. Returns true when the visible countdown changed.
    fn on_tick(&mut self, generation: u64) -> bool;

    /// Check `intent` against the current state and dispatch the matching action.
    fn handle_intent(
        &mut self,
        intent: Intent,
        view: &SurfaceView<'_>,
        dispatcher: &ActionDispatcher,
        now: Instant,
    ) -> Result<(), IntentError>;

    /// Seconds left on this surface's countdown.
    fn remaining(&self) -> u8;

    /// Local state the renderer shows alongside the snapshot.
    fn surface_state(&self, view: &SurfaceView<'_>) -> SurfaceState;

    /// Stop the countdown and cancel any pending tick.
    fn teardown(&mut self);
}

/// Local surface state the renderer shows next to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    /// Moderator scratch state.
    Moderator {
        /// Final-round player the moderator is working on.
        selected_target: Option<PlayerId>,
        /// Whether the evaluation buttons are live.
        evaluation_enabled: bool,
    },
    /// Player scratch state.
    Player {
        /// The viewer controls an open daily-double wager.
        wager_editable: bool,
        /// Clamped pending wager, 0 when nothing is entered.
        pending_wager: i64,
        /// Inclusive daily-double wager range.
        wager_bounds: (i64, i64),
        /// Final-round wager, authoritative first.
        final_wager: Option<i64>,
        /// Final-round answer, authoritative first.
        final_answer: Option<String>,
    },
}

/// Build the surface for `role`.
pub fn mount(
    role: Role,
    bus: &TimerBus,
    scheduler: TickScheduler,
    config: &ClientConfig,
) -> Box<dyn RoleSurface> {
    let timer = TimerSlot::new(bus, scheduler);
    match role {
        Role::Moderator => Box::new(ModeratorSurface::new(timer)),
        Role::Player => Box::new(PlayerSurface::new(timer, config)),
    }
}

/// A surface's countdown together with its tick scheduler and bus subscription.
#[derive(Debug)]
pub struct TimerSlot {
    countdown: Countdown,
    scheduler: TickScheduler,
    events: broadcast::Receiver<TimerEvent>,
}

impl TimerSlot {
    /// Subscribe to `bus`; ticks go through `scheduler`.
    pub fn new(bus: &TimerBus, scheduler: TickScheduler) -> Self {
        Self {
            countdown: Countdown::new(),
            scheduler,
            events: bus.subscribe(),
        }
    }

    /// Apply every edge broadcast since the last drain.
    fn drain(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "timer bus lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn apply(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Start => {
                let generation = self.countdown.start();
                self.scheduler.schedule(generation);
            }
            TimerEvent::Stop => {
                self.countdown.stop();
                self.scheduler.cancel();
            }
        }
    }

    fn tick(&mut self, generation: u64) -> bool {
        match self.countdown.tick(generation) {
            TickOutcome::Stale => false,
            TickOutcome::Continue(next) => {
                self.scheduler.schedule(next);
                true
            }
            TickOutcome::Finished => true,
        }
    }

    fn remaining(&self) -> u8 {
        self.countdown.remaining()
    }

    fn is_idle(&self) -> bool {
        self.countdown.is_idle()
    }

    fn teardown(&mut self) {
        self.countdown.stop();
        self.scheduler.cancel();
    }
}

fn not_permitted(intent: &Intent, activity: Option<Activity>) -> IntentError {
    IntentError::NotPermitted {
        intent: intent.name(),
        activity,
    }
}

/// Moderator control set.
#[derive(Debug)]
pub struct ModeratorSurface {
    timer: TimerSlot,
    target: TargetSelection,
}

impl ModeratorSurface {
    /// Mount with no final-round target selected.
    pub fn new(timer: TimerSlot) -> Self {
        Self {
            timer,
            target: TargetSelection::default(),
        }
    }

    /// Final-round player currently selected.
    pub fn selected_target(&self) -> Option<PlayerId> {
        self.target.selected()
    }

    /// Whether the evaluation controls are live for the selected player.
    pub fn evaluation_enabled(&self, view: &SurfaceView<'_>) -> bool {
        view.snapshot
            .is_some_and(|snapshot| self.target.evaluation_enabled(snapshot))
    }

    fn activity_is(view: &SurfaceView<'_>, wanted: ModeratorActivity) -> bool {
        view.activity == Some(Activity::Moderator(wanted))
    }

    fn require(
        intent: &Intent,
        view: &SurfaceView<'_>,
        allowed: &[ModeratorActivity],
    ) -> Result<(), IntentError> {
        if allowed.iter().any(|a| Self::activity_is(view, *a)) {
            Ok(())
        } else {
            Err(not_permitted(intent, view.activity))
        }
    }

    fn require_stage(
        intent: &Intent,
        view: &SurfaceView<'_>,
        stage: FinalStage,
    ) -> Result<(), IntentError> {
        if view.final_stage() == Some(stage) {
            Ok(())
        } else {
            Err(not_permitted(intent, view.activity))
        }
    }

    fn selected_or_err(&self) -> Result<PlayerId, IntentError> {
        self.target.selected().ok_or(IntentError::NoTarget)
    }
}

impl RoleSurface for ModeratorSurface {
    fn role(&self) -> Role {
        Role::Moderator
    }

    fn on_snapshot(&mut self, _view: &SurfaceView<'_>) {
        self.timer.drain();
        self.target.reset();
    }

    fn on_tick(&mut self, generation: u64) -> bool {
        self.timer.tick(generation)
    }

    fn handle_intent(
        &mut self,
        intent: Intent,
        view: &SurfaceView<'_>,
        dispatcher: &ActionDispatcher,
        _now: Instant,
    ) -> Result<(), IntentError> {
        use ModeratorActivity as M;

        let action = match &intent {
            Intent::SelectSquare(location) => {
                Self::require(&intent, view, &[M::Moderate])?;
                let selectable = view
                    .snapshot
                    .and_then(|s| s.state.board())
                    .and_then(|board| board.square(location))
                    .is_some_and(|square| square.state == SquareState::Normal);
                if !selectable {
                    return Err(IntentError::SquareUnavailable {
                        category: location.category,
                        row: location.row,
                    });
                }
                Action::select_square(*location)
            }
            Intent::EnableBuzzer => {
                Self::require(&intent, view, &[M::EnableBuzzer])?;
                Action::EnableBuzzer
            }
            Intent::Judge(AnswerType::Skip) => {
                Self::require(
                    &intent,
                    view,
                    &[M::EvaluateAnswer, M::WaitForBuzz, M::WaitForDailyDoubleWager],
                )?;
                Action::Answer {
                    answer: AnswerType::Skip,
                }
            }
            Intent::Judge(answer) => {
                Self::require(&intent, view, &[M::EvaluateAnswer])?;
                Action::Answer { answer: *answer }
            }
            Intent::NewBoard(request) => {
                Self::require(&intent, view, &[M::Moderate])?;
                request.check()?;
                Action::NewBoard(request.clone())
            }
            Intent::StartFinalJeopardy { seed } => {
                Self::require(&intent, view, &[M::Moderate])?;
                Action::StartFinalJeopardy { seed: seed.clone() }
            }
            Intent::SelectFinalTarget(player) => {
                Self::require_stage(&intent, view, FinalStage::Locked)?;
                let known = view
                    .snapshot
                    .is_some_and(|s| s.players.contains_key(player));
                if !known {
                    return Err(IntentError::NoTarget);
                }
                self.target.select(*player);
                debug!(player = %player, "final-round target selected");
                return Ok(());
            }
            Intent::RevealFinalQuestion => {
                Self::require_stage(&intent, view, FinalStage::WagerCollection)?;
                Action::RevealFinalJeopardyQuestion
            }
            Intent::LockFinalAnswers => {
                Self::require_stage(&intent, view, FinalStage::AnswerCollection)?;
                Action::LockFinalJeopardyAnswers
            }
            Intent::RevealFinalInfo(info_type) => {
                Self::require_stage(&intent, view, FinalStage::Locked)?;
                Action::RevealFinalJeopardyInfo {
                    target: self.selected_or_err()?,
                    info_type: *info_type,
                }
            }
            Intent::EvaluateFinal(answer) => {
                Self::require_stage(&intent, view, FinalStage::Locked)?;
                let target = self.selected_or_err()?;
                if !self.evaluation_enabled(view) {
                    return Err(IntentError::EvaluationLocked);
                }
                Action::EvaluateFinalJeopardyAnswer {
                    target,
                    answer: *answer,
                }
            }
            Intent::ChangeScore { target, new_score } => Action::ChangePlayerScore {
                target: *target,
                new_score: *new_score,
            },
            Intent::Kick(target) => Action::Leave { target: *target },
            Intent::EndGame => Action::EndGame,
            other => {
                return Err(IntentError::WrongRole {
                    intent: other.name(),
                    role: Role::Moderator.as_str(),
                });
            }
        };

        info!(intent = intent.name(), "moderator intent accepted");
        dispatcher.dispatch(action);
        Ok(())
    }

    fn remaining(&self) -> u8 {
        self.timer.remaining()
    }

    fn surface_state(&self, view: &SurfaceView<'_>) -> SurfaceState {
        SurfaceState::Moderator {
            selected_target: self.selected_target(),
            evaluation_enabled: self.evaluation_enabled(view),
        }
    }

    fn teardown(&mut self) {
        self.timer.teardown();
        self.target.reset();
    }
}

/// Player (and spectator) control set.
#[derive(Debug)]
pub struct PlayerSurface {
    timer: TimerSlot,
    throttle: BuzzerThrottle,
    wager: WagerDraft,
    self_view: SelfView,
}

impl PlayerSurface {
    /// Mount with the configured buzz throttle window.
    pub fn new(timer: TimerSlot, config: &ClientConfig) -> Self {
        Self {
            timer,
            throttle: BuzzerThrottle::new(config.buzz_throttle),
            wager: WagerDraft::new(),
            self_view: SelfView::default(),
        }
    }

    /// Pending daily-double wager; 0 when nothing is entered.
    pub fn pending_wager(&self) -> i64 {
        self.wager.value()
    }

    /// The viewer's final-round wager, authoritative first, pending otherwise.
    pub fn final_wager(&self, view: &SurfaceView<'_>) -> Option<i64> {
        self.self_view.wager(&view.viewer_final_info())
    }

    /// The viewer's final-round answer, authoritative first, pending otherwise.
    pub fn final_answer(&self, view: &SurfaceView<'_>) -> Option<String> {
        self.self_view.answer(&view.viewer_final_info())
    }

    fn require_player(intent: &Intent, view: &SurfaceView<'_>) -> Result<PlayerId, IntentError> {
        match view.viewer {
            Some(viewer) if !view.spectator => Ok(viewer),
            _ => Err(IntentError::Spectator(intent.name())),
        }
    }

    fn require_wager_control(intent: &Intent, view: &SurfaceView<'_>) -> Result<(), IntentError> {
        Self::require_player(intent, view)?;
        if !view.activity.is_some_and(Activity::is_wagering) {
            return Err(not_permitted(intent, view.activity));
        }
        if !WagerDraft::can_edit(view.activity, view.viewer, view.controller) {
            return Err(IntentError::NotController(intent.name()));
        }
        Ok(())
    }

    fn require_final_stage(
        intent: &Intent,
        view: &SurfaceView<'_>,
        stage: FinalStage,
    ) -> Result<(), IntentError> {
        Self::require_player(intent, view)?;
        if view.final_stage() == Some(stage) {
            Ok(())
        } else {
            Err(not_permitted(intent, view.activity))
        }
    }

    fn buzz(&mut self, view: &SurfaceView<'_>, dispatcher: &ActionDispatcher, now: Instant) {
        if self.throttle.is_throttled(now) {
            debug!("buzz ignored: throttled");
            return;
        }
        let open = view.activity == Some(Activity::Player(PlayerActivity::Buzz));
        if open && self.timer.is_idle() {
            self.timer.apply(TimerEvent::Start);
            info!("buzzing in");
            dispatcher.dispatch(Action::Buzz);
        } else {
            debug!(open, "premature buzz; throttling");
            self.throttle.engage(now);
        }
    }
}

impl RoleSurface for PlayerSurface {
    fn role(&self) -> Role {
        Role::Player
    }

    fn on_snapshot(&mut self, view: &SurfaceView<'_>) {
        self.timer.drain();
        self.wager.track(view.wager_square());
        self.wager.rebound(view.viewer_score(), view.multiplier());
        if let Some(player) = view
            .snapshot
            .zip(view.viewer)
            .and_then(|(s, id)| s.players.get(&id))
        {
            self.self_view.reconcile(&player.final_jeopardy_info);
        }
    }

    fn on_tick(&mut self, generation: u64) -> bool {
        self.timer.tick(generation)
    }

    fn handle_intent(
        &mut self,
        intent: Intent,
        view: &SurfaceView<'_>,
        dispatcher: &ActionDispatcher,
        now: Instant,
    ) -> Result<(), IntentError> {
        match &intent {
            Intent::Buzz => {
                Self::require_player(&intent, view)?;
                self.buzz(view, dispatcher, now);
            }
            Intent::EditWager(value) => {
                Self::require_wager_control(&intent, view)?;
                let clamped = self.wager.set(*value);
                debug!(requested = value, clamped, "wager edited");
            }
            Intent::SubmitWager => {
                Self::require_wager_control(&intent, view)?;
                let wager = self.wager.take_submission().ok_or_else(|| {
                    IntentError::InvalidArguments("no wager entered".to_string())
                })?;
                info!(wager, "submitting daily-double wager");
                dispatcher.dispatch(Action::SubmitWager { wager });
            }
            Intent::SubmitFinalWager(wager) => {
                Self::require_final_stage(&intent, view, FinalStage::WagerCollection)?;
                let (min, max) = final_wager_bounds(view.viewer_score());
                if !(min..=max).contains(wager) {
                    return Err(IntentError::WagerOutOfRange {
                        wager: *wager,
                        min,
                        max,
                    });
                }
                self.self_view.record_wager(*wager);
                dispatcher.dispatch(Action::SubmitFinalJeopardyWager { wager: *wager });
            }
            Intent::SubmitFinalAnswer(answer) => {
                Self::require_final_stage(&intent, view, FinalStage::AnswerCollection)?;
                self.self_view.record_answer(answer.clone());
                dispatcher.dispatch(Action::SubmitFinalJeopardyAnswer {
                    answer: answer.clone(),
                });
            }
            Intent::Leave => {
                let target = dispatcher.identity().player_id;
                info!(player = %target, "leaving game");
                dispatcher.dispatch(Action::Leave { target });
            }
            other => {
                return Err(IntentError::WrongRole {
                    intent: other.name(),
                    role: Role::Player.as_str(),
                });
            }
        }
        Ok(())
    }

    fn remaining(&self) -> u8 {
        self.timer.remaining()
    }

    fn surface_state(&self, view: &SurfaceView<'_>) -> SurfaceState {
        SurfaceState::Player {
            wager_editable: !view.spectator
                && WagerDraft::can_edit(view.activity, view.viewer, view.controller),
            pending_wager: self.pending_wager(),
            wager_bounds: self.wager.bounds(),
            final_wager: self.final_wager(view),
            final_answer: self.final_answer(view),
        }
    }

    fn teardown(&mut self) {
        self.timer.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::{
        dto::{
            common::{AuthToken, GameId},
            snapshot::fixtures::{board_json, player_json, snapshot_json},
        },
        services::{reconciliation::ReconciliationController, transport::testing::FakeTransport},
        state::{JoinData, JoinMode, SessionContext},
    };

    struct Harness<S> {
        context: SessionContext,
        transport: FakeTransport,
        dispatcher: ActionDispatcher,
        reconciliation: ReconciliationController,
        surface: S,
        ticks: mpsc::UnboundedReceiver<u64>,
    }

    impl<S: RoleSurface> Harness<S> {
        fn build(
            role: Role,
            mode: JoinMode,
            make: impl FnOnce(TimerSlot, &ClientConfig) -> S,
        ) -> Self {
            let config = Arc::new(ClientConfig::default());
            let context = SessionContext::new(
                JoinData {
                    game_id: GameId(Uuid::new_v4()),
                    role,
                    mode,
                    channel: "jpdy.chan.test".into(),
                },
                Arc::clone(&config),
            );
            let transport = FakeTransport::new();
            let (events, _) = mpsc::unbounded_channel();
            let dispatcher = ActionDispatcher::new(Arc::new(transport.clone()), &context, events);
            let reconciliation = ReconciliationController::new(role);
            let (tick_tx, ticks) = mpsc::unbounded_channel();
            let scheduler = TickScheduler::new(config.tick_interval, tick_tx);
            let surface = make(TimerSlot::new(reconciliation.timer_bus(), scheduler), &config);
            Self {
                context,
                transport,
                dispatcher,
                reconciliation,
                surface,
                ticks,
            }
        }

        fn push(&mut self, state: Value, players: Value) {
            let is_moderator = self.context.role() == Role::Moderator;
            let snapshot =
                serde_json::from_value(snapshot_json(state, players, is_moderator)).unwrap();
            self.reconciliation.apply(snapshot).unwrap();
            let view = self.reconciliation.view(&self.context);
            self.surface.on_snapshot(&view);
        }

        fn intent(&mut self, intent: Intent, now: Instant) -> Result<(), IntentError> {
            let view = self.reconciliation.view(&self.context);
            self.surface
                .handle_intent(intent, &view, &self.dispatcher, now)
        }
    }

    fn authenticated() -> (JoinMode, PlayerId) {
        let id = PlayerId(Uuid::new_v4());
        let mode = JoinMode::Authenticated {
            player_id: id,
            token: AuthToken(Uuid::new_v4()),
        };
        (mode, id)
    }

    fn player() -> (Harness<PlayerSurface>, PlayerId) {
        let (mode, id) = authenticated();
        (Harness::build(Role::Player, mode, PlayerSurface::new), id)
    }

    fn moderator() -> Harness<ModeratorSurface> {
        let (mode, _) = authenticated();
        Harness::build(Role::Moderator, mode, |timer, _| ModeratorSurface::new(timer))
    }

    fn buzzer_open(controller: PlayerId) -> Value {
        json!({
            "type": "WaitingForBuzzer",
            "board": board_json(0, 100),
            "controller": controller,
            "location": { "category": 0, "row": 0 },
        })
    }

    fn daily_double(controller: PlayerId) -> Value {
        daily_double_at(controller, 2)
    }

    fn daily_double_at(controller: PlayerId, row: u8) -> Value {
        json!({
            "type": "WaitingForDailyDoubleWager",
            "board": board_json(0, 200),
            "controller": controller,
            "location": { "category": 0, "row": row },
        })
    }

    fn final_round(revealed: bool, locked: bool) -> Value {
        json!({
            "type": "FinalJeopardy",
            "category": "Volcanoes",
            "air_year": 2010,
            "answers_locked": locked,
            "question_revealed": revealed,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn buzz_then_spam_yields_one_action() {
        let (mut h, me) = player();
        h.push(buzzer_open(me), json!({ me.to_string(): player_json("Me", 0) }));

        let t0 = Instant::now();
        h.intent(Intent::Buzz, t0).unwrap();
        assert_eq!(h.surface.remaining(), 5);
        h.intent(Intent::Buzz, t0 + Duration::from_millis(100)).unwrap();
        h.intent(Intent::Buzz, t0 + Duration::from_millis(600)).unwrap();

        assert_eq!(h.transport.procedures(), vec!["jpdy.buzz"]);
        assert_eq!(h.surface.remaining(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn premature_buzz_throttles_even_after_buzzer_opens() {
        let (mut h, me) = player();
        h.push(json!({ "type": "NoBoard" }), json!({}));

        let t0 = Instant::now();
        h.intent(Intent::Buzz, t0).unwrap();
        h.push(buzzer_open(me), json!({}));
        h.intent(Intent::Buzz, t0 + Duration::from_millis(200)).unwrap();
        assert!(h.transport.calls().is_empty());

        h.intent(Intent::Buzz, t0 + Duration::from_millis(700)).unwrap();
        assert_eq!(h.transport.procedures(), vec!["jpdy.buzz"]);
    }

    #[tokio::test]
    async fn spectator_cannot_buzz_but_can_leave() {
        let mut h = Harness::build(Role::Player, JoinMode::Spectator, PlayerSurface::new);
        h.push(buzzer_open(PlayerId(Uuid::new_v4())), json!({}));
        assert_eq!(
            h.intent(Intent::Buzz, Instant::now()),
            Err(IntentError::Spectator("buzz"))
        );
        h.intent(Intent::Leave, Instant::now()).unwrap();
        assert_eq!(h.transport.procedures(), vec!["jpdy.leave"]);
    }

    #[tokio::test]
    async fn daily_double_wager_is_clamped_and_reset_on_submit() {
        let (mut h, me) = player();
        h.push(daily_double(me), json!({ me.to_string(): player_json("Me", 150) }));

        h.intent(Intent::EditWager(1200), Instant::now()).unwrap();
        assert_eq!(h.surface.pending_wager(), 1000);
        h.intent(Intent::SubmitWager, Instant::now()).unwrap();
        assert_eq!(h.surface.pending_wager(), 0);
        h.intent(Intent::EditWager(2), Instant::now()).unwrap();
        assert_eq!(h.surface.pending_wager(), 5);
        h.intent(Intent::SubmitWager, Instant::now()).unwrap();

        let calls = h.transport.calls();
        assert_eq!(calls[0].kwargs["wager"], 1000);
        assert_eq!(calls[1].kwargs["wager"], 5);
        assert_eq!(
            h.intent(Intent::SubmitWager, Instant::now()),
            Err(IntentError::InvalidArguments("no wager entered".into()))
        );
    }

    #[tokio::test]
    async fn score_change_reclamps_pending_wager() {
        let (mut h, me) = player();
        h.push(daily_double(me), json!({ me.to_string(): player_json("Me", 3000) }));
        h.intent(Intent::EditWager(2500), Instant::now()).unwrap();
        h.push(daily_double(me), json!({ me.to_string(): player_json("Me", 1200) }));
        assert_eq!(h.surface.pending_wager(), 1200);
    }

    #[tokio::test]
    async fn skipped_daily_double_does_not_leak_wager_into_the_next() {
        let (mut h, me) = player();
        let roster = json!({ me.to_string(): player_json("Me", 3000) });
        h.push(daily_double_at(me, 1), roster.clone());
        h.intent(Intent::EditWager(800), Instant::now()).unwrap();
        assert_eq!(h.surface.pending_wager(), 800);

        h.push(
            json!({ "type": "WaitingForSquareSelection", "board": board_json(0, 200), "controller": me }),
            roster.clone(),
        );
        h.push(daily_double_at(me, 3), roster);

        assert_eq!(h.surface.pending_wager(), 0);
        assert_eq!(
            h.intent(Intent::SubmitWager, Instant::now()),
            Err(IntentError::InvalidArguments("no wager entered".into()))
        );
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn surface_state_reports_wager_draft() {
        let (mut h, me) = player();
        h.push(daily_double(me), json!({ me.to_string(): player_json("Me", 150) }));
        h.intent(Intent::EditWager(1200), Instant::now()).unwrap();

        let view = h.reconciliation.view(&h.context);
        assert_eq!(
            h.surface.surface_state(&view),
            SurfaceState::Player {
                wager_editable: true,
                pending_wager: 1000,
                wager_bounds: (5, 1000),
                final_wager: None,
                final_answer: None,
            }
        );

        let mut spectator = Harness::build(Role::Player, JoinMode::Spectator, PlayerSurface::new);
        spectator.push(daily_double(me), json!({}));
        let view = spectator.reconciliation.view(&spectator.context);
        assert!(matches!(
            spectator.surface.surface_state(&view),
            SurfaceState::Player { wager_editable: false, .. }
        ));
    }

    #[tokio::test]
    async fn only_controller_may_wager() {
        let (mut h, me) = player();
        let other = PlayerId(Uuid::new_v4());
        h.push(daily_double(other), json!({ me.to_string(): player_json("Me", 150) }));
        assert_eq!(
            h.intent(Intent::EditWager(100), Instant::now()),
            Err(IntentError::NotController("edit_wager"))
        );
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn final_wager_uses_self_view_until_authority_knows() {
        let (mut h, me) = player();
        h.push(
            final_round(false, false),
            json!({ me.to_string(): player_json("Me", 800) }),
        );
        assert!(matches!(
            h.intent(Intent::SubmitFinalWager(900), Instant::now()),
            Err(IntentError::WagerOutOfRange { max: 800, .. })
        ));
        h.intent(Intent::SubmitFinalWager(600), Instant::now()).unwrap();
        let view = h.reconciliation.view(&h.context);
        assert_eq!(h.surface.final_wager(&view), Some(600));

        let mut me_json = player_json("Me", 800);
        me_json["final_jeopardy_info"] = json!({ "wager": 500 });
        h.push(final_round(false, false), json!({ me.to_string(): me_json }));
        let view = h.reconciliation.view(&h.context);
        assert_eq!(h.surface.final_wager(&view), Some(500));

        assert!(matches!(
            h.intent(Intent::SubmitFinalAnswer("Etna".into()), Instant::now()),
            Err(IntentError::NotPermitted { .. })
        ));
        h.push(final_round(true, false), json!({ me.to_string(): player_json("Me", 800) }));
        h.intent(Intent::SubmitFinalAnswer("Etna".into()), Instant::now())
            .unwrap();
        let view = h.reconciliation.view(&h.context);
        assert_eq!(h.surface.final_answer(&view).as_deref(), Some("Etna"));
    }

    #[tokio::test]
    async fn moderator_evaluation_needs_both_reveals() {
        let mut h = moderator();
        let p = PlayerId(Uuid::new_v4());
        let q = PlayerId(Uuid::new_v4());
        let mut half = player_json("P", 100);
        half["final_jeopardy_info"] = json!({ "wager_revealed": true, "answer_revealed": false });
        let mut full = player_json("P", 100);
        full["final_jeopardy_info"] = json!({ "wager_revealed": true, "answer_revealed": true });

        h.push(
            final_round(true, true),
            json!({ p.to_string(): half.clone(), q.to_string(): half.clone() }),
        );
        h.intent(Intent::SelectFinalTarget(p), Instant::now()).unwrap();
        let view = h.reconciliation.view(&h.context);
        assert!(!h.surface.evaluation_enabled(&view));
        assert_eq!(
            h.intent(Intent::EvaluateFinal(AnswerType::Correct), Instant::now()),
            Err(IntentError::EvaluationLocked)
        );

        h.push(
            final_round(true, true),
            json!({ p.to_string(): full, q.to_string(): half }),
        );
        assert_eq!(h.surface.selected_target(), None);
        assert_eq!(
            h.intent(Intent::EvaluateFinal(AnswerType::Correct), Instant::now()),
            Err(IntentError::NoTarget)
        );
        h.intent(Intent::SelectFinalTarget(p), Instant::now()).unwrap();
        h.intent(Intent::EvaluateFinal(AnswerType::Correct), Instant::now())
            .unwrap();

        h.intent(Intent::SelectFinalTarget(q), Instant::now()).unwrap();
        let view = h.reconciliation.view(&h.context);
        assert!(!h.surface.evaluation_enabled(&view));
        assert_eq!(
            h.intent(Intent::EvaluateFinal(AnswerType::Incorrect), Instant::now()),
            Err(IntentError::EvaluationLocked)
        );

        assert_eq!(
            h.transport.procedures(),
            vec!["jpdy.final_jeopardy.evaluate_answer"]
        );
        assert_eq!(h.transport.calls()[0].kwargs["target"], p.0.to_string());
    }

    #[tokio::test]
    async fn final_round_steps_follow_stage() {
        let mut h = moderator();
        h.push(final_round(false, false), json!({}));
        assert!(matches!(
            h.intent(Intent::LockFinalAnswers, Instant::now()),
            Err(IntentError::NotPermitted { .. })
        ));
        h.intent(Intent::RevealFinalQuestion, Instant::now()).unwrap();
        h.push(final_round(true, false), json!({}));
        h.intent(Intent::LockFinalAnswers, Instant::now()).unwrap();
        h.push(final_round(true, true), json!({}));
        assert_eq!(
            h.intent(Intent::RevealFinalInfo(RevealInfoType::Wager), Instant::now()),
            Err(IntentError::NoTarget)
        );
        assert_eq!(
            h.transport.procedures(),
            vec![
                "jpdy.final_jeopardy.reveal_question",
                "jpdy.final_jeopardy.lock_answers"
            ]
        );
    }

    #[tokio::test]
    async fn moderator_gating_follows_activity() {
        let mut h = moderator();
        let controller = PlayerId(Uuid::new_v4());
        h.push(
            json!({ "type": "WaitingForSquareSelection", "board": board_json(0, 100), "controller": controller }),
            json!({}),
        );
        assert!(matches!(
            h.intent(Intent::EnableBuzzer, Instant::now()),
            Err(IntentError::NotPermitted { .. })
        ));
        h.intent(Intent::SelectSquare(Location::new(2, 3).unwrap()), Instant::now())
            .unwrap();

        h.push(buzzer_open(controller), json!({}));
        assert!(matches!(
            h.intent(Intent::Judge(AnswerType::Correct), Instant::now()),
            Err(IntentError::NotPermitted { .. })
        ));
        h.intent(Intent::Judge(AnswerType::Skip), Instant::now()).unwrap();
        assert!(matches!(
            h.intent(Intent::Buzz, Instant::now()),
            Err(IntentError::WrongRole { .. })
        ));

        assert_eq!(
            h.transport.procedures(),
            vec!["jpdy.select_square", "jpdy.answer"]
        );
        assert_eq!(h.transport.calls()[1].kwargs["answer"], "Skip");
    }

    #[tokio::test]
    async fn finished_square_cannot_be_selected() {
        let mut h = moderator();
        let mut board = board_json(0, 100);
        board["categories"][1]["squares"][0]["state"] = json!("Finished");
        h.push(
            json!({ "type": "WaitingForSquareSelection", "board": board }),
            json!({}),
        );
        assert_eq!(
            h.intent(Intent::SelectSquare(Location::new(1, 0).unwrap()), Instant::now()),
            Err(IntentError::SquareUnavailable { category: 1, row: 0 })
        );
    }

    #[tokio::test]
    async fn invalid_new_board_is_rejected_locally() {
        let mut h = moderator();
        h.push(json!({ "type": "NoBoard" }), json!({}));
        let mut request = NewBoardRequest::standard(100);
        request.seed = Some("Not A Seed".into());
        assert!(matches!(
            h.intent(Intent::NewBoard(request), Instant::now()),
            Err(IntentError::InvalidArguments(_))
        ));
        h.intent(Intent::NewBoard(NewBoardRequest::standard(100)), Instant::now())
            .unwrap();
        assert_eq!(h.transport.procedures(), vec!["jpdy.new_board"]);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_to_zero_and_stop_cancels() {
        let (mut h, me) = player();
        let answering = json!({
            "type": "WaitingForAnswer",
            "board": board_json(0, 100),
            "controller": me,
            "location": { "category": 0, "row": 0 },
            "active_player": me,
        });
        h.push(answering.clone(), json!({}));
        assert_eq!(h.surface.remaining(), 5);

        for expected in [4, 3, 2, 1, 0] {
            let generation = h.ticks.recv().await.unwrap();
            assert!(h.surface.on_tick(generation));
            assert_eq!(h.surface.remaining(), expected);
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(h.ticks.try_recv().is_err());

        h.push(json!({ "type": "NoBoard" }), json!({}));
        h.push(answering, json!({}));
        assert_eq!(h.surface.remaining(), 5);
        h.push(json!({ "type": "NoBoard" }), json!({}));
        assert_eq!(h.surface.remaining(), 0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(h.ticks.try_recv().is_err());
    }
}
