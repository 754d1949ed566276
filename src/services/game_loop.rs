//! Session driver: join, the single-threaded event loop, teardown.
//!
//! Three sources feed the loop: snapshots (pushed, or the answer to the initial state request),
//! countdown ticks and user intents. They are handled one at a time, in arrival order.

use std::sync::Arc;

use serde_json::Value;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, timeout},
};
use tracing::{debug, error, info, warn};

use crate::{
    dto::{action::identity_kwargs, snapshot::SnapshotEnvelope},
    error::{ClientError, Notice, TransportError},
    services::{
        dispatcher::ActionDispatcher,
        events::{ClientEvent, EventSender, emit},
        reconciliation::{ReconciliationController, SnapshotOutcome},
        scheduler::TickScheduler,
        session_store::SessionStore,
        surface::{Intent, RoleSurface, mount},
        transport::{PushSink, SubscriptionHandle, Transport},
    },
    state::SessionContext,
};

/// Procedure returning the current snapshot for the caller's identity.
const GAME_STATE_PROCEDURE: &str = "game_state";

/// Why a session stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The authority ended the game.
    Ended,
    /// The viewer left.
    Left,
    /// The intent channel was dropped by the embedding application.
    Detached,
    /// The transport closed the push feed.
    Disconnected,
}

/// One joined game, from initial fetch to teardown.
pub struct GameLoop {
    transport: Arc<dyn Transport>,
    context: SessionContext,
    store: SessionStore,
    events: EventSender,
}

impl GameLoop {
    /// Prepare a session; nothing is fetched or subscribed until [`GameLoop::run`].
    pub fn new(
        transport: Arc<dyn Transport>,
        context: SessionContext,
        store: SessionStore,
        events: EventSender,
    ) -> Self {
        Self {
            transport,
            context,
            store,
            events,
        }
    }

    /// Join the game and process events until the session ends.
    ///
    /// The initial state request and the subscription run concurrently and deliver into the same
    /// feed, so whichever snapshot is delivered last is the one left applied.
    pub async fn run(
        self,
        mut intents: mpsc::UnboundedReceiver<Intent>,
    ) -> Result<SessionExit, ClientError> {
        let join = &self.context.join;
        info!(game_id = %join.game_id, role = join.role.as_str(), "joining game");

        let (feed_tx, mut feed) = mpsc::unbounded_channel();
        let mut fetch = match self.spawn_fetch(feed_tx.clone()) {
            Ok(fetch) => fetch,
            Err(err) => return Err(self.fail_setup(err).await),
        };

        let subscribe = self.transport.subscribe(join.channel.clone(), feed_tx);
        let subscription = match timeout(self.context.config.call_timeout, subscribe).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(err)) => {
                fetch.abort();
                return Err(self.fail_setup(err).await);
            }
            Err(_) => {
                fetch.abort();
                return Err(self.fail_setup(TransportError::Timeout).await);
            }
        };
        debug!(channel = %subscription.channel, "subscribed");

        let dispatcher =
            ActionDispatcher::new(Arc::clone(&self.transport), &self.context, self.events.clone());
        let mut reconciliation = ReconciliationController::new(self.context.role());
        let (tick_tx, mut ticks) = mpsc::unbounded_channel();
        let scheduler = TickScheduler::new(self.context.config.tick_interval, tick_tx);
        let mut surface = mount(
            self.context.role(),
            reconciliation.timer_bus(),
            scheduler,
            &self.context.config,
        );
        debug!(role = surface.role().as_str(), "surface mounted");

        let mut fetch_done = false;
        let outcome = loop {
            tokio::select! {
                joined = &mut fetch, if !fetch_done => {
                    fetch_done = true;
                    match joined {
                        Ok(Ok(())) => debug!("initial state received"),
                        Ok(Err(err)) => break Err(ClientError::Setup(err)),
                        Err(join_err) => {
                            warn!(error = %join_err, "initial state request aborted");
                            break Err(ClientError::Setup(TransportError::Closed));
                        }
                    }
                }
                payload = feed.recv() => {
                    let Some(payload) = payload else {
                        warn!("push feed closed by transport");
                        break Ok(SessionExit::Disconnected);
                    };
                    match self.absorb(payload, &mut reconciliation, surface.as_mut()) {
                        Ok(Some(exit)) => break Ok(exit),
                        Ok(None) => {}
                        Err(err) => break Err(err),
                    }
                }
                Some(generation) = ticks.recv() => {
                    if surface.on_tick(generation) {
                        emit(&self.events, ClientEvent::Countdown(surface.remaining()));
                    }
                }
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        debug!("intent channel closed");
                        break Ok(SessionExit::Detached);
                    };
                    if self.handle_intent(intent, &reconciliation, surface.as_mut(), &dispatcher) {
                        break Ok(SessionExit::Left);
                    }
                }
            }
        };

        surface.teardown();
        if !fetch_done {
            fetch.abort();
        }
        self.unsubscribe(subscription).await;

        match outcome {
            Ok(exit) => {
                info!(?exit, "session finished");
                if matches!(exit, SessionExit::Ended | SessionExit::Left) {
                    self.forget_join().await;
                }
                Ok(exit)
            }
            Err(ClientError::Setup(err)) => Err(self.fail_setup(err).await),
            Err(err) => {
                error!(error = %err, "session aborted");
                emit(&self.events, ClientEvent::Notice(Notice::from(&err)));
                Err(err)
            }
        }
    }

    /// Request the current snapshot in the background; the answer is delivered into `feed`.
    ///
    /// Fails before anything is sent when the identity cannot be encoded.
    fn spawn_fetch(
        &self,
        feed: PushSink,
    ) -> Result<JoinHandle<Result<(), TransportError>>, TransportError> {
        let procedure = self.context.config.procedure(GAME_STATE_PROCEDURE);
        let kwargs = identity_kwargs(&self.context.identity())
            .map_err(|err| TransportError::Encode(err.to_string()))?;
        let pending = self.transport.call(procedure, kwargs);
        let call_timeout = self.context.config.call_timeout;
        Ok(tokio::spawn(async move {
            let state = timeout(call_timeout, pending)
                .await
                .map_err(|_| TransportError::Timeout)??;
            let _ = feed.send(state);
            Ok::<(), TransportError>(())
        }))
    }

    /// Decode and apply one snapshot payload. Returns the exit reason when the game ended.
    fn absorb(
        &self,
        payload: Value,
        reconciliation: &mut ReconciliationController,
        surface: &mut dyn RoleSurface,
    ) -> Result<Option<SessionExit>, ClientError> {
        let envelope: SnapshotEnvelope = serde_json::from_value(payload)?;
        match reconciliation.apply(envelope.state)? {
            SnapshotOutcome::Ignored => Ok(None),
            SnapshotOutcome::Ended => {
                emit(&self.events, ClientEvent::GameEnded);
                Ok(Some(SessionExit::Ended))
            }
            SnapshotOutcome::Applied(applied) => {
                surface.on_snapshot(&reconciliation.view(&self.context));
                if let Some(snapshot) = reconciliation.snapshot() {
                    emit(
                        &self.events,
                        ClientEvent::StateReplaced(Arc::new(snapshot.clone())),
                    );
                }
                if let Some(activity) = applied.activity {
                    emit(&self.events, ClientEvent::ActivityChanged(activity));
                }
                if applied.edge.is_some() {
                    emit(&self.events, ClientEvent::Countdown(surface.remaining()));
                }
                if let Some((min, max)) = applied.year_range {
                    emit(&self.events, ClientEvent::YearRange { min, max });
                }
                let view = reconciliation.view(&self.context);
                emit(
                    &self.events,
                    ClientEvent::SurfaceChanged(surface.surface_state(&view)),
                );
                Ok(None)
            }
        }
    }

    /// Run one intent through the surface. Returns true when the viewer left the game.
    fn handle_intent(
        &self,
        intent: Intent,
        reconciliation: &ReconciliationController,
        surface: &mut dyn RoleSurface,
        dispatcher: &ActionDispatcher,
    ) -> bool {
        let leaving = intent == Intent::Leave;
        let before = surface.remaining();
        let view = reconciliation.view(&self.context);
        match surface.handle_intent(intent, &view, dispatcher, Instant::now()) {
            Ok(()) => {
                if surface.remaining() != before {
                    emit(&self.events, ClientEvent::Countdown(surface.remaining()));
                }
                emit(
                    &self.events,
                    ClientEvent::SurfaceChanged(surface.surface_state(&view)),
                );
                leaving
            }
            Err(err) => {
                warn!(error = %err, "intent rejected");
                emit(&self.events, ClientEvent::Notice(Notice::from(&err)));
                false
            }
        }
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        let channel = handle.channel.clone();
        match timeout(
            self.context.config.call_timeout,
            self.transport.unsubscribe(handle),
        )
        .await
        {
            Ok(Ok(())) => debug!(%channel, "unsubscribed"),
            Ok(Err(err)) => warn!(%channel, error = %err, "unsubscribe failed"),
            Err(_) => warn!(%channel, "unsubscribe timed out"),
        }
    }

    /// Setup failures end the session for good: forget the join data and ask for a reload.
    async fn fail_setup(&self, err: TransportError) -> ClientError {
        let err = ClientError::Setup(err);
        error!(error = %err, game_id = %self.context.join.game_id, "failed to join game");
        emit(&self.events, ClientEvent::Notice(Notice::from(&err)));
        self.forget_join().await;
        emit(&self.events, ClientEvent::ResetRequested);
        err
    }

    async fn forget_join(&self) {
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear persisted join data");
        }
    }
}
