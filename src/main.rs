//! Replay driver: feeds a recorded stream of game snapshots through the client engine and logs
//! what a front end would render.
//!
//! Usage: `jpdy-client <replay.jsonl>`. Each line of the replay is one snapshot envelope
//! (`{"state": {...}}`). The first line answers the initial state request, the rest are pushed on
//! the subscription.

use std::{
    env,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, bail};
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::sleep,
};
use tokio_stream::{StreamExt, wrappers::LinesStream};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use jpdy_client::{
    config::ClientConfig,
    dto::common::{AuthToken, GameId, PlayerId},
    error::TransportError,
    services::{
        events::ClientEvent,
        game_loop::GameLoop,
        session_store::SessionStore,
        transport::{PushSink, SubscriptionHandle, Transport},
    },
    state::{JoinData, JoinMode, Role, SessionContext},
};

const REPLAY_PACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let Some(replay_path) = env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: jpdy-client <replay.jsonl>");
    };

    let config = Arc::new(ClientConfig::load());
    let frames = load_frames(&replay_path).await?;
    info!(path = %replay_path.display(), frames = frames.len(), "loaded replay");

    let store = SessionStore::from_config(&config);
    let join = match store.load().await {
        Ok(Some(join)) => {
            info!(game_id = %join.game_id, "rejoining persisted game");
            join
        }
        Ok(None) => {
            let join = join_from_env()?;
            if let Err(err) = store.save(&join).await {
                warn!(error = %err, "failed to persist join data");
            }
            join
        }
        Err(err) => {
            warn!(error = %err, "ignoring unreadable join data");
            join_from_env()?
        }
    };

    let transport: Arc<dyn Transport> = Arc::new(ReplayTransport::new(frames));
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (_intents_tx, intents) = mpsc::unbounded_channel();

    let renderer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            render(&event);
        }
    });

    let session = GameLoop::new(
        transport,
        SessionContext::new(join, Arc::clone(&config)),
        store,
        events_tx,
    );
    let exit = session.run(intents).await.context("session failed")?;
    renderer.await.context("event renderer panicked")?;
    info!(?exit, "replay finished");
    Ok(())
}

/// Read every non-blank line of the replay as a JSON value.
async fn load_frames(path: &Path) -> anyhow::Result<Vec<Value>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open replay {}", path.display()))?;
    let mut lines = LinesStream::new(BufReader::new(file).lines());
    let mut frames = Vec::new();
    let mut number = 0usize;
    while let Some(line) = lines.next().await {
        number += 1;
        let line = line.with_context(|| format!("failed to read replay line {number}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line)
            .with_context(|| format!("replay line {number} is not valid JSON"))?;
        frames.push(frame);
    }
    if frames.is_empty() {
        bail!("replay {} holds no snapshots", path.display());
    }
    Ok(frames)
}

/// Build join data from `JPDY_ROLE`, `JPDY_GAME_ID`, `JPDY_CHANNEL`, `JPDY_PLAYER_ID` and
/// `JPDY_TOKEN`.
fn join_from_env() -> anyhow::Result<JoinData> {
    join_from_vars(|key| env::var(key).ok())
}

/// The channel is the one the authority handed out on join. Without a player id and token the
/// viewer joins as a spectator.
fn join_from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<JoinData> {
    let role = match var("JPDY_ROLE").as_deref() {
        Some("moderator") => Role::Moderator,
        Some("player") | None => Role::Player,
        Some(other) => bail!("unknown JPDY_ROLE `{other}`; expected `moderator` or `player`"),
    };
    let game_id = match var("JPDY_GAME_ID") {
        Some(raw) => GameId(Uuid::parse_str(&raw).context("JPDY_GAME_ID is not a UUID")?),
        None => GameId(Uuid::new_v4()),
    };
    let mode = match (var("JPDY_PLAYER_ID"), var("JPDY_TOKEN")) {
        (Some(player), Some(token)) => JoinMode::Authenticated {
            player_id: PlayerId(Uuid::parse_str(&player).context("JPDY_PLAYER_ID is not a UUID")?),
            token: AuthToken(Uuid::parse_str(&token).context("JPDY_TOKEN is not a UUID")?),
        },
        _ => JoinMode::Spectator,
    };
    let channel =
        var("JPDY_CHANNEL").context("JPDY_CHANNEL must name the channel assigned on join")?;
    Ok(JoinData {
        game_id,
        role,
        channel,
        mode,
    })
}

fn render(event: &ClientEvent) {
    match event {
        ClientEvent::StateReplaced(snapshot) => info!(
            state = ?snapshot.state,
            players = snapshot.players.len(),
            "state replaced"
        ),
        ClientEvent::ActivityChanged(activity) => info!(?activity, "activity changed"),
        ClientEvent::Countdown(remaining) => info!(remaining, "countdown"),
        ClientEvent::SurfaceChanged(state) => info!(?state, "surface changed"),
        ClientEvent::YearRange { min, max } => info!(?min, ?max, "clue years"),
        ClientEvent::Notice(notice) => warn!(message = %notice.message, at = %notice.at, "notice"),
        ClientEvent::GameEnded => info!("game ended"),
        ClientEvent::ResetRequested => warn!("join data dropped; reload requested"),
    }
}

/// Transport that answers from a recorded replay instead of a live authority.
struct ReplayTransport {
    frames: Arc<Vec<Value>>,
    next_id: AtomicU64,
}

impl ReplayTransport {
    fn new(frames: Vec<Value>) -> Self {
        Self {
            frames: Arc::new(frames),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Transport for ReplayTransport {
    fn call(
        &self,
        procedure: String,
        kwargs: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, TransportError>> {
        let args = Value::Object(kwargs);
        info!(%procedure, %args, "call");
        let response = if procedure.ends_with(".game_state") {
            self.frames.first().cloned().unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        Box::pin(async move { Ok(response) })
    }

    fn subscribe(
        &self,
        channel: String,
        sink: PushSink,
    ) -> BoxFuture<'static, Result<SubscriptionHandle, TransportError>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frames = Arc::clone(&self.frames);
        Box::pin(async move {
            debug!(%channel, id, "replay subscription opened");
            tokio::spawn(async move {
                for frame in frames.iter().skip(1) {
                    sleep(REPLAY_PACE).await;
                    if sink.send(frame.clone()).is_err() {
                        break;
                    }
                }
                // Dropping the sink closes the feed once the replay is exhausted.
            });
            Ok(SubscriptionHandle { id, channel })
        })
    }

    fn unsubscribe(
        &self,
        handle: SubscriptionHandle,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        Box::pin(async move {
            debug!(channel = %handle.channel, id = handle.id, "replay subscription closed");
            Ok(())
        })
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
