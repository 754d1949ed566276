//! Session-scoped state: join data, the explicit session context and the per-surface scratch
//! state modules.

/// Activity derivation and countdown edges.
pub mod activity;
/// Final-round sub-flow.
pub mod final_jeopardy;
/// Accessors over the authoritative state.
pub mod remote;
/// Buzzer throttle.
pub mod throttle;
/// Answer countdown and its edge bus.
pub mod timer;
/// Daily-double wager draft.
pub mod wager;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    config::ClientConfig,
    dto::common::{AuthToken, GameId, Identity, PlayerId},
};

pub use self::activity::{Activity, ModeratorActivity, PlayerActivity};
pub use self::timer::{TimerBus, TimerEvent};

/// Which surface the session mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Runs the board and judges answers.
    Moderator,
    /// Buzzes, wagers and answers; spectators mount this surface too.
    Player,
}

impl Role {
    /// Lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Moderator => "moderator",
            Role::Player => "player",
        }
    }
}

/// How the viewer joined the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinMode {
    /// A participant holding a player id and its auth token.
    Authenticated {
        /// The viewer's own id.
        player_id: PlayerId,
        /// Token proving ownership of `player_id`.
        token: AuthToken,
    },
    /// Watching without a seat; calls carry the zeroed identity.
    Spectator,
}

/// Everything needed to rejoin a game after a reload. Persisted by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinData {
    /// Game that was joined.
    pub game_id: GameId,
    /// Surface to mount.
    pub role: Role,
    /// Seat or spectator.
    pub mode: JoinMode,
    /// Subscription channel assigned by the authority on join (`jpdy.chan.<uuid>`).
    pub channel: String,
}

/// Explicit per-session context handed to every consumer at construction.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// What was joined.
    pub join: JoinData,
    /// Shared client configuration.
    pub config: Arc<ClientConfig>,
}

impl SessionContext {
    /// Bundle the join data with the shared configuration.
    pub fn new(join: JoinData, config: Arc<ClientConfig>) -> Self {
        Self { join, config }
    }

    /// Identity attached to outbound calls; spectators get the zeroed sentinel.
    pub fn identity(&self) -> Identity {
        match self.join.mode {
            JoinMode::Authenticated { player_id, token } => {
                Identity::authenticated(self.join.game_id, player_id, token)
            }
            JoinMode::Spectator => Identity::spectator(self.join.game_id),
        }
    }

    /// Viewer's own player id, `None` for spectators.
    pub fn viewer_id(&self) -> Option<PlayerId> {
        match self.join.mode {
            JoinMode::Authenticated { player_id, .. } => Some(player_id),
            JoinMode::Spectator => None,
        }
    }

    /// Role whose surface is mounted.
    pub fn role(&self) -> Role {
        self.join.role
    }

    /// Whether the viewer joined without a seat.
    pub fn is_spectator(&self) -> bool {
        matches!(self.join.mode, JoinMode::Spectator)
    }
}
