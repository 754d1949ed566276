//! Identifier newtypes and the identity attached to every call.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a running game.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

/// Identifier of a participant (moderator or player).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

/// Secret token proving ownership of a [`PlayerId`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(pub Uuid);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity arguments attached to every outbound call.
///
/// Spectators send the all-zero sentinel instead of omitting the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Game the call targets.
    pub game_id: GameId,
    /// Caller, nil for spectators.
    pub player_id: PlayerId,
    /// Caller's token, nil for spectators.
    pub auth: AuthToken,
}

impl Identity {
    /// Identity of an authenticated participant.
    pub fn authenticated(game_id: GameId, player_id: PlayerId, auth: AuthToken) -> Self {
        Self {
            game_id,
            player_id,
            auth,
        }
    }

    /// Sentinel identity used by spectators.
    pub fn spectator(game_id: GameId) -> Self {
        Self {
            game_id,
            player_id: PlayerId(Uuid::nil()),
            auth: AuthToken(Uuid::nil()),
        }
    }

    /// True when this is the spectator sentinel.
    pub fn is_spectator(&self) -> bool {
        self.player_id.0.is_nil() && self.auth.0.is_nil()
    }
}
