//! Error types for each layer and the user-facing [`Notice`].

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::{dto::format_system_time, state::activity::Activity};

/// Failures reported by the transport collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The remote side refused the call; `uri` is the authority's error code.
    #[error("call rejected: {uri}")]
    Rejected {
        /// Error URI such as `jpdy.invalid_game_state`.
        uri: String,
        /// Optional free-form detail supplied with the rejection.
        message: Option<String>,
    },
    /// The session is gone.
    #[error("transport closed")]
    Closed,
    /// The call did not complete within the configured timeout.
    #[error("call timed out")]
    Timeout,
    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The request arguments could not be encoded; nothing was sent.
    #[error("request not encodable: {0}")]
    Encode(String),
}

impl TransportError {
    /// Human-readable explanation suitable for a user-facing notice.
    pub fn describe(&self) -> String {
        match self {
            TransportError::Rejected { uri, message } => {
                let base = RemoteErrorCode::from_uri(uri).describe();
                match message {
                    Some(detail) => format!("{base} ({detail})"),
                    None => base.to_string(),
                }
            }
            TransportError::Closed => "The connection to the game server was lost.".into(),
            TransportError::Timeout => "The game server did not answer in time.".into(),
            TransportError::Decode(_) => "The game server sent something unexpected.".into(),
            TransportError::Encode(_) => "The request could not be built.".into(),
        }
    }
}

/// Error codes the authority attaches to rejected calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCode {
    /// `unknown_game`: the game id is not (or no longer) known.
    UnknownGame,
    /// `bad_argument`: malformed call arguments.
    BadArgument,
    /// `invalid_game_state`: the call does not fit the current phase.
    InvalidGameState,
    /// `invalid_square_state_transition`.
    InvalidSquareStateTransition,
    /// `wager_out_of_range`.
    WagerOutOfRange,
    /// `no_such_player`.
    NoSuchPlayer,
    /// `not_allowed`: the caller lacks the right for this call.
    NotAllowed,
    /// `invalid_square`.
    InvalidSquare,
    /// `too_many_daily_doubles`.
    TooManyDailyDoubles,
    /// `lock_timeout`: the game is busy.
    LockTimeout,
    /// Anything else.
    Other,
}

impl RemoteErrorCode {
    /// Map an error URI (with or without the `jpdy.` namespace) onto a known code.
    pub fn from_uri(uri: &str) -> Self {
        let code = uri.rsplit('.').next().unwrap_or(uri);
        match code {
            "unknown_game" | "unknown_error" => RemoteErrorCode::UnknownGame,
            "bad_argument" => RemoteErrorCode::BadArgument,
            "invalid_game_state" => RemoteErrorCode::InvalidGameState,
            "invalid_square_state_transition" => RemoteErrorCode::InvalidSquareStateTransition,
            "wager_out_of_range" => RemoteErrorCode::WagerOutOfRange,
            "no_such_player" => RemoteErrorCode::NoSuchPlayer,
            "not_allowed" => RemoteErrorCode::NotAllowed,
            "invalid_square" => RemoteErrorCode::InvalidSquare,
            "too_many_daily_doubles" => RemoteErrorCode::TooManyDailyDoubles,
            "lock_timeout" => RemoteErrorCode::LockTimeout,
            _ => RemoteErrorCode::Other,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            RemoteErrorCode::UnknownGame => "This game no longer exists.",
            RemoteErrorCode::BadArgument => "The request was malformed.",
            RemoteErrorCode::InvalidGameState => "That is not possible right now.",
            RemoteErrorCode::InvalidSquareStateTransition => "That square cannot change that way.",
            RemoteErrorCode::WagerOutOfRange => "The wager is out of range.",
            RemoteErrorCode::NoSuchPlayer => "That player is not in the game.",
            RemoteErrorCode::NotAllowed => "You are not allowed to do that.",
            RemoteErrorCode::InvalidSquare => "That square does not exist.",
            RemoteErrorCode::TooManyDailyDoubles => "Too many daily doubles for this board.",
            RemoteErrorCode::LockTimeout => "The game server is busy, try again.",
            RemoteErrorCode::Other => "The game server rejected the request.",
        }
    }
}

/// Session-level failures, classified by how the client must react.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Initial fetch or subscription rejected; the session cannot continue.
    #[error("session setup failed: {0}")]
    Setup(#[source] TransportError),
    /// An in-game call failed; state is left untouched.
    #[error("`{procedure}` failed: {source}")]
    Action {
        /// Remote procedure that failed.
        procedure: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The authority sent something this client does not understand.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
}

impl ClientError {
    /// Whether the session must be torn down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::Action { .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::ProtocolMismatch(err.to_string())
    }
}

/// A user intent that cannot be honoured in the current state. Never sent to the authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntentError {
    /// The mounted surface does not offer this interaction.
    #[error("`{intent}` is not available to the {role}")]
    WrongRole {
        /// Name of the rejected intent.
        intent: &'static str,
        /// Role of the mounted surface.
        role: &'static str,
    },
    /// The current activity does not permit the interaction.
    #[error("`{intent}` is not permitted while {activity:?}")]
    NotPermitted {
        /// Name of the rejected intent.
        intent: &'static str,
        /// Activity at the time of the intent.
        activity: Option<Activity>,
    },
    /// Spectators cannot act in the game.
    #[error("spectators cannot `{0}`")]
    Spectator(&'static str),
    /// Only the designated controller may do this.
    #[error("only the controlling player may `{0}`")]
    NotController(&'static str),
    /// A wager outside the allowed range.
    #[error("wager {wager} outside {min}..={max}")]
    WagerOutOfRange {
        /// Rejected wager.
        wager: i64,
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Final-round moderator action with no player selected.
    #[error("no player selected")]
    NoTarget,
    /// Final-round evaluation before both reveals.
    #[error("reveal the wager and the answer before evaluating")]
    EvaluationLocked,
    /// Square is not selectable.
    #[error("square {category}/{row} cannot be selected")]
    SquareUnavailable {
        /// Column.
        category: usize,
        /// Row.
        row: usize,
    },
    /// Outbound argument validation failed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl From<validator::ValidationErrors> for IntentError {
    fn from(err: validator::ValidationErrors) -> Self {
        IntentError::InvalidArguments(err.to_string())
    }
}

/// Failures reading or writing the persisted join data.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Reading, writing or removing the file failed.
    #[error("failed to access session file {}: {source}", .path.display())]
    Io {
        /// Session file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file does not hold valid join data.
    #[error("session file {} is malformed: {source}", .path.display())]
    Format {
        /// Session file.
        path: PathBuf,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
}

/// User-facing failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// What the user should read.
    pub message: String,
    /// RFC 3339 timestamp of when the failure was observed.
    pub at: String,
}

impl Notice {
    /// Stamp `message` with the current wall-clock time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            at: format_system_time(std::time::SystemTime::now()),
        }
    }
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Setup(source) => {
                Notice::now(format!("Could not join the game. {}", source.describe()))
            }
            ClientError::Action { source, .. } => Notice::now(source.describe()),
            ClientError::ProtocolMismatch(_) => {
                Notice::now("This client does not understand the game server; please reload.")
            }
        }
    }
}

impl From<&IntentError> for Notice {
    fn from(err: &IntentError) -> Self {
        Notice::now(err.to_string())
    }
}
