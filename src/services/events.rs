use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    dto::snapshot::GameSnapshot, error::Notice, services::surface::SurfaceState, state::Activity,
};

/// Everything the rendering layer is told about a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A snapshot replaced the previous one.
    StateReplaced(Arc<GameSnapshot>),
    /// The viewer's derived activity changed.
    ActivityChanged(Activity),
    /// Seconds left on the answer countdown.
    Countdown(u8),
    /// Local surface state changed (wager draft, final-round selection, self view).
    SurfaceChanged(SurfaceState),
    /// Air-year span of the clue set, reported once per session.
    YearRange {
        /// Earliest air year, when any clue carries one.
        min: Option<u16>,
        /// Latest air year.
        max: Option<u16>,
    },
    /// A failure the user should see.
    Notice(Notice),
    /// The authority ended the game.
    GameEnded,
    /// Persisted join data was dropped; the embedding application should reload.
    ResetRequested,
}

/// Sending half of the renderer's event stream.
pub type EventSender = mpsc::UnboundedSender<ClientEvent>;

/// Forward `event` to the rendering layer, ignoring a detached receiver.
pub fn emit(events: &EventSender, event: ClientEvent) {
    if events.send(event).is_err() {
        debug!("client event dropped: no receiver");
    }
}
