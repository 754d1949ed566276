//! Snapshot reconciliation: keeps the latest authoritative snapshot, re-derives the viewer's
//! activity and turns activity changes into countdown edges.

use tracing::{debug, info, warn};

use crate::{
    dto::{common::PlayerId, snapshot::GameSnapshot},
    error::ClientError,
    services::surface::SurfaceView,
    state::{Activity, Role, SessionContext, TimerBus, TimerEvent, activity::timer_edge},
};

/// What applying a snapshot changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Set when the derived activity differs from the previous one.
    pub activity: Option<Activity>,
    /// Countdown edge broadcast on the timer bus, if any.
    pub edge: Option<TimerEvent>,
    /// Year range, present on the first applied snapshot only.
    pub year_range: Option<(Option<u16>, Option<u16>)>,
}

/// What [`ReconciliationController::apply`] did with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot is now current.
    Applied(Applied),
    /// The authority ended the game; later snapshots are ignored.
    Ended,
    /// Arrived after the game ended.
    Ignored,
}

/// Owns the latest snapshot and the timer bus for one mounted session.
#[derive(Debug)]
pub struct ReconciliationController {
    role: Role,
    snapshot: Option<GameSnapshot>,
    activity: Option<Activity>,
    controller: Option<PlayerId>,
    timer_bus: TimerBus,
    year_range_reported: bool,
    ended: bool,
}

impl ReconciliationController {
    /// Controller for a surface of `role`, holding no snapshot yet.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            snapshot: None,
            activity: None,
            controller: None,
            timer_bus: TimerBus::default(),
            year_range_reported: false,
            ended: false,
        }
    }

    /// Bus the mounted surface listens on for countdown edges.
    pub fn timer_bus(&self) -> &TimerBus {
        &self.timer_bus
    }

    /// Last applied snapshot.
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    /// Activity derived from the last applied snapshot.
    pub fn activity(&self) -> Option<Activity> {
        self.activity
    }

    /// Controlling player, persisted across phases that carry none.
    pub fn controller(&self) -> Option<PlayerId> {
        self.controller
    }

    /// True once the authority ended the game.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Replace the held snapshot with `snapshot`.
    ///
    /// Snapshots are full replacements, so re-applying an identical one is a no-op apart from the
    /// stored copy: the activity is unchanged and no timer edge fires.
    pub fn apply(&mut self, snapshot: GameSnapshot) -> Result<SnapshotOutcome, ClientError> {
        if self.ended {
            debug!("ignoring snapshot after game end");
            return Ok(SnapshotOutcome::Ignored);
        }
        snapshot
            .check_shape()
            .map_err(ClientError::ProtocolMismatch)?;

        if snapshot.is_ended {
            info!("game ended by the authority");
            self.ended = true;
            self.snapshot = Some(snapshot);
            return Ok(SnapshotOutcome::Ended);
        }

        if snapshot.is_moderator != (self.role == Role::Moderator) {
            warn!(
                role = self.role.as_str(),
                is_moderator = snapshot.is_moderator,
                "snapshot addressed to a different role than the mounted surface"
            );
        }

        let activity = Activity::derive(&snapshot.state, self.role);
        let edge = timer_edge(self.activity, activity);
        if let Some(event) = edge {
            let listeners = self.timer_bus.fire(event);
            debug!(?event, ?activity, listeners, "countdown edge");
        }
        let changed = (self.activity != Some(activity)).then_some(activity);
        if changed.is_some() {
            debug!(?activity, "activity changed");
        }
        self.activity = Some(activity);
        self.controller = snapshot.state.controller(self.controller);

        let year_range = (!self.year_range_reported).then(|| {
            self.year_range_reported = true;
            (snapshot.min_year, snapshot.max_year)
        });

        self.snapshot = Some(snapshot);
        Ok(SnapshotOutcome::Applied(Applied {
            activity: changed,
            edge,
            year_range,
        }))
    }

    /// Read-only view handed to the mounted surface.
    pub fn view<'a>(&'a self, context: &SessionContext) -> SurfaceView<'a> {
        SurfaceView {
            snapshot: self.snapshot.as_ref(),
            activity: self.activity,
            controller: self.controller,
            viewer: context.viewer_id(),
            spectator: context.is_spectator(),
        }
    }
}
