/// Outbound action dispatch.
pub mod dispatcher;
/// Events reported to the rendering layer.
pub mod events;
/// Session join, event loop and teardown.
pub mod game_loop;
/// Snapshot reconciliation and activity tracking.
pub mod reconciliation;
/// Cancellable countdown ticks.
pub mod scheduler;
/// Persisted join data.
pub mod session_store;
/// Moderator and player control surfaces.
pub mod surface;
/// Transport collaborator boundary.
pub mod transport;
