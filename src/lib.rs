//! Library crate for jpdy-client, exposing the reconciliation engine to the replay binary and to
//! embedding front ends.

/// Client configuration.
pub mod config;
/// Wire types exchanged with the authority.
pub mod dto;
/// Error types and user-facing notices.
pub mod error;
/// Session services: reconciliation, surfaces, dispatch and the game loop.
pub mod services;
/// Session context and local scratch state.
pub mod state;
