//! Fire-and-forget outbound calls.

use std::sync::Arc;

use tokio::{task::JoinHandle, time::timeout};
use tracing::{debug, error, warn};

use crate::{
    config::ClientConfig,
    dto::{
        action::{Action, ActionCall},
        common::Identity,
    },
    error::{ClientError, Notice, TransportError},
    services::{
        events::{ClientEvent, EventSender, emit},
        transport::Transport,
    },
    state::SessionContext,
};

/// Builds outbound calls with the session identity and issues them without waiting.
///
/// The effect of an action is only ever observed through a later snapshot; acknowledgements are
/// inspected for failure and otherwise discarded.
#[derive(Clone)]
pub struct ActionDispatcher {
    transport: Arc<dyn Transport>,
    identity: Identity,
    config: Arc<ClientConfig>,
    events: EventSender,
}

impl ActionDispatcher {
    /// Dispatcher speaking for the identity of `context`. Failures surface on `events`.
    pub fn new(transport: Arc<dyn Transport>, context: &SessionContext, events: EventSender) -> Self {
        Self {
            transport,
            identity: context.identity(),
            config: Arc::clone(&context.config),
            events,
        }
    }

    /// Identity stamped on every call.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Resolve the procedure name and argument map for `action`.
    pub fn prepare(&self, action: &Action) -> Result<ActionCall, ClientError> {
        Ok(ActionCall {
            procedure: self.config.procedure(action.name()),
            kwargs: action.to_kwargs(&self.identity)?,
        })
    }

    /// Issue `action` in the background. Failures are logged and surfaced as a notice; nothing is
    /// retried and no local state is touched.
    pub fn dispatch(&self, action: Action) -> Option<JoinHandle<()>> {
        let call = match self.prepare(&action) {
            Ok(call) => call,
            Err(err) => {
                error!(error = %err, action = action.name(), "failed to encode action");
                emit(&self.events, ClientEvent::Notice(Notice::from(&err)));
                return None;
            }
        };

        debug!(procedure = %call.procedure, "dispatching action");
        let pending = self.transport.call(call.procedure.clone(), call.kwargs);
        let call_timeout = self.config.call_timeout;
        let events = self.events.clone();
        let procedure = call.procedure;

        Some(tokio::spawn(async move {
            let outcome = match timeout(call_timeout, pending).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            };
            match outcome {
                Ok(_) => debug!(%procedure, "action acknowledged"),
                Err(source) => {
                    let err = ClientError::Action { procedure, source };
                    warn!(error = %err, "action failed");
                    emit(&events, ClientEvent::Notice(Notice::from(&err)));
                }
            }
        }))
    }
}
