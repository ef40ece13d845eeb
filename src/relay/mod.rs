//! Streaming Relay.
//!
//! Two queues bridged by one task: the provider pushes fragments onto an
//! upstream channel, the relay turns them into [`RelayEvent`]s on a
//! downstream channel read by the transport. When the downstream receiver
//! is dropped (client gone) the upstream task is aborted.

pub mod events;
pub mod state;

use std::sync::Arc;

use surrealdb::RecordId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmError, LlmProvider, Role};
use crate::models::MessageCreate;
use crate::repository::MessageLog;

pub use events::RelayEvent;
pub use state::RelayState;

const UPSTREAM_BUFFER: usize = 64;
const DOWNSTREAM_BUFFER: usize = 64;

/// The exchange to record once a stream completes.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRecord {
    pub book_id: String,
    pub chapter_id: Option<String>,
    pub character_id: Option<String>,
    pub command: Option<String>,
    /// User turn that prompted the reply, written before it.
    pub user_message: Option<String>,
}

/// Best-effort write of a finished exchange.
pub struct Persistence {
    pub log: Arc<dyn MessageLog>,
    pub record: ExchangeRecord,
}

impl Persistence {
    fn message(&self, role: Role, content: String) -> MessageCreate {
        MessageCreate {
            book: RecordId::from(("book", self.record.book_id.as_str())),
            chapter_id: self.record.chapter_id.clone(),
            character_id: self.record.character_id.clone(),
            role,
            content,
            command: self.record.command.clone(),
        }
    }

    /// Write on a detached task. Failures are logged and dropped.
    fn spawn(self, reply: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut turns = Vec::with_capacity(2);
            if let Some(user) = self.record.user_message.clone().filter(|m| !m.is_empty()) {
                turns.push(self.message(Role::User, user));
            }
            turns.push(self.message(Role::Assistant, reply));

            for turn in turns {
                if let Err(e) = self.log.append(turn).await {
                    warn!(book_id = %self.record.book_id, error = %e, "Failed to persist exchange");
                    return;
                }
            }
            debug!(book_id = %self.record.book_id, "Persisted exchange");
        })
    }
}

/// How a relay run ended.
#[derive(Debug)]
pub struct RelayOutcome {
    pub state: RelayState,
    /// Detached persistence task, when one was started.
    pub persistence: Option<JoinHandle<()>>,
}

pub struct RelayHandle {
    pub events: mpsc::Receiver<RelayEvent>,
    pub task: JoinHandle<RelayOutcome>,
}

/// Start relaying `request` through `provider`.
pub fn spawn_relay(
    provider: Arc<dyn LlmProvider>,
    request: CompletionRequest,
    persistence: Option<Persistence>,
) -> RelayHandle {
    let (down_tx, events) = mpsc::channel(DOWNSTREAM_BUFFER);
    let task = tokio::spawn(run_relay(provider, request, persistence, down_tx));
    RelayHandle { events, task }
}

async fn run_relay(
    provider: Arc<dyn LlmProvider>,
    request: CompletionRequest,
    persistence: Option<Persistence>,
    down_tx: mpsc::Sender<RelayEvent>,
) -> RelayOutcome {
    let model = request.model.clone();
    let (up_tx, mut up_rx) = mpsc::channel::<String>(UPSTREAM_BUFFER);
    let mut upstream =
        tokio::spawn(async move { provider.complete_streaming(request, up_tx).await });

    let mut state = RelayState::default();
    state.start();
    debug!(model = %model, "Relay streaming");

    loop {
        tokio::select! {
            biased;
            _ = down_tx.closed() => return disconnected(upstream, state),
            fragment = up_rx.recv() => match fragment {
                Some(text) => {
                    if let Some(event) = state.on_fragment(text) {
                        if down_tx.send(event).await.is_err() {
                            return disconnected(upstream, state);
                        }
                    }
                }
                // Sender dropped: the provider call has returned.
                None => break,
            },
        }
    }

    let result = tokio::select! {
        biased;
        _ = down_tx.closed() => return disconnected(upstream, state),
        joined = &mut upstream => joined,
    };

    let terminal = match result {
        Ok(Ok(())) => state.complete(),
        Ok(Err(e)) => {
            warn!(model = %model, error = %e, "Upstream stream failed");
            state.fail(e.to_string())
        }
        Err(e) => {
            warn!(model = %model, error = %e, "Upstream task aborted");
            state.fail(LlmError::Cancelled.to_string())
        }
    };

    // Persistence is started before the terminal event goes out and never
    // affects it.
    let persistence = match (&state, persistence) {
        (RelayState::Completed { text }, Some(p)) if !text.is_empty() => Some(p.spawn(text.clone())),
        _ => None,
    };

    if let Some(event) = terminal {
        if down_tx.send(event).await.is_err() {
            debug!("Client gone before terminal event");
        }
    }

    RelayOutcome { state, persistence }
}

fn disconnected(
    upstream: JoinHandle<Result<(), LlmError>>,
    mut state: RelayState,
) -> RelayOutcome {
    upstream.abort();
    debug!("Client disconnected, upstream call aborted");
    state.fail(LlmError::Cancelled.to_string());
    RelayOutcome {
        state,
        persistence: None,
    }
}
