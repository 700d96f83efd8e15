//! Connection supervisor: dialing, login, the read loop and reconnects.

use std::cmp;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::ConnectionState;
use super::handlers::Dispatcher;
use super::lane::{Ack, LaneKind};
use super::link::Stage;
use super::Shared;
use crate::command::outbound::{self, SERVER_HOST};
use crate::command::Command;
use crate::error::ClientError;
use crate::message::Message;
use crate::transport::{split_lines, FrameReader, TransportError};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(600);

/// Delay between failed dial attempts: 1s doubling up to 600s.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    next: Duration,
    attempt: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: INITIAL_BACKOFF,
            attempt: 0,
        }
    }
}

impl Backoff {
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = cmp::min(self.next * 2, MAX_BACKOFF);
        self.attempt += 1;
        delay
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Keep the session connected until it is closed.
///
/// Each connection gets a generation number; failures reported for any
/// generation but the current one are ignored, so only one reconnect runs
/// at a time.
pub(super) async fn supervise(
    shared: Arc<Shared>,
    mut failures: mpsc::UnboundedReceiver<u64>,
    dispatcher: Dispatcher,
) {
    let cancel = shared.cancel.clone();
    let mut backoff = Backoff::default();

    loop {
        let generation = loop {
            if cancel.is_cancelled() {
                return;
            }
            shared.transition(ConnectionState::Connecting);

            match dial(&shared, &dispatcher).await {
                Ok(generation) => {
                    backoff.reset();
                    break generation;
                }
                Err(e) => {
                    shared.teardown().await;
                    if cancel.is_cancelled() || !e.triggers_reconnect() {
                        debug!(error = %e, "supervisor stopping");
                        return;
                    }
                    let delay = backoff.next_delay();
                    error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_secs = delay.as_secs(),
                        "dial failed"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                failed = failures.recv() => match failed {
                    Some(failed) if failed == generation => break,
                    Some(stale) => debug!(stale, generation, "ignoring stale failure"),
                    None => return,
                },
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        info!(generation, "connection lost, reconnecting");
        shared.teardown().await;
        shared.handlers.connected(false);
    }
}

/// Open a connection, log in and replay joined rooms.
async fn dial(shared: &Arc<Shared>, dispatcher: &Dispatcher) -> Result<u64, ClientError> {
    let config = &shared.config;
    let cancel = &shared.cancel;
    info!(server = %config.server, user = %config.username, "connecting");

    let (writer, reader) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ClientError::Closed),
        conn = shared.connector.connect(&config.server) => conn?,
    };

    let generation = shared.link.install(writer).await;
    let connection = shared.open_connection();
    shared.transition(ConnectionState::Connected);
    tokio::spawn(read_loop(
        Arc::clone(shared),
        reader,
        generation,
        dispatcher.clone(),
        connection,
    ));

    let auth = shared.outboxes.get(LaneKind::Authenticate);
    let acks: Vec<Ack> = outbound::login(&config.username, &config.token)
        .into_iter()
        .map(|line| auth.submit_with_ack(generation, line))
        .collect();
    for ack in acks {
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Closed),
            _ = shared.link.lost(generation) => return Err(TransportError::Closed.into()),
            written = ack => written,
        };
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ClientError::Closed),
        }
    }

    // replay under the session lock so concurrent joins queue behind it
    {
        let mut session = shared.session.write();
        if !shared.link.promote(generation, Stage::Ready) {
            return Err(TransportError::Closed.into());
        }
        session.synced = true;
        let joins = shared.outboxes.get(LaneKind::Join);
        for room in &session.rooms {
            joins.submit_for(generation, outbound::join(room));
        }
        info!(generation, rooms = session.rooms.len(), "logged in");
    }

    Ok(generation)
}

/// Read frames from connection `generation` until it fails or `connection`
/// is cancelled by teardown. The reader is dropped on return.
async fn read_loop(
    shared: Arc<Shared>,
    mut reader: Box<dyn FrameReader>,
    generation: u64,
    dispatcher: Dispatcher,
    connection: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = connection.cancelled() => break,
            frame = reader.read_frame() => frame,
        };
        if shared.link.generation() != generation {
            break;
        }

        match frame {
            Ok(Some(frame)) => {
                for line in split_lines(&frame) {
                    handle_line(&shared, &dispatcher, generation, line).await;
                }
            }
            Ok(None) => {
                if !connection.is_cancelled() {
                    shared.link.report(generation, &TransportError::Closed);
                }
                break;
            }
            Err(e) => {
                if !connection.is_cancelled() {
                    shared.link.report(generation, &e);
                }
                break;
            }
        }
    }
    debug!(generation, "read loop stopped");
}

async fn handle_line(shared: &Shared, dispatcher: &Dispatcher, generation: u64, line: &str) {
    if shared.config.debug {
        debug!(%line, "< ");
    }

    let msg = match Message::parse(line) {
        Ok(msg) => msg,
        Err(cause) => {
            let err = ClientError::InvalidMessage {
                string: line.to_string(),
                cause: cause.clone(),
            };
            warn!(error = %err, %cause, "skipping line");
            return;
        }
    };

    match msg.command {
        Command::Ping => {
            let host = msg.text().unwrap_or(SERVER_HOST);
            // failures are reported by the link
            let _ = shared.link.send_on(generation, &outbound::pong(host)).await;
        }
        Command::Pong => {
            let _ = shared.pongs.try_send(());
        }
        _ => dispatcher.deliver(msg),
    }
}
