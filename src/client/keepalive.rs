//! Ping/pong liveness probe.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::link::Stage;
use super::Shared;
use crate::command::outbound::{ping, SERVER_HOST};
use crate::error::ClientError;

/// Probe the connection once per keepalive interval while logged in.
///
/// At most one probe is outstanding. A probe that is not answered within
/// the pong timeout fails the connection it was sent on.
pub(super) async fn keepalive(shared: Arc<Shared>, mut pongs: mpsc::Receiver<()>) {
    let interval = shared.config.keepalive_interval;
    let timeout = shared.config.pong_timeout;
    if interval.is_zero() {
        info!("keepalive disabled");
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if shared.link.stage() != Stage::Ready {
            continue;
        }

        // drop replies that arrived unprompted
        while pongs.try_recv().is_ok() {}

        let generation = shared.link.generation();
        let sent = Instant::now();
        if shared.link.send_on(generation, &ping(SERVER_HOST)).await.is_err() {
            continue;
        }

        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => return,
            reply = tokio::time::timeout(timeout, pongs.recv()) => match reply {
                Ok(Some(())) => {
                    let rtt = sent.elapsed();
                    debug!(?rtt, "keepalive answered");
                    shared.handlers.latency(rtt);
                }
                Ok(None) => return,
                Err(_) => {
                    shared
                        .link
                        .report(generation, &ClientError::ProtocolTimeout(timeout));
                }
            },
        }
    }
}
