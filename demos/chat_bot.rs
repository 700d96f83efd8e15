//! Small chat bot
//!
//! Joins the rooms listed in `TMI_ROOMS` (comma separated) and answers
//! `!ping` with `pong`. Without `TMI_USER`/`TMI_TOKEN` it connects as a
//! read-only guest and only prints what it sees.
//!
//! ```text
//! TMI_USER=mybot TMI_TOKEN=oauth:... TMI_ROOMS=somechannel \
//!     RUST_LOG=slirc_tmi=debug cargo run --example chat_bot
//! ```

use std::env;

use slirc_tmi::{Client, Config, Handlers, Message};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match (env::var("TMI_USER"), env::var("TMI_TOKEN")) {
        (Ok(user), Ok(token)) => Config::new(user, token),
        _ => Config::anonymous(),
    };
    let rooms: Vec<String> = env::var("TMI_ROOMS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    if rooms.is_empty() {
        anyhow::bail!("set TMI_ROOMS to at least one room");
    }

    let (replies_tx, mut replies) = mpsc::unbounded_channel::<String>();
    let handlers = Handlers::default()
        .on_connect(|up| info!(up, "connection status"))
        .on_latency(|rtt| info!(?rtt, "keepalive"))
        .on_privmsg(move |msg: &Message| {
            let (Some(room), Some(text)) = (msg.channel(), msg.text()) else {
                return;
            };
            println!("#{} <{}> {}", room, msg.nickname().unwrap_or("?"), text);
            if text.trim() == "!ping" {
                let _ = replies_tx.send(room.to_string());
            }
        })
        .on_notice(|msg: &Message| {
            println!("-notice- {}", msg.text().unwrap_or(""));
        });

    let client = Client::with_handlers(config.with_rooms(rooms), handlers);
    client.run()?;
    info!(user = client.username(), "bot running, ctrl-c to quit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(room) = replies.recv() => client.say(&room, "pong", false),
        }
    }

    client.close().await;
    Ok(())
}
