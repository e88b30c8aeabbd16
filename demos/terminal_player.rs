//! # Terminal Player
//!
//! Joins a game server as one player and plays from the terminal:
//!
//! 1. Connect over WebSocket
//! 2. Log every rendered update through `tracing`
//! 3. Type a word and press Enter to pick it when you are the drawer
//! 4. Shut down on Ctrl+C or when the server disconnects
//!
//! ## Running
//!
//! ```sh
//! SCRIBBLE_URL=ws://localhost:8000/ws SCRIBBLE_PLAYER=alice \
//!     cargo run --example terminal_player
//! ```

use scribble_client::{ClientEvent, ScribbleClient, ScribbleConfig, TracingRenderer, WebSocketTransport};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_URL: &str = "ws://localhost:8000/ws";
const DEFAULT_PLAYER: &str = "player";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // `RUST_LOG=debug` also shows routing decisions and timer ticks.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("SCRIBBLE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let player = std::env::var("SCRIBBLE_PLAYER").unwrap_or_else(|_| DEFAULT_PLAYER.to_string());
    tracing::info!("Connecting to {url} as {player}");

    // ── Connect ─────────────────────────────────────────────────────
    let transport = WebSocketTransport::connect(&url).await?;
    let (mut client, mut event_rx) =
        ScribbleClient::start(transport, TracingRenderer, ScribbleConfig::new(player));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    ClientEvent::Connected => tracing::info!("Connected, waiting for the game"),
                    ClientEvent::Canvas(frame) => tracing::debug!("canvas: {frame}"),
                    ClientEvent::Chat(frame) => tracing::info!("chat: {frame}"),
                    ClientEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("server closed"));
                        break;
                    }
                }
            }

            line = lines.next_line() => {
                match line? {
                    Some(word) if !word.trim().is_empty() => client.choose_word(word.trim())?,
                    Some(_) => {}
                    None => {
                        tracing::info!("stdin closed, shutting down");
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    Ok(())
}
