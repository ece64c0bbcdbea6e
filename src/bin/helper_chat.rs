//! Terminal chat surface for the Helper AI
//!
//! Lines typed on stdin are sent to the active channel; `/join <channel>`
//! switches channels, `/channels` lists them and `/quit` leaves.

use helper_ai::state_machine::RandomJitter;
use helper_ai::{ChatSession, SessionConfig, SurfaceEvent, HELPER_CHANNEL};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helper_ai=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = SessionConfig::default()
        .with_channel("#general")
        .with_channel("LT");
    let (handle, events) = ChatSession::spawn(config, RandomJitter::from_entropy());
    let printer = tokio::spawn(print_events(events));

    handle.select_channel(HELPER_CHANNEL).await?;
    println!("Connected to {HELPER_CHANNEL}. /join <channel>, /channels, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "/quit" {
            break;
        } else if line == "/channels" {
            for name in handle.channels().await? {
                println!("  {name}");
            }
        } else if let Some(channel) = line.strip_prefix("/join ") {
            if let Err(e) = handle.select_channel(channel.trim()).await {
                println!("! {e}");
            }
        } else if let Err(e) = handle.send(line).await {
            // Shown as a toast in the web surface
            println!("! {e}");
        }
    }

    handle.shutdown().await?;
    printer.abort();
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SurfaceEvent>) {
    loop {
        match events.recv().await {
            Ok(SurfaceEvent::Message { message, .. }) if message.author.is_agent() => {
                println!(
                    "[{}] {}: {}",
                    message.display_time(),
                    message.author.display_name(),
                    message.text
                );
                if let Some(data) = &message.display_data {
                    println!("    {data}");
                }
            }
            Ok(SurfaceEvent::Composing {
                channel,
                active: true,
            }) => println!("{channel} is typing…"),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Surface fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
