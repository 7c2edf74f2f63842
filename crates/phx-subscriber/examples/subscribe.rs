//! Join a channel and print updates for a few topics.
//!
//! ```sh
//! API_KEY=... TOKEN_SERVER_URL=https://tokens.example.com \
//! WEBSOCKET_SERVER_URL=wss://stream.example.com/socket/websocket \
//!     cargo run -p phx-subscriber --example subscribe -- [TOPIC_ID...]
//! ```
//!
//! With no arguments the topic list comes from `TOPIC_IDS` or the defaults.
//! Update payloads go to stdout (pipe to `jq` for formatting).

use phx_subscriber::{Event, SubscriberConfig, subscribe};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut config = SubscriberConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        config.topic_ids = args;
    }

    eprintln!("subscribing to {:?} ...", config.topic_ids);
    let mut sub = subscribe(config).await?;

    while let Some(event) = sub.next().await {
        match event {
            Event::Joined(ack) => eprintln!("[joined] {ack:?}"),
            Event::Update(update) => println!("{}", update.raw),
        }
    }

    let end = sub.finish().await?;
    eprintln!("[ended] {end:?}");
    Ok(())
}
