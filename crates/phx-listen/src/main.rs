mod cli;
mod error;

use std::fmt;
use std::io::Write;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use phx_subscriber::{Event, SessionEnd, SubscriberConfig, WsConnector};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use crate::cli::Cli;
use crate::error::{ListenError, ListenResult};

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal; real env vars still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_timer(Elapsed(Instant::now()))
        .init();

    let cli = Cli::parse();

    let result = match cli.to_config() {
        Ok(config) => match cli.reconnect_policy() {
            Some(policy) => run_reconnecting(config, policy).await,
            None => run_once(config).await,
        },
        Err(e) => Err(e),
    };

    report(result, &mut std::io::stderr())
}

/// The single place a run's outcome is reported. The library returns errors
/// without logging them, so this is the only line a failure produces.
fn report(result: ListenResult<SessionEnd>, err_out: &mut impl Write) -> ExitCode {
    match result {
        Ok(end) => {
            tracing::info!(?end, "session ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(err_out, "error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    return;
                }
                tracing::info!("interrupt received, closing");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

fn print_event(out: &mut impl Write, event: &Event) -> ListenResult<()> {
    match event {
        Event::Joined(ack) if ack.is_ok() => tracing::info!(?ack, "joined channel"),
        Event::Joined(ack) => tracing::warn!(?ack, "join not acknowledged"),
        Event::Update(update) => {
            writeln!(out, "{}", update.raw)?;
            out.flush()?;
        }
    }
    Ok(())
}

async fn run_once(config: SubscriberConfig) -> ListenResult<SessionEnd> {
    let mut sub = phx_subscriber::subscribe(config).await?;
    cancel_on_ctrl_c(sub.cancel_token());

    let mut stdout = std::io::stdout();
    while let Some(event) = sub.next().await {
        if let Err(e) = print_event(&mut stdout, &event) {
            sub.close();
            return Err(e);
        }
    }
    Ok(sub.finish().await?)
}

async fn run_reconnecting(
    config: SubscriberConfig,
    policy: phx_subscriber::ReconnectPolicy,
) -> ListenResult<SessionEnd> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let (tx, mut rx) = mpsc::channel(config.timing.event_channel_capacity);
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            phx_subscriber::run_with_reconnect(&config, &WsConnector, &policy, &tx, &cancel).await
        })
    };

    let mut stdout = std::io::stdout();
    let mut output_err = None;
    while let Some(event) = rx.recv().await {
        if let Err(e) = print_event(&mut stdout, &event) {
            cancel.cancel();
            output_err = Some(e);
            break;
        }
    }
    rx.close();

    let outcome = task
        .await
        .map_err(|e| ListenError::Internal(format!("reconnect task failed: {e}")))?;
    match output_err {
        Some(e) => Err(e),
        None => Ok(outcome?),
    }
}
