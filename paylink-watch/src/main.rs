//! Payment watcher command.
//!
//! # Usage
//!
//! ```bash
//! # Wait for 10.50 USDC to the configured recipient
//! cargo run -p paylink-watch -- 10.50
//!
//! # Devnet SOL with an explicit recipient
//! cargo run -p paylink-watch -- 0.01 --cluster devnet --currency SOL \
//!     --recipient 9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p paylink-watch -- 1
//! ```
//!
//! Exits with status 0 once the payment is confirmed, 1 on timeout, shutdown
//! or any error.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use paylink::{PaymentRequest, parse_amount};
use paylink_svm::SolanaPaymentBuilder;
use paylink_svm::rpc::{SolanaMemoSource, rpc_client};
use solana_commitment_config::CommitmentConfig;
use tracing_subscriber::EnvFilter;

use paylink_watch::util::SigDown;
use paylink_watch::{Outcome, WatchArgs, WatchConfig, WatchError, watch};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(outcome) => {
            match &outcome {
                Outcome::Confirmed { signature } => {
                    tracing::info!(%signature, "payment confirmed");
                }
                Outcome::TimedOut { attempts } => {
                    tracing::warn!(attempts, "payment not seen before timeout");
                }
                Outcome::Cancelled => tracing::warn!("stopped before the payment was seen"),
            }
            outcome.exit_code()
        }
        Err(e) => {
            tracing::error!("paylink-watch failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Outcome, WatchError> {
    let args = WatchArgs::parse();
    let config = WatchConfig::load_from(&args.config)?.with_args(&args);
    let amount = parse_amount(&args.amount)?;

    let mut builder =
        SolanaPaymentBuilder::new(config.cluster).with_memo_prefix(config.memo_prefix.as_str());
    if let Some(label) = &config.label {
        builder = builder.with_label(label.as_str());
    }
    if let Some(message) = &config.message {
        builder = builder.with_message(message.as_str());
    }
    let request = builder.build(config.recipient()?, amount, &config.currency)?;

    let rpc = rpc_client(config.rpc_url(), CommitmentConfig::confirmed());
    let source = SolanaMemoSource::for_request(rpc, &request, config.cluster)?;
    tracing::info!(
        cluster = %config.cluster,
        rpc_url = config.rpc_url(),
        address = %source.address(),
        max_wait_secs = config.poll.max_duration().as_secs(),
        "watching for payment"
    );
    print_request(&request)?;

    let sig_down = SigDown::try_new()?;
    Ok(watch(
        Arc::new(source),
        request.memo().clone(),
        config.poll,
        sig_down.cancellation_token(),
    )
    .await)
}

fn print_request(request: &PaymentRequest) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "amount: {} {}",
        request.amount(),
        request.currency()
    )?;
    writeln!(out, "memo:   {}", request.memo())?;
    writeln!(out, "pay:    {}", request.qr_payload())?;
    out.flush()
}
