mod roster;
mod schedule;
mod sender;
mod telemetry;

use clap::Parser;
use roster::build_roster;
use schedule::OverlapPolicy;
use sender::Sender;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Posts synthetic air purifier readings to the ingestor on a fixed interval
#[derive(Debug, Parser)]
#[command(name = "simulator")]
struct Args {
    /// Ingestor write endpoint
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:3000/write")]
    server_url: String,

    /// Seconds between two rounds of readings
    #[arg(
        long,
        env = "INTERVAL_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_secs: u64,

    #[arg(long, env = "USERS", default_value_t = 10)]
    users: usize,

    #[arg(long, env = "DEVICES_PER_USER", default_value_t = 3)]
    devices_per_user: usize,

    /// What to do when a round is still sending as the next one is due
    #[arg(long, env = "OVERLAP", value_enum, default_value_t = OverlapPolicy::Skip)]
    overlap: OverlapPolicy,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!(
        "Starting air purifier client simulator for {} users",
        args.users
    );
    info!(
        "Server: {}, Interval: {}s, Devices per user: {}, Overlap: {:?}",
        args.server_url, args.interval_secs, args.devices_per_user, args.overlap
    );

    let roster = Arc::new(build_roster(args.users, args.devices_per_user));
    let sender = Sender::new(reqwest::Client::new(), args.server_url);
    let period = Duration::from_secs(args.interval_secs);

    tokio::select! {
        _ = schedule::run(sender, roster, period, args.overlap) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Simulator stopped");
}
