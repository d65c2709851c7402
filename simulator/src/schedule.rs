use crate::roster::User;
use crate::sender::Sender;
use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// What to do when a tick is due while the previous one is still sending
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverlapPolicy {
    /// Run ticks back to back; ticks missed during a slow one are dropped
    Skip,
    /// Start every tick on time in its own task, even if others are running
    Concurrent,
}

/// Sends one round of readings immediately, then one every `period`,
/// forever.
pub async fn run(sender: Sender, roster: Arc<Vec<User>>, period: Duration, policy: OverlapPolicy) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick = 0u64;

    loop {
        // The first tick completes immediately
        ticker.tick().await;
        tick += 1;

        match policy {
            OverlapPolicy::Skip => run_tick(&sender, &roster, tick, period).await,
            OverlapPolicy::Concurrent => {
                let sender = sender.clone();
                let roster = roster.clone();
                tokio::spawn(async move {
                    run_tick(&sender, &roster, tick, period).await;
                });
            }
        }
    }
}

async fn run_tick(sender: &Sender, roster: &[User], tick: u64, period: Duration) {
    let start = Instant::now();
    match sender.send_all(roster).await {
        Ok(sent) => info!(tick, sent, "All data sent successfully for all users"),
        Err(e) => error!(tick, "Error sending data: {:#}", e),
    }

    let elapsed = start.elapsed();
    if elapsed > period {
        warn!(
            tick,
            "Tick took {:?}, longer than the {:?} interval",
            elapsed, period
        );
    }
}
