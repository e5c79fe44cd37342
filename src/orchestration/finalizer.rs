use super::AuctionService;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Periodically close auctions whose end time has passed.
pub fn spawn_finalizer(service: AuctionService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match service.finalize_due().await {
                Ok(0) => {}
                Ok(closed) => info!(closed, "Finalized due auctions"),
                Err(e) => warn!(error = %e, "Finalizer sweep failed"),
            }
        }
    })
}
