use crate::cycle::CycleOrchestrator;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Fires the orchestrator on a fixed period, forever. The cycle is
/// awaited inline, so cycles never overlap: if one runs past the period
/// the next tick is simply delayed. Item-level failures never stop the
/// timer.
pub async fn run(orchestrator: &CycleOrchestrator, period: Duration) {
    info!("scheduler started, one cycle every {:?}", period);

    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        match orchestrator.run_cycle().await {
            Ok(report) => info!(
                "cycle finished: {} delivered, {} failed",
                report.delivered, report.failed
            ),
            Err(err) => error!("cycle failed: {}", err),
        }
    }
}
