/*!
 * MAC Scheduler Simulator - Main Entry Point
 *
 * Runs a scenario file against the scheduler through the SAP and prints
 * the resulting statistics as JSON.
 *
 * Usage: mac-sched-sim <scenario.json> [scheduler.json] [--realtime]
 */

use cv2x_mac_scheduler::{init_tracing, Scenario, SchedulerConfig, SchedulerError, Simulation};
use miette::{IntoDiagnostic, Result};
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut realtime = false;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--realtime" => realtime = true,
            _ => paths.push(arg),
        }
    }
    let Some(scenario_path) = paths.first() else {
        return Err(SchedulerError::config(
            "usage: mac-sched-sim <scenario.json> [scheduler.json] [--realtime]",
        )
        .into());
    };

    let config = match paths.get(1) {
        Some(path) => SchedulerConfig::from_file(path)?,
        None => SchedulerConfig::from_env()?,
    };
    let scenario = Scenario::from_file(scenario_path)?;
    let mut sim = Simulation::new(config, scenario)?;

    info!(run_id = %sim.scheduler().run_id(), realtime, "simulation starting");

    let trace = if realtime {
        // One TTI per millisecond until done or interrupted
        let mut trace = cv2x_mac_scheduler::AllocationTrace::default();
        let mut interval = tokio::time::interval(Duration::from_millis(1));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        while !sim.is_finished() {
            tokio::select! {
                _ = interval.tick() => trace.push(sim.step()?),
                _ = &mut shutdown => {
                    warn!(tti = sim.tti(), "interrupted, reporting partial run");
                    break;
                }
            }
        }
        trace
    } else {
        sim.run()?
    };

    let report = sim.report(&trace);
    info!(
        ttis = report.ttis,
        dl_bytes = report.stats.dl_bytes,
        ul_bytes = report.stats.ul_bytes,
        "simulation complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&report).into_diagnostic()?
    );
    Ok(())
}
