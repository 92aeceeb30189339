//! `fisk drill` – exercise the client against a synthetic flaky upstream.

use anyhow::Result;
use fisk_core::config::FiskConfig;
use fisk_core::drill::{run_drill as drill, DrillOptions};

pub async fn run_drill(cfg: FiskConfig, requests: u32, fail_rate: f64) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&fail_rate),
        "fail rate must be between 0 and 1"
    );
    println!("running {requests} requests at {:.0}% failure rate...", fail_rate * 100.0);
    let report = drill(cfg, DrillOptions { requests, fail_rate }).await;

    println!();
    println!("succeeded:           {}", report.succeeded);
    println!("failed:              {}", report.failed);
    println!("rejected by circuit: {}", report.rejected_by_circuit);
    println!("upstream attempts:   {}", report.total_attempts);
    println!("final circuit state: {}", report.final_state.as_str());
    if let Some(at) = report.circuit.half_open_probe_at_ms {
        println!("next probe at (unix ms): {at}");
    }
    Ok(())
}
