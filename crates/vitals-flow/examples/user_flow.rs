//! Scripted search flow with the overlay strategy.
//!
//! Runs the whole lifecycle against the simulation doubles: start the
//! navigation, drive a search interaction while the pipeline is paused, end
//! the navigation, and write the rendered report.
//!
//! ```sh
//! cargo run --example user_flow
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::Level;
use vitals_flow::fakes::{SimDriver, SimExecutor};
use vitals_flow::{init_tracing, FlowRunner, PipelineGraph, RunnerOptions};
use web_vitals_plugin::web_vitals_plugin;

const SEARCH_BOX: &str = "#mobile-search-form-container input[name=\"page_search_query\"]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false, Level::INFO);

    let executor = Arc::new(
        SimExecutor::new()
            .with_plugin(web_vitals_plugin())
            .with_trace_events(json!([
                {"name": "FirstInputDelay::AllFrames::UMA",
                 "args": {"data": {"firstInputDelayInMilliseconds": 17.0}}},
            ])),
    );

    let mut runner = FlowRunner::new(executor, PipelineGraph::default_navigation())
        .with_browser(SimDriver::new())
        .with_plugin(web_vitals_plugin())
        .with_options(RunnerOptions {
            settle_ms: 500,
            ..Default::default()
        });

    let page = runner.start_navigation("https://www.khanacademy.org/").await?;

    // Dismiss the site banner if visible.
    let _ = page.click("[data-test-id=\"site-banner-dismiss\"]").await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    page.click("[data-test-id=\"mobile-search-button\"]").await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    // The textbox may not be selected yet, click to make sure.
    page.wait_for_selector(SEARCH_BOX).await?;
    page.click(SEARCH_BOX).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    page.type_text(SEARCH_BOX, "machine learning", Some(Duration::from_millis(20)))
        .await?;

    runner.end_navigation().await?;
    runner.save_report(Some(Path::new("khan-sample.report.html")), false)?;
    Ok(())
}
