//! The same search flow with the replacement strategy: the performance
//! category is swapped wholesale for the web-vitals category and the
//! plugin's evaluators run inlined in the graph.
//!
//! ```sh
//! cargo run --example replaced_category
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

    let executor = Arc::new(SimExecutor::new().with_trace_events(json!([
        {"name": "FirstInputDelay::AllFrames::UMA",
         "args": {"data": {"firstInputDelayInMilliseconds": 92.0}}},
        {"name": "Responsiveness.Renderer.UserInteraction",
         "args": {"data": {"interactionType": "keyboard",
                           "maxDuration": 64.0, "totalDuration": 128.0}}},
    ])));

    let mut runner = FlowRunner::new(executor, PipelineGraph::default_navigation())
        .with_browser(SimDriver::new())
        .with_plugin(web_vitals_plugin())
        .with_options(RunnerOptions {
            use_replacement_strategy: true,
            settle_ms: 500,
            ..Default::default()
        });

    let page = runner.start_navigation("https://www.khanacademy.org/").await?;

    let _ = page.click("[data-test-id=\"site-banner-dismiss\"]").await;
    page.click("[data-test-id=\"mobile-search-button\"]").await?;
    page.wait_for_selector(SEARCH_BOX).await?;
    page.click(SEARCH_BOX).await?;
    page.type_text(SEARCH_BOX, "machine learning", Some(Duration::from_millis(20)))
        .await?;

    runner.end_navigation().await?;
    runner.save_report(Some(Path::new("khan-replaced.report.html")), false)?;
    Ok(())
}
