//! Run lifecycle controller.
//!
//! A [`FlowRunner`] owns exactly one pipeline run:
//! `idle → running → awaiting-interaction → settling → finished`, with an
//! absorbing `failed` state. While `awaiting-interaction` holds, two tasks
//! are in flight — the pipeline executor (blocked inside the interaction
//! collector) and the caller's interaction code driving the page. The only
//! state they share is the page itself, and by the assembler's ordering
//! invariant no other collector is running during that window.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::driver::{BrowserDriver, BrowserSession, PageHandle};
use crate::error::{FlowError, Result};
use crate::executor::{NavigationRequest, PipelineExecutor, ReportBundle, SettingsOverrides};
use crate::graph::{
    build_interaction_graph, AssemblyOptions, PipelineGraph, PluginSpec, PERFORMANCE_CATEGORY,
};
use crate::rendezvous::SignalHandle;

/// Default settle delay after interaction, in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// Default report path.
pub const DEFAULT_REPORT_PATH: &str = "flow.report.html";

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    Idle,
    Running,
    AwaitingInteraction,
    Settling,
    Finished,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::AwaitingInteraction => "awaiting-interaction",
            RunPhase::Settling => "settling",
            RunPhase::Finished => "finished",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Configuration surface for one run.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Use the replacement assembly strategy instead of the overlay.
    /// Requires a plugin to supply the replacement category.
    pub use_replacement_strategy: bool,
    /// Settle delay applied by `end_navigation` before the pipeline resumes.
    pub settle_ms: u64,
    /// Optional bound on the interaction window. When it expires a watchdog
    /// resumes the pipeline so it can wind down, and the run is failed with
    /// an interaction-timeout error at the next lifecycle call. `None`
    /// preserves the unbounded contract.
    pub interaction_timeout: Option<Duration>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            use_replacement_strategy: false,
            settle_ms: DEFAULT_SETTLE_MS,
            interaction_timeout: None,
        }
    }
}

enum PageSource {
    /// No way to get a page yet; `start_navigation` will reject.
    Unset,
    /// Caller-supplied page, left open after the run.
    Supplied(Arc<dyn PageHandle>),
    /// Launch a browser internally; torn down by `end_navigation`.
    Launch(Arc<dyn BrowserDriver>),
}

enum RunState {
    Idle,
    /// Pipeline launched, not yet yielded to interaction.
    Running,
    AwaitingInteraction {
        page: Arc<dyn PageHandle>,
        owned_session: Option<Arc<dyn BrowserSession>>,
        pipeline: JoinHandle<Result<ReportBundle>>,
        interaction_done: SignalHandle,
        watchdog: Option<JoinHandle<()>>,
    },
    Settling,
    Finished {
        bundle: ReportBundle,
    },
    Failed,
}

/// Owns one pipeline run and bridges it to caller interaction code.
pub struct FlowRunner {
    run_id: Uuid,
    executor: Arc<dyn PipelineExecutor>,
    base_graph: PipelineGraph,
    plugin: Option<PluginSpec>,
    options: RunnerOptions,
    page_source: PageSource,
    state: RunState,
}

impl FlowRunner {
    /// A runner over the given executor and the pipeline's default graph.
    ///
    /// Configure a page source with [`with_page`](Self::with_page) or
    /// [`with_browser`](Self::with_browser) before starting.
    pub fn new(executor: Arc<dyn PipelineExecutor>, base_graph: PipelineGraph) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            executor,
            base_graph,
            plugin: None,
            options: RunnerOptions::default(),
            page_source: PageSource::Unset,
            state: RunState::Idle,
        }
    }

    /// Instrument a caller-supplied page. The page is left open after the
    /// run for the caller to manage.
    pub fn with_page(mut self, page: Arc<dyn PageHandle>) -> Self {
        self.page_source = PageSource::Supplied(page);
        self
    }

    /// Launch a browser internally through the given driver. The session is
    /// torn down when the run ends.
    pub fn with_browser(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.page_source = PageSource::Launch(driver);
        self
    }

    /// Attach a reporting plugin. Overlay runs forward it via settings;
    /// replacement runs use its category and evaluators directly.
    pub fn with_plugin(mut self, plugin: PluginSpec) -> Self {
        self.plugin = Some(plugin);
        self
    }

    /// Set run options.
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Unique id of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        match &self.state {
            RunState::Idle => RunPhase::Idle,
            RunState::Running => RunPhase::Running,
            RunState::AwaitingInteraction { .. } => RunPhase::AwaitingInteraction,
            RunState::Settling => RunPhase::Settling,
            RunState::Finished { .. } => RunPhase::Finished,
            RunState::Failed => RunPhase::Failed,
        }
    }

    /// The live page handle, available while awaiting interaction.
    pub fn page(&self) -> Option<Arc<dyn PageHandle>> {
        match &self.state {
            RunState::AwaitingInteraction { page, .. } => Some(page.clone()),
            _ => None,
        }
    }

    /// The finished run's bundle, available once finished.
    pub fn bundle(&self) -> Option<&ReportBundle> {
        match &self.state {
            RunState::Finished { bundle } => Some(bundle),
            _ => None,
        }
    }

    /// Start the navigation and resolve once the page is ready for
    /// caller-driven interaction.
    ///
    /// Valid only from `idle`. Acquires or launches a page, assembles the
    /// interaction graph, kicks off the pipeline without awaiting its
    /// result, and returns the instrumented page handle when the pipeline
    /// yields. If the pipeline dies before yielding, the run fails and the
    /// executor's error is surfaced as-is.
    pub async fn start_navigation(&mut self, url: &str) -> Result<Arc<dyn PageHandle>> {
        if !matches!(self.state, RunState::Idle) {
            return Err(FlowError::Lifecycle {
                operation: "start_navigation",
                state: self.phase(),
            });
        }

        if matches!(self.page_source, PageSource::Unset) {
            return Err(FlowError::Configuration(
                "no page or browser driver configured".to_string(),
            ));
        }
        let assembly = self.assembly_options()?;

        // Past the synchronous checks; failures from here on fail the run.
        self.state = RunState::Running;
        info!(run_id = %self.run_id, url, "starting navigation");

        let (page, owned_session) = match self.acquire_page().await {
            Ok(acquired) => acquired,
            Err(err) => {
                self.state = RunState::Failed;
                return Err(err);
            }
        };

        let assembled = match build_interaction_graph(&self.base_graph, &assembly) {
            Ok(assembled) => assembled,
            Err(err) => {
                Self::close_session(&owned_session).await;
                self.state = RunState::Failed;
                return Err(err);
            }
        };
        let interaction_done = assembled.resolve_interaction_finished;
        let can_interact = assembled.can_start_user_interaction;

        let request = NavigationRequest {
            url: url.to_string(),
            graph: assembled.graph,
            settings: self.settings_overrides(),
            page: page.clone(),
        };
        let executor = self.executor.clone();
        let mut pipeline = tokio::spawn(async move { executor.run_navigation(request).await });

        // Wait for the pipeline to yield — or to die before yielding.
        tokio::select! {
            _ = can_interact.wait() => {}
            joined = &mut pipeline => {
                Self::close_session(&owned_session).await;
                self.state = RunState::Failed;
                return Err(match joined {
                    Ok(Ok(_)) => FlowError::Executor(anyhow::anyhow!(
                        "pipeline finished without reaching the interaction collector"
                    )),
                    Ok(Err(err)) => err,
                    Err(join_err) => FlowError::Executor(join_err.into()),
                });
            }
        }

        let watchdog = self.options.interaction_timeout.map(|limit| {
            let interaction_done = interaction_done.clone();
            let run_id = self.run_id;
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                if interaction_done.signal() {
                    warn!(run_id = %run_id, limit_ms = limit.as_millis() as u64,
                        "interaction window timed out, resuming pipeline");
                }
            })
        });

        info!(run_id = %self.run_id, "page ready for interaction");
        self.state = RunState::AwaitingInteraction {
            page: page.clone(),
            owned_session,
            pipeline,
            interaction_done,
            watchdog,
        };
        Ok(page)
    }

    /// Declare interaction complete, let the page settle, resume the
    /// pipeline, and await its result.
    ///
    /// Valid only from `awaiting-interaction`. Applies the settle delay,
    /// fires the resume signal (strictly after this call even with a zero
    /// delay), stores the finished bundle, and tears down an internally
    /// launched browser. Caller-supplied pages are left open.
    pub async fn end_navigation(&mut self) -> Result<()> {
        if !matches!(self.state, RunState::AwaitingInteraction { .. }) {
            return Err(FlowError::Lifecycle {
                operation: "end_navigation",
                state: self.phase(),
            });
        }
        let RunState::AwaitingInteraction {
            owned_session,
            pipeline,
            interaction_done,
            watchdog,
            ..
        } = std::mem::replace(&mut self.state, RunState::Settling)
        else {
            unreachable!("state checked above");
        };

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        let limit_ms = self
            .options
            .interaction_timeout
            .map(|limit| limit.as_millis() as u64)
            .unwrap_or(0);

        // The watchdog already resumed the pipeline: the window expired.
        if interaction_done.is_fired() {
            Self::close_session(&owned_session).await;
            self.state = RunState::Failed;
            return Err(FlowError::InteractionTimeout { limit_ms });
        }

        // Let page effects of the interaction stabilize before resuming.
        tokio::time::sleep(Duration::from_millis(self.options.settle_ms)).await;

        // Firing the resume signal is the commit point. Losing the race means
        // an aborted-but-already-running watchdog fired during the settle
        // sleep, so the run still times out rather than finishing quietly.
        if !interaction_done.signal() {
            Self::close_session(&owned_session).await;
            self.state = RunState::Failed;
            return Err(FlowError::InteractionTimeout { limit_ms });
        }

        let bundle = match pipeline.await {
            Ok(Ok(bundle)) => bundle,
            Ok(Err(err)) => {
                Self::close_session(&owned_session).await;
                self.state = RunState::Failed;
                return Err(err);
            }
            Err(join_err) => {
                Self::close_session(&owned_session).await;
                self.state = RunState::Failed;
                return Err(FlowError::Executor(join_err.into()));
            }
        };

        // Only sessions we launched are ours to tear down.
        if let Some(session) = owned_session {
            if let Err(err) = session.close().await {
                self.state = RunState::Failed;
                return Err(err);
            }
        }

        info!(run_id = %self.run_id, "navigation finished");
        self.state = RunState::Finished { bundle };
        Ok(())
    }

    /// Write the rendered report, optionally opening it in a viewer.
    ///
    /// Valid only from `finished`. A failed run writes nothing.
    pub fn save_report(&self, path: Option<&Path>, view: bool) -> Result<()> {
        let RunState::Finished { bundle } = &self.state else {
            return Err(FlowError::Lifecycle {
                operation: "save_report",
                state: self.phase(),
            });
        };

        let path = path.unwrap_or_else(|| Path::new(DEFAULT_REPORT_PATH));
        std::fs::write(path, &bundle.report_html)?;
        info!(run_id = %self.run_id, path = %path.display(), "report written");

        if view {
            open::that_detached(path)?;
        }
        Ok(())
    }

    fn assembly_options(&self) -> Result<AssemblyOptions> {
        if self.options.use_replacement_strategy {
            let plugin = self.plugin.clone().ok_or_else(|| {
                FlowError::Configuration(
                    "replacement strategy requires a plugin for the category".to_string(),
                )
            })?;
            Ok(AssemblyOptions::replace(plugin))
        } else {
            Ok(AssemblyOptions::overlay())
        }
    }

    fn settings_overrides(&self) -> SettingsOverrides {
        if self.options.use_replacement_strategy {
            // The plugin's material is already inlined into the graph.
            SettingsOverrides::html(vec![], vec![PERFORMANCE_CATEGORY.to_string()])
        } else {
            let plugins: Vec<String> = self.plugin.iter().map(|p| p.name.clone()).collect();
            let mut only_categories = plugins.clone();
            only_categories.push(PERFORMANCE_CATEGORY.to_string());
            SettingsOverrides::html(plugins, only_categories)
        }
    }

    async fn acquire_page(&self) -> Result<(Arc<dyn PageHandle>, Option<Arc<dyn BrowserSession>>)> {
        match &self.page_source {
            PageSource::Unset => Err(FlowError::Configuration(
                "no page or browser driver configured".to_string(),
            )),
            PageSource::Supplied(page) => Ok((page.clone(), None)),
            PageSource::Launch(driver) => {
                let session = driver.launch().await?;
                match session.new_page().await {
                    Ok(page) => Ok((page, Some(session))),
                    Err(err) => {
                        Self::close_session(&Some(session)).await;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Best-effort teardown of an internally launched session on failure
    /// paths; the run's own error stays the one surfaced.
    async fn close_session(owned_session: &Option<Arc<dyn BrowserSession>>) {
        if let Some(session) = owned_session {
            if let Err(err) = session.close().await {
                warn!(error = %err, "failed to close launched browser session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RunnerOptions::default();
        assert!(!options.use_replacement_strategy);
        assert_eq!(options.settle_ms, DEFAULT_SETTLE_MS);
        assert!(options.interaction_timeout.is_none());
    }

    #[test]
    fn test_phase_display_is_kebab_case() {
        assert_eq!(RunPhase::AwaitingInteraction.to_string(), "awaiting-interaction");
        assert_eq!(RunPhase::Idle.to_string(), "idle");
        assert_eq!(RunPhase::Failed.to_string(), "failed");
    }
}
