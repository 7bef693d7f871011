//! Simulation doubles for the external contracts.
//!
//! [`SimExecutor`] is a miniature in-process pipeline: it honors the
//! sequential per-phase artifact order, prunes collectors no check consumes,
//! resolves registered plugins from settings, evaluates inline checks, and
//! renders a minimal report. [`SimPage`] records every command driven through
//! it. Together they let the lifecycle and assembly layers be exercised
//! without a browser or a real pipeline.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::check::{CheckBody, CheckOutcome, CheckSpec};
use crate::collector::CollectorBody;
use crate::driver::{BrowserDriver, BrowserSession, PageHandle};
use crate::error::{FlowError, Result};
use crate::executor::{ArtifactSet, NavigationRequest, PipelineExecutor, ReportBundle};
use crate::graph::{CategorySpec, PluginSpec, DEVTOOLS_LOG_ARTIFACT, TRACE_ARTIFACT};

/// One command driven through a [`SimPage`].
#[derive(Debug, Clone, PartialEq)]
pub enum PageCommand {
    Goto(String),
    Click(String),
    TypeText { selector: String, text: String },
    WaitForSelector(String),
    SendCommand(String),
}

/// Page double that records every command.
#[derive(Default)]
pub struct SimPage {
    commands: Mutex<Vec<PageCommand>>,
}

impl SimPage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything driven through this page so far, in order.
    pub fn commands(&self) -> Vec<PageCommand> {
        self.commands.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, command: PageCommand) {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command);
    }
}

#[async_trait]
impl PageHandle for SimPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(PageCommand::Goto(url.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(PageCommand::Click(selector.to_string()));
        Ok(())
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        _key_delay: Option<Duration>,
    ) -> Result<()> {
        self.record(PageCommand::TypeText {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.record(PageCommand::WaitForSelector(selector.to_string()));
        Ok(())
    }

    async fn send_command(
        &self,
        method: &str,
        _params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.record(PageCommand::SendCommand(method.to_string()));
        Ok(json!({}))
    }
}

/// Browser session double; tracks whether it was torn down.
pub struct SimSession {
    page: Arc<SimPage>,
    closed: AtomicBool,
}

impl SimSession {
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserSession for SimSession {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
        Ok(self.page.clone())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Driver double that hands out one shared [`SimSession`] per launch.
#[derive(Default)]
pub struct SimDriver {
    launches: AtomicUsize,
    last_session: Mutex<Option<Arc<SimSession>>>,
}

impl SimDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// The most recently launched session, for teardown assertions.
    pub fn last_session(&self) -> Option<Arc<SimSession>> {
        self.last_session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl BrowserDriver for SimDriver {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(SimSession {
            page: SimPage::new(),
            closed: AtomicBool::new(false),
        });
        *self.last_session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(session)
    }
}

/// In-process pipeline executor over an assembled graph.
pub struct SimExecutor {
    /// Synthetic `traceEvents` for the builtin trace collector.
    trace_events: serde_json::Value,
    /// Plugins resolvable by name from settings overrides.
    plugins: Vec<PluginSpec>,
    /// Fail the run before any collector starts.
    fail_before_interaction: bool,
    /// Log of `collect:<id>` / `check:<id>` steps, in execution order.
    steps: Arc<Mutex<Vec<String>>>,
}

impl Default for SimExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimExecutor {
    pub fn new() -> Self {
        Self {
            trace_events: json!([]),
            plugins: Vec::new(),
            fail_before_interaction: false,
            steps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed the synthetic trace with the given `traceEvents` array.
    pub fn with_trace_events(mut self, events: serde_json::Value) -> Self {
        self.trace_events = events;
        self
    }

    /// Register a plugin the executor can resolve by name.
    pub fn with_plugin(mut self, plugin: PluginSpec) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Make the run die before reaching any collector.
    pub fn failing_early(mut self) -> Self {
        self.fail_before_interaction = true;
        self
    }

    /// Execution-order log of collector and check steps.
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn log(&self, step: String) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(step);
    }

    fn builtin_artifact(&self, id: &str) -> serde_json::Value {
        match id {
            TRACE_ARTIFACT => json!({ "traceEvents": self.trace_events }),
            DEVTOOLS_LOG_ARTIFACT => json!([]),
            _ => json!(null),
        }
    }

    fn score_category(
        category: &CategorySpec,
        outcomes: &serde_json::Map<String, serde_json::Value>,
    ) -> Option<f64> {
        let mut total_weight = 0.0;
        let mut acc = 0.0;
        for reference in &category.refs {
            if reference.weight <= 0.0 {
                continue;
            }
            let score = outcomes
                .get(&reference.id)
                .and_then(|o| o.get("score"))
                .and_then(|s| s.as_f64())?;
            total_weight += reference.weight;
            acc += score * reference.weight;
        }
        if total_weight > 0.0 {
            Some(acc / total_weight)
        } else {
            None
        }
    }
}

#[async_trait]
impl PipelineExecutor for SimExecutor {
    async fn run_navigation(&self, request: NavigationRequest) -> Result<ReportBundle> {
        if self.fail_before_interaction {
            return Err(FlowError::Executor(anyhow::anyhow!(
                "simulated executor failure before collection"
            )));
        }

        let mut graph = request.graph;
        for name in &request.settings.plugins {
            let plugin = self
                .plugins
                .iter()
                .find(|p| &p.name == name)
                .ok_or_else(|| {
                    FlowError::Configuration(format!("unknown plugin '{name}' in settings"))
                })?;
            graph.checks.extend(plugin.checks.iter().cloned());
            graph
                .categories
                .insert(plugin.name.clone(), plugin.category.clone());
            for (id, group) in &plugin.groups {
                graph.groups.insert(id.clone(), group.clone());
            }
        }
        graph.validate()?;

        request.page.goto(&request.url).await?;

        // Prune: an artifact survives only if some check consumes it or it is
        // foundational. This is what the placeholder check defends against.
        let consumed: BTreeSet<&str> = graph
            .checks
            .iter()
            .flat_map(|c| c.required_artifacts.iter().map(String::as_str))
            .chain([DEVTOOLS_LOG_ARTIFACT, TRACE_ARTIFACT])
            .collect();

        let mut artifacts = ArtifactSet::new();
        for phase in &graph.phases {
            for id in &phase.artifacts {
                if !consumed.contains(id.as_str()) {
                    debug!(artifact = %id, "pruned: no check consumes it");
                    continue;
                }
                let spec = graph.collector(id).ok_or_else(|| {
                    FlowError::Configuration(format!("no collector for artifact '{id}'"))
                })?;
                self.log(format!("collect:{id}"));
                let value = match &spec.body {
                    CollectorBody::Builtin => self.builtin_artifact(id),
                    CollectorBody::Inline(body) => body.collect().await?,
                };
                artifacts.insert(id.clone(), value);
            }
        }

        let mut outcomes = serde_json::Map::new();
        let in_scope = |check: &CheckSpec| {
            check
                .required_artifacts
                .iter()
                .all(|a| artifacts.contains_key(a))
        };
        for check in graph.checks.iter().filter(|c| in_scope(c)) {
            self.log(format!("check:{}", check.id));
            let outcome = match &check.body {
                CheckBody::Builtin => CheckOutcome::scored(1.0),
                CheckBody::Inline(body) => body.evaluate(&artifacts)?,
            };
            outcomes.insert(check.id.clone(), serde_json::to_value(&outcome)?);
        }

        let only = &request.settings.only_categories;
        let mut categories = serde_json::Map::new();
        for (id, category) in &graph.categories {
            if !only.is_empty() && !only.contains(id) {
                continue;
            }
            categories.insert(
                id.clone(),
                json!({
                    "title": category.title,
                    "score": Self::score_category(category, &outcomes),
                }),
            );
        }

        let result = json!({
            "requestedUrl": request.url,
            "fetchTime": chrono::Utc::now().to_rfc3339(),
            "audits": outcomes,
            "categories": categories,
        });
        let report_html = format!(
            "<!doctype html><html><body><h1>Report for {}</h1><pre>{}</pre></body></html>",
            request.url,
            serde_json::to_string_pretty(&result)?
        );
        Ok(ReportBundle {
            result,
            report_html,
        })
    }
}
