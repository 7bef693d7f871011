//! Collection units and the interaction collector.
//!
//! A [`CollectorSpec`] is a named unit of collection with declared inputs and
//! a tagged execution body — either resolved by the external executor by name
//! or supplied inline. The interaction collector is the synchronization point
//! injected into the pipeline: its body yields to caller interaction code and
//! only returns once that code signals completion.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::rendezvous::{SignalHandle, WaitHandle};

/// Artifact id of the interaction collector.
pub const INTERACTION_ARTIFACT: &str = "UserInteraction";

/// Collection modes a unit can run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Full page navigation from a cold load.
    Navigation,
    /// Time-span capture over an already-loaded page.
    Timespan,
}

/// Execution body of an inline collector.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Produce this collector's artifact value.
    async fn collect(&self) -> Result<serde_json::Value>;
}

/// How a collector's body is resolved at run time.
#[derive(Clone)]
pub enum CollectorBody {
    /// Resolved by the pipeline executor from its own catalog, by id.
    Builtin,
    /// Supplied by the embedder and run in-process.
    Inline(Arc<dyn Collector>),
}

impl fmt::Debug for CollectorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorBody::Builtin => f.write_str("Builtin"),
            CollectorBody::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// A named unit of collection with declared dependencies.
///
/// The dependency relation across the specs used by a run must be acyclic;
/// the executor honors the per-phase artifact sequence as the actual
/// execution order, so a spec's `requires` must all appear earlier in any
/// phase that includes it.
#[derive(Debug, Clone)]
pub struct CollectorSpec {
    /// Artifact id this collector produces.
    pub id: String,
    /// Artifact ids this collector needs before it can run.
    pub requires: Vec<String>,
    /// Modes this collector supports.
    pub modes: Vec<RunMode>,
    /// Execution body.
    pub body: CollectorBody,
}

impl CollectorSpec {
    /// Spec for a collector the executor resolves from its own catalog.
    pub fn builtin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requires: Vec::new(),
            modes: vec![RunMode::Navigation, RunMode::Timespan],
            body: CollectorBody::Builtin,
        }
    }

    /// Spec for an inline collector run in-process.
    pub fn inline(id: impl Into<String>, body: Arc<dyn Collector>) -> Self {
        Self {
            id: id.into(),
            requires: Vec::new(),
            modes: vec![RunMode::Navigation, RunMode::Timespan],
            body: CollectorBody::Inline(body),
        }
    }

    /// Declare artifacts that must be collected before this one.
    pub fn with_requires(mut self, requires: &[&str]) -> Self {
        self.requires = requires.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Whether this collector can run in the given mode.
    pub fn supports(&self, mode: RunMode) -> bool {
        self.modes.contains(&mode)
    }
}

/// The collector body that pauses the pipeline for caller interaction.
///
/// Invoked by the executor after page-load quiescence but before trace and
/// network-log finalization. Strictly in order: fire `can_interact`, block on
/// `interaction_done`, return an empty artifact. The artifact value carries
/// no data — the collector exists to occupy a slot in the ordered graph so
/// the executor neither prunes it nor finalizes collection early. If the
/// executor cancels the run, dropping this future drops the wait with it.
struct InteractionCollector {
    can_interact: SignalHandle,
    interaction_done: WaitHandle,
}

#[async_trait]
impl Collector for InteractionCollector {
    async fn collect(&self) -> Result<serde_json::Value> {
        debug!("yielding pipeline to caller interaction code");
        self.can_interact.signal();
        self.interaction_done.wait().await;
        debug!("interaction finished, resuming pipeline");
        Ok(json!({}))
    }
}

/// Build the interaction collector spec around a run's rendezvous halves.
pub fn interaction_collector(
    can_interact: SignalHandle,
    interaction_done: WaitHandle,
) -> CollectorSpec {
    CollectorSpec::inline(
        INTERACTION_ARTIFACT,
        Arc::new(InteractionCollector {
            can_interact,
            interaction_done,
        }),
    )
}
