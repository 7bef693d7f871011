//! User-flow interaction runner for an ordered instrumentation pipeline.
//!
//! Wires caller-driven page interaction into the middle of a navigation run:
//! a one-shot rendezvous pair hands control to the caller once foundational
//! collection has started, and hands it back when the caller declares the
//! interaction finished. The assembler splices the pause point into the
//! ordered collection graph; the runner owns the run lifecycle around it.

pub mod check;
pub mod collector;
pub mod driver;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod graph;
pub mod rendezvous;
pub mod runner;
pub mod telemetry;

pub use check::{
    placeholder_check, CheckBody, CheckEvaluator, CheckOutcome, CheckSpec, HIDDEN_GROUP,
    PLACEHOLDER_CHECK_ID,
};

pub use collector::{
    interaction_collector, Collector, CollectorBody, CollectorSpec, RunMode, INTERACTION_ARTIFACT,
};

pub use driver::{BrowserDriver, BrowserSession, PageHandle};

pub use error::{FlowError, Result};

pub use executor::{
    ArtifactSet, NavigationRequest, PipelineExecutor, ReportBundle, SettingsOverrides,
};

pub use graph::{
    build_interaction_graph, AssemblyOptions, AssemblyStrategy, CategorySpec, CheckRef, GroupSpec,
    InteractionGraph, PhasePlan, PipelineGraph, PluginSpec, DEVTOOLS_LOG_ARTIFACT,
    PERFORMANCE_CATEGORY, TRACE_ARTIFACT,
};

pub use rendezvous::{rendezvous, SignalHandle, WaitHandle};

pub use runner::{
    FlowRunner, RunPhase, RunnerOptions, DEFAULT_REPORT_PATH, DEFAULT_SETTLE_MS,
};

pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
