//! Contract with the external instrumentation pipeline executor.
//!
//! The executor is a black box to this crate: it accepts an assembled graph
//! plus settings overrides, runs each phase's collector sequence against the
//! live page, scores the checks, and hands back a result bundle. The one
//! property this crate leans on is the sequential-order contract — collectors
//! run in the exact order their phase lists them, never concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::driver::PageHandle;
use crate::error::Result;
use crate::graph::PipelineGraph;

/// Collected artifacts keyed by artifact id.
pub type ArtifactSet = BTreeMap<String, serde_json::Value>;

/// Settings overrides forwarded to the executor alongside the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsOverrides {
    /// Report output format (`"html"` for a rendered document).
    pub output: Option<String>,
    /// Reporting plugins to resolve by name.
    pub plugins: Vec<String>,
    /// Restrict scoring to these categories.
    pub only_categories: Vec<String>,
}

impl SettingsOverrides {
    /// Overrides for a rendered HTML report over the given categories.
    pub fn html(plugins: Vec<String>, only_categories: Vec<String>) -> Self {
        Self {
            output: Some("html".to_string()),
            plugins,
            only_categories,
        }
    }
}

/// One navigation run handed to the executor.
pub struct NavigationRequest {
    /// Target URL.
    pub url: String,
    /// Assembled collection graph; phase order is the dependency contract.
    pub graph: PipelineGraph,
    /// Settings overrides.
    pub settings: SettingsOverrides,
    /// The page the run instruments. Interaction performed through this
    /// same handle is observed by the in-flight collectors.
    pub page: Arc<dyn PageHandle>,
}

/// Immutable output of a finished run.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    /// Raw result record (scores, audit outcomes, timing metadata).
    pub result: serde_json::Value,
    /// Rendered, self-contained report document.
    pub report_html: String,
}

/// External pipeline executor.
///
/// Implementations must honor each phase's artifact sequence strictly in
/// order: a collector starts only after the previous one in the sequence has
/// returned. Failures are implementor-defined and surfaced unchanged.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Run a navigation with the assembled graph and produce the bundle.
    async fn run_navigation(&self, request: NavigationRequest) -> Result<ReportBundle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_settings() {
        let settings = SettingsOverrides::html(
            vec!["web-vitals-plugin".to_string()],
            vec!["web-vitals-plugin".to_string(), "performance".to_string()],
        );
        assert_eq!(settings.output.as_deref(), Some("html"));
        assert_eq!(settings.plugins.len(), 1);
        assert_eq!(settings.only_categories.len(), 2);
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let settings = SettingsOverrides::html(vec![], vec!["performance".to_string()]);
        let json = serde_json::to_string(&settings).unwrap();
        let back: SettingsOverrides = serde_json::from_str(&json).unwrap();
        assert_eq!(back.output.as_deref(), Some("html"));
        assert_eq!(back.only_categories, vec!["performance".to_string()]);
    }
}
