//! Value types for the ordered collection graph.
//!
//! The executor in this ecosystem is order-driven, not a free scheduler: the
//! position of an artifact id inside a phase's sequence *is* the dependency
//! contract. Graphs are plain values — assembly produces fresh ones and never
//! mutates a shared default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::check::CheckSpec;
use crate::collector::CollectorSpec;
use crate::error::{FlowError, Result};

/// Network-log stream capture; one of the two foundational artifacts every
/// phase depends on.
pub const DEVTOOLS_LOG_ARTIFACT: &str = "DevtoolsLog";

/// Trace capture; the other foundational artifact.
pub const TRACE_ARTIFACT: &str = "Trace";

/// Category id of the default performance scoring category.
pub const PERFORMANCE_CATEGORY: &str = "performance";

/// One navigation or time-span segment with its ordered collector sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasePlan {
    /// Phase id (`"default"` for the single-navigation case).
    pub id: String,
    /// Artifact ids in the exact order the executor will collect them.
    pub artifacts: Vec<String>,
    /// Pause after first contentful paint before proceeding, in ms.
    pub pause_after_fcp_ms: Option<u64>,
    /// Pause after the load event before proceeding, in ms.
    pub pause_after_load_ms: Option<u64>,
    /// Network quiet threshold for load quiescence, in ms.
    pub network_quiet_ms: Option<u64>,
    /// CPU quiet threshold for load quiescence, in ms.
    pub cpu_quiet_ms: Option<u64>,
}

impl PhasePlan {
    /// A phase with the given ordered artifacts and default quiescence.
    pub fn new(id: impl Into<String>, artifacts: &[&str]) -> Self {
        Self {
            id: id.into(),
            artifacts: artifacts.iter().map(|a| a.to_string()).collect(),
            pause_after_fcp_ms: None,
            pause_after_load_ms: None,
            network_quiet_ms: None,
            cpu_quiet_ms: None,
        }
    }

    /// Set all four quiescence thresholds to the same value.
    pub fn with_quiet_thresholds_ms(mut self, ms: u64) -> Self {
        self.pause_after_fcp_ms = Some(ms);
        self.pause_after_load_ms = Some(ms);
        self.network_quiet_ms = Some(ms);
        self.cpu_quiet_ms = Some(ms);
        self
    }

    /// Position of an artifact in this phase's sequence.
    pub fn position_of(&self, artifact: &str) -> Option<usize> {
        self.artifacts.iter().position(|a| a == artifact)
    }
}

/// A weighted reference from a category to a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRef {
    pub id: String,
    pub weight: f64,
    pub group: Option<String>,
}

impl CheckRef {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A scoring category: a titled, weighted set of check references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub title: String,
    pub description: Option<String>,
    pub refs: Vec<CheckRef>,
}

impl CategorySpec {
    pub fn new(title: impl Into<String>, refs: Vec<CheckRef>) -> Self {
        Self {
            title: title.into(),
            description: None,
            refs,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named report group (e.g. the conventionally hidden one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub title: String,
}

/// A reporting plugin: extra checks plus the category presenting them.
#[derive(Debug, Clone)]
pub struct PluginSpec {
    /// Name used in settings overrides to select the plugin.
    pub name: String,
    /// Evaluators the plugin contributes.
    pub checks: Vec<CheckSpec>,
    /// The category presenting the plugin's results.
    pub category: CategorySpec,
    /// Plugin-local report groups.
    pub groups: BTreeMap<String, GroupSpec>,
}

/// The full ordered artifact/navigation graph handed to the executor.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    /// Every collector the run may use, keyed by id through `collector()`.
    pub collectors: Vec<CollectorSpec>,
    /// Ordered collector sequences per phase.
    pub phases: Vec<PhasePlan>,
    /// Scoring checks.
    pub checks: Vec<CheckSpec>,
    /// Scoring categories keyed by category id.
    pub categories: BTreeMap<String, CategorySpec>,
    /// Report groups keyed by group id.
    pub groups: BTreeMap<String, GroupSpec>,
}

impl PipelineGraph {
    /// The stock single-navigation graph: foundational stream captures
    /// first, DOM-reading collectors after, and a performance category over
    /// the builtin paint/layout checks.
    pub fn default_navigation() -> Self {
        let collectors = vec![
            CollectorSpec::builtin(DEVTOOLS_LOG_ARTIFACT),
            CollectorSpec::builtin(TRACE_ARTIFACT),
            CollectorSpec::builtin("TraceElements").with_requires(&[TRACE_ARTIFACT]),
            CollectorSpec::builtin("ImageElements").with_requires(&[DEVTOOLS_LOG_ARTIFACT]),
        ];
        let phase = PhasePlan::new(
            "default",
            &[
                DEVTOOLS_LOG_ARTIFACT,
                TRACE_ARTIFACT,
                "TraceElements",
                "ImageElements",
            ],
        );
        let checks = vec![
            CheckSpec::builtin("largest-contentful-paint")
                .with_required_artifacts(&[TRACE_ARTIFACT]),
            CheckSpec::builtin("cumulative-layout-shift")
                .with_required_artifacts(&[TRACE_ARTIFACT]),
            CheckSpec::builtin("largest-contentful-paint-element")
                .with_required_artifacts(&[TRACE_ARTIFACT, "TraceElements"]),
            CheckSpec::builtin("unsized-images").with_required_artifacts(&["ImageElements"]),
        ];
        let mut categories = BTreeMap::new();
        categories.insert(
            PERFORMANCE_CATEGORY.to_string(),
            CategorySpec::new(
                "Performance",
                vec![
                    CheckRef::new("largest-contentful-paint", 1.0),
                    CheckRef::new("cumulative-layout-shift", 1.0),
                    // Diagnostics: presented but never weighed.
                    CheckRef::new("largest-contentful-paint-element", 0.0),
                    CheckRef::new("unsized-images", 0.0),
                ],
            ),
        );
        Self {
            collectors,
            phases: vec![phase],
            checks,
            categories,
            groups: BTreeMap::new(),
        }
    }

    /// Look up a collector spec by artifact id.
    pub fn collector(&self, id: &str) -> Option<&CollectorSpec> {
        self.collectors.iter().find(|c| c.id == id)
    }

    /// Look up a check spec by id.
    pub fn check(&self, id: &str) -> Option<&CheckSpec> {
        self.checks.iter().find(|c| c.id == id)
    }

    /// Verify the order invariant: in every phase, each listed collector's
    /// declared inputs appear earlier in that phase's sequence, and every
    /// listed artifact has a collector.
    pub fn validate(&self) -> Result<()> {
        for phase in &self.phases {
            for (index, artifact) in phase.artifacts.iter().enumerate() {
                let spec = self.collector(artifact).ok_or_else(|| {
                    FlowError::Configuration(format!(
                        "phase '{}' lists artifact '{}' with no collector",
                        phase.id, artifact
                    ))
                })?;
                for required in &spec.requires {
                    match phase.position_of(required) {
                        Some(pos) if pos < index => {}
                        Some(_) => {
                            return Err(FlowError::Configuration(format!(
                                "phase '{}': '{}' requires '{}' but is ordered before it",
                                phase.id, artifact, required
                            )));
                        }
                        None => {
                            return Err(FlowError::Configuration(format!(
                                "phase '{}': '{}' requires '{}' which the phase does not collect",
                                phase.id, artifact, required
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorSpec;

    fn graph_with_phase(artifacts: &[&str]) -> PipelineGraph {
        PipelineGraph {
            collectors: artifacts
                .iter()
                .map(|a| CollectorSpec::builtin(*a))
                .collect(),
            phases: vec![PhasePlan::new("default", artifacts)],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_ordered_requires() {
        let mut graph = graph_with_phase(&["Trace", "TraceElements"]);
        graph.collectors[1] = CollectorSpec::builtin("TraceElements").with_requires(&["Trace"]);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_order() {
        let mut graph = graph_with_phase(&["TraceElements", "Trace"]);
        graph.collectors[0] = CollectorSpec::builtin("TraceElements").with_requires(&["Trace"]);
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("ordered before"));
    }

    #[test]
    fn test_validate_rejects_unknown_artifact() {
        let mut graph = graph_with_phase(&["Trace"]);
        graph.phases[0].artifacts.push("Ghost".to_string());
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("no collector"));
    }

    #[test]
    fn test_default_navigation_graph_is_valid() {
        let graph = PipelineGraph::default_navigation();
        assert!(graph.validate().is_ok());
        assert!(graph.categories.contains_key(PERFORMANCE_CATEGORY));
        let phase = &graph.phases[0];
        assert_eq!(phase.position_of(DEVTOOLS_LOG_ARTIFACT), Some(0));
        assert_eq!(phase.position_of(TRACE_ARTIFACT), Some(1));
    }

    #[test]
    fn test_quiet_thresholds_builder() {
        let phase = PhasePlan::new("default", &["Trace"]).with_quiet_thresholds_ms(1000);
        assert_eq!(phase.pause_after_fcp_ms, Some(1000));
        assert_eq!(phase.pause_after_load_ms, Some(1000));
        assert_eq!(phase.network_quiet_ms, Some(1000));
        assert_eq!(phase.cpu_quiet_ms, Some(1000));
    }
}
