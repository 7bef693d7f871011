//! Assembly of the interaction graph.
//!
//! Takes the pipeline's default collection graph and produces a fresh graph
//! with the interaction collector spliced in, plus the externally visible
//! rendezvous halves the run lifecycle controller bridges to its caller.
//!
//! The load-bearing invariant lives here: the interaction collector must run
//! after the two foundational stream captures (network log, trace) and before
//! every other collector, because those others read DOM/page state that the
//! caller's interaction is expected to have settled by the time they run.
//! Get the position wrong and collectors race the interaction instead of
//! observing its effects.

use std::collections::BTreeMap;

use tracing::debug;

use crate::check::{placeholder_check, HIDDEN_GROUP, PLACEHOLDER_CHECK_ID};
use crate::collector::{interaction_collector, INTERACTION_ARTIFACT};
use crate::error::{FlowError, Result};
use crate::graph::model::{
    CheckRef, GroupSpec, PhasePlan, PipelineGraph, PluginSpec, DEVTOOLS_LOG_ARTIFACT,
    PERFORMANCE_CATEGORY, TRACE_ARTIFACT,
};
use crate::rendezvous::{rendezvous, SignalHandle, WaitHandle};

/// How the interaction collector is combined with the base graph.
#[derive(Debug, Clone)]
pub enum AssemblyStrategy {
    /// Append the interaction collector and its placeholder check onto the
    /// base graph, leaving all default collection and weighting intact.
    /// Custom metrics, if any, ride along as a plugin via settings.
    Overlay,
    /// Reconstruct each phase's ordering explicitly (the executor exposes no
    /// merge operation, and a blind append would break the order invariant),
    /// replace the performance category wholesale with the plugin's, and
    /// inline the plugin's evaluators as checks.
    Replace { plugin: PluginSpec },
}

/// Options for [`build_interaction_graph`].
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub strategy: AssemblyStrategy,
}

impl AssemblyOptions {
    pub fn overlay() -> Self {
        Self {
            strategy: AssemblyStrategy::Overlay,
        }
    }

    pub fn replace(plugin: PluginSpec) -> Self {
        Self {
            strategy: AssemblyStrategy::Replace { plugin },
        }
    }
}

/// Output of assembly: the graph plus the rendezvous halves the lifecycle
/// controller hands to caller code.
#[derive(Debug)]
pub struct InteractionGraph {
    pub graph: PipelineGraph,
    /// Resolves when the pipeline has yielded and the page is ready for
    /// caller-driven interaction.
    pub can_start_user_interaction: WaitHandle,
    /// Fired by the controller when interaction is complete, letting the
    /// pipeline resume.
    pub resolve_interaction_finished: SignalHandle,
}

/// Build the interaction graph from the pipeline's default graph.
///
/// Pure with respect to `base`: returns a fresh graph, never mutates the
/// input, and identical inputs produce structurally identical sequences
/// (modulo the per-call rendezvous handles).
///
/// Fails with a configuration error if any phase lacks the two foundational
/// artifacts the ordering rule anchors on, or if the base graph already
/// contains an interaction collector.
pub fn build_interaction_graph(
    base: &PipelineGraph,
    options: &AssemblyOptions,
) -> Result<InteractionGraph> {
    let (can_interact_signal, can_interact_wait) = rendezvous();
    let (interaction_done_signal, interaction_done_wait) = rendezvous();

    if base.collector(INTERACTION_ARTIFACT).is_some() {
        return Err(FlowError::Configuration(format!(
            "base graph already contains a '{INTERACTION_ARTIFACT}' collector"
        )));
    }

    let mut graph = match &options.strategy {
        AssemblyStrategy::Overlay => overlay(base)?,
        AssemblyStrategy::Replace { plugin } => replace(base, plugin)?,
    };

    graph
        .collectors
        .push(interaction_collector(can_interact_signal, interaction_done_wait));
    graph.checks.push(placeholder_check());

    debug!(
        phases = graph.phases.len(),
        collectors = graph.collectors.len(),
        "assembled interaction graph"
    );

    Ok(InteractionGraph {
        graph,
        can_start_user_interaction: can_interact_wait,
        resolve_interaction_finished: interaction_done_signal,
    })
}

/// Splice the interaction artifact into a phase: strictly after both
/// foundational artifacts, strictly before everything else.
fn splice_interaction(phase: &mut PhasePlan) -> Result<()> {
    let log_pos = phase.position_of(DEVTOOLS_LOG_ARTIFACT).ok_or_else(|| {
        FlowError::Configuration(format!(
            "phase '{}' is missing foundational artifact '{DEVTOOLS_LOG_ARTIFACT}'",
            phase.id
        ))
    })?;
    let trace_pos = phase.position_of(TRACE_ARTIFACT).ok_or_else(|| {
        FlowError::Configuration(format!(
            "phase '{}' is missing foundational artifact '{TRACE_ARTIFACT}'",
            phase.id
        ))
    })?;

    let at = log_pos.max(trace_pos) + 1;
    phase.artifacts.insert(at, INTERACTION_ARTIFACT.to_string());
    Ok(())
}

/// Reference the placeholder check from a category so the executor treats
/// the interaction artifact as consumed. Zero weight, hidden group.
fn placeholder_ref() -> CheckRef {
    CheckRef::new(PLACEHOLDER_CHECK_ID, 0.0).with_group(HIDDEN_GROUP)
}

fn ensure_hidden_group(groups: &mut BTreeMap<String, GroupSpec>) {
    groups.entry(HIDDEN_GROUP.to_string()).or_insert(GroupSpec {
        title: String::new(),
    });
}

/// Overlay strategy: keep everything, splice the interaction collector into
/// each phase, and hang the placeholder off the existing performance
/// category.
fn overlay(base: &PipelineGraph) -> Result<PipelineGraph> {
    let mut graph = base.clone();

    for phase in &mut graph.phases {
        splice_interaction(phase)?;
    }

    let performance = graph
        .categories
        .get_mut(PERFORMANCE_CATEGORY)
        .ok_or_else(|| {
            FlowError::Configuration(format!(
                "base graph has no '{PERFORMANCE_CATEGORY}' category to anchor the placeholder"
            ))
        })?;
    performance.refs.push(placeholder_ref());
    ensure_hidden_group(&mut graph.groups);

    Ok(graph)
}

/// Replacement strategy: copy the base ordering explicitly, tighten the
/// quiescence thresholds, swap the performance category for the plugin's,
/// and inline the plugin's evaluators.
fn replace(base: &PipelineGraph, plugin: &PluginSpec) -> Result<PipelineGraph> {
    let mut graph = PipelineGraph {
        collectors: base.collectors.clone(),
        phases: Vec::with_capacity(base.phases.len()),
        checks: base.checks.clone(),
        categories: base.categories.clone(),
        groups: base.groups.clone(),
    };

    for phase in &base.phases {
        let mut rebuilt = PhasePlan::new(&phase.id, &[]).with_quiet_thresholds_ms(1000);
        rebuilt.artifacts = phase.artifacts.clone();
        splice_interaction(&mut rebuilt)?;
        graph.phases.push(rebuilt);
    }

    graph.checks.extend(plugin.checks.iter().cloned());

    let mut category = plugin.category.clone();
    category.refs.push(placeholder_ref());
    graph
        .categories
        .insert(PERFORMANCE_CATEGORY.to_string(), category);

    for (id, group) in &plugin.groups {
        graph.groups.insert(id.clone(), group.clone());
    }
    ensure_hidden_group(&mut graph.groups);

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckOutcome, CheckSpec};
    use crate::collector::CollectorSpec;
    use crate::graph::model::CategorySpec;
    use std::sync::Arc;

    fn base_graph(artifacts: &[&str]) -> PipelineGraph {
        let mut categories = BTreeMap::new();
        categories.insert(
            PERFORMANCE_CATEGORY.to_string(),
            CategorySpec::new("Performance", vec![]),
        );
        PipelineGraph {
            collectors: artifacts
                .iter()
                .map(|a| CollectorSpec::builtin(*a))
                .collect(),
            phases: vec![PhasePlan::new("default", artifacts)],
            categories,
            ..Default::default()
        }
    }

    fn sample_plugin() -> PluginSpec {
        struct Fixed;
        impl crate::check::CheckEvaluator for Fixed {
            fn evaluate(
                &self,
                _artifacts: &crate::executor::ArtifactSet,
            ) -> crate::error::Result<CheckOutcome> {
                Ok(CheckOutcome::scored(1.0))
            }
        }
        PluginSpec {
            name: "sample-plugin".to_string(),
            checks: vec![CheckSpec::inline("sample-metric", Arc::new(Fixed))],
            category: CategorySpec::new(
                "Sample Vitals",
                vec![CheckRef::new("sample-metric", 1.0)],
            ),
            groups: BTreeMap::new(),
        }
    }

    #[test]
    fn test_overlay_orders_interaction_after_foundational() {
        let base = base_graph(&["DevtoolsLog", "Trace", "A", "B"]);
        let assembled = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap();
        assert_eq!(
            assembled.graph.phases[0].artifacts,
            vec!["DevtoolsLog", "Trace", "UserInteraction", "A", "B"]
        );
        // The placeholder check is present and anchored to performance.
        assert!(assembled.graph.check(PLACEHOLDER_CHECK_ID).is_some());
        let perf = &assembled.graph.categories[PERFORMANCE_CATEGORY];
        assert!(perf.refs.iter().any(|r| r.id == PLACEHOLDER_CHECK_ID));
    }

    #[test]
    fn test_replace_orders_interaction_after_foundational() {
        let base = base_graph(&["DevtoolsLog", "Trace", "A", "B"]);
        let assembled =
            build_interaction_graph(&base, &AssemblyOptions::replace(sample_plugin())).unwrap();
        assert_eq!(
            assembled.graph.phases[0].artifacts,
            vec!["DevtoolsLog", "Trace", "UserInteraction", "A", "B"]
        );
    }

    #[test]
    fn test_interaction_strictly_before_every_other_collector() {
        // Foundational artifacts not at the very front — the collector still
        // lands immediately after the later of the two.
        let base = base_graph(&["Trace", "DevtoolsLog", "A"]);
        for options in [
            AssemblyOptions::overlay(),
            AssemblyOptions::replace(sample_plugin()),
        ] {
            let assembled = build_interaction_graph(&base, &options).unwrap();
            let phase = &assembled.graph.phases[0];
            let interaction = phase.position_of(INTERACTION_ARTIFACT).unwrap();
            assert!(interaction > phase.position_of(TRACE_ARTIFACT).unwrap());
            assert!(interaction > phase.position_of(DEVTOOLS_LOG_ARTIFACT).unwrap());
            assert!(interaction < phase.position_of("A").unwrap());
        }
    }

    #[test]
    fn test_missing_foundational_artifact_is_configuration_error() {
        let base = base_graph(&["DevtoolsLog", "A"]);
        let err = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
        assert!(err.to_string().contains("Trace"));
    }

    #[test]
    fn test_overlay_without_performance_category_is_configuration_error() {
        let mut base = base_graph(&["DevtoolsLog", "Trace"]);
        base.categories.clear();
        let err = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }

    #[test]
    fn test_base_already_containing_interaction_is_rejected() {
        let mut base = base_graph(&["DevtoolsLog", "Trace"]);
        base.collectors
            .push(CollectorSpec::builtin(INTERACTION_ARTIFACT));
        let err = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }

    #[test]
    fn test_base_graph_is_not_mutated() {
        let base = base_graph(&["DevtoolsLog", "Trace", "A"]);
        let before = base.phases[0].artifacts.clone();
        build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap();
        assert_eq!(base.phases[0].artifacts, before);
        assert!(base.collector(INTERACTION_ARTIFACT).is_none());
    }

    #[test]
    fn test_assembly_is_structurally_idempotent() {
        let base = base_graph(&["DevtoolsLog", "Trace", "A", "B"]);
        let first = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap();
        let second = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap();
        assert_eq!(first.graph.phases, second.graph.phases);
        assert_eq!(
            first
                .graph
                .collectors
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>(),
            second
                .graph
                .collectors
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!(first.graph.categories, second.graph.categories);
    }

    #[test]
    fn test_replace_swaps_performance_category_and_sets_thresholds() {
        let base = base_graph(&["DevtoolsLog", "Trace", "A"]);
        let assembled =
            build_interaction_graph(&base, &AssemblyOptions::replace(sample_plugin())).unwrap();

        let perf = &assembled.graph.categories[PERFORMANCE_CATEGORY];
        assert_eq!(perf.title, "Sample Vitals");
        assert!(perf.refs.iter().any(|r| r.id == "sample-metric"));
        assert!(perf.refs.iter().any(|r| r.id == PLACEHOLDER_CHECK_ID));

        assert!(assembled.graph.check("sample-metric").is_some());
        assert_eq!(assembled.graph.phases[0].network_quiet_ms, Some(1000));
    }

    #[test]
    fn test_assembled_graph_passes_validation() {
        let base = base_graph(&["DevtoolsLog", "Trace", "A", "B"]);
        let assembled = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap();
        assert!(assembled.graph.validate().is_ok());
    }

    #[tokio::test]
    async fn test_rendezvous_halves_are_wired_to_the_collector() {
        let base = base_graph(&["DevtoolsLog", "Trace"]);
        let assembled = build_interaction_graph(&base, &AssemblyOptions::overlay()).unwrap();

        let spec = assembled.graph.collector(INTERACTION_ARTIFACT).unwrap();
        let crate::collector::CollectorBody::Inline(body) = spec.body.clone() else {
            panic!("interaction collector must be inline");
        };

        assert!(!assembled.can_start_user_interaction.is_fired());
        let collect = tokio::spawn(async move { body.collect().await });
        assembled.can_start_user_interaction.wait().await;
        assert!(!collect.is_finished());

        assembled.resolve_interaction_finished.signal();
        collect.await.unwrap().unwrap();
    }
}
