//! Page responsiveness summary, aggregated from renderer interaction events.
//!
//! Each `Responsiveness.Renderer.UserInteraction` trace event carries the max
//! and total event durations of one user interaction plus its interaction
//! type. Durations are compared against per-type budgets and aggregated four
//! ways, for both the max-duration and total-duration views. The check is
//! informational: it always scores 0.5 and carries its substance in the
//! details table.

use std::sync::Arc;

use serde_json::json;
use vitals_flow::{ArtifactSet, CheckEvaluator, CheckOutcome, CheckSpec, TRACE_ARTIFACT};

pub const RESPONSIVENESS_ID: &str = "responsiveness";

const RESPONSIVENESS_TRACE_EVENT: &str = "Responsiveness.Renderer.UserInteraction";

/// One interaction's duration with its budget-determining type.
struct InteractionDuration {
    duration_ms: f64,
    interaction_type: String,
}

impl InteractionDuration {
    /// Budget in ms for this interaction type; unknown types get the
    /// loosest budget.
    fn budget_ms(&self) -> f64 {
        match self.interaction_type.as_str() {
            "keyboard" => 50.0,
            "tapOrClick" => 100.0,
            "drag" => 100.0,
            _ => 100.0,
        }
    }

    fn over_budget_ms(&self) -> f64 {
        (self.duration_ms - self.budget_ms()).max(0.0)
    }
}

fn aggregate(events: &[InteractionDuration]) -> Vec<serde_json::Value> {
    let over_budget: Vec<f64> = events.iter().map(InteractionDuration::over_budget_ms).collect();

    let worst = events.iter().map(|e| e.duration_ms).fold(0.0, f64::max);
    let worst_over_budget = over_budget.iter().copied().fold(0.0, f64::max);
    // Folding from positive zero keeps the empty sum at `0.0`, not `-0.0`,
    // which would render as "-0 ms".
    let sum_over_budget = over_budget.iter().fold(0.0, |acc, v| acc + v);
    let average_over_budget = if events.is_empty() {
        0.0
    } else {
        sum_over_budget / events.len() as f64
    };

    [
        ("Worst latency", worst),
        ("Worst latency over budget", worst_over_budget),
        ("Sum of latency over budget", sum_over_budget),
        ("Average latency over budget", average_over_budget),
    ]
    .into_iter()
    .map(|(aggregation, value)| {
        json!({
            "aggregationType": aggregation,
            "aggregationValue": format!("{} ms", value.round()),
        })
    })
    .collect()
}

struct Responsiveness;

impl CheckEvaluator for Responsiveness {
    fn evaluate(&self, artifacts: &ArtifactSet) -> vitals_flow::Result<CheckOutcome> {
        let empty = Vec::new();
        let events = artifacts
            .get(TRACE_ARTIFACT)
            .and_then(|trace| trace.get("traceEvents"))
            .and_then(|events| events.as_array())
            .unwrap_or(&empty);

        let durations = |field: &str| -> Vec<InteractionDuration> {
            events
                .iter()
                .filter(|e| {
                    e.get("name").and_then(|n| n.as_str()) == Some(RESPONSIVENESS_TRACE_EVENT)
                })
                .filter_map(|e| {
                    let data = e.pointer("/args/data")?;
                    Some(InteractionDuration {
                        duration_ms: data.get(field)?.as_f64()?,
                        interaction_type: data
                            .get("interactionType")?
                            .as_str()?
                            .to_string(),
                    })
                })
                .collect()
        };

        let details = json!({
            "type": "table",
            "headings": [
                {"key": "totalOrWorst", "itemType": "text",
                 "subItemsHeading": {"key": "aggregationType", "itemType": "text"},
                 "text": "Aggregation Type"},
                {"key": null, "itemType": "text",
                 "subItemsHeading": {"key": "aggregationValue", "itemType": "text"},
                 "text": "Value"},
            ],
            "items": [
                {"totalOrWorst": "Max event duration",
                 "subItems": {"type": "subitems", "items": aggregate(&durations("maxDuration"))}},
                {"totalOrWorst": "Total event duration",
                 "subItems": {"type": "subitems", "items": aggregate(&durations("totalDuration"))}},
            ],
        });

        Ok(CheckOutcome::scored(0.5).with_details(details))
    }
}

/// The responsiveness check spec.
pub fn responsiveness_check() -> CheckSpec {
    CheckSpec::inline(RESPONSIVENESS_ID, Arc::new(Responsiveness))
        .describe(
            "Responsiveness",
            "Summarizes how quickly the page responds to user interaction \
             over its lifetime.",
        )
        .with_required_artifacts(&[TRACE_ARTIFACT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_flow::CheckBody;

    fn interaction(kind: &str, max: f64, total: f64) -> serde_json::Value {
        json!({
            "name": RESPONSIVENESS_TRACE_EVENT,
            "args": {"data": {
                "interactionType": kind,
                "maxDuration": max,
                "totalDuration": total,
            }},
        })
    }

    fn evaluate(trace: serde_json::Value) -> CheckOutcome {
        let check = responsiveness_check();
        let CheckBody::Inline(body) = &check.body else {
            panic!("responsiveness must be inline");
        };
        let mut artifacts = ArtifactSet::new();
        artifacts.insert(TRACE_ARTIFACT.to_string(), trace);
        body.evaluate(&artifacts).unwrap()
    }

    #[test]
    fn test_aggregates_against_per_type_budgets() {
        let outcome = evaluate(json!({
            "traceEvents": [
                interaction("keyboard", 80.0, 120.0),
                interaction("tapOrClick", 90.0, 150.0),
                {"name": "unrelated", "args": {}},
            ]
        }));
        assert_eq!(outcome.score, Some(0.5));

        let details = outcome.details.unwrap();
        let max_aggs = details
            .pointer("/items/0/subItems/items")
            .and_then(|v| v.as_array())
            .unwrap()
            .clone();
        // Worst raw latency is the tapOrClick 90; for budgets, keyboard 80
        // is 30 over its 50ms budget while tapOrClick 90 is under.
        assert_eq!(max_aggs[0]["aggregationValue"], "90 ms");
        assert_eq!(max_aggs[1]["aggregationValue"], "30 ms");
        assert_eq!(max_aggs[2]["aggregationValue"], "30 ms");
        assert_eq!(max_aggs[3]["aggregationValue"], "15 ms");
    }

    #[test]
    fn test_empty_trace_aggregates_to_zero() {
        let outcome = evaluate(json!({ "traceEvents": [] }));
        let details = outcome.details.unwrap();
        let aggs = details
            .pointer("/items/1/subItems/items")
            .and_then(|v| v.as_array())
            .unwrap()
            .clone();
        for agg in aggs {
            assert_eq!(agg["aggregationValue"], "0 ms");
        }
    }
}
