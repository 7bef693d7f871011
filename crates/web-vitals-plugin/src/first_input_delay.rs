//! First Input Delay, read from the raw trace.
//!
//! The renderer reports the page's first input delay as a single
//! `FirstInputDelay::AllFrames::UMA` trace event. No event means no input
//! was delivered, which scores as a zero delay.

use std::sync::Arc;

use vitals_flow::{ArtifactSet, CheckEvaluator, CheckOutcome, CheckSpec, TRACE_ARTIFACT};

use crate::scoring::ScoringCurve;

pub const FIRST_INPUT_DELAY_ID: &str = "first-input-delay";

const FID_TRACE_EVENT: &str = "FirstInputDelay::AllFrames::UMA";

/// Control points from field-data analysis of good/poor FID.
const FID_CURVE: ScoringCurve = ScoringCurve {
    p10: 100.0,
    median: 300.0,
};

struct FirstInputDelay;

impl CheckEvaluator for FirstInputDelay {
    fn evaluate(&self, artifacts: &ArtifactSet) -> vitals_flow::Result<CheckOutcome> {
        let delay_ms = artifacts
            .get(TRACE_ARTIFACT)
            .and_then(|trace| trace.get("traceEvents"))
            .and_then(|events| events.as_array())
            .and_then(|events| {
                events
                    .iter()
                    .find(|e| e.get("name").and_then(|n| n.as_str()) == Some(FID_TRACE_EVENT))
            })
            .and_then(|event| {
                event
                    .pointer("/args/data/firstInputDelayInMilliseconds")
                    .and_then(|v| v.as_f64())
            })
            .unwrap_or(0.0);

        Ok(CheckOutcome::scored(FID_CURVE.score(delay_ms))
            .with_display_value(format!("{delay_ms} ms")))
    }
}

/// The first-input-delay check spec.
pub fn first_input_delay_check() -> CheckSpec {
    CheckSpec::inline(FIRST_INPUT_DELAY_ID, Arc::new(FirstInputDelay))
        .describe("First Input Delay", "First Input Delay")
        .with_required_artifacts(&[TRACE_ARTIFACT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitals_flow::CheckBody;

    fn evaluate(trace: serde_json::Value) -> CheckOutcome {
        let check = first_input_delay_check();
        let CheckBody::Inline(body) = &check.body else {
            panic!("first-input-delay must be inline");
        };
        let mut artifacts = ArtifactSet::new();
        artifacts.insert(TRACE_ARTIFACT.to_string(), trace);
        body.evaluate(&artifacts).unwrap()
    }

    #[test]
    fn test_reads_delay_from_trace_event() {
        let outcome = evaluate(json!({
            "traceEvents": [
                {"name": "navigationStart", "args": {}},
                {"name": "FirstInputDelay::AllFrames::UMA",
                 "args": {"data": {"firstInputDelayInMilliseconds": 300.0}}},
            ]
        }));
        assert!((outcome.score.unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(outcome.display_value.as_deref(), Some("300 ms"));
    }

    #[test]
    fn test_missing_event_scores_perfect() {
        let outcome = evaluate(json!({ "traceEvents": [] }));
        assert_eq!(outcome.score, Some(1.0));
        assert_eq!(outcome.display_value.as_deref(), Some("0 ms"));
    }

    #[test]
    fn test_requires_trace_artifact() {
        let check = first_input_delay_check();
        assert_eq!(check.required_artifacts, vec![TRACE_ARTIFACT.to_string()]);
    }
}
