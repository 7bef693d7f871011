//! Scoring checks and the interaction placeholder.
//!
//! A check consumes collected artifacts and produces a scored outcome. The
//! placeholder check exists for one reason: executors prune collectors whose
//! artifact no scoring step consumes, so something has to declare the
//! interaction artifact as required.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::collector::{RunMode, INTERACTION_ARTIFACT};
use crate::error::Result;
use crate::executor::ArtifactSet;

/// Check id of the interaction placeholder.
pub const PLACEHOLDER_CHECK_ID: &str = "interaction-placeholder";

/// Group id conventionally hidden from rendered reports.
pub const HIDDEN_GROUP: &str = "hidden";

/// Outcome of evaluating one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// Score in `[0, 1]`, or `None` when not scored.
    pub score: Option<f64>,
    /// Whether the check did not apply to this run.
    pub not_applicable: bool,
    /// Human-readable value for the report.
    pub display_value: Option<String>,
    /// Structured details (tables etc.) for the report.
    pub details: Option<serde_json::Value>,
}

impl CheckOutcome {
    /// A plain numeric outcome.
    pub fn scored(score: f64) -> Self {
        Self {
            score: Some(score),
            not_applicable: false,
            display_value: None,
            details: None,
        }
    }

    /// A fixed passing, not-applicable outcome.
    pub fn not_applicable() -> Self {
        Self {
            score: Some(1.0),
            not_applicable: true,
            display_value: None,
            details: None,
        }
    }

    /// Attach a display value.
    pub fn with_display_value(mut self, value: impl Into<String>) -> Self {
        self.display_value = Some(value.into());
        self
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Evaluation body of an inline check.
pub trait CheckEvaluator: Send + Sync {
    /// Evaluate against the run's collected artifacts.
    fn evaluate(&self, artifacts: &ArtifactSet) -> Result<CheckOutcome>;
}

/// How a check's body is resolved at run time.
#[derive(Clone)]
pub enum CheckBody {
    /// Resolved by the pipeline executor from its own catalog, by id.
    Builtin,
    /// Supplied by the embedder and run in-process.
    Inline(Arc<dyn CheckEvaluator>),
}

impl fmt::Debug for CheckBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckBody::Builtin => f.write_str("Builtin"),
            CheckBody::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// A named scoring step with its artifact requirements.
#[derive(Debug, Clone)]
pub struct CheckSpec {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Modes this check supports.
    pub modes: Vec<RunMode>,
    /// Artifacts that must have been collected for this check to run.
    /// Requiring an artifact keeps its collector alive in the graph.
    pub required_artifacts: Vec<String>,
    pub body: CheckBody,
}

impl CheckSpec {
    /// Spec for a check the executor resolves from its own catalog.
    pub fn builtin(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            description: String::new(),
            id,
            modes: vec![RunMode::Navigation, RunMode::Timespan],
            required_artifacts: Vec::new(),
            body: CheckBody::Builtin,
        }
    }

    /// Spec for an inline check evaluated in-process.
    pub fn inline(id: impl Into<String>, body: Arc<dyn CheckEvaluator>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            description: String::new(),
            id,
            modes: vec![RunMode::Navigation, RunMode::Timespan],
            required_artifacts: Vec::new(),
            body: CheckBody::Inline(body),
        }
    }

    /// Set title and description.
    pub fn describe(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.title = title.into();
        self.description = description.into();
        self
    }

    /// Declare required artifacts.
    pub fn with_required_artifacts(mut self, artifacts: &[&str]) -> Self {
        self.required_artifacts = artifacts.iter().map(|a| a.to_string()).collect();
        self
    }
}

struct PlaceholderEvaluator;

impl CheckEvaluator for PlaceholderEvaluator {
    fn evaluate(&self, _artifacts: &ArtifactSet) -> Result<CheckOutcome> {
        Ok(CheckOutcome::not_applicable())
    }
}

/// The check that keeps the interaction collector unprunable.
///
/// Declares the interaction artifact as its sole requirement and always
/// reports a fixed not-applicable pass.
pub fn placeholder_check() -> CheckSpec {
    CheckSpec::inline(PLACEHOLDER_CHECK_ID, Arc::new(PlaceholderEvaluator))
        .describe(
            "Interaction placeholder",
            "Keeps the user-interaction collector required by the graph",
        )
        .with_required_artifacts(&[INTERACTION_ARTIFACT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ArtifactSet;

    #[test]
    fn test_placeholder_requires_only_interaction_artifact() {
        let check = placeholder_check();
        assert_eq!(check.id, PLACEHOLDER_CHECK_ID);
        assert_eq!(check.required_artifacts, vec![INTERACTION_ARTIFACT]);
        assert!(check.modes.contains(&RunMode::Navigation));
        assert!(check.modes.contains(&RunMode::Timespan));
    }

    #[test]
    fn test_placeholder_outcome_is_fixed_pass() {
        let check = placeholder_check();
        let CheckBody::Inline(body) = &check.body else {
            panic!("placeholder must be inline");
        };
        let outcome = body.evaluate(&ArtifactSet::new()).unwrap();
        assert_eq!(outcome.score, Some(1.0));
        assert!(outcome.not_applicable);
    }

    #[test]
    fn test_outcome_builders() {
        let outcome = CheckOutcome::scored(0.5)
            .with_display_value("120 ms")
            .with_details(serde_json::json!({"items": []}));
        assert_eq!(outcome.score, Some(0.5));
        assert!(!outcome.not_applicable);
        assert_eq!(outcome.display_value.as_deref(), Some("120 ms"));
        assert!(outcome.details.is_some());
    }
}
