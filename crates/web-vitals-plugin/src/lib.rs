//! Lab web-vitals reporting plugin.
//!
//! Packages the web-vitals lab metrics as a [`PluginSpec`]: the
//! first-input-delay and responsiveness evaluators defined here, the
//! pipeline's own largest-contentful-paint and cumulative-layout-shift
//! checks referenced by id, and the "Lab Web Vitals" category presenting
//! them. Overlay runs forward the plugin by name through settings;
//! replacement runs splice its material straight into the graph.

mod first_input_delay;
mod responsiveness;
pub mod scoring;

use std::collections::BTreeMap;

use vitals_flow::{
    CategorySpec, CheckRef, CheckSpec, GroupSpec, PluginSpec, TRACE_ARTIFACT,
};

pub use first_input_delay::{first_input_delay_check, FIRST_INPUT_DELAY_ID};
pub use responsiveness::{responsiveness_check, RESPONSIVENESS_ID};

/// Plugin name used in settings overrides.
pub const PLUGIN_NAME: &str = "web-vitals-plugin";

/// Group presenting the metric rows.
const METRICS_GROUP: &str = "metrics";

const LARGEST_CONTENTFUL_PAINT_ID: &str = "largest-contentful-paint";
const CUMULATIVE_LAYOUT_SHIFT_ID: &str = "cumulative-layout-shift";

/// Build the web-vitals plugin spec.
pub fn web_vitals_plugin() -> PluginSpec {
    let category = CategorySpec::new(
        "Lab Web Vitals",
        vec![
            CheckRef::new(LARGEST_CONTENTFUL_PAINT_ID, 1.0).with_group(METRICS_GROUP),
            CheckRef::new(CUMULATIVE_LAYOUT_SHIFT_ID, 1.0).with_group(METRICS_GROUP),
            CheckRef::new(FIRST_INPUT_DELAY_ID, 1.0).with_group(METRICS_GROUP),
            CheckRef::new(RESPONSIVENESS_ID, 0.0),
        ],
    )
    .with_description(
        "Web Vitals are a set of metrics that measure important aspects of \
         real-world user experience on the web.",
    );

    let mut groups = BTreeMap::new();
    // Run as a plugin, the metrics group needs its own definition.
    groups.insert(
        METRICS_GROUP.to_string(),
        GroupSpec {
            title: "Metrics".to_string(),
        },
    );

    PluginSpec {
        name: PLUGIN_NAME.to_string(),
        checks: vec![
            CheckSpec::builtin(LARGEST_CONTENTFUL_PAINT_ID)
                .with_required_artifacts(&[TRACE_ARTIFACT]),
            CheckSpec::builtin(CUMULATIVE_LAYOUT_SHIFT_ID)
                .with_required_artifacts(&[TRACE_ARTIFACT]),
            first_input_delay_check(),
            responsiveness_check(),
        ],
        category,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_weights_match_field_metrics() {
        let plugin = web_vitals_plugin();
        assert_eq!(plugin.name, PLUGIN_NAME);
        assert_eq!(plugin.category.title, "Lab Web Vitals");

        let weight_of = |id: &str| {
            plugin
                .category
                .refs
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.weight)
        };
        assert_eq!(weight_of(LARGEST_CONTENTFUL_PAINT_ID), Some(1.0));
        assert_eq!(weight_of(CUMULATIVE_LAYOUT_SHIFT_ID), Some(1.0));
        assert_eq!(weight_of(FIRST_INPUT_DELAY_ID), Some(1.0));
        // Informational only, must not move the category score.
        assert_eq!(weight_of(RESPONSIVENESS_ID), Some(0.0));
    }

    #[test]
    fn test_every_category_ref_has_a_check() {
        let plugin = web_vitals_plugin();
        for reference in &plugin.category.refs {
            assert!(
                plugin.checks.iter().any(|c| c.id == reference.id),
                "unresolvable check ref '{}'",
                reference.id
            );
        }
    }

    #[test]
    fn test_metrics_group_is_defined() {
        let plugin = web_vitals_plugin();
        assert!(plugin.groups.contains_key(METRICS_GROUP));
    }
}
