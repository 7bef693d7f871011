//! Collection graph model and interaction-graph assembly.

mod assemble;
mod model;

pub use assemble::{build_interaction_graph, AssemblyOptions, AssemblyStrategy, InteractionGraph};
pub use model::{
    CategorySpec, CheckRef, GroupSpec, PhasePlan, PipelineGraph, PluginSpec,
    DEVTOOLS_LOG_ARTIFACT, PERFORMANCE_CATEGORY, TRACE_ARTIFACT,
};
