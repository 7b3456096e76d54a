#![forbid(unsafe_code)]

//! Headless compound force-directed placement.
//!
//! Vertices may contain other vertices; containers are sized to fit their contents and move them
//! along. The engine runs three annealing phases of spring, repulsion and gravitation forces,
//! optionally extended by caller-supplied application forces, and is deterministic for a fixed
//! seed.

pub mod algo;
pub mod error;
pub mod graph;

pub use algo::compound_fdp::{
    ApplicationForces, CancellationToken, CompoundFdpLayout, ForceDebug, IterationObserver,
    IterationReport, Phase, VertexSnapshot,
};
pub use algo::parameters::{CompoundFdpParameters, ParameterChanged};
pub use algo::CompoundFdpOptions;
pub use error::{Error, Result};
pub use graph::{
    InnerLayoutType, LayoutResult, Point, Size, Thickness, Vector, VertexAttributes,
};
pub use tapir_graphlib::{CompoundGraph, EdgeKey};

/// Headless layout entry point.
pub fn layout<N, E>(
    graph: &CompoundGraph<N, E>,
    attrs: &VertexAttributes,
    options: &CompoundFdpOptions,
) -> Result<LayoutResult>
where
    N: Default,
    E: Default,
{
    algo::compound_fdp::layout(graph, attrs, options)
}
