use super::Phase;
use crate::graph::{Point, Vector};
use std::collections::BTreeMap;

/// Forces accumulated on a vertex during one step, before they were applied.
///
/// Forces aimed at a vertex that is fixed to its container show up on the container instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ForceDebug {
    pub spring: Vector,
    pub repulsion: Vector,
    pub gravitation: Vector,
    pub application: Vector,
}

/// Snapshot of one simulation step. Observers get a copy; the run never exposes live state.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IterationReport {
    pub phase: Phase,
    /// Step within the phase, starting at 1.
    pub step: usize,
    pub message: String,
    pub temperature: f64,
    pub displacement_limit: f64,
    /// Positions at the start of the step.
    pub positions: BTreeMap<String, Point>,
    pub forces: BTreeMap<String, ForceDebug>,
}

pub trait IterationObserver {
    fn on_iteration(&mut self, report: &IterationReport);
}

impl<F> IterationObserver for F
where
    F: FnMut(&IterationReport),
{
    fn on_iteration(&mut self, report: &IterationReport) {
        self(report)
    }
}
