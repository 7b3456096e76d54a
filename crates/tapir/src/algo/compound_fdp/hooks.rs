use super::Phase;
use crate::graph::{Point, Size, Vector};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Read-only view of one vertex handed to [`ApplicationForces`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexSnapshot<'a> {
    pub id: &'a str,
    pub position: Point,
    pub size: Size,
    pub level: usize,
    /// `None` for top-level vertices.
    pub parent: Option<&'a str>,
    pub is_compound: bool,
}

/// Extra per-vertex forces, evaluated in the second and third phases after gravitation.
///
/// Closures of the shape `FnMut(&VertexSnapshot<'_>, Phase, usize) -> Option<Vector>` implement
/// this trait; the `usize` is the step within the phase, starting at 1.
pub trait ApplicationForces {
    fn force(&mut self, vertex: &VertexSnapshot<'_>, phase: Phase, step: usize) -> Option<Vector>;
}

impl<F> ApplicationForces for F
where
    F: FnMut(&VertexSnapshot<'_>, Phase, usize) -> Option<Vector>,
{
    fn force(&mut self, vertex: &VertexSnapshot<'_>, phase: Phase, step: usize) -> Option<Vector> {
        self(vertex, phase, step)
    }
}

/// Cooperative stop request shared between a running layout and its owner.
///
/// The run checks the token before every step; once it is set the current positions are kept,
/// pruned leaves are grown back and the result is returned with `cancelled` set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
