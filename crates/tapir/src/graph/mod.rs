use crate::error::{Error, Result};
use nalgebra as na;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tapir_graphlib::CompoundGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<na::Vector2<f64>> for Point {
    fn from(v: na::Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for na::Vector2<f64> {
    fn from(p: Point) -> Self {
        na::Vector2::new(p.x, p.y)
    }
}

/// A force or displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<na::Vector2<f64>> for Vector {
    fn from(v: na::Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vector> for na::Vector2<f64> {
    fn from(v: Vector) -> Self {
        na::Vector2::new(v.x, v.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}

/// Margin between a compound vertex's outline and the box enclosing its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Thickness {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Thickness {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }

    fn is_valid(self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// How the children of a compound vertex are arranged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InnerLayoutType {
    /// Children take part in the simulation.
    #[default]
    Automatic,
    /// Children keep their relative placement and move only with their container.
    Fixed,
}

/// Per-vertex inputs of a layout run.
///
/// Missing entries fall back to a zero size, a zero border, [`InnerLayoutType::Automatic`] and a
/// random initial position respectively.
#[derive(Debug, Clone, Default)]
pub struct VertexAttributes {
    pub sizes: FxHashMap<String, Size>,
    pub borders: FxHashMap<String, Thickness>,
    pub layout_types: FxHashMap<String, InnerLayoutType>,
    pub positions: FxHashMap<String, Point>,
}

impl VertexAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, id: impl Into<String>, width: f64, height: f64) -> Self {
        self.sizes.insert(id.into(), Size::new(width, height));
        self
    }

    pub fn border(mut self, id: impl Into<String>, border: Thickness) -> Self {
        self.borders.insert(id.into(), border);
        self
    }

    pub fn layout_type(mut self, id: impl Into<String>, layout_type: InnerLayoutType) -> Self {
        self.layout_types.insert(id.into(), layout_type);
        self
    }

    pub fn position(mut self, id: impl Into<String>, x: f64, y: f64) -> Self {
        self.positions.insert(id.into(), Point::new(x, y));
        self
    }

    pub(crate) fn validate<N, E>(&self, graph: &CompoundGraph<N, E>) -> Result<()>
    where
        N: Default,
        E: Default,
    {
        if graph.node_count() == 0 {
            return Err(invalid("graph has no vertices"));
        }
        if self.sizes.is_empty() {
            return Err(invalid("vertex size map is empty"));
        }
        let keys = self
            .sizes
            .keys()
            .chain(self.borders.keys())
            .chain(self.layout_types.keys())
            .chain(self.positions.keys());
        for id in keys {
            if !graph.has_node(id) {
                return Err(Error::VertexNotFound { vertex: id.clone() });
            }
        }
        if let Some((id, _)) = self.sizes.iter().find(|(_, s)| !s.is_valid()) {
            return Err(invalid(format!("size of {id} must be finite and non-negative")));
        }
        if let Some((id, _)) = self.borders.iter().find(|(_, b)| !b.is_valid()) {
            return Err(invalid(format!(
                "border of {id} must be finite and non-negative"
            )));
        }
        if let Some((id, _)) = self
            .positions
            .iter()
            .find(|(_, p)| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(invalid(format!("initial position of {id} must be finite")));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidArgument {
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    /// Vertex centers.
    pub positions: BTreeMap<String, Point>,
    /// Outer sizes; for compound vertices this is the inner canvas plus the border.
    pub sizes: BTreeMap<String, Size>,
    /// Bounding box of the children of every compound vertex.
    pub inner_canvas_sizes: BTreeMap<String, Size>,
    pub levels: BTreeMap<String, usize>,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl LayoutResult {
    pub fn level_of(&self, vertex: &str) -> Result<usize> {
        self.levels
            .get(vertex)
            .copied()
            .ok_or_else(|| Error::VertexNotFound {
                vertex: vertex.to_string(),
            })
    }

    /// Copies the final positions into a caller-owned map, overwriting existing entries.
    pub fn apply_positions<M>(&self, target: &mut M)
    where
        M: Extend<(String, Point)>,
    {
        target.extend(self.positions.iter().map(|(k, v)| (k.clone(), *v)));
    }
}
