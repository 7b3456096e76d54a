//! Per-vertex simulation state, stored in an arena indexed by vertex position.
//!
//! Vertex `i` of the run lives at state `i`; the synthetic root container is appended last.
//! Containment and movable-parent links are state indices, so moving a container and
//! propagating the move to its contents never needs shared mutable references.

use super::forces::{Vec2, clip_to_length};
use crate::graph::Thickness;

pub(super) type StateId = usize;

const MOMENTUM: f64 = 0.7;
const CHILDREN_FORCE_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Origin {
    Root,
    Vertex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ForceKind {
    Spring,
    Repulsion,
    Gravitation,
    Application,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Forces {
    pub(super) spring: Vec2,
    pub(super) repulsion: Vec2,
    pub(super) gravitation: Vec2,
    pub(super) application: Vec2,
    /// Final (clipped) displacement of the previous step.
    pub(super) previous: Vec2,
}

impl Default for Forces {
    fn default() -> Self {
        Self {
            spring: Vec2::zeros(),
            repulsion: Vec2::zeros(),
            gravitation: Vec2::zeros(),
            application: Vec2::zeros(),
            previous: Vec2::zeros(),
        }
    }
}

impl Forces {
    fn slot(&mut self, kind: ForceKind) -> &mut Vec2 {
        match kind {
            ForceKind::Spring => &mut self.spring,
            ForceKind::Repulsion => &mut self.repulsion,
            ForceKind::Gravitation => &mut self.gravitation,
            ForceKind::Application => &mut self.application,
        }
    }

    fn total(&self) -> Vec2 {
        self.spring + self.repulsion + self.gravitation + self.application
    }
}

#[derive(Debug, Clone)]
pub(super) struct CompoundBody {
    pub(super) children: Vec<StateId>,
    pub(super) borders: Thickness,
    pub(super) inner_canvas_size: Vec2,
    pub(super) inner_canvas_center: Vec2,
    /// Sum of the forces felt by the children during the current step.
    pub(super) children_force: Vec2,
}

impl CompoundBody {
    fn new(borders: Thickness) -> Self {
        Self {
            children: Vec::new(),
            borders,
            inner_canvas_size: Vec2::zeros(),
            inner_canvas_center: Vec2::zeros(),
            children_force: Vec2::zeros(),
        }
    }

    fn border_size(&self) -> Vec2 {
        Vec2::new(
            self.borders.left + self.borders.right,
            self.borders.top + self.borders.bottom,
        )
    }

    /// Offset from the inner canvas center to the outer box center.
    fn border_offset(&self) -> Vec2 {
        Vec2::new(
            (self.borders.right - self.borders.left) / 2.0,
            (self.borders.bottom - self.borders.top) / 2.0,
        )
    }
}

#[derive(Debug, Clone)]
pub(super) enum Body {
    Leaf,
    Compound(CompoundBody),
}

#[derive(Debug, Clone)]
pub(super) struct VertexState {
    pub(super) origin: Origin,
    pub(super) position: Vec2,
    pub(super) size: Vec2,
    pub(super) level: usize,
    pub(super) parent: Option<StateId>,
    pub(super) movable_parent: Option<StateId>,
    pub(super) fixed_to_parent: bool,
    pub(super) forces: Forces,
    pub(super) body: Body,
}

impl VertexState {
    pub(super) fn is_compound(&self) -> bool {
        matches!(self.body, Body::Compound(_))
    }

    pub(super) fn compound(&self) -> Option<&CompoundBody> {
        match &self.body {
            Body::Compound(c) => Some(c),
            Body::Leaf => None,
        }
    }

    fn compound_mut(&mut self) -> Option<&mut CompoundBody> {
        match &mut self.body {
            Body::Compound(c) => Some(c),
            Body::Leaf => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct StateArena {
    states: Vec<VertexState>,
    root: StateId,
}

impl std::ops::Index<StateId> for StateArena {
    type Output = VertexState;

    fn index(&self, id: StateId) -> &VertexState {
        &self.states[id]
    }
}

impl StateArena {
    /// Builds one leaf state per vertex, every one of them a direct child of the root.
    pub(super) fn with_leaves(leaves: impl IntoIterator<Item = (Vec2, Vec2)>) -> Self {
        let mut states: Vec<VertexState> = leaves
            .into_iter()
            .enumerate()
            .map(|(idx, (position, size))| VertexState {
                origin: Origin::Vertex(idx),
                position,
                size,
                level: 0,
                parent: None,
                movable_parent: None,
                fixed_to_parent: false,
                forces: Forces::default(),
                body: Body::Leaf,
            })
            .collect();

        let root = states.len();
        let mut body = CompoundBody::new(Thickness::default());
        body.children = (0..root).collect();
        for s in &mut states {
            s.parent = Some(root);
        }
        states.push(VertexState {
            origin: Origin::Root,
            position: Vec2::zeros(),
            size: Vec2::zeros(),
            level: 0,
            parent: None,
            movable_parent: None,
            fixed_to_parent: false,
            forces: Forces::default(),
            body: Body::Compound(body),
        });

        Self { states, root }
    }

    pub(super) fn root(&self) -> StateId {
        self.root
    }

    pub(super) fn set_level(&mut self, id: StateId, level: usize) {
        self.states[id].level = level;
    }

    pub(super) fn set_position(&mut self, id: StateId, position: Vec2) {
        self.states[id].position = position;
    }

    /// Turns a leaf into a container owning `children`, then fits it around them.
    pub(super) fn make_compound(&mut self, id: StateId, borders: Thickness, children: &[StateId]) {
        if !self.states[id].is_compound() {
            self.states[id].body = Body::Compound(CompoundBody::new(borders));
        }
        for &child in children {
            self.attach(id, child);
        }
        self.recalculate_bounds(id);
    }

    /// Moves `child` under `parent`, removing it from its previous container first.
    pub(super) fn attach(&mut self, parent: StateId, child: StateId) {
        self.detach(child);
        if let Some(body) = self.states[parent].compound_mut() {
            body.children.push(child);
            self.states[child].parent = Some(parent);
        }
    }

    pub(super) fn detach(&mut self, child: StateId) {
        let Some(parent) = self.states[child].parent.take() else {
            return;
        };
        if let Some(body) = self.states[parent].compound_mut() {
            body.children.retain(|&c| c != child);
        }
    }

    /// Slaves `id` to its container; forces meant for it go to `movable_parent` instead.
    pub(super) fn pin(&mut self, id: StateId, movable_parent: Option<StateId>) {
        let s = &mut self.states[id];
        s.fixed_to_parent = true;
        s.movable_parent = movable_parent;
    }

    /// Fixed to its container with nowhere to forward forces to.
    pub(super) fn is_pinned(&self, id: StateId) -> bool {
        let s = &self.states[id];
        s.fixed_to_parent && s.movable_parent.is_none()
    }

    pub(super) fn add_force(&mut self, kind: ForceKind, id: StateId, force: Vec2) {
        let mut target = id;
        // Movable parents are ancestors, so this walk terminates.
        while self.states[target].fixed_to_parent {
            match self.states[target].movable_parent {
                Some(next) => target = next,
                None => return,
            }
        }
        *self.states[target].forces.slot(kind) += force;
    }

    pub(super) fn inner_canvas_center(&self, id: StateId) -> Vec2 {
        match self.states[id].compound() {
            Some(c) => c.inner_canvas_center,
            None => self.states[id].position,
        }
    }

    /// Applies the accumulated forces of one vertex, bounded by `limit`, and returns the
    /// displacement. Containers carry their whole subtree along and are refitted afterwards.
    pub(super) fn apply_displacement(&mut self, id: StateId, limit: f64) -> Vec2 {
        if self.states[id].fixed_to_parent {
            self.clear_forces(id, Vec2::zeros());
            self.recalculate_bounds(id);
            return Vec2::zeros();
        }

        let s = &self.states[id];
        let children_force = s
            .compound()
            .map(|c| c.children_force)
            .unwrap_or_else(Vec2::zeros);
        let force = s.forces.total() + children_force * CHILDREN_FORCE_SHARE;
        let previous = s.forces.previous;
        let parent = s.parent;

        if let Some(p) = parent {
            if let Some(body) = self.states[p].compound_mut() {
                body.children_force += force;
            }
        }

        let clipped = clip_to_length(force, limit);
        let displacement = clip_to_length(clipped + previous * MOMENTUM, limit);

        self.states[id].position += displacement;
        if self.states[id].is_compound() {
            self.translate_contents(id, displacement);
            self.recalculate_bounds(id);
        }
        self.clear_forces(id, displacement);
        displacement
    }

    fn clear_forces(&mut self, id: StateId, previous: Vec2) {
        let s = &mut self.states[id];
        s.forces = Forces {
            previous,
            ..Forces::default()
        };
        if let Some(body) = s.compound_mut() {
            body.children_force = Vec2::zeros();
        }
    }

    pub(super) fn clear_children_force(&mut self, id: StateId) {
        if let Some(body) = self.states[id].compound_mut() {
            body.children_force = Vec2::zeros();
        }
    }

    /// Shifts every descendant of `id` (not `id` itself) by `delta`.
    fn translate_contents(&mut self, id: StateId, delta: Vec2) {
        let mut stack: Vec<StateId> = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(body) = self.states[cur].compound_mut() else {
                continue;
            };
            body.inner_canvas_center += delta;
            let children = body.children.clone();
            for child in children {
                self.states[child].position += delta;
                stack.push(child);
            }
        }
    }

    /// Refits a container to the bounding box of its children.
    ///
    /// An empty container keeps its position and shrinks to its borders.
    pub(super) fn recalculate_bounds(&mut self, id: StateId) {
        let bounds = {
            let Some(body) = self.states[id].compound() else {
                return;
            };
            body.children.iter().fold(None, |acc: Option<(Vec2, Vec2)>, &child| {
                let s = &self.states[child];
                let half = s.size / 2.0;
                let (lo, hi) = (s.position - half, s.position + half);
                Some(match acc {
                    None => (lo, hi),
                    Some((min, max)) => (min.inf(&lo), max.sup(&hi)),
                })
            })
        };

        let s = &mut self.states[id];
        let position = s.position;
        let Some(body) = s.compound_mut() else {
            return;
        };
        let (inner_size, inner_center) = match bounds {
            Some((min, max)) => (max - min, (min + max) / 2.0),
            None => (Vec2::zeros(), position - body.border_offset()),
        };
        body.inner_canvas_size = inner_size;
        body.inner_canvas_center = inner_center;
        let outer_size = inner_size + body.border_size();
        let outer_center = inner_center + body.border_offset();
        s.size = outer_size;
        s.position = outer_center;
    }
}
