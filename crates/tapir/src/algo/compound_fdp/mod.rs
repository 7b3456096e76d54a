//! Compound force-directed placement.
//!
//! The run is split into three annealing phases. Every step accumulates spring forces along
//! edges, repulsion between siblings and (from the second phase on) gravitation towards the
//! enclosing container plus optional application forces, then moves vertices deepest level
//! first so containers feel the averaged pull of their contents before they move.
//!
//! Dangling trees on the top level are pruned before the first phase and grown back round by
//! round during the second one. Gravitation and application forces do not wait for regrowth:
//! they run on every step of the second and third phases.

mod forces;
mod hooks;
mod levels;
mod pruning;
mod report;
mod rng;
mod state;

pub use hooks::{ApplicationForces, CancellationToken, VertexSnapshot};
pub use report::{ForceDebug, IterationObserver, IterationReport};

use self::forces::{RepulsionParams, Shape, Vec2};
use self::levels::LevelIndex;
use self::pruning::TreePruner;
use self::rng::XorShift64Star;
use self::state::{ForceKind, Origin, StateArena, StateId};
use super::CompoundFdpOptions;
use crate::error::{Error, Result};
use crate::graph::{InnerLayoutType, LayoutResult, Point, Size, VertexAttributes};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tapir_graphlib::CompoundGraph;
use tracing::{debug, trace};

/// Temperature never drops below this share of the phase's starting temperature.
const TEMPERATURE_FLOOR: f64 = 0.1;
const FIRST_PHASE_REPULSION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum Phase {
    First,
    Second,
    Third,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::First, Phase::Second, Phase::Third];

    pub fn number(self) -> u8 {
        match self {
            Phase::First => 1,
            Phase::Second => 2,
            Phase::Third => 3,
        }
    }
}

/// Lays out `graph` with default hooks and no observer.
pub fn layout<N, E>(
    graph: &CompoundGraph<N, E>,
    attrs: &VertexAttributes,
    options: &CompoundFdpOptions,
) -> Result<LayoutResult>
where
    N: Default,
    E: Default,
{
    CompoundFdpLayout::new(graph, attrs, options)?.run(None)
}

/// A prepared layout run.
///
/// Construction copies the topology of the input graph, so the caller's graph is never touched;
/// pruning and regrowth operate on the copy exposed through [`CompoundFdpLayout::graph`].
pub struct CompoundFdpLayout {
    options: CompoundFdpOptions,
    topology: CompoundGraph,
    ids: Vec<String>,
    index: FxHashMap<String, StateId>,
    arena: StateArena,
    levels: LevelIndex,
    pruner: TreePruner,
    rng: XorShift64Star,
    gravity_magnitude: f64,
    application: Option<Box<dyn ApplicationForces>>,
    cancellation: Option<CancellationToken>,
    root_bounds_calculated: bool,
}

impl CompoundFdpLayout {
    pub fn new<N, E>(
        graph: &CompoundGraph<N, E>,
        attrs: &VertexAttributes,
        options: &CompoundFdpOptions,
    ) -> Result<Self>
    where
        N: Default,
        E: Default,
    {
        options.validate()?;
        attrs.validate(graph)?;

        let ids: Vec<String> = graph.nodes().map(str::to_string).collect();
        let index: FxHashMap<String, StateId> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut topology: CompoundGraph = CompoundGraph::new();
        for id in &ids {
            topology.ensure_node(id.as_str());
        }
        for key in graph.edges() {
            topology.set_edge_key(key.clone(), ());
        }
        for id in &ids {
            if graph.is_compound_vertex(id)? {
                topology.add_compound_vertex(id.as_str());
                topology.add_child_vertex_range(id, graph.children_vertices(id)?)?;
            }
        }

        let mut rng = XorShift64Star::new(options.random_seed);
        let box_size = options.initial_box_size;
        let leaves: Vec<(Vec2, Vec2)> = ids
            .iter()
            .map(|id| {
                let position = match attrs.positions.get(id) {
                    Some(p) => Vec2::from(*p),
                    None => Vec2::new(
                        rng.next_f64_unit() * box_size,
                        rng.next_f64_unit() * box_size,
                    ),
                };
                let size = attrs
                    .sizes
                    .get(id)
                    .map(|s| Vec2::new(s.width, s.height))
                    .unwrap_or_else(Vec2::zeros);
                (position, size)
            })
            .collect();
        let mut arena = StateArena::with_leaves(leaves);

        let children_of = |v: StateId| -> Vec<StateId> {
            topology
                .children_vertices(&ids[v])
                .map(|ch| ch.into_iter().filter_map(|c| index.get(c).copied()).collect())
                .unwrap_or_default()
        };
        let roots: Vec<StateId> = topology
            .roots()
            .into_iter()
            .filter_map(|r| index.get(r).copied())
            .collect();
        let mut levels = LevelIndex::build(roots, children_of);

        // Containers are built deepest first so their children already have their final size.
        let layout_types: Vec<InnerLayoutType> = ids
            .iter()
            .map(|id| attrs.layout_types.get(id).copied().unwrap_or_default())
            .collect();
        let mut fixed: Vec<StateId> = Vec::new();
        for (_, members) in levels.deepest_first() {
            for v in members {
                if !topology.is_compound_vertex(&ids[v])? {
                    continue;
                }
                let borders = attrs.borders.get(&ids[v]).copied().unwrap_or_default();
                arena.make_compound(v, borders, &children_of(v));
                if layout_types[v] == InnerLayoutType::Fixed {
                    fixed.push(v);
                }
            }
        }
        for depth in 0..levels.depth() {
            for v in levels.level(depth) {
                arena.set_level(v, depth);
            }
        }

        for &c in &fixed {
            let mut anchor = Some(c);
            while let Some(a) = anchor {
                if layout_types[a] != InnerLayoutType::Fixed {
                    break;
                }
                anchor = arena[a].parent.filter(|&p| p != arena.root());
            }
            let children = arena[c]
                .compound()
                .map(|body| body.children.clone())
                .unwrap_or_default();
            for child in children {
                arena.pin(child, anchor);
            }
        }

        let pruner = TreePruner::prune(&mut topology, &mut levels, &ids);
        for v in pruner.removed_vertices() {
            arena.detach(v);
        }

        let (mut sum_w, mut sum_h, mut count) = (0.0_f64, 0.0_f64, 0usize);
        for v in levels.level(0) {
            sum_w += arena[v].size.x;
            sum_h += arena[v].size.y;
            count += 1;
        }
        let gravity_magnitude = if count == 0 {
            0.0
        } else {
            sum_w.min(sum_h) / count as f64
        };

        debug!(
            vertices = ids.len(),
            levels = levels.depth(),
            fixed_compounds = fixed.len(),
            pruned = pruner.removed_count(),
            pruning_rounds = pruner.pending_rounds(),
            gravity_magnitude,
            "initialized compound layout"
        );

        Ok(Self {
            options: *options,
            topology,
            ids,
            index,
            arena,
            levels,
            pruner,
            rng,
            gravity_magnitude,
            application: None,
            cancellation: None,
            root_bounds_calculated: false,
        })
    }

    pub fn with_application_forces<A>(mut self, forces: A) -> Self
    where
        A: ApplicationForces + 'static,
    {
        self.application = Some(Box::new(forces));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The working copy of the input graph. Pruned leaves are missing until they are regrown.
    pub fn graph(&self) -> &CompoundGraph {
        &self.topology
    }

    pub fn all_trees_grown(&self) -> bool {
        self.pruner.all_trees_grown()
    }

    pub fn pruned_vertex_count(&self) -> usize {
        self.pruner.removed_count()
    }

    pub fn level_of(&self, vertex: &str) -> Result<usize> {
        self.index
            .get(vertex)
            .map(|&v| self.arena[v].level)
            .ok_or_else(|| Error::VertexNotFound {
                vertex: vertex.to_string(),
            })
    }

    pub fn position_of(&self, vertex: &str) -> Result<Point> {
        self.index
            .get(vertex)
            .map(|&v| Point::from(self.arena[v].position))
            .ok_or_else(|| Error::VertexNotFound {
                vertex: vertex.to_string(),
            })
    }

    /// Runs all three phases and returns the final placement.
    ///
    /// `observer` receives one report per step. A cancelled run still returns `Ok`, with
    /// [`LayoutResult::cancelled`] set.
    pub fn run(
        &mut self,
        mut observer: Option<&mut dyn IterationObserver>,
    ) -> Result<LayoutResult> {
        let span = tracing::debug_span!(
            "compound_fdp",
            vertices = self.ids.len(),
            edges = self.topology.edge_count()
        );
        let _enter = span.enter();

        let base = (self.ids.len() as f64).sqrt() * self.options.ideal_edge_length;
        let mut transition = 1.0;
        for phase in Phase::ALL {
            let initial = base * self.options.phase_temperature_multiplier(phase) * transition;
            transition *= self.options.temperature_decreasing;

            if !self.run_phase(phase, initial, observer.as_deref_mut()) {
                debug!(phase = phase.number(), "layout cancelled");
                return Ok(self.finish(true));
            }
            if !self.root_bounds_calculated {
                let root = self.arena.root();
                self.arena.recalculate_bounds(root);
                self.root_bounds_calculated = true;
            }
        }
        Ok(self.finish(false))
    }

    /// Returns `false` when the run was cancelled.
    fn run_phase<'o>(
        &mut self,
        phase: Phase,
        initial_temperature: f64,
        mut observer: Option<&mut (dyn IterationObserver + 'o)>,
    ) -> bool {
        let iterations = self.options.phase_iterations(phase);
        let floor = initial_temperature * TEMPERATURE_FLOOR;
        let mut temperature = initial_temperature;
        let mut step = 0usize;
        debug!(
            phase = phase.number(),
            iterations,
            temperature = initial_temperature,
            "phase started"
        );

        loop {
            let regrowing = phase == Phase::Second && !self.pruner.all_trees_grown();
            if step >= iterations && !regrowing {
                break;
            }
            if self.is_cancelled() {
                return false;
            }
            step += 1;

            let remaining = iterations.saturating_sub(step).max(1) as f64;
            let limit =
                temperature * remaining / 100.0 * self.options.displacement_limit_multiplier;
            trace!(phase = phase.number(), step, temperature, limit, "step");

            self.spring_forces();
            self.repulsion_forces(phase);
            if phase != Phase::First {
                self.gravitation_forces();
                self.application_forces(phase, step);
            }
            if let Some(observer) = observer.as_deref_mut() {
                observer.on_iteration(&self.report(phase, step, temperature, limit));
            }
            self.apply_forces(limit);

            if phase == Phase::Second && step % self.options.grow_interval == 0 {
                self.grow_round();
            }
            temperature = (temperature * self.options.temperature_factor).max(floor);
        }

        debug!(phase = phase.number(), steps = step, "phase finished");
        true
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn shape(&self, v: StateId) -> Shape {
        Shape {
            center: self.arena[v].position,
            size: self.arena[v].size,
        }
    }

    /// Applies `force` to `u` and its opposite to `v`.
    ///
    /// When exactly one side is pinned in place, the other side takes the whole correction.
    fn apply_pair(&mut self, kind: ForceKind, u: StateId, v: StateId, force: Vec2) {
        let force = if self.arena.is_pinned(u) != self.arena.is_pinned(v) {
            force * 2.0
        } else {
            force
        };
        self.arena.add_force(kind, u, force);
        self.arena.add_force(kind, v, -force);
    }

    fn spring_forces(&mut self) {
        let edges: Vec<(StateId, StateId)> = self
            .topology
            .edges()
            .filter(|e| !e.is_self_loop())
            .filter_map(|e| Some((*self.index.get(&e.v)?, *self.index.get(&e.w)?)))
            .collect();

        let ideal = self.options.ideal_edge_length;
        for (u, v) in edges {
            let (su, sv) = (&self.arena[u], &self.arena[v]);
            let level_sum = (su.level + sv.level) as f64;
            let edge_length = if su.parent == sv.parent {
                ideal
            } else {
                ideal * (1.0 + (level_sum + 1.0) * self.options.nesting_factor)
            };
            let force = forces::spring_force(
                self.shape(u),
                self.shape(v),
                edge_length,
                self.options.elastic_constant,
                level_sum / 2.0 + 1.0,
                &mut self.rng,
            );
            self.apply_pair(ForceKind::Spring, u, v, force);
        }
    }

    fn repulsion_forces(&mut self, phase: Phase) {
        let params = RepulsionParams {
            ideal_edge_length: self.options.ideal_edge_length,
            separation_multiplier: self.options.separation_multiplier,
            repulsion_constant: self.options.repulsion_constant,
        };
        let phase_scale = if phase == Phase::First {
            FIRST_PHASE_REPULSION
        } else {
            1.0
        };

        let levels: Vec<(usize, Vec<StateId>)> = self.levels.deepest_first().collect();
        for (depth, members) in levels {
            let scale = ((depth + 1) as f64).powi(2) * phase_scale;
            for (i, &u) in members.iter().enumerate() {
                for &v in &members[i + 1..] {
                    if self.arena[u].parent != self.arena[v].parent {
                        continue;
                    }
                    let force = forces::repulsion_force(
                        self.shape(u),
                        self.shape(v),
                        &params,
                        scale,
                        &mut self.rng,
                    );
                    self.apply_pair(ForceKind::Repulsion, u, v, force);
                }
            }
        }
    }

    fn gravitation_forces(&mut self) {
        let base = self.options.gravitation_factor * self.gravity_magnitude;
        let ideal = self.options.ideal_edge_length;
        let levels: Vec<(usize, Vec<StateId>)> = self.levels.deepest_first().collect();
        for (depth, members) in levels {
            let magnitude = base * ((depth + 1) as f64).powi(2);
            for v in members {
                let Some(parent) = self.arena[v].parent else {
                    continue;
                };
                let target = self.arena.inner_canvas_center(parent);
                let force =
                    forces::gravitation_force(self.arena[v].position, target, magnitude, ideal);
                self.arena.add_force(ForceKind::Gravitation, v, force);
            }
        }
    }

    fn application_forces(&mut self, phase: Phase, step: usize) {
        let Some(hook) = self.application.as_mut() else {
            return;
        };
        let mut pending: Vec<(StateId, Vec2)> = Vec::new();
        for depth in 0..self.levels.depth() {
            for v in self.levels.level(depth) {
                let s = &self.arena[v];
                let snapshot = VertexSnapshot {
                    id: &self.ids[v],
                    position: s.position.into(),
                    size: Size::new(s.size.x, s.size.y),
                    level: s.level,
                    parent: s.parent.and_then(|p| vertex_name(&self.arena, &self.ids, p)),
                    is_compound: s.is_compound(),
                };
                if let Some(force) = hook.force(&snapshot, phase, step) {
                    pending.push((v, force.into()));
                }
            }
        }
        for (v, force) in pending {
            self.arena.add_force(ForceKind::Application, v, force);
        }
    }

    fn apply_forces(&mut self, limit: f64) {
        let levels: Vec<(usize, Vec<StateId>)> = self.levels.deepest_first().collect();
        for (_, members) in levels {
            for v in members {
                self.arena.apply_displacement(v, limit);
            }
        }
        let root = self.arena.root();
        self.arena.clear_children_force(root);
    }

    fn grow_round(&mut self) {
        let grown = self.pruner.grow_round(
            &mut self.topology,
            &mut self.levels,
            &self.ids,
            &self.index,
        );
        if grown.is_empty() {
            return;
        }
        let root = self.arena.root();
        for &(v, neighbor) in &grown {
            if let Some(n) = neighbor {
                let position = self.arena[n].position;
                self.arena.set_position(v, position);
            }
            self.arena.attach(root, v);
            self.arena.set_level(v, 0);
        }
        debug!(
            regrown = grown.len(),
            remaining_rounds = self.pruner.pending_rounds(),
            "regrew pruned leaves"
        );
    }

    fn report(
        &self,
        phase: Phase,
        step: usize,
        temperature: f64,
        displacement_limit: f64,
    ) -> IterationReport {
        let mut positions = BTreeMap::new();
        let mut forces = BTreeMap::new();
        for depth in 0..self.levels.depth() {
            for v in self.levels.level(depth) {
                let s = &self.arena[v];
                positions.insert(self.ids[v].clone(), Point::from(s.position));
                forces.insert(
                    self.ids[v].clone(),
                    ForceDebug {
                        spring: s.forces.spring.into(),
                        repulsion: s.forces.repulsion.into(),
                        gravitation: s.forces.gravitation.into(),
                        application: s.forces.application.into(),
                    },
                );
            }
        }
        IterationReport {
            phase,
            step,
            message: format!("phase {}, step {}", phase.number(), step),
            temperature,
            displacement_limit,
            positions,
            forces,
        }
    }

    /// Grows back whatever is still pruned and copies the placement out.
    fn finish(&mut self, cancelled: bool) -> LayoutResult {
        while !self.pruner.all_trees_grown() {
            self.grow_round();
        }

        let mut result = LayoutResult {
            cancelled,
            ..LayoutResult::default()
        };
        for (v, id) in self.ids.iter().enumerate() {
            let s = &self.arena[v];
            result.positions.insert(id.clone(), s.position.into());
            result
                .sizes
                .insert(id.clone(), Size::new(s.size.x, s.size.y));
            result.levels.insert(id.clone(), s.level);
            if let Some(body) = s.compound() {
                let inner = body.inner_canvas_size;
                result
                    .inner_canvas_sizes
                    .insert(id.clone(), Size::new(inner.x, inner.y));
            }
        }
        result
    }
}

fn vertex_name<'a>(arena: &StateArena, ids: &'a [String], state: StateId) -> Option<&'a str> {
    match arena[state].origin {
        Origin::Vertex(i) => ids.get(i).map(String::as_str),
        Origin::Root => None,
    }
}
