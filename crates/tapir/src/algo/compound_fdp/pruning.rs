//! Temporary removal of dangling trees hanging off the top level.
//!
//! Leaves are peeled off in rounds so the skeleton is laid out first; the rounds are grown back
//! newest first, which guarantees the neighbor of every regrown leaf is already in place.

use super::levels::LevelIndex;
use super::state::StateId;
use rustc_hash::FxHashMap;
use tapir_graphlib::{CompoundGraph, EdgeKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RemovedLeaf {
    pub(super) vertex: StateId,
    pub(super) edge: EdgeKey,
}

#[derive(Debug, Clone, Default)]
pub(super) struct TreePruner {
    rounds: Vec<Vec<RemovedLeaf>>,
}

impl TreePruner {
    /// Removes degree-1, non-compound top-level vertices until a round removes nothing.
    ///
    /// A leaf whose neighbor has no other edge is kept, so every connected component retains at
    /// least one edge.
    pub(super) fn prune(
        graph: &mut CompoundGraph,
        levels: &mut LevelIndex,
        ids: &[String],
    ) -> Self {
        let mut rounds: Vec<Vec<RemovedLeaf>> = Vec::new();
        loop {
            let candidates: Vec<StateId> = levels
                .level(0)
                .filter(|&v| {
                    let id = ids[v].as_str();
                    graph.degree(id) == 1 && !graph.is_compound_vertex(id).unwrap_or(true)
                })
                .collect();

            let mut round: Vec<RemovedLeaf> = Vec::new();
            for v in candidates {
                let id = ids[v].as_str();
                if graph.degree(id) != 1 {
                    continue;
                }
                let Some(edge) = graph.node_edges(id).first().map(|e| (*e).clone()) else {
                    continue;
                };
                let Some(neighbor) = edge.other(id) else {
                    continue;
                };
                if graph.degree(neighbor) <= 1 {
                    continue;
                }
                graph.remove_vertex(id);
                levels.remove_top(v);
                round.push(RemovedLeaf { vertex: v, edge });
            }

            if round.is_empty() {
                break;
            }
            rounds.push(round);
        }
        Self { rounds }
    }

    pub(super) fn pending_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub(super) fn removed_count(&self) -> usize {
        self.rounds.iter().map(Vec::len).sum()
    }

    pub(super) fn removed_vertices(&self) -> impl Iterator<Item = StateId> + '_ {
        self.rounds.iter().flatten().map(|leaf| leaf.vertex)
    }

    pub(super) fn all_trees_grown(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Puts the most recently pruned round back into `graph` and the top level.
    ///
    /// Returns each regrown vertex together with the neighbor it hangs off.
    pub(super) fn grow_round(
        &mut self,
        graph: &mut CompoundGraph,
        levels: &mut LevelIndex,
        ids: &[String],
        index: &FxHashMap<String, StateId>,
    ) -> Vec<(StateId, Option<StateId>)> {
        let Some(round) = self.rounds.pop() else {
            return Vec::new();
        };
        round
            .into_iter()
            .map(|leaf| {
                let id = ids[leaf.vertex].as_str();
                let neighbor = leaf.edge.other(id).and_then(|n| index.get(n).copied());
                graph.ensure_node(id);
                graph.set_edge_key(leaf.edge, ());
                levels.insert_top(leaf.vertex);
                (leaf.vertex, neighbor)
            })
            .collect()
    }
}
