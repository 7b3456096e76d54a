use super::state::StateId;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

type FxIndexSet<K> = IndexSet<K, FxBuildHasher>;

/// Vertices grouped by containment depth; level 0 holds the parentless vertices.
#[derive(Debug, Clone, Default)]
pub(super) struct LevelIndex {
    levels: Vec<FxIndexSet<StateId>>,
}

impl LevelIndex {
    /// Breadth-first expansion of the containment relation starting at `roots`.
    pub(super) fn build<F>(roots: impl IntoIterator<Item = StateId>, mut children: F) -> Self
    where
        F: FnMut(StateId) -> Vec<StateId>,
    {
        let mut levels: Vec<FxIndexSet<StateId>> = Vec::new();
        let mut current: FxIndexSet<StateId> = roots.into_iter().collect();
        while !current.is_empty() {
            let next: FxIndexSet<StateId> = current.iter().flat_map(|&v| children(v)).collect();
            levels.push(current);
            current = next;
        }
        Self { levels }
    }

    pub(super) fn depth(&self) -> usize {
        self.levels.len()
    }

    pub(super) fn level(&self, depth: usize) -> impl Iterator<Item = StateId> + '_ {
        self.levels.get(depth).into_iter().flatten().copied()
    }

    /// `(depth, members)` pairs, deepest level first.
    pub(super) fn deepest_first(&self) -> impl Iterator<Item = (usize, Vec<StateId>)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .rev()
            .map(|(depth, set)| (depth, set.iter().copied().collect()))
    }

    pub(super) fn remove_top(&mut self, id: StateId) -> bool {
        self.levels
            .first_mut()
            .is_some_and(|top| top.shift_remove(&id))
    }

    pub(super) fn insert_top(&mut self, id: StateId) {
        if self.levels.is_empty() {
            self.levels.push(FxIndexSet::default());
        }
        self.levels[0].insert(id);
    }
}
