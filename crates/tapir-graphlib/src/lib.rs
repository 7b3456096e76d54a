#![forbid(unsafe_code)]

//! Directed compound graph container used by `tapir`.
//!
//! Vertices are string keyed and carry an optional label; edges are keyed by
//! `(v, w, name)` so parallel edges are possible when they are named. On top of the directed
//! structure the graph keeps a containment relation: every vertex has at most one parent, and a
//! vertex is *compound* exactly when it owns a (possibly empty) children list.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;
type FxIndexSet<K> = IndexSet<K, FxBuildHasher>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("vertex not found: {vertex}")]
    VertexNotFound { vertex: String },
    #[error("vertex {child} is already contained in {existing}; cannot move it into {requested}")]
    ParentConflict {
        child: String,
        existing: String,
        requested: String,
    },
    #[error("placing {child} inside {parent} would make {child} contain itself")]
    ContainmentCycle { parent: String, child: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub v: String,
    pub w: String,
    pub name: Option<String>,
}

impl EdgeKey {
    pub fn new(
        v: impl Into<String>,
        w: impl Into<String>,
        name: Option<impl Into<String>>,
    ) -> Self {
        Self {
            v: v.into(),
            w: w.into(),
            name: name.map(Into::into),
        }
    }

    /// The endpoint opposite to `vertex`, or `None` when `vertex` is not incident.
    pub fn other(&self, vertex: &str) -> Option<&str> {
        if self.v == vertex {
            Some(self.w.as_str())
        } else if self.w == vertex {
            Some(self.v.as_str())
        } else {
            None
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.v == self.w
    }
}

#[derive(Debug, Clone)]
struct NodeEntry<N> {
    label: N,
    out_edges: FxIndexSet<EdgeKey>,
    in_edges: FxIndexSet<EdgeKey>,
}

#[derive(Debug, Clone)]
pub struct CompoundGraph<N = (), E = ()> {
    nodes: FxIndexMap<String, NodeEntry<N>>,
    edges: FxIndexMap<EdgeKey, E>,
    parent: FxHashMap<String, String>,
    children: FxIndexMap<String, FxIndexSet<String>>,
}

impl<N, E> Default for CompoundGraph<N, E>
where
    N: Default,
    E: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> CompoundGraph<N, E>
where
    N: Default,
    E: Default,
{
    pub fn new() -> Self {
        Self {
            nodes: FxIndexMap::default(),
            edges: FxIndexMap::default(),
            parent: FxHashMap::default(),
            children: FxIndexMap::default(),
        }
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn set_node(&mut self, id: impl Into<String>, label: N) -> &mut Self {
        let id = id.into();
        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.label = label;
            return self;
        }
        self.nodes.insert(
            id,
            NodeEntry {
                label,
                out_edges: FxIndexSet::default(),
                in_edges: FxIndexSet::default(),
            },
        );
        self
    }

    pub fn ensure_node(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return self;
        }
        self.set_node(id, N::default())
    }

    /// Adds `id` (if absent) and declares it compound even before it has children.
    pub fn add_compound_vertex(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        self.ensure_node(id.clone());
        self.children.entry(id).or_default();
        self
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.nodes.get(id).map(|n| &n.label)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        self.nodes.get_mut(id).map(|n| &mut n.label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edges.keys()
    }

    pub fn set_edge(&mut self, v: impl Into<String>, w: impl Into<String>) -> &mut Self {
        self.set_edge_named(v, w, None::<String>, None)
    }

    pub fn set_edge_with_label(
        &mut self,
        v: impl Into<String>,
        w: impl Into<String>,
        label: E,
    ) -> &mut Self {
        self.set_edge_named(v, w, None::<String>, Some(label))
    }

    pub fn set_edge_named(
        &mut self,
        v: impl Into<String>,
        w: impl Into<String>,
        name: Option<impl Into<String>>,
        label: Option<E>,
    ) -> &mut Self {
        let key = EdgeKey::new(v, w, name);
        self.insert_edge(key, label)
    }

    pub fn set_edge_key(&mut self, key: EdgeKey, label: E) -> &mut Self {
        self.insert_edge(key, Some(label))
    }

    fn insert_edge(&mut self, key: EdgeKey, label: Option<E>) -> &mut Self {
        if let Some(existing) = self.edges.get_mut(&key) {
            if let Some(label) = label {
                *existing = label;
            }
            return self;
        }

        self.ensure_node(key.v.clone());
        self.ensure_node(key.w.clone());
        if let Some(n) = self.nodes.get_mut(&key.v) {
            n.out_edges.insert(key.clone());
        }
        if let Some(n) = self.nodes.get_mut(&key.w) {
            n.in_edges.insert(key.clone());
        }
        self.edges.insert(key, label.unwrap_or_default());
        self
    }

    pub fn set_path(&mut self, nodes: &[&str]) -> &mut Self {
        for pair in nodes.windows(2) {
            self.set_edge(pair[0], pair[1]);
        }
        self
    }

    pub fn has_edge(&self, v: &str, w: &str, name: Option<&str>) -> bool {
        self.edges.contains_key(&EdgeKey::new(v, w, name))
    }

    pub fn has_edge_key(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    pub fn edge(&self, v: &str, w: &str, name: Option<&str>) -> Option<&E> {
        self.edges.get(&EdgeKey::new(v, w, name))
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<&E> {
        self.edges.get(key)
    }

    pub fn remove_edge(&mut self, v: &str, w: &str, name: Option<&str>) -> Option<E> {
        self.remove_edge_key(&EdgeKey::new(v, w, name))
    }

    /// Removes the edge and returns its label so callers can reinsert it later.
    pub fn remove_edge_key(&mut self, key: &EdgeKey) -> Option<E> {
        let label = self.edges.shift_remove(key)?;
        if let Some(n) = self.nodes.get_mut(&key.v) {
            n.out_edges.shift_remove(key);
        }
        if let Some(n) = self.nodes.get_mut(&key.w) {
            n.in_edges.shift_remove(key);
        }
        Some(label)
    }

    pub fn out_edges(&self, v: &str) -> impl Iterator<Item = &EdgeKey> {
        self.nodes.get(v).into_iter().flat_map(|n| n.out_edges.iter())
    }

    pub fn in_edges(&self, v: &str) -> impl Iterator<Item = &EdgeKey> {
        self.nodes.get(v).into_iter().flat_map(|n| n.in_edges.iter())
    }

    /// Incident edges of `v`; a self loop is listed once.
    pub fn node_edges(&self, v: &str) -> Vec<&EdgeKey> {
        let mut out: Vec<&EdgeKey> = self.out_edges(v).collect();
        out.extend(self.in_edges(v).filter(|e| !e.is_self_loop()));
        out
    }

    /// In-degree plus out-degree. A self loop contributes two.
    pub fn degree(&self, v: &str) -> usize {
        self.nodes
            .get(v)
            .map(|n| n.out_edges.len() + n.in_edges.len())
            .unwrap_or(0)
    }

    pub fn neighbors(&self, v: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.node_edges(v) {
            if let Some(other) = e.other(v) {
                if !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        out
    }

    /// Places `child` inside `parent`, adding `child` to the graph when it is absent.
    ///
    /// Returns `Ok(true)` when the containment changed and `Ok(false)` when `child` was already
    /// a child of `parent`. Moving a vertex out of a different parent is rejected; the graph is
    /// left untouched on error.
    pub fn add_child_vertex(&mut self, parent: &str, child: impl Into<String>) -> Result<bool> {
        let child = child.into();
        if !self.check_child_placement(parent, &child)? {
            return Ok(false);
        }
        self.attach(parent, child);
        Ok(true)
    }

    /// Adds every child or none of them. Returns how many placements changed.
    pub fn add_child_vertex_range<I, S>(&mut self, parent: &str, children: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children: Vec<String> = children.into_iter().map(Into::into).collect();
        let mut pending: Vec<String> = Vec::with_capacity(children.len());
        for child in children {
            if self.check_child_placement(parent, &child)? && !pending.contains(&child) {
                pending.push(child);
            }
        }
        let changed = pending.len();
        for child in pending {
            self.attach(parent, child);
        }
        Ok(changed)
    }

    fn check_child_placement(&self, parent: &str, child: &str) -> Result<bool> {
        if !self.has_node(parent) {
            return Err(Error::VertexNotFound {
                vertex: parent.to_string(),
            });
        }
        if let Some(existing) = self.parent.get(child) {
            if existing == parent {
                return Ok(false);
            }
            return Err(Error::ParentConflict {
                child: child.to_string(),
                existing: existing.clone(),
                requested: parent.to_string(),
            });
        }
        let mut cur = Some(parent);
        while let Some(p) = cur {
            if p == child {
                return Err(Error::ContainmentCycle {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
            cur = self.parent.get(p).map(String::as_str);
        }
        Ok(true)
    }

    fn attach(&mut self, parent: &str, child: String) {
        self.ensure_node(child.clone());
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(child.clone());
        self.parent.insert(child, parent.to_string());
    }

    /// Detaches `child` from its parent (the vertex itself stays in the graph).
    pub fn remove_child_vertex(&mut self, child: &str) -> Result<bool> {
        if !self.has_node(child) {
            return Err(Error::VertexNotFound {
                vertex: child.to_string(),
            });
        }
        let Some(parent) = self.parent.remove(child) else {
            return Ok(false);
        };
        self.forget_child(&parent, child);
        Ok(true)
    }

    fn forget_child(&mut self, parent: &str, child: &str) {
        let emptied = match self.children.get_mut(parent) {
            Some(ch) => {
                ch.shift_remove(child);
                ch.is_empty()
            }
            None => false,
        };
        if emptied {
            self.children.shift_remove(parent);
        }
    }

    pub fn parent(&self, v: &str) -> Result<Option<&str>> {
        self.require(v)?;
        Ok(self.parent.get(v).map(String::as_str))
    }

    pub fn is_compound_vertex(&self, v: &str) -> Result<bool> {
        self.require(v)?;
        Ok(self.children.contains_key(v))
    }

    pub fn children_vertices(&self, v: &str) -> Result<Vec<&str>> {
        self.require(v)?;
        Ok(self
            .children
            .get(v)
            .map(|ch| ch.iter().map(String::as_str).collect())
            .unwrap_or_default())
    }

    pub fn children_count(&self, v: &str) -> Result<usize> {
        self.require(v)?;
        Ok(self.children.get(v).map(IndexSet::len).unwrap_or(0))
    }

    /// Vertices without a parent, in insertion order.
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .keys()
            .filter(|id| !self.parent.contains_key(id.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Removes `id`, its incident edges and every containment entry that mentions it.
    ///
    /// Children of a removed compound vertex become roots; a parent whose children list becomes
    /// empty stops being compound.
    pub fn remove_vertex(&mut self, id: &str) -> bool {
        let Some(entry) = self.nodes.shift_remove(id) else {
            return false;
        };

        for key in entry.out_edges.iter().chain(entry.in_edges.iter()) {
            if self.edges.shift_remove(key).is_none() {
                continue;
            }
            if let Some(other) = key.other(id).filter(|o| *o != id) {
                if let Some(n) = self.nodes.get_mut(other) {
                    n.out_edges.shift_remove(key);
                    n.in_edges.shift_remove(key);
                }
            }
        }

        if let Some(parent) = self.parent.remove(id) {
            self.forget_child(&parent, id);
        }
        if let Some(ch) = self.children.shift_remove(id) {
            for child in ch {
                self.parent.remove(&child);
            }
        }

        true
    }

    fn require(&self, v: &str) -> Result<()> {
        if self.has_node(v) {
            Ok(())
        } else {
            Err(Error::VertexNotFound {
                vertex: v.to_string(),
            })
        }
    }
}
