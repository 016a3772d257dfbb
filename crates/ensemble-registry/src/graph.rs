//! Stage graph of a scene.
//!
//! Stages live in one owning arena inside their [`Scene`](crate::scene::Scene);
//! the graph refers to them by [`StageIndex`] only, so edges can never dangle
//! and never outlive the scene.
//!
//! # Node classes
//!
//! - **Root**: the scene's start stage. Exactly one per graph, whatever its
//!   out-degree.
//! - **Sink**: any other stage without successors.
//! - **Default**: everything else.
//!
//! # Cycles
//!
//! Path searches keep the set of stages on the current branch and never step
//! onto one of them again. A cycle therefore truncates the branch it appears
//! on instead of looping.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Position of a stage in its scene's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageIndex(pub usize);

/// Classification of a stage within the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Root,
    Sink,
    Default,
}

/// Directed graph over the stages of one scene.
///
/// `edges[i]` is the ordered successor list of stage `i`; every stage has an
/// entry, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageGraph {
    edges: Vec<Vec<StageIndex>>,
    root: StageIndex,
}

impl StageGraph {
    /// Build from a total adjacency list.
    ///
    /// Callers guarantee that `root` and every edge target index into
    /// `edges`; the decoder validates this before building.
    pub(crate) fn new(edges: Vec<Vec<StageIndex>>, root: StageIndex) -> Self {
        debug_assert!(root.0 < edges.len());
        debug_assert!(edges.iter().flatten().all(|t| t.0 < edges.len()));
        Self { edges, root }
    }

    /// Build from an adjacency list, or `None` if `root` or any edge target
    /// is out of range.
    pub fn try_new(edges: Vec<Vec<StageIndex>>, root: StageIndex) -> Option<Self> {
        let len = edges.len();
        let in_range = root.0 < len && edges.iter().flatten().all(|t| t.0 < len);
        in_range.then(|| Self::new(edges, root))
    }

    pub fn root(&self) -> StageIndex {
        self.root
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, stage: StageIndex) -> bool {
        stage.0 < self.edges.len()
    }

    /// Ordered successors of `stage`; empty for an unknown index.
    pub fn successors(&self, stage: StageIndex) -> &[StageIndex] {
        self.edges.get(stage.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_degree(&self, stage: StageIndex) -> usize {
        self.successors(stage).len()
    }

    fn is_terminal(&self, stage: StageIndex) -> bool {
        self.successors(stage).is_empty()
    }

    /// Classify `stage`, or `None` if it is not part of this graph.
    pub fn node_type(&self, stage: StageIndex) -> Option<NodeType> {
        if !self.contains(stage) {
            None
        } else if stage == self.root {
            Some(NodeType::Root)
        } else if self.is_terminal(stage) {
            Some(NodeType::Sink)
        } else {
            Some(NodeType::Default)
        }
    }

    /// Every stage without successors, in arena order.
    pub fn sinks(&self) -> Vec<StageIndex> {
        (0..self.edges.len())
            .map(StageIndex)
            .filter(|&s| self.is_terminal(s))
            .collect()
    }

    /// The longest cycle-free path from `src` to a stage without successors,
    /// both endpoints included.
    ///
    /// Ties keep the first path found in successor order. If `src` has no
    /// successors the path is `[src]`; if no terminal stage is reachable at
    /// all the path is also `[src]`. An unknown `src` yields an empty path.
    pub fn longest_path(&self, src: StageIndex) -> Vec<StageIndex> {
        if !self.contains(src) {
            return Vec::new();
        }
        let mut on_branch = vec![false; self.edges.len()];
        self.longest_from(src, &mut on_branch)
            .unwrap_or_else(|| vec![src])
    }

    fn longest_from(&self, node: StageIndex, on_branch: &mut [bool]) -> Option<Vec<StageIndex>> {
        if self.is_terminal(node) {
            return Some(vec![node]);
        }
        on_branch[node.0] = true;
        let mut best: Option<Vec<StageIndex>> = None;
        for &next in self.successors(node) {
            if on_branch[next.0] {
                continue;
            }
            if let Some(tail) = self.longest_from(next, on_branch) {
                if best.as_ref().map_or(true, |b| tail.len() > b.len()) {
                    best = Some(tail);
                }
            }
        }
        on_branch[node.0] = false;

        best.map(|tail| {
            let mut path = Vec::with_capacity(tail.len() + 1);
            path.push(node);
            path.extend(tail);
            path
        })
    }

    /// The full route `[src, .., sink]` to the nearest stage without
    /// successors, found breadth-first in successor order.
    ///
    /// `[src]` if `src` has no successors or no terminal stage is reachable;
    /// empty for an unknown `src`.
    pub fn shortest_route(&self, src: StageIndex) -> Vec<StageIndex> {
        if !self.contains(src) {
            return Vec::new();
        }
        if self.is_terminal(src) {
            return vec![src];
        }

        let mut pred: Vec<Option<StageIndex>> = vec![None; self.edges.len()];
        let mut visited = vec![false; self.edges.len()];
        let mut queue = VecDeque::from([src]);
        visited[src.0] = true;

        while let Some(current) = queue.pop_front() {
            for &next in self.successors(current) {
                if visited[next.0] {
                    continue;
                }
                visited[next.0] = true;
                pred[next.0] = Some(current);
                if self.is_terminal(next) {
                    let mut route = vec![next];
                    let mut cursor = current;
                    loop {
                        route.push(cursor);
                        match pred[cursor.0] {
                            Some(p) => cursor = p,
                            None => break,
                        }
                    }
                    route.reverse();
                    return route;
                }
                queue.push_back(next);
            }
        }
        vec![src]
    }

    /// The stages strictly between `src` and the nearest stage without
    /// successors.
    ///
    /// Returns `[src]` when `src` itself has no successors. When no terminal
    /// stage is reachable the result is also `[src]`.
    pub fn shortest_path(&self, src: StageIndex) -> Vec<StageIndex> {
        let route = self.shortest_route(src);
        match route.len() {
            0 | 1 => route,
            n => route[1..n - 1].to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[&[usize]]) -> StageGraph {
        StageGraph::new(
            edges
                .iter()
                .map(|e| e.iter().copied().map(StageIndex).collect())
                .collect(),
            StageIndex(0),
        )
    }

    fn idx(v: &[usize]) -> Vec<StageIndex> {
        v.iter().copied().map(StageIndex).collect()
    }

    #[test]
    fn node_classification() {
        // 0 -> 1 -> 2, 0 -> 3
        let g = graph(&[&[1, 3], &[2], &[], &[]]);
        assert_eq!(g.node_type(StageIndex(0)), Some(NodeType::Root));
        assert_eq!(g.node_type(StageIndex(1)), Some(NodeType::Default));
        assert_eq!(g.node_type(StageIndex(2)), Some(NodeType::Sink));
        assert_eq!(g.node_type(StageIndex(3)), Some(NodeType::Sink));
        assert_eq!(g.node_type(StageIndex(9)), None);
        assert_eq!(g.sinks(), idx(&[2, 3]));
    }

    #[test]
    fn lone_root_is_root_not_sink() {
        let g = graph(&[&[]]);
        assert_eq!(g.node_type(StageIndex(0)), Some(NodeType::Root));
        assert_eq!(g.longest_path(StageIndex(0)), idx(&[0]));
        assert_eq!(g.shortest_path(StageIndex(0)), idx(&[0]));
    }

    #[test]
    fn longest_path_prefers_longer_branch() {
        // 0 -> 1 (sink); 0 -> 2 -> 3 -> 4 (sink)
        let g = graph(&[&[1, 2], &[], &[3], &[4], &[]]);
        assert_eq!(g.longest_path(StageIndex(0)), idx(&[0, 2, 3, 4]));
        assert_eq!(g.longest_path(StageIndex(1)), idx(&[1]));
    }

    #[test]
    fn longest_path_breaks_cycles_per_branch() {
        // 0 -> 1 -> 2 -> 0 (back edge), 2 -> 3 (sink); 0 -> 3
        let g = graph(&[&[1, 3], &[2], &[0, 3], &[]]);
        assert_eq!(g.longest_path(StageIndex(0)), idx(&[0, 1, 2, 3]));
        // Starting elsewhere, stage 0 is no longer on the branch and the
        // detour through it is the longer way to 3.
        assert_eq!(g.longest_path(StageIndex(1)), idx(&[1, 2, 0, 3]));
    }

    #[test]
    fn longest_path_without_reachable_sink_is_source() {
        // 0 <-> 1, nothing terminal.
        let g = graph(&[&[1], &[0]]);
        assert_eq!(g.longest_path(StageIndex(0)), idx(&[0]));
    }

    #[test]
    fn shortest_path_excludes_endpoints() {
        // 0 -> 1 -> 2 -> 3 (sink); 0 -> 4 -> 5 -> 6 -> 3
        let g = graph(&[&[1, 4], &[2], &[3], &[], &[5], &[6], &[3]]);
        assert_eq!(g.shortest_route(StageIndex(0)), idx(&[0, 1, 2, 3]));
        assert_eq!(g.shortest_path(StageIndex(0)), idx(&[1, 2]));
    }

    #[test]
    fn shortest_path_to_adjacent_sink_is_empty() {
        let g = graph(&[&[1], &[]]);
        assert_eq!(g.shortest_route(StageIndex(0)), idx(&[0, 1]));
        assert!(g.shortest_path(StageIndex(0)).is_empty());
    }

    #[test]
    fn shortest_route_ignores_cycles() {
        // 0 -> 1 -> 0, 1 -> 2 -> 3 (sink)
        let g = graph(&[&[1], &[0, 2], &[3], &[]]);
        assert_eq!(g.shortest_route(StageIndex(0)), idx(&[0, 1, 2, 3]));
        let cyclic = graph(&[&[1], &[0]]);
        assert_eq!(cyclic.shortest_route(StageIndex(1)), idx(&[1]));
    }

    #[test]
    fn try_new_rejects_dangling_edges() {
        assert!(StageGraph::try_new(vec![vec![StageIndex(1)]], StageIndex(0)).is_none());
        assert!(StageGraph::try_new(vec![vec![]], StageIndex(1)).is_none());
        assert!(StageGraph::try_new(vec![vec![StageIndex(0)]], StageIndex(0)).is_some());
    }

    #[test]
    fn unknown_source_yields_empty_paths() {
        let g = graph(&[&[]]);
        assert!(g.longest_path(StageIndex(5)).is_empty());
        assert!(g.shortest_route(StageIndex(5)).is_empty());
        assert!(g.successors(StageIndex(5)).is_empty());
    }
}
