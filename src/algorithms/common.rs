use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

/// A search that advances one expansion per call to [`Search::step`].
///
/// Implementations own all their bookkeeping (frontier, closed set, node
/// table) and only ever read the grid, so several searches can run over one
/// shared snapshot.
pub trait Search: Send {
    fn algorithm(&self) -> Algorithm;

    /// Pops and finalizes the next frontier node.
    fn step(&mut self, grid: &Grid) -> Step;
}

/// Outcome of one expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A node was expanded. Carries the position if this is the first time
    /// the run finalized it.
    Expanded(Option<Position>),
    /// The goal was finalized. `examined` holds the positions finalized by
    /// this last expansion, the goal included.
    Reached {
        examined: Vec<Position>,
        path: Vec<Position>,
        complexity: usize,
    },
    /// The frontier ran dry before reaching the goal.
    Exhausted(FailureReason),
}

impl Step {
    pub(crate) fn reached(goal: Position, nodes: &NodeTable) -> Step {
        Step::Reached {
            examined: vec![goal],
            path: nodes.path_to(goal),
            complexity: nodes.links(),
        }
    }
}

/// Why a run ended without a path. Both are ordinary search outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Unreachable,
    /// Beam search discarded candidates and then ran out of them.
    BeamExhausted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Unreachable => f.write_str("unreachable"),
            FailureReason::BeamExhausted => f.write_str("beam_exhausted"),
        }
    }
}

/// Tuning knobs for the bounded searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Candidates kept per beam layer.
    pub beam_width: usize,
    /// Deepest IDDFS cutoff. `None` uses the grid's traversable cell count,
    /// which no shortest path can exceed.
    pub max_depth: Option<usize>,
}

pub const DEFAULT_BEAM_WIDTH: usize = 3;

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            beam_width: DEFAULT_BEAM_WIDTH,
            max_depth: None,
        }
    }
}

/// Manhattan distance, admissible and consistent on a 4-connected unit grid.
pub fn heuristic(from: Position, to: Position) -> u32 {
    from.manhattan(&to) as u32
}

/// Per-run bookkeeping for one discovered position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchNode {
    /// Cost from the start along the recorded parent chain.
    pub g: u32,
    /// Heuristic estimate to the goal.
    pub h: u32,
    pub parent: Option<Position>,
}

impl SearchNode {
    pub fn root(h: u32) -> Self {
        SearchNode { g: 0, h, parent: None }
    }

    pub fn f(&self) -> u32 {
        self.g + self.h
    }
}

/// Run-local node table keyed by position.
///
/// Parents are plain positions, so path reconstruction is a lookup chain with
/// no ownership between nodes.
#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: FxHashMap<Position, SearchNode>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: Position) -> Option<&SearchNode> {
        self.nodes.get(&pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.nodes.contains_key(&pos)
    }

    pub fn insert(&mut self, pos: Position, node: SearchNode) {
        self.nodes.insert(pos, node);
    }

    pub fn g(&self, pos: Position) -> u32 {
        self.nodes.get(&pos).map_or(u32::MAX, |node| node.g)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of recorded predecessor links.
    pub fn links(&self) -> usize {
        self.nodes.values().filter(|node| node.parent.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Follows parents from `to` back to the root, returned root first.
    pub fn path_to(&self, to: Position) -> Vec<Position> {
        let mut path = vec![to];
        let mut current = to;
        while let Some(parent) = self.nodes.get(&current).and_then(|node| node.parent) {
            // A chain longer than the table means a cycle, which the searches never build.
            if path.len() > self.nodes.len() {
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}

/// Heap entry ordered so that `BinaryHeap` pops the smallest key first,
/// falling back to insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry<K> {
    key: K,
    seq: u64,
    pos: Position,
}

impl<K: Ord> Ord for FrontierEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed comparison to make BinaryHeap a min-heap
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<K: Ord> PartialOrd for FrontierEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-priority frontier with FIFO tie-breaking.
#[derive(Debug)]
pub struct PriorityFrontier<K> {
    heap: BinaryHeap<FrontierEntry<K>>,
    next_seq: u64,
}

impl<K: Ord + Copy> PriorityFrontier<K> {
    pub fn new() -> Self {
        PriorityFrontier {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, key: K, pos: Position) {
        self.heap.push(FrontierEntry {
            key,
            seq: self.next_seq,
            pos,
        });
        self.next_seq += 1;
    }

    pub fn pop(&mut self) -> Option<(K, Position)> {
        self.heap.pop().map(|entry| (entry.key, entry.pos))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<K: Ord + Copy> Default for PriorityFrontier<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn frontier_pops_lowest_key_then_oldest() {
        let mut frontier = PriorityFrontier::new();
        frontier.push(3, p(0, 0));
        frontier.push(1, p(1, 0));
        frontier.push(1, p(2, 0));
        frontier.push(2, p(3, 0));

        let order: Vec<_> = std::iter::from_fn(|| frontier.pop()).collect();
        assert_eq!(
            order,
            vec![(1, p(1, 0)), (1, p(2, 0)), (2, p(3, 0)), (3, p(0, 0))]
        );
    }

    #[test]
    fn frontier_breaks_tuple_keys_lexicographically() {
        let mut frontier = PriorityFrontier::new();
        frontier.push((4, 2), p(0, 0));
        frontier.push((4, 1), p(1, 0));
        assert_eq!(frontier.pop(), Some(((4, 1), p(1, 0))));
    }

    #[test]
    fn path_to_walks_parent_chain() {
        let mut nodes = NodeTable::new();
        nodes.insert(p(0, 0), SearchNode::root(2));
        nodes.insert(
            p(1, 0),
            SearchNode {
                g: 1,
                h: 1,
                parent: Some(p(0, 0)),
            },
        );
        nodes.insert(
            p(1, 1),
            SearchNode {
                g: 2,
                h: 0,
                parent: Some(p(1, 0)),
            },
        );
        assert_eq!(nodes.path_to(p(1, 1)), vec![p(0, 0), p(1, 0), p(1, 1)]);
        assert_eq!(nodes.links(), 2);
        assert_eq!(nodes.get(p(1, 1)).map(SearchNode::f), Some(2));
    }

    #[test]
    fn heuristic_is_manhattan() {
        assert_eq!(heuristic(p(0, 0), p(3, 4)), 7);
        assert_eq!(heuristic(p(5, 1), p(2, 1)), 3);
    }
}

/// Runs a search to completion, collecting finalized positions and the final step.
#[cfg(test)]
pub(crate) fn drive(search: &mut dyn Search, grid: &Grid) -> (Vec<Position>, Step) {
    let mut visited = Vec::new();
    loop {
        match search.step(grid) {
            Step::Expanded(Some(pos)) => visited.push(pos),
            Step::Expanded(None) => {}
            Step::Reached {
                examined,
                path,
                complexity,
            } => {
                visited.extend(examined.iter().copied());
                return (
                    visited,
                    Step::Reached {
                        examined,
                        path,
                        complexity,
                    },
                );
            }
            done @ Step::Exhausted(_) => return (visited, done),
        }
    }
}

/// Checks that `path` is a connected walk over traversable cells from `start` to `end`.
#[cfg(test)]
pub(crate) fn assert_valid_path(grid: &Grid, path: &[Position], start: Position, end: Position) {
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));
    for pair in path.windows(2) {
        assert!(
            grid.neighbors(pair[0]).contains(&pair[1]),
            "{} -> {} is not a move",
            pair[0],
            pair[1]
        );
    }
}
