use rustc_hash::FxHashSet;

use crate::algorithms::common::{FailureReason, NodeTable, Search, SearchNode, Step};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};

/// Depth-first search with a LIFO stack.
///
/// A position can sit on the stack several times; only the first pop
/// finalizes it and fixes its parent, later pops are skipped.
pub struct DepthFirst {
    goal: Position,
    stack: Vec<(Position, Option<Position>)>,
    // Finalized nodes only.
    nodes: NodeTable,
    // Every position ever given a parent, popped or not.
    pushed: FxHashSet<Position>,
}

impl DepthFirst {
    pub fn new(start: Position, goal: Position) -> Self {
        DepthFirst {
            goal,
            stack: vec![(start, None)],
            nodes: NodeTable::new(),
            pushed: FxHashSet::default(),
        }
    }
}

impl Search for DepthFirst {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Dfs
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let (current, parent) = loop {
            match self.stack.pop() {
                Some((pos, _)) if self.nodes.contains(pos) => continue,
                Some(entry) => break entry,
                None => return Step::Exhausted(FailureReason::Unreachable),
            }
        };

        let g = parent.map_or(0, |p| self.nodes.g(p) + 1);
        self.nodes.insert(current, SearchNode { g, h: 0, parent });

        if current == self.goal {
            return Step::Reached {
                examined: vec![current],
                path: self.nodes.path_to(current),
                complexity: self.pushed.len(),
            };
        }

        for neighbor in grid.neighbors(current) {
            if !self.nodes.contains(neighbor) {
                self.pushed.insert(neighbor);
                self.stack.push((neighbor, Some(current)));
            }
        }

        Step::Expanded(Some(current))
    }
}
