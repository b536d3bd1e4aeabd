use crate::algorithms::common::{FailureReason, NodeTable, Search, SearchNode, Step};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use std::collections::VecDeque;

/// Breadth-first search: FIFO frontier, shortest path by edge count.
pub struct BreadthFirst {
    goal: Position,
    queue: VecDeque<Position>,
    nodes: NodeTable,
}

impl BreadthFirst {
    pub fn new(start: Position, goal: Position) -> Self {
        let mut nodes = NodeTable::new();
        nodes.insert(start, SearchNode::root(0));
        BreadthFirst {
            goal,
            queue: VecDeque::from([start]),
            nodes,
        }
    }
}

impl Search for BreadthFirst {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Bfs
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let Some(current) = self.queue.pop_front() else {
            return Step::Exhausted(FailureReason::Unreachable);
        };

        if current == self.goal {
            return Step::reached(current, &self.nodes);
        }

        // Positions are marked on discovery, so each one is queued exactly once.
        let g = self.nodes.g(current) + 1;
        for neighbor in grid.neighbors(current) {
            if !self.nodes.contains(neighbor) {
                self.nodes.insert(
                    neighbor,
                    SearchNode {
                        g,
                        h: 0,
                        parent: Some(current),
                    },
                );
                self.queue.push_back(neighbor);
            }
        }

        Step::Expanded(Some(current))
    }
}
