use crate::algorithms::common::{
    heuristic, FailureReason, NodeTable, PriorityFrontier, Search, SearchNode, Step,
};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};

/// Greedy best-first search ordered by the heuristic alone.
///
/// Positions are claimed when first discovered, so each enters the frontier
/// once. Fast towards open goals, no optimality guarantee.
pub struct GreedyBestFirst {
    goal: Position,
    frontier: PriorityFrontier<u32>,
    nodes: NodeTable,
}

impl GreedyBestFirst {
    pub fn new(start: Position, goal: Position) -> Self {
        let h = heuristic(start, goal);
        let mut nodes = NodeTable::new();
        nodes.insert(start, SearchNode::root(h));
        let mut frontier = PriorityFrontier::new();
        frontier.push(h, start);
        GreedyBestFirst {
            goal,
            frontier,
            nodes,
        }
    }
}

impl Search for GreedyBestFirst {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Greedy
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let Some((_, current)) = self.frontier.pop() else {
            return Step::Exhausted(FailureReason::Unreachable);
        };

        if current == self.goal {
            return Step::reached(current, &self.nodes);
        }

        let g = self.nodes.g(current) + 1;
        for neighbor in grid.neighbors(current) {
            if self.nodes.contains(neighbor) {
                continue;
            }
            let h = heuristic(neighbor, self.goal);
            self.nodes.insert(
                neighbor,
                SearchNode {
                    g,
                    h,
                    parent: Some(current),
                },
            );
            self.frontier.push(h, neighbor);
        }

        Step::Expanded(Some(current))
    }
}
