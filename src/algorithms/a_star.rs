use crate::algorithms::common::{
    heuristic, FailureReason, NodeTable, PriorityFrontier, Search, SearchNode, Step,
};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use rustc_hash::FxHashSet;

/// Implements the A* pathfinding algorithm one expansion at a time.
///
/// The frontier is ordered by `f = g + h`, then by the lower `h`, then by
/// insertion order. With the Manhattan heuristic (consistent on this grid) a
/// finalized node never needs reopening, so a closed set is enough.
pub struct AStar {
    goal: Position,
    frontier: PriorityFrontier<(u32, u32)>,
    nodes: NodeTable,
    closed: FxHashSet<Position>,
}

impl AStar {
    /// Creates a new A* run.
    ///
    /// # Arguments
    ///
    /// * `start` - The starting position.
    /// * `goal` - The goal position.
    pub fn new(start: Position, goal: Position) -> Self {
        let root = SearchNode::root(heuristic(start, goal));
        let mut nodes = NodeTable::new();
        nodes.insert(start, root);
        let mut frontier = PriorityFrontier::new();
        frontier.push((root.f(), root.h), start);
        AStar {
            goal,
            frontier,
            nodes,
            closed: FxHashSet::default(),
        }
    }
}

impl Search for AStar {
    fn algorithm(&self) -> Algorithm {
        Algorithm::AStar
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let current = loop {
            match self.frontier.pop() {
                Some((_, pos)) if self.closed.contains(&pos) => continue,
                Some((_, pos)) => break pos,
                None => return Step::Exhausted(FailureReason::Unreachable),
            }
        };
        self.closed.insert(current);

        if current == self.goal {
            return Step::reached(current, &self.nodes);
        }

        let g = self.nodes.g(current);
        for neighbor in grid.neighbors(current) {
            if self.closed.contains(&neighbor) {
                continue;
            }
            // Cost of moving to a neighbor is 1.
            let tentative = g + 1;
            if tentative < self.nodes.g(neighbor) {
                let node = SearchNode {
                    g: tentative,
                    h: heuristic(neighbor, self.goal),
                    parent: Some(current),
                };
                self.nodes.insert(neighbor, node);
                self.frontier.push((node.f(), node.h), neighbor);
            }
        }

        Step::Expanded(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::common::{assert_valid_path, drive};

    #[test]
    fn open_grid_goes_straight_for_the_goal() {
        let grid = Grid::new(3);
        let (start, end) = (Position::new(0, 0), Position::new(2, 2));
        let mut search = AStar::new(start, end);
        let (visited, last) = drive(&mut search, &grid);

        let Step::Reached { path, .. } = last else {
            panic!("expected a path, got {last:?}");
        };
        assert_eq!(path.len() - 1, 4);
        assert_valid_path(&grid, &path, start, end);
        // every expanded node lies on some optimal path, nothing off to the side
        assert_eq!(visited.len(), 5);
    }

    #[test]
    fn routes_around_a_wall() {
        let grid = Grid::parse(
            "
            .....
            .###.
            .#G#.
            .#.#.
            S....
            ",
        )
        .unwrap();
        let (start, end) = (Position::new(0, 4), Position::new(2, 2));
        let mut search = AStar::new(start, end);
        let (_, last) = drive(&mut search, &grid);
        let Step::Reached { path, .. } = last else {
            panic!("expected a path, got {last:?}");
        };
        assert_eq!(path.len() - 1, 4);
        assert_valid_path(&grid, &path, start, end);
    }
}
