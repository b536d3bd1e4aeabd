use crate::algorithms::common::{
    FailureReason, NodeTable, PriorityFrontier, Search, SearchNode, Step,
};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use rustc_hash::FxHashSet;

/// Step weight used for the run's own g-values. Weather is uniform per edge,
/// so it never changes which path is cheapest and is applied afterwards.
const STEP_COST: u32 = 1;

/// Uniform-cost search (Dijkstra): expands the lowest g first, ties in
/// insertion order.
pub struct UniformCost {
    goal: Position,
    frontier: PriorityFrontier<u32>,
    nodes: NodeTable,
    closed: FxHashSet<Position>,
}

impl UniformCost {
    pub fn new(start: Position, goal: Position) -> Self {
        let mut nodes = NodeTable::new();
        nodes.insert(start, SearchNode::root(0));
        let mut frontier = PriorityFrontier::new();
        frontier.push(0, start);
        UniformCost {
            goal,
            frontier,
            nodes,
            closed: FxHashSet::default(),
        }
    }
}

impl Search for UniformCost {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Ucs
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let (g, current) = loop {
            match self.frontier.pop() {
                // stale entry left behind by a later relaxation
                Some((g, pos)) if self.closed.contains(&pos) || g > self.nodes.g(pos) => continue,
                Some(entry) => break entry,
                None => return Step::Exhausted(FailureReason::Unreachable),
            }
        };
        self.closed.insert(current);

        if current == self.goal {
            return Step::reached(current, &self.nodes);
        }

        for neighbor in grid.neighbors(current) {
            if self.closed.contains(&neighbor) {
                continue;
            }
            let tentative = g + STEP_COST;
            if tentative < self.nodes.g(neighbor) {
                self.nodes.insert(
                    neighbor,
                    SearchNode {
                        g: tentative,
                        h: 0,
                        parent: Some(current),
                    },
                );
                self.frontier.push(tentative, neighbor);
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
    fn expands_in_cost_order() {
        let grid = Grid::new(5);
        let start = Position::new(2, 2);
        let mut search = UniformCost::new(start, Position::new(4, 4));
        let (visited, last) = drive(&mut search, &grid);

        let costs: Vec<usize> = visited.iter().map(|p| p.manhattan(&start)).collect();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]));

        let Step::Reached { path, .. } = last else {
            panic!("expected a path, got {last:?}");
        };
        assert_eq!(path.len(), 5);
        assert_valid_path(&grid, &path, start, Position::new(4, 4));
    }

    #[test]
    fn reports_unreachable_goal() {
        let grid = Grid::parse(
            "
            S#.
            ##.
            ..G
            ",
        )
        .unwrap();
        let mut search = UniformCost::new(Position::new(0, 0), Position::new(2, 2));
        let (visited, last) = drive(&mut search, &grid);
        assert_eq!(visited, vec![Position::new(0, 0)]);
        assert_eq!(last, Step::Exhausted(FailureReason::Unreachable));
    }
}
