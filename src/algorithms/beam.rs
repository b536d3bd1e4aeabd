use crate::algorithms::common::{heuristic, FailureReason, NodeTable, Search, SearchNode, Step};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use std::collections::VecDeque;

/// Beam search: breadth-first by layer, keeping only the `width` candidates
/// with the lowest heuristic for the next layer.
///
/// Discarded candidates stay discovered, so the search can miss a path that
/// exists. That outcome is reported as [`FailureReason::BeamExhausted`].
pub struct Beam {
    goal: Position,
    width: usize,
    layer: VecDeque<Position>,
    // (h, discovery order, position) for the layer being built
    candidates: Vec<(u32, u64, Position)>,
    next_seq: u64,
    nodes: NodeTable,
    pruned: bool,
}

impl Beam {
    pub fn new(start: Position, goal: Position, width: usize) -> Self {
        let mut nodes = NodeTable::new();
        nodes.insert(start, SearchNode::root(heuristic(start, goal)));
        Beam {
            goal,
            width: width.max(1),
            layer: VecDeque::from([start]),
            candidates: Vec::new(),
            next_seq: 0,
            nodes,
            pruned: false,
        }
    }

    /// Promotes the best candidates to the next layer. Returns false when
    /// there is nothing left to promote.
    fn advance_layer(&mut self) -> bool {
        if self.candidates.is_empty() {
            return false;
        }
        self.candidates.sort_unstable();
        if self.candidates.len() > self.width {
            self.pruned = true;
            self.candidates.truncate(self.width);
        }
        self.layer
            .extend(self.candidates.drain(..).map(|(_, _, pos)| pos));
        true
    }
}

impl Search for Beam {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Beam
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let current = loop {
            if let Some(pos) = self.layer.pop_front() {
                break pos;
            }
            if !self.advance_layer() {
                let reason = if self.pruned {
                    FailureReason::BeamExhausted
                } else {
                    FailureReason::Unreachable
                };
                return Step::Exhausted(reason);
            }
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
            self.candidates.push((h, self.next_seq, neighbor));
            self.next_seq += 1;
        }

        Step::Expanded(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::common::{assert_valid_path, drive};

    #[test]
    fn keeps_at_most_width_nodes_per_layer() {
        let grid = Grid::new(9);
        let (start, end) = (Position::new(4, 4), Position::new(8, 8));
        let mut search = Beam::new(start, end, 2);
        let (visited, last) = drive(&mut search, &grid);

        let Step::Reached { path, .. } = last else {
            panic!("expected a path, got {last:?}");
        };
        assert_valid_path(&grid, &path, start, end);
        // one root plus at most two nodes for each of the eight layers
        assert!(visited.len() <= 1 + 2 * 8);
    }

    #[test]
    fn narrow_beam_can_miss_an_existing_path() {
        // the greedy-looking pocket fills the beam, the real way round is dropped
        let grid = Grid::parse(
            "
            ..........
            .########.
            S.......#G
            ",
        )
        .unwrap();
        let (start, end) = (Position::new(0, 2), Position::new(9, 2));
        let mut search = Beam::new(start, end, 1);
        let (_, last) = drive(&mut search, &grid);
        assert_eq!(last, Step::Exhausted(FailureReason::BeamExhausted));

        let mut wide = Beam::new(start, end, 64);
        let (_, last) = drive(&mut wide, &grid);
        assert!(matches!(last, Step::Reached { .. }));
    }

    #[test]
    fn sealed_start_is_plainly_unreachable() {
        let grid = Grid::parse(
            "
            S#.
            ##G
            ",
        )
        .unwrap();
        let mut search = Beam::new(Position::new(0, 0), Position::new(2, 1), 3);
        let (_, last) = drive(&mut search, &grid);
        assert_eq!(last, Step::Exhausted(FailureReason::Unreachable));
    }
}
