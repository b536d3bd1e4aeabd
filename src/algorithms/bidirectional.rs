use crate::algorithms::common::{FailureReason, NodeTable, Search, SearchNode, Step};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// One breadth-first frontier and the tree it has grown.
struct Frontier {
    queue: VecDeque<Position>,
    nodes: NodeTable,
}

impl Frontier {
    fn rooted_at(root: Position) -> Self {
        let mut nodes = NodeTable::new();
        nodes.insert(root, SearchNode::root(0));
        Frontier {
            queue: VecDeque::from([root]),
            nodes,
        }
    }
}

/// Bidirectional breadth-first search.
///
/// The start-side and end-side frontiers take turns expanding one node. The
/// search meets as soon as one side discovers a position the other side has
/// already discovered, and the path is the start-side chain to that position
/// joined with the reversed end-side chain. Finds a path, not necessarily the
/// shortest one.
pub struct Bidirectional {
    forward: Frontier,
    backward: Frontier,
    forward_turn: bool,
    emitted: FxHashSet<Position>,
}

impl Bidirectional {
    pub fn new(start: Position, goal: Position) -> Self {
        Bidirectional {
            forward: Frontier::rooted_at(start),
            backward: Frontier::rooted_at(goal),
            forward_turn: true,
            emitted: FxHashSet::default(),
        }
    }

    fn join_at(&self, meeting: Position) -> Vec<Position> {
        let mut path = self.forward.nodes.path_to(meeting);
        let mut tail = self.backward.nodes.path_to(meeting);
        tail.reverse();
        path.extend(tail.into_iter().skip(1));
        path
    }

    fn meet(&self, examined: Vec<Position>, meeting: Position) -> Step {
        Step::Reached {
            path: self.join_at(meeting),
            complexity: self.forward.nodes.links() + self.backward.nodes.links(),
            examined,
        }
    }
}

impl Search for Bidirectional {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Bidirectional
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let forward_turn = self.forward_turn;
        self.forward_turn = !forward_turn;
        let (active, other) = if forward_turn {
            (&mut self.forward, &self.backward)
        } else {
            (&mut self.backward, &self.forward)
        };

        // Either side running dry means the two halves are disconnected.
        let Some(current) = active.queue.pop_front() else {
            return Step::Exhausted(FailureReason::Unreachable);
        };
        let mut examined = Vec::with_capacity(2);
        if self.emitted.insert(current) {
            examined.push(current);
        }

        if other.nodes.contains(current) {
            return self.meet(examined, current);
        }

        let g = active.nodes.g(current) + 1;
        let mut meeting = None;
        for neighbor in grid.neighbors(current) {
            if active.nodes.contains(neighbor) {
                continue;
            }
            active.nodes.insert(
                neighbor,
                SearchNode {
                    g,
                    h: 0,
                    parent: Some(current),
                },
            );
            if other.nodes.contains(neighbor) {
                meeting = Some(neighbor);
                break;
            }
            active.queue.push_back(neighbor);
        }

        match meeting {
            Some(meeting) => {
                if self.emitted.insert(meeting) {
                    examined.push(meeting);
                }
                self.meet(examined, meeting)
            }
            None => Step::Expanded(examined.pop()),
        }
    }
}
