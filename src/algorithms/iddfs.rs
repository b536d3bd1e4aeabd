use crate::algorithms::common::{FailureReason, NodeTable, Search, SearchNode, Step};
use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use rustc_hash::{FxHashMap, FxHashSet};

struct Frame {
    pos: Position,
    depth: usize,
    parent: Option<Position>,
}

/// Iterative-deepening depth-first search.
///
/// Runs a depth-limited DFS with cutoff 0, 1, 2, ... Within one iteration a
/// position is expanded again only when reached at a strictly smaller depth,
/// which makes the first iteration that reaches the goal return a path with
/// the minimum number of edges.
///
/// Later iterations re-examine positions earlier ones already reported; only
/// the first examination of each position is reported.
pub struct IterativeDeepening {
    start: Position,
    goal: Position,
    max_depth: usize,
    limit: usize,
    stack: Vec<Frame>,
    depth_seen: FxHashMap<Position, usize>,
    nodes: NodeTable,
    cutoff: bool,
    reported: FxHashSet<Position>,
}

impl IterativeDeepening {
    pub fn new(start: Position, goal: Position, max_depth: usize) -> Self {
        let mut search = IterativeDeepening {
            start,
            goal,
            max_depth,
            limit: 0,
            stack: Vec::new(),
            depth_seen: FxHashMap::default(),
            nodes: NodeTable::new(),
            cutoff: false,
            reported: FxHashSet::default(),
        };
        search.begin_iteration(0);
        search
    }

    fn begin_iteration(&mut self, limit: usize) {
        self.limit = limit;
        self.cutoff = false;
        self.depth_seen.clear();
        self.nodes.clear();
        self.stack.clear();
        self.stack.push(Frame {
            pos: self.start,
            depth: 0,
            parent: None,
        });
    }

    /// Current depth cutoff.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Search for IterativeDeepening {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Iddfs
    }

    fn step(&mut self, grid: &Grid) -> Step {
        let frame = loop {
            match self.stack.pop() {
                Some(frame)
                    if self
                        .depth_seen
                        .get(&frame.pos)
                        .is_some_and(|&seen| seen <= frame.depth) =>
                {
                    continue
                }
                Some(frame) => break frame,
                None => {
                    // Nothing was cut off: the whole component fit under the limit.
                    if !self.cutoff || self.limit >= self.max_depth {
                        return Step::Exhausted(FailureReason::Unreachable);
                    }
                    self.begin_iteration(self.limit + 1);
                }
            }
        };

        let Frame { pos, depth, parent } = frame;
        self.depth_seen.insert(pos, depth);
        self.nodes.insert(
            pos,
            SearchNode {
                g: depth as u32,
                h: 0,
                parent,
            },
        );
        let first_time = self.reported.insert(pos);

        if pos == self.goal {
            return Step::Reached {
                examined: if first_time { vec![pos] } else { Vec::new() },
                path: self.nodes.path_to(pos),
                complexity: self.nodes.links(),
            };
        }

        if depth < self.limit {
            for neighbor in grid.neighbors(pos) {
                let deeper = self
                    .depth_seen
                    .get(&neighbor)
                    .map_or(true, |&seen| seen > depth + 1);
                if deeper {
                    self.stack.push(Frame {
                        pos: neighbor,
                        depth: depth + 1,
                        parent: Some(pos),
                    });
                }
            }
        } else {
            self.cutoff = true;
        }

        Step::Expanded(first_time.then_some(pos))
    }
}
