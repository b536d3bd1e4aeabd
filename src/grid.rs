use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GridError;

/// Side length of the grid the UI edits.
pub const DEFAULT_GRID_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    pub fn manhattan(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Empty,
    Road,
    Building,
    Obstacle,
    Start,
    End,
}

impl CellType {
    /// Buildings and obstacles block movement, everything else costs the base weight.
    pub fn is_traversable(self) -> bool {
        !matches!(self, CellType::Building | CellType::Obstacle)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellType::Empty => "empty",
            CellType::Road => "road",
            CellType::Building => "building",
            CellType::Obstacle => "obstacle",
            CellType::Start => "start",
            CellType::End => "end",
        };
        f.write_str(name)
    }
}

/// One record of a grid snapshot as it crosses the wire.
///
/// Extra fields a UI attaches to its cells (costs, overlay flags) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
    #[serde(rename = "type")]
    pub kind: CellType,
}

/// A rectangular occupancy grid stored row-major (`cells[y][x]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<CellType>>,
}

// Up, right, down, left. The order decides exploration order for tie-broken searches.
const DIRECTIONS: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

impl Grid {
    /// An all-empty `size` x `size` grid.
    pub fn new(size: usize) -> Self {
        Self::with_dimensions(size, size)
    }

    pub fn with_dimensions(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            cells: vec![vec![CellType::Empty; width]; height],
        }
    }

    /// Builds a grid from a row-major snapshot of cell records.
    pub fn from_cells(rows: &[Vec<Cell>]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(height);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::Ragged {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
            let mut kinds = Vec::with_capacity(width);
            for (x, cell) in row.iter().enumerate() {
                if cell.x != x || cell.y != y {
                    return Err(GridError::Misplaced {
                        expected: Position::new(x, y),
                        found: Position::new(cell.x, cell.y),
                    });
                }
                kinds.push(cell.kind);
            }
            cells.push(kinds);
        }

        Ok(Grid {
            width,
            height,
            cells,
        })
    }

    /// Parses an ASCII layout, one row per line.
    ///
    /// `#` building, `O` obstacle, `=` road, `S` start, `G` end, anything else empty.
    pub fn parse(layout: &str) -> Result<Self, GridError> {
        let rows: Vec<Vec<Cell>> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(y, line)| {
                line.chars()
                    .enumerate()
                    .map(|(x, ch)| Cell {
                        x,
                        y,
                        kind: match ch {
                            '#' => CellType::Building,
                            'O' => CellType::Obstacle,
                            '=' => CellType::Road,
                            'S' => CellType::Start,
                            'G' => CellType::End,
                            _ => CellType::Empty,
                        },
                    })
                    .collect()
            })
            .collect();
        Self::from_cells(&rows)
    }

    /// Generates a city block layout: roads on every row and column whose
    /// index is 0 or 4 modulo 5, buildings scattered in between with
    /// probability `density`.
    pub fn city<R: Rng>(size: usize, density: f64, rng: &mut R) -> Self {
        let density = density.clamp(0.0, 1.0);
        let mut grid = Grid::new(size);
        for y in 0..size {
            for x in 0..size {
                let block_interior = x % 5 != 0 && y % 5 != 0 && x % 5 != 4 && y % 5 != 4;
                grid.cells[y][x] = if block_interior && rng.gen_bool(density) {
                    CellType::Building
                } else {
                    CellType::Road
                };
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn cell(&self, pos: Position) -> Option<CellType> {
        self.cells.get(pos.y).and_then(|row| row.get(pos.x)).copied()
    }

    pub fn is_traversable(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(CellType::is_traversable)
    }

    /// Overwrites one cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: Position, kind: CellType) {
        if let Some(cell) = self.cells.get_mut(pos.y).and_then(|row| row.get_mut(pos.x)) {
            *cell = kind;
        }
    }

    /// First cell of the given type in row-major order.
    pub fn find(&self, kind: CellType) -> Option<Position> {
        self.positions().find(|&pos| self.cells[pos.y][pos.x] == kind)
    }

    /// Endpoints a caller gets when it names none: the marked `Start`/`End`
    /// cells, else the first and last traversable cells in row-major order.
    pub fn default_endpoints(&self) -> (Option<Position>, Option<Position>) {
        let start = self
            .find(CellType::Start)
            .or_else(|| self.positions().find(|&pos| self.is_traversable(pos)));
        let end = self.find(CellType::End).or_else(|| {
            self.positions()
                .filter(|&pos| self.is_traversable(pos))
                .last()
        });
        (start, end)
    }

    pub fn traversable_count(&self) -> usize {
        self.positions().filter(|&pos| self.is_traversable(pos)).count()
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    /// Row-major cell records, the inverse of [`Grid::from_cells`].
    pub fn to_cells(&self) -> Vec<Vec<Cell>> {
        self.cells
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, &kind)| Cell { x, y, kind })
                    .collect()
            })
            .collect()
    }

    /// Traversable axis-aligned neighbours in up, right, down, left order.
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        let mut neighbors = Vec::with_capacity(4);
        for (dx, dy) in DIRECTIONS {
            let (Some(nx), Some(ny)) = (pos.x.checked_add_signed(dx), pos.y.checked_add_signed(dy))
            else {
                continue;
            };
            let next = Position::new(nx, ny);
            if self.is_traversable(next) {
                neighbors.push(next);
            }
        }
        neighbors
    }

    /// Text rendering with an optional search overlay.
    pub fn render(
        &self,
        start: Option<Position>,
        end: Option<Position>,
        visited: &[Position],
        path: &[Position],
    ) -> String {
        let visited: FxHashSet<Position> = visited.iter().copied().collect();
        let path: FxHashSet<Position> = path.iter().copied().collect();

        let mut out = String::new();
        out.push_str("Legend: S=Start, G=Goal, *=Path, +=Visited, #=Building, O=Obstacle, .=Open\n");
        out.push_str("   ");
        for x in 0..self.width {
            out.push_str(&format!("{:2}", x % 10));
        }
        out.push('\n');

        for y in 0..self.height {
            out.push_str(&format!("{:2} ", y));
            for x in 0..self.width {
                let pos = Position::new(x, y);
                let ch = if Some(pos) == start {
                    'S'
                } else if Some(pos) == end {
                    'G'
                } else if path.contains(&pos) {
                    '*'
                } else if visited.contains(&pos) {
                    '+'
                } else {
                    match self.cells[y][x] {
                        CellType::Building => '#',
                        CellType::Obstacle => 'O',
                        CellType::Start => 'S',
                        CellType::End => 'G',
                        CellType::Empty | CellType::Road => '.',
                    }
                };
                out.push(ch);
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn neighbors_follow_up_right_down_left() {
        let grid = Grid::new(3);
        let n = grid.neighbors(Position::new(1, 1));
        assert_eq!(
            n,
            vec![
                Position::new(1, 0),
                Position::new(2, 1),
                Position::new(1, 2),
                Position::new(0, 1),
            ]
        );
    }

    #[test]
    fn neighbors_skip_edges_and_blocked_cells() {
        let grid = Grid::parse(
            "
            .#.
            O..
            ...
            ",
        )
        .unwrap();
        assert!(grid.neighbors(Position::new(0, 0)).is_empty());
        assert_eq!(
            grid.neighbors(Position::new(2, 0)),
            vec![Position::new(2, 1)]
        );
    }

    #[test]
    fn start_and_end_cells_are_traversable() {
        let grid = Grid::parse("S=G").unwrap();
        assert_eq!(grid.find(CellType::Start), Some(Position::new(0, 0)));
        assert_eq!(grid.find(CellType::End), Some(Position::new(2, 0)));
        assert_eq!(grid.traversable_count(), 3);
    }

    #[test]
    fn from_cells_rejects_ragged_rows() {
        let mut rows = Grid::new(3).to_cells();
        rows[1].pop();
        assert_eq!(
            Grid::from_cells(&rows),
            Err(GridError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn from_cells_rejects_misplaced_records() {
        let mut rows = Grid::new(2).to_cells();
        rows[0][1].x = 5;
        assert!(matches!(
            Grid::from_cells(&rows),
            Err(GridError::Misplaced { .. })
        ));
        assert_eq!(Grid::from_cells(&[]), Err(GridError::Empty));
    }

    #[test]
    fn snapshot_round_trips_through_cells() {
        let grid = Grid::parse("S.#\n.O.\n==G").unwrap();
        assert_eq!(Grid::from_cells(&grid.to_cells()).unwrap(), grid);
    }

    #[test]
    fn city_layout_keeps_roads_open() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let grid = Grid::city(20, 1.0, &mut rng);
        for i in 0..20 {
            assert_eq!(grid.cell(Position::new(i, 0)), Some(CellType::Road));
            assert_eq!(grid.cell(Position::new(4, i)), Some(CellType::Road));
        }
        assert_eq!(grid.cell(Position::new(2, 2)), Some(CellType::Building));
    }

    #[test]
    fn default_endpoints_prefer_marked_cells() {
        let marked = Grid::parse("#G.\n.S.").unwrap();
        assert_eq!(
            marked.default_endpoints(),
            (Some(Position::new(1, 1)), Some(Position::new(1, 0)))
        );
        let plain = Grid::parse("#..\n..#").unwrap();
        assert_eq!(
            plain.default_endpoints(),
            (Some(Position::new(1, 0)), Some(Position::new(1, 1)))
        );
    }
}
