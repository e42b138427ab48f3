//! Grid positions, the four movement directions and the terrain layer.
//!
//! Distances come in three flavours and each has exactly one use:
//! - Manhattan: travel cost between cells (four-neighbour movement)
//! - Chebyshev: square rings around a base
//! - Euclidean (squared): attack range checks

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Integer grid coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row, growing downwards.
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Four-neighbour (Manhattan) distance.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Chebyshev distance: `max(|dx|, |dy|)`.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Squared Euclidean distance (avoids sqrt for comparisons).
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Whether `other` lies within Euclidean `range` of this cell.
    #[must_use]
    pub const fn within_range(self, other: Self, range: i32) -> bool {
        self.distance_squared(other) <= range * range
    }

    /// The neighbouring cell in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours, in [`Direction::ALL`] order.
    #[must_use]
    pub fn neighbours(self) -> [Self; 4] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// All cells at exactly Manhattan distance `dist`, in a fixed order.
    #[must_use]
    pub fn manhattan_ring(self, dist: i32) -> Vec<Self> {
        if dist == 0 {
            return vec![self];
        }
        let mut cells = Vec::with_capacity((dist * 4) as usize);
        for dx in -dist..=dist {
            let dy = dist - dx.abs();
            cells.push(Self::new(self.x + dx, self.y + dy));
            if dy != 0 {
                cells.push(Self::new(self.x + dx, self.y - dy));
            }
        }
        cells
    }

    /// All cells within Manhattan distance `radius`, nearest rings first.
    #[must_use]
    pub fn manhattan_disc(self, radius: i32) -> Vec<Self> {
        (0..=radius).flat_map(|r| self.manhattan_ring(r)).collect()
    }

    /// Direction of the single orthogonal step from `self` to `other`, if adjacent.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| self.step(d) == other)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Towards y - 1.
    Up,
    /// Towards x + 1.
    Right,
    /// Towards y + 1.
    Down,
    /// Towards x - 1.
    Left,
}

impl Direction {
    /// All directions in canonical evaluation order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Grid offset `(dx, dy)` of one step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }
}

/// Terrain cell kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Walkable ground.
    #[default]
    Open,
    /// Impassable wall.
    Wall,
}

/// Static terrain layer of the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Terrain {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Cell data stored in row-major order.
    cells: Vec<Cell>,
}

impl Terrain {
    /// Create an open map.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn open(width: u32, height: u32) -> Self {
        assert!(width > 0, "Terrain width must be positive");
        assert!(height > 0, "Terrain height must be positive");
        Self {
            width,
            height,
            cells: vec![Cell::Open; (width as usize) * (height as usize)],
        }
    }

    /// Parse terrain from rows of `.` (open) and `#` (wall).
    pub fn from_rows(rows: &[&str]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidState("terrain must not be empty".into()));
        }
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(CoreError::InvalidState(format!(
                    "terrain row {y} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for ch in row.chars() {
                cells.push(match ch {
                    '#' => Cell::Wall,
                    _ => Cell::Open,
                });
            }
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells,
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check the cell vector matches the declared dimensions.
    pub fn validate(&self) -> Result<()> {
        let expected = (self.width as usize) * (self.height as usize);
        if self.cells.len() != expected {
            return Err(CoreError::TerrainSizeMismatch {
                expected,
                actual: self.cells.len(),
            });
        }
        Ok(())
    }

    /// Check if a position is within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Get cell at a position, `None` if out of bounds.
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<Cell> {
        if self.in_bounds(pos) {
            self.cells.get(self.index(pos)).copied()
        } else {
            None
        }
    }

    /// Set a cell. Returns `false` if out of bounds.
    pub fn set(&mut self, pos: Position, cell: Cell) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let index = self.index(pos);
        match self.cells.get_mut(index) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// In bounds and not a wall.
    #[must_use]
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.get(pos) == Some(Cell::Open)
    }

    /// Iterate every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distances() {
        let a = Position::new(1, 1);
        let b = Position::new(4, 3);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(a.chebyshev(b), 3);
        assert_eq!(a.distance_squared(b), 13);
        assert!(a.within_range(Position::new(3, 3), 3));
        assert!(!a.within_range(Position::new(4, 4), 3));
    }

    #[test]
    fn test_manhattan_ring_sizes() {
        let origin = Position::new(5, 5);
        assert_eq!(origin.manhattan_ring(0).len(), 1);
        assert_eq!(origin.manhattan_ring(1).len(), 4);
        assert_eq!(origin.manhattan_ring(2).len(), 8);
        assert_eq!(origin.manhattan_disc(2).len(), 13);
        assert!(origin
            .manhattan_ring(2)
            .iter()
            .all(|p| p.manhattan(origin) == 2));
    }

    #[test]
    fn test_direction_roundtrip() {
        let p = Position::new(2, 2);
        for d in Direction::ALL {
            assert_eq!(p.direction_to(p.step(d)), Some(d));
            assert_eq!(p.step(d).step(d.opposite()), p);
        }
        assert_eq!(p.direction_to(Position::new(3, 3)), None);
    }

    #[test]
    fn test_terrain_from_rows() {
        let terrain = Terrain::from_rows(&["..#", "..."]).unwrap();
        assert_eq!(terrain.width(), 3);
        assert_eq!(terrain.height(), 2);
        assert!(!terrain.is_walkable(Position::new(2, 0)));
        assert!(terrain.is_walkable(Position::new(2, 1)));
        assert!(!terrain.is_walkable(Position::new(3, 1)));
        assert!(!terrain.is_walkable(Position::new(-1, 0)));
        assert!(terrain.validate().is_ok());
    }

    #[test]
    fn test_terrain_rejects_ragged_rows() {
        assert!(Terrain::from_rows(&["...", ".."]).is_err());
    }

    fn arb_position() -> impl Strategy<Value = Position> {
        (-64i32..64, -64i32..64).prop_map(|(x, y)| Position::new(x, y))
    }

    proptest! {
        #[test]
        fn prop_distances_are_symmetric_and_ordered(a in arb_position(), b in arb_position()) {
            prop_assert_eq!(a.manhattan(b), b.manhattan(a));
            prop_assert_eq!(a.distance_squared(b), b.distance_squared(a));
            prop_assert!(a.chebyshev(b) <= a.manhattan(b));
            prop_assert!(a.manhattan(b) <= 2 * a.chebyshev(b));
            // Euclidean range covers the Chebyshev distance only along an axis.
            prop_assert_eq!(a.within_range(b, a.chebyshev(b)), a.x == b.x || a.y == b.y);
        }

        #[test]
        fn prop_neighbours_are_one_step_away(p in arb_position()) {
            for (d, n) in Direction::ALL.into_iter().zip(p.neighbours()) {
                prop_assert_eq!(p.manhattan(n), 1);
                prop_assert_eq!(p.direction_to(n), Some(d));
                prop_assert_eq!(n.step(d.opposite()), p);
            }
        }

        #[test]
        fn prop_manhattan_ring_is_exact(p in arb_position(), dist in 0i32..6) {
            let ring = p.manhattan_ring(dist);
            prop_assert_eq!(ring.len(), if dist == 0 { 1 } else { (dist * 4) as usize });
            prop_assert!(ring.iter().all(|c| c.manhattan(p) == dist));
        }

        #[test]
        fn prop_terrain_rows_round_trip_walls(rows in proptest::collection::vec("[.#]{1,8}", 1..6)) {
            let width = rows[0].len();
            let rows: Vec<String> = rows
                .iter()
                .map(|r| format!("{r:.<width$}").chars().take(width).collect())
                .collect();
            let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
            let terrain = Terrain::from_rows(&refs).unwrap();
            for (y, row) in rows.iter().enumerate() {
                for (x, ch) in row.chars().enumerate() {
                    let pos = Position::new(x as i32, y as i32);
                    prop_assert_eq!(terrain.is_walkable(pos), ch == '.');
                }
            }
            prop_assert!(!terrain.in_bounds(Position::new(width as i32, 0)));
        }
    }
}
