//! The occupancy grid, its fingerprint, and the derived pathing graph.
//!
//! The map is a `H * GRID_SCALE` by `W * GRID_SCALE` grid of cells, each 1
//! (free) or 0 (occupied). Sized items carve a square of zeros centered on
//! their coordinates. Every occupancy change recomputes two derived views:
//!
//! - `hash`: a 64-bit BLAKE3 fingerprint of the row-major grid, so callers
//!   can detect map changes without diffing cells.
//! - `graph`: the 4-neighbor adjacency of free cells, consumed read-only by
//!   pathing action steps. The map itself does not plan paths.

use std::collections::HashMap;

/// Grid cells per map tile along each axis.
pub const GRID_SCALE: usize = 2;

/// Free-cell adjacency: cell -> its free 4-neighbors.
pub type MapGraph = HashMap<(usize, usize), Vec<(usize, usize)>>;

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Euclidean distance between two points in map units.
pub fn euclidean_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Round a coordinate to 6 decimal places, the precision item centers are
/// stored at.
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

// ---------------------------------------------------------------------------
// WorldMap
// ---------------------------------------------------------------------------

/// The shared grid world: occupancy, fingerprint, and pathing graph.
#[derive(Debug, Clone)]
pub struct WorldMap {
    /// Map height in tiles.
    height: usize,
    /// Map width in tiles.
    width: usize,
    /// Row-major occupancy grid; 1 is free, 0 is occupied.
    grid: Vec<Vec<u8>>,
    /// 64-bit fingerprint of the current grid contents.
    hash: u64,
    /// Free-cell 4-neighbor adjacency derived from the grid.
    graph: MapGraph,
}

impl WorldMap {
    /// Build the map for a `[height, width]` battle field, carving an
    /// occupied square for every `(center coordinates, size in tiles)`
    /// entry with a positive size.
    pub fn new(map_size: [usize; 2], occupants: impl IntoIterator<Item = ([f64; 2], f64)>) -> Self {
        let [height, width] = map_size;
        let mut map = Self {
            height,
            width,
            grid: vec![vec![1u8; width * GRID_SCALE]; height * GRID_SCALE],
            hash: 0,
            graph: MapGraph::new(),
        };
        for (coordinates, size) in occupants {
            if size <= 0.0 {
                continue;
            }
            map.fill_item_square(coordinates, size, 0);
        }
        map.rebuild_derived();
        map
    }

    /// Whether a point lies strictly inside the map. Boundary rows and
    /// columns, including the zero edge, are not on the map.
    pub fn is_point_on_map(&self, x: f64, y: f64) -> bool {
        0.0 < x && x < self.height as f64 && 0.0 < y && y < self.width as f64
    }

    /// Refill an item's square with free cells, then recompute the graph
    /// and the fingerprint. Called when a sized item dies.
    pub fn clear_from_map(&mut self, coordinates: [f64; 2], size: f64) {
        self.fill_item_square(coordinates, size, 1);
        self.rebuild_derived();
        tracing::debug!(hash = self.hash, "cleared item square from map");
    }

    /// Map height in tiles.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Map width in tiles.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The raw occupancy grid, row-major.
    pub fn grid(&self) -> &[Vec<u8>] {
        &self.grid
    }

    /// The 64-bit fingerprint of the current grid contents.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The free-cell adjacency graph.
    pub fn graph(&self) -> &MapGraph {
        &self.graph
    }

    // -- internals ----------------------------------------------------------

    /// Fill the square an item occupies with `value`. The square has side
    /// `size * GRID_SCALE` cells and is centered on the item's coordinates,
    /// offset by half the side.
    fn fill_item_square(&mut self, coordinates: [f64; 2], size: f64, value: u8) {
        let side = (size * GRID_SCALE as f64) as usize;
        let row0 = (coordinates[0] * GRID_SCALE as f64).floor() as i64 - (side / 2) as i64;
        let col0 = (coordinates[1] * GRID_SCALE as f64).floor() as i64 - (side / 2) as i64;
        for row in row0..row0 + side as i64 {
            for col in col0..col0 + side as i64 {
                if row < 0 || col < 0 {
                    continue;
                }
                let (row, col) = (row as usize, col as usize);
                if let Some(cell) = self.grid.get_mut(row).and_then(|r| r.get_mut(col)) {
                    *cell = value;
                }
            }
        }
    }

    fn rebuild_derived(&mut self) {
        self.graph = grid_to_graph(&self.grid);
        self.hash = grid_fingerprint(&self.grid);
    }
}

/// 64-bit BLAKE3 fingerprint of a row-major grid.
fn grid_fingerprint(grid: &[Vec<u8>]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    for row in grid {
        hasher.update(row);
    }
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

/// Free-cell 4-neighbor adjacency of a grid.
fn grid_to_graph(grid: &[Vec<u8>]) -> MapGraph {
    let mut graph = MapGraph::new();
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    for row in 0..height {
        for col in 0..width {
            if grid[row][col] == 0 {
                continue;
            }
            let mut neighbors = Vec::new();
            if row > 0 && grid[row - 1][col] == 1 {
                neighbors.push((row - 1, col));
            }
            if row + 1 < height && grid[row + 1][col] == 1 {
                neighbors.push((row + 1, col));
            }
            if col > 0 && grid[row][col - 1] == 1 {
                neighbors.push((row, col - 1));
            }
            if col + 1 < width && grid[row][col + 1] == 1 {
                neighbors.push((row, col + 1));
            }
            graph.insert((row, col), neighbors);
        }
    }
    graph
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
