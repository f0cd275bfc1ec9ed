use crate::vec2::Vec2;
use std::collections::HashMap;

pub type CellKey = (i64, i64);

/// Uniform hash grid over agent indices.
///
/// Each bucket holds indices into the population slice the grid was built from, in
/// insertion order. Buckets are cleared rather than dropped on rebuild so their
/// allocations survive from tick to tick.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    len: usize,
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "cell_size must be positive and finite"
        );
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed agents.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Floor-division cell coordinate, correct for negative positions too.
    pub fn cell_of(&self, position: Vec2) -> CellKey {
        (
            (position.x / self.cell_size).floor() as i64,
            (position.y / self.cell_size).floor() as i64,
        )
    }

    /// Clear and repopulate from `positions` in O(n). Index `i` refers to the i-th position.
    pub fn build<I>(&mut self, positions: I, cell_size: f64)
    where
        I: IntoIterator<Item = Vec2>,
    {
        if cell_size != self.cell_size {
            self.cell_size = cell_size;
            self.cells.clear();
        }
        self.cells.values_mut().for_each(Vec::clear);
        self.len = 0;
        for (idx, position) in positions.into_iter().enumerate() {
            let key = self.cell_of(position);
            self.cells.entry(key).or_default().push(idx);
            self.len += 1;
        }
    }

    /// Indices in the bucket at `key`.
    pub fn bucket(&self, key: CellKey) -> &[usize] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concatenation of the 3x3 block of cells around `position`.
    ///
    /// Cells are visited column by column (dx outer, dy inner). This is not a radius
    /// query: callers must distance-filter, and neighbors further than one cell away
    /// are never returned, so `cell_size` should be at least the query radius.
    pub fn query_neighborhood(&self, position: Vec2) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.cell_of(position);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .flat_map(move |key| self.bucket(key).iter().copied())
    }

    /// Same as [`query_neighborhood`](Self::query_neighborhood), collected into `out`.
    pub fn query_neighborhood_into(&self, position: Vec2, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.query_neighborhood(position));
    }
}
