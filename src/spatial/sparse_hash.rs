//! Sparse hash grid for radius queries

use ahash::AHashMap;

use crate::core::types::{EntityId, Vec2};

/// Sparse hash grid keyed by cell coordinate
///
/// Every entity lives in exactly one cell; `locations` mirrors its position
/// so moves and removals never need the caller's old position.
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<EntityId>>,
    locations: AHashMap<EntityId, Vec2>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            cells: AHashMap::new(),
            locations: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.locations.clear();
    }

    /// Insert or move an entity
    pub fn insert(&mut self, entity: EntityId, pos: Vec2) {
        if let Some(old) = self.locations.insert(entity, pos) {
            let (from, to) = (self.cell_coord(old), self.cell_coord(pos));
            if from == to {
                return;
            }
            self.detach(entity, from);
        }
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push(entity);
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<Vec2> {
        let pos = self.locations.remove(&entity)?;
        self.detach(entity, self.cell_coord(pos));
        Some(pos)
    }

    fn detach(&mut self, entity: EntityId, coord: (i32, i32)) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.retain(|&e| e != entity);
            if cell.is_empty() {
                self.cells.remove(&coord);
            }
        }
    }

    pub fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.locations.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Entities within `radius` of `center`, nearest first, ties by id
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<(EntityId, Vec2, f32)> {
        let reach = (radius / self.cell_size).ceil() as i32;
        let (cx, cy) = self.cell_coord(center);

        let mut found: Vec<(EntityId, Vec2, f32)> = (-reach..=reach)
            .flat_map(|dx| (-reach..=reach).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(|coord| self.cells.get(&coord))
            .flatten()
            .filter_map(|entity| {
                let pos = self.locations.get(entity)?;
                let distance = center.distance(pos);
                (distance <= radius).then_some((*entity, *pos, distance))
            })
            .collect();

        found.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        found
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, entities: impl Iterator<Item = (EntityId, Vec2)>) {
        self.clear();
        for (entity, pos) in entities {
            self.insert(entity, pos);
        }
    }
}
