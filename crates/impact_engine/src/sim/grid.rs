//! In-memory destructible grid
//!
//! Cells are centred on integer coordinates: cell `c` covers
//! `(c - 0.5) * cell_size ..= (c + 0.5) * cell_size` on each axis of the
//! structure's local frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::math::{self, CellCoord, Mat4, Transform, Vec3};
use crate::host::{Block, BlockId, BlockShape, DamageKind, HitInfo, ShapePart, Structure, StructureId};
use crate::physics::CollisionMesh;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a block id unique within the process
pub fn next_block_id() -> BlockId {
    BlockId(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
}

/// One recorded damage application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRecord {
    /// Amount requested
    pub amount: f32,
    /// Contact metadata supplied with it
    pub hit: HitInfo,
    /// Attacker identity
    pub attacker: i64,
}

#[derive(Debug)]
struct BlockState {
    integrity: f32,
    shape: BlockShape,
    damage_log: Vec<DamageRecord>,
}

/// A destructible block held by a [`GridStructure`]
#[derive(Debug)]
pub struct GridBlock {
    id: BlockId,
    local_position: Vec3,
    force_destructible: bool,
    state: RwLock<BlockState>,
}

impl GridBlock {
    /// Create a block with explicit geometry
    pub fn new(local_position: Vec3, integrity: f32, shape: BlockShape) -> Self {
        Self {
            id: next_block_id(),
            local_position,
            force_destructible: false,
            state: RwLock::new(BlockState {
                integrity,
                shape,
                damage_log: Vec::new(),
            }),
        }
    }

    /// Single-cell cube filling `cell`
    pub fn cube(cell: CellCoord, cell_size: f64, integrity: f32) -> Self {
        let center = cell_center(cell, cell_size);
        let part = ShapePart::new(Mat4::new_translation(&center), Arc::new(CollisionMesh::cube(cell_size)));
        Self::new(center, integrity, BlockShape::Parts(vec![part]))
    }

    /// Destructible regardless of the structure setting (builder pattern)
    pub fn with_force_destructible(mut self, enabled: bool) -> Self {
        self.force_destructible = enabled;
        self
    }

    /// Replace the block geometry
    pub fn set_shape(&self, shape: BlockShape) {
        self.write_state().shape = shape;
    }

    /// Every damage application received so far
    pub fn damage_log(&self) -> Vec<DamageRecord> {
        self.read_state().damage_log.clone()
    }

    /// Whether the block has been destroyed
    pub fn is_destroyed(&self) -> bool {
        self.read_state().integrity <= 0.0
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, BlockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, BlockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Block for GridBlock {
    fn id(&self) -> BlockId {
        self.id
    }

    fn local_position(&self) -> Vec3 {
        self.local_position
    }

    fn remaining_damage(&self) -> f32 {
        self.read_state().integrity.max(0.0)
    }

    fn integrity(&self) -> f32 {
        self.read_state().integrity
    }

    fn force_destructible(&self) -> bool {
        self.force_destructible
    }

    fn shape(&self) -> BlockShape {
        self.read_state().shape.clone()
    }

    fn apply_damage(&self, amount: f32, _kind: DamageKind, hit: &HitInfo, attacker: i64) {
        let mut state = self.write_state();
        state.integrity -= amount;
        state.damage_log.push(DamageRecord {
            amount,
            hit: *hit,
            attacker,
        });
        if state.integrity <= 0.0 {
            log::debug!("Block {:?} destroyed by {}", self.id, attacker);
        }
    }
}

/// Structure-local centre of a cell
pub fn cell_center(cell: CellCoord, cell_size: f64) -> Vec3 {
    cell.cast::<f64>() * cell_size
}

/// In-memory destructible grid implementing [`Structure`]
#[derive(Debug)]
pub struct GridStructure {
    id: StructureId,
    cell_size: f64,
    transform: RwLock<Transform>,
    occupancy: RwLock<Occupancy>,
    destruction_enabled: AtomicBool,
    preview: bool,
    projector: bool,
}

impl GridStructure {
    /// Empty structure
    pub fn new(id: StructureId, cell_size: f64, transform: Transform) -> Self {
        Self {
            id,
            cell_size,
            transform: RwLock::new(transform),
            occupancy: RwLock::new(Occupancy::default()),
            destruction_enabled: AtomicBool::new(true),
            preview: false,
            projector: false,
        }
    }

    /// Mark as a preview/blueprint (builder pattern)
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Mark as projector-attached (builder pattern)
    pub fn with_projector(mut self, projector: bool) -> Self {
        self.projector = projector;
        self
    }

    /// Enable or disable block destruction
    pub fn set_destruction_enabled(&self, enabled: bool) {
        self.destruction_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Move the structure
    pub fn set_transform(&self, transform: Transform) {
        *self.transform.write().unwrap_or_else(PoisonError::into_inner) = transform;
    }

    /// Place a block over one or more cells
    pub fn place_block(&self, cells: &[CellCoord], block: Arc<GridBlock>) {
        let mut occupancy = self.occupancy.write().unwrap_or_else(PoisonError::into_inner);
        for cell in cells {
            occupancy.insert(*cell, Arc::clone(&block));
        }
    }

    /// Place a single-cell cube and return it
    pub fn place_cube(&self, cell: CellCoord, integrity: f32) -> Arc<GridBlock> {
        let block = Arc::new(GridBlock::cube(cell, self.cell_size, integrity));
        self.place_block(&[cell], Arc::clone(&block));
        block
    }

    /// Fill an inclusive box of cells with cubes
    pub fn fill_cubes(&self, min: CellCoord, max: CellCoord, integrity: f32) -> Vec<Arc<GridBlock>> {
        let mut placed = Vec::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    placed.push(self.place_cube(CellCoord::new(x, y, z), integrity));
                }
            }
        }
        placed
    }

    /// Drop destroyed blocks from the occupancy map, returning how many cells were freed
    pub fn remove_destroyed(&self) -> usize {
        self.occupancy.write().unwrap_or_else(PoisonError::into_inner).remove_destroyed()
    }

    /// Number of occupied cells, destroyed blocks included until swept
    pub fn occupied_cells(&self) -> usize {
        self.occupancy.read().unwrap_or_else(PoisonError::into_inner).cells.len()
    }

}

/// Occupancy map plus the bounds of its occupied cells
#[derive(Debug, Default)]
struct Occupancy {
    cells: HashMap<CellCoord, Arc<GridBlock>>,
    bounds: Option<(CellCoord, CellCoord)>,
}

impl Occupancy {
    fn insert(&mut self, cell: CellCoord, block: Arc<GridBlock>) {
        self.cells.insert(cell, block);
        self.bounds = Some(extend_bounds(self.bounds, cell));
    }

    fn remove_destroyed(&mut self) -> usize {
        let before = self.cells.len();
        self.cells.retain(|_, block| !block.is_destroyed());
        let removed = before - self.cells.len();
        if removed > 0 {
            // Shrinking needs a rescan; growth never does
            self.bounds = self.cells.keys().fold(None, |bounds, cell| Some(extend_bounds(bounds, *cell)));
        }
        removed
    }

    fn bounds(&self) -> (CellCoord, CellCoord) {
        self.bounds.unwrap_or((CellCoord::zeros(), CellCoord::zeros()))
    }
}

fn extend_bounds(bounds: Option<(CellCoord, CellCoord)>, cell: CellCoord) -> (CellCoord, CellCoord) {
    match bounds {
        Some((min, max)) => (
            CellCoord::new(min.x.min(cell.x), min.y.min(cell.y), min.z.min(cell.z)),
            CellCoord::new(max.x.max(cell.x), max.y.max(cell.y), max.z.max(cell.z)),
        ),
        None => (cell, cell),
    }
}

impl Structure for GridStructure {
    fn id(&self) -> StructureId {
        self.id
    }

    fn world_matrix(&self) -> Mat4 {
        self.transform.read().unwrap_or_else(PoisonError::into_inner).to_matrix()
    }

    fn min_cell(&self) -> CellCoord {
        self.cell_bounds().0
    }

    fn max_cell(&self) -> CellCoord {
        self.cell_bounds().1
    }

    fn cell_bounds(&self) -> (CellCoord, CellCoord) {
        self.occupancy.read().unwrap_or_else(PoisonError::into_inner).bounds()
    }

    fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn is_preview(&self) -> bool {
        self.preview
    }

    fn has_projector(&self) -> bool {
        self.projector
    }

    fn destruction_enabled(&self) -> bool {
        self.destruction_enabled.load(Ordering::Relaxed)
    }

    fn raycast_cells(&self, from: Vec3, to: Vec3) -> Vec<CellCoord> {
        let inverse = math::try_inverse_or_identity(&self.world_matrix());
        // Shift by half a cell so cell boundaries fall on integers
        let to_cell_space = |p: Vec3| math::transform_point(&inverse, p) / self.cell_size + Vec3::repeat(0.5);
        let (min, max) = self.cell_bounds();

        let mut cells = Vec::new();
        traverse_cells(to_cell_space(from), to_cell_space(to), |cell| {
            if (0..3).all(|axis| (min[axis]..=max[axis]).contains(&cell[axis])) {
                cells.push(cell);
            }
        });
        cells
    }

    fn block_at(&self, cell: CellCoord) -> Option<Arc<dyn Block>> {
        let occupancy = self.occupancy.read().unwrap_or_else(PoisonError::into_inner);
        occupancy
            .cells
            .get(&cell)
            .filter(|block| !block.is_destroyed())
            .map(|block| Arc::clone(block) as Arc<dyn Block>)
    }
}

const MAX_TRAVERSAL_STEPS: usize = 1 << 16;

/// Amanatides-Woo traversal of unit cells from `from` to `to`
///
/// Visits every cell the segment passes through, starting with the cell
/// containing `from` and ending with the one containing `to`.
fn traverse_cells(from: Vec3, to: Vec3, mut visit: impl FnMut(CellCoord)) {
    let delta = to - from;
    let mut cell = floor_cell(from);
    let end = floor_cell(to);

    let mut step = [0i32; 3];
    let mut t_max = [f64::INFINITY; 3];
    let mut t_delta = [f64::INFINITY; 3];
    for axis in 0..3 {
        if delta[axis].abs() < 1e-12 {
            continue;
        }
        step[axis] = if delta[axis] > 0.0 { 1 } else { -1 };
        let boundary = if step[axis] > 0 {
            f64::from(cell[axis]) + 1.0
        } else {
            f64::from(cell[axis])
        };
        t_max[axis] = (boundary - from[axis]) / delta[axis];
        t_delta[axis] = 1.0 / delta[axis].abs();
    }

    for _ in 0..MAX_TRAVERSAL_STEPS {
        visit(cell);
        if cell == end {
            return;
        }

        let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
            0
        } else if t_max[1] <= t_max[2] {
            1
        } else {
            2
        };
        if t_max[axis] > 1.0 {
            return;
        }
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];
    }

    log::warn!("Cell traversal from {from:?} to {to:?} hit the step limit");
}

fn floor_cell(p: Vec3) -> CellCoord {
    CellCoord::new(p.x.floor() as i32, p.y.floor() as i32, p.z.floor() as i32)
}
