use crate::pos::BlockPos;

/// Largest supported cell edge, in blocks.
pub const MAX_MESH_CHUNK: u16 = 16;

/// Groups blocks into cubic cells that are meshed together. The mesh of a
/// cell lives on its origin block (the cell's minimum corner).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshGrid {
    pub cell_size: u16,
}

impl Default for MeshGrid {
    fn default() -> Self {
        Self { cell_size: 1 }
    }
}

impl MeshGrid {
    /// Cell edges outside `1..=MAX_MESH_CHUNK` are clamped.
    pub fn new(cell_size: u16) -> Self {
        Self {
            cell_size: cell_size.clamp(1, MAX_MESH_CHUNK),
        }
    }

    #[inline]
    fn align(&self, v: i16) -> i16 {
        let s = i32::from(self.cell_size);
        (i32::from(v).div_euclid(s) * s) as i16
    }

    /// Origin block of the cell containing `p`.
    #[inline]
    pub fn cell_origin(&self, p: BlockPos) -> BlockPos {
        BlockPos::new(self.align(p.x), self.align(p.y), self.align(p.z))
    }

    #[inline]
    pub fn is_mesh_origin(&self, p: BlockPos) -> bool {
        self.cell_origin(p) == p
    }

    /// All blocks of the cell whose origin is `origin`, x fastest.
    pub fn cell_blocks(&self, origin: BlockPos) -> impl Iterator<Item = BlockPos> {
        let s = self.cell_size as i16;
        (0..s).flat_map(move |dz| {
            (0..s).flat_map(move |dy| (0..s).map(move |dx| origin.offset(dx, dy, dz)))
        })
    }
}
