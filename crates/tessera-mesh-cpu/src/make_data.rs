use tessera_world::{BlockPos, MAP_BLOCKSIZE, MapNode, NodePos};

/// Immutable voxel snapshot handed to a mesh worker.
///
/// Covers one mesh-grid cell plus a one-node halo on every side. Halo nodes
/// whose block was not loaded when the snapshot was taken hold
/// `CONTENT_IGNORE`, which the mesher treats as opaque.
#[derive(Clone, Debug)]
pub struct MeshMakeData {
    pub origin: BlockPos,
    pub cell_size: u16,
    pub smooth_lighting: bool,
    pub enable_minimap: bool,
    side: usize,
    nodes: Vec<MapNode>,
}

impl MeshMakeData {
    pub fn new(origin: BlockPos, cell_size: u16, smooth_lighting: bool, enable_minimap: bool) -> Self {
        let cell_size = cell_size.max(1);
        let side = cell_size as usize * MAP_BLOCKSIZE as usize + 2;
        Self {
            origin,
            cell_size,
            smooth_lighting,
            enable_minimap,
            side,
            nodes: vec![MapNode::IGNORE; side * side * side],
        }
    }

    /// Node edge length of the cell (without halo).
    #[inline]
    pub fn extent(&self) -> i32 {
        i32::from(self.cell_size) * MAP_BLOCKSIZE
    }

    /// Absolute position of the cell's minimum node.
    #[inline]
    pub fn base_node(&self) -> NodePos {
        self.origin.base_node()
    }

    #[inline]
    fn idx(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let s = self.side as i32;
        let (x, y, z) = (x + 1, y + 1, z + 1);
        if x < 0 || y < 0 || z < 0 || x >= s || y >= s || z >= s {
            return None;
        }
        Some(((y * s + z) * s + x) as usize)
    }

    /// Node at cell-relative coordinates; valid range is `-1..=extent()` per
    /// axis, anything outside reads as ignore.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> MapNode {
        self.idx(x, y, z)
            .map(|i| self.nodes[i])
            .unwrap_or(MapNode::IGNORE)
    }

    /// Whether `p` is one of the blocks whose nodes reach the snapshot:
    /// a cell block, or a face neighbour of the cell.
    pub fn wants_block(&self, p: BlockPos) -> bool {
        let c = i32::from(self.cell_size);
        let rel = [
            i32::from(p.x) - i32::from(self.origin.x),
            i32::from(p.y) - i32::from(self.origin.y),
            i32::from(p.z) - i32::from(self.origin.z),
        ];
        let mut outside = 0;
        for r in rel {
            if r < -1 || r > c {
                return false;
            }
            if r == -1 || r == c {
                outside += 1;
            }
        }
        outside <= 1
    }

    /// Copies the part of `nodes` (a full block at `p`, x fastest then z then
    /// y) that falls inside the snapshot volume.
    pub fn fill_block(&mut self, p: BlockPos, nodes: &[MapNode]) {
        let bs = MAP_BLOCKSIZE;
        if nodes.len() != (bs * bs * bs) as usize {
            log::warn!(target: "mesh", "fill_block({p:?}) got {} nodes, ignoring", nodes.len());
            return;
        }
        let cell_base = self.base_node();
        let block_base = p.base_node();
        let off = (
            block_base.x - cell_base.x,
            block_base.y - cell_base.y,
            block_base.z - cell_base.z,
        );
        let ext = self.extent();
        let range = |o: i32| (-1 - o).max(0)..(ext + 1 - o).min(bs);
        for ly in range(off.1) {
            for lz in range(off.2) {
                for lx in range(off.0) {
                    let src = ((ly * bs + lz) * bs + lx) as usize;
                    if let Some(dst) = self.idx(off.0 + lx, off.1 + ly, off.2 + lz) {
                        self.nodes[dst] = nodes[src];
                    }
                }
            }
        }
    }
}
