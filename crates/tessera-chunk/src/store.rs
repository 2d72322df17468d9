use hashbrown::HashMap;

use tessera_mesh_cpu::{CompiledBlockMesh, MeshMakeData};
use tessera_world::{BlockPos, InvalidPosition, MAP_BLOCKSIZE, MapNode, MeshGrid, NodePos};

use crate::block::MapBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NodeEditError {
    #[error(transparent)]
    OutOfRange(#[from] InvalidPosition),
    #[error("block {0:?} is not loaded")]
    NotLoaded(BlockPos),
}

/// Column of blocks sharing an (x, z) block coordinate.
#[derive(Debug)]
pub struct MapSector {
    pub pos: (i16, i16),
    blocks: HashMap<i16, MapBlock>,
}

impl MapSector {
    fn new(pos: (i16, i16)) -> Self {
        Self {
            pos,
            blocks: HashMap::new(),
        }
    }

    #[inline]
    pub fn get_block(&self, y: i16) -> Option<&MapBlock> {
        self.blocks.get(&y)
    }

    #[inline]
    pub fn get_block_mut(&mut self, y: i16) -> Option<&mut MapBlock> {
        self.blocks.get_mut(&y)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &MapBlock> {
        self.blocks.values()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut MapBlock> {
        self.blocks.values_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionStats {
    pub timed_out: usize,
    pub over_limit: usize,
}

/// Sparse sector/block storage for the client map. Main-thread only.
#[derive(Debug, Default)]
pub struct VoxelStore {
    sectors: HashMap<(i16, i16), MapSector>,
    block_count: usize,
    mesh_serial: u64,
}

impl VoxelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sector, creating it if needed.
    pub fn emerge_sector(&mut self, x: i16, z: i16) -> &mut MapSector {
        self.sectors
            .entry((x, z))
            .or_insert_with(|| MapSector::new((x, z)))
    }

    #[inline]
    pub fn get_sector(&self, x: i16, z: i16) -> Option<&MapSector> {
        self.sectors.get(&(x, z))
    }

    #[inline]
    pub fn get_block(&self, p: BlockPos) -> Option<&MapBlock> {
        self.sectors.get(&p.sector()).and_then(|s| s.get_block(p.y))
    }

    #[inline]
    pub fn get_block_mut(&mut self, p: BlockPos) -> Option<&mut MapBlock> {
        self.sectors
            .get_mut(&p.sector())
            .and_then(|s| s.get_block_mut(p.y))
    }

    #[inline]
    pub fn contains(&self, p: BlockPos) -> bool {
        self.get_block(p).is_some()
    }

    /// Returns the block, creating an all-ignore block if absent. The bool is
    /// true when the block was created.
    pub fn emerge_block(&mut self, p: BlockPos) -> (&mut MapBlock, bool) {
        let sector = self
            .sectors
            .entry(p.sector())
            .or_insert_with(|| MapSector::new(p.sector()));
        let mut created = false;
        let block = sector.blocks.entry(p.y).or_insert_with(|| {
            created = true;
            MapBlock::new(p)
        });
        if created {
            self.block_count += 1;
        }
        (block, created)
    }

    /// Full replace of a block's nodes from the network. Keeps any existing
    /// mesh until its rebuild lands.
    pub fn insert_block_data(&mut self, p: BlockPos, nodes: Vec<MapNode>) -> &mut MapBlock {
        let (block, _) = self.emerge_block(p);
        block.replace_nodes(nodes);
        block.reset_usage_timer();
        block
    }

    pub fn remove_block(&mut self, p: BlockPos) -> Option<MapBlock> {
        let sector = self.sectors.get_mut(&p.sector())?;
        let removed = sector.blocks.remove(&p.y);
        if removed.is_some() {
            self.block_count -= 1;
        }
        removed
    }

    pub fn get_node(&self, p: NodePos) -> Option<MapNode> {
        let (x, y, z) = p.local();
        self.get_block(p.block()).map(|b| b.get_local(x, y, z))
    }

    /// Writes a single node into a loaded block; returns the block it landed in.
    pub fn set_node(&mut self, p: NodePos, n: MapNode) -> Result<BlockPos, NodeEditError> {
        let p = p.validate()?;
        let bp = p.block();
        let (x, y, z) = p.local();
        let block = self.get_block_mut(bp).ok_or(NodeEditError::NotLoaded(bp))?;
        block.set_local(x, y, z, n);
        block.reset_usage_timer();
        Ok(bp)
    }

    /// Installs a mesh on the block at `p`, stamping it with a fresh serial.
    /// Hands the mesh back if the block is gone.
    pub fn install_mesh(
        &mut self,
        p: BlockPos,
        mut mesh: Box<CompiledBlockMesh>,
    ) -> Result<u64, Box<CompiledBlockMesh>> {
        self.mesh_serial += 1;
        let serial = self.mesh_serial;
        match self.get_block_mut(p) {
            Some(block) => {
                mesh.serial = serial;
                // The previous mesh drops here, in the same call that makes the new one reachable.
                drop(block.replace_mesh(mesh));
                Ok(serial)
            }
            None => Err(mesh),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.block_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    #[inline]
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.blocks().filter(|b| b.mesh().is_some()).count()
    }

    pub fn sectors(&self) -> impl Iterator<Item = &MapSector> {
        self.sectors.values()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &MapBlock> {
        self.sectors.values().flat_map(|s| s.blocks())
    }

    /// Visits every resident block inside the inclusive box `min..=max`,
    /// sector by sector.
    pub fn for_each_block_in_mut<F>(&mut self, min: BlockPos, max: BlockPos, mut f: F)
    where
        F: FnMut(&mut MapBlock),
    {
        for sector in self.sectors.values_mut() {
            let (sx, sz) = sector.pos;
            if sx < min.x || sx > max.x || sz < min.z || sz > max.z {
                continue;
            }
            for block in sector.blocks_mut() {
                if block.pos.y >= min.y && block.pos.y <= max.y {
                    f(block);
                }
            }
        }
    }

    /// Visits every resident block.
    pub fn for_each_block_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut MapBlock),
    {
        for sector in self.sectors.values_mut() {
            for block in sector.blocks_mut() {
                f(block);
            }
        }
    }

    /// Ages every block by `dtime` and removes blocks unused for longer than
    /// `unload_timeout`, then, if more than `max_loaded_blocks` remain, the
    /// least recently used ones until the count fits. Removed coordinates are
    /// appended to `evicted`; their meshes are dropped with them.
    pub fn timer_update(
        &mut self,
        dtime: f32,
        unload_timeout: f32,
        max_loaded_blocks: Option<usize>,
        evicted: &mut Vec<BlockPos>,
    ) -> EvictionStats {
        let mut stats = EvictionStats::default();
        let mut expired: Vec<BlockPos> = Vec::new();
        let mut survivors: Vec<(f32, BlockPos)> = Vec::new();
        for sector in self.sectors.values_mut() {
            for block in sector.blocks_mut() {
                block.increment_usage_timer(dtime);
                if block.usage_timer() > unload_timeout {
                    expired.push(block.pos);
                } else {
                    survivors.push((block.usage_timer(), block.pos));
                }
            }
        }
        expired.sort();
        for p in expired {
            if self.remove_block(p).is_some() {
                evicted.push(p);
                stats.timed_out += 1;
            }
        }

        if let Some(limit) = max_loaded_blocks {
            if self.block_count > limit {
                // Oldest first; position breaks ties so eviction is reproducible.
                survivors.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
                let excess = self.block_count - limit;
                for &(_, p) in survivors.iter().take(excess) {
                    if self.remove_block(p).is_some() {
                        evicted.push(p);
                        stats.over_limit += 1;
                    }
                }
            }
        }
        stats
    }

    /// Snapshot of one mesh-grid cell plus its face-neighbour halo.
    pub fn make_mesh_data(
        &self,
        origin: BlockPos,
        grid: MeshGrid,
        smooth_lighting: bool,
        enable_minimap: bool,
    ) -> MeshMakeData {
        let mut data = MeshMakeData::new(origin, grid.cell_size, smooth_lighting, enable_minimap);
        let c = grid.cell_size as i16;
        for dy in -1..=c {
            for dz in -1..=c {
                for dx in -1..=c {
                    let p = origin.offset(dx, dy, dz);
                    if !data.wants_block(p) {
                        continue;
                    }
                    if let Some(block) = self.get_block(p) {
                        data.fill_block(p, block.nodes());
                    }
                }
            }
        }
        data
    }
}

/// Blocks whose meshes depend on the node at `p`: the owning block, plus the
/// face neighbour across every block face the node touches (at most three).
pub fn blocks_affected_by_node(p: NodePos) -> Vec<BlockPos> {
    let bp = p.block();
    let (lx, ly, lz) = p.local();
    let last = (MAP_BLOCKSIZE - 1) as usize;
    let mut out = vec![bp];
    let step = |l: usize| -> i16 {
        if l == 0 {
            -1
        } else if l == last {
            1
        } else {
            0
        }
    };
    let (sx, sy, sz) = (step(lx), step(ly), step(lz));
    if sx != 0 {
        out.push(bp.offset(sx, 0, 0));
    }
    if sy != 0 {
        out.push(bp.offset(0, sy, 0));
    }
    if sz != 0 {
        out.push(bp.offset(0, 0, sz));
    }
    out
}
