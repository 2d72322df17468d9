use tessera_mesh_cpu::CompiledBlockMesh;
use tessera_world::{BlockPos, MAP_BLOCKSIZE, MapNode, NODES_PER_BLOCK};

/// One 16³ chunk of nodes as delivered by the server.
#[derive(Debug)]
pub struct MapBlock {
    pub pos: BlockPos,
    nodes: Vec<MapNode>,
    /// Faces fully covered by opaque nodes, as last reported by the mesher.
    pub solid_sides: u8,
    mesh: Option<Box<CompiledBlockMesh>>,
    /// Seconds since the block was last used (drawn, touched or written).
    usage_timer: f32,
}

impl MapBlock {
    pub fn new(pos: BlockPos) -> Self {
        Self {
            pos,
            nodes: vec![MapNode::IGNORE; NODES_PER_BLOCK],
            solid_sides: 0,
            mesh: None,
            usage_timer: 0.0,
        }
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        let bs = MAP_BLOCKSIZE as usize;
        (y * bs + z) * bs + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> MapNode {
        self.nodes[Self::idx(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, n: MapNode) {
        self.nodes[Self::idx(x, y, z)] = n;
    }

    #[inline]
    pub fn nodes(&self) -> &[MapNode] {
        &self.nodes
    }

    /// Full replace from a network payload. Wrong-length payloads are padded
    /// with ignore or truncated.
    pub fn replace_nodes(&mut self, mut nodes: Vec<MapNode>) {
        if nodes.len() != NODES_PER_BLOCK {
            log::warn!(
                target: "map",
                "block {:?} payload has {} nodes, expected {}",
                self.pos,
                nodes.len(),
                NODES_PER_BLOCK
            );
            nodes.resize(NODES_PER_BLOCK, MapNode::IGNORE);
        }
        self.nodes = nodes;
    }

    #[inline]
    pub fn mesh(&self) -> Option<&CompiledBlockMesh> {
        self.mesh.as_deref()
    }

    #[inline]
    pub fn mesh_mut(&mut self) -> Option<&mut CompiledBlockMesh> {
        self.mesh.as_deref_mut()
    }

    /// Swaps in a new mesh and returns the old one, which the caller drops.
    pub fn replace_mesh(&mut self, mesh: Box<CompiledBlockMesh>) -> Option<Box<CompiledBlockMesh>> {
        self.mesh.replace(mesh)
    }

    pub fn take_mesh(&mut self) -> Option<Box<CompiledBlockMesh>> {
        self.mesh.take()
    }

    #[inline]
    pub fn usage_timer(&self) -> f32 {
        self.usage_timer
    }

    #[inline]
    pub fn reset_usage_timer(&mut self) {
        self.usage_timer = 0.0;
    }

    #[inline]
    pub(crate) fn increment_usage_timer(&mut self, dtime: f32) {
        self.usage_timer += dtime;
    }
}
