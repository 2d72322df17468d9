use hashbrown::{HashMap, HashSet};

use tessera_geom::{Aabb, Sphere};
use tessera_world::BlockPos;

use crate::mesh_build::MeshBuild;
use crate::minimap::MinimapMapblock;

/// Render pass a layer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPass {
    Opaque,
    Blended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub pass: RenderPass,
    pub material: u16,
}

/// Renderable result of one mesh job, owned by the origin block of its cell.
#[derive(Debug)]
pub struct CompiledBlockMesh {
    pub origin: BlockPos,
    pub parts: HashMap<TileKey, MeshBuild>,
    pub bbox: Aabb,
    pub bounding_sphere: Sphere,
    pub minimap: Vec<MinimapMapblock>,
    /// Active objects currently inside the cell, for batched drawing.
    pub objects: HashSet<u16>,
    /// Stamped by the store when installed; 0 until then.
    pub serial: u64,
}

impl CompiledBlockMesh {
    pub fn empty(origin: BlockPos, cell_bbox: Aabb) -> Self {
        Self {
            origin,
            parts: HashMap::new(),
            bbox: cell_bbox,
            bounding_sphere: Sphere::enclosing(&cell_bbox),
            minimap: Vec::new(),
            objects: HashSet::new(),
            serial: 0,
        }
    }

    /// True when there is no geometry; still a valid mesh.
    pub fn is_empty(&self) -> bool {
        self.parts.values().all(MeshBuild::is_empty)
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.values().map(MeshBuild::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.values().map(MeshBuild::vertex_count).sum()
    }

    /// Layers of one pass in material order, so draw submission is stable.
    pub fn layers(&self, pass: RenderPass) -> Vec<(&TileKey, &MeshBuild)> {
        let mut v: Vec<_> = self.parts.iter().filter(|(k, _)| k.pass == pass).collect();
        v.sort_by_key(|(k, _)| **k);
        v
    }
}
