use hashbrown::HashMap;
use std::sync::Arc;

use tessera_geom::{Aabb, Vec3};
use tessera_world::{BlockPos, DrawType, MAP_BLOCKSIZE, MapNode, NodeDefManager};

use crate::compiled::{CompiledBlockMesh, RenderPass, TileKey};
use crate::face::Face;
use crate::make_data::MeshMakeData;
use crate::mesh_build::MeshBuild;
use crate::minimap;

// Visual-only lighting floor to avoid pitch-black faces in darkness.
const VISUAL_LIGHT_MIN: u8 = 18;

/// Turns a voxel snapshot into a renderable mesh. Runs on worker threads.
pub trait MeshCompiler: Send + Sync {
    fn node_defs(&self) -> &NodeDefManager;

    fn compile(&self, data: &MeshMakeData) -> CompiledBlockMesh;
}

/// Node-space bounding box of the snapshot's cell.
pub fn cell_bbox(data: &MeshMakeData) -> Aabb {
    let b = data.base_node();
    let min = Vec3::new(b.x as f32, b.y as f32, b.z as f32);
    Aabb::new(min, min + Vec3::splat(data.extent() as f32))
}

/// Default mesher: one quad per exposed node face, no merging.
pub struct FaceCullingMesher {
    defs: Arc<NodeDefManager>,
}

impl FaceCullingMesher {
    pub fn new(defs: Arc<NodeDefManager>) -> Self {
        Self { defs }
    }

    fn face_visible(&self, node: MapNode, neighbor: MapNode) -> bool {
        if self.defs.is_opaque(neighbor.content) {
            return false;
        }
        match self.defs.drawtype(node.content) {
            DrawType::Airlike => false,
            DrawType::Normal => true,
            DrawType::Glasslike | DrawType::Liquid => neighbor.content != node.content,
        }
    }

    fn light_for(&self, data: &MeshMakeData, x: i32, y: i32, z: i32, face: Face) -> u8 {
        let (dx, dy, dz) = face.delta();
        let (nx, ny, nz) = (x + dx, y + dy, z + dz);
        let level = if data.smooth_lighting {
            // Average the face neighbour with its four in-plane neighbours.
            let mut sum = 0u32;
            let mut count = 0u32;
            let plane: [(i32, i32, i32); 5] = match face {
                Face::NegX | Face::PosX => [(0, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)],
                Face::NegY | Face::PosY => [(0, 0, 0), (1, 0, 0), (-1, 0, 0), (0, 0, 1), (0, 0, -1)],
                Face::NegZ | Face::PosZ => [(0, 0, 0), (1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0)],
            };
            for (ox, oy, oz) in plane {
                let n = data.get(nx + ox, ny + oy, nz + oz);
                if !n.is_ignore() && !self.defs.is_opaque(n.content) {
                    sum += u32::from(n.day_light());
                    count += 1;
                }
            }
            if count == 0 { 0 } else { (sum / count) as u8 }
        } else {
            data.get(nx, ny, nz).day_light()
        };
        (level.min(15) * 17).max(VISUAL_LIGHT_MIN)
    }
}

impl MeshCompiler for FaceCullingMesher {
    fn node_defs(&self) -> &NodeDefManager {
        &self.defs
    }

    fn compile(&self, data: &MeshMakeData) -> CompiledBlockMesh {
        let ext = data.extent();
        let base = data.base_node();
        let mut parts: HashMap<TileKey, MeshBuild> = HashMap::new();
        let mut bbox: Option<Aabb> = None;

        for y in 0..ext {
            for z in 0..ext {
                for x in 0..ext {
                    let node = data.get(x, y, z);
                    if !self.defs.is_drawn(node.content) {
                        continue;
                    }
                    let origin = Vec3::new(
                        (base.x + x) as f32,
                        (base.y + y) as f32,
                        (base.z + z) as f32,
                    );
                    let pass = if self.defs.is_translucent(node.content) {
                        RenderPass::Blended
                    } else {
                        RenderPass::Opaque
                    };
                    let key = TileKey {
                        pass,
                        material: self.defs.material(node.content),
                    };
                    for face in Face::ALL {
                        let (dx, dy, dz) = face.delta();
                        let neighbor = data.get(x + dx, y + dy, z + dz);
                        if !self.face_visible(node, neighbor) {
                            continue;
                        }
                        let l = self.light_for(data, x, y, z, face);
                        parts.entry(key).or_default().add_face(face, origin, [l, l, l, 255]);
                        let node_box = Aabb::new(origin, origin + Vec3::splat(1.0));
                        match bbox.as_mut() {
                            Some(b) => {
                                b.include(node_box.min);
                                b.include(node_box.max);
                            }
                            None => bbox = Some(node_box),
                        }
                    }
                }
            }
        }

        let mut mesh = match bbox {
            Some(b) => {
                let mut m = CompiledBlockMesh::empty(data.origin, b);
                m.parts = parts;
                m
            }
            None => CompiledBlockMesh::empty(data.origin, cell_bbox(data)),
        };
        if data.enable_minimap {
            mesh.minimap = minimap::summarize(data, &self.defs);
        }
        mesh
    }
}

/// Per-block bitmask of faces fully covered by opaque nodes, bit order as
/// `Face::bit`. Unloaded content does not count as solid here.
pub fn solid_sides(data: &MeshMakeData, defs: &NodeDefManager) -> Vec<(BlockPos, u8)> {
    let bs = MAP_BLOCKSIZE;
    let c = data.cell_size as i16;
    let solid = |x: i32, y: i32, z: i32| {
        let n = data.get(x, y, z);
        !n.is_ignore() && defs.is_opaque(n.content)
    };
    let mut out = Vec::with_capacity((c as usize).pow(3));
    for dy in 0..c {
        for dz in 0..c {
            for dx in 0..c {
                let (ox, oy, oz) = (i32::from(dx) * bs, i32::from(dy) * bs, i32::from(dz) * bs);
                let mut mask = 0u8;
                for face in Face::ALL {
                    let covered = (0..bs).all(|a| {
                        (0..bs).all(|b| match face {
                            Face::NegX => solid(ox, oy + a, oz + b),
                            Face::PosX => solid(ox + bs - 1, oy + a, oz + b),
                            Face::NegY => solid(ox + a, oy, oz + b),
                            Face::PosY => solid(ox + a, oy + bs - 1, oz + b),
                            Face::NegZ => solid(ox + a, oy + b, oz),
                            Face::PosZ => solid(ox + a, oy + b, oz + bs - 1),
                        })
                    });
                    if covered {
                        mask |= face.bit();
                    }
                }
                out.push((data.origin.offset(dx, dy, dz), mask));
            }
        }
    }
    out
}
