//! CPU meshing: voxel snapshots, the compiled per-block mesh, and the
//! default face-culling mesher (engine-only, no GPU types).
#![forbid(unsafe_code)]

mod compiled;
mod face;
mod make_data;
mod mesh_build;
mod mesher;
pub mod minimap;

pub use compiled::{CompiledBlockMesh, RenderPass, TileKey};
pub use face::Face;
pub use make_data::MeshMakeData;
pub use mesh_build::MeshBuild;
pub use mesher::{FaceCullingMesher, MeshCompiler, cell_bbox, solid_sides};
pub use minimap::{MinimapMapblock, MinimapPixel};

/// All six faces set.
pub const SOLID_ALL: u8 = 0b11_1111;
