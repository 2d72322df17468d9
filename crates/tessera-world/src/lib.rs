//! Block and node coordinates, node values, and node definitions.
#![forbid(unsafe_code)]

mod mesh_grid;
mod node;
mod nodedef;
mod pos;

pub use mesh_grid::{MAX_MESH_CHUNK, MeshGrid};
pub use node::{CONTENT_AIR, CONTENT_IGNORE, CONTENT_UNKNOWN, ContentId, MapNode};
pub use nodedef::{DrawType, NodeDef, NodeDefManager};
pub use pos::{
    BlockPos, FACE_OFFSETS, InvalidPosition, MAP_BLOCKSIZE, MAX_MAP_GENERATION_LIMIT, NodePos,
    NODES_PER_BLOCK,
};
