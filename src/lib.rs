//! Client-side voxel map: block store, background meshing, draw list and
//! the acknowledgement traffic that keeps the server's view in sync.
#![forbid(unsafe_code)]

pub mod ack;
pub mod camera;
pub mod cli;
mod client_map;
pub mod config;
pub mod drawlist;
pub mod soak;

pub use ack::{AckQueue, OutboundMessage};
pub use camera::CameraState;
pub use cli::CliArgs;
pub use client_map::{ClientMap, ClientMapError, ClientMapStats};
pub use config::{ClientMapConfig, ConfigError};
pub use drawlist::{DistanceSortedDrawList, DrawListParams, VisibleEntry};

pub use tessera_chunk::{MapBlock, VoxelStore};
pub use tessera_mesh_cpu::{CompiledBlockMesh, FaceCullingMesher, MeshCompiler};
pub use tessera_objects::{ActiveObject, ActiveObjectRegistry, ObjectId, ObjectKind, ObjectMessage};
pub use tessera_world::{BlockPos, MapNode, MeshGrid, NodeDefManager, NodePos};
