use std::path::Path;

use serde::Deserialize;
use tessera_world::MAX_MESH_CHUNK;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options consumed by [`ClientMap`](crate::ClientMap). Read once at
/// construction; see [`ClientMap::apply_config`](crate::ClientMap::apply_config)
/// for the subset that can change afterwards.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ClientMapConfig {
    /// Mesh-grid cell edge, in blocks.
    #[serde(default = "default_mesh_chunk")] pub mesh_chunk: u16,
    /// Seconds a block may go unused before it is evicted.
    #[serde(default = "default_unload_timeout")] pub unload_unused_data_timeout: f32,
    /// Hard cap on resident blocks; negative disables it.
    #[serde(default = "default_mapblock_limit")] pub mapblock_limit: i32,
    /// 0 picks a count from the available parallelism.
    #[serde(default = "default_mesh_threads")] pub mesh_generation_threads: usize,
    #[serde(default = "default_mesh_queue")] pub mesh_queue_capacity: usize,
    /// Installs per step; 0 drains everything available.
    #[serde(default)] pub max_mesh_results_per_step: usize,
    /// In nodes.
    #[serde(default = "default_viewing_range")] pub viewing_range: f32,
    #[serde(default)] pub range_all: bool,
    #[serde(default = "default_drawlist_interval")] pub drawlist_update_interval_ms: u64,
    /// Camera travel, in nodes, that forces a draw list refresh.
    #[serde(default = "default_move_threshold")] pub drawlist_move_threshold: f32,
    #[serde(default = "default_turn_threshold")] pub drawlist_turn_threshold_deg: f32,
    /// Extra blocks around the wanted range that are still listed.
    #[serde(default = "default_margin")] pub drawlist_margin_blocks: i16,
    /// Seconds between eviction passes.
    #[serde(default = "default_timer_interval")] pub timer_update_interval: f32,
    #[serde(default = "default_true")] pub smooth_lighting: bool,
    #[serde(default)] pub enable_minimap: bool,
    #[serde(default = "default_true")] pub occlusion_culling: bool,
    /// In nodes; 0 disables the shadow list.
    #[serde(default)] pub shadow_range: f32,
}

fn default_mesh_chunk() -> u16 { 1 }
fn default_unload_timeout() -> f32 { 600.0 }
fn default_mapblock_limit() -> i32 { 7500 }
fn default_mesh_threads() -> usize { 1 }
fn default_mesh_queue() -> usize { 64 }
fn default_viewing_range() -> f32 { 190.0 }
fn default_drawlist_interval() -> u64 { 300 }
fn default_move_threshold() -> f32 { 8.0 }
fn default_turn_threshold() -> f32 { 20.0 }
fn default_margin() -> i16 { 1 }
fn default_timer_interval() -> f32 { 1.0 }
fn default_true() -> bool { true }

impl Default for ClientMapConfig {
    fn default() -> Self {
        Self {
            mesh_chunk: default_mesh_chunk(),
            unload_unused_data_timeout: default_unload_timeout(),
            mapblock_limit: default_mapblock_limit(),
            mesh_generation_threads: default_mesh_threads(),
            mesh_queue_capacity: default_mesh_queue(),
            max_mesh_results_per_step: 0,
            viewing_range: default_viewing_range(),
            range_all: false,
            drawlist_update_interval_ms: default_drawlist_interval(),
            drawlist_move_threshold: default_move_threshold(),
            drawlist_turn_threshold_deg: default_turn_threshold(),
            drawlist_margin_blocks: default_margin(),
            timer_update_interval: default_timer_interval(),
            smooth_lighting: true,
            enable_minimap: false,
            occlusion_culling: true,
            shadow_range: 0.0,
        }
    }
}

impl ClientMapConfig {
    /// The resident-block cap, if one is set.
    pub fn block_limit(&self) -> Option<usize> {
        usize::try_from(self.mapblock_limit).ok()
    }

    /// Pulls values the map cannot honour back into range.
    pub fn clamped(mut self) -> Self {
        let chunk = self.mesh_chunk.clamp(1, MAX_MESH_CHUNK);
        if chunk != self.mesh_chunk {
            log::warn!(target: "map", "mesh_chunk {} out of range, using {chunk}", self.mesh_chunk);
            self.mesh_chunk = chunk;
        }
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let c: Self = toml::from_str(s)?;
        Ok(c.clamped())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}
