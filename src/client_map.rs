use std::sync::Arc;

use tessera_chunk::{VoxelStore, blocks_affected_by_node};
use tessera_mesh_cpu::{CompiledBlockMesh, FaceCullingMesher, MeshCompiler};
use tessera_objects::{ActiveObject, ActiveObjectRegistry, BlockChange, ObjectId, ObjectMessage};
use tessera_runtime::{MeshUpdateConfig, MeshUpdateManager, MeshUpdateResult, ThreadPoolBuildError};
use tessera_world::{BlockPos, InvalidPosition, MapNode, MeshGrid, NodeDefManager, NodePos};

use crate::ack::{AckQueue, OutboundMessage};
use crate::camera::CameraState;
use crate::config::ClientMapConfig;
use crate::drawlist::{DistanceSortedDrawList, DrawListParams, VisibleEntry};

#[derive(Debug, thiserror::Error)]
pub enum ClientMapError {
    #[error("failed to start mesh workers: {0}")]
    Workers(#[from] ThreadPoolBuildError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientMapStats {
    pub blocks: usize,
    pub sectors: usize,
    pub meshes: usize,
    pub pending_jobs: usize,
    pub inflight_jobs: usize,
    pub visible: usize,
    pub shadow_visible: usize,
    pub objects: usize,
    pub installed_total: u64,
    pub evicted_total: u64,
}

/// Client-side map orchestrator. Owns the block store, the mesh workers, the
/// draw list and the active objects, and is driven by one [`step`] per frame.
///
/// [`step`]: ClientMap::step
pub struct ClientMap {
    config: ClientMapConfig,
    grid: MeshGrid,
    store: VoxelStore,
    mesher: MeshUpdateManager,
    drawlist: DistanceSortedDrawList,
    objects: ActiveObjectRegistry,
    camera: CameraState,
    acks: AckQueue,
    outbound: Vec<OutboundMessage>,
    timer_accum: f32,
    evicted: Vec<BlockPos>,
    installed_total: u64,
    evicted_total: u64,
}

impl ClientMap {
    pub fn new(config: ClientMapConfig, compiler: Arc<dyn MeshCompiler>) -> Result<Self, ClientMapError> {
        let config = config.clamped();
        let grid = MeshGrid::new(config.mesh_chunk);
        let mesher = MeshUpdateManager::new(
            compiler,
            MeshUpdateConfig {
                grid,
                threads: config.mesh_generation_threads,
                queue_capacity: config.mesh_queue_capacity,
                smooth_lighting: config.smooth_lighting,
                enable_minimap: config.enable_minimap,
            },
        )?;
        let drawlist = DistanceSortedDrawList::new(DrawListParams::from_config(&config));
        let camera = CameraState::new(tessera_geom::Vec3::ZERO, config.viewing_range);
        log::info!(
            target: "map",
            "client map: mesh_chunk={} unload_timeout={}s mapblock_limit={}",
            grid.cell_size,
            config.unload_unused_data_timeout,
            config.mapblock_limit
        );
        Ok(Self {
            config,
            grid,
            store: VoxelStore::new(),
            mesher,
            drawlist,
            objects: ActiveObjectRegistry::new(),
            camera,
            acks: AckQueue::new(),
            outbound: Vec::new(),
            timer_accum: 0.0,
            evicted: Vec::new(),
            installed_total: 0,
            evicted_total: 0,
        })
    }

    /// Builds a map meshed by the default face-culling mesher.
    pub fn with_node_defs(config: ClientMapConfig, defs: Arc<NodeDefManager>) -> Result<Self, ClientMapError> {
        Self::new(config, Arc::new(FaceCullingMesher::new(defs)))
    }

    // --- inbound network events ---

    /// A full block arrived from the server. Replaces its nodes and queues a
    /// mesh job for it and its loaded neighbours; the block is acknowledged
    /// once its mesh is installed. Returns false if the position is outside
    /// the map and the block was dropped.
    pub fn add_block(&mut self, pos: BlockPos, nodes: Vec<MapNode>) -> bool {
        let checked: Result<BlockPos, InvalidPosition> =
            BlockPos::try_new(i32::from(pos.x), i32::from(pos.y), i32::from(pos.z));
        let pos = match checked {
            Ok(p) => p,
            Err(e) => {
                log::warn!(target: "map", "dropping block data: {e}");
                return false;
            }
        };
        self.store.insert_block_data(pos, nodes);
        self.mesher.update_block(pos, true, false, true);
        true
    }

    /// Writes one node and queues urgent rebuilds for its block and for each
    /// loaded neighbour across a block face the node touches. Edits outside
    /// the map or into unloaded blocks are logged and dropped.
    pub fn add_node(&mut self, p: NodePos, node: MapNode) {
        match self.store.set_node(p, node) {
            Ok(_) => {
                for b in blocks_affected_by_node(p) {
                    if self.store.contains(b) {
                        self.mesher.update_block(b, false, true, false);
                    }
                }
            }
            Err(e) => log::debug!(target: "map", "node edit at {p:?} dropped: {e}"),
        }
    }

    pub fn remove_node(&mut self, p: NodePos) {
        self.add_node(p, MapNode::AIR);
    }

    pub fn get_node(&self, p: NodePos) -> Option<MapNode> {
        self.store.get_node(p)
    }

    // --- active objects ---

    pub fn add_active_object(&mut self, id: Option<ObjectId>, obj: ActiveObject) -> Option<ObjectId> {
        let id = self.objects.register_object(id, obj)?;
        if let Some(block) = self.objects.block_of_object(id) {
            self.apply_block_change(BlockChange {
                id,
                from: None,
                to: Some(block),
            });
        }
        Some(id)
    }

    pub fn remove_active_object(&mut self, id: ObjectId) -> Option<ActiveObject> {
        let (obj, change) = self.objects.remove_object(id)?;
        self.apply_block_change(change);
        Some(obj)
    }

    pub fn process_active_object_message(&mut self, id: ObjectId, msg: ObjectMessage) {
        if let Some(change) = self.objects.process_message(id, msg) {
            self.apply_block_change(change);
        }
    }

    /// Moves an object id between the object sets of the meshes it left and
    /// entered. Misses are fine; the set is only a batching hint.
    fn apply_block_change(&mut self, change: BlockChange) {
        if let Some(from) = change.from {
            let origin = self.grid.cell_origin(from);
            if let Some(mesh) = self.store.get_block_mut(origin).and_then(|b| b.mesh_mut()) {
                mesh.objects.remove(&change.id);
            }
        }
        if let Some(to) = change.to {
            let origin = self.grid.cell_origin(to);
            if let Some(mesh) = self.store.get_block_mut(origin).and_then(|b| b.mesh_mut()) {
                mesh.objects.insert(change.id);
            }
        }
    }

    // --- per-frame ---

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }

    /// Runs one frame of map upkeep. Call exactly once per frame.
    pub fn step(&mut self, dtime: f32) {
        self.mesher.dispatch(&self.store);
        self.drain_mesh_results();

        self.timer_accum += dtime;
        if self.timer_accum >= self.config.timer_update_interval {
            let elapsed = self.timer_accum;
            self.timer_accum = 0.0;
            self.run_eviction(elapsed);
        }

        self.drawlist
            .maybe_update(dtime, &mut self.store, &self.camera, self.grid);

        let changes = self.objects.step(dtime, |_| {});
        for change in changes {
            self.apply_block_change(change);
        }

        self.acks.flush(&mut self.outbound);
    }

    fn drain_mesh_results(&mut self) -> usize {
        let budget = match self.config.max_mesh_results_per_step {
            0 => usize::MAX,
            n => n,
        };
        let mut installed = 0;
        while installed < budget {
            let Some(result) = self.mesher.next_result() else {
                break;
            };
            self.install_result(result);
            installed += 1;
        }
        if installed > 0 {
            log::trace!(target: "mesh", "installed {installed} mesh(es)");
        }
        installed
    }

    fn install_result(&mut self, result: MeshUpdateResult) {
        let MeshUpdateResult {
            pos,
            mut mesh,
            solid_sides,
            acks,
            stale,
            build_ms,
            ..
        } = result;
        // Cancelled blocks were already dropped from `acks`; the rest are
        // acknowledged whether or not the mesh lands.
        let acks: Vec<BlockPos> = acks.into_iter().filter(|&a| self.store.contains(a)).collect();
        if stale {
            log::debug!(target: "mesh", "dropping stale mesh for {pos:?}");
            for a in acks {
                self.acks.push_got(a);
            }
            return;
        }
        for (b, sides) in solid_sides {
            if let Some(block) = self.store.get_block_mut(b) {
                block.solid_sides = sides;
            }
        }
        for b in self.grid.cell_blocks(pos) {
            mesh.objects.extend(self.objects.objects_in_block(b));
        }
        match self.store.install_mesh(pos, mesh) {
            Ok(serial) => {
                self.drawlist.update_serial(pos, serial);
                self.installed_total += 1;
                log::trace!(target: "mesh", "mesh {serial} for {pos:?} built in {build_ms}ms");
            }
            Err(_) => {
                log::debug!(target: "mesh", "discarding mesh for unloaded block {pos:?}");
            }
        }
        for a in acks {
            self.acks.push_got(a);
        }
    }

    fn run_eviction(&mut self, elapsed: f32) {
        self.evicted.clear();
        let stats = self.store.timer_update(
            elapsed,
            self.config.unload_unused_data_timeout,
            self.config.block_limit(),
            &mut self.evicted,
        );
        if self.evicted.is_empty() {
            return;
        }
        let evicted = std::mem::take(&mut self.evicted);
        let mut visible_evicted = 0usize;
        for &p in &evicted {
            if self.drawlist.remove(p) {
                visible_evicted += 1;
            }
            self.acks.push_deleted(p);
            self.mesher.cancel(p);
            let origin = self.grid.cell_origin(p);
            if origin != p && self.store.contains(origin) {
                // The cell mesh still shows the evicted block.
                self.mesher.update_block(origin, false, false, false);
            }
        }
        self.evicted_total += evicted.len() as u64;
        if stats.over_limit > 0 {
            log::warn!(
                target: "map",
                "mapblock_limit {} exceeded: evicted {} block(s), {} of them visible",
                self.config.mapblock_limit,
                stats.over_limit,
                visible_evicted
            );
        }
        log::debug!(
            target: "map",
            "evicted {} block(s) ({} timed out, {} over limit)",
            evicted.len(),
            stats.timed_out,
            stats.over_limit
        );
        self.evicted = evicted;
    }

    // --- consumers ---

    /// Hands every listed mesh to `f`, nearest first.
    pub fn for_each_visible(&self, mut f: impl FnMut(&VisibleEntry, &CompiledBlockMesh)) {
        self.drawlist.visit(|e| {
            if let Some(mesh) = self.store.get_block(e.pos).and_then(|b| b.mesh()) {
                f(e, mesh);
            }
        });
    }

    /// Ack messages produced by the steps since the last call.
    pub fn take_outbound_messages(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbound)
    }

    pub fn stats(&self) -> ClientMapStats {
        let q = self.mesher.stats();
        ClientMapStats {
            blocks: self.store.len(),
            sectors: self.store.sector_count(),
            meshes: self.store.mesh_count(),
            pending_jobs: q.pending,
            inflight_jobs: q.inflight,
            visible: self.drawlist.len(),
            shadow_visible: self.drawlist.shadow_entries().len(),
            objects: self.objects.len(),
            installed_total: self.installed_total,
            evicted_total: self.evicted_total,
        }
    }

    /// Applies the runtime-adjustable part of `new`. Mesh-grid size, worker
    /// count, queue size and mesh flags stay as constructed.
    pub fn apply_config(&mut self, new: ClientMapConfig) {
        let fixed = (
            new.mesh_chunk,
            new.mesh_generation_threads,
            new.mesh_queue_capacity,
            new.smooth_lighting,
            new.enable_minimap,
        );
        let current = (
            self.config.mesh_chunk,
            self.config.mesh_generation_threads,
            self.config.mesh_queue_capacity,
            self.config.smooth_lighting,
            self.config.enable_minimap,
        );
        if fixed != current {
            log::warn!(target: "map", "mesh settings only take effect on a new map; keeping {current:?}");
        }
        let mut merged = new;
        merged.mesh_chunk = self.config.mesh_chunk;
        merged.mesh_generation_threads = self.config.mesh_generation_threads;
        merged.mesh_queue_capacity = self.config.mesh_queue_capacity;
        merged.smooth_lighting = self.config.smooth_lighting;
        merged.enable_minimap = self.config.enable_minimap;

        self.drawlist.set_params(DrawListParams::from_config(&merged));
        self.camera.wanted_range = merged.viewing_range;
        self.config = merged;
    }

    /// Stops the mesh workers; results still in flight are discarded.
    pub fn shutdown(&mut self) {
        self.mesher.wait();
    }

    pub fn config(&self) -> &ClientMapConfig {
        &self.config
    }

    pub fn grid(&self) -> MeshGrid {
        self.grid
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn store(&self) -> &VoxelStore {
        &self.store
    }

    pub fn objects(&self) -> &ActiveObjectRegistry {
        &self.objects
    }

    pub fn drawlist(&self) -> &DistanceSortedDrawList {
        &self.drawlist
    }

    pub fn drawlist_mut(&mut self) -> &mut DistanceSortedDrawList {
        &mut self.drawlist
    }

    pub fn mesher(&self) -> &MeshUpdateManager {
        &self.mesher
    }
}
