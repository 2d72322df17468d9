use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tessera_chunk::VoxelStore;
use tessera_geom::{Sphere, Vec3};
use tessera_mesh_cpu::Face;
use tessera_world::{BlockPos, MAP_BLOCKSIZE, MeshGrid};

use crate::camera::CameraState;
use crate::config::ClientMapConfig;

/// One listed block mesh. Refers to the mesh by coordinate; `mesh_serial`
/// is the serial of the mesh that was installed when the entry was written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleEntry {
    pub pos: BlockPos,
    /// Camera to bounding-sphere centre, in nodes.
    pub distance: f32,
    pub mesh_serial: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawListParams {
    pub update_interval_ms: u64,
    pub move_threshold: f32,
    pub turn_threshold_deg: f32,
    pub margin_blocks: i16,
    pub range_all: bool,
    pub occlusion_culling: bool,
    pub shadow_range: f32,
}

impl DrawListParams {
    pub fn from_config(c: &ClientMapConfig) -> Self {
        Self {
            update_interval_ms: c.drawlist_update_interval_ms,
            move_threshold: c.drawlist_move_threshold,
            turn_threshold_deg: c.drawlist_turn_threshold_deg,
            margin_blocks: c.drawlist_margin_blocks.max(0),
            range_all: c.range_all,
            occlusion_culling: c.occlusion_culling,
            shadow_range: c.shadow_range,
        }
    }
}

impl Default for DrawListParams {
    fn default() -> Self {
        Self::from_config(&ClientMapConfig::default())
    }
}

struct Candidate {
    pos: BlockPos,
    sphere: Sphere,
    serial: u64,
}

/// Visible subset of block meshes, nearest first, plus an independent list
/// of shadow casters. Rebuilt on a timer or when the camera moves or turns
/// past a threshold, never every frame.
pub struct DistanceSortedDrawList {
    entries: RwLock<Vec<VisibleEntry>>,
    shadow: RwLock<Vec<VisibleEntry>>,
    params: DrawListParams,
    stale: bool,
    since_update_ms: f32,
    last_camera: Option<CameraState>,
    light_dir: Vec3,
    updates: u64,
}

fn sort_entries(v: &mut [VisibleEntry]) {
    v.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.pos.cmp(&b.pos)));
}

impl DistanceSortedDrawList {
    pub fn new(params: DrawListParams) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            shadow: RwLock::new(Vec::new()),
            params,
            stale: true,
            since_update_ms: 0.0,
            last_camera: None,
            light_dir: Vec3::new(0.3, -1.0, 0.2).normalized(),
            updates: 0,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<VisibleEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<VisibleEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shadow(&self) -> RwLockWriteGuard<'_, Vec<VisibleEntry>> {
        self.shadow.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn params(&self) -> DrawListParams {
        self.params
    }

    pub fn set_params(&mut self, params: DrawListParams) {
        if params != self.params {
            self.params = params;
            self.stale = true;
        }
    }

    /// Direction the directional light travels, for the shadow list.
    pub fn set_light_direction(&mut self, dir: Vec3) {
        if dir.length_sq() > 0.0 {
            self.light_dir = dir.normalized();
            self.stale = true;
        }
    }

    /// Marks the list stale; the next [`maybe_update`](Self::maybe_update)
    /// rebuilds it.
    pub fn force_update(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of rebuilds so far.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    /// Whether a rebuild is due for `cam`.
    pub fn needs_update(&self, cam: &CameraState) -> bool {
        if self.stale {
            return true;
        }
        if self.since_update_ms >= self.params.update_interval_ms as f32 {
            return true;
        }
        let Some(last) = self.last_camera else {
            return true;
        };
        last.position.distance(cam.position) > self.params.move_threshold
            || last.forward().angle_deg(cam.forward()) > self.params.turn_threshold_deg
            || last.wanted_range != cam.wanted_range
            || last.fov_deg != cam.fov_deg
    }

    /// Advances the refresh timer by `dtime` seconds and rebuilds if due.
    /// Returns true when the list was rebuilt.
    pub fn maybe_update(
        &mut self,
        dtime: f32,
        store: &mut VoxelStore,
        cam: &CameraState,
        grid: MeshGrid,
    ) -> bool {
        self.since_update_ms += dtime * 1000.0;
        if !self.needs_update(cam) {
            return false;
        }
        self.update(store, cam, grid);
        true
    }

    /// Rebuilds both lists from the store. Every resident block inside the
    /// range has its usage timer reset, meshed or not.
    pub fn update(&mut self, store: &mut VoxelStore, cam: &CameraState, grid: MeshGrid) {
        let cam_block = cam.block();
        let bs = MAP_BLOCKSIZE as f32;
        let margin = self.params.margin_blocks;
        let reach = (cam.wanted_range / bs).ceil().clamp(0.0, i16::MAX as f32) as i16;
        let r = reach.saturating_add(margin);
        let min = cam_block.offset(-r, -r, -r);
        let max = cam_block.offset(r, r, r);
        let range_limit = cam.wanted_range + f32::from(margin) * bs;

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut collect = |b: &mut tessera_chunk::MapBlock| {
            b.reset_usage_timer();
            if let Some(mesh) = b.mesh() {
                candidates.push(Candidate {
                    pos: b.pos,
                    sphere: mesh.bounding_sphere,
                    serial: mesh.serial,
                });
            }
        };
        if self.params.range_all {
            store.for_each_block_mut(&mut collect);
        } else {
            store.for_each_block_in_mut(min, max, &mut collect);
        }

        let forward = cam.forward();
        let cone_cos = cam.cone_cos();
        let cone_sin = (1.0 - cone_cos * cone_cos).max(0.0).sqrt();
        let cell_origin_of_cam = grid.cell_origin(cam_block);
        let mut visible: Vec<VisibleEntry> = Vec::new();
        let mut shadow: Vec<VisibleEntry> = Vec::new();
        let mut occluded = 0usize;
        for c in &candidates {
            let distance = c.sphere.center.distance(cam.position);
            if !self.params.range_all && distance - c.sphere.radius > range_limit {
                continue;
            }
            let entry = VisibleEntry {
                pos: c.pos,
                distance,
                mesh_serial: c.serial,
            };
            if self.params.shadow_range > 0.0 {
                let (perp, _) = c.sphere.axis_offsets(cam.position, self.light_dir);
                if perp <= self.params.shadow_range + c.sphere.radius {
                    shadow.push(entry);
                }
            }
            if c.pos != cell_origin_of_cam {
                let (perp, along) = c.sphere.axis_offsets(cam.position, forward);
                if along < -c.sphere.radius {
                    continue;
                }
                // Signed distance from the centre to the cone's surface.
                if perp * cone_cos - along * cone_sin > c.sphere.radius {
                    continue;
                }
                if self.params.occlusion_culling
                    && grid.cell_size == 1
                    && is_enclosed(store, c.pos)
                {
                    occluded += 1;
                    continue;
                }
            }
            visible.push(entry);
        }
        sort_entries(&mut visible);
        sort_entries(&mut shadow);
        log::trace!(
            target: "drawlist",
            "drawlist: {} visible, {} shadow, {} occluded, {} candidates",
            visible.len(),
            shadow.len(),
            occluded,
            candidates.len()
        );
        *self.write() = visible;
        *self.write_shadow() = shadow;

        self.stale = false;
        self.since_update_ms = 0.0;
        self.last_camera = Some(*cam);
        self.updates += 1;
    }

    /// Drops `pos` from both lists. Called before its mesh is destroyed.
    pub fn remove(&self, pos: BlockPos) -> bool {
        let mut removed = false;
        {
            let mut e = self.write();
            let before = e.len();
            e.retain(|v| v.pos != pos);
            removed |= e.len() != before;
        }
        self.write_shadow().retain(|v| v.pos != pos);
        removed
    }

    /// Points an existing entry at a newly installed mesh.
    pub fn update_serial(&self, pos: BlockPos, serial: u64) {
        for v in self.write().iter_mut().filter(|v| v.pos == pos) {
            v.mesh_serial = serial;
        }
        let mut s = self.write_shadow();
        for v in s.iter_mut().filter(|v| v.pos == pos) {
            v.mesh_serial = serial;
        }
    }

    pub fn clear(&mut self) {
        self.write().clear();
        self.write_shadow().clear();
        self.stale = true;
    }

    /// Snapshot of the visible list, nearest first.
    pub fn entries(&self) -> Vec<VisibleEntry> {
        self.read().clone()
    }

    pub fn shadow_entries(&self) -> Vec<VisibleEntry> {
        self.shadow
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls `f` for each visible entry under the shared lock.
    pub fn visit(&self, mut f: impl FnMut(&VisibleEntry)) {
        for v in self.read().iter() {
            f(v);
        }
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.read().iter().any(|v| v.pos == pos)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// True when all six neighbours are resident and each shows a solid face
/// toward `pos`.
fn is_enclosed(store: &VoxelStore, pos: BlockPos) -> bool {
    Face::ALL.iter().all(|&f| {
        let (dx, dy, dz) = f.delta();
        let n = pos.offset(dx as i16, dy as i16, dz as i16);
        store
            .get_block(n)
            .is_some_and(|b| b.solid_sides & f.opposite().bit() != 0)
    })
}
