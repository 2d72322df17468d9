use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tessera_chunk::VoxelStore;
use tessera_geom::{Aabb, Vec3};
use tessera_mesh_cpu::{
    CompiledBlockMesh, FaceCullingMesher, MeshCompiler, MeshMakeData, SOLID_ALL, cell_bbox,
};
use tessera_runtime::{MeshUpdateConfig, MeshUpdateManager, MeshUpdateResult};
use tessera_world::{
    BlockPos, DrawType, MapNode, MeshGrid, NODES_PER_BLOCK, NodeDef, NodeDefManager,
};

const STONE: u16 = 1;

fn defs() -> Arc<NodeDefManager> {
    let mut d = NodeDefManager::with_builtins();
    d.register(NodeDef {
        name: "stone".into(),
        content: STONE,
        drawtype: DrawType::Normal,
        material: None,
    });
    Arc::new(d)
}

fn manager(config: MeshUpdateConfig) -> MeshUpdateManager {
    MeshUpdateManager::new(Arc::new(FaceCullingMesher::new(defs())), config).unwrap()
}

fn wait_result(m: &mut MeshUpdateManager) -> MeshUpdateResult {
    let start = Instant::now();
    loop {
        if let Some(r) = m.next_result() {
            return r;
        }
        assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for mesh");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn solid(store: &mut VoxelStore, p: BlockPos) {
    store.insert_block_data(p, vec![MapNode::new(STONE); NODES_PER_BLOCK]);
}

#[test]
fn lone_solid_block_meshes_empty_and_reports_solid_sides() {
    let mut store = VoxelStore::new();
    let p = BlockPos::new(0, 0, 0);
    solid(&mut store, p);
    let mut m = manager(MeshUpdateConfig::default());
    assert!(m.update_block(p, true, false, true));
    assert_eq!(m.dispatch(&store), 1);
    assert_eq!(m.inflight_len(), 1);
    let r = wait_result(&mut m);
    assert_eq!(r.pos, p);
    assert_eq!(r.acks, vec![p]);
    assert!(r.mesh.is_empty());
    assert_eq!(r.solid_sides, vec![(p, SOLID_ALL)]);
    assert_eq!(m.inflight_len(), 0);
}

#[test]
fn requests_for_a_cell_share_one_job() {
    let mut m = manager(MeshUpdateConfig {
        grid: MeshGrid::new(2),
        ..MeshUpdateConfig::default()
    });
    assert!(m.update_block(BlockPos::new(0, 0, 0), false, false, false));
    assert!(!m.update_block(BlockPos::new(1, 1, 0), false, true, false));
    assert_eq!(m.pending_len(), 1);
    let job = m.pending_job(BlockPos::new(1, 0, 1)).copied().unwrap();
    assert_eq!(job.pos, BlockPos::new(0, 0, 0));
    assert!(job.urgent);
}

#[test]
fn include_edges_queues_loaded_neighbors_without_ack() {
    let mut store = VoxelStore::new();
    let p = BlockPos::new(0, 0, 0);
    solid(&mut store, p);
    solid(&mut store, BlockPos::new(1, 0, 0));
    solid(&mut store, BlockPos::new(0, -1, 0));
    let mut m = manager(MeshUpdateConfig::default());
    m.update_block(p, true, true, true);
    let sent = m.dispatch(&store);
    assert_eq!(sent, 3);
    let mut seen = Vec::new();
    for _ in 0..3 {
        let r = wait_result(&mut m);
        seen.push((r.pos, !r.acks.is_empty()));
    }
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (BlockPos::new(0, -1, 0), false),
            (BlockPos::new(0, 0, 0), true),
            (BlockPos::new(1, 0, 0), false),
        ]
    );
}

#[test]
fn unloaded_cells_are_dropped_at_dispatch() {
    let store = VoxelStore::new();
    let mut m = manager(MeshUpdateConfig::default());
    m.update_block(BlockPos::new(4, 4, 4), false, false, false);
    assert_eq!(m.dispatch(&store), 0);
    assert_eq!(m.pending_len(), 0);
}

/// Compiler that counts calls and parks until released.
struct GateCompiler {
    defs: NodeDefManager,
    calls: AtomicUsize,
    release: crossbeam_channel::Receiver<()>,
}

impl MeshCompiler for GateCompiler {
    fn node_defs(&self) -> &NodeDefManager {
        &self.defs
    }

    fn compile(&self, data: &MeshMakeData) -> CompiledBlockMesh {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.release.recv_timeout(Duration::from_secs(5));
        CompiledBlockMesh::empty(data.origin, cell_bbox(data))
    }
}

#[test]
fn rebuild_of_inflight_cell_waits_for_drain() {
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let compiler = Arc::new(GateCompiler {
        defs: NodeDefManager::with_builtins(),
        calls: AtomicUsize::new(0),
        release: release_rx,
    });
    let mut m = MeshUpdateManager::new(compiler.clone(), MeshUpdateConfig::default()).unwrap();
    let mut store = VoxelStore::new();
    let p = BlockPos::new(0, 0, 0);
    solid(&mut store, p);

    m.update_block(p, false, false, false);
    assert_eq!(m.dispatch(&store), 1);
    m.update_block(p, true, true, false);
    assert_eq!(m.dispatch(&store), 0);
    assert_eq!(m.pending_len(), 1);

    release_tx.send(()).unwrap();
    let first = wait_result(&mut m);
    assert!(first.acks.is_empty());
    assert_eq!(m.dispatch(&store), 1);
    release_tx.send(()).unwrap();
    let second = wait_result(&mut m);
    assert_eq!(second.acks, vec![p]);
    assert!(second.urgent);
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
}

fn gated_manager(config: MeshUpdateConfig) -> (MeshUpdateManager, crossbeam_channel::Sender<()>) {
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let compiler = Arc::new(GateCompiler {
        defs: NodeDefManager::with_builtins(),
        calls: AtomicUsize::new(0),
        release: release_rx,
    });
    (
        MeshUpdateManager::new(compiler, config).unwrap(),
        release_tx,
    )
}

#[test]
fn cancelled_inflight_origin_comes_back_stale_without_acks() {
    let (mut m, release) = gated_manager(MeshUpdateConfig::default());
    let mut store = VoxelStore::new();
    let p = BlockPos::new(0, 0, 0);
    solid(&mut store, p);

    m.update_block(p, true, false, false);
    assert_eq!(m.dispatch(&store), 1);
    // Evicted while building, then delivered again.
    assert!(!m.cancel(p));
    assert!(m.update_block(p, true, false, false));
    assert_eq!(m.dispatch(&store), 0);

    release.send(()).unwrap();
    let old = wait_result(&mut m);
    assert!(old.stale);
    assert!(old.acks.is_empty());

    assert_eq!(m.dispatch(&store), 1);
    release.send(()).unwrap();
    let fresh = wait_result(&mut m);
    assert!(!fresh.stale);
    assert_eq!(fresh.acks, vec![p]);
}

#[test]
fn cancelling_one_cell_block_keeps_the_others_acks() {
    let (mut m, release_tx) = gated_manager(MeshUpdateConfig {
        grid: MeshGrid::new(2),
        ..MeshUpdateConfig::default()
    });
    let mut store = VoxelStore::new();
    let (o, q) = (BlockPos::new(0, 0, 0), BlockPos::new(1, 0, 0));
    solid(&mut store, o);
    solid(&mut store, q);
    m.update_block(o, true, false, false);
    m.update_block(q, true, false, false);
    assert_eq!(m.dispatch(&store), 1);
    m.cancel(q);
    release_tx.send(()).unwrap();
    let r = wait_result(&mut m);
    assert!(!r.stale);
    assert_eq!(r.acks, vec![o]);
}

#[test]
fn stop_discards_results_and_rejects_work() {
    let mut store = VoxelStore::new();
    let p = BlockPos::new(0, 0, 0);
    solid(&mut store, p);
    let mut m = manager(MeshUpdateConfig::default());
    m.update_block(p, true, false, false);
    m.dispatch(&store);
    m.update_block(BlockPos::new(1, 0, 0), false, false, false);
    m.wait();
    assert!(m.is_stopped());
    assert!(m.next_result().is_none());
    assert_eq!(m.pending_len(), 0);
    assert_eq!(m.inflight_len(), 0);
    assert!(!m.update_block(p, false, false, false));
    assert_eq!(m.dispatch(&store), 0);
}

#[test]
fn empty_mesh_bbox_covers_the_cell() {
    let mut store = VoxelStore::new();
    let p = BlockPos::new(2, -1, 0);
    solid(&mut store, p);
    let mut m = manager(MeshUpdateConfig::default());
    m.update_block(p, false, false, false);
    m.dispatch(&store);
    let r = wait_result(&mut m);
    let want = Aabb::new(Vec3::new(32.0, -16.0, 0.0), Vec3::new(48.0, 0.0, 16.0));
    assert_eq!(r.mesh.bbox.min, want.min);
    assert_eq!(r.mesh.bbox.max, want.max);
}
