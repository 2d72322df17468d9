//! Mesh job queue and worker orchestration (engine-only, no GPU types).
#![forbid(unsafe_code)]

mod pending;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use hashbrown::{HashMap, HashSet};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tessera_chunk::VoxelStore;
use tessera_mesh_cpu::{CompiledBlockMesh, MeshCompiler, MeshMakeData, solid_sides};
use tessera_world::{BlockPos, MeshGrid};

pub use pending::{PendingJob, PendingQueue};
pub use rayon::ThreadPoolBuildError;

/// Fixed-for-lifetime parameters of a [`MeshUpdateManager`].
#[derive(Clone, Copy, Debug)]
pub struct MeshUpdateConfig {
    pub grid: MeshGrid,
    /// Worker threads; 0 picks one less than the available parallelism.
    pub threads: usize,
    /// Capacity of the job channel.
    pub queue_capacity: usize,
    pub smooth_lighting: bool,
    pub enable_minimap: bool,
}

impl Default for MeshUpdateConfig {
    fn default() -> Self {
        Self {
            grid: MeshGrid::default(),
            threads: 1,
            queue_capacity: 64,
            smooth_lighting: true,
            enable_minimap: false,
        }
    }
}

struct MeshJob {
    data: MeshMakeData,
    acks: Vec<BlockPos>,
    urgent: bool,
}

/// A compiled mesh on its way back to the main thread.
pub struct MeshUpdateResult {
    /// Cell origin the mesh belongs to.
    pub pos: BlockPos,
    pub mesh: Box<CompiledBlockMesh>,
    /// Solid-face masks for every block of the cell.
    pub solid_sides: Vec<(BlockPos, u8)>,
    /// Delivered blocks to acknowledge to the server once this is drained.
    pub acks: Vec<BlockPos>,
    pub urgent: bool,
    /// The cell origin was cancelled while this was building; the mesh
    /// reflects data that is gone and must not be installed.
    pub stale: bool,
    pub build_ms: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshQueueStats {
    pub pending: usize,
    pub inflight: usize,
    pub workers: usize,
}

fn process_mesh_job(job: MeshJob, compiler: &dyn MeshCompiler) -> MeshUpdateResult {
    let t0 = Instant::now();
    let mesh = compiler.compile(&job.data);
    let sides = solid_sides(&job.data, compiler.node_defs());
    MeshUpdateResult {
        pos: job.data.origin,
        mesh: Box::new(mesh),
        solid_sides: sides,
        acks: job.acks,
        urgent: job.urgent,
        stale: false,
        build_ms: t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32,
    }
}

/// Owns the pending-job set and the worker pool. All methods are called
/// from the main thread; workers only ever see immutable snapshots.
pub struct MeshUpdateManager {
    config: MeshUpdateConfig,
    pending: PendingQueue,
    /// Blocks waiting to be acknowledged, keyed by the cell they mesh in.
    ack_lists: HashMap<BlockPos, Vec<BlockPos>>,
    /// Coordinates handed to a worker whose result has not been drained yet.
    inflight: HashSet<BlockPos>,
    /// Blocks cancelled while their cell was in flight, keyed by cell origin.
    cancelled: HashMap<BlockPos, HashSet<BlockPos>>,
    max_inflight: usize,
    job_tx: Option<Sender<MeshJob>>,
    res_rx: Receiver<MeshUpdateResult>,
    done_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
    workers: usize,
    exited: usize,
    _pool: ThreadPool,
}

impl MeshUpdateManager {
    pub fn new(
        compiler: Arc<dyn MeshCompiler>,
        config: MeshUpdateConfig,
    ) -> Result<Self, ThreadPoolBuildError> {
        let workers = if config.threads == 0 {
            thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        } else {
            config.threads
        };
        let queue_capacity = config.queue_capacity.max(1);
        let max_inflight = queue_capacity + workers;
        let (job_tx, job_rx) = bounded::<MeshJob>(queue_capacity);
        // Sized so a worker never blocks posting a result.
        let (res_tx, res_rx) = bounded::<MeshUpdateResult>(max_inflight);
        let (done_tx, done_rx) = bounded::<()>(workers);
        let stopped = Arc::new(AtomicBool::new(false));

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tessera-mesh-{i}"))
            .build()?;
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let done = done_tx.clone();
            let compiler = compiler.clone();
            let stopped = stopped.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    if stopped.load(Ordering::Acquire) {
                        continue;
                    }
                    let out = process_mesh_job(job, compiler.as_ref());
                    if stopped.load(Ordering::Acquire) {
                        continue;
                    }
                    if tx.send(out).is_err() {
                        break;
                    }
                }
                let _ = done.send(());
            });
        }
        log::info!(
            target: "mesh",
            "mesh update manager: {} worker(s), queue {}, cell {}",
            workers,
            queue_capacity,
            config.grid.cell_size
        );

        Ok(Self {
            config,
            pending: PendingQueue::new(),
            ack_lists: HashMap::new(),
            inflight: HashSet::new(),
            cancelled: HashMap::new(),
            max_inflight,
            job_tx: Some(job_tx),
            res_rx,
            done_rx,
            stopped,
            workers,
            exited: 0,
            _pool: pool,
        })
    }

    #[inline]
    pub fn grid(&self) -> MeshGrid {
        self.config.grid
    }

    /// Requests a (re)build of the cell containing `pos`. Never blocks.
    /// With `ack`, `pos` itself is reported back in the result's `acks`.
    /// Returns true when a new job was created rather than merged.
    pub fn update_block(&mut self, pos: BlockPos, ack: bool, urgent: bool, include_edges: bool) -> bool {
        if self.is_stopped() {
            return false;
        }
        let origin = self.config.grid.cell_origin(pos);
        if ack {
            let list = self.ack_lists.entry(origin).or_default();
            if !list.contains(&pos) {
                list.push(pos);
            }
        }
        self.pending.push(origin, ack, urgent, include_edges)
    }

    /// Snapshots pending jobs and hands them to the workers until the job
    /// channel is full or nothing is ready. Jobs whose cell is already being
    /// built wait for that result to be drained. Returns the number sent.
    pub fn dispatch(&mut self, store: &VoxelStore) -> usize {
        let Some(tx) = self.job_tx.clone() else {
            return 0;
        };
        let grid = self.config.grid;
        let mut sent = 0;
        while !tx.is_full() && self.inflight.len() < self.max_inflight {
            let inflight = &self.inflight;
            let Some(job) = self.pending.pop_ready(|p| inflight.contains(&p)) else {
                break;
            };
            if !grid.cell_blocks(job.pos).any(|b| store.contains(b)) {
                log::debug!(target: "mesh", "dropping job for unloaded cell {:?}", job.pos);
                self.ack_lists.remove(&job.pos);
                continue;
            }
            if job.include_edges {
                for n in grid.cell_blocks(job.pos).flat_map(BlockPos::face_neighbors) {
                    let origin = grid.cell_origin(n);
                    if origin != job.pos && store.contains(origin) {
                        self.pending.push(origin, false, job.urgent, false);
                    }
                }
            }
            let data = store.make_mesh_data(
                job.pos,
                grid,
                self.config.smooth_lighting,
                self.config.enable_minimap,
            );
            let msg = MeshJob {
                data,
                acks: self.ack_lists.remove(&job.pos).unwrap_or_default(),
                urgent: job.urgent,
            };
            match tx.try_send(msg) {
                Ok(()) => {
                    self.inflight.insert(job.pos);
                    sent += 1;
                }
                Err(TrySendError::Full(msg)) => {
                    if !msg.acks.is_empty() {
                        self.ack_lists.entry(job.pos).or_default().extend(msg.acks);
                    }
                    self.pending.requeue(job);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::warn!(target: "mesh", "mesh workers are gone, job {:?} dropped", job.pos);
                    break;
                }
            }
        }
        sent
    }

    /// Next finished mesh, if any. Never blocks; returns nothing once stopped.
    pub fn next_result(&mut self) -> Option<MeshUpdateResult> {
        if self.is_stopped() {
            return None;
        }
        let mut r = self.res_rx.try_recv().ok()?;
        self.inflight.remove(&r.pos);
        if let Some(gone) = self.cancelled.remove(&r.pos) {
            r.acks.retain(|b| !gone.contains(b));
            r.stale = gone.contains(&r.pos);
        }
        Some(r)
    }

    /// Forgets `pos` as a delivered block. Its pending ack is dropped, and a
    /// build of its cell already in flight will not acknowledge it. When
    /// `pos` is the cell origin, the in-flight result comes back `stale` and
    /// the pending job is dropped unless other blocks still wait for an ack.
    /// Returns true when a pending job was removed.
    pub fn cancel(&mut self, pos: BlockPos) -> bool {
        let origin = self.config.grid.cell_origin(pos);
        let mut acks_left = false;
        if let Some(list) = self.ack_lists.get_mut(&origin) {
            list.retain(|&b| b != pos);
            acks_left = !list.is_empty();
            if !acks_left {
                self.ack_lists.remove(&origin);
            }
        }
        if self.inflight.contains(&origin) {
            self.cancelled.entry(origin).or_default().insert(pos);
        }
        if pos == origin && !acks_left {
            self.pending.remove(origin).is_some()
        } else {
            false
        }
    }

    #[inline]
    pub fn is_pending(&self, pos: BlockPos) -> bool {
        self.pending.contains(self.config.grid.cell_origin(pos))
    }

    #[inline]
    pub fn pending_job(&self, pos: BlockPos) -> Option<&PendingJob> {
        self.pending.get(self.config.grid.cell_origin(pos))
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stats(&self) -> MeshQueueStats {
        MeshQueueStats {
            pending: self.pending.len(),
            inflight: self.inflight.len(),
            workers: self.workers,
        }
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stops accepting work. Jobs already handed out finish, but their
    /// results are discarded.
    pub fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.job_tx = None;
        self.pending.clear();
        self.ack_lists.clear();
        self.cancelled.clear();
        log::debug!(target: "mesh", "mesh update manager stopping, {} in flight", self.inflight.len());
    }

    /// Blocks until every worker has exited, discarding their results.
    /// Implies [`stop`](Self::stop).
    pub fn wait(&mut self) {
        self.stop();
        while self.exited < self.workers {
            select! {
                recv(self.done_rx) -> res => match res {
                    Ok(()) => self.exited += 1,
                    Err(_) => self.exited = self.workers,
                },
                recv(self.res_rx) -> _ => {}
            }
        }
        while self.res_rx.try_recv().is_ok() {}
        self.inflight.clear();
    }
}

impl Drop for MeshUpdateManager {
    fn drop(&mut self) {
        self.wait();
    }
}
