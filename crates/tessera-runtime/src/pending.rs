use std::collections::VecDeque;

use hashbrown::HashMap;
use tessera_world::BlockPos;

/// A requested mesh build, keyed by the cell origin it rebuilds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingJob {
    pub pos: BlockPos,
    /// Acknowledge the block to the server once the result is installed.
    pub ack: bool,
    pub urgent: bool,
    /// Also queue loaded face neighbours when this job is dispatched.
    pub include_edges: bool,
    seq: u64,
}

/// At most one job per coordinate. Urgent jobs pop first, the rest in
/// request order.
#[derive(Debug, Default)]
pub struct PendingQueue {
    jobs: HashMap<BlockPos, PendingJob>,
    // (seq, pos); an entry is live only while it matches the stored job.
    urgent: VecDeque<(u64, BlockPos)>,
    normal: VecDeque<(u64, BlockPos)>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a job or merges into the one already pending for `pos`.
    /// Returns true when a new job was created.
    pub fn push(&mut self, pos: BlockPos, ack: bool, urgent: bool, include_edges: bool) -> bool {
        if let Some(job) = self.jobs.get_mut(&pos) {
            job.ack |= ack;
            job.include_edges |= include_edges;
            if urgent && !job.urgent {
                job.urgent = true;
                self.urgent.push_back((job.seq, pos));
            }
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.jobs.insert(
            pos,
            PendingJob {
                pos,
                ack,
                urgent,
                include_edges,
                seq,
            },
        );
        if urgent {
            self.urgent.push_back((seq, pos));
        } else {
            self.normal.push_back((seq, pos));
        }
        true
    }

    /// Puts a popped job back, keeping its flags and its place in line.
    pub fn requeue(&mut self, job: PendingJob) {
        if self.jobs.contains_key(&job.pos) {
            // A newer request arrived meanwhile; fold the old flags in.
            self.push(job.pos, job.ack, job.urgent, job.include_edges);
            return;
        }
        self.jobs.insert(job.pos, job);
        let lane = if job.urgent {
            &mut self.urgent
        } else {
            &mut self.normal
        };
        let at = lane.partition_point(|&(s, _)| s < job.seq);
        lane.insert(at, (job.seq, job.pos));
    }

    fn is_live(&self, seq: u64, pos: BlockPos, urgent: bool) -> bool {
        self.jobs
            .get(&pos)
            .is_some_and(|j| j.seq == seq && j.urgent == urgent)
    }

    /// Removes and returns the next job for which `blocked` is false.
    /// Blocked jobs keep their position.
    pub fn pop_ready<F>(&mut self, blocked: F) -> Option<PendingJob>
    where
        F: Fn(BlockPos) -> bool,
    {
        for urgent in [true, false] {
            let mut i = 0;
            loop {
                let lane = if urgent { &self.urgent } else { &self.normal };
                let Some(&(seq, pos)) = lane.get(i) else {
                    break;
                };
                if !self.is_live(seq, pos, urgent) {
                    let lane = if urgent {
                        &mut self.urgent
                    } else {
                        &mut self.normal
                    };
                    lane.remove(i);
                    continue;
                }
                if blocked(pos) {
                    i += 1;
                    continue;
                }
                let lane = if urgent {
                    &mut self.urgent
                } else {
                    &mut self.normal
                };
                lane.remove(i);
                return self.jobs.remove(&pos);
            }
        }
        None
    }

    pub fn remove(&mut self, pos: BlockPos) -> Option<PendingJob> {
        self.jobs.remove(&pos)
    }

    #[inline]
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.jobs.contains_key(&pos)
    }

    #[inline]
    pub fn get(&self, pos: BlockPos) -> Option<&PendingJob> {
        self.jobs.get(&pos)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
        self.urgent.clear();
        self.normal.clear();
    }
}
