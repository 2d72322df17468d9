//! Headless stand-in for a server: generates heightmap terrain blocks around
//! a point, feeds them to a [`ClientMap`], and consumes its acks.

use hashbrown::HashSet;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use tessera_world::{
    BlockPos, CONTENT_AIR, DrawType, MAP_BLOCKSIZE, MapNode, NODES_PER_BLOCK, NodeDef, NodeDefManager,
    NodePos,
};

use crate::ack::OutboundMessage;
use crate::client_map::ClientMap;

pub const STONE: u16 = 1;
pub const DIRT: u16 = 2;
pub const GRASS: u16 = 3;
pub const SAND: u16 = 4;
pub const WATER: u16 = 5;
pub const GLASS: u16 = 6;

const SEA_LEVEL: i32 = 0;

/// Node definitions for the generated terrain.
pub fn terrain_node_defs() -> NodeDefManager {
    let mut d = NodeDefManager::with_builtins();
    for (name, content, drawtype) in [
        ("stone", STONE, DrawType::Normal),
        ("dirt", DIRT, DrawType::Normal),
        ("grass", GRASS, DrawType::Normal),
        ("sand", SAND, DrawType::Normal),
        ("water", WATER, DrawType::Liquid),
        ("glass", GLASS, DrawType::Glasslike),
    ] {
        d.register(NodeDef {
            name: name.into(),
            content,
            drawtype,
            material: None,
        });
    }
    d
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub blocks_sent: u64,
    pub got_acks: u64,
    pub deleted_acks: u64,
    pub ack_messages: u64,
    pub ack_bytes: u64,
}

pub struct HeightmapServer {
    terrain: FastNoiseLite,
    jitter: FastNoiseLite,
    min_h: i32,
    max_h: i32,
    sent: HashSet<BlockPos>,
    tick: u64,
    pub stats: FeedStats,
}

impl HeightmapServer {
    pub fn new(seed: i32) -> Self {
        let mut terrain = FastNoiseLite::with_seed(seed);
        terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
        terrain.set_frequency(Some(0.01));
        let mut jitter = FastNoiseLite::with_seed(seed ^ 41_337);
        jitter.set_noise_type(Some(NoiseType::OpenSimplex2));
        jitter.set_frequency(Some(0.37));
        Self {
            terrain,
            jitter,
            min_h: -20,
            max_h: 40,
            sent: HashSet::new(),
            tick: 0,
            stats: FeedStats::default(),
        }
    }

    /// Surface height of the column at node (x, z).
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let h = self.terrain.get_noise_2d(x as f32, z as f32);
        // map [-1,1] -> [min_h, max_h]
        ((h + 1.0) * 0.5 * (self.max_h - self.min_h) as f32) as i32 + self.min_h
    }

    /// Node payload for the block at `p`, x fastest then z then y.
    pub fn generate_block(&self, p: BlockPos) -> Vec<MapNode> {
        let bs = MAP_BLOCKSIZE;
        let base = p.base_node();
        let mut nodes = vec![MapNode::AIR; NODES_PER_BLOCK];
        for lz in 0..bs {
            for lx in 0..bs {
                let height = self.height_at(base.x + lx, base.z + lz);
                for ly in 0..bs {
                    let y = base.y + ly;
                    let content = if y < height - 3 {
                        STONE
                    } else if y < height - 1 {
                        DIRT
                    } else if y < height {
                        if height <= SEA_LEVEL + 1 { SAND } else { GRASS }
                    } else if y < SEA_LEVEL {
                        WATER
                    } else {
                        CONTENT_AIR
                    };
                    // Open sky gets full daylight; everything else stays dark.
                    let light = if y >= height.max(SEA_LEVEL) { 0x0F } else { 0 };
                    let i = ((ly * bs + lz) * bs + lx) as usize;
                    nodes[i] = MapNode::with_params(content, light, 0);
                }
            }
        }
        nodes
    }

    /// Sends up to `budget` not-yet-sent blocks within `radius` blocks of
    /// `center`, nearest first.
    pub fn feed(&mut self, map: &mut ClientMap, center: BlockPos, radius: i16, budget: usize) -> usize {
        let mut wanted: Vec<BlockPos> = Vec::new();
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    let p = center.offset(dx, dy, dz);
                    if !self.sent.contains(&p) {
                        wanted.push(p);
                    }
                }
            }
        }
        wanted.sort_by_key(|p| (p.distance_sq(center), *p));
        let mut n = 0;
        for p in wanted.into_iter().take(budget) {
            if map.add_block(p, self.generate_block(p)) {
                n += 1;
            }
            self.sent.insert(p);
        }
        self.stats.blocks_sent += n as u64;
        n
    }

    /// Picks a pseudo-random surface node near `around` and either digs it
    /// out or caps it with glass.
    pub fn random_edit(&mut self, map: &mut ClientMap, around: NodePos, spread: i32) -> NodePos {
        self.tick += 1;
        let t = self.tick as f32;
        let jx = self.jitter.get_noise_2d(t, 0.5);
        let jz = self.jitter.get_noise_2d(0.5, t);
        let x = around.x + (jx * spread as f32) as i32;
        let z = around.z + (jz * spread as f32) as i32;
        let y = self.height_at(x, z) - 1;
        let p = NodePos::new(x, y, z);
        if self.tick % 2 == 0 {
            map.remove_node(p);
        } else {
            map.add_node(p.offset(0, 1, 0), MapNode::with_params(GLASS, 0x0F, 0));
        }
        p
    }

    /// Consumes ack traffic. Deleted blocks become eligible to be resent.
    pub fn receive(&mut self, messages: &[OutboundMessage]) {
        for m in messages {
            self.stats.ack_messages += 1;
            self.stats.ack_bytes += m.encode().len() as u64;
            match m {
                OutboundMessage::GotBlocks(b) => self.stats.got_acks += b.len() as u64,
                OutboundMessage::DeletedBlocks(b) => {
                    self.stats.deleted_acks += b.len() as u64;
                    for p in b {
                        self.sent.remove(p);
                    }
                }
            }
        }
    }

    pub fn sent_len(&self) -> usize {
        self.sent.len()
    }
}
