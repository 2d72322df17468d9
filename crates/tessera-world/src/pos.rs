use serde::{Deserialize, Serialize};

/// Edge length of a block in nodes.
pub const MAP_BLOCKSIZE: i32 = 16;
pub const NODES_PER_BLOCK: usize = (MAP_BLOCKSIZE * MAP_BLOCKSIZE * MAP_BLOCKSIZE) as usize;

/// Largest absolute node coordinate the server will ever address.
pub const MAX_MAP_GENERATION_LIMIT: i32 = 31007;

/// Unit offsets of the six face neighbours, in the order -X, +X, -Y, +Y, -Z, +Z.
pub const FACE_OFFSETS: [(i16, i16, i16); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPosition {
    #[error("node position ({x}, {y}, {z}) is outside the map limits")]
    Node { x: i32, y: i32, z: i32 },
    #[error("block position ({x}, {y}, {z}) is outside the map limits")]
    Block { x: i32, y: i32, z: i32 },
}

/// Block coordinate. Serialized on the wire as three big-endian i16.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Checked construction from wide integers.
    pub fn try_new(x: i32, y: i32, z: i32) -> Result<Self, InvalidPosition> {
        let limit = MAX_MAP_GENERATION_LIMIT / MAP_BLOCKSIZE;
        if x.abs() > limit || y.abs() > limit || z.abs() > limit {
            return Err(InvalidPosition::Block { x, y, z });
        }
        Ok(Self::new(x as i16, y as i16, z as i16))
    }

    #[inline]
    pub fn offset(self, dx: i16, dy: i16, dz: i16) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    #[inline]
    pub fn distance_sq(self, other: BlockPos) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// The node at the block's minimum corner.
    #[inline]
    pub fn base_node(self) -> NodePos {
        NodePos::new(
            i32::from(self.x) * MAP_BLOCKSIZE,
            i32::from(self.y) * MAP_BLOCKSIZE,
            i32::from(self.z) * MAP_BLOCKSIZE,
        )
    }

    /// Column key of the sector holding this block.
    #[inline]
    pub fn sector(self) -> (i16, i16) {
        (self.x, self.z)
    }

    pub fn face_neighbors(self) -> impl Iterator<Item = BlockPos> {
        FACE_OFFSETS
            .iter()
            .map(move |&(dx, dy, dz)| self.offset(dx, dy, dz))
    }
}

impl From<(i16, i16, i16)> for BlockPos {
    fn from(value: (i16, i16, i16)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<BlockPos> for (i16, i16, i16) {
    fn from(value: BlockPos) -> Self {
        (value.x, value.y, value.z)
    }
}

/// Absolute node coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl NodePos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn validate(self) -> Result<Self, InvalidPosition> {
        let l = MAX_MAP_GENERATION_LIMIT;
        if self.x.abs() > l || self.y.abs() > l || self.z.abs() > l {
            return Err(InvalidPosition::Node {
                x: self.x,
                y: self.y,
                z: self.z,
            });
        }
        Ok(self)
    }

    /// Block containing this node. Callers validate first; out-of-range
    /// coordinates saturate.
    #[inline]
    pub fn block(self) -> BlockPos {
        let f = |v: i32| v.div_euclid(MAP_BLOCKSIZE).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        BlockPos::new(f(self.x), f(self.y), f(self.z))
    }

    /// Position inside the containing block, each axis in `0..MAP_BLOCKSIZE`.
    #[inline]
    pub fn local(self) -> (usize, usize, usize) {
        (
            self.x.rem_euclid(MAP_BLOCKSIZE) as usize,
            self.y.rem_euclid(MAP_BLOCKSIZE) as usize,
            self.z.rem_euclid(MAP_BLOCKSIZE) as usize,
        )
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl From<(i32, i32, i32)> for NodePos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}
