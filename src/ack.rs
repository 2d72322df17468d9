use tessera_world::BlockPos;

/// Most coordinates one message can carry; the count is a single byte.
pub const MAX_BLOCKS_PER_MESSAGE: usize = 255;

pub const TOSERVER_GOTBLOCKS: u16 = 0x24;
pub const TOSERVER_DELETEDBLOCKS: u16 = 0x25;

/// Block bookkeeping sent back to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Blocks received and meshed.
    GotBlocks(Vec<BlockPos>),
    /// Blocks dropped from memory; the server may resend them later.
    DeletedBlocks(Vec<BlockPos>),
}

impl OutboundMessage {
    pub fn command(&self) -> u16 {
        match self {
            OutboundMessage::GotBlocks(_) => TOSERVER_GOTBLOCKS,
            OutboundMessage::DeletedBlocks(_) => TOSERVER_DELETEDBLOCKS,
        }
    }

    pub fn blocks(&self) -> &[BlockPos] {
        match self {
            OutboundMessage::GotBlocks(b) | OutboundMessage::DeletedBlocks(b) => b,
        }
    }

    /// Wire form: command (u16), count (u8), then `count` coordinates as
    /// three big-endian i16 each.
    pub fn encode(&self) -> Vec<u8> {
        let blocks = self.blocks();
        debug_assert!(blocks.len() <= MAX_BLOCKS_PER_MESSAGE);
        let count = blocks.len().min(MAX_BLOCKS_PER_MESSAGE);
        let mut out = Vec::with_capacity(3 + count * 6);
        out.extend_from_slice(&self.command().to_be_bytes());
        out.push(count as u8);
        for p in &blocks[..count] {
            out.extend_from_slice(&p.x.to_be_bytes());
            out.extend_from_slice(&p.y.to_be_bytes());
            out.extend_from_slice(&p.z.to_be_bytes());
        }
        out
    }
}

/// Per-step accumulator for both ack kinds.
#[derive(Debug, Default)]
pub struct AckQueue {
    got: Vec<BlockPos>,
    deleted: Vec<BlockPos>,
}

impl AckQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push_got(&mut self, p: BlockPos) {
        self.got.push(p);
    }

    #[inline]
    pub fn push_deleted(&mut self, p: BlockPos) {
        self.deleted.push(p);
    }

    pub fn is_empty(&self) -> bool {
        self.got.is_empty() && self.deleted.is_empty()
    }

    /// Splits everything queued into messages of at most 255 coordinates,
    /// received-acks first.
    pub fn flush(&mut self, out: &mut Vec<OutboundMessage>) {
        for chunk in self.got.chunks(MAX_BLOCKS_PER_MESSAGE) {
            out.push(OutboundMessage::GotBlocks(chunk.to_vec()));
        }
        for chunk in self.deleted.chunks(MAX_BLOCKS_PER_MESSAGE) {
            out.push(OutboundMessage::DeletedBlocks(chunk.to_vec()));
        }
        if !self.is_empty() {
            log::trace!(
                target: "net",
                "ack flush: {} got, {} deleted",
                self.got.len(),
                self.deleted.len()
            );
        }
        self.got.clear();
        self.deleted.clear();
    }
}
