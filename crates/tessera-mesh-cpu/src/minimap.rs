use tessera_world::{BlockPos, CONTENT_AIR, ContentId, MAP_BLOCKSIZE, NodeDefManager};

use crate::make_data::MeshMakeData;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinimapPixel {
    pub content: ContentId,
    /// Height of the top drawn node above the block floor, plus one; 0 = empty column.
    pub height: u8,
}

/// Top-down summary of one block for the minimap.
#[derive(Clone, Debug)]
pub struct MinimapMapblock {
    pub pos: BlockPos,
    pub pixels: Vec<MinimapPixel>,
}

impl MinimapMapblock {
    #[inline]
    pub fn pixel(&self, x: usize, z: usize) -> MinimapPixel {
        self.pixels[z * MAP_BLOCKSIZE as usize + x]
    }
}

/// One summary per block of the snapshot's cell.
pub fn summarize(data: &MeshMakeData, defs: &NodeDefManager) -> Vec<MinimapMapblock> {
    let bs = MAP_BLOCKSIZE;
    let c = data.cell_size as i16;
    let mut out = Vec::with_capacity((c as usize).pow(3));
    for dy in 0..c {
        for dz in 0..c {
            for dx in 0..c {
                let pos = data.origin.offset(dx, dy, dz);
                let (ox, oy, oz) = (i32::from(dx) * bs, i32::from(dy) * bs, i32::from(dz) * bs);
                let mut pixels = vec![
                    MinimapPixel {
                        content: CONTENT_AIR,
                        height: 0
                    };
                    (bs * bs) as usize
                ];
                for z in 0..bs {
                    for x in 0..bs {
                        for y in (0..bs).rev() {
                            let n = data.get(ox + x, oy + y, oz + z);
                            if defs.is_drawn(n.content) {
                                pixels[(z * bs + x) as usize] = MinimapPixel {
                                    content: n.content,
                                    height: (y + 1) as u8,
                                };
                                break;
                            }
                        }
                    }
                }
                out.push(MinimapMapblock { pos, pixels });
            }
        }
    }
    out
}
