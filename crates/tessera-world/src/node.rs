use serde::{Deserialize, Serialize};

pub type ContentId = u16;

/// Content the server has no definition for.
pub const CONTENT_UNKNOWN: ContentId = 125;
pub const CONTENT_AIR: ContentId = 126;
/// Placeholder for nodes whose data is not loaded. Never drawn, treated as
/// opaque when culling faces so unloaded neighbours do not open seams.
pub const CONTENT_IGNORE: ContentId = 127;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapNode {
    pub content: ContentId,
    /// Light bank: low nibble day, high nibble night.
    pub param1: u8,
    pub param2: u8,
}

impl MapNode {
    pub const AIR: MapNode = MapNode {
        content: CONTENT_AIR,
        param1: 0,
        param2: 0,
    };
    pub const IGNORE: MapNode = MapNode {
        content: CONTENT_IGNORE,
        param1: 0,
        param2: 0,
    };

    #[inline]
    pub const fn new(content: ContentId) -> Self {
        Self {
            content,
            param1: 0,
            param2: 0,
        }
    }

    #[inline]
    pub const fn with_params(content: ContentId, param1: u8, param2: u8) -> Self {
        Self {
            content,
            param1,
            param2,
        }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.content == CONTENT_AIR
    }

    #[inline]
    pub fn is_ignore(self) -> bool {
        self.content == CONTENT_IGNORE
    }

    #[inline]
    pub fn day_light(self) -> u8 {
        self.param1 & 0x0F
    }

    #[inline]
    pub fn night_light(self) -> u8 {
        self.param1 >> 4
    }
}

impl Default for MapNode {
    fn default() -> Self {
        MapNode::AIR
    }
}
