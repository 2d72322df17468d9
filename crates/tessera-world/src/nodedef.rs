use hashbrown::HashMap;
use serde::Deserialize;

use crate::node::{CONTENT_AIR, CONTENT_IGNORE, CONTENT_UNKNOWN, ContentId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawType {
    /// Not drawn, does not occlude.
    Airlike,
    /// Opaque full cube.
    Normal,
    /// See-through full cube; faces between two identical glasslike nodes are culled.
    Glasslike,
    /// Translucent full cube drawn in the blended pass.
    Liquid,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NodeDef {
    pub name: String,
    pub content: ContentId,
    pub drawtype: DrawType,
    /// Material/tile layer the faces are batched under. Defaults to the content id.
    #[serde(default)]
    pub material: Option<u16>,
}

/// Read-only view of node definitions used by the mesher.
///
/// Content ids with no registered definition render as opaque cubes with
/// their own id as material, so unregistered content is still visible.
#[derive(Clone, Debug, Default)]
pub struct NodeDefManager {
    defs: HashMap<ContentId, NodeDef>,
}

impl NodeDefManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defs(defs: impl IntoIterator<Item = NodeDef>) -> Self {
        let mut m = Self::new();
        for d in defs {
            m.register(d);
        }
        m
    }

    pub fn register(&mut self, def: NodeDef) {
        self.defs.insert(def.content, def);
    }

    pub fn get(&self, content: ContentId) -> Option<&NodeDef> {
        self.defs.get(&content)
    }

    pub fn id_by_name(&self, name: &str) -> Option<ContentId> {
        self.defs
            .values()
            .find(|d| d.name == name)
            .map(|d| d.content)
    }

    pub fn drawtype(&self, content: ContentId) -> DrawType {
        match content {
            CONTENT_AIR => DrawType::Airlike,
            // Ignore is never drawn; opacity is handled by `is_opaque`.
            CONTENT_IGNORE => DrawType::Airlike,
            _ => self
                .defs
                .get(&content)
                .map(|d| d.drawtype)
                .unwrap_or(DrawType::Normal),
        }
    }

    /// Whether the node hides faces behind it. Unloaded (`CONTENT_IGNORE`) counts as opaque.
    #[inline]
    pub fn is_opaque(&self, content: ContentId) -> bool {
        content == CONTENT_IGNORE || self.drawtype(content) == DrawType::Normal
    }

    #[inline]
    pub fn is_drawn(&self, content: ContentId) -> bool {
        self.drawtype(content) != DrawType::Airlike
    }

    #[inline]
    pub fn is_translucent(&self, content: ContentId) -> bool {
        matches!(self.drawtype(content), DrawType::Liquid)
    }

    pub fn material(&self, content: ContentId) -> u16 {
        self.defs
            .get(&content)
            .and_then(|d| d.material)
            .unwrap_or(content)
    }

    /// Table with air, ignore and unknown preset; the usual starting point.
    pub fn with_builtins() -> Self {
        Self::from_defs([
            NodeDef {
                name: "air".into(),
                content: CONTENT_AIR,
                drawtype: DrawType::Airlike,
                material: None,
            },
            NodeDef {
                name: "ignore".into(),
                content: CONTENT_IGNORE,
                drawtype: DrawType::Airlike,
                material: None,
            },
            NodeDef {
                name: "unknown".into(),
                content: CONTENT_UNKNOWN,
                drawtype: DrawType::Normal,
                material: None,
            },
        ])
    }
}
