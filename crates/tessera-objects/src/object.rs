use tessera_geom::{Aabb, Vec3};
use tessera_world::{BlockPos, NodePos};

pub type ObjectId = u16;

/// Closed set of object kinds the client knows how to track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// The player this client controls. Never selectable.
    LocalPlayer,
    RemotePlayer { name: String },
    /// Server-scripted entity.
    Entity { name: String },
    /// Debug object spawned by the server's test command.
    Test,
}

impl ObjectKind {
    #[inline]
    pub fn is_local_player(&self) -> bool {
        matches!(self, ObjectKind::LocalPlayer)
    }

    #[inline]
    pub fn is_player(&self) -> bool {
        matches!(self, ObjectKind::LocalPlayer | ObjectKind::RemotePlayer { .. })
    }
}

/// Borrowed view of an object that can be pointed at.
#[derive(Clone, Copy, Debug)]
pub struct SelectionView<'a> {
    pub id: ObjectId,
    pub kind: &'a ObjectKind,
    /// World-space selection box.
    pub bounds: Aabb,
}

#[derive(Clone, Debug)]
pub struct ActiveObject {
    pub(crate) id: ObjectId,
    kind: ObjectKind,
    pub pos: Vec3,
    pub vel: Vec3,
    /// Relative to `pos`.
    pub selection_box: Aabb,
    pub visible: bool,
    pub hp: u16,
}

impl ActiveObject {
    pub fn new(kind: ObjectKind, pos: Vec3) -> Self {
        Self {
            id: 0,
            kind,
            pos,
            vel: Vec3::ZERO,
            selection_box: Aabb::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5)),
            visible: true,
            hp: 20,
        }
    }

    pub fn with_selection_box(mut self, b: Aabb) -> Self {
        self.selection_box = b;
        self
    }

    pub fn with_velocity(mut self, v: Vec3) -> Self {
        self.vel = v;
        self
    }

    /// Assigned on registration; 0 before that.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Block the object's position falls in.
    #[inline]
    pub fn block_pos(&self) -> BlockPos {
        block_of(self.pos)
    }

    #[inline]
    pub fn world_selection_box(&self) -> Aabb {
        self.selection_box.translated(self.pos)
    }

    /// The object as a pointing target, if it can be one.
    pub fn as_selectable(&self) -> Option<SelectionView<'_>> {
        if self.kind.is_local_player() || !self.visible {
            return None;
        }
        let e = self.selection_box.extents();
        if e.x <= 0.0 || e.y <= 0.0 || e.z <= 0.0 {
            return None;
        }
        Some(SelectionView {
            id: self.id,
            kind: &self.kind,
            bounds: self.world_selection_box(),
        })
    }
}

/// Node-space position to the block containing it.
pub fn block_of(p: Vec3) -> BlockPos {
    let f = |v: f32| v.floor().clamp(i32::MIN as f32, i32::MAX as f32) as i32;
    NodePos::new(f(p.x), f(p.y), f(p.z)).block()
}

/// Decoded server message addressed to one object.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectMessage {
    SetPosition { pos: Vec3, vel: Vec3 },
    SetProperties {
        selection_box: Option<Aabb>,
        visible: Option<bool>,
    },
    SetHp(u16),
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_player_is_never_selectable() {
        let o = ActiveObject::new(ObjectKind::LocalPlayer, Vec3::ZERO);
        assert!(o.as_selectable().is_none());
        let o = ActiveObject::new(ObjectKind::Test, Vec3::ZERO);
        assert!(o.as_selectable().is_some());
    }

    #[test]
    fn hidden_or_flat_objects_are_not_selectable() {
        let mut o = ActiveObject::new(ObjectKind::Entity { name: "cart".into() }, Vec3::ZERO);
        o.visible = false;
        assert!(o.as_selectable().is_none());
        let o = ActiveObject::new(ObjectKind::Test, Vec3::ZERO)
            .with_selection_box(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)));
        assert!(o.as_selectable().is_none());
    }

    #[test]
    fn block_of_floors_negative_positions() {
        assert_eq!(block_of(Vec3::new(0.5, 15.9, 16.0)), BlockPos::new(0, 0, 1));
        assert_eq!(block_of(Vec3::new(-0.1, -16.0, -16.1)), BlockPos::new(-1, -1, -2));
    }
}
