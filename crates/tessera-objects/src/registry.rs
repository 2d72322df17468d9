use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use hashbrown::{HashMap, HashSet};
use tessera_geom::Vec3;
use tessera_world::BlockPos;

use crate::object::{ActiveObject, ObjectId, ObjectMessage};

/// An object entered, left or moved between blocks. `from`/`to` are `None`
/// when the object was registered or removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockChange {
    pub id: ObjectId,
    pub from: Option<BlockPos>,
    pub to: Option<BlockPos>,
}

/// Owns every active object, keyed by its server id.
///
/// The object map sits behind a reader/writer lock so queries (`shootline`,
/// `nearest`, `with_object`) only take shared access; registration, removal
/// and stepping take `&mut self`. The block index is advisory and only
/// updated when an object's containing block changes.
#[derive(Debug, Default)]
pub struct ActiveObjectRegistry {
    objects: RwLock<HashMap<ObjectId, ActiveObject>>,
    by_block: HashMap<BlockPos, HashSet<ObjectId>>,
    located: HashMap<ObjectId, BlockPos>,
    last_id: ObjectId,
    local_player: Option<ObjectId>,
}

impl ActiveObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObjectId, ActiveObject>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn objects_mut(&mut self) -> &mut HashMap<ObjectId, ActiveObject> {
        self.objects.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn free_id(&self) -> Option<ObjectId> {
        let objects = self.read();
        let mut id = self.last_id;
        for _ in 0..u16::MAX {
            id = id.wrapping_add(1);
            if id == 0 {
                id = 1;
            }
            if !objects.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }

    /// Adds `obj` under `id`, or under a fresh id when `id` is `None` or 0.
    /// Returns the id, or `None` if it is taken or no id is free.
    pub fn register_object(&mut self, id: Option<ObjectId>, mut obj: ActiveObject) -> Option<ObjectId> {
        let id = match id.filter(|&id| id != 0) {
            Some(id) => {
                if self.read().contains_key(&id) {
                    log::warn!(target: "objects", "object id {id} already registered");
                    return None;
                }
                id
            }
            None => match self.free_id() {
                Some(id) => id,
                None => {
                    log::warn!(target: "objects", "no free object id");
                    return None;
                }
            },
        };
        if obj.kind().is_local_player() {
            if let Some(existing) = self.local_player {
                log::warn!(target: "objects", "local player already registered as {existing}");
                return None;
            }
            self.local_player = Some(id);
        }
        obj.id = id;
        self.last_id = id;
        let block = obj.block_pos();
        self.objects_mut().insert(id, obj);
        self.index(id, block);
        log::debug!(target: "objects", "registered object {id} in block {block:?}");
        Some(id)
    }

    /// Detaches and returns the object.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<(ActiveObject, BlockChange)> {
        let obj = self.objects_mut().remove(&id)?;
        if self.local_player == Some(id) {
            self.local_player = None;
        }
        let from = self.unindex(id);
        log::debug!(target: "objects", "removed object {id}");
        Some((
            obj,
            BlockChange {
                id,
                from,
                to: None,
            },
        ))
    }

    fn index(&mut self, id: ObjectId, block: BlockPos) {
        self.by_block.entry(block).or_default().insert(id);
        self.located.insert(id, block);
    }

    fn unindex(&mut self, id: ObjectId) -> Option<BlockPos> {
        let block = self.located.remove(&id)?;
        if let Some(set) = self.by_block.get_mut(&block) {
            set.remove(&id);
            if set.is_empty() {
                self.by_block.remove(&block);
            }
        }
        Some(block)
    }

    /// Re-indexes `id` if its block changed.
    fn relocate(&mut self, id: ObjectId, now: BlockPos) -> Option<BlockChange> {
        let before = self.located.get(&id).copied();
        if before == Some(now) {
            return None;
        }
        self.unindex(id);
        self.index(id, now);
        Some(BlockChange {
            id,
            from: before,
            to: Some(now),
        })
    }

    /// Advances every object by `dt` and hands it to `visitor`. Returns the
    /// objects whose containing block changed.
    pub fn step<F>(&mut self, dt: f32, mut visitor: F) -> Vec<BlockChange>
    where
        F: FnMut(&ActiveObject),
    {
        let mut moved: Vec<(ObjectId, BlockPos)> = Vec::new();
        for obj in self.objects_mut().values_mut() {
            if obj.vel != Vec3::ZERO {
                obj.pos += obj.vel * dt;
            }
            visitor(obj);
            moved.push((obj.id, obj.block_pos()));
        }
        let mut changes: Vec<BlockChange> = moved
            .into_iter()
            .filter_map(|(id, block)| self.relocate(id, block))
            .collect();
        changes.sort_by_key(|c| c.id);
        changes
    }

    /// Applies a decoded server message to object `id`.
    pub fn process_message(&mut self, id: ObjectId, msg: ObjectMessage) -> Option<BlockChange> {
        if matches!(msg, ObjectMessage::Remove) {
            return self.remove_object(id).map(|(_, change)| change);
        }
        let Some(obj) = self.objects_mut().get_mut(&id) else {
            log::debug!(target: "objects", "message for unknown object {id}: {msg:?}");
            return None;
        };
        match msg {
            ObjectMessage::SetPosition { pos, vel } => {
                obj.pos = pos;
                obj.vel = vel;
                let block = obj.block_pos();
                self.relocate(id, block)
            }
            ObjectMessage::SetProperties {
                selection_box,
                visible,
            } => {
                if let Some(b) = selection_box {
                    obj.selection_box = b;
                }
                if let Some(v) = visible {
                    obj.visible = v;
                }
                None
            }
            ObjectMessage::SetHp(hp) => {
                obj.hp = hp;
                None
            }
            ObjectMessage::Remove => None,
        }
    }

    /// Objects whose selection box the ray `origin + t * dir` enters within
    /// `max_dist`, nearest first. `dir` must be normalized.
    pub fn shootline(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Vec<(ObjectId, f32)> {
        let objects = self.read();
        let mut hits: Vec<(ObjectId, f32)> = objects
            .values()
            .filter_map(|o| o.as_selectable())
            .filter_map(|s| s.bounds.ray_intersection(origin, dir, max_dist).map(|t| (s.id, t)))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits
    }

    /// Objects within `max_dist` of `origin`, nearest first.
    pub fn nearest(&self, origin: Vec3, max_dist: f32) -> Vec<(ObjectId, f32)> {
        let objects = self.read();
        let mut out: Vec<(ObjectId, f32)> = objects
            .values()
            .map(|o| (o.id, o.pos.distance(origin)))
            .filter(|&(_, d)| d <= max_dist)
            .collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Ids indexed in `block`, ascending.
    pub fn objects_in_block(&self, block: BlockPos) -> Vec<ObjectId> {
        let mut v: Vec<ObjectId> = self
            .by_block
            .get(&block)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        v.sort_unstable();
        v
    }

    pub fn block_of_object(&self, id: ObjectId) -> Option<BlockPos> {
        self.located.get(&id).copied()
    }

    pub fn with_object<R>(&self, id: ObjectId, f: impl FnOnce(&ActiveObject) -> R) -> Option<R> {
        self.read().get(&id).map(f)
    }

    pub fn get(&self, id: ObjectId) -> Option<ActiveObject> {
        self.read().get(&id).cloned()
    }

    #[inline]
    pub fn local_player(&self) -> Option<ObjectId> {
        self.local_player
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        let mut v: Vec<ObjectId> = self.read().keys().copied().collect();
        v.sort_unstable();
        v
    }
}
