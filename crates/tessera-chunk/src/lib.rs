//! Client-side block storage: sectors, blocks, mesh slots and usage timers.
#![forbid(unsafe_code)]

mod block;
mod store;

pub use block::MapBlock;
pub use store::{EvictionStats, MapSector, NodeEditError, VoxelStore, blocks_affected_by_node};

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_geom::{Aabb, Vec3};
    use tessera_mesh_cpu::CompiledBlockMesh;
    use tessera_world::{BlockPos, MapNode, MeshGrid, NODES_PER_BLOCK, NodePos};

    fn mesh_for(p: BlockPos) -> Box<CompiledBlockMesh> {
        let b = p.base_node();
        let min = Vec3::new(b.x as f32, b.y as f32, b.z as f32);
        Box::new(CompiledBlockMesh::empty(p, Aabb::new(min, min + Vec3::splat(16.0))))
    }

    #[test]
    fn emerge_creates_once() {
        let mut s = VoxelStore::new();
        let p = BlockPos::new(1, -2, 3);
        assert!(s.emerge_block(p).1);
        assert!(!s.emerge_block(p).1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.sector_count(), 1);
        assert!(s.get_block(p).is_some_and(|b| b.get_local(0, 0, 0).is_ignore()));
    }

    #[test]
    fn insert_block_data_replaces_nodes() {
        let mut s = VoxelStore::new();
        let p = BlockPos::new(0, 0, 0);
        s.insert_block_data(p, vec![MapNode::new(7); NODES_PER_BLOCK]);
        assert_eq!(s.get_node(NodePos::new(3, 4, 5)).map(|n| n.content), Some(7));
        s.insert_block_data(p, vec![MapNode::AIR; NODES_PER_BLOCK]);
        assert_eq!(s.len(), 1);
        assert!(s.get_node(NodePos::new(3, 4, 5)).is_some_and(|n| n.is_air()));
    }

    #[test]
    fn short_payload_is_padded_with_ignore() {
        let mut s = VoxelStore::new();
        let p = BlockPos::new(0, 0, 0);
        s.insert_block_data(p, vec![MapNode::AIR; 10]);
        let b = s.get_block(p).unwrap();
        assert_eq!(b.nodes().len(), NODES_PER_BLOCK);
        assert!(b.get_local(0, 0, 0).is_air());
        assert!(b.get_local(15, 15, 15).is_ignore());
    }

    #[test]
    fn set_node_requires_loaded_block() {
        let mut s = VoxelStore::new();
        let err = s.set_node(NodePos::new(40, 0, 0), MapNode::AIR).unwrap_err();
        assert_eq!(err, NodeEditError::NotLoaded(BlockPos::new(2, 0, 0)));
        let err = s.set_node(NodePos::new(40_000, 0, 0), MapNode::AIR).unwrap_err();
        assert!(matches!(err, NodeEditError::OutOfRange(_)));

        s.emerge_block(BlockPos::new(-1, 0, 0));
        let bp = s.set_node(NodePos::new(-1, 2, 3), MapNode::new(5)).unwrap();
        assert_eq!(bp, BlockPos::new(-1, 0, 0));
        assert_eq!(s.get_block(bp).unwrap().get_local(15, 2, 3).content, 5);
    }

    #[test]
    fn install_mesh_stamps_increasing_serials() {
        let mut s = VoxelStore::new();
        let p = BlockPos::new(0, 0, 0);
        s.emerge_block(p);
        let a = s.install_mesh(p, mesh_for(p)).unwrap();
        let b = s.install_mesh(p, mesh_for(p)).unwrap();
        assert!(b > a);
        assert_eq!(s.get_block(p).and_then(|b| b.mesh()).map(|m| m.serial), Some(b));
        assert_eq!(s.mesh_count(), 1);

        let gone = BlockPos::new(9, 9, 9);
        assert!(s.install_mesh(gone, mesh_for(gone)).is_err());
    }

    #[test]
    fn timer_update_evicts_expired_blocks() {
        let mut s = VoxelStore::new();
        let old = BlockPos::new(0, 0, 0);
        let fresh = BlockPos::new(1, 0, 0);
        s.emerge_block(old);
        let mut evicted = Vec::new();
        s.timer_update(5.0, 8.0, None, &mut evicted);
        s.emerge_block(fresh);
        let stats = s.timer_update(4.0, 8.0, None, &mut evicted);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(evicted, vec![old]);
        assert!(s.get_block(old).is_none());
        assert!(s.get_block(fresh).is_some());
    }

    #[test]
    fn timer_update_caps_oldest_first() {
        let mut s = VoxelStore::new();
        for x in 0..4 {
            s.emerge_block(BlockPos::new(x, 0, 0));
            let mut ev = Vec::new();
            s.timer_update(1.0, 100.0, None, &mut ev);
        }
        let mut evicted = Vec::new();
        let stats = s.timer_update(0.0, 100.0, Some(2), &mut evicted);
        assert_eq!(stats.over_limit, 2);
        assert_eq!(evicted, vec![BlockPos::new(0, 0, 0), BlockPos::new(1, 0, 0)]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn range_visit_stays_inside_box() {
        let mut s = VoxelStore::new();
        for x in -2..=2 {
            for y in -2..=2 {
                s.emerge_block(BlockPos::new(x, y, 0));
            }
        }
        let mut seen = Vec::new();
        s.for_each_block_in_mut(BlockPos::new(-1, 0, -1), BlockPos::new(0, 1, 1), |b| {
            seen.push(b.pos)
        });
        seen.sort();
        assert_eq!(
            seen,
            vec![
                BlockPos::new(-1, 0, 0),
                BlockPos::new(-1, 1, 0),
                BlockPos::new(0, 0, 0),
                BlockPos::new(0, 1, 0),
            ]
        );
    }

    #[test]
    fn mesh_data_reads_cell_and_face_neighbors() {
        let mut s = VoxelStore::new();
        let o = BlockPos::new(0, 0, 0);
        s.insert_block_data(o, vec![MapNode::new(1); NODES_PER_BLOCK]);
        s.insert_block_data(BlockPos::new(0, 1, 0), vec![MapNode::AIR; NODES_PER_BLOCK]);
        s.insert_block_data(BlockPos::new(1, 1, 0), vec![MapNode::new(3); NODES_PER_BLOCK]);
        let d = s.make_mesh_data(o, MeshGrid::default(), false, false);
        assert_eq!(d.get(4, 4, 4).content, 1);
        assert!(d.get(4, 16, 4).is_air());
        assert!(d.get(-1, 4, 4).is_ignore());
        // Edge neighbour is outside the halo.
        assert!(d.get(16, 16, 4).is_ignore());
    }

    #[test]
    fn affected_blocks_follow_touched_faces() {
        assert_eq!(blocks_affected_by_node(NodePos::new(5, 5, 5)), vec![BlockPos::new(0, 0, 0)]);
        assert_eq!(
            blocks_affected_by_node(NodePos::new(0, 5, 15)),
            vec![BlockPos::new(0, 0, 0), BlockPos::new(-1, 0, 0), BlockPos::new(0, 0, 1)]
        );
        assert_eq!(blocks_affected_by_node(NodePos::new(-16, 0, -1)).len(), 4);
    }
}
