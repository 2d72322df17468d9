use std::sync::Arc;

use tessera_mesh_cpu::{
    Face, FaceCullingMesher, MeshCompiler, MeshMakeData, RenderPass, SOLID_ALL, solid_sides,
};
use tessera_world::{BlockPos, DrawType, MAP_BLOCKSIZE, MapNode, NodeDef, NodeDefManager};

const STONE: u16 = 1;
const WATER: u16 = 2;
const N: usize = (MAP_BLOCKSIZE * MAP_BLOCKSIZE * MAP_BLOCKSIZE) as usize;

fn defs() -> Arc<NodeDefManager> {
    let mut d = NodeDefManager::with_builtins();
    d.register(NodeDef {
        name: "stone".into(),
        content: STONE,
        drawtype: DrawType::Normal,
        material: None,
    });
    d.register(NodeDef {
        name: "water".into(),
        content: WATER,
        drawtype: DrawType::Liquid,
        material: Some(90),
    });
    Arc::new(d)
}

fn filled(content: u16) -> Vec<MapNode> {
    vec![MapNode::new(content); N]
}

#[test]
fn solid_block_without_neighbors_is_empty_but_valid() {
    let mesher = FaceCullingMesher::new(defs());
    let mut data = MeshMakeData::new(BlockPos::new(0, 0, 0), 1, false, false);
    data.fill_block(BlockPos::new(0, 0, 0), &filled(STONE));
    let mesh = mesher.compile(&data);
    assert!(mesh.is_empty());
    assert_eq!(mesh.triangle_count(), 0);
    // Empty meshes still get a usable sphere around the whole block.
    assert!((mesh.bounding_sphere.center.x - 8.0).abs() < 1e-5);
    assert!(mesh.bounding_sphere.radius > 13.0);
}

#[test]
fn solid_block_next_to_air_exposes_one_side() {
    let mesher = FaceCullingMesher::new(defs());
    let mut data = MeshMakeData::new(BlockPos::new(0, 0, 0), 1, false, false);
    data.fill_block(BlockPos::new(0, 0, 0), &filled(STONE));
    data.fill_block(BlockPos::new(0, 1, 0), &vec![MapNode::AIR; N]);
    let mesh = mesher.compile(&data);
    // 16x16 top faces, two triangles each
    assert_eq!(mesh.triangle_count(), 16 * 16 * 2);
    assert!((mesh.bbox.max.y - 16.0).abs() < 1e-5);
}

#[test]
fn single_node_in_air_has_six_faces() {
    let mesher = FaceCullingMesher::new(defs());
    let mut data = MeshMakeData::new(BlockPos::new(1, 0, 0), 1, true, false);
    let mut nodes = vec![MapNode::AIR; N];
    nodes[(3 * 16 + 4) * 16 + 5] = MapNode::new(STONE);
    data.fill_block(BlockPos::new(1, 0, 0), &nodes);
    let mesh = mesher.compile(&data);
    assert_eq!(mesh.triangle_count(), 12);
    let (key, _) = mesh.layers(RenderPass::Opaque)[0];
    assert_eq!(key.material, STONE);
    // absolute node space: block x=1 starts at node 16
    assert!((mesh.bbox.min.x - 21.0).abs() < 1e-5);
    assert!((mesh.bounding_sphere.radius - 0.75f32.sqrt()).abs() < 1e-5);
}

#[test]
fn liquid_goes_to_blended_pass_and_culls_against_itself() {
    let mesher = FaceCullingMesher::new(defs());
    let mut data = MeshMakeData::new(BlockPos::new(0, 0, 0), 1, false, false);
    let mut nodes = vec![MapNode::AIR; N];
    nodes[0] = MapNode::new(WATER);
    nodes[1] = MapNode::new(WATER);
    data.fill_block(BlockPos::new(0, 0, 0), &nodes);
    let mesh = mesher.compile(&data);
    let blended = mesh.layers(RenderPass::Blended);
    assert_eq!(blended.len(), 1);
    assert_eq!(blended[0].0.material, 90);
    // Two adjacent water nodes: 12 faces, minus the shared pair, minus the
    // five that touch the ignore halo on -X, -Y and -Z.
    assert_eq!(mesh.triangle_count(), 5 * 2);
}

#[test]
fn solid_sides_reports_full_faces() {
    let d = defs();
    let mut data = MeshMakeData::new(BlockPos::new(0, 0, 0), 1, false, false);
    data.fill_block(BlockPos::new(0, 0, 0), &filled(STONE));
    assert_eq!(solid_sides(&data, &d), vec![(BlockPos::new(0, 0, 0), SOLID_ALL)]);

    let mut nodes = filled(STONE);
    nodes[0] = MapNode::AIR; // corner (0,0,0) opens -X, -Y and -Z
    data.fill_block(BlockPos::new(0, 0, 0), &nodes);
    let mask = solid_sides(&data, &d)[0].1;
    assert_eq!(mask, Face::PosX.bit() | Face::PosY.bit() | Face::PosZ.bit());
}

#[test]
fn minimap_records_top_nodes() {
    let mesher = FaceCullingMesher::new(defs());
    let mut data = MeshMakeData::new(BlockPos::new(0, 0, 0), 1, false, true);
    let mut nodes = vec![MapNode::AIR; N];
    // column (2, 3) has stone at y=0..=4
    for y in 0..5 {
        nodes[(y * 16 + 3) * 16 + 2] = MapNode::new(STONE);
    }
    data.fill_block(BlockPos::new(0, 0, 0), &nodes);
    let mesh = mesher.compile(&data);
    assert_eq!(mesh.minimap.len(), 1);
    let px = mesh.minimap[0].pixel(2, 3);
    assert_eq!(px.content, STONE);
    assert_eq!(px.height, 5);
    assert_eq!(mesh.minimap[0].pixel(0, 0).height, 0);
}
