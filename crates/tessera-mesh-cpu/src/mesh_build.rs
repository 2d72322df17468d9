use tessera_geom::Vec3;

use crate::face::Face;

/// CPU-side vertex streams for one material layer, ready for upload.
#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
    pub col: Vec<u8>,
}

impl MeshBuild {
    /// Pre-reserve capacity for approximately `n_quads` quads worth of data.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        self.pos.reserve(n_quads * 4 * 3);
        self.norm.reserve(n_quads * 4 * 3);
        self.uv.reserve(n_quads * 4 * 2);
        self.col.reserve(n_quads * 4 * 4);
        self.idx.reserve(n_quads * 6);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Appends the unit face of the node at `origin` as two triangles.
    pub fn add_face(&mut self, face: Face, origin: Vec3, rgba: [u8; 4]) {
        let base = self.vertex_count() as u32;
        let n = face.normal();
        let uvs = [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)];
        for (v, uv) in face.corners(origin).iter().zip(uvs) {
            self.pos.extend_from_slice(&[v.x, v.y, v.z]);
            self.norm.extend_from_slice(&[n.x, n.y, n.z]);
            self.uv.extend_from_slice(&[uv.0, uv.1]);
            self.col.extend_from_slice(&rgba);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Iterates vertex positions.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.pos.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2]))
    }
}
