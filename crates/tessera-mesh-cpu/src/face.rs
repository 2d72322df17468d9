use tessera_geom::Vec3;

/// Face directions, ordered like `tessera_world::FACE_OFFSETS` so a face's
/// index doubles as its solid-side bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    NegX = 0,
    PosX = 1,
    NegY = 2,
    PosY = 3,
    NegZ = 4,
    PosZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    #[inline]
    pub fn opposite(self) -> Face {
        match self {
            Face::NegX => Face::PosX,
            Face::PosX => Face::NegX,
            Face::NegY => Face::PosY,
            Face::PosY => Face::NegY,
            Face::NegZ => Face::PosZ,
            Face::PosZ => Face::NegZ,
        }
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        let (dx, dy, dz) = self.delta();
        Vec3::new(dx as f32, dy as f32, dz as f32)
    }

    /// Integer grid step when leaving through this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::NegX => (-1, 0, 0),
            Face::PosX => (1, 0, 0),
            Face::NegY => (0, -1, 0),
            Face::PosY => (0, 1, 0),
            Face::NegZ => (0, 0, -1),
            Face::PosZ => (0, 0, 1),
        }
    }

    /// Corners of the unit face of the node at `origin`, counter-clockwise
    /// seen from outside.
    pub fn corners(self, origin: Vec3) -> [Vec3; 4] {
        let o = origin;
        let p = |x: f32, y: f32, z: f32| Vec3::new(o.x + x, o.y + y, o.z + z);
        match self {
            Face::NegX => [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
            Face::PosX => [p(1., 0., 1.), p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.)],
            Face::NegY => [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
            Face::PosY => [p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.), p(0., 1., 0.)],
            Face::NegZ => [p(1., 0., 0.), p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.)],
            Face::PosZ => [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
        }
    }
}
