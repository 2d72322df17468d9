use tessera_geom::Vec3;
use tessera_objects::block_of;
use tessera_world::BlockPos;

/// View state the draw list is computed from. Positions are in nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub yaw: f32,   // degrees
    pub pitch: f32, // degrees
    /// Full horizontal field of view.
    pub fov_deg: f32,
    /// How far blocks are registered as visible, in nodes.
    pub wanted_range: f32,
}

impl CameraState {
    pub fn new(position: Vec3, wanted_range: f32) -> Self {
        Self {
            position,
            yaw: -45.0,
            pitch: -15.0,
            fov_deg: 72.0,
            wanted_range,
        }
    }

    pub fn looking(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-89.9, 89.9);
        self
    }

    pub fn forward(&self) -> Vec3 {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();
        Vec3::new(
            yaw_rad.cos() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.sin() * pitch_rad.cos(),
        )
        .normalized()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::UP).normalized()
    }

    /// Block containing the camera.
    #[inline]
    pub fn block(&self) -> BlockPos {
        block_of(self.position)
    }

    /// Cosine of the half-angle of the cone used for culling. The cone is
    /// widened so the diagonal of a 16:9 screen is still inside.
    pub fn cone_cos(&self) -> f32 {
        let half = (self.fov_deg * 0.5 * 1.3).clamp(1.0, 179.0);
        half.to_radians().cos()
    }
}
