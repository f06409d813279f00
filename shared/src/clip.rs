//! User clip planes

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Half-space clip plane. Fragments on the side `dir` points to are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlane {
    #[serde(default = "default_active")]
    pub active: bool,
    pub pos: Vec3,
    pub dir: Vec3,
}

fn default_active() -> bool {
    true
}

impl ClipPlane {
    pub fn new(pos: Vec3, dir: Vec3) -> Self {
        Self {
            active: true,
            pos,
            dir,
        }
    }

    /// Signed distance of `point` along `dir`; positive means clipped
    pub fn distance(&self, point: Vec3) -> f32 {
        (point - self.pos).dot(self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_along_dir_are_clipped() {
        let plane = ClipPlane::new(Vec3::ZERO, Vec3::X);
        assert!(plane.distance(Vec3::new(1.0, 0.0, 0.0)) > 0.0);
        assert!(plane.distance(Vec3::new(-1.0, 5.0, 0.0)) < 0.0);
    }
}
