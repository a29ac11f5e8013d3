//! Derived vehicle quantities: speed, attitude and travelled distance.

use crate::events::Vec3;

/// Metres per second squared to g.
pub const MPS2_TO_G: f64 = 0.101971621;

/// Metres per second to kilometres per hour.
pub const MPS_TO_KPH: f64 = 3.6;

/// Magnitude of the local velocity in m/s.
pub fn speed_mps(local_vel: &Vec3) -> f64 {
    local_vel.length()
}

/// Forward basis vector of an orientation matrix.
fn forward_vector(ori: &[Vec3; 3]) -> Vec3 {
    let [x, y, z] = ori;
    Vec3::new(-x.z, -y.z, -z.z)
}

/// Left basis vector of an orientation matrix.
fn left_vector(ori: &[Vec3; 3]) -> Vec3 {
    let [x, y, z] = ori;
    Vec3::new(x.x, y.x, z.x)
}

/// Elevation of `v` above the horizontal plane, in degrees.
fn elevation_degrees(v: &Vec3) -> f64 {
    v.y.atan2((v.x * v.x + v.z * v.z).sqrt()).to_degrees()
}

/// Pitch angle in degrees.
pub fn pitch_degrees(ori: &[Vec3; 3]) -> f64 {
    elevation_degrees(&forward_vector(ori))
}

/// Roll angle in degrees.
pub fn roll_degrees(ori: &[Vec3; 3]) -> f64 {
    elevation_degrees(&left_vector(ori))
}

/// Cumulative straight-line distance between consecutive sampled positions.
///
/// Position jumps (respawn, pit reset) are counted like any other movement.
// TODO: skip single-frame jumps above a plausibility threshold once the host
// exposes a reset flag.
#[derive(Debug, Clone, Default)]
pub struct DistanceTracker {
    previous: Option<Vec3>,
    total_m: f64,
}

impl DistanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next sampled position and return the running total.
    ///
    /// The first position contributes zero.
    pub fn advance(&mut self, pos: Vec3) -> f64 {
        if let Some(previous) = self.previous {
            self.total_m += previous.distance_to(&pos);
        }
        self.previous = Some(pos);
        self.total_m
    }
}
