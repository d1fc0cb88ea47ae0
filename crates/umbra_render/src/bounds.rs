//! Caster bounds and cascade spheres

use glam::{Vec3, Vec4};
use serde::{Serialize, Deserialize};

/// Axis-aligned box around shadow casters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// Inverted box; the identity for [`AABB::union`]
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Sphere through the box corners
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::new((self.min + self.max) * 0.5, (self.max - self.min).length() * 0.5)
    }
}

/// Sphere enclosing a cascade's frustum slice
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Centered on the average of `points`, reaching the farthest one.
    ///
    /// Not the minimal sphere, but it moves smoothly with the points, which
    /// keeps cascades stable while the camera turns.
    pub fn enclosing(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0f32, f32::max);

        Self::new(center, radius)
    }

    #[inline]
    pub fn overlaps(&self, other: &Sphere) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) <= reach * reach
    }

    /// `(center, w)` as stored in shader arrays
    #[inline]
    pub fn packed(&self, w: f32) -> Vec4 {
        self.center.extend(w)
    }
}
