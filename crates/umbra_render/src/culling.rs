//! Culling Collaborator
//!
//! The shadow core does not decide visibility. It asks a culling
//! collaborator for the visible lights, their caster bounds and the
//! per-cascade light matrices. [`SceneCuller`] and [`ShadowCullingResults`]
//! are that seam; [`FrustumShadowCuller`] is a CPU reference implementation
//! good enough for tools, tests and engines without their own culler.
//!
//! # Reference cascade fitting
//!
//! Each cascade covers a slice of the camera frustum. The slice's far
//! distance is `ratio * shadow_distance` for the first `count - 1` cascades
//! and the full shadow distance for the last one. The slice is enclosed in a
//! centroid sphere, and an orthographic light camera is fitted around that
//! sphere and snapped to the tile's texel grid so shadows do not swim.

use serde::{Serialize, Deserialize};
use glam::{Mat4, Vec3};

use crate::bounds::{Sphere, AABB};
use crate::light::VisibleLight;

/// Camera description handed to the culler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Name used in logs and profiling samples
    pub name: String,
    /// World position
    pub position: Vec3,
    /// View direction
    pub forward: Vec3,
    /// Up hint
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Camera {
    /// Perspective camera looking from `position` towards `target`
    pub fn looking_at(name: impl Into<String>, position: Vec3, target: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            forward: (target - position).normalize(),
            up: Vec3::Y,
            fov_y: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.3,
            far: 1000.0,
        }
    }

    /// Whether culling parameters can be derived from this camera
    pub fn is_valid(&self) -> bool {
        self.near > 0.0
            && self.far > self.near
            && self.fov_y > 0.0
            && self.fov_y < std::f32::consts::PI
            && self.aspect > 0.0
            && self.forward.length_squared() > 1e-8
            && self.forward.cross(self.up).length_squared() > 1e-8
    }

    /// Eight world-space corners of the frustum slice between two view distances
    pub fn slice_corners(&self, near: f32, far: f32) -> [Vec3; 8] {
        let forward = self.forward.normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        let tan_half = (self.fov_y * 0.5).tan();

        let mut corners = [Vec3::ZERO; 8];
        for (i, &distance) in [near, far].iter().enumerate() {
            let half_h = distance * tan_half;
            let half_w = half_h * self.aspect;
            let center = self.position + forward * distance;
            corners[i * 4] = center - right * half_w - up * half_h;
            corners[i * 4 + 1] = center + right * half_w - up * half_h;
            corners[i * 4 + 2] = center - right * half_w + up * half_h;
            corners[i * 4 + 3] = center + right * half_w + up * half_h;
        }
        corners
    }
}

/// Parameters for one directional cascade
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalShadowRequest {
    /// Index into the culling results' visible lights
    pub visible_light_index: usize,
    /// Cascade level being computed
    pub cascade_index: u32,
    /// Total cascade count
    pub cascade_count: u32,
    /// Fractions of the shadow distance for the first three cascades
    pub cascade_ratios: [f32; 3],
    /// Tile edge in texels
    pub tile_size: u32,
    /// Shadow near-plane offset of the light
    pub near_plane_offset: f32,
}

/// Culling data for one cascade draw
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowSplitData {
    /// Sphere enclosing the cascade's frustum slice
    pub culling_sphere: Sphere,
    /// Fraction of the sphere radius used when culling casters against
    /// smaller cascades
    pub blend_culling_factor: f32,
}

impl Default for ShadowSplitData {
    fn default() -> Self {
        Self {
            culling_sphere: Sphere::default(),
            blend_culling_factor: 1.0,
        }
    }
}

/// Light matrices and split data for one cascade
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalShadowMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub split: ShadowSplitData,
}

/// Per-camera culling output
pub trait ShadowCullingResults {
    /// Lights that survived visibility culling, in visible-index order
    fn visible_lights(&self) -> &[VisibleLight];

    /// World-space bounds of shadow casters affecting the light, or `None`
    /// when every caster lies beyond the shadow distance
    fn shadow_caster_bounds(&self, visible_light_index: usize) -> Option<AABB>;

    /// View, projection and split data for one cascade of a directional light
    fn compute_directional_shadow_matrices(
        &self,
        request: &DirectionalShadowRequest,
    ) -> DirectionalShadowMatrices;
}

/// Produces culling results for a camera
pub trait SceneCuller {
    type Results: ShadowCullingResults;

    /// Cull the scene for `camera`. `None` means no culling parameters could
    /// be derived and the camera's frame must be skipped.
    fn cull(&mut self, camera: &Camera, max_shadow_distance: f32) -> Option<Self::Results>;
}

/// A shadow caster known to the reference culler
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowCaster {
    /// World-space bounds
    pub bounds: AABB,
}

/// CPU reference culler over a flat list of lights and casters
#[derive(Clone, Debug, Default)]
pub struct FrustumShadowCuller {
    lights: Vec<VisibleLight>,
    casters: Vec<ShadowCaster>,
}

impl FrustumShadowCuller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_light(&mut self, light: VisibleLight) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn add_caster(&mut self, bounds: AABB) {
        self.casters.push(ShadowCaster { bounds });
    }

    pub fn lights(&self) -> &[VisibleLight] {
        &self.lights
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        self.casters.clear();
    }
}

impl SceneCuller for FrustumShadowCuller {
    type Results = FrustumCullingResults;

    fn cull(&mut self, camera: &Camera, max_shadow_distance: f32) -> Option<Self::Results> {
        if !camera.is_valid() {
            log::debug!("Camera '{}' has no valid culling parameters", camera.name);
            return None;
        }

        let shadow_distance = max_shadow_distance.min(camera.far);
        let shadow_range = Sphere::new(camera.position, shadow_distance);

        let caster_bounds = self
            .casters
            .iter()
            .filter(|c| c.bounds.bounding_sphere().overlaps(&shadow_range))
            .fold(AABB::EMPTY, |acc, c| acc.union(&c.bounds));

        Some(FrustumCullingResults {
            camera: camera.clone(),
            shadow_distance,
            visible_lights: self.lights.clone(),
            caster_bounds: (!caster_bounds.is_empty()).then_some(caster_bounds),
        })
    }
}

/// Culling output of [`FrustumShadowCuller`]
#[derive(Clone, Debug)]
pub struct FrustumCullingResults {
    camera: Camera,
    shadow_distance: f32,
    visible_lights: Vec<VisibleLight>,
    caster_bounds: Option<AABB>,
}

impl FrustumCullingResults {
    /// Effective shadow distance (`min(max_distance, camera.far)`)
    pub fn shadow_distance(&self) -> f32 {
        self.shadow_distance
    }

    /// Near and far view distances of a cascade's frustum slice
    pub fn cascade_range(&self, cascade_index: u32, cascade_count: u32, ratios: [f32; 3]) -> (f32, f32) {
        let far_fraction = |level: u32| -> f32 {
            if level + 1 >= cascade_count {
                1.0
            } else {
                ratios[level as usize]
            }
        };

        let near = if cascade_index == 0 {
            self.camera.near
        } else {
            far_fraction(cascade_index - 1) * self.shadow_distance
        };
        let far = far_fraction(cascade_index) * self.shadow_distance;
        (near, far.max(near))
    }
}

impl ShadowCullingResults for FrustumCullingResults {
    fn visible_lights(&self) -> &[VisibleLight] {
        &self.visible_lights
    }

    fn shadow_caster_bounds(&self, visible_light_index: usize) -> Option<AABB> {
        if visible_light_index >= self.visible_lights.len() {
            return None;
        }
        self.caster_bounds
    }

    fn compute_directional_shadow_matrices(
        &self,
        request: &DirectionalShadowRequest,
    ) -> DirectionalShadowMatrices {
        let light_direction = self
            .visible_lights
            .get(request.visible_light_index)
            .map(|l| l.forward().normalize())
            .unwrap_or(Vec3::NEG_Y);

        let (near, far) = self.cascade_range(
            request.cascade_index,
            request.cascade_count,
            request.cascade_ratios,
        );
        let corners = self.camera.slice_corners(near, far);
        let sphere = Sphere::enclosing(&corners);
        let radius = sphere.radius.max(1e-4);
        let near_offset = request.near_plane_offset.max(0.0);

        // Back the light camera off so casters up to the near offset in
        // front of the sphere still land in the depth range
        let eye = sphere.center - light_direction * (radius + near_offset);
        let view = Mat4::look_at_rh(eye, sphere.center, find_up_vector(light_direction));
        let projection = Mat4::orthographic_rh(
            -radius,
            radius,
            -radius,
            radius,
            0.0,
            2.0 * radius + near_offset,
        );
        let projection = snap_to_texel(projection, &view, request.tile_size);

        DirectionalShadowMatrices {
            view,
            projection,
            split: ShadowSplitData {
                culling_sphere: Sphere::new(sphere.center, radius),
                blend_culling_factor: 1.0,
            },
        }
    }
}

/// Find a suitable up vector for the light view matrix
fn find_up_vector(light_direction: Vec3) -> Vec3 {
    // Avoid parallel vectors
    if light_direction.y.abs() > 0.9 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Snap the projection's translation so the world origin lands on a texel
/// corner, which keeps the shadow map from swimming as the camera moves
fn snap_to_texel(mut projection: Mat4, view: &Mat4, tile_size: u32) -> Mat4 {
    let origin = (projection * *view) * Vec3::ZERO.extend(1.0);
    let texel_size = 2.0 / tile_size.max(1) as f32;

    let snapped_x = (origin.x / texel_size).round() * texel_size;
    let snapped_y = (origin.y / texel_size).round() * texel_size;

    projection.w_axis.x += snapped_x - origin.x;
    projection.w_axis.y += snapped_y - origin.y;
    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::LightShadows;

    fn camera() -> Camera {
        Camera::looking_at("main", Vec3::new(0.0, 2.0, -10.0), Vec3::new(0.0, 0.0, 0.0))
    }

    fn culler_with_caster(center: Vec3) -> FrustumShadowCuller {
        let mut culler = FrustumShadowCuller::new();
        culler.add_light(
            VisibleLight::directional(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE, 1.0)
                .with_shadows(LightShadows::Hard, 1.0),
        );
        culler.add_caster(AABB::from_center_half_extents(center, Vec3::ONE));
        culler
    }

    #[test]
    fn test_invalid_camera_is_not_culled() {
        let mut culler = FrustumShadowCuller::new();
        let mut cam = camera();
        cam.near = 0.0;
        assert!(culler.cull(&cam, 100.0).is_none());

        let mut cam = camera();
        cam.far = cam.near;
        assert!(culler.cull(&cam, 100.0).is_none());
    }

    #[test]
    fn test_shadow_distance_clamped_to_far() {
        let mut culler = FrustumShadowCuller::new();
        let mut cam = camera();
        cam.far = 40.0;
        let results = culler.cull(&cam, 100.0).unwrap();
        assert_eq!(results.shadow_distance(), 40.0);
    }

    #[test]
    fn test_caster_bounds_beyond_shadow_distance() {
        let mut near = culler_with_caster(Vec3::ZERO);
        let results = near.cull(&camera(), 100.0).unwrap();
        assert!(results.shadow_caster_bounds(0).is_some());
        assert!(results.shadow_caster_bounds(5).is_none());

        let mut far = culler_with_caster(Vec3::new(0.0, 0.0, 500.0));
        let results = far.cull(&camera(), 100.0).unwrap();
        assert!(results.shadow_caster_bounds(0).is_none());
    }

    #[test]
    fn test_cascade_ranges_follow_ratios() {
        let mut culler = culler_with_caster(Vec3::ZERO);
        let results = culler.cull(&camera(), 100.0).unwrap();
        let ratios = [0.1, 0.25, 0.5];

        assert_eq!(results.cascade_range(0, 4, ratios), (0.3, 10.0));
        assert_eq!(results.cascade_range(1, 4, ratios), (10.0, 25.0));
        assert_eq!(results.cascade_range(2, 4, ratios), (25.0, 50.0));
        assert_eq!(results.cascade_range(3, 4, ratios), (50.0, 100.0));

        // With two cascades the second one covers the rest
        assert_eq!(results.cascade_range(1, 2, ratios), (10.0, 100.0));
        // A single cascade covers everything
        assert_eq!(results.cascade_range(0, 1, ratios), (0.3, 100.0));
    }

    #[test]
    fn test_cascade_spheres_grow() {
        let mut culler = culler_with_caster(Vec3::ZERO);
        let results = culler.cull(&camera(), 100.0).unwrap();

        let mut previous = 0.0;
        for level in 0..4 {
            let m = results.compute_directional_shadow_matrices(&DirectionalShadowRequest {
                visible_light_index: 0,
                cascade_index: level,
                cascade_count: 4,
                cascade_ratios: [0.1, 0.25, 0.5],
                tile_size: 512,
                near_plane_offset: 0.0,
            });
            assert!(m.split.culling_sphere.radius > previous);
            previous = m.split.culling_sphere.radius;
        }
    }

    #[test]
    fn test_sphere_center_projects_to_tile_center() {
        let mut culler = culler_with_caster(Vec3::ZERO);
        let results = culler.cull(&camera(), 100.0).unwrap();
        let m = results.compute_directional_shadow_matrices(&DirectionalShadowRequest {
            visible_light_index: 0,
            cascade_index: 1,
            cascade_count: 4,
            cascade_ratios: [0.1, 0.25, 0.5],
            tile_size: 512,
            near_plane_offset: 2.0,
        });

        let clip = (m.projection * m.view) * m.split.culling_sphere.center.extend(1.0);
        // Texel snapping moves the center by at most one texel
        let texel = 2.0 / 512.0;
        assert!(clip.x.abs() <= texel);
        assert!(clip.y.abs() <= texel);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn test_snap_to_texel_lands_on_grid() {
        let view = Mat4::from_translation(Vec3::new(0.123, 0.456, -3.0));
        let projection = Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.0, 20.0);
        let snapped = snap_to_texel(projection, &view, 256);

        let origin = (snapped * view) * Vec3::ZERO.extend(1.0);
        let texel = 2.0 / 256.0;
        let steps = origin.x / texel;
        assert!((steps - steps.round()).abs() < 1e-3);
    }
}
