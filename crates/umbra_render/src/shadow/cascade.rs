//! Cascaded Shadow Map Rendering
//!
//! Drives the per-cascade work for every reserved directional light: fetch
//! the light camera from the culling collaborator, record culling spheres and
//! cascade data, remap the view-projection into the light's atlas tile and
//! emit the draw commands.
//!
//! # Shared Cascade Geometry
//!
//! Cascade spheres depend on the camera frustum only, so they are the same
//! for every directional light. Light 0 records them; the other lights reuse
//! the values at the same level.
//!
//! # Culling Spheres
//!
//! The stored sphere radius is shrunk by the filter footprint and squared,
//! so the shading stage selects a cascade with `distance_sq < w` and never
//! filters past the edge of a tile.

use std::f32::consts::SQRT_2;

use glam::{Mat4, Vec3, Vec4};
use serde::{Serialize, Deserialize};

use crate::bounds::Sphere;
use crate::culling::{DirectionalShadowRequest, ShadowCullingResults, ShadowSplitData};
use super::atlas::AtlasLayout;
use super::atlas_matrix::{to_atlas_matrix, DepthRange};
use super::commands::{ShadowCommand, ShadowCommandBuffer};
use super::config::{DirectionalShadowSettings, FilterMode};
use super::reservation::{ShadowReservation, MAX_SHADOWED_DIRECTIONAL_LIGHTS};

/// Maximum supported cascade count
pub const MAX_CASCADES: usize = 4;

/// Capacity of the atlas matrix array
pub const MAX_ATLAS_MATRICES: usize = MAX_SHADOWED_DIRECTIONAL_LIGHTS * MAX_CASCADES;

/// One cascade of one light, valid for the current frame only
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cascade {
    /// Reservation slot of the light
    pub light_index: usize,
    /// Cascade level
    pub level: u32,
    /// Atlas tile, `light_index * cascade_count + level`
    pub tile_index: u32,
    pub view: Mat4,
    pub projection: Mat4,
    /// Split data as handed to the draw, blend factor already applied
    pub split: ShadowSplitData,
}

/// Shading-stage culling sphere and cascade data for one level
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CascadeCulling {
    /// `(center, (radius - filter)^2)`
    pub culling_sphere: Vec4,
    /// `(1 / radius, filter * sqrt(2), 0, 0)`
    pub data: Vec4,
}

/// Derive the stored sphere and cascade data for a cascade
///
/// The filter footprint is `texel * (ordinal + 1)` with `texel = 2r / tile`.
/// The shrunk radius is clamped at zero before squaring.
pub fn cascade_culling(sphere: &Sphere, tile_size: u32, filter: FilterMode) -> CascadeCulling {
    let radius = sphere.radius;
    let texel_size = 2.0 * radius / tile_size as f32;
    let filter_size = texel_size * (filter.ordinal() as f32 + 1.0);

    let shrunk = (radius - filter_size).max(0.0);

    CascadeCulling {
        culling_sphere: sphere.packed(shrunk * shrunk),
        data: Vec4::new(1.0 / radius, filter_size * SQRT_2, 0.0, 0.0),
    }
}

/// Per-frame cascade outputs consumed by the parameter packer
#[derive(Clone, Debug)]
pub struct CascadeOutputs {
    /// Culling spheres per level, `w` is the squared shrunk radius
    pub culling_spheres: [Vec4; MAX_CASCADES],
    /// Cascade data per level
    pub cascade_data: [Vec4; MAX_CASCADES],
    /// Atlas-space matrices indexed by tile
    pub atlas_matrices: [Mat4; MAX_ATLAS_MATRICES],
    /// Number of valid atlas matrices
    pub atlas_matrix_count: usize,
    /// Cascade records in tile order
    pub cascades: Vec<Cascade>,
}

impl CascadeOutputs {
    pub fn new() -> Self {
        Self {
            culling_spheres: [Vec4::ZERO; MAX_CASCADES],
            cascade_data: [Vec4::ZERO; MAX_CASCADES],
            atlas_matrices: [Mat4::ZERO; MAX_ATLAS_MATRICES],
            atlas_matrix_count: 0,
            cascades: Vec::with_capacity(MAX_ATLAS_MATRICES),
        }
    }

    /// Zero every array for a new frame
    pub fn reset(&mut self) {
        self.culling_spheres = [Vec4::ZERO; MAX_CASCADES];
        self.cascade_data = [Vec4::ZERO; MAX_CASCADES];
        self.atlas_matrices = [Mat4::ZERO; MAX_ATLAS_MATRICES];
        self.atlas_matrix_count = 0;
        self.cascades.clear();
    }

    /// Valid atlas matrices
    pub fn atlas_matrices(&self) -> &[Mat4] {
        &self.atlas_matrices[..self.atlas_matrix_count]
    }
}

impl Default for CascadeOutputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes and records all cascades of the reserved lights
pub struct CascadeComputer<'a> {
    settings: &'a DirectionalShadowSettings,
    layout: &'a AtlasLayout,
    depth_range: DepthRange,
}

impl<'a> CascadeComputer<'a> {
    pub fn new(
        settings: &'a DirectionalShadowSettings,
        layout: &'a AtlasLayout,
        depth_range: DepthRange,
    ) -> Self {
        Self {
            settings,
            layout,
            depth_range,
        }
    }

    /// Render every cascade of every reservation, in reservation order
    pub fn render<C: ShadowCullingResults + ?Sized>(
        &self,
        reservations: &[ShadowReservation],
        culling: &C,
        outputs: &mut CascadeOutputs,
        commands: &mut ShadowCommandBuffer,
    ) {
        let cascade_count = self.settings.cascade_count.clamp(1, MAX_CASCADES as u32);

        for (light_index, reservation) in reservations
            .iter()
            .take(MAX_SHADOWED_DIRECTIONAL_LIGHTS)
            .enumerate()
        {
            self.render_light(light_index, reservation, cascade_count, culling, outputs, commands);
        }

        outputs.atlas_matrix_count = outputs.cascades.len();
    }

    fn render_light<C: ShadowCullingResults + ?Sized>(
        &self,
        light_index: usize,
        reservation: &ShadowReservation,
        cascade_count: u32,
        culling: &C,
        outputs: &mut CascadeOutputs,
        commands: &mut ShadowCommandBuffer,
    ) {
        let tile_base = light_index as u32 * cascade_count;
        let blend_culling_factor = self.settings.blend_culling_factor();

        for level in 0..cascade_count {
            let request = DirectionalShadowRequest {
                visible_light_index: reservation.visible_light_index,
                cascade_index: level,
                cascade_count,
                cascade_ratios: self.settings.cascade_ratios,
                tile_size: self.layout.tile_size,
                near_plane_offset: reservation.near_plane_offset,
            };
            let matrices = culling.compute_directional_shadow_matrices(&request);

            let mut split = matrices.split;
            split.blend_culling_factor = blend_culling_factor;

            if light_index == 0 {
                let culled = cascade_culling(
                    &split.culling_sphere,
                    self.layout.tile_size,
                    self.settings.filter,
                );
                outputs.culling_spheres[level as usize] = culled.culling_sphere;
                outputs.cascade_data[level as usize] = culled.data;
            }

            let tile_index = tile_base + level;
            let offset = self.layout.tile_offset(tile_index);
            outputs.atlas_matrices[tile_index as usize] = to_atlas_matrix(
                matrices.projection * matrices.view,
                offset,
                self.layout.split,
                self.depth_range,
            );

            log::trace!(
                "Cascade {} of light {} -> tile {} ({}, {}), radius {}",
                level,
                reservation.visible_light_index,
                tile_index,
                offset.x,
                offset.y,
                split.culling_sphere.radius
            );

            commands.push(ShadowCommand::SetViewport(self.layout.tile_viewport(tile_index)));
            commands.push(ShadowCommand::SetViewProjection {
                view: matrices.view,
                projection: matrices.projection,
            });
            commands.push(ShadowCommand::depth_bias(reservation.slope_scale_bias));
            commands.push(ShadowCommand::DrawShadows {
                visible_light_index: reservation.visible_light_index,
                cascade_index: level,
                split,
            });
            commands.push(ShadowCommand::reset_depth_bias());

            outputs.cascades.push(Cascade {
                light_index,
                level,
                tile_index,
                view: matrices.view,
                projection: matrices.projection,
                split,
            });
        }
    }
}

/// Cascade the shading stage would pick for a world position
///
/// First level whose stored squared radius contains the point.
pub fn select_cascade(culling_spheres: &[Vec4], cascade_count: u32, position: Vec3) -> Option<usize> {
    culling_spheres
        .iter()
        .take(cascade_count as usize)
        .position(|sphere| (position - sphere.truncate()).length_squared() < sphere.w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cascade_culling_values() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 10.0);
        let culled = cascade_culling(&sphere, 512, FilterMode::Pcf2x2);

        let texel = 20.0 / 512.0;
        assert_relative_eq!(culled.data.x, 0.1);
        assert_relative_eq!(culled.data.y, texel * SQRT_2);
        assert_relative_eq!(culled.culling_sphere.w, (10.0 - texel) * (10.0 - texel));
        assert_eq!(culled.culling_sphere.truncate(), sphere.center);
    }

    #[test]
    fn test_wider_filters_shrink_more() {
        let sphere = Sphere::new(Vec3::ZERO, 8.0);
        let modes = [FilterMode::Pcf2x2, FilterMode::Pcf3x3, FilterMode::Pcf5x5, FilterMode::Pcf7x7];

        let mut previous = f32::MAX;
        for (i, mode) in modes.into_iter().enumerate() {
            let culled = cascade_culling(&sphere, 256, mode);
            let texel = 16.0 / 256.0;
            assert_relative_eq!(culled.data.y, texel * (i as f32 + 1.0) * SQRT_2);
            assert!(culled.culling_sphere.w < 64.0);
            assert!(culled.culling_sphere.w < previous);
            previous = culled.culling_sphere.w;
        }
    }

    #[test]
    fn test_squared_radius_never_negative() {
        // Tiny tile: filter footprint exceeds the radius
        let culled = cascade_culling(&Sphere::new(Vec3::ZERO, 1.0), 2, FilterMode::Pcf7x7);
        assert_eq!(culled.culling_sphere.w, 0.0);
    }

    #[test]
    fn test_select_cascade() {
        let spheres = [
            Vec4::new(0.0, 0.0, 0.0, 4.0),
            Vec4::new(0.0, 0.0, 0.0, 100.0),
            Vec4::ZERO,
            Vec4::ZERO,
        ];
        assert_eq!(select_cascade(&spheres, 2, Vec3::new(1.0, 0.0, 0.0)), Some(0));
        assert_eq!(select_cascade(&spheres, 2, Vec3::new(5.0, 0.0, 0.0)), Some(1));
        assert_eq!(select_cascade(&spheres, 2, Vec3::new(50.0, 0.0, 0.0)), None);
        assert_eq!(select_cascade(&spheres, 1, Vec3::new(5.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_outputs_reset() {
        let mut outputs = CascadeOutputs::new();
        outputs.culling_spheres[1] = Vec4::ONE;
        outputs.atlas_matrices[3] = Mat4::IDENTITY;
        outputs.atlas_matrix_count = 4;

        outputs.reset();
        assert_eq!(outputs.culling_spheres[1], Vec4::ZERO);
        assert_eq!(outputs.atlas_matrices[3], Mat4::ZERO);
        assert!(outputs.atlas_matrices().is_empty());
    }
}
