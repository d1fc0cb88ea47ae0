//! GPU Shadow Data Structures
//!
//! Flat, shader-facing snapshots of a frame's directional lights and shadow
//! cascades. All structures are bytemuck Pod/Zeroable for direct GPU upload
//! and are rebuilt from scratch every frame.

use serde::{Serialize, Deserialize};
use glam::Vec4;

use super::atlas::AtlasLayout;
use super::cascade::{CascadeOutputs, MAX_ATLAS_MATRICES, MAX_CASCADES};
use super::commands::ShadowCommandBuffer;
use super::config::{CascadeBlendMode, FilterMode, ShadowSettings};
use super::reservation::DirectionalShadowData;

/// Maximum directional lights packed for shading
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Directional light uniforms
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuDirectionalLights {
    /// Number of valid entries
    pub count: u32,

    /// Padding to align the arrays to 16 bytes
    pub _pad: [u32; 3],

    /// Linear color premultiplied by intensity
    pub colors: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],

    /// Direction towards the light
    pub directions: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],

    /// `(strength, tile_index, normal_bias, 0)`
    pub shadow_data: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
}

impl GpuDirectionalLights {
    /// Get uniform data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Directional shadow uniforms
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuDirectionalShadows {
    /// Active cascades, 0 when no light casts shadows
    pub cascade_count: u32,

    /// Padding
    pub _pad: [u32; 3],

    /// `(center, squared shrunk radius)` per cascade
    pub culling_spheres: [[f32; 4]; MAX_CASCADES],

    /// `(1 / radius, filter * sqrt(2), 0, 0)` per cascade
    pub cascade_data: [[f32; 4]; MAX_CASCADES],

    /// `(1 / max_distance, 1 / distance_fade, 1 / (1 - f^2), 0)`,
    /// component 2 is `+inf` when `cascade_fade = 0`
    pub distance_fade: [f32; 4],

    /// `(size, 1 / size, 0, 0)`
    pub atlas_size: [f32; 4],

    /// World-to-atlas matrices indexed by tile (column-major)
    pub atlas_matrices: [[[f32; 4]; 4]; MAX_ATLAS_MATRICES],
}

impl Default for GpuDirectionalShadows {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl GpuDirectionalShadows {
    /// Get uniform data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Directional light arrays filled by the light aggregator
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionalLightArrays {
    pub colors: [Vec4; MAX_DIRECTIONAL_LIGHTS],
    pub directions: [Vec4; MAX_DIRECTIONAL_LIGHTS],
    pub shadow_data: [DirectionalShadowData; MAX_DIRECTIONAL_LIGHTS],
    /// Filled slots
    pub count: usize,
}

impl DirectionalLightArrays {
    /// Zero every slot
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The frame's shader-facing snapshot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedLightingState {
    /// Directional light uniforms; `lights.count` is clamped to the array size
    pub lights: GpuDirectionalLights,

    /// Shadow uniforms
    pub shadows: GpuDirectionalShadows,

    /// Lights that survived culling, regardless of kind or capacity
    pub visible_light_count: usize,

    /// Shader keywords enabled this frame
    pub enabled_keywords: Vec<&'static str>,
}

impl PackedLightingState {
    /// Packed directional lights (at most [`MAX_DIRECTIONAL_LIGHTS`])
    pub fn directional_light_count(&self) -> usize {
        self.lights.count as usize
    }

    /// Get light uniform data as bytes
    pub fn lights_bytes(&self) -> &[u8] {
        self.lights.as_bytes()
    }

    /// Get shadow uniform data as bytes
    pub fn shadows_bytes(&self) -> &[u8] {
        self.shadows.as_bytes()
    }

    pub fn is_keyword_enabled(&self, keyword: &str) -> bool {
        self.enabled_keywords.iter().any(|k| *k == keyword)
    }
}

/// Builds the shader-facing arrays from the frame's intermediate state
pub struct ShadowParameterPacker<'a> {
    settings: &'a ShadowSettings,
}

impl<'a> ShadowParameterPacker<'a> {
    pub fn new(settings: &'a ShadowSettings) -> Self {
        Self { settings }
    }

    /// `(1 / max_distance, 1 / distance_fade, 1 / (1 - f^2), 0)` with
    /// `f = 1 - cascade_fade`
    ///
    /// `cascade_fade = 0` is valid and makes component 2 `+inf`, so the
    /// shading stage's cascade fade term saturates to a hard edge.
    pub fn distance_fade(&self) -> [f32; 4] {
        let f = 1.0 - self.settings.directional.cascade_fade;
        [
            1.0 / self.settings.max_distance,
            1.0 / self.settings.distance_fade,
            1.0 / (1.0 - f * f),
            0.0,
        ]
    }

    /// Pack directional light arrays
    pub fn pack_lights(&self, arrays: &DirectionalLightArrays) -> GpuDirectionalLights {
        let mut gpu = GpuDirectionalLights {
            count: arrays.count.min(MAX_DIRECTIONAL_LIGHTS) as u32,
            ..Default::default()
        };

        for i in 0..gpu.count as usize {
            gpu.colors[i] = arrays.colors[i].to_array();
            gpu.directions[i] = arrays.directions[i].to_array();
            gpu.shadow_data[i] = arrays.shadow_data[i].to_array();
        }

        gpu
    }

    /// Pack cascade outputs; everything stays zero without reservations
    pub fn pack_shadows(&self, layout: &AtlasLayout, outputs: &CascadeOutputs) -> GpuDirectionalShadows {
        let mut gpu = GpuDirectionalShadows {
            distance_fade: self.distance_fade(),
            atlas_size: layout.atlas_size_vector(),
            ..Default::default()
        };

        if layout.is_placeholder() {
            return gpu;
        }

        gpu.cascade_count = self.settings.directional.cascade_count.min(MAX_CASCADES as u32);
        for level in 0..MAX_CASCADES {
            gpu.culling_spheres[level] = outputs.culling_spheres[level].to_array();
            gpu.cascade_data[level] = outputs.cascade_data[level].to_array();
        }
        for (slot, matrix) in gpu.atlas_matrices.iter_mut().zip(outputs.atlas_matrices()) {
            *slot = matrix.to_cols_array_2d();
        }

        gpu
    }

    /// Record keyword toggles for the filter and blend modes
    ///
    /// Returns the keywords left enabled.
    pub fn select_keywords(&self, commands: &mut ShadowCommandBuffer) -> Vec<&'static str> {
        let filter = self.settings.directional.filter;
        let blend = self.settings.directional.cascade_blend;

        commands.set_keywords(&FilterMode::KEYWORDS, filter.keyword_index());
        commands.set_keywords(&CascadeBlendMode::KEYWORDS, blend.keyword_index());

        filter
            .keyword_index()
            .map(|i| FilterMode::KEYWORDS[i])
            .into_iter()
            .chain(blend.keyword_index().map(|i| CascadeBlendMode::KEYWORDS[i]))
            .collect()
    }
}
