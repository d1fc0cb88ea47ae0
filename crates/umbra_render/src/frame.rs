//! Frame Orchestration
//!
//! [`CameraRenderer`] runs the shadow pipeline for one camera in strict
//! order:
//!
//! ```text
//! cull -> reset -> aggregate lights / reserve -> plan atlas
//!      -> cascades (or placeholder) -> pack -> release
//! ```
//!
//! All intermediate arrays live in [`FrameState`], which is zero-filled at
//! the start of every frame so nothing from a previous camera or frame can
//! leak into the next one.

use glam::Vec4;

use crate::culling::{Camera, SceneCuller, ShadowCullingResults};
use crate::error::Result;
use crate::light_extraction::{LightAggregator, LightExtractionStats};
use crate::shadow::{
    AtlasLayout, CascadeComputer, CascadeOutputs, DepthRange, DirectionalLightArrays,
    LightReservationTable, PackedLightingState, ReservationStats, ShadowCommand,
    ShadowCommandBuffer, ShadowCommandExecutor, ShadowCommandStats, ShadowParameterPacker,
    ShadowSettings, SHADOWS_SAMPLE,
};

/// Explicit per-frame state owned by the renderer
#[derive(Clone, Debug)]
pub struct FrameState {
    pub reservations: LightReservationTable,
    pub lights: DirectionalLightArrays,
    pub cascades: CascadeOutputs,
    pub layout: AtlasLayout,
    pub commands: ShadowCommandBuffer,
    pub packed: PackedLightingState,
}

impl FrameState {
    pub fn new() -> Self {
        Self {
            reservations: LightReservationTable::default(),
            lights: DirectionalLightArrays::default(),
            cascades: CascadeOutputs::new(),
            layout: AtlasLayout::placeholder(),
            commands: ShadowCommandBuffer::new(),
            packed: PackedLightingState::default(),
        }
    }

    /// Clear everything for a new frame
    pub fn reset(&mut self, cascade_count: u32) {
        self.reservations.reset(cascade_count);
        self.lights.reset();
        self.cascades.reset();
        self.layout = AtlasLayout::placeholder();
        self.commands.clear();
        self.packed = PackedLightingState::default();
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a rendered camera frame
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Camera name
    pub camera: String,
    pub lights: LightExtractionStats,
    pub reservations: ReservationStats,
    pub layout: AtlasLayout,
    /// Cascades drawn across all lights
    pub cascades_rendered: usize,
    pub commands: ShadowCommandStats,
}

/// Why a camera frame produced no output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The culler could not derive culling parameters
    CullingUnavailable,
}

/// Result of rendering one camera
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Rendered(FrameReport),
    Skipped(SkipReason),
}

impl FrameOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            Self::Rendered(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }
}

/// Runs the shadow pipeline for a camera
#[derive(Clone, Debug)]
pub struct CameraRenderer {
    settings: ShadowSettings,
    depth_range: DepthRange,
    aggregator: LightAggregator,
    state: FrameState,
}

impl CameraRenderer {
    /// Create a renderer; settings are clamped to valid ranges
    pub fn new(mut settings: ShadowSettings) -> Self {
        settings.validate();
        Self {
            settings,
            depth_range: DepthRange::Standard,
            aggregator: LightAggregator::new(),
            state: FrameState::new(),
        }
    }

    /// Create a renderer from a settings file
    pub fn from_settings_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(ShadowSettings::load(path)?))
    }

    /// Set the depth convention of the target API
    pub fn with_depth_range(mut self, depth_range: DepthRange) -> Self {
        self.depth_range = depth_range;
        self
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Replace settings (hot reload); takes effect next frame
    pub fn set_settings(&mut self, mut settings: ShadowSettings) {
        settings.validate();
        self.settings = settings;
    }

    /// State of the last rendered frame
    pub fn state(&self) -> &FrameState {
        &self.state
    }

    /// Shader-facing output of the last rendered frame
    pub fn packed(&self) -> &PackedLightingState {
        &self.state.packed
    }

    /// Commands recorded by the last rendered frame
    pub fn commands(&self) -> &ShadowCommandBuffer {
        &self.state.commands
    }

    /// Hand the recorded frame to the external renderer
    pub fn submit(&mut self, executor: &mut dyn ShadowCommandExecutor) {
        self.state.commands.submit(executor);
        executor.upload_lighting(&self.state.packed);
    }

    /// Render shadows for `camera`
    pub fn render<S: SceneCuller>(&mut self, camera: &Camera, culler: &mut S) -> FrameOutcome {
        let Some(culling) = culler.cull(camera, self.settings.max_distance) else {
            log::warn!("Skipping camera '{}': no culling parameters", camera.name);
            return FrameOutcome::Skipped(SkipReason::CullingUnavailable);
        };

        let cascade_count = self.settings.directional.cascade_count;
        self.state.reset(cascade_count);

        let state = &mut self.state;
        state.commands.push(ShadowCommand::BeginSample(SHADOWS_SAMPLE));

        let lights = self
            .aggregator
            .aggregate(&culling, &mut state.reservations, &mut state.lights);

        let reserved = state.reservations.count() as u32;
        state.layout = AtlasLayout::plan(reserved, cascade_count, self.settings.directional.atlas_size);
        state.commands.push(ShadowCommand::GetTemporaryAtlas(state.layout.texture_desc()));

        let packer = ShadowParameterPacker::new(&self.settings);
        let mut enabled_keywords = Vec::new();

        if reserved > 0 {
            state.commands.push(ShadowCommand::SetRenderTarget);
            state.commands.push(ShadowCommand::ClearDepth);

            CascadeComputer::new(&self.settings.directional, &state.layout, self.depth_range).render(
                state.reservations.reservations(),
                &culling,
                &mut state.cascades,
                &mut state.commands,
            );

            enabled_keywords = packer.select_keywords(&mut state.commands);
        }

        state.commands.push(ShadowCommand::EndSample(SHADOWS_SAMPLE));

        state.packed = PackedLightingState {
            lights: packer.pack_lights(&state.lights),
            shadows: packer.pack_shadows(&state.layout, &state.cascades),
            visible_light_count: culling.visible_lights().len(),
            enabled_keywords,
        };

        state.commands.push(ShadowCommand::ReleaseTemporaryAtlas);

        let report = FrameReport {
            camera: camera.name.clone(),
            lights,
            reservations: *state.reservations.stats(),
            layout: state.layout,
            cascades_rendered: state.cascades.cascades.len(),
            commands: ShadowCommandStats::from_buffer(&state.commands),
        };

        log::debug!(
            "Camera '{}': {} directional lights, {} shadowed, atlas split {}",
            report.camera,
            report.lights.directional,
            reserved,
            report.layout.split
        );

        FrameOutcome::Rendered(report)
    }

    /// World-space culling spheres of the last frame, `w` holding the
    /// squared shrunk radius
    pub fn culling_spheres(&self) -> &[Vec4] {
        let count = self.state.packed.shadows.cascade_count as usize;
        &self.state.cascades.culling_spheres[..count]
    }
}

/// Renders a list of cameras with one shared renderer
#[derive(Clone, Debug)]
pub struct RenderPipeline {
    renderer: CameraRenderer,
}

impl RenderPipeline {
    pub fn new(settings: ShadowSettings) -> Self {
        Self {
            renderer: CameraRenderer::new(settings),
        }
    }

    pub fn with_depth_range(mut self, depth_range: DepthRange) -> Self {
        self.renderer = self.renderer.with_depth_range(depth_range);
        self
    }

    pub fn renderer(&self) -> &CameraRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut CameraRenderer {
        &mut self.renderer
    }

    /// Render every camera in order, submitting each rendered frame
    pub fn render<S: SceneCuller>(
        &mut self,
        cameras: &[Camera],
        culler: &mut S,
        executor: &mut dyn ShadowCommandExecutor,
    ) -> Vec<FrameOutcome> {
        cameras
            .iter()
            .map(|camera| {
                let outcome = self.renderer.render(camera, culler);
                if outcome.is_rendered() {
                    self.renderer.submit(executor);
                }
                outcome
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::FrustumShadowCuller;
    use crate::light::{LightShadows, VisibleLight};
    use crate::bounds::AABB;
    use glam::Vec3;

    fn scene(shadowed: usize) -> FrustumShadowCuller {
        let mut culler = FrustumShadowCuller::new();
        for i in 0..shadowed {
            culler.add_light(
                VisibleLight::directional(Vec3::new(0.2 * i as f32, -1.0, 0.3), Vec3::ONE, 1.0)
                    .with_shadows(LightShadows::Hard, 1.0),
            );
        }
        culler.add_caster(AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0)));
        culler
    }

    fn camera() -> Camera {
        Camera::looking_at("main", Vec3::new(0.0, 5.0, -15.0), Vec3::ZERO)
    }

    #[test]
    fn test_skipped_camera_keeps_no_commands() {
        let mut renderer = CameraRenderer::new(ShadowSettings::default());
        let mut culler = scene(1);
        let mut cam = camera();
        cam.aspect = 0.0;

        let outcome = renderer.render(&cam, &mut culler);
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::CullingUnavailable));
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_state_reset_between_frames() {
        let mut renderer = CameraRenderer::new(ShadowSettings::default());

        let mut busy = scene(2);
        renderer.render(&camera(), &mut busy);
        assert_eq!(renderer.packed().directional_light_count(), 2);
        assert_eq!(renderer.state().cascades.atlas_matrices().len(), 8);

        let mut empty = scene(0);
        let outcome = renderer.render(&camera(), &mut empty);
        let report = outcome.report().unwrap();
        assert!(report.layout.is_placeholder());
        assert_eq!(renderer.packed().directional_light_count(), 0);
        assert_eq!(renderer.packed().lights.colors[1], [0.0; 4]);
        assert_eq!(renderer.packed().shadows.cascade_count, 0);
        assert!(renderer.state().cascades.atlas_matrices().is_empty());
        assert!(renderer.culling_spheres().is_empty());
    }

    #[test]
    fn test_settings_are_validated() {
        let mut settings = ShadowSettings::default();
        settings.directional.cascade_count = 9;
        let mut renderer = CameraRenderer::new(settings.clone());
        assert_eq!(renderer.settings().directional.cascade_count, 4);

        settings.directional.cascade_count = 0;
        renderer.set_settings(settings);
        assert_eq!(renderer.settings().directional.cascade_count, 1);
    }

    #[test]
    fn test_nan_settings_still_render() {
        let mut settings = ShadowSettings::default();
        settings.directional.cascade_ratios = [f32::NAN, 0.2, 0.3];
        settings.directional.cascade_fade = f32::NAN;
        let mut renderer = CameraRenderer::new(settings);

        let dir = &renderer.settings().directional;
        assert_eq!(dir.cascade_ratios, [0.0, 0.2, 0.3]);
        assert!(dir.cascade_fade.is_finite());

        let mut culler = scene(1);
        assert!(renderer.render(&camera(), &mut culler).is_rendered());
        assert!(renderer.packed().shadows.distance_fade.iter().all(|v| !v.is_nan()));
    }
}
