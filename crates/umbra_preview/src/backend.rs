//! Logging backend
//!
//! Stands in for a GPU renderer. It replays shadow commands, tracks the
//! state a real backend would hold and reports anything out of order.

use std::collections::BTreeMap;

use umbra_render::prelude::*;

/// Replays shadow commands into the log
#[derive(Debug, Default)]
pub struct LoggingBackend {
    /// Open profiling samples
    samples: Vec<&'static str>,
    /// Size of the currently allocated atlas
    atlas: Option<(u32, u32)>,
    /// Slope bias currently set
    slope_bias: f32,
    /// Global keyword state
    keywords: BTreeMap<&'static str, bool>,

    commands: u64,
    draws: u64,
    uploads: u64,
    errors: u64,
}

impl LoggingBackend {
    fn error(&mut self, message: String) {
        self.errors += 1;
        log::error!("{}", message);
    }

    /// Log totals for the session
    pub fn print_summary(&self) {
        log::info!(
            "Backend: {} commands, {} caster draws, {} uploads, {} ordering errors",
            self.commands,
            self.draws,
            self.uploads,
            self.errors
        );

        let enabled: Vec<_> = self
            .keywords
            .iter()
            .filter(|(_, &on)| on)
            .map(|(name, _)| *name)
            .collect();
        log::info!("Backend: keywords left enabled {:?}", enabled);
    }
}

impl ShadowCommandExecutor for LoggingBackend {
    fn execute(&mut self, command: &ShadowCommand) {
        self.commands += 1;
        log::trace!("{:?}", command);

        match command {
            ShadowCommand::BeginSample(name) => self.samples.push(*name),
            ShadowCommand::EndSample(name) => {
                if self.samples.pop() != Some(*name) {
                    self.error(format!("EndSample('{}') without matching BeginSample", name));
                }
            }
            ShadowCommand::GetTemporaryAtlas(desc) => {
                if self.atlas.is_some() {
                    self.error("Atlas allocated twice".to_string());
                }
                log::debug!(
                    "Allocate '{}' {}x{} ({}-bit depth)",
                    desc.name,
                    desc.width,
                    desc.height,
                    desc.depth_bits
                );
                self.atlas = Some((desc.width, desc.height));
            }
            ShadowCommand::SetRenderTarget | ShadowCommand::ClearDepth => {
                if self.atlas.is_none() {
                    self.error(format!("{:?} without an atlas", command));
                }
            }
            ShadowCommand::SetViewport(viewport) => {
                if let Some((width, height)) = self.atlas {
                    if viewport.x + viewport.width > width as f32
                        || viewport.y + viewport.height > height as f32
                    {
                        self.error(format!("Viewport {:?} outside {}x{} atlas", viewport, width, height));
                    }
                }
            }
            ShadowCommand::SetViewProjection { .. } => {}
            ShadowCommand::SetDepthBias { slope, .. } => self.slope_bias = *slope,
            ShadowCommand::DrawShadows {
                visible_light_index,
                cascade_index,
                split,
            } => {
                self.draws += 1;
                log::debug!(
                    "Draw casters of light {} cascade {} (sphere r={:.2}, blend cull {:.2}, slope bias {:.2})",
                    visible_light_index,
                    cascade_index,
                    split.culling_sphere.radius,
                    split.blend_culling_factor,
                    self.slope_bias
                );
            }
            ShadowCommand::SetKeyword { keyword, enabled } => {
                self.keywords.insert(*keyword, *enabled);
            }
            ShadowCommand::ReleaseTemporaryAtlas => {
                if self.atlas.take().is_none() {
                    self.error("Released an atlas that was never allocated".to_string());
                }
                if self.slope_bias != 0.0 {
                    self.error(format!("Depth bias {} left set after the frame", self.slope_bias));
                }
            }
        }
    }

    fn upload_lighting(&mut self, state: &PackedLightingState) {
        self.uploads += 1;
        log::debug!(
            "Upload {} of {} visible lights as directional, {} cascades, keywords {:?} ({} + {} bytes)",
            state.directional_light_count(),
            state.visible_light_count,
            state.shadows.cascade_count,
            state.enabled_keywords,
            state.lights_bytes().len(),
            state.shadows_bytes().len()
        );

        let count = state.shadows.cascade_count as usize;
        for (level, sphere) in state.shadows.culling_spheres.iter().take(count).enumerate() {
            log::trace!(
                "  cascade {} sphere center ({:.2}, {:.2}, {:.2}) r^2 {:.2}",
                level,
                sphere[0],
                sphere[1],
                sphere[2],
                sphere[3]
            );
        }
    }
}
