//! Shadow Command Stream
//!
//! The shadow core never talks to a GPU. It records [`ShadowCommand`]s into a
//! [`ShadowCommandBuffer`], and the external renderer replays them through a
//! [`ShadowCommandExecutor`].
//!
//! # Command Order per Cascade
//!
//! ```text
//! SetViewport -> SetViewProjection -> SetDepthBias(0, slope)
//!             -> DrawShadows -> SetDepthBias(0, 0)
//! ```

use serde::{Serialize, Deserialize};
use glam::Mat4;

use crate::culling::ShadowSplitData;
use super::atlas::{AtlasTextureDesc, Viewport};
use super::data::PackedLightingState;

/// Profiling sample name of the shadow pass
pub const SHADOWS_SAMPLE: &str = "Shadows";

/// A recorded instruction for the external renderer
#[derive(Clone, Debug, PartialEq)]
pub enum ShadowCommand {
    /// Open a profiling sample
    BeginSample(&'static str),

    /// Close a profiling sample
    EndSample(&'static str),

    /// Allocate the temporary shadow atlas
    GetTemporaryAtlas(AtlasTextureDesc),

    /// Bind the atlas as the depth render target
    SetRenderTarget,

    /// Clear depth of the bound target
    ClearDepth,

    /// Restrict drawing to a tile
    SetViewport(Viewport),

    /// Light camera matrices for the next draw
    SetViewProjection {
        view: Mat4,
        projection: Mat4,
    },

    /// Global depth bias state
    SetDepthBias {
        constant: f32,
        slope: f32,
    },

    /// Draw shadow casters of a light for one cascade
    DrawShadows {
        /// Index into the frame's visible lights
        visible_light_index: usize,
        /// Cascade level
        cascade_index: u32,
        /// Culling data for the casters
        split: ShadowSplitData,
    },

    /// Toggle a global shader keyword
    SetKeyword {
        keyword: &'static str,
        enabled: bool,
    },

    /// Release the temporary shadow atlas
    ReleaseTemporaryAtlas,
}

impl ShadowCommand {
    /// Depth bias used while drawing casters
    pub fn depth_bias(slope: f32) -> Self {
        Self::SetDepthBias {
            constant: 0.0,
            slope,
        }
    }

    /// Depth bias restored after each draw
    pub fn reset_depth_bias() -> Self {
        Self::depth_bias(0.0)
    }

    /// Check if this is a caster draw
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawShadows { .. })
    }
}

/// Consumer of recorded shadow commands
pub trait ShadowCommandExecutor {
    fn execute(&mut self, command: &ShadowCommand);

    /// Receive the frame's shader-facing state after the commands
    fn upload_lighting(&mut self, _state: &PackedLightingState) {}
}

/// Ordered list of shadow commands for one camera frame
#[derive(Clone, Debug, Default)]
pub struct ShadowCommandBuffer {
    commands: Vec<ShadowCommand>,
}

impl ShadowCommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: ShadowCommand) {
        self.commands.push(command);
    }

    /// Enable the keyword at `enabled_index` and disable every other one
    pub fn set_keywords(&mut self, keywords: &[&'static str], enabled_index: Option<usize>) {
        for (i, &keyword) in keywords.iter().enumerate() {
            self.push(ShadowCommand::SetKeyword {
                keyword,
                enabled: Some(i) == enabled_index,
            });
        }
    }

    /// Replay all commands and clear the buffer
    pub fn submit(&mut self, executor: &mut dyn ShadowCommandExecutor) {
        for command in &self.commands {
            executor.execute(command);
        }
        self.commands.clear();
    }

    pub fn commands(&self) -> &[ShadowCommand] {
        &self.commands
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShadowCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

/// Shadow command statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowCommandStats {
    /// Total commands recorded
    pub total_commands: u32,
    /// Caster draws
    pub draws: u32,
    /// Keyword toggles
    pub keyword_changes: u32,
}

impl ShadowCommandStats {
    /// Calculate statistics from a command buffer
    pub fn from_buffer(buffer: &ShadowCommandBuffer) -> Self {
        let mut stats = Self {
            total_commands: buffer.len() as u32,
            ..Self::default()
        };

        for command in buffer.iter() {
            match command {
                ShadowCommand::DrawShadows { .. } => stats.draws += 1,
                ShadowCommand::SetKeyword { .. } => stats.keyword_changes += 1,
                _ => {}
            }
        }

        stats
    }
}
