//! # umbra_render - Cascaded Directional Shadow Core
//!
//! Backend-agnostic shadow planning for a forward renderer:
//! - Shadowed light reservation with a fixed budget
//! - Atlas tiling for all cascades of all shadowed lights
//! - Per-cascade culling spheres and clip-to-atlas matrices
//! - Flat GPU uniforms for the shading stage
//!
//! ## Architecture
//!
//! Visibility and caster drawing belong to an external collaborator,
//! reached through the [`culling`] traits. The core records its GPU work as
//! [`shadow::ShadowCommand`]s and hands the shading stage a
//! [`shadow::PackedLightingState`].
//!
//! ## Example
//!
//! ```ignore
//! use umbra_render::prelude::*;
//!
//! let mut culler = FrustumShadowCuller::new();
//! culler.add_light(
//!     VisibleLight::directional(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE, 1.0)
//!         .with_shadows(LightShadows::Soft, 1.0),
//! );
//! culler.add_caster(AABB::from_center_half_extents(Vec3::ZERO, Vec3::ONE));
//!
//! let mut pipeline = RenderPipeline::new(ShadowSettings::default());
//! let outcomes = pipeline.render(&cameras, &mut culler, &mut backend);
//! ```

pub mod error;
pub mod bounds;
pub mod light;
pub mod culling;
pub mod light_extraction;
pub mod shadow;
pub mod frame;

pub use error::{ConfigError, RenderError, Result};

pub use bounds::{Sphere, AABB};

pub use light::{LightKind, LightShadows, VisibleLight};

pub use culling::{
    Camera, DirectionalShadowMatrices, DirectionalShadowRequest, FrustumCullingResults,
    FrustumShadowCuller, SceneCuller, ShadowCaster, ShadowCullingResults, ShadowSplitData,
};

pub use light_extraction::{LightAggregator, LightExtractionStats};

pub use frame::{
    CameraRenderer, FrameOutcome, FrameReport, FrameState, RenderPipeline, SkipReason,
};

pub mod prelude {
    pub use crate::culling::{
        Camera, FrustumShadowCuller, SceneCuller, ShadowCullingResults,
    };
    pub use crate::frame::{CameraRenderer, FrameOutcome, RenderPipeline};
    pub use crate::light::{LightKind, LightShadows, VisibleLight};
    pub use crate::shadow::{
        CascadeBlendMode, DepthRange, FilterMode, PackedLightingState, ShadowCommand,
        ShadowCommandExecutor, ShadowQuality, ShadowSettings,
    };
    pub use crate::bounds::{Sphere, AABB};
    pub use glam::{Mat4, Vec2, Vec3, Vec4};
}
