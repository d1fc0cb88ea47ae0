//! Directional Shadow Atlas System
//!
//! Backend-agnostic planning for cascaded directional light shadows rendered
//! into one shared atlas texture.
//!
//! # Architecture
//!
//! The shadow system is split into:
//!
//! - **Config**: Global and directional shadow settings
//! - **Reservation**: Which directional lights get shadow tiles this frame
//! - **Atlas**: Tile grid layout of the shared atlas
//! - **Cascade**: Per-cascade culling spheres, cascade data and draw commands
//! - **Atlas Matrix**: Clip-space to atlas-UV remapping
//! - **Commands**: Recorded instructions for the external renderer
//! - **Data**: GPU-ready data structures for shader uniforms
//!
//! # Usage
//!
//! ```ignore
//! use umbra_render::shadow::*;
//!
//! let mut table = LightReservationTable::new(settings.directional.cascade_count);
//! let data = table.reserve(&light, visible_index, &culling)?;
//!
//! let layout = AtlasLayout::plan(
//!     table.count() as u32,
//!     settings.directional.cascade_count,
//!     settings.directional.atlas_size,
//! );
//!
//! CascadeComputer::new(&settings.directional, &layout, DepthRange::Standard)
//!     .render(table.reservations(), &culling, &mut outputs, &mut commands);
//!
//! let packer = ShadowParameterPacker::new(&settings);
//! let bytes = packer.pack_shadows(&layout, &outputs).as_bytes();
//! ```
//!
//! # Hot-Reload Support
//!
//! Settings support serde serialization and can be swapped between frames.
//! Everything else is rebuilt every frame.

pub mod config;
pub mod reservation;
pub mod atlas;
pub mod atlas_matrix;
pub mod cascade;
pub mod commands;
pub mod data;

// Re-exports
pub use config::{
    ShadowSettings,
    DirectionalShadowSettings,
    FilterMode,
    CascadeBlendMode,
    ShadowQuality,
    MIN_ATLAS_SIZE,
    MAX_ATLAS_SIZE,
};

pub use reservation::{
    LightReservationTable,
    ShadowReservation,
    DirectionalShadowData,
    ReservationRejected,
    ReservationStats,
    MAX_SHADOWED_DIRECTIONAL_LIGHTS,
};

pub use atlas::{
    AtlasLayout,
    AtlasTextureDesc,
    Viewport,
    DIRECTIONAL_SHADOW_ATLAS,
};

pub use atlas_matrix::{to_atlas_matrix, DepthRange};

pub use cascade::{
    Cascade,
    CascadeComputer,
    CascadeCulling,
    CascadeOutputs,
    cascade_culling,
    select_cascade,
    MAX_CASCADES,
    MAX_ATLAS_MATRICES,
};

pub use commands::{
    ShadowCommand,
    ShadowCommandBuffer,
    ShadowCommandExecutor,
    ShadowCommandStats,
    SHADOWS_SAMPLE,
};

pub use data::{
    GpuDirectionalLights,
    GpuDirectionalShadows,
    DirectionalLightArrays,
    PackedLightingState,
    ShadowParameterPacker,
    MAX_DIRECTIONAL_LIGHTS,
};
