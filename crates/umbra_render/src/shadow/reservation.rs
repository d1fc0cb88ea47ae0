//! Shadowed Light Reservation
//!
//! Decides which directional lights get shadow tiles this frame. Reservation
//! order fixes tile order: light `i` owns tiles `i * cascade_count ..`.

use bytemuck::{Pod, Zeroable};
use serde::{Serialize, Deserialize};

use crate::culling::ShadowCullingResults;
use crate::light::{LightShadows, VisibleLight};

/// Maximum directional lights with shadow maps per frame
pub const MAX_SHADOWED_DIRECTIONAL_LIGHTS: usize = 4;

/// Per-light shadow data handed to the shading stage
///
/// `(strength, tile_index, normal_bias)`. A zero strength means unshadowed.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DirectionalShadowData {
    /// Shadow strength (0 = unshadowed)
    pub strength: f32,
    /// First atlas tile of this light
    pub tile_index: f32,
    /// Normal bias applied when sampling
    pub normal_bias: f32,
}

impl DirectionalShadowData {
    pub const ZERO: Self = Self {
        strength: 0.0,
        tile_index: 0.0,
        normal_bias: 0.0,
    };

    /// Padded to a shader `float4`
    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.strength, self.tile_index, self.normal_bias, 0.0]
    }
}

/// A directional light admitted for shadow rendering
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShadowReservation {
    /// Index into the frame's visible lights
    pub visible_light_index: usize,
    /// Slope-scaled depth bias used while drawing casters
    pub slope_scale_bias: f32,
    /// Shadow camera near-plane offset
    pub near_plane_offset: f32,
}

/// Why a light was not given a shadow map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservationRejected {
    /// All shadow slots are taken
    CapacityExceeded,
    /// Light shadow mode is `None`
    ShadowsDisabled,
    /// Shadow strength is zero
    ZeroStrength,
    /// No casters within the shadow distance
    NoShadowCasters,
}

/// Rejection counters for the current frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReservationStats {
    pub capacity_exceeded: u32,
    pub shadows_disabled: u32,
    pub zero_strength: u32,
    pub no_shadow_casters: u32,
}

impl ReservationStats {
    fn record(&mut self, reason: ReservationRejected) {
        match reason {
            ReservationRejected::CapacityExceeded => self.capacity_exceeded += 1,
            ReservationRejected::ShadowsDisabled => self.shadows_disabled += 1,
            ReservationRejected::ZeroStrength => self.zero_strength += 1,
            ReservationRejected::NoShadowCasters => self.no_shadow_casters += 1,
        }
    }

    /// Total rejected reservations
    pub fn total(&self) -> u32 {
        self.capacity_exceeded + self.shadows_disabled + self.zero_strength + self.no_shadow_casters
    }
}

/// Fixed-capacity table of this frame's shadowed directional lights
#[derive(Clone, Debug)]
pub struct LightReservationTable {
    reservations: [ShadowReservation; MAX_SHADOWED_DIRECTIONAL_LIGHTS],
    count: usize,
    cascade_count: u32,
    stats: ReservationStats,
}

impl LightReservationTable {
    pub fn new(cascade_count: u32) -> Self {
        Self {
            reservations: [ShadowReservation::default(); MAX_SHADOWED_DIRECTIONAL_LIGHTS],
            count: 0,
            cascade_count,
            stats: ReservationStats::default(),
        }
    }

    /// Clear all reservations and counters for a new frame
    pub fn reset(&mut self, cascade_count: u32) {
        self.reservations = [ShadowReservation::default(); MAX_SHADOWED_DIRECTIONAL_LIGHTS];
        self.count = 0;
        self.cascade_count = cascade_count;
        self.stats = ReservationStats::default();
    }

    /// Try to reserve shadow tiles for a directional light
    ///
    /// Must be called once per directional light, before layout planning.
    pub fn reserve<C: ShadowCullingResults + ?Sized>(
        &mut self,
        light: &VisibleLight,
        visible_light_index: usize,
        culling: &C,
    ) -> Result<DirectionalShadowData, ReservationRejected> {
        let verdict = self.admit(light, visible_light_index, culling);

        match verdict {
            Ok(()) => {
                let tile_index = self.cascade_count as usize * self.count;
                self.reservations[self.count] = ShadowReservation {
                    visible_light_index,
                    slope_scale_bias: light.shadow_bias,
                    near_plane_offset: light.shadow_near_plane,
                };
                self.count += 1;

                Ok(DirectionalShadowData {
                    strength: light.shadow_strength,
                    tile_index: tile_index as f32,
                    normal_bias: light.shadow_normal_bias,
                })
            }
            Err(reason) => {
                log::debug!(
                    "Directional light {} left unshadowed: {:?}",
                    visible_light_index,
                    reason
                );
                self.stats.record(reason);
                Err(reason)
            }
        }
    }

    fn admit<C: ShadowCullingResults + ?Sized>(
        &self,
        light: &VisibleLight,
        visible_light_index: usize,
        culling: &C,
    ) -> Result<(), ReservationRejected> {
        if self.count >= MAX_SHADOWED_DIRECTIONAL_LIGHTS {
            return Err(ReservationRejected::CapacityExceeded);
        }
        if light.shadows == LightShadows::None {
            return Err(ReservationRejected::ShadowsDisabled);
        }
        if light.shadow_strength <= 0.0 {
            return Err(ReservationRejected::ZeroStrength);
        }
        if culling.shadow_caster_bounds(visible_light_index).is_none() {
            return Err(ReservationRejected::NoShadowCasters);
        }
        Ok(())
    }

    /// Number of admitted lights
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Cascade count the tile indices were computed with
    #[inline]
    pub fn cascade_count(&self) -> u32 {
        self.cascade_count
    }

    /// Admitted lights in tile order
    pub fn reservations(&self) -> &[ShadowReservation] {
        &self.reservations[..self.count]
    }

    pub fn stats(&self) -> &ReservationStats {
        &self.stats
    }
}

impl Default for LightReservationTable {
    fn default() -> Self {
        Self::new(super::cascade::MAX_CASCADES as u32)
    }
}
