//! Light Extraction
//!
//! Walks the frame's visible lights once, packs directional light color and
//! direction, and reserves shadow tiles for the directional lights that cast
//! shadows. Other light kinds are counted but not handled by this core.
//!
//! # Usage
//!
//! ```ignore
//! arrays.reset();
//! table.reset(settings.directional.cascade_count);
//!
//! let stats = LightAggregator::new().aggregate(&culling, &mut table, &mut arrays);
//! if !table.is_empty() {
//!     // plan the atlas and render cascades
//! }
//! ```

use serde::{Serialize, Deserialize};

use crate::culling::ShadowCullingResults;
use crate::light::LightKind;
use crate::shadow::data::{DirectionalLightArrays, MAX_DIRECTIONAL_LIGHTS};
use crate::shadow::reservation::{DirectionalShadowData, LightReservationTable};

/// Light extraction statistics for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightExtractionStats {
    /// Lights reported visible by the culler
    pub visible: usize,
    /// Directional lights packed into the arrays
    pub directional: usize,
    /// Directional lights dropped because the arrays were full
    pub directional_overflow: usize,
    /// Directional lights that received shadow tiles
    pub shadowed: usize,
    /// Point, spot and area lights
    pub other: usize,
}

/// Per-frame directional light aggregation
#[derive(Clone, Debug, Default)]
pub struct LightAggregator {
    stats: LightExtractionStats,
}

impl LightAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack directional lights and reserve their shadows
    ///
    /// `arrays` and `table` must have been reset for this frame.
    pub fn aggregate<C: ShadowCullingResults + ?Sized>(
        &mut self,
        culling: &C,
        table: &mut LightReservationTable,
        arrays: &mut DirectionalLightArrays,
    ) -> LightExtractionStats {
        let lights = culling.visible_lights();
        self.stats = LightExtractionStats {
            visible: lights.len(),
            ..Default::default()
        };

        for (visible_index, light) in lights.iter().enumerate() {
            match light.kind {
                LightKind::Directional => {
                    if arrays.count >= MAX_DIRECTIONAL_LIGHTS {
                        self.stats.directional_overflow += 1;
                        continue;
                    }

                    let slot = arrays.count;
                    arrays.colors[slot] = light.final_color;
                    arrays.directions[slot] = light.direction_to_light();
                    arrays.shadow_data[slot] = match table.reserve(light, visible_index, culling) {
                        Ok(data) => {
                            self.stats.shadowed += 1;
                            data
                        }
                        Err(_) => DirectionalShadowData::ZERO,
                    };
                    arrays.count += 1;
                }
                LightKind::Point | LightKind::Spot | LightKind::Area => {
                    self.stats.other += 1;
                }
            }
        }

        self.stats.directional = arrays.count;

        if self.stats.directional_overflow > 0 {
            log::debug!(
                "{} directional lights over the limit of {} were ignored",
                self.stats.directional_overflow,
                MAX_DIRECTIONAL_LIGHTS
            );
        }

        self.stats
    }

    /// Statistics of the last aggregation
    pub fn stats(&self) -> LightExtractionStats {
        self.stats
    }
}
