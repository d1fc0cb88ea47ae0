//! Visible Light Descriptors
//!
//! Per-frame light records produced by the culling collaborator. The shadow
//! core only reads them.

use serde::{Serialize, Deserialize};
use glam::{Mat4, Vec3, Vec4};

/// Kind of a visible light
///
/// Closed set: adding a kind must update every match in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
    Area,
}

/// Shadow casting mode of a light
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightShadows {
    #[default]
    None,
    Hard,
    Soft,
}

/// A light that survived visibility culling this frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibleLight {
    /// Light kind
    pub kind: LightKind,

    /// Local-to-world transform; column 2 is the light's forward axis
    pub local_to_world: Mat4,

    /// Linear color premultiplied by intensity
    pub final_color: Vec4,

    /// Shadow casting mode
    pub shadows: LightShadows,

    /// Shadow strength (0 = no shadow, 1 = full shadow)
    pub shadow_strength: f32,

    /// Slope-scaled depth bias applied while rendering the shadow map
    pub shadow_bias: f32,

    /// Normal-based offset applied when sampling
    pub shadow_normal_bias: f32,

    /// Pulls the shadow camera's near plane back to catch tall casters
    pub shadow_near_plane: f32,
}

impl VisibleLight {
    /// Create a directional light facing `direction`
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            local_to_world: facing(direction, Vec3::ZERO),
            final_color: (color * intensity).extend(1.0),
            shadows: LightShadows::None,
            shadow_strength: 1.0,
            shadow_bias: 0.0,
            shadow_normal_bias: 1.0,
            shadow_near_plane: 0.0,
        }
    }

    /// Create a point light at `position`
    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            local_to_world: Mat4::from_translation(position),
            ..Self::directional(Vec3::Z, color, intensity)
        }
    }

    /// Enable shadows with the given mode and strength
    pub fn with_shadows(mut self, mode: LightShadows, strength: f32) -> Self {
        self.shadows = mode;
        self.shadow_strength = strength.clamp(0.0, 1.0);
        self
    }

    /// Set slope-scale and normal bias
    pub fn with_bias(mut self, slope_bias: f32, normal_bias: f32) -> Self {
        self.shadow_bias = slope_bias;
        self.shadow_normal_bias = normal_bias;
        self
    }

    /// Set the shadow near-plane offset
    pub fn with_near_plane(mut self, offset: f32) -> Self {
        self.shadow_near_plane = offset;
        self
    }

    /// World-space forward axis
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.local_to_world.z_axis.truncate()
    }

    /// Direction towards the light, as the shading stage expects it
    #[inline]
    pub fn direction_to_light(&self) -> Vec4 {
        -self.local_to_world.z_axis
    }

    #[inline]
    pub fn casts_shadows(&self) -> bool {
        self.shadows != LightShadows::None
    }
}

/// Rigid transform whose local +Z axis points along `forward`
fn facing(forward: Vec3, position: Vec3) -> Mat4 {
    let forward = forward.normalize();
    let hint = if forward.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let right = hint.cross(forward).normalize();

    Mat4::from_cols(
        right.extend(0.0),
        forward.cross(right).extend(0.0),
        forward.extend(0.0),
        position.extend(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_light() {
        let light = VisibleLight::directional(Vec3::NEG_Y, Vec3::ONE, 2.0);
        assert_eq!(light.kind, LightKind::Directional);
        assert_eq!(light.final_color, Vec4::new(2.0, 2.0, 2.0, 1.0));
        assert!((light.forward() - Vec3::NEG_Y).length() < 1e-6);
        assert!((light.direction_to_light().truncate() - Vec3::Y).length() < 1e-6);
        assert!(!light.casts_shadows());
    }

    #[test]
    fn test_builder_clamps_strength() {
        let light = VisibleLight::directional(Vec3::NEG_Y, Vec3::ONE, 1.0)
            .with_shadows(LightShadows::Soft, 3.0)
            .with_bias(1.5, 0.4)
            .with_near_plane(2.0);
        assert_eq!(light.shadow_strength, 1.0);
        assert_eq!(light.shadow_bias, 1.5);
        assert_eq!(light.shadow_normal_bias, 0.4);
        assert_eq!(light.shadow_near_plane, 2.0);
        assert!(light.casts_shadows());
    }

    #[test]
    fn test_point_light_keeps_kind() {
        let light = VisibleLight::point(Vec3::new(1.0, 2.0, 3.0), Vec3::ONE, 5.0);
        assert_eq!(light.kind, LightKind::Point);
        assert_eq!(light.local_to_world.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_facing_basis_is_orthonormal() {
        for direction in [Vec3::new(0.3, -1.0, 0.2), Vec3::NEG_Y, Vec3::X] {
            let m = facing(direction, Vec3::ZERO);
            let forward = direction.normalize();
            assert!((m.z_axis.truncate() - forward).length() < 1e-5);
            assert!(m.x_axis.truncate().dot(forward).abs() < 1e-5);
            assert!(m.y_axis.truncate().dot(forward).abs() < 1e-5);
            assert!((m.x_axis.truncate().length() - 1.0).abs() < 1e-5);
        }
    }
}
