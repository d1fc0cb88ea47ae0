//! Demo scene for the preview
//!
//! A ground slab with a few boxes, a slowly turning sun, a fill light, a
//! light with shadows disabled and more directional lights than the shading
//! stage can take.

use umbra_render::prelude::*;

/// Degrees the sun turns per frame
const SUN_DEGREES_PER_FRAME: f32 = 15.0;

/// Build the scene as it looks at `frame`
pub fn build(frame: u32) -> FrustumShadowCuller {
    let mut culler = FrustumShadowCuller::new();

    let angle = (35.0 + SUN_DEGREES_PER_FRAME * frame as f32).to_radians();
    let sun_direction = Vec3::new(angle.cos() * 0.6, -1.0, angle.sin() * 0.6);
    culler.add_light(
        VisibleLight::directional(sun_direction, Vec3::new(1.0, 0.96, 0.88), 1.1)
            .with_shadows(LightShadows::Soft, 1.0)
            .with_bias(1.0, 0.4)
            .with_near_plane(2.0),
    );

    culler.add_light(VisibleLight::point(Vec3::new(3.0, 2.0, 4.0), Vec3::new(1.0, 0.5, 0.2), 4.0));

    culler.add_light(
        VisibleLight::directional(Vec3::new(-0.4, -0.6, -0.3), Vec3::new(0.4, 0.5, 0.7), 0.5)
            .with_shadows(LightShadows::Hard, 0.6)
            .with_bias(0.5, 0.8),
    );

    // Sky bounce, never shadowed
    culler.add_light(VisibleLight::directional(Vec3::Y, Vec3::new(0.2, 0.25, 0.3), 0.3));

    // Shadows requested but zero strength
    culler.add_light(
        VisibleLight::directional(Vec3::new(0.0, -0.5, 1.0), Vec3::ONE, 0.2)
            .with_shadows(LightShadows::Hard, 0.0),
    );

    // Beyond the directional light capacity
    culler.add_light(
        VisibleLight::directional(Vec3::new(1.0, -0.2, 0.0), Vec3::new(0.9, 0.2, 0.2), 0.1)
            .with_shadows(LightShadows::Soft, 1.0),
    );

    culler.add_caster(AABB::from_center_half_extents(Vec3::new(0.0, -0.5, 0.0), Vec3::new(40.0, 0.5, 40.0)));
    for (i, height) in [1.0_f32, 2.5, 4.0, 1.5].iter().enumerate() {
        let x = -6.0 + 4.0 * i as f32;
        culler.add_caster(AABB::from_center_half_extents(
            Vec3::new(x, *height, 3.0 * (i % 2) as f32),
            Vec3::new(1.0, *height, 1.0),
        ));
    }
    // Out of shadow range for the default distance
    culler.add_caster(AABB::from_center_half_extents(Vec3::new(0.0, 5.0, 400.0), Vec3::splat(5.0)));

    culler
}

/// Cameras rendered each frame; the last one is degenerate and gets skipped
pub fn cameras() -> Vec<Camera> {
    let main = Camera::looking_at("main", Vec3::new(0.0, 6.0, -18.0), Vec3::new(0.0, 1.0, 0.0));

    let mut overhead = Camera::looking_at("overhead", Vec3::new(10.0, 30.0, -10.0), Vec3::ZERO);
    overhead.far = 60.0;

    let mut broken = Camera::looking_at("broken", Vec3::new(0.0, 2.0, -5.0), Vec3::ZERO);
    broken.aspect = 0.0;

    vec![main, overhead, broken]
}
