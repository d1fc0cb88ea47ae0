//! Shadow Atlas Layout
//!
//! Backend-agnostic tiling of the single shadow atlas. This module decides
//! how the atlas is divided between cascades, but does not create GPU
//! resources directly.
//!
//! # Atlas Organization
//!
//! The atlas is one square depth texture split into a `split x split` grid
//! of equal tiles. Tile `i` sits at column `i % split`, row `i / split`.
//! With no shadowed lights the atlas degrades to a 1x1 placeholder so the
//! shading stage always has a texture to bind.

use glam::Vec2;
use serde::{Serialize, Deserialize};

/// Shader property name of the atlas texture
pub const DIRECTIONAL_SHADOW_ATLAS: &str = "_DirectionalShadowAtlas";

/// Tiling of the shadow atlas for one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasLayout {
    /// Atlas edge in texels
    pub resolution: u32,
    /// Tiles per atlas edge (1, 2 or 4)
    pub split: u32,
    /// Tile edge in texels
    pub tile_size: u32,
    /// Tiles actually used
    pub tile_count: u32,
}

impl AtlasLayout {
    /// Plan the tiling for `reserved` lights with `cascade_count` cascades each
    pub fn plan(reserved: u32, cascade_count: u32, resolution: u32) -> Self {
        if reserved == 0 {
            return Self::placeholder();
        }

        let tiles = reserved * cascade_count;
        let split = Self::split_for(tiles);

        let layout = Self {
            resolution,
            split,
            tile_size: resolution / split,
            tile_count: tiles,
        };
        log::debug!(
            "Shadow atlas {}x{}: {} tiles, split {}, tile size {}",
            resolution,
            resolution,
            tiles,
            split,
            layout.tile_size
        );
        layout
    }

    /// 1x1 atlas bound when nothing casts shadows
    pub const fn placeholder() -> Self {
        Self {
            resolution: 1,
            split: 1,
            tile_size: 1,
            tile_count: 0,
        }
    }

    /// Smallest grid that fits `tiles`
    #[inline]
    pub fn split_for(tiles: u32) -> u32 {
        if tiles <= 1 {
            1
        } else if tiles <= 4 {
            2
        } else {
            4
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.tile_count == 0
    }

    /// Grid position of a tile as `(column, row)`
    #[inline]
    pub fn tile_offset(&self, index: u32) -> Vec2 {
        Vec2::new((index % self.split) as f32, (index / self.split) as f32)
    }

    /// Pixel rectangle of a tile
    pub fn tile_viewport(&self, index: u32) -> Viewport {
        let offset = self.tile_offset(index);
        let size = self.tile_size as f32;
        Viewport {
            x: offset.x * size,
            y: offset.y * size,
            width: size,
            height: size,
        }
    }

    /// `(size, 1 / size)` for texel-space math in the shading stage
    #[inline]
    pub fn atlas_size_vector(&self) -> [f32; 4] {
        let size = self.resolution as f32;
        [size, 1.0 / size, 0.0, 0.0]
    }

    /// Fraction of the atlas covered by used tiles
    pub fn utilization(&self) -> f32 {
        if self.is_placeholder() {
            return 0.0;
        }
        self.tile_count as f32 / (self.split * self.split) as f32
    }

    /// Texture to allocate for this layout
    pub fn texture_desc(&self) -> AtlasTextureDesc {
        AtlasTextureDesc {
            name: DIRECTIONAL_SHADOW_ATLAS,
            width: self.resolution,
            height: self.resolution,
            depth_bits: 32,
        }
    }
}

/// Pixel rectangle inside the atlas
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Description of the temporary atlas render target
///
/// Always sampled bilinear with depth comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasTextureDesc {
    /// Shader property the texture is bound to
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    /// Depth buffer precision
    pub depth_bits: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_selection() {
        assert_eq!(AtlasLayout::split_for(1), 1);
        for tiles in 2..=4 {
            assert_eq!(AtlasLayout::split_for(tiles), 2);
        }
        for tiles in 5..=16 {
            assert_eq!(AtlasLayout::split_for(tiles), 4);
        }
    }

    #[test]
    fn test_plan_one_light_four_cascades() {
        let layout = AtlasLayout::plan(1, 4, 1024);
        assert_eq!(layout.split, 2);
        assert_eq!(layout.tile_size, 512);
        assert_eq!(layout.tile_count, 4);
        assert_eq!(layout.utilization(), 1.0);
    }

    #[test]
    fn test_plan_single_tile() {
        let layout = AtlasLayout::plan(1, 1, 2048);
        assert_eq!(layout.split, 1);
        assert_eq!(layout.tile_size, 2048);
    }

    #[test]
    fn test_plan_many_tiles() {
        let layout = AtlasLayout::plan(3, 2, 4096);
        assert_eq!(layout.split, 4);
        assert_eq!(layout.tile_size, 1024);
        assert!((layout.utilization() - 6.0 / 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_placeholder() {
        let layout = AtlasLayout::plan(0, 4, 1024);
        assert_eq!(layout, AtlasLayout::placeholder());
        assert!(layout.is_placeholder());
        assert_eq!(layout.resolution, 1);
        assert_eq!(layout.utilization(), 0.0);

        let desc = layout.texture_desc();
        assert_eq!((desc.width, desc.height), (1, 1));
        assert_eq!(desc.depth_bits, 32);
    }

    #[test]
    fn test_tile_offsets_and_viewports() {
        let layout = AtlasLayout::plan(1, 4, 1024);
        let offsets: Vec<_> = (0..4).map(|i| layout.tile_offset(i)).collect();
        assert_eq!(
            offsets,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
            ]
        );

        let vp = layout.tile_viewport(3);
        assert_eq!(vp, Viewport { x: 512.0, y: 512.0, width: 512.0, height: 512.0 });
    }

    #[test]
    fn test_atlas_size_vector() {
        let layout = AtlasLayout::plan(2, 2, 2048);
        assert_eq!(layout.atlas_size_vector(), [2048.0, 1.0 / 2048.0, 0.0, 0.0]);
    }
}
