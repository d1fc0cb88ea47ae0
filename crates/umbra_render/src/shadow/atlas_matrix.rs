//! Clip-to-atlas matrix conversion
//!
//! Turns a cascade's light view-projection into a matrix that maps world
//! positions straight to atlas UV and depth. X and Y land in the tile's
//! `1/split` sub-rectangle; depth uses the plain `[0, 1]` remap.

use glam::{Mat4, Vec2};
use serde::{Serialize, Deserialize};

/// Depth convention of the target graphics API
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthRange {
    /// Near maps to 0, far to 1
    #[default]
    Standard,
    /// Near maps to 1, far to 0
    Reversed,
}

/// Remap `clip` into atlas space for the tile at `offset` in a `split` grid
pub fn to_atlas_matrix(clip: Mat4, offset: Vec2, split: u32, depth_range: DepthRange) -> Mat4 {
    let mut depth = clip.row(2);
    if depth_range == DepthRange::Reversed {
        depth = -depth;
    }

    let scale = 1.0 / split as f32;
    let w = clip.row(3);
    let row0 = ((clip.row(0) + w) * 0.5 + w * offset.x) * scale;
    let row1 = ((clip.row(1) + w) * 0.5 + w * offset.y) * scale;
    let row2 = (depth + w) * 0.5;

    // glam stores columns; build from rows and transpose
    Mat4::from_cols(row0, row1, row2, w).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    fn from_rows(r0: Vec4, r1: Vec4, r2: Vec4, r3: Vec4) -> Mat4 {
        Mat4::from_cols(r0, r1, r2, r3).transpose()
    }

    fn ndc_remap() -> Mat4 {
        from_rows(
            Vec4::new(0.5, 0.0, 0.0, 0.5),
            Vec4::new(0.0, 0.5, 0.0, 0.5),
            Vec4::new(0.0, 0.0, 0.5, 0.5),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
        )
    }

    #[test]
    fn test_identity_gives_ndc_remap() {
        let m = to_atlas_matrix(Mat4::IDENTITY, Vec2::ZERO, 1, DepthRange::Standard);
        assert_eq!(m, ndc_remap());
    }

    #[test]
    fn test_tile_corners() {
        // Tile (1, 0) of a 2x2 grid covers u in [0.5, 1], v in [0, 0.5]
        let m = to_atlas_matrix(Mat4::IDENTITY, Vec2::new(1.0, 0.0), 2, DepthRange::Standard);

        let lo = m * Vec4::new(-1.0, -1.0, 0.0, 1.0);
        let hi = m * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!((lo.x, lo.y), (0.5, 0.0));
        assert_eq!((hi.x, hi.y), (1.0, 0.5));
        // Depth is not tiled
        assert_eq!(lo.z, 0.5);
        assert_eq!(hi.z, 1.0);
    }

    #[test]
    fn test_reversed_depth_flips_z() {
        let standard = to_atlas_matrix(Mat4::IDENTITY, Vec2::ZERO, 1, DepthRange::Standard);
        let reversed = to_atlas_matrix(Mat4::IDENTITY, Vec2::ZERO, 1, DepthRange::Reversed);

        let p = Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!((standard * p).z, 1.0);
        assert_eq!((reversed * p).z, 0.0);
        assert_eq!(standard.row(0), reversed.row(0));
        assert_eq!(standard.row(1), reversed.row(1));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let clip = Mat4::orthographic_rh(-7.0, 7.0, -7.0, 7.0, 0.0, 20.0)
            * Mat4::look_at_rh(Vec3::new(3.0, 10.0, 1.0), Vec3::ZERO, Vec3::Z);
        let a = to_atlas_matrix(clip, Vec2::new(3.0, 2.0), 4, DepthRange::Reversed);
        let b = to_atlas_matrix(clip, Vec2::new(3.0, 2.0), 4, DepthRange::Reversed);
        assert_eq!(a.to_cols_array_2d(), b.to_cols_array_2d());
    }

    #[test]
    fn test_row3_untouched() {
        let clip = from_rows(
            Vec4::new(1.0, 2.0, 3.0, 4.0),
            Vec4::new(5.0, 6.0, 7.0, 8.0),
            Vec4::new(9.0, 10.0, 11.0, 12.0),
            Vec4::new(0.1, 0.2, 0.3, 1.0),
        );
        let m = to_atlas_matrix(clip, Vec2::new(1.0, 1.0), 2, DepthRange::Standard);
        assert_eq!(m.row(3), clip.row(3));
    }
}
