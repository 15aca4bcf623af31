//! Pixel geometry derived from the global configuration, without any
//! decode: plane dimensions per LOQ, tile dimensions and tile origins.

use crate::config::GlobalConfig;
use crate::config::types::{LoqIndex, ScalingMode};

/// Dimensions of `plane` at `loq`, in pixels.
///
/// Chroma planes shift by the subsampling factors (rounding up); LOQ-1
/// halves per the LOQ-0 scaling mode.
pub fn plane_dimensions(global: &GlobalConfig, loq: LoqIndex, plane: u32) -> (u16, u16) {
    let mut width = global.width;
    let mut height = global.height;

    if plane > 0 {
        let shift_w = global.chroma.shift_width();
        let shift_h = global.chroma.shift_height();
        width = (width + (1 << shift_w) - 1) >> shift_w;
        height = (height + (1 << shift_h) - 1) >> shift_h;
    }

    if loq == LoqIndex::Loq1 {
        match global.scaling_modes[LoqIndex::Loq0 as usize] {
            ScalingMode::Scale0D => {}
            ScalingMode::Scale1D => {
                width = width.div_ceil(2);
            }
            ScalingMode::Scale2D => {
                width = width.div_ceil(2);
                height = height.div_ceil(2);
            }
        }
    }

    (width, height)
}

/// Number of tiles across one row of `plane` at `loq`.
pub(crate) fn tiles_across(global: &GlobalConfig, loq: LoqIndex, plane: u32) -> u32 {
    let (plane_width, _) = plane_dimensions(global, loq, plane);
    u32::from(plane_width.div_ceil(global.tile_width[plane as usize]))
}

/// Top-left pixel of `tile` within its plane at `loq`.
pub fn tile_start(global: &GlobalConfig, loq: LoqIndex, plane: u32, tile: u32) -> (u16, u16) {
    let across = tiles_across(global, loq, plane);
    let x = (tile % across) as u16 * global.tile_width[plane as usize];
    let y = (tile / across) as u16 * global.tile_height[plane as usize];
    (x, y)
}

/// Dimensions of `tile` within `plane` at `loq`, in pixels; tiles on the
/// right and bottom edges are clipped to the plane.
pub fn tile_dimensions(global: &GlobalConfig, loq: LoqIndex, plane: u32, tile: u32) -> (u16, u16) {
    let (plane_width, plane_height) = plane_dimensions(global, loq, plane);
    let (x, y) = tile_start(global, loq, plane, tile);

    let width = global.tile_width[plane as usize].min(plane_width - x);
    let height = global.tile_height[plane as usize].min(plane_height - y);
    (width, height)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::config::types::{Chroma, TileDimensions};

    fn config_1080p_420_2d() -> GlobalConfig {
        GlobalConfig {
            width: 1920,
            height: 1080,
            num_planes: 3,
            chroma: Chroma::Chroma420,
            tile_dimensions: TileDimensions::Custom,
            tile_width: [512, 256, 256],
            tile_height: [256, 128, 128],
            ..GlobalConfig::default()
        }
    }

    #[test]
    fn plane_dimensions_shift_chroma_and_loq() {
        let global = config_1080p_420_2d();

        assert_eq!(plane_dimensions(&global, LoqIndex::Loq0, 0), (1920, 1080));
        assert_eq!(plane_dimensions(&global, LoqIndex::Loq0, 1), (960, 540));
        // Default scaling into LOQ-0 is 2D.
        assert_eq!(plane_dimensions(&global, LoqIndex::Loq1, 0), (960, 540));
        assert_eq!(plane_dimensions(&global, LoqIndex::Loq1, 1), (480, 270));
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let global = config_1080p_420_2d();

        // Luma LOQ-0: 4x5 grid of 512x256 tiles over 1920x1080.
        assert_eq!(tiles_across(&global, LoqIndex::Loq0, 0), 4);
        assert_eq!(tile_dimensions(&global, LoqIndex::Loq0, 0, 0), (512, 256));
        // Right edge: 1920 - 3*512 = 384 wide.
        assert_eq!(tile_dimensions(&global, LoqIndex::Loq0, 0, 3), (384, 256));
        // Bottom edge: 1080 - 4*256 = 56 tall.
        assert_eq!(tile_dimensions(&global, LoqIndex::Loq0, 0, 16), (512, 56));
        assert_eq!(tile_start(&global, LoqIndex::Loq0, 0, 16), (0, 1024));
        // Bottom-right corner.
        assert_eq!(tile_dimensions(&global, LoqIndex::Loq0, 0, 19), (384, 56));
    }

    #[test]
    fn monochrome_has_no_chroma_shift() {
        let global = GlobalConfig {
            width: 640,
            height: 480,
            num_planes: 1,
            chroma: Chroma::Monochrome,
            tile_width: [640, 0, 0],
            tile_height: [480, 0, 0],
            ..GlobalConfig::default()
        };

        assert_eq!(plane_dimensions(&global, LoqIndex::Loq0, 0), (640, 480));
        assert_eq!(plane_dimensions(&global, LoqIndex::Loq1, 0), (320, 240));
        assert_eq!(tile_dimensions(&global, LoqIndex::Loq0, 0, 0), (640, 480));
    }
}
