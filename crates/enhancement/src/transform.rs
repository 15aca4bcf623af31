//! Inverse transforms, ISO/IEC 23094-2 - 8.6.
//!
//! Two transform shapes turn dequantized coefficients into residuals:
//! DD (2x2, 4 coefficients) and DDS (4x4, 16 coefficients). Both are
//! inverse Hadamard transforms of Walsh-Hadamard form; DDS factors as a
//! butterfly across its four coefficient quads followed by a butterfly
//! within each quad. When LOQ-0 was upscaled horizontally only (1D
//! scaling), the within-quad vertical details collapse and each output
//! row pair repeats.
//!
//! DDS residuals use the quad layout:
//!
//! ```text
//! [ 0  1  4  5  ]
//! [ 2  3  6  7  ]
//! [ 8  9 12 13  ]
//! [10 11 14 15  ]
//! ```
//!
//! The module keeps a scalar and a lane-parallel implementation of every
//! transform behind one function-pointer seam, selected once per tile;
//! the two must be bit-identical (`force_scalar` pins the scalar leg).

use crate::config::types::{Deblock, ScalingMode, TemporalSignal, TransformType};
use crate::dequant::Dequant;

/// Applies an inverse transform to one TU's dequantized coefficients.
/// DD uses the first 4 lanes of each array.
type TransformFn = fn(&[i16; 16], &mut [i16; 16]);

/// Dequantizes and transforms in one call; the decode loop holds one of
/// these per tile.
pub(crate) type DequantTransformFn =
    fn(&Dequant, TemporalSignal, &[i16; 16], &mut [i16; 16]);

#[inline]
const fn clamp_i16(value: i32) -> i16 {
    if value > i16::MAX as i32 {
        i16::MAX
    } else if value < i16::MIN as i32 {
        i16::MIN
    } else {
        value as i16
    }
}

/// Dequantizes one TU's coefficients: multiply by the step-width and
/// push away from zero by the offset, saturating to i16.
pub(crate) fn dequant_coefficients(
    dequant: &Dequant,
    temporal: TemporalSignal,
    coeffs: &[i16; 16],
    out: &mut [i16; 16],
    num_layers: usize,
) {
    let step_widths = &dequant.step_width[temporal as usize];
    let offsets = &dequant.offset[temporal as usize];

    for layer in 0..num_layers {
        let coeff = i32::from(coeffs[layer]);
        out[layer] = if coeff > 0 {
            clamp_i16(coeff * i32::from(step_widths[layer]) + i32::from(offsets[layer]))
        } else if coeff < 0 {
            clamp_i16(coeff * i32::from(step_widths[layer]) - i32::from(offsets[layer]))
        } else {
            0
        };
    }
}

/// 4-point inverse Walsh-Hadamard butterfly.
#[inline]
const fn butterfly4(a: i32, b: i32, c: i32, d: i32) -> (i32, i32, i32, i32) {
    let t0 = a + c;
    let t1 = a - c;
    let t2 = b + d;
    let t3 = b - d;
    (t0 + t2, t0 - t2, t1 + t3, t1 - t3)
}

fn transform_dd_scalar(coeffs: &[i16; 16], residuals: &mut [i16; 16]) {
    let (r0, r1, r2, r3) = butterfly4(
        i32::from(coeffs[0]),
        i32::from(coeffs[1]),
        i32::from(coeffs[2]),
        i32::from(coeffs[3]),
    );
    residuals[0] = clamp_i16(r0);
    residuals[1] = clamp_i16(r1);
    residuals[2] = clamp_i16(r2);
    residuals[3] = clamp_i16(r3);
}

/// Lane-parallel DD: the same butterfly expressed as whole-array stages
/// the compiler can vectorize.
fn transform_dd_lanes(coeffs: &[i16; 16], residuals: &mut [i16; 16]) {
    let mut t = [0i32; 4];
    let mut u = [0i32; 4];

    for lane in 0..2 {
        t[lane] = i32::from(coeffs[lane]) + i32::from(coeffs[lane + 2]);
        t[lane + 2] = i32::from(coeffs[lane]) - i32::from(coeffs[lane + 2]);
    }
    for lane in 0..2 {
        u[2 * lane] = t[2 * lane] + t[2 * lane + 1];
        u[2 * lane + 1] = t[2 * lane] - t[2 * lane + 1];
    }
    for lane in 0..4 {
        residuals[lane] = clamp_i16(u[lane]);
    }
}

/// Shared DDS skeleton: butterfly across the four quads, then within
/// each quad. With `collapse_vertical` the within-quad vertical details
/// are dropped, repeating each output row pair (8.6, 1D scaling).
fn transform_dds_impl(coeffs: &[i16; 16], residuals: &mut [i16; 16], collapse_vertical: bool) {
    let mut stage = [0i32; 16];

    // Across quads: lane i of each quad forms one butterfly.
    for lane in 0..4 {
        let (a, b, c, d) = butterfly4(
            i32::from(coeffs[lane]),
            i32::from(coeffs[lane + 4]),
            i32::from(coeffs[lane + 8]),
            i32::from(coeffs[lane + 12]),
        );
        stage[lane] = a;
        stage[lane + 4] = b;
        stage[lane + 8] = c;
        stage[lane + 12] = d;
    }

    // Within quads.
    for quad in 0..4 {
        let base = quad * 4;
        let (c, d) = if collapse_vertical {
            (0, 0)
        } else {
            (stage[base + 2], stage[base + 3])
        };
        let (r0, r1, r2, r3) = butterfly4(stage[base], stage[base + 1], c, d);
        residuals[base] = clamp_i16(r0);
        residuals[base + 1] = clamp_i16(r1);
        residuals[base + 2] = clamp_i16(r2);
        residuals[base + 3] = clamp_i16(r3);
    }
}

fn transform_dds_scalar(coeffs: &[i16; 16], residuals: &mut [i16; 16]) {
    transform_dds_impl(coeffs, residuals, false);
}

fn transform_dds_1d_scalar(coeffs: &[i16; 16], residuals: &mut [i16; 16]) {
    transform_dds_impl(coeffs, residuals, true);
}

/// Lane-parallel DDS: both stages as flat lane loops.
fn transform_dds_lanes(coeffs: &[i16; 16], residuals: &mut [i16; 16]) {
    let mut t = [0i32; 16];
    let mut u = [0i32; 16];

    for lane in 0..4 {
        t[lane] = i32::from(coeffs[lane]) + i32::from(coeffs[lane + 8]);
        t[lane + 8] = i32::from(coeffs[lane]) - i32::from(coeffs[lane + 8]);
        t[lane + 4] = i32::from(coeffs[lane + 4]) + i32::from(coeffs[lane + 12]);
        t[lane + 12] = i32::from(coeffs[lane + 4]) - i32::from(coeffs[lane + 12]);
    }
    for lane in 0..4 {
        u[lane] = t[lane] + t[lane + 4];
        u[lane + 4] = t[lane] - t[lane + 4];
        u[lane + 8] = t[lane + 8] + t[lane + 12];
        u[lane + 12] = t[lane + 8] - t[lane + 12];
    }

    for quad in 0..4 {
        let base = quad * 4;
        let t0 = u[base] + u[base + 2];
        let t1 = u[base] - u[base + 2];
        let t2 = u[base + 1] + u[base + 3];
        let t3 = u[base + 1] - u[base + 3];
        residuals[base] = clamp_i16(t0 + t2);
        residuals[base + 1] = clamp_i16(t0 - t2);
        residuals[base + 2] = clamp_i16(t1 + t3);
        residuals[base + 3] = clamp_i16(t1 - t3);
    }
}

fn transform_dds_1d_lanes(coeffs: &[i16; 16], residuals: &mut [i16; 16]) {
    // The collapse zeroes the within-quad vertical inputs, so the lane
    // form shares the scalar skeleton.
    transform_dds_impl(coeffs, residuals, true);
}

/// Selects the plain transform for `(transform, scaling)`; the
/// lane-parallel leg is the default, `force_scalar` pins the scalar one.
fn transform_get_function(
    transform: TransformType,
    scaling: ScalingMode,
    force_scalar: bool,
) -> TransformFn {
    match (transform, scaling, force_scalar) {
        (TransformType::Dd, _, true) => transform_dd_scalar,
        (TransformType::Dd, _, false) => transform_dd_lanes,
        (TransformType::Dds, ScalingMode::Scale1D, true) => transform_dds_1d_scalar,
        (TransformType::Dds, ScalingMode::Scale1D, false) => transform_dds_1d_lanes,
        (TransformType::Dds, _, true) => transform_dds_scalar,
        (TransformType::Dds, _, false) => transform_dds_lanes,
    }
}

fn dequant_transform<const DD: bool, const COLLAPSE: bool, const SCALAR: bool>(
    dequant: &Dequant,
    temporal: TemporalSignal,
    coeffs: &[i16; 16],
    residuals: &mut [i16; 16],
) {
    let mut dequantized = [0i16; 16];
    let num_layers = if DD { 4 } else { 16 };
    dequant_coefficients(dequant, temporal, coeffs, &mut dequantized, num_layers);

    let scaling = if COLLAPSE { ScalingMode::Scale1D } else { ScalingMode::Scale2D };
    let transform = if DD { TransformType::Dd } else { TransformType::Dds };
    transform_get_function(transform, scaling, SCALAR)(&dequantized, residuals);
}

/// Fused dequantize-and-transform, equivalent to
/// [`dequant_coefficients`] followed by the matching transform.
pub(crate) fn dequant_transform_get_function(
    transform: TransformType,
    scaling: ScalingMode,
    force_scalar: bool,
) -> DequantTransformFn {
    match (transform, scaling, force_scalar) {
        (TransformType::Dd, _, true) => dequant_transform::<true, false, true>,
        (TransformType::Dd, _, false) => dequant_transform::<true, false, false>,
        (TransformType::Dds, ScalingMode::Scale1D, true) => dequant_transform::<false, true, true>,
        (TransformType::Dds, ScalingMode::Scale1D, false) => {
            dequant_transform::<false, true, false>
        }
        (TransformType::Dds, _, true) => dequant_transform::<false, false, true>,
        (TransformType::Dds, _, false) => dequant_transform::<false, false, false>,
    }
}

/// Applies the deblocking coefficients to a DDS residual block at LOQ-1
/// (8.9.2): corners weigh by `corner`, edges by `side`, both as
/// `(coef * residual) >> 4` in wrapping 32-bit arithmetic.
pub(crate) fn deblock_residuals(deblock: &Deblock, residuals: &mut [i16; 16]) {
    #[inline]
    fn weigh(coef: u32, residual: i16) -> i16 {
        (coef.wrapping_mul(residual as u32) >> 4) as u16 as i16
    }

    // Quad-layout positions: corners (0,0) (3,0) (0,3) (3,3), the rest
    // of the outer ring are sides.
    residuals[0] = weigh(deblock.corner, residuals[0]); // 0, 0
    residuals[1] = weigh(deblock.side, residuals[1]); // 1, 0
    residuals[4] = weigh(deblock.side, residuals[4]); // 2, 0
    residuals[5] = weigh(deblock.corner, residuals[5]); // 3, 0
    residuals[2] = weigh(deblock.side, residuals[2]); // 0, 1
    residuals[7] = weigh(deblock.side, residuals[7]); // 3, 1
    residuals[8] = weigh(deblock.side, residuals[8]); // 0, 2
    residuals[13] = weigh(deblock.side, residuals[13]); // 3, 2
    residuals[10] = weigh(deblock.corner, residuals[10]); // 0, 3
    residuals[11] = weigh(deblock.side, residuals[11]); // 1, 3
    residuals[14] = weigh(deblock.side, residuals[14]); // 2, 3
    residuals[15] = weigh(deblock.corner, residuals[15]); // 3, 3
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::config::types::{LoqIndex, MAX_STEP_WIDTH};
    use crate::config::{FrameConfig, GlobalConfig};
    use crate::dequant::calculate_dequant;

    fn coefficient_patterns() -> Vec<[i16; 16]> {
        let mut patterns = vec![
            [0; 16],
            [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            [i16::MAX; 16],
            [i16::MIN; 16],
        ];

        // A deterministic pseudo-random sweep.
        let mut seed = 0x1234_5678u32;
        for _ in 0..64 {
            let mut pattern = [0i16; 16];
            for lane in &mut pattern {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                *lane = (seed >> 16) as i16;
            }
            patterns.push(pattern);
        }

        patterns
    }

    #[test]
    fn dd_transforms_match() {
        for pattern in coefficient_patterns() {
            let mut scalar = [0i16; 16];
            let mut lanes = [0i16; 16];
            transform_dd_scalar(&pattern, &mut scalar);
            transform_dd_lanes(&pattern, &mut lanes);
            assert_eq!(scalar[..4], lanes[..4], "pattern {pattern:?}");
        }
    }

    #[test]
    fn dds_transforms_match() {
        for pattern in coefficient_patterns() {
            let mut scalar = [0i16; 16];
            let mut lanes = [0i16; 16];
            transform_dds_scalar(&pattern, &mut scalar);
            transform_dds_lanes(&pattern, &mut lanes);
            assert_eq!(scalar, lanes, "pattern {pattern:?}");

            transform_dds_1d_scalar(&pattern, &mut scalar);
            transform_dds_1d_lanes(&pattern, &mut lanes);
            assert_eq!(scalar, lanes, "pattern {pattern:?}");
        }
    }

    #[test]
    fn dd_single_coefficient_broadcasts() {
        let mut coeffs = [0i16; 16];
        coeffs[0] = 7;
        let mut residuals = [0i16; 16];
        transform_dd_scalar(&coeffs, &mut residuals);
        assert_eq!(residuals[..4], [7, 7, 7, 7]);
    }

    #[test]
    fn dds_1d_repeats_row_pairs() {
        for pattern in coefficient_patterns() {
            let mut residuals = [0i16; 16];
            transform_dds_1d_scalar(&pattern, &mut residuals);

            // Quad rows: lanes (0,1) vs (2,3) of every quad repeat.
            for quad in 0..4 {
                assert_eq!(residuals[quad * 4], residuals[quad * 4 + 2]);
                assert_eq!(residuals[quad * 4 + 1], residuals[quad * 4 + 3]);
            }
        }
    }

    #[test]
    fn fused_matches_separate() {
        let mut global = GlobalConfig::default();
        global.width = 64;
        global.height = 64;
        global.num_planes = 1;
        global.num_layers = 16;
        global.transform = TransformType::Dds;

        let mut frame = FrameConfig::new();
        frame.step_widths = [700, MAX_STEP_WIDTH];
        frame.quant_matrix.values[0] = [3; 16];
        frame.quant_matrix.set = true;

        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();

        for scaling in [ScalingMode::Scale1D, ScalingMode::Scale2D] {
            let transform = transform_get_function(TransformType::Dds, scaling, false);
            let fused = dequant_transform_get_function(TransformType::Dds, scaling, false);

            for pattern in coefficient_patterns() {
                for temporal in [TemporalSignal::Inter, TemporalSignal::Intra] {
                    let mut dequantized = [0i16; 16];
                    dequant_coefficients(&dequant, temporal, &pattern, &mut dequantized, 16);
                    let mut separate = [0i16; 16];
                    transform(&dequantized, &mut separate);

                    let mut combined = [0i16; 16];
                    fused(&dequant, temporal, &pattern, &mut combined);

                    assert_eq!(separate, combined);
                }
            }
        }
    }

    #[test]
    fn deblock_weights_ring() {
        let deblock = Deblock { corner: 8, side: 12 };
        let mut residuals = [16i16; 16];
        deblock_residuals(&deblock, &mut residuals);

        // Corners: 16 * 8 / 16 = 8. Sides: 16 * 12 / 16 = 12. The four
        // inner positions (3, 6, 9, 12) stay untouched.
        assert_eq!(residuals[0], 8);
        assert_eq!(residuals[5], 8);
        assert_eq!(residuals[10], 8);
        assert_eq!(residuals[15], 8);
        assert_eq!(residuals[1], 12);
        assert_eq!(residuals[3], 16);
        assert_eq!(residuals[6], 16);
        assert_eq!(residuals[9], 16);
        assert_eq!(residuals[12], 16);

        // Negative residuals keep their sign through the wrapping form.
        let mut residuals = [-16i16; 16];
        deblock_residuals(&deblock, &mut residuals);
        assert_eq!(residuals[0], -8);
        assert_eq!(residuals[1], -12);
    }
}
