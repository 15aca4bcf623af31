//! Dequantization parameter derivation, ISO/IEC 23094-2 - 8.5.
//!
//! For each temporal signal and coefficient layer the decoder needs an
//! effective step-width and offset. The derivation chains the signalled
//! master step-width through the chroma multiplier (chroma planes), the
//! temporal modifier (Inter at LOQ-0), and the per-layer quantization
//! matrix, then derives the offset per the signalled mode.

use crate::config::types::{
    DequantOffsetMode, LAYER_COUNT_DDS, LoqIndex, MAX_STEP_WIDTH, MIN_STEP_WIDTH, QuantMatrix,
    ScalingMode, TEMPORAL_SIGNAL_COUNT, TemporalSignal, TransformType,
};
use crate::config::{FrameConfig, GlobalConfig};
use crate::error::{DecodeError, Result};

/// Default quantization matrices, 7.4.3.4, per transform and LOQ-0
/// scaling mode.
const QUANT_MATRIX_DEFAULT_DD_1D: [u8; 4] = [32, 3, 0, 32];
const QUANT_MATRIX_DEFAULT_DD_2D: [u8; 4] = [0, 2, 0, 0];
const QUANT_MATRIX_DEFAULT_DDS_1D: [u8; 16] =
    [13, 26, 19, 32, 52, 1, 78, 9, 13, 26, 19, 32, 150, 91, 91, 19];
const QUANT_MATRIX_DEFAULT_DDS_2D: [u8; 16] =
    [13, 26, 19, 32, 52, 1, 78, 9, 26, 72, 0, 3, 150, 91, 91, 19];

/// Restores one LOQ of `matrix` to the standard default values.
pub(crate) fn quant_matrix_set_default(
    matrix: &mut QuantMatrix,
    loq0_scaling: ScalingMode,
    transform: TransformType,
    loq: LoqIndex,
) {
    let one_dimensional = loq0_scaling == ScalingMode::Scale1D;

    let row = &mut matrix.values[loq as usize];
    match transform {
        TransformType::Dd => {
            let defaults =
                if one_dimensional { QUANT_MATRIX_DEFAULT_DD_1D } else { QUANT_MATRIX_DEFAULT_DD_2D };
            row[..4].copy_from_slice(&defaults);
        }
        TransformType::Dds => {
            *row = if one_dimensional {
                QUANT_MATRIX_DEFAULT_DDS_1D
            } else {
                QUANT_MATRIX_DEFAULT_DDS_2D
            };
        }
    }
}

/// Dequantization settings for one plane and LOQ: a step-width and
/// offset per temporal signal per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Dequant {
    pub(crate) step_width: [[i16; LAYER_COUNT_DDS]; TEMPORAL_SIGNAL_COUNT],
    pub(crate) offset: [[i16; LAYER_COUNT_DDS]; TEMPORAL_SIGNAL_COUNT],
}

impl Default for Dequant {
    fn default() -> Self {
        Self {
            step_width: [[0; LAYER_COUNT_DDS]; TEMPORAL_SIGNAL_COUNT],
            offset: [[0; LAYER_COUNT_DDS]; TEMPORAL_SIGNAL_COUNT],
        }
    }
}

const fn clamp_step_width(value: u32) -> u16 {
    if value < MIN_STEP_WIDTH as u32 {
        MIN_STEP_WIDTH
    } else if value > MAX_STEP_WIDTH as u32 {
        MAX_STEP_WIDTH
    } else {
        value as u16
    }
}

/// Expands the master step-width by one quantization-matrix value:
/// `qm = 0` leaves it unchanged, larger values scale it up linearly in
/// 64ths.
const fn layer_step_width(master: u16, qm: u8) -> u16 {
    clamp_step_width((master as u32 * (64 + qm as u32)) >> 6)
}

/// Derives the actual dequantization offset for one layer (8.5.4). The
/// default mode tracks the step-width logarithm so small step-widths
/// get proportionally smaller offsets; const-offset mode applies the
/// signalled value as-is.
fn layer_offset(
    mode: DequantOffsetMode,
    signalled: Option<u8>,
    step_width: u16,
) -> i16 {
    let Some(offset) = signalled else {
        return 0;
    };
    if offset == 0 {
        return 0;
    }

    match mode {
        DequantOffsetMode::ConstOffset => i16::from(offset),
        DequantOffsetMode::Default => {
            let ratio = f64::from(step_width).ln() / f64::from(MAX_STEP_WIDTH).ln();
            (f64::from(offset) * ratio).round() as i16
        }
    }
}

/// Computes the dequantization parameters for one `(plane, LOQ)`.
pub(crate) fn calculate_dequant(
    global: &GlobalConfig,
    frame: &FrameConfig,
    plane: u32,
    loq: LoqIndex,
) -> Result<Dequant> {
    if plane >= u32::from(global.num_planes) {
        return Err(DecodeError::InvalidArgument("plane index out of range"));
    }

    let mut master = clamp_step_width(u32::from(frame.step_widths[loq as usize]));

    // Chroma planes scale by the multiplier in 64ths.
    if plane > 0 {
        master = clamp_step_width(
            (u32::from(master) * u32::from(global.chroma_step_width_multiplier)) >> 6,
        );
    }

    let mut dequant = Dequant::default();

    for temporal in [TemporalSignal::Inter, TemporalSignal::Intra] {
        let mut base = master;

        // Inter residuals at LOQ-0 are corrections on top of the
        // temporal prediction and quantize finer.
        if temporal == TemporalSignal::Inter
            && global.temporal_enabled
            && loq == LoqIndex::Loq0
        {
            let reduction =
                (u32::from(base) * u32::from(global.temporal_step_width_modifier)) / 255;
            base = clamp_step_width(u32::from(base).saturating_sub(reduction));
        }

        for layer in 0..usize::from(global.num_layers) {
            let qm = frame.quant_matrix.values[loq as usize][layer];
            let step_width = layer_step_width(base, qm);

            dequant.step_width[temporal as usize][layer] = step_width as i16;
            dequant.offset[temporal as usize][layer] =
                layer_offset(frame.dequant_offset_mode, frame.dequant_offset, step_width);
        }
    }

    Ok(dequant)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::config::types::LAYER_COUNT_DD;

    fn config(temporal: bool) -> (GlobalConfig, FrameConfig) {
        let mut global = GlobalConfig::default();
        global.width = 64;
        global.height = 64;
        global.num_planes = 3;
        global.num_layers = LAYER_COUNT_DD as u8;
        global.transform = TransformType::Dd;
        global.temporal_enabled = temporal;

        let mut frame = FrameConfig::new();
        frame.step_widths = [1000, 2000];
        quant_matrix_set_default(
            &mut frame.quant_matrix,
            ScalingMode::Scale2D,
            TransformType::Dd,
            LoqIndex::Loq0,
        );
        quant_matrix_set_default(
            &mut frame.quant_matrix,
            ScalingMode::Scale2D,
            TransformType::Dd,
            LoqIndex::Loq1,
        );
        frame.quant_matrix.set = true;

        (global, frame)
    }

    #[test]
    fn default_matrices_select_by_scaling() {
        let mut matrix = QuantMatrix::default();
        quant_matrix_set_default(
            &mut matrix,
            ScalingMode::Scale1D,
            TransformType::Dd,
            LoqIndex::Loq0,
        );
        assert_eq!(matrix.values[0][..4], QUANT_MATRIX_DEFAULT_DD_1D);

        quant_matrix_set_default(
            &mut matrix,
            ScalingMode::Scale2D,
            TransformType::Dds,
            LoqIndex::Loq1,
        );
        assert_eq!(matrix.values[1], QUANT_MATRIX_DEFAULT_DDS_2D);
    }

    #[test]
    fn quant_matrix_expands_step_width() {
        let (global, frame) = config(false);
        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();

        // DD 2D default matrix is {0, 2, 0, 0}: layer 1 scales by
        // 66/64, the rest stay at the master step width.
        assert_eq!(dequant.step_width[0][0], 1000);
        assert_eq!(dequant.step_width[0][1], 1031);
        assert_eq!(dequant.step_width[0][2], 1000);
        // Without temporal, Inter and Intra agree.
        assert_eq!(dequant.step_width[0], dequant.step_width[1]);
    }

    #[test]
    fn chroma_planes_scale_by_multiplier() {
        let (mut global, frame) = config(false);
        global.chroma_step_width_multiplier = 128;

        let luma = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();
        let chroma = calculate_dequant(&global, &frame, 1, LoqIndex::Loq0).unwrap();

        // 128/64 doubles the chroma step width.
        assert_eq!(chroma.step_width[0][0], luma.step_width[0][0] * 2);
    }

    #[test]
    fn temporal_inter_reduces_step_width() {
        let (global, frame) = config(true);
        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();

        // Modifier 48: inter base = 1000 - 1000*48/255 = 1000 - 188.
        assert_eq!(dequant.step_width[TemporalSignal::Inter as usize][0], 812);
        assert_eq!(dequant.step_width[TemporalSignal::Intra as usize][0], 1000);

        // LOQ-1 is unaffected by the temporal modifier.
        let loq1 = calculate_dequant(&global, &frame, 0, LoqIndex::Loq1).unwrap();
        assert_eq!(
            loq1.step_width[TemporalSignal::Inter as usize],
            loq1.step_width[TemporalSignal::Intra as usize]
        );
    }

    #[test]
    fn offsets_follow_mode() {
        let (global, mut frame) = config(false);

        // Unsignalled: zero offsets.
        frame.dequant_offset = None;
        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();
        assert_eq!(dequant.offset[0][0], 0);

        // Const mode passes the value through.
        frame.dequant_offset = Some(100);
        frame.dequant_offset_mode = DequantOffsetMode::ConstOffset;
        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();
        assert_eq!(dequant.offset[0][0], 100);

        // Default mode scales with ln(step width); at the maximum step
        // width the full offset applies.
        frame.dequant_offset_mode = DequantOffsetMode::Default;
        frame.step_widths[LoqIndex::Loq0 as usize] = MAX_STEP_WIDTH;
        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();
        assert_eq!(dequant.offset[0][0], 100);

        frame.step_widths[LoqIndex::Loq0 as usize] = 100;
        let dequant = calculate_dequant(&global, &frame, 0, LoqIndex::Loq0).unwrap();
        assert!(dequant.offset[0][0] < 100);
        assert!(dequant.offset[0][0] > 0);
    }

    #[test]
    fn step_width_clamps_to_domain() {
        assert_eq!(clamp_step_width(0), MIN_STEP_WIDTH);
        assert_eq!(clamp_step_width(100_000), MAX_STEP_WIDTH);
        assert_eq!(layer_step_width(MAX_STEP_WIDTH, 255), MAX_STEP_WIDTH);
    }
}
