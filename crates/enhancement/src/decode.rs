//! The per-tile enhancement decode loop.
//!
//! One call decodes one `(plane, LOQ, tile)` triple into a command
//! buffer. Triples own disjoint chunk ranges, TU ranges and output
//! buffers, so callers may fan tile decodes out across threads; nothing
//! here suspends or blocks.
//!
//! The loop walks transform units in block-major scan order (raster for
//! untiled non-temporal streams), pulling one coefficient per layer per
//! emitted position while honouring per-layer zero runs, the temporal
//! run-length signal, and the reduced-signalling mode that turns runs of
//! Intra block signals into whole-block clears.

use crate::chunk::{layer_chunks, temporal_chunk};
use crate::cmdbuf::{CmdBufferSink, CpuCmd, GpuOperation};
use crate::config::types::{
    LAYER_COUNT_DDS, LoqIndex, MAX_PLANES, ScalingMode, TemporalSignal, TileDimensions,
    TransformType,
};
use crate::config::{DecoderConfig, FrameConfig, GlobalConfig};
use crate::dequant::calculate_dequant;
use crate::dimensions::{tile_dimensions, tile_start};
use crate::entropy::{EntropyDecoder, EntropyDecoderType};
use crate::error::{DecodeError, Result};
use crate::transform::{deblock_residuals, dequant_transform_get_function};
use crate::tu::TuState;

/// Decodes the enhancement data of one `(plane, LOQ, tile)` into `sink`.
///
/// A disabled LOQ or an absent plane is a successful no-op (the tile's
/// command buffer stays empty); invalid indices are argument errors; any
/// bitstream malformity discards the commands appended by this call and
/// returns the error, leaving the sink as it was.
pub fn decode_enhancement(
    config: &DecoderConfig,
    global: &GlobalConfig,
    frame: &FrameConfig,
    loq: LoqIndex,
    plane: u32,
    tile: u32,
    sink: &mut CmdBufferSink<'_>,
) -> Result<()> {
    if plane >= MAX_PLANES as u32 {
        return Err(DecodeError::InvalidArgument("plane index out of range"));
    }
    if tile >= global.num_tiles[plane as usize][loq as usize] {
        return Err(DecodeError::InvalidArgument("tile index out of range"));
    }

    if !frame.loq_enabled[loq as usize] || plane >= u32::from(global.num_planes) {
        tracing::debug!(loq = loq as u8, plane, "nothing to decode");
        return Ok(());
    }

    let mark = match sink {
        CmdBufferSink::Cpu(buffer) => SinkMark::Cpu(buffer.mark()),
        CmdBufferSink::Gpu(buffer) => SinkMark::Gpu(buffer.mark()),
    };

    let result = decode_tile(config, global, frame, loq, plane, tile, &mut *sink);

    if result.is_err() {
        // Bitstream malformity: back out this tile's commands.
        match (sink, mark) {
            (CmdBufferSink::Cpu(buffer), SinkMark::Cpu(mark)) => buffer.truncate_to(mark),
            (CmdBufferSink::Gpu(buffer), SinkMark::Gpu(mark)) => buffer.truncate_to(mark),
            _ => {}
        }
    }

    result
}

enum SinkMark {
    Cpu((usize, u32)),
    Gpu(usize),
}

fn decode_tile(
    config: &DecoderConfig,
    global: &GlobalConfig,
    frame: &FrameConfig,
    loq: LoqIndex,
    plane: u32,
    tile: u32,
    sink: &mut CmdBufferSink<'_>,
) -> Result<()> {
    let dequant = calculate_dequant(global, frame, plane, loq)?;

    let temporal_enabled = global.temporal_enabled;
    let num_layers = usize::from(global.num_layers);
    let dds = global.transform == TransformType::Dds;
    let reduced_signalling = global.temporal_reduced_signalling_enabled;
    let scaling = if loq == LoqIndex::Loq0 {
        global.scaling_modes[LoqIndex::Loq0 as usize]
    } else {
        ScalingMode::Scale2D
    };
    let tu_raster_order =
        !global.temporal_enabled && global.tile_dimensions == TileDimensions::None;
    let transform_fn =
        dequant_transform_get_function(global.transform, scaling, config.force_scalar);

    // Chunk ranges for this tile.
    let chunks = layer_chunks(global, frame, plane, loq, tile)?;
    let temporal = if loq == LoqIndex::Loq0 {
        temporal_chunk(global, frame, plane, tile)?
    } else {
        None
    };

    let tile_has_entropy = chunks.is_some();
    let tile_has_temporal = temporal.is_some();

    // Entropy decoders: one per layer, plus the temporal stream.
    let mut residual_decoders: Vec<EntropyDecoder<'_>> = Vec::new();
    if let Some(chunks) = chunks {
        residual_decoders.try_reserve(num_layers)?;
        for chunk in &chunks[..num_layers] {
            residual_decoders.push(EntropyDecoder::new(
                chunk,
                EntropyDecoderType::Default,
                global.bitstream_version,
            )?);
        }
    }

    let mut temporal_decoder = match temporal {
        Some(chunk) => Some(EntropyDecoder::new(
            chunk,
            EntropyDecoderType::Temporal,
            global.bitstream_version,
        )?),
        None => None,
    };

    // TU scan state.
    let (width, height) = tile_dimensions(global, loq, plane, tile);
    let (start_x, start_y) = tile_start(global, loq, plane, tile);
    let tu_state = TuState::new(width, height, start_x, start_y, global.transform.tu_shift());
    let tu_total = tu_state.tu_total;

    // Per-iteration state.
    let mut coeffs = [0i16; LAYER_COUNT_DDS];
    let mut residuals = [0i16; LAYER_COUNT_DDS];
    let mut zeros = [0i64; LAYER_COUNT_DDS];
    let mut temporal_signal = TemporalSignal::Inter;
    let mut temporal_run: i64 = 0;
    let mut clear_block_queue: i64 = 0;
    let mut clear_block_remainder = false;
    let mut tu_index: u32 = 0;
    let mut last_tu_index: u32 = 0;

    loop {
        // Decode one coefficient per layer, honouring zero runs.
        let mut min_zero_count = i64::MAX;
        let mut coeffs_nonzero_mask = 0u32;

        for layer in 0..num_layers {
            if zeros[layer] > 0 {
                zeros[layer] -= 1;
                coeffs[layer] = 0;
            } else if tile_has_entropy {
                match residual_decoders[layer].decode_coefficient()? {
                    Some((coeff, run)) => {
                        coeffs[layer] = coeff;
                        zeros[layer] = i64::from(run);
                        coeffs_nonzero_mask |= u32::from(coeff != 0) << layer;
                    }
                    None => {
                        coeffs[layer] = 0;
                        zeros[layer] = i64::from(tu_total) - 1;
                    }
                }
            } else {
                // No decoder at all: skip the whole remainder.
                coeffs[layer] = 0;
                zeros[layer] = i64::from(tu_total) - 1;
            }

            min_zero_count = min_zero_count.min(zeros[layer]);
        }

        // Temporal run bookkeeping.
        let block_start = !tu_raster_order && tu_state.is_block_start(tu_index);

        if clear_block_queue == 0 && tile_has_temporal && temporal_enabled {
            if temporal_run <= 0 {
                let decoder = temporal_decoder
                    .as_mut()
                    .ok_or(DecodeError::InvalidArgument("missing temporal decoder"))?;
                match decoder.decode_temporal()? {
                    Some((signal, run)) => {
                        temporal_signal = signal;
                        temporal_run = i64::from(run);
                    }
                    None => {
                        // No data: one run spanning the whole tile.
                        temporal_run = i64::from(tu_total);
                    }
                }
                clear_block_remainder = false;

                if temporal_run <= 0 {
                    tracing::error!(temporal_run, "invalid temporal run");
                    return Err(DecodeError::NegativeTemporalRun(temporal_run));
                }
            }

            // The signalled run includes the current TU; all the
            // bookkeeping below treats it as "TUs after this one".
            temporal_run -= 1;

            // Reduced signalling: an Intra run that touches a block
            // start clears that many whole blocks. Re-express the run
            // as a TU count so the decrements stay accurate until the
            // final clear.
            if block_start && temporal_signal == TemporalSignal::Intra && reduced_signalling {
                clear_block_queue = temporal_run + 1;
                temporal_run = 0;

                for _ in 0..clear_block_queue {
                    let next = tu_index as i64 + temporal_run;
                    if next >= i64::from(tu_total) {
                        return Err(DecodeError::EntropyOverflow(
                            "intra block run exceeds the tile",
                        ));
                    }
                    temporal_run += i64::from(tu_state.block_tu_count(next as u32));
                }
            }
        }

        let block_tu_count = if tu_raster_order { 0 } else { tu_state.block_tu_count(tu_index) };
        let mut cleared_block = false;

        // Emit a whole-block clear.
        if block_start && clear_block_queue > 0 {
            let block_aligned_index = tu_state.block_aligned_index(tu_index);

            match sink {
                CmdBufferSink::Cpu(buffer) => {
                    buffer.append(CpuCmd::Clear, None, block_aligned_index - last_tu_index)?;
                }
                CmdBufferSink::Gpu(buffer) => {
                    buffer.append(GpuOperation::ClearAndSet, None, block_aligned_index)?;
                }
            }
            last_tu_index = block_aligned_index;

            cleared_block = true;
            clear_block_queue -= 1;
            if clear_block_queue == 0 {
                // The next populated TU still belongs to the cleared
                // region and must Set rather than Add.
                clear_block_remainder = true;
            }
        }

        // Emit a residual command when it has side effects.
        if coeffs_nonzero_mask != 0
            || (!cleared_block && temporal_signal == TemporalSignal::Intra)
        {
            if coeffs_nonzero_mask != 0 {
                // Dequantized here rather than at layer decode: the
                // coefficient can be zero (implied Inter) while the
                // block signal is Intra.
                transform_fn(&dequant, temporal_signal, &coeffs, &mut residuals);

                if loq == LoqIndex::Loq1 && dds && frame.deblock_enabled {
                    deblock_residuals(&global.deblock, &mut residuals);
                }
            } else {
                residuals = [0; LAYER_COUNT_DDS];
            }

            match sink {
                CmdBufferSink::Cpu(buffer) => {
                    let command = if coeffs_nonzero_mask == 0
                        && temporal_signal == TemporalSignal::Intra
                    {
                        CpuCmd::SetZero
                    } else if loq == LoqIndex::Loq0
                        && (temporal_signal == TemporalSignal::Intra
                            || clear_block_queue > 0
                            || clear_block_remainder)
                    {
                        CpuCmd::Set
                    } else {
                        CpuCmd::Add
                    };

                    buffer.append(command, Some(&residuals), tu_index - last_tu_index)?;
                    last_tu_index = tu_index;
                }
                CmdBufferSink::Gpu(buffer) => {
                    let operation = if coeffs_nonzero_mask == 0
                        && temporal_signal == TemporalSignal::Intra
                    {
                        GpuOperation::SetZero
                    } else if loq == LoqIndex::Loq0 && temporal_signal == TemporalSignal::Intra {
                        GpuOperation::Set
                    } else {
                        GpuOperation::Add
                    };

                    buffer.append(operation, Some(&residuals), tu_index)?;
                }
            }
        }

        // Find the next TU, capping the jump so the walk never skips a
        // pending block start, the end of a temporal run, or the TU
        // right after an Intra signal.
        if tile_has_temporal {
            if cleared_block {
                min_zero_count = min_zero_count.min(i64::from(block_tu_count) - 1);
                temporal_run -= min_zero_count + 1;
            } else if clear_block_queue > 0 {
                // Jump to the next residual or the next block start,
                // whichever comes first.
                let in_block = tu_index - tu_state.block_aligned_index(tu_index);
                let next_block_start = i64::from(block_tu_count) - i64::from(in_block) - 1;
                min_zero_count = min_zero_count.min(next_block_start);
                temporal_run -= min_zero_count + 1;
            } else if temporal_signal == TemporalSignal::Inter
                || (clear_block_remainder && min_zero_count > temporal_run)
            {
                // Move to the next residual or the end of the run.
                min_zero_count = min_zero_count.min(temporal_run);
                temporal_run -= min_zero_count;
            } else if !clear_block_remainder {
                // Always step exactly one TU after an Intra TU.
                debug_assert!(temporal_signal == TemporalSignal::Intra);
                min_zero_count = 0;
            } else {
                // Residuals inside the last cleared block: keep the run
                // accurate and move to the next residual.
                temporal_run -= min_zero_count;
            }
        }

        let next_tu_index = i64::from(tu_index) + min_zero_count + 1;
        if next_tu_index >= i64::from(tu_total) {
            break;
        }
        tu_index = next_tu_index as u32;

        if min_zero_count > 0 {
            for zero in zeros.iter_mut().take(num_layers) {
                *zero -= min_zero_count;
            }
        }
    }

    match sink {
        CmdBufferSink::Cpu(buffer) => {
            if buffer.wants_split() {
                buffer.split();
            }
        }
        CmdBufferSink::Gpu(buffer) => {
            buffer.build(tu_raster_order);
        }
    }

    Ok(())
}
