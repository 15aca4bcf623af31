//! Configuration-layer scenarios: tiled chunk layout and the chunk
//! count formula.

use lcevc_enhancement::{
    FrameConfig, GlobalConfig, LoqIndex, TileDimensions, TransformType, parse_configs,
};

fn block(block_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if payload.len() <= 5 {
        out.push(((payload.len() as u8) << 5) | block_type);
    } else {
        out.push((7 << 5) | block_type);
        let mut size = payload.len() as u64;
        let mut groups = Vec::new();
        loop {
            groups.push((size & 0x7F) as u8);
            size >>= 7;
            if size == 0 {
                break;
            }
        }
        for (i, group) in groups.iter().enumerate().rev() {
            out.push(if i == 0 { *group } else { group | 0x80 });
        }
    }
    out.extend_from_slice(payload);
    out
}

fn encapsulate(body: &[u8], idr: bool) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, 0x01];
    let nal_type: u8 = if idr { 29 } else { 28 };
    let header: u16 = (0b01 << 14) | (u16::from(nal_type) << 9) | 0x1FF;
    out.extend_from_slice(&header.to_be_bytes());

    let mut zeroes = 0u8;
    for &byte in body {
        if zeroes >= 2 && byte <= 0x03 {
            out.push(0x03);
            zeroes = 0;
        }
        out.push(byte);
        if byte == 0x00 {
            zeroes += 1;
        } else {
            zeroes = 0;
        }
    }
    out.push(0x80);
    out
}

/// 3840x2160 YUV 4:2:0, DDS, temporal enabled, custom 960x1080 tiles;
/// a tiled encoded-data block with every chunk disabled.
fn custom_tiled_nal() -> Vec<u8> {
    let mut body = Vec::new();

    let global = [
        // plane_mode=1, resolution=custom, transform=DDS.
        0b1_111111_1,
        // chroma=420, 8-bit depths.
        0b01_00_00_0_0,
        // temporal on, linear upscale, LOQ-1 scaling 0D.
        0b0_1_001_0_00,
        // LOQ-0 scaling 2D, custom tiles.
        0b10_11_00_0_0,
        // plane_type=YUV.
        0b0001_0000,
        // custom_tile 960x1080.
        0x03, 0xC0, 0x04, 0x38,
        // per-tile compression off, size compression none.
        0x00,
        // custom resolution 3840x2160.
        0x0F, 0x00, 0x08, 0x70,
    ];
    body.extend_from_slice(&block(1, &global));

    // Picture config: enhancement on, default quant matrices, LOQ-0
    // step width 500.
    let sw = 500u16 << 1;
    let picture = [0b0_001_0_0_0_0, sw.to_be_bytes()[0], sw.to_be_bytes()[1]];
    body.extend_from_slice(&block(2, &picture));

    // Tiled encoded data, all chunks disabled:
    // - RLE-only flags: (16 + 16) layer bits + 1 temporal bit per
    //   plane = 99 bits -> 13 bytes.
    // - Entropy-enabled flags: one bit per chunk = 504 bits -> 63
    //   bytes.
    let mut encoded = vec![0x00; 13];
    encoded.extend_from_slice(&[0x00; 63]);
    body.extend_from_slice(&block(4, &encoded));

    encapsulate(&body, true)
}

#[test]
fn custom_tiles_chunk_layout() {
    let nal = custom_tiled_nal();

    let mut global = GlobalConfig::new(None);
    let mut frame = FrameConfig::new();
    parse_configs(&nal, &mut global, &mut frame).unwrap();

    assert_eq!((global.width, global.height), (3840, 2160));
    assert_eq!(global.transform, TransformType::Dds);
    assert_eq!(global.tile_dimensions, TileDimensions::Custom);
    assert_eq!(global.tile_width, [960, 480, 480]);
    assert_eq!(global.tile_height, [1080, 540, 540]);

    // 4x2 tiles at LOQ-0 and 2x1 at LOQ-1 on every plane.
    for plane in 0..3 {
        assert_eq!(global.num_tiles[plane][LoqIndex::Loq0 as usize], 8);
        assert_eq!(global.num_tiles[plane][LoqIndex::Loq1 as usize], 2);
    }

    // N = sum planes [(tiles_l0 + tiles_l1) * layers] + sum planes
    // [tiles_l0] = 3 * (10 * 16) + 3 * 8.
    assert_eq!(frame.num_chunks(), 504);
    assert!(frame.temporal_signalling_present);

    // No chunk carries data, so neither LOQ has anything to decode.
    assert!(!frame.loq_enabled[LoqIndex::Loq0 as usize]);
    assert!(!frame.loq_enabled[LoqIndex::Loq1 as usize]);

    let summary = format!(
        "{}x{} planes={} layers={} tiles_l0={} tiles_l1={} chunks={}",
        global.width,
        global.height,
        global.num_planes,
        global.num_layers,
        global.num_tiles[0][0],
        global.num_tiles[0][1],
        frame.num_chunks(),
    );
    insta::assert_snapshot!("tiled_layout", summary);
}

#[test]
fn second_parse_reuses_chunk_storage() {
    let nal = custom_tiled_nal();

    let mut global = GlobalConfig::new(None);
    let mut frame = FrameConfig::new();
    parse_configs(&nal, &mut global, &mut frame).unwrap();
    let first_chunks = frame.num_chunks();

    parse_configs(&nal, &mut global, &mut frame).unwrap();
    assert_eq!(frame.num_chunks(), first_chunks);
}
