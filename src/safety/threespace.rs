//! Three payload bits per pixel: each bit drives one channel to 0 or 255,
//! so the eight corner colors of the RGB cube carry the 3-bit values. Bits
//! are packed MSB first across byte boundaries; a final incomplete group is
//! left-shifted so its valid bits sit in the high positions, and the zero
//! padding is discarded on decode via the expected size rather than any
//! in-band terminator.

use crate::config;

const COLOR_MAP: [[u8; 3]; 8] = [
    [0, 0, 0],
    [0, 0, 255],
    [0, 255, 0],
    [0, 255, 255],
    [255, 0, 0],
    [255, 0, 255],
    [255, 255, 0],
    [255, 255, 255],
];

pub fn encode(data: &[u8]) -> Vec<u8> {
    let bit_count = data.len() * 8;
    let pixel_count = bit_count.div_ceil(3);
    let mut out = Vec::with_capacity(pixel_count * 3);

    let mut bit_pos = 0usize;
    for _ in 0..pixel_count {
        let mut bits = 0u8;
        let mut taken = 0u8;
        while taken < 3 && bit_pos < bit_count {
            let bit = (data[bit_pos / 8] >> (7 - bit_pos % 8)) & 1;
            bits = (bits << 1) | bit;
            taken += 1;
            bit_pos += 1;
        }
        bits <<= 3 - taken;
        out.extend_from_slice(&COLOR_MAP[bits as usize]);
    }
    out
}

pub fn decode(pixels: &[u8], expected: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected);
    let mut bit_buffer = 0u32;
    let mut bits_in_buffer = 0u32;

    for pixel in pixels.chunks_exact(3) {
        if out.len() == expected {
            break;
        }
        let mut value = 0u32;
        for &channel in pixel {
            value = (value << 1) | u32::from(channel >= config::BINARY_THRESHOLD);
        }
        bit_buffer = (bit_buffer << 3) | value;
        bits_in_buffer += 3;

        while bits_in_buffer >= 8 && out.len() < expected {
            out.push(((bit_buffer >> (bits_in_buffer - 8)) & 0xFF) as u8);
            bits_in_buffer -= 8;
        }
    }
    out
}
