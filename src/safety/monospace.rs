//! One payload bit per pixel: bit 1 is a white pixel, bit 0 black, MSB
//! first. The densest-proof encoding — a pixel only has to land on the
//! right side of the midpoint to survive.

use crate::config;

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 24);
    for &byte in data {
        for bit_pos in (0..8).rev() {
            let level = if (byte >> bit_pos) & 1 == 1 { 255 } else { 0 };
            out.extend_from_slice(&[level, level, level]);
        }
    }
    out
}

pub fn decode(pixels: &[u8], expected: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected);
    for group in pixels.chunks_exact(24) {
        if out.len() == expected {
            break;
        }
        let mut byte = 0u8;
        for pixel in group.chunks_exact(3) {
            let avg = (u16::from(pixel[0]) + u16::from(pixel[1]) + u16::from(pixel[2])) / 3;
            byte = (byte << 1) | u8::from(avg >= u16::from(config::BINARY_THRESHOLD));
        }
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_expansion_msb_first() {
        let encoded = encode(&[0b1000_0001]);
        assert_eq!(encoded.len(), 24);
        assert_eq!(&encoded[0..3], &[255, 255, 255]);
        assert_eq!(&encoded[3..6], &[0, 0, 0]);
        assert_eq!(&encoded[21..24], &[255, 255, 255]);
    }

    #[test]
    fn test_decode_classifies_by_average() {
        // Drifted but recognizable pixels on both sides of the threshold.
        let mut pixels = Vec::new();
        for _ in 0..4 {
            pixels.extend_from_slice(&[240, 250, 230]); // bit 1
            pixels.extend_from_slice(&[20, 5, 12]); // bit 0
        }
        assert_eq!(decode(&pixels, 1), vec![0b1010_1010]);
    }

    #[test]
    fn test_decode_stops_at_expected() {
        let encoded = encode(&[1, 2, 3, 4]);
        assert_eq!(decode(&encoded, 2), vec![1, 2]);
    }
}
