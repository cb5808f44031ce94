//! Column-interleaved RGB565 packing for the panel's bulk-transfer wire format.
//!
//! The panel does not accept row-major pixel data. A frame is split into
//! three contiguous column bands, and within each band pixels are emitted
//! column-by-column, bottom row first. This module only ever deals with
//! exactly one frame size; anything else is a caller bug, not a runtime
//! condition to recover from.

use std::fmt;

/// Frame width in pixels.
pub const FRAME_WIDTH: usize = 320;
/// Frame height in pixels.
pub const FRAME_HEIGHT: usize = 240;
/// Size in bytes of one row-major RGB888 frame buffer.
pub const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * 3;

/// Column widths of the three wire-format bands, left to right.
pub const CHUNK_BANDS: [usize; 3] = [120, 120, 80];
/// Byte length of each packed chunk, in the same order as [`CHUNK_BANDS`].
pub const CHUNK_LENS: [usize; 3] = [57_600, 57_600, 38_400];

/// The three RGB565 chunks produced by [`pack_frame`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedFrame {
    pub chunks: [Vec<u8>; 3],
}

impl PackedFrame {
    /// Total length of all three chunks concatenated (one full frame in RGB565).
    pub fn total_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Failure mode of the pixel packer: the only thing that can go wrong is the
/// caller handing over a buffer that isn't exactly one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackError {
    WrongLength { expected: usize, actual: usize },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::WrongLength { expected, actual } => {
                write!(f, "expected a {expected}-byte RGB frame, got {actual} bytes")
            }
        }
    }
}

impl std::error::Error for PackError {}

/// Pack an 8-bit-per-channel RGB565 word: low byte first on the wire.
#[inline]
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Pack a 320x240 row-major RGB888 buffer into the panel's three-chunk,
/// column-interleaved, bottom-to-top RGB565 wire format.
pub fn pack_frame(rgb: &[u8]) -> Result<PackedFrame, PackError> {
    if rgb.len() != FRAME_BYTES {
        return Err(PackError::WrongLength { expected: FRAME_BYTES, actual: rgb.len() });
    }

    let mut chunks: [Vec<u8>; 3] =
        [Vec::with_capacity(CHUNK_LENS[0]), Vec::with_capacity(CHUNK_LENS[1]), Vec::with_capacity(CHUNK_LENS[2])];

    let mut band_start = 0usize;
    for (band_idx, &band_width) in CHUNK_BANDS.iter().enumerate() {
        let buf = &mut chunks[band_idx];
        buf.resize(CHUNK_LENS[band_idx], 0);
        for local_col in 0..band_width {
            let col = band_start + local_col;
            for emission_row in 0..FRAME_HEIGHT {
                // Emission order is bottom-to-top: the row actually read
                // walks backwards from the last row in the buffer.
                let row = FRAME_HEIGHT - 1 - emission_row;
                let src = (row * FRAME_WIDTH + col) * 3;
                let (r, g, b) = (rgb[src], rgb[src + 1], rgb[src + 2]);
                let word = rgb565(r, g, b);
                let dst = (local_col * FRAME_HEIGHT + emission_row) * 2;
                buf[dst] = (word & 0xFF) as u8;
                buf[dst + 1] = (word >> 8) as u8;
            }
        }
        band_start += band_width;
    }

    Ok(PackedFrame { chunks })
}

/// Invert [`pack_frame`]'s column/row permutation, reconstructing an RGB888
/// buffer. Channels are only as precise as RGB565 allows: the low 3 (R, B)
/// or 2 (G) bits of each input channel are lost, they are not recovered here.
pub fn unpack_frame(chunks: &[Vec<u8>; 3]) -> Result<Vec<u8>, PackError> {
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.len() != CHUNK_LENS[i] {
            return Err(PackError::WrongLength { expected: CHUNK_LENS[i], actual: chunk.len() });
        }
    }

    let mut rgb = vec![0u8; FRAME_BYTES];
    let mut band_start = 0usize;
    for (band_idx, &band_width) in CHUNK_BANDS.iter().enumerate() {
        let buf = &chunks[band_idx];
        for local_col in 0..band_width {
            let col = band_start + local_col;
            for emission_row in 0..FRAME_HEIGHT {
                let row = FRAME_HEIGHT - 1 - emission_row;
                let src = (local_col * FRAME_HEIGHT + emission_row) * 2;
                let word = buf[src] as u16 | ((buf[src + 1] as u16) << 8);
                let r = ((word >> 8) & 0xF8) as u8;
                let g = ((word >> 3) & 0xFC) as u8;
                let b = ((word << 3) & 0xF8) as u8;
                let dst = (row * FRAME_WIDTH + col) * 3;
                rgb[dst] = r;
                rgb[dst + 1] = g;
                rgb[dst + 2] = b;
            }
        }
        band_start += band_width;
    }

    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(r: u8, g: u8, b: u8) -> Vec<u8> {
        let mut v = vec![0u8; FRAME_BYTES];
        for px in v.chunks_mut(3) {
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
        v
    }

    #[test]
    fn rejects_wrong_length() {
        let err = pack_frame(&[0u8; 10]).unwrap_err();
        assert_eq!(err, PackError::WrongLength { expected: FRAME_BYTES, actual: 10 });
    }

    #[test]
    fn chunk_lengths_are_exact() {
        let packed = pack_frame(&solid_frame(1, 2, 3)).unwrap();
        assert_eq!(packed.chunks[0].len(), CHUNK_LENS[0]);
        assert_eq!(packed.chunks[1].len(), CHUNK_LENS[1]);
        assert_eq!(packed.chunks[2].len(), CHUNK_LENS[2]);
        assert_eq!(packed.total_len(), 153_600);
    }

    #[test]
    fn solid_red_frame_packs_to_f800() {
        let packed = pack_frame(&solid_frame(255, 0, 0)).unwrap();
        for chunk in &packed.chunks {
            for pair in chunk.chunks(2) {
                assert_eq!(pair, &[0x00, 0xF8]);
            }
        }
    }

    #[test]
    fn known_corner_pixel() {
        // row 0, col 0 is (8, 16, 24); it lands at the *end* of column 0 in
        // chunk 0 because emission within a column is bottom-to-top.
        let mut frame = vec![0u8; FRAME_BYTES];
        frame[0] = 8;
        frame[1] = 16;
        frame[2] = 24;
        let packed = pack_frame(&frame).unwrap();
        let offset = (FRAME_HEIGHT - 1) * 2;
        assert_eq!(&packed.chunks[0][offset..offset + 2], &[0x43, 0x08]);
    }

    #[test]
    fn pack_unpack_round_trips_on_565_aligned_input() {
        // Quantize to the RGB565 grid first so the round trip is exact.
        let mut frame = vec![0u8; FRAME_BYTES];
        for (i, px) in frame.chunks_mut(3).enumerate() {
            px[0] = ((i * 7) as u8) & 0xF8;
            px[1] = ((i * 13) as u8) & 0xFC;
            px[2] = ((i * 31) as u8) & 0xF8;
        }
        let packed = pack_frame(&frame).unwrap();
        let restored = unpack_frame(&packed.chunks).unwrap();
        assert_eq!(restored, frame);
    }

    #[test]
    fn packing_is_deterministic() {
        let frame = solid_frame(10, 20, 30);
        assert_eq!(pack_frame(&frame).unwrap(), pack_frame(&frame).unwrap());
    }

    #[test]
    fn rgb565_word_matches_formula() {
        for &(r, g, b) in &[(8u8, 16u8, 24u8), (255, 255, 255), (0, 0, 0), (17, 200, 5)] {
            let expected = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
            assert_eq!(rgb565(r, g, b), expected);
        }
    }
}
