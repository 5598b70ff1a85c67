//! Fixed orientation correction.
//!
//! The vehicle camera is mounted upside down relative to the encoder's
//! convention, so every frame is mirrored both horizontally and vertically
//! (a 180 degree rotation) on its way into the receiver.

use super::{FrameError, VideoFrame, VideoInfo};

/// Mirrors `src` horizontally and vertically into a tightly packed buffer.
///
/// Row padding in the source (`info.stride` beyond the pixel data) is
/// dropped. The caller must have validated `info` against `src`.
pub fn mirror_both(src: &[u8], info: &VideoInfo) -> Vec<u8> {
    let bpp = info.format.bytes_per_pixel();
    let row_bytes = info.row_bytes();
    let height = info.height as usize;
    let mut out = Vec::with_capacity(row_bytes * height);

    for y in (0..height).rev() {
        let row = &src[y * info.stride..y * info.stride + row_bytes];
        for px in row.chunks_exact(bpp).rev() {
            out.extend_from_slice(px);
        }
    }

    out
}

/// Copies a borrowed sample buffer into an owned, corrected frame.
///
/// This is the only place pixel data crosses from pipeline-owned memory
/// into receiver-owned memory.
pub fn correct(src: &[u8], info: &VideoInfo) -> Result<VideoFrame, FrameError> {
    info.validate(src.len())?;
    let pixels = mirror_both(src, info);
    VideoFrame::from_rgb(pixels, info.width, info.height).ok_or(FrameError::BufferTooSmall {
        actual: src.len(),
        required: info.row_bytes() * info.height as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 3x2 frame where every pixel is unique: pixel (x, y) = [x, y, 7].
    fn asymmetric_pattern(width: u32, height: u32, stride: usize) -> Vec<u8> {
        let mut data = vec![0xEEu8; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let off = y * stride + x * 3;
                data[off..off + 3].copy_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        data
    }

    #[test]
    fn test_mirrors_both_axes() {
        let info = VideoInfo::rgb(3, 2);
        let src = asymmetric_pattern(3, 2, info.stride);

        let frame = correct(&src, &info).unwrap();

        // (0,0) now holds what was at the bottom-right corner
        assert_eq!(frame.pixel(0, 0), Some([2, 1, 7]));
        assert_eq!(frame.pixel(2, 1), Some([0, 0, 7]));
        assert_eq!(frame.pixel(1, 0), Some([1, 1, 7]));
        assert_eq!(frame.pixel(0, 1), Some([2, 0, 7]));
    }

    #[test]
    fn test_drops_row_padding() {
        let info = VideoInfo::rgb_with_stride(3, 2, 12);
        let src = asymmetric_pattern(3, 2, 12);

        let frame = correct(&src, &info).unwrap();

        assert_eq!(frame.stride(), 9);
        assert_eq!(frame.pixels().len(), 18);
        assert!(!frame.pixels().contains(&0xEE));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let info = VideoInfo::rgb(4, 4);
        assert!(correct(&[0u8; 20], &info).is_err());
    }

    proptest! {
        #[test]
        fn prop_mirror_twice_is_identity(
            width in 1u32..16,
            height in 1u32..16,
            seed in any::<u8>(),
        ) {
            let info = VideoInfo::rgb(width, height);
            let src: Vec<u8> = (0..info.stride * height as usize)
                .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
                .collect();

            let once = mirror_both(&src, &info);
            let twice = mirror_both(&once, &info);

            prop_assert_eq!(twice, src);
        }

        #[test]
        fn prop_pixel_maps_to_opposite_corner(
            width in 1u32..12,
            height in 1u32..12,
            padding in 0usize..8,
        ) {
            let stride = width as usize * 3 + padding;
            let info = VideoInfo::rgb_with_stride(width, height, stride);
            let src = asymmetric_pattern(width, height, stride);

            let frame = correct(&src, &info).unwrap();

            for y in 0..height {
                for x in 0..width {
                    let expected = [(width - 1 - x) as u8, (height - 1 - y) as u8, 7];
                    prop_assert_eq!(frame.pixel(x, y), Some(expected));
                }
            }
        }
    }
}
