//! Normalized frame type and sample metadata.

use thiserror::Error;

/// Pixel layouts understood by the receiver.
///
/// The pipeline forces its output through a colorspace normalizer, so
/// anything other than packed RGB is treated as a decode glitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, 3 channels, interleaved R G B.
    Rgb8,
    /// Any layout the receiver does not accept.
    Unsupported,
}

impl PixelFormat {
    /// Bytes occupied by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Unsupported => 0,
        }
    }
}

/// Reasons a sample's metadata cannot describe a usable frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Width or height is zero.
    #[error("frame has zero width or height")]
    EmptyDimensions,
    /// The pixel format is not RGB8.
    #[error("unsupported pixel format")]
    UnsupportedFormat,
    #[error("row stride {stride} is shorter than a {width}-pixel row")]
    /// Rows overlap.
    StrideTooSmall {
        /// Declared bytes per row.
        stride: usize,
        /// Pixels per row.
        width: u32,
    },
    #[error("buffer holds {actual} bytes, frame needs {required}")]
    /// The buffer ends before the last row does.
    BufferTooSmall {
        /// Bytes available.
        actual: usize,
        /// Bytes the metadata implies.
        required: usize,
    },
}

/// Format metadata attached to a decoded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per row in the source buffer, padding included.
    pub stride: usize,
    /// Pixel layout of the source buffer.
    pub format: PixelFormat,
}

impl VideoInfo {
    /// Describes a tightly packed RGB frame.
    pub fn rgb(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stride: width as usize * PixelFormat::Rgb8.bytes_per_pixel(),
            format: PixelFormat::Rgb8,
        }
    }

    /// Same as [`VideoInfo::rgb`] with an explicit row stride.
    pub fn rgb_with_stride(width: u32, height: u32, stride: usize) -> Self {
        Self {
            stride,
            ..Self::rgb(width, height)
        }
    }

    /// Bytes of pixel data in one row, padding excluded.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Checks that a buffer of `len` bytes can be read as this frame.
    ///
    /// The last row is allowed to omit its padding.
    pub fn validate(&self, len: usize) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyDimensions);
        }
        if self.format != PixelFormat::Rgb8 {
            return Err(FrameError::UnsupportedFormat);
        }
        if self.stride < self.row_bytes() {
            return Err(FrameError::StrideTooSmall {
                stride: self.stride,
                width: self.width,
            });
        }

        let required = self.stride * (self.height as usize - 1) + self.row_bytes();
        if len < required {
            return Err(FrameError::BufferTooSmall {
                actual: len,
                required,
            });
        }
        Ok(())
    }
}

/// A decoded frame owned by the receiver.
///
/// Pixel data is always tightly packed RGB (`stride == width * 3`) and
/// already orientation-corrected.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl VideoFrame {
    /// Wraps tightly packed RGB pixels.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        let stride = width as usize * PixelFormat::Rgb8.bytes_per_pixel();
        if width == 0 || height == 0 || pixels.len() != stride * height as usize {
            return None;
        }
        Some(Self {
            pixels,
            width,
            height,
            stride,
            format: PixelFormat::Rgb8,
        })
    }

    /// Solid black frame shown before any real frame has arrived.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let stride = width as usize * PixelFormat::Rgb8.bytes_per_pixel();
        Self {
            pixels: vec![0u8; stride * height as usize],
            width,
            height,
            stride,
            format: PixelFormat::Rgb8,
        }
    }

    /// Tightly packed RGB bytes, row by row.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row; always `width * 3`.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel layout; always RGB8.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the RGB triple at `(x, y)`, if inside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * 3;
        let px = &self.pixels[offset..offset + 3];
        Some([px[0], px[1], px[2]])
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
