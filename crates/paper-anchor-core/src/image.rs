use serde::{Deserialize, Serialize};

/// Pixel layout of a [`Frame`] buffer. All formats are 8 bits per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    #[default]
    Gray8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBufferLength { expected: usize, got: usize },
}

fn expected_len(width: usize, height: usize, format: PixelFormat) -> Result<usize, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(format.channels()))
        .ok_or(FrameError::InvalidDimensions { width, height })
}

/// Borrowed row-major frame buffer.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wrap a raw buffer, validating its length against the dimensions.
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: &'a [u8],
    ) -> Result<Self, FrameError> {
        let expected = expected_len(width, height, format)?;
        if data.len() != expected {
            return Err(FrameError::InvalidBufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Convert to an owned grayscale image (BT.601 luma for color formats).
    pub fn to_gray(&self) -> GrayImage {
        let ch = self.format.channels();
        let data = match self.format {
            PixelFormat::Gray8 => self.data.to_vec(),
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => self
                .data
                .chunks_exact(ch)
                .map(|px| {
                    let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                    y.round().clamp(0.0, 255.0) as u8
                })
                .collect(),
        };
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    #[inline]
    fn get(&self, x: i32, y: i32, c: usize) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        let ch = self.format.channels();
        self.data[(y as usize * self.width + x as usize) * ch + c]
    }

    /// Bilinear sample of channel `c` at integer-centered coordinates
    /// (pixel `(i, j)` holds its value at `(i, j)`). Outside pixels read as 0.
    #[inline]
    pub fn sample_bilinear(&self, x: f32, y: f32, c: usize) -> f32 {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.get(x0, y0, c) as f32;
        let p10 = self.get(x0 + 1, y0, c) as f32;
        let p01 = self.get(x0, y0 + 1, c) as f32;
        let p11 = self.get(x0 + 1, y0 + 1, c) as f32;

        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        a + fy * (b - a)
    }
}

/// Owned row-major frame buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        FrameView::new(width, height, format, &data)?;
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// A frame with every byte set to `value`.
    pub fn filled(
        width: usize,
        height: usize,
        format: PixelFormat,
        value: u8,
    ) -> Result<Self, FrameError> {
        let len = expected_len(width, height, format)?;
        Ok(Self {
            width,
            height,
            format,
            data: vec![value; len],
        })
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            format: self.format,
            data: &self.data,
        }
    }

    /// Bytes of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let ch = self.format.channels();
        let i = (y * self.width + x) * ch;
        &self.data[i..i + ch]
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            format: PixelFormat::Gray8,
            data: img.data,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

#[inline]
pub fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}
