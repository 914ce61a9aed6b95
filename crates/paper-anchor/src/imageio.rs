//! Conversions between `image` buffers and pipeline frames.

use ::image::{DynamicImage, ImageError, RgbImage, RgbaImage};
use paper_anchor_core::{Frame, GrayImage, PixelFormat};
use std::path::Path;

/// Copy a decoded image into a [`Frame`], keeping gray images single
/// channel and alpha when present.
pub fn frame_from_image(img: &DynamicImage) -> Frame {
    let color = img.color();
    let (format, data) = if color.has_color() {
        if color.has_alpha() {
            (PixelFormat::Rgba8, img.to_rgba8().into_raw())
        } else {
            (PixelFormat::Rgb8, img.to_rgb8().into_raw())
        }
    } else {
        (PixelFormat::Gray8, img.to_luma8().into_raw())
    };
    Frame {
        width: img.width() as usize,
        height: img.height() as usize,
        format,
        data,
    }
}

/// `None` when the buffer does not match its dimensions.
pub fn frame_to_image(frame: &Frame) -> Option<DynamicImage> {
    let (w, h) = (frame.width as u32, frame.height as u32);
    let data = frame.data.clone();
    Some(match frame.format {
        PixelFormat::Gray8 => DynamicImage::ImageLuma8(::image::GrayImage::from_raw(w, h, data)?),
        PixelFormat::Rgb8 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, data)?),
        PixelFormat::Rgba8 => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, data)?),
    })
}

/// Convert a core gray buffer into an `image::GrayImage`.
pub fn gray_to_image(img: &GrayImage) -> Option<::image::GrayImage> {
    ::image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, ImageError> {
    Ok(frame_from_image(&::image::open(path)?))
}

pub fn save_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<(), ImageError> {
    let img = frame_to_image(frame).ok_or_else(|| {
        ImageError::Parameter(::image::error::ParameterError::from_kind(
            ::image::error::ParameterErrorKind::DimensionMismatch,
        ))
    })?;
    img.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_and_gray_images_keep_their_layout() {
        let rgb = RgbImage::from_pixel(3, 2, ::image::Rgb([10, 20, 30]));
        let frame = frame_from_image(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(frame.format, PixelFormat::Rgb8);
        assert_eq!(frame.pixel(2, 1), &[10, 20, 30]);

        let gray = ::image::GrayImage::from_pixel(4, 4, ::image::Luma([77]));
        let frame = frame_from_image(&DynamicImage::ImageLuma8(gray));
        assert_eq!(frame.format, PixelFormat::Gray8);
        assert_eq!(frame.data.len(), 16);

        let back = frame_to_image(&frame).expect("image");
        assert_eq!(back.to_luma8().get_pixel(3, 3).0, [77]);
    }

    #[test]
    fn frames_round_trip_through_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        let frame = Frame::new(2, 2, PixelFormat::Rgba8, (0..16).collect()).expect("frame");
        save_frame(&frame, &path).expect("save");
        assert_eq!(load_frame(&path).expect("load"), frame);
    }
}
