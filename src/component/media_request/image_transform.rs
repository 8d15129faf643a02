//! 影格縮放與編碼

use super::color_model::FramePixels;
use super::frame_sampler::Frame;
use super::options::ImageEncoding;
use crate::error::{MediaError, MediaResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageResult, RgbImage, RgbaImage, imageops};
use std::borrow::Cow;

/// 縮放與編碼參數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformTarget {
    /// `None` 代表不縮放
    pub max_dimension: Option<u32>,
    pub encoding: ImageEncoding,
    /// 1-100，只對 JPEG 有效
    pub quality: u8,
}

/// 編碼完成的影格
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub timestamp: f64,
    pub bytes: Vec<u8>,
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
}

/// 計算縮放後尺寸：最長邊等於上限，短邊等比例四捨五入（至少 1）
#[must_use]
pub fn target_dimensions(width: u32, height: u32, max_dimension: Option<u32>) -> (u32, u32) {
    let Some(max) = max_dimension else {
        return (width, height);
    };
    let long_side = width.max(height);
    if long_side <= max || long_side == 0 {
        return (width, height);
    }

    let scale_side = |side: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max) + u64::from(long_side) / 2)
            / u64::from(long_side);
        u32::try_from(scaled).unwrap_or(max).max(1)
    };

    if width >= height {
        (max, scale_side(height))
    } else {
        (scale_side(width), max)
    }
}

pub fn transform_frame(frame: Frame, target: &TransformTarget) -> MediaResult<EncodedFrame> {
    let timestamp = frame.timestamp;
    let (width, height) = target_dimensions(frame.width(), frame.height(), target.max_dimension);

    let pixels = if (width, height) == (frame.width(), frame.height()) {
        frame.pixels
    } else {
        resize(&frame.pixels, width, height)
    };

    let bytes = encode(&pixels, target).map_err(|e| {
        MediaError::decode(
            format!("frame at {timestamp:.3}s"),
            format!("cannot encode as {}: {e}", target.encoding),
        )
    })?;

    log::debug!(
        "影格 {timestamp:.3}s 編碼為 {} {width}x{height}，{} bytes",
        target.encoding,
        bytes.len()
    );

    Ok(EncodedFrame {
        timestamp,
        bytes,
        encoding: target.encoding,
        width,
        height,
    })
}

/// 區域平均縮小
fn resize(pixels: &FramePixels, width: u32, height: u32) -> FramePixels {
    match pixels {
        FramePixels::Rgb(image) => FramePixels::Rgb(imageops::thumbnail(image, width, height)),
        FramePixels::Rgba(image) => FramePixels::Rgba(imageops::thumbnail(image, width, height)),
    }
}

fn encode(pixels: &FramePixels, target: &TransformTarget) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let (width, height) = (pixels.width(), pixels.height());

    match target.encoding {
        ImageEncoding::Jpeg => {
            // JPEG 沒有 alpha，先鋪白底
            let rgb: Cow<'_, RgbImage> = match pixels {
                FramePixels::Rgb(image) => Cow::Borrowed(image),
                FramePixels::Rgba(image) => Cow::Owned(flatten_on_white(image)),
            };
            JpegEncoder::new_with_quality(&mut buffer, target.quality).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        ImageEncoding::Png => {
            let (raw, color) = raw_parts(pixels);
            PngEncoder::new(&mut buffer).write_image(raw, width, height, color)?;
        }
        ImageEncoding::Webp => {
            let (raw, color) = raw_parts(pixels);
            WebPEncoder::new_lossless(&mut buffer).write_image(raw, width, height, color)?;
        }
    }

    Ok(buffer)
}

fn raw_parts(pixels: &FramePixels) -> (&[u8], ExtendedColorType) {
    match pixels {
        FramePixels::Rgb(image) => (image.as_raw(), ExtendedColorType::Rgb8),
        FramePixels::Rgba(image) => (image.as_raw(), ExtendedColorType::Rgba8),
    }
}

#[must_use]
fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
