//! 色彩模式正規化
//!
//! 下游編碼器只接受 RGB8 / RGBA8。索引色、灰階、灰階+透明、16 位元與浮點
//! 格式一律在這裡轉換，不會有錯誤路徑。

use image::{DynamicImage, RgbImage, RgbaImage};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModel {
    Rgb,
    Rgba,
}

/// 正規化後的像素資料，型別上只允許 RGB8 或 RGBA8
#[derive(Debug, Clone, PartialEq)]
pub enum FramePixels {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl FramePixels {
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb(image) => image.width(),
            Self::Rgba(image) => image.width(),
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb(image) => image.height(),
            Self::Rgba(image) => image.height(),
        }
    }

    #[must_use]
    pub const fn color_model(&self) -> ColorModel {
        match self {
            Self::Rgb(_) => ColorModel::Rgb,
            Self::Rgba(_) => ColorModel::Rgba,
        }
    }
}

/// 將任意解碼結果轉為 RGB8 / RGBA8
///
/// 只有實際存在非不透明像素時才保留 alpha
#[must_use]
pub fn normalize_image(image: DynamicImage) -> FramePixels {
    match image {
        DynamicImage::ImageRgb8(rgb) => FramePixels::Rgb(rgb),
        DynamicImage::ImageRgba8(rgba) => from_rgba(rgba),
        other => {
            log::debug!("色彩模式 {:?} 轉換為 8 位元 RGB(A)", other.color());
            if other.color().has_alpha() {
                from_rgba(other.to_rgba8())
            } else {
                FramePixels::Rgb(other.to_rgb8())
            }
        }
    }
}

/// 合成後的 RGBA 畫布（例如 GIF 索引色展開結果）
#[must_use]
pub fn normalize_rgba(rgba: RgbaImage) -> FramePixels {
    from_rgba(rgba)
}

fn from_rgba(rgba: RgbaImage) -> FramePixels {
    if rgba.pixels().all(|p| p.0[3] == u8::MAX) {
        FramePixels::Rgb(DynamicImage::ImageRgba8(rgba).to_rgb8())
    } else {
        FramePixels::Rgba(rgba)
    }
}
