//! 請求大小預估
//!
//! 在編碼前依參數預估位元組數，與硬上限比較。
//! 影格大小 = 像素數 × 每像素位元數(解析度級距, 格式) × 品質倍率 / 8；
//! 音訊大小 = 秒數 × kbps × 1000 / 8。

use super::options::ImageEncoding;
use crate::error::{MediaError, MediaResult, SIZE_GUIDANCE};
use serde::Serialize;

/// 音訊為主的請求上限（bytes）
pub const AUDIO_DOMINANT_CEILING_BYTES: u64 = 20_000_000;
/// 影格為主的請求上限（bytes）
pub const FRAME_DOMINANT_CEILING_BYTES: u64 = 19_500_000;

pub const BYTES_PER_MB: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetLimits {
    pub audio_dominant_bytes: u64,
    pub frame_dominant_bytes: u64,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            audio_dominant_bytes: AUDIO_DOMINANT_CEILING_BYTES,
            frame_dominant_bytes: FRAME_DOMINANT_CEILING_BYTES,
        }
    }
}

impl BudgetLimits {
    /// 音訊位元組不少於影格時採用音訊上限
    #[must_use]
    pub const fn ceiling_for(&self, frame_bytes: u64, audio_bytes: u64) -> u64 {
        if audio_bytes > 0 && audio_bytes >= frame_bytes {
            self.audio_dominant_bytes
        } else {
            self.frame_dominant_bytes
        }
    }
}

/// 依輸出最長邊劃分的級距
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    UpTo768,
    UpTo960,
    UpTo1280,
    UpTo1920,
    Above1920,
}

impl ResolutionTier {
    #[must_use]
    pub const fn from_long_side(long_side: u32) -> Self {
        match long_side {
            0..=768 => Self::UpTo768,
            769..=960 => Self::UpTo960,
            961..=1280 => Self::UpTo1280,
            1281..=1920 => Self::UpTo1920,
            _ => Self::Above1920,
        }
    }
}

/// 每像素位元數（JPEG 為品質 85 的基準值，其他品質再乘 [`quality_factor`]）
///
/// 解析度越高壓縮效率越好，因此每像素成本隨級距遞減
#[must_use]
pub const fn bits_per_pixel(tier: ResolutionTier, encoding: ImageEncoding) -> f64 {
    match (encoding, tier) {
        (ImageEncoding::Jpeg, ResolutionTier::UpTo768) => 2.4,
        (ImageEncoding::Jpeg, ResolutionTier::UpTo960) => 2.1,
        (ImageEncoding::Jpeg, ResolutionTier::UpTo1280) => 1.8,
        (ImageEncoding::Jpeg, ResolutionTier::UpTo1920) => 1.5,
        (ImageEncoding::Jpeg, ResolutionTier::Above1920) => 1.2,
        (ImageEncoding::Webp, ResolutionTier::UpTo768) => 6.0,
        (ImageEncoding::Webp, ResolutionTier::UpTo960) => 5.5,
        (ImageEncoding::Webp, ResolutionTier::UpTo1280) => 5.0,
        (ImageEncoding::Webp, ResolutionTier::UpTo1920) => 4.5,
        (ImageEncoding::Webp, ResolutionTier::Above1920) => 4.0,
        (ImageEncoding::Png, ResolutionTier::UpTo768) => 9.0,
        (ImageEncoding::Png, ResolutionTier::UpTo960) => 8.5,
        (ImageEncoding::Png, ResolutionTier::UpTo1280) => 8.0,
        (ImageEncoding::Png, ResolutionTier::UpTo1920) => 7.5,
        (ImageEncoding::Png, ResolutionTier::Above1920) => 7.0,
    }
}

/// JPEG 品質對應的大小倍率（品質 85 為 1.0）
///
/// 錨點 (品質, 倍率)，中間線性插值；30 與 100 為多組測試畫面在不同品質下大小比例的中間值
const JPEG_QUALITY_ANCHORS: [(u8, f64); 4] = [(1, 0.10), (30, 0.35), (85, 1.0), (100, 3.0)];

/// JPEG 品質倍率，其他格式固定為 1.0
#[must_use]
pub fn quality_factor(encoding: ImageEncoding, quality: u8) -> f64 {
    if encoding != ImageEncoding::Jpeg {
        return 1.0;
    }
    let quality = quality.clamp(1, 100);
    JPEG_QUALITY_ANCHORS
        .windows(2)
        .find(|pair| quality <= pair[1].0)
        .map_or(1.0, |pair| {
            let ((q0, f0), (q1, f1)) = (pair[0], pair[1]);
            let t = f64::from(quality - q0) / f64::from(q1 - q0);
            f0 + (f1 - f0) * t
        })
}

/// 預估單張影格編碼後大小
#[must_use]
pub fn predict_frame_bytes(width: u32, height: u32, encoding: ImageEncoding, quality: u8) -> u64 {
    let tier = ResolutionTier::from_long_side(width.max(height));
    let pixels = f64::from(width) * f64::from(height);
    let bpp = bits_per_pixel(tier, encoding) * quality_factor(encoding, quality);
    (pixels * bpp / 8.0).ceil() as u64
}

/// 預估音訊大小
#[must_use]
pub fn predict_audio_bytes(duration_seconds: f64, bitrate_kbps: u32) -> u64 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return 0;
    }
    (duration_seconds * f64::from(bitrate_kbps) * 1000.0 / 8.0).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SizeVerdict {
    #[serde(rename = "comfortable")]
    Comfortable,
    #[serde(rename = "good fit")]
    GoodFit,
    #[serde(rename = "tight")]
    Tight,
    #[serde(rename = "exceeds limit")]
    ExceedsLimit,
}

impl SizeVerdict {
    #[must_use]
    pub fn from_utilization(percent: f64) -> Self {
        if percent < 50.0 {
            Self::Comfortable
        } else if percent < 80.0 {
            Self::GoodFit
        } else if percent <= 100.0 {
            Self::Tight
        } else {
            Self::ExceedsLimit
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comfortable => "comfortable",
            Self::GoodFit => "good fit",
            Self::Tight => "tight",
            Self::ExceedsLimit => "exceeds limit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeEstimate {
    pub frame_bytes: u64,
    pub audio_bytes: u64,
    pub total_bytes: u64,
    pub ceiling_bytes: u64,
    pub fits: bool,
    pub utilization_percent: f64,
    pub verdict: SizeVerdict,
    pub recommendation: String,
}

/// 比較預估大小與上限
#[must_use]
pub fn evaluate_size(frame_bytes: u64, audio_bytes: u64, limits: &BudgetLimits) -> SizeEstimate {
    let total_bytes = frame_bytes + audio_bytes;
    let ceiling_bytes = limits.ceiling_for(frame_bytes, audio_bytes);
    let utilization_percent = total_bytes as f64 / ceiling_bytes as f64 * 100.0;
    let verdict = SizeVerdict::from_utilization(utilization_percent);

    SizeEstimate {
        frame_bytes,
        audio_bytes,
        total_bytes,
        ceiling_bytes,
        fits: total_bytes <= ceiling_bytes,
        utilization_percent,
        verdict,
        recommendation: recommendation(verdict, utilization_percent, ceiling_bytes),
    }
}

fn recommendation(verdict: SizeVerdict, percent: f64, ceiling_bytes: u64) -> String {
    let usage = format!(
        "{percent:.1}% of the {:.2} MB limit",
        ceiling_bytes as f64 / BYTES_PER_MB
    );
    match verdict {
        SizeVerdict::Comfortable => {
            format!("comfortable: {usage}; there is room for more frames or a larger preset")
        }
        SizeVerdict::GoodFit => format!("good fit: {usage}"),
        SizeVerdict::Tight => {
            format!("tight: {usage}; the encoded payload may still overflow")
        }
        SizeVerdict::ExceedsLimit => format!("exceeds limit: {usage}; {SIZE_GUIDANCE}"),
    }
}

/// 組裝完成後以實際位元組數重新檢查
pub fn check_payload(
    frame_bytes: u64,
    audio_bytes: u64,
    total_bytes: u64,
    limits: &BudgetLimits,
) -> MediaResult<()> {
    let limit_bytes = limits.ceiling_for(frame_bytes, audio_bytes);
    if total_bytes > limit_bytes {
        return Err(MediaError::SizeExceeded {
            actual_bytes: total_bytes,
            limit_bytes,
        });
    }
    Ok(())
}

/// 預估與實際影格大小的比較，用於重新校準每像素位元數
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeCalibration {
    pub predicted_frame_bytes: u64,
    pub actual_frame_bytes: u64,
    /// 實際 / 預估
    pub ratio: f64,
}

impl SizeCalibration {
    #[must_use]
    pub fn new(predicted_frame_bytes: u64, actual_frame_bytes: u64) -> Self {
        let ratio = if predicted_frame_bytes == 0 {
            0.0
        } else {
            actual_frame_bytes as f64 / predicted_frame_bytes as f64
        };
        Self {
            predicted_frame_bytes,
            actual_frame_bytes,
            ratio,
        }
    }
}
