//! Token 與費用估算
//!
//! 圖片依 tile 計算：兩邊都不超過 384 時固定 258 tokens，
//! 否則以短邊 / 1.5 為 tile 邊長切割，每個 tile 258 tokens。
//! 音訊固定每秒 32 tokens。

use crate::config::PricingTable;
use crate::error::EstimationWarning;
use serde::Serialize;

pub const TOKENS_PER_TILE: u64 = 258;
pub const SMALL_IMAGE_MAX_SIDE: u32 = 384;
pub const AUDIO_TOKENS_PER_SECOND: f64 = 32.0;

/// 參與估算的影格尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDimensions {
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameTokens {
    pub timestamp: f64,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    /// 依時間順序
    pub per_frame: Vec<FrameTokens>,
    pub audio_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    /// 實際計價的模型（未知模型時為預設模型）
    pub priced_model: String,
    pub warnings: Vec<EstimationWarning>,
}

impl CostEstimate {
    #[must_use]
    pub fn frame_tokens(&self) -> u64 {
        self.per_frame.iter().map(|f| f.tokens).sum()
    }
}

/// 單張圖片的 token 數；尺寸無法計算時回傳 `None`
#[must_use]
pub fn image_tokens(width: u32, height: u32) -> Option<u64> {
    if width == 0 || height == 0 {
        return None;
    }
    if width <= SMALL_IMAGE_MAX_SIDE && height <= SMALL_IMAGE_MAX_SIDE {
        return Some(TOKENS_PER_TILE);
    }

    // floor(min / 1.5) == floor(min * 2 / 3)
    let tile_unit = u64::from(width.min(height)) * 2 / 3;
    if tile_unit == 0 {
        return None;
    }

    let tiles_w = u64::from(width).div_ceil(tile_unit);
    let tiles_h = u64::from(height).div_ceil(tile_unit);
    Some(tiles_w * tiles_h * TOKENS_PER_TILE)
}

#[must_use]
pub fn audio_tokens(duration_seconds: f64) -> u64 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return 0;
    }
    (duration_seconds * AUDIO_TOKENS_PER_SECOND).round() as u64
}

/// 估算整個請求的 token 與費用
///
/// 無法計算的影格會略過並記錄警告，估算不中斷
#[must_use]
pub fn estimate_cost(
    frames: &[FrameDimensions],
    audio_seconds: Option<f64>,
    model: &str,
    pricing: &PricingTable,
) -> CostEstimate {
    let mut warnings = Vec::new();
    let mut per_frame = Vec::with_capacity(frames.len());

    for frame in frames {
        match image_tokens(frame.width, frame.height) {
            Some(tokens) => per_frame.push(FrameTokens {
                timestamp: frame.timestamp,
                tokens,
            }),
            None => {
                let warning = EstimationWarning::new(
                    format!("frame at {:.3}s", frame.timestamp),
                    format!(
                        "cannot compute tokens for {}x{} image; skipped",
                        frame.width, frame.height
                    ),
                );
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }
    }

    let audio_tokens = audio_seconds.map_or(0, audio_tokens);
    let total_tokens = per_frame.iter().map(|f| f.tokens).sum::<u64>() + audio_tokens;

    let (priced_model, cost_usd) = match pricing.resolve(model) {
        Some((priced, price)) => {
            if priced != model {
                warnings.push(EstimationWarning::new(
                    format!("model {model}"),
                    format!("no price listed; priced as {priced}"),
                ));
            }
            (
                priced.to_string(),
                total_tokens as f64 / 1000.0 * price.input_per_1k_tokens,
            )
        }
        None => {
            warnings.push(EstimationWarning::new(
                format!("model {model}"),
                "no price listed and no default model available; cost reported as 0",
            ));
            (model.to_string(), 0.0)
        }
    };

    CostEstimate {
        per_frame,
        audio_tokens,
        total_tokens,
        cost_usd,
        priced_model,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Config;

    fn pricing() -> PricingTable {
        Config::load_embedded_pricing().unwrap()
    }

    fn dims(timestamp: f64, width: u32, height: u32) -> FrameDimensions {
        FrameDimensions {
            timestamp,
            width,
            height,
        }
    }

    #[test]
    fn test_small_image_single_tile() {
        assert_eq!(image_tokens(384, 384), Some(258));
        assert_eq!(image_tokens(100, 20), Some(258));
    }

    #[test]
    fn test_full_hd_tokens() {
        // tile = 720 -> 3 x 2 tiles
        assert_eq!(image_tokens(1920, 1080), Some(1548));
        assert_eq!(image_tokens(960, 540), Some(1548));
    }

    #[test]
    fn test_just_above_small_threshold() {
        // tile = 256 -> 2 x 2 tiles
        assert_eq!(image_tokens(385, 385), Some(1032));
    }

    #[test]
    fn test_invalid_dimensions() {
        assert_eq!(image_tokens(0, 500), None);
        assert_eq!(image_tokens(1000, 1), None);
    }

    #[test]
    fn test_audio_tokens() {
        assert_eq!(audio_tokens(10.0), 320);
        assert_eq!(audio_tokens(600.0), 19_200);
        assert_eq!(audio_tokens(0.0), 0);
    }

    #[test]
    fn test_estimate_cost_totals() {
        let frames = [dims(0.0, 1920, 1080), dims(1.0, 300, 300)];
        let estimate = estimate_cost(&frames, Some(10.0), "gemini-2.5-pro", &pricing());

        assert_eq!(estimate.per_frame.len(), 2);
        assert_eq!(estimate.frame_tokens(), 1548 + 258);
        assert_eq!(estimate.audio_tokens, 320);
        assert_eq!(estimate.total_tokens, 1548 + 258 + 320);
        assert_eq!(estimate.priced_model, "gemini-2.5-pro");
        let expected = 2126.0 / 1000.0 * 0.00125;
        assert!((estimate.cost_usd - expected).abs() < 1e-12);
        assert!(estimate.warnings.is_empty());
    }

    #[test]
    fn test_estimate_cost_skips_corrupt_frame() {
        let frames = [dims(0.0, 640, 360), dims(0.5, 0, 0), dims(1.0, 640, 360)];
        let estimate = estimate_cost(&frames, None, "gemini-2.5-flash", &pricing());

        assert_eq!(estimate.per_frame.len(), 2);
        assert_eq!(estimate.warnings.len(), 1);
        assert!(estimate.warnings[0].element.contains("0.500"));
    }

    #[test]
    fn test_unknown_model_priced_as_default() {
        let estimate = estimate_cost(&[dims(0.0, 200, 200)], None, "mystery-model", &pricing());

        assert_eq!(estimate.priced_model, "gemini-2.5-flash");
        assert_eq!(estimate.warnings.len(), 1);
        assert!((estimate.cost_usd - 0.258 * 0.00001875).abs() < 1e-15);
    }
}
