//! Dry-run 結果與預估計算

use super::audio_extractor::AudioPlan;
use super::checkpoint::Checkpoint;
use super::frame_mode::ExtractionPlan;
use super::image_transform::target_dimensions;
use super::media_source::SourceMetadata;
use super::options::RequestOptions;
use super::size_budget::{
    BYTES_PER_MB, SizeEstimate, evaluate_size, predict_audio_bytes, predict_frame_bytes,
};
use super::token_cost::{CostEstimate, FrameDimensions, estimate_cost, image_tokens};
use crate::config::PricingTable;
use crate::error::EstimationWarning;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub count: usize,
    pub mode: String,
    pub parameter: f64,
    /// 輸出尺寸，例如 "1920x1080"
    pub resolution: String,
    pub format: String,
    pub size_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSummary {
    pub duration_sec: f64,
    pub bitrate_kbps: u32,
    pub size_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSummary {
    pub per_frame: u64,
    pub frames: u64,
    pub audio: u64,
    pub total: u64,
    pub cost_usd: f64,
    pub model: String,
}

/// Dry-run 的扁平紀錄
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRunReport {
    pub estimated_size_mb: f64,
    pub fits_in_limit: bool,
    pub usage_percent: f64,
    pub frames: FrameSummary,
    pub audio: Option<AudioSummary>,
    pub recommendation: String,
    pub tokens: TokenSummary,
    pub warnings: Vec<EstimationWarning>,
    #[serde(skip)]
    pub size: SizeEstimate,
    #[serde(skip)]
    pub cost: CostEstimate,
    #[serde(skip)]
    pub checkpoints: Vec<Checkpoint>,
}

/// 只依參數預估的結果
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub output_width: u32,
    pub output_height: u32,
    pub size: SizeEstimate,
}

/// 預估輸出尺寸與位元組數，不解碼任何影格
#[must_use]
pub fn predict_request(
    metadata: &SourceMetadata,
    plan: &ExtractionPlan,
    audio_plan: &AudioPlan,
    options: &RequestOptions,
) -> Prediction {
    let (output_width, output_height) = target_dimensions(
        metadata.width,
        metadata.height,
        options.resolution.max_dimension(),
    );

    let frame_bytes = plan.len() as u64
        * predict_frame_bytes(output_width, output_height, options.encoding, options.quality);
    let audio_bytes = match *audio_plan {
        AudioPlan::Extract {
            duration, bitrate, ..
        } => predict_audio_bytes(duration, bitrate.kbps()),
        AudioPlan::Skip(_) => 0,
    };

    Prediction {
        output_width,
        output_height,
        size: evaluate_size(frame_bytes, audio_bytes, &options.limits),
    }
}

/// 組出 dry-run 紀錄
#[must_use]
pub fn build_dry_run_report(
    metadata: &SourceMetadata,
    plan: &ExtractionPlan,
    audio_plan: &AudioPlan,
    options: &RequestOptions,
    pricing: &PricingTable,
) -> DryRunReport {
    let prediction = predict_request(metadata, plan, audio_plan, options);
    let (width, height) = (prediction.output_width, prediction.output_height);

    let dimensions: Vec<FrameDimensions> = plan
        .timestamps
        .iter()
        .map(|&timestamp| FrameDimensions {
            timestamp,
            width,
            height,
        })
        .collect();
    let cost = estimate_cost(&dimensions, audio_plan.duration(), &options.model, pricing);
    let size = prediction.size;

    let audio = match *audio_plan {
        AudioPlan::Extract {
            duration, bitrate, ..
        } => Some(AudioSummary {
            duration_sec: round2(duration),
            bitrate_kbps: bitrate.kbps(),
            size_mb: to_mb(size.audio_bytes),
        }),
        AudioPlan::Skip(_) => None,
    };

    DryRunReport {
        estimated_size_mb: to_mb(size.total_bytes),
        fits_in_limit: size.fits,
        usage_percent: round2(size.utilization_percent),
        frames: FrameSummary {
            count: plan.len(),
            mode: plan.mode.name().to_string(),
            parameter: plan.mode.value(),
            resolution: format!("{width}x{height}"),
            format: options.encoding.name().to_string(),
            size_mb: to_mb(size.frame_bytes),
        },
        audio,
        recommendation: size.recommendation.clone(),
        tokens: TokenSummary {
            per_frame: image_tokens(width, height).unwrap_or(0),
            frames: cost.frame_tokens(),
            audio: cost.audio_tokens,
            total: cost.total_tokens,
            cost_usd: cost.cost_usd,
            model: cost.priced_model.clone(),
        },
        warnings: cost.warnings.clone(),
        size,
        cost,
        checkpoints: Vec::new(),
    }
}

#[must_use]
pub fn to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

#[must_use]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::media_request::audio_extractor::{AudioSkipReason, plan_audio};
    use crate::component::media_request::frame_mode::{FrameMode, resolve_plan};
    use crate::component::media_request::media_source::SourceKind;
    use crate::component::media_request::options::{AudioBitrate, QualityPreset, Resolution};
    use crate::config::types::Config;

    fn ten_minute_video() -> SourceMetadata {
        SourceMetadata {
            name: "lecture.mp4".to_string(),
            kind: SourceKind::Video,
            duration_seconds: 600.0,
            native_fps: 30.0,
            frame_count: 18_000,
            has_audio: true,
            width: 480,
            height: 270,
            frame_starts: Vec::new(),
        }
    }

    #[test]
    fn test_ten_minute_video_dry_run() {
        let metadata = ten_minute_video();
        let mut options = RequestOptions::new(FrameMode::Fps(0.5));
        options.audio = Some(AudioBitrate::Kbps32);
        options.resolution = Resolution::Preset(QualityPreset::Economy);

        let plan = resolve_plan(options.frame_mode, &metadata).unwrap();
        let audio_plan = plan_audio(&metadata, options.audio, None).unwrap();
        let pricing = Config::load_embedded_pricing().unwrap();
        let report = build_dry_run_report(&metadata, &plan, &audio_plan, &options, &pricing);

        assert_eq!(report.frames.count, 300);
        assert_eq!(report.frames.mode, "fps");
        assert_eq!(report.frames.resolution, "480x270");
        let audio = report.audio.as_ref().unwrap();
        assert!((audio.size_mb - 2.4).abs() < 1e-9);
        assert_eq!(audio.bitrate_kbps, 32);
        assert!(report.fits_in_limit);
        assert!(report.usage_percent < 80.0);
        assert!(report.recommendation.starts_with("good fit"));
        assert_eq!(report.tokens.audio, 19_200);
    }

    #[test]
    fn test_dry_run_serializes_flat_record() {
        let metadata = ten_minute_video();
        let options = RequestOptions::new(FrameMode::Total(10));
        let plan = resolve_plan(options.frame_mode, &metadata).unwrap();
        let audio_plan = AudioPlan::Skip(AudioSkipReason::Disabled);
        let pricing = Config::load_embedded_pricing().unwrap();
        let report = build_dry_run_report(&metadata, &plan, &audio_plan, &options, &pricing);

        let json = serde_json::to_value(&report).unwrap();
        for key in [
            "estimated_size_mb",
            "fits_in_limit",
            "usage_percent",
            "frames",
            "audio",
            "recommendation",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["audio"].is_null());
        assert_eq!(json["frames"]["count"], 10);
        assert!(json.get("size").is_none());
    }

    #[test]
    fn test_prediction_applies_resize() {
        let mut metadata = ten_minute_video();
        metadata.width = 3840;
        metadata.height = 2160;
        let mut options = RequestOptions::new(FrameMode::Total(2));
        options.resolution = Resolution::Preset(QualityPreset::Large);

        let plan = resolve_plan(options.frame_mode, &metadata).unwrap();
        let prediction = predict_request(
            &metadata,
            &plan,
            &AudioPlan::Skip(AudioSkipReason::Disabled),
            &options,
        );

        assert_eq!((prediction.output_width, prediction.output_height), (1920, 1080));
        assert_eq!(prediction.size.frame_bytes, 2 * 388_800);
    }
}
