//! 多模態請求建構元件
//!
//! 將動畫或影片轉為依序排列、已縮放編碼的影格與可選的音訊，
//! 並在送出前預估 token、費用與請求大小。
//!
//! 流程：
//! A. 取樣時間點（total / fps / interval）
//! B. 取樣並正規化色彩模式
//! C. 縮放與編碼
//! D. 音訊擷取
//! E. 估算與組裝

mod animated_image;
mod audio_extractor;
mod bundle_writer;
mod checkpoint;
mod color_model;
mod frame_mode;
mod frame_sampler;
mod image_transform;
mod main;
mod media_source;
mod options;
mod pipeline;
mod report;
mod request_assembler;
mod size_budget;
mod token_cost;

pub use animated_image::{AnimatedImage, DEFAULT_FRAME_DELAY_MS, frame_index_at};
pub use audio_extractor::{
    AUDIO_MIME_TYPE, AudioOutcome, AudioPlan, AudioSegment, AudioSkipReason, extract_audio,
    plan_audio,
};
pub use bundle_writer::{AUDIO_FILE, MANIFEST_FILE, write_request_bundle};
pub use checkpoint::{Checkpoint, CheckpointLog, CheckpointSink, NoopSink};
pub use color_model::{ColorModel, FramePixels, normalize_image};
pub use frame_mode::{ExtractionPlan, FrameMode, MAX_TOTAL_FRAMES, resolve_plan};
pub use frame_sampler::{Frame, FrameSampler};
pub use image_transform::{EncodedFrame, TransformTarget, target_dimensions, transform_frame};
pub use main::{MediaRequestRunner, RunnerMode};
pub use media_source::{MediaSource, STILL_FRAME_SECONDS, SourceKind, SourceMetadata};
pub use options::{
    AudioBitrate, ClipWindow, DEFAULT_QUALITY, ImageEncoding, QualityPreset, RequestOptions,
    Resolution,
};
pub use pipeline::{LiveRequest, MediaRequestPipeline, RequestOutcome};
pub use report::{
    AudioSummary, DryRunReport, FrameSummary, Prediction, TokenSummary, build_dry_run_report,
    predict_request,
};
pub use request_assembler::{PayloadPart, RequestPayload, assemble_request, describe_animation};
pub use size_budget::{
    AUDIO_DOMINANT_CEILING_BYTES, BudgetLimits, FRAME_DOMINANT_CEILING_BYTES, ResolutionTier,
    SizeCalibration, SizeEstimate, SizeVerdict, bits_per_pixel, check_payload, evaluate_size,
    predict_audio_bytes, predict_frame_bytes, quality_factor,
};
pub use token_cost::{
    AUDIO_TOKENS_PER_SECOND, CostEstimate, FrameDimensions, FrameTokens, TOKENS_PER_TILE,
    audio_tokens, estimate_cost, image_tokens,
};
