//! 請求建構流程
//!
//! 單一同步呼叫：
//! A. 檢查參數、開啟來源
//! B. 解析取樣計畫與音訊計畫
//! C. 取樣 + 縮放編碼（平行）與音訊擷取同時進行
//! D. 估算 token 與費用
//! E. 組裝請求並以實際大小重新檢查上限

use super::audio_extractor::{AudioOutcome, AudioPlan, AudioSkipReason, extract_audio, plan_audio};
use super::checkpoint::{Checkpoint, CheckpointSink, NoopSink, Recorder};
use super::frame_mode::{ExtractionPlan, resolve_plan};
use super::frame_sampler::FrameSampler;
use super::image_transform::{EncodedFrame, TransformTarget, transform_frame};
use super::media_source::{MediaSource, SourceKind};
use super::report::{DryRunReport, build_dry_run_report, predict_request};
use super::request_assembler::{RequestPayload, assemble_request, describe_animation};
use super::size_budget::{SizeCalibration, SizeEstimate, check_payload, evaluate_size};
use super::token_cost::{CostEstimate, FrameDimensions, estimate_cost};
use super::options::RequestOptions;
use crate::config::PricingTable;
use crate::error::{EstimationWarning, MediaResult};
use log::info;
use std::path::Path;
use std::time::Instant;

static NOOP_SINK: NoopSink = NoopSink;

/// 實際建構的請求
#[derive(Debug, Clone)]
pub struct LiveRequest {
    pub payload: RequestPayload,
    pub cost: CostEstimate,
    /// 編碼前的預估
    pub predicted: SizeEstimate,
    /// 以實際位元組計算
    pub actual: SizeEstimate,
    pub calibration: SizeCalibration,
    pub audio_skipped: Option<AudioSkipReason>,
    pub warnings: Vec<EstimationWarning>,
    pub checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Clone)]
pub enum RequestOutcome {
    DryRun(DryRunReport),
    Live(Box<LiveRequest>),
}

pub struct MediaRequestPipeline<'a> {
    options: &'a RequestOptions,
    pricing: &'a PricingTable,
    sink: &'a dyn CheckpointSink,
}

struct Prepared {
    source: MediaSource,
    plan: ExtractionPlan,
    audio_plan: AudioPlan,
}

impl<'a> MediaRequestPipeline<'a> {
    #[must_use]
    pub fn new(options: &'a RequestOptions, pricing: &'a PricingTable) -> Self {
        Self {
            options,
            pricing,
            sink: &NOOP_SINK,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: &'a dyn CheckpointSink) -> Self {
        self.sink = sink;
        self
    }

    /// 依 `dry_run` 旗標選擇模式
    pub fn run(&self, path: &Path) -> MediaResult<RequestOutcome> {
        if self.options.dry_run {
            self.dry_run(path).map(RequestOutcome::DryRun)
        } else {
            self.build(path).map(|live| RequestOutcome::Live(Box::new(live)))
        }
    }

    /// 只預估大小與費用，不解碼任何影格
    pub fn dry_run(&self, path: &Path) -> MediaResult<DryRunReport> {
        let recorder = Recorder::new(self.sink);
        let prepared = self.prepare(path, &recorder, true)?;

        let mut report = build_dry_run_report(
            prepared.source.metadata(),
            &prepared.plan,
            &prepared.audio_plan,
            self.options,
            self.pricing,
        );

        recorder.emit(Checkpoint::CostSummary {
            total_tokens: report.cost.total_tokens,
            cost_usd: report.cost.cost_usd,
            model: report.cost.priced_model.clone(),
        });
        recorder.emit(Checkpoint::Completed {
            frames: report.frames.count,
            total_bytes: report.size.total_bytes,
            fits: report.fits_in_limit,
        });

        info!(
            "預估完成: {} 張影格，{:.2} MB（{:.1}%），{}",
            report.frames.count,
            report.estimated_size_mb,
            report.usage_percent,
            report.size.verdict.as_str()
        );

        report.checkpoints = recorder.finish();
        Ok(report)
    }

    /// 取樣、編碼並組裝完整請求
    pub fn build(&self, path: &Path) -> MediaResult<LiveRequest> {
        let started = Instant::now();
        let recorder = Recorder::new(self.sink);
        let Prepared {
            source,
            plan,
            audio_plan,
        } = self.prepare(path, &recorder, false)?;
        let metadata = source.metadata();

        let target = TransformTarget {
            max_dimension: self.options.resolution.max_dimension(),
            encoding: self.options.encoding,
            quality: self.options.quality,
        };
        let total = plan.len();
        let sampler = FrameSampler::new(&source);

        let (frames, audio) = rayon::join(
            || {
                sampler.sample_each(&plan, |index, frame| {
                    let encoded = transform_frame(frame, &target)?;
                    recorder.emit(Checkpoint::FrameEncoded {
                        index,
                        total,
                        timestamp: encoded.timestamp,
                        bytes: encoded.bytes.len(),
                    });
                    Ok(encoded)
                })
            },
            || extract_audio(&source, &audio_plan),
        );
        let frames = frames?;
        let audio = audio?;

        let audio_skipped = match &audio {
            AudioOutcome::Extracted(segment) => {
                recorder.emit(Checkpoint::AudioExtracted {
                    duration_sec: segment.duration_seconds,
                    bytes: segment.bytes.len(),
                });
                None
            }
            AudioOutcome::Skipped(reason) => {
                recorder.emit(Checkpoint::AudioSkipped {
                    reason: reason.to_string(),
                });
                Some(*reason)
            }
        };

        let cost = self.estimate_live_cost(&frames, &audio);
        recorder.emit(Checkpoint::CostSummary {
            total_tokens: cost.total_tokens,
            cost_usd: cost.cost_usd,
            model: cost.priced_model.clone(),
        });

        let animation_note = (metadata.kind == SourceKind::Animated).then(|| {
            describe_animation(
                plan.len(),
                metadata.duration_seconds,
                plan.effective_rate(metadata.duration_seconds),
            )
        });
        let payload = assemble_request(
            self.options.context_text.as_deref(),
            animation_note,
            frames,
            audio.into_segment(),
        );

        let audio_bytes = payload.audio_bytes();
        let total_bytes = payload.total_bytes();
        let non_audio_bytes = total_bytes - audio_bytes;
        check_payload(non_audio_bytes, audio_bytes, total_bytes, &self.options.limits)?;

        let predicted = predict_request(metadata, &plan, &audio_plan, self.options).size;
        let actual = evaluate_size(non_audio_bytes, audio_bytes, &self.options.limits);
        let calibration = SizeCalibration::new(predicted.frame_bytes, payload.frame_bytes());

        recorder.emit(Checkpoint::Completed {
            frames: payload.frame_count(),
            total_bytes,
            fits: actual.fits,
        });

        info!(
            "請求建構完成: {} 張影格，{} bytes（預估 {} bytes，比例 {:.2}），耗時 {:.2}s",
            payload.frame_count(),
            total_bytes,
            predicted.total_bytes,
            calibration.ratio,
            started.elapsed().as_secs_f64()
        );

        let warnings = cost.warnings.clone();
        Ok(LiveRequest {
            payload,
            cost,
            predicted,
            actual,
            calibration,
            audio_skipped,
            warnings,
            checkpoints: recorder.finish(),
        })
    }

    fn prepare(&self, path: &Path, recorder: &Recorder<'_>, dry_run: bool) -> MediaResult<Prepared> {
        self.options.validate()?;

        let source = MediaSource::open(path)?;
        let metadata = source.metadata();
        recorder.emit(Checkpoint::Started {
            source: metadata.name.clone(),
            kind: metadata.kind,
            mode: self.options.frame_mode.to_string(),
            dry_run,
        });

        let plan = resolve_plan(self.options.frame_mode, metadata)?;
        recorder.emit(Checkpoint::PlanResolved {
            frames: plan.len(),
            duration_sec: metadata.duration_seconds,
        });

        let audio_plan = plan_audio(metadata, self.options.audio, self.options.clip.as_ref())?;

        Ok(Prepared {
            source,
            plan,
            audio_plan,
        })
    }

    fn estimate_live_cost(&self, frames: &[EncodedFrame], audio: &AudioOutcome) -> CostEstimate {
        let dimensions: Vec<FrameDimensions> = frames
            .iter()
            .map(|frame| FrameDimensions {
                timestamp: frame.timestamp,
                width: frame.width,
                height: frame.height,
            })
            .collect();
        let audio_seconds = audio.segment().map(|segment| segment.duration_seconds);
        estimate_cost(&dimensions, audio_seconds, &self.options.model, self.pricing)
    }
}
