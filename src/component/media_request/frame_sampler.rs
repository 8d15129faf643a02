//! 依取樣計畫取得影格
//!
//! - 動畫：依累計延遲找出對應影格，逐格合成
//! - 影片：ffmpeg 兩段式 seek，每個時間點一個程序，平行執行
//! - 靜態圖：唯一的一格
//!
//! 所有影格離開這裡時都已正規化為 RGB8 / RGBA8。

use super::animated_image::{AnimatedImage, frame_index_at};
use super::color_model::{ColorModel, FramePixels, normalize_image, normalize_rgba};
use super::frame_mode::ExtractionPlan;
use super::media_source::{MediaSource, SourceContent};
use crate::error::{MediaError, MediaResult};
use crate::tools::FfmpegCommand;
use image::{DynamicImage, ImageFormat};
use log::{debug, warn};
use rayon::prelude::*;
use std::path::Path;

/// 取樣得到的原始影格
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp: f64,
    pub pixels: FramePixels,
}

impl Frame {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub const fn color_model(&self) -> ColorModel {
        self.pixels.color_model()
    }
}

pub struct FrameSampler<'a> {
    source: &'a MediaSource,
}

impl<'a> FrameSampler<'a> {
    #[must_use]
    pub const fn new(source: &'a MediaSource) -> Self {
        Self { source }
    }

    /// 取得計畫中每個時間點的影格（順序與計畫相同）
    pub fn sample_all(&self, plan: &ExtractionPlan) -> MediaResult<Vec<Frame>> {
        self.sample_each(plan, |_, frame| Ok(frame))
    }

    /// 取樣並立即交給 `process`，回傳結果維持計畫順序
    ///
    /// 影片來源會平行擷取，避免一次保留所有未壓縮影格
    pub fn sample_each<T, F>(&self, plan: &ExtractionPlan, process: F) -> MediaResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize, Frame) -> MediaResult<T> + Sync,
    {
        match self.source.content() {
            SourceContent::Animated(animation) => {
                let frames = self.composite_frames(animation, plan);
                frames
                    .into_par_iter()
                    .enumerate()
                    .map(|(index, frame)| process(index, frame))
                    .collect()
            }
            SourceContent::Still(image) => plan
                .timestamps
                .iter()
                .enumerate()
                .map(|(index, &timestamp)| {
                    let frame = Frame {
                        timestamp,
                        pixels: normalize_image(image.clone()),
                    };
                    process(index, frame)
                })
                .collect(),
            SourceContent::Video => plan
                .timestamps
                .par_iter()
                .enumerate()
                .map(|(index, &timestamp)| {
                    let frame = self.grab_video_frame(timestamp)?;
                    process(index, frame)
                })
                .collect(),
        }
    }

    /// 依時間順序合成，每個時間點取一次畫布快照
    fn composite_frames(&self, animation: &AnimatedImage, plan: &ExtractionPlan) -> Vec<Frame> {
        let starts = &self.source.metadata().frame_starts;
        let mut compositor = animation.compositor();

        plan.timestamps
            .iter()
            .map(|&timestamp| {
                let index = frame_index_at(starts, timestamp);
                debug!("動畫取樣 {timestamp:.3}s -> 影格 {index}");
                let canvas = compositor.advance_to(index).clone();
                Frame {
                    timestamp,
                    pixels: normalize_rgba(canvas),
                }
            })
            .collect()
    }

    /// 擷取影片影格；接近結尾取不到時往前一格重試一次
    fn grab_video_frame(&self, timestamp: f64) -> MediaResult<Frame> {
        let metadata = self.source.metadata();
        let path = self.source.path();

        if let Some(image) = run_frame_grab(path, &metadata.name, timestamp)? {
            return Ok(Frame {
                timestamp,
                pixels: normalize_image(image),
            });
        }

        let retry_at = (timestamp - 1.0 / metadata.native_fps.max(1.0)).max(0.0);
        warn!(
            "{} 在 {timestamp:.3}s 沒有可解碼的影格，改用 {retry_at:.3}s 重試",
            metadata.name
        );

        match run_frame_grab(path, &metadata.name, retry_at)? {
            Some(image) => Ok(Frame {
                timestamp,
                pixels: normalize_image(image),
            }),
            None => Err(MediaError::decode(
                &metadata.name,
                format!("no decodable frame at {timestamp:.3}s"),
            )),
        }
    }
}

/// 執行一次 ffmpeg 擷取；成功但沒有輸出時回傳 `None`
fn run_frame_grab(path: &Path, name: &str, timestamp: f64) -> MediaResult<Option<DynamicImage>> {
    let output = FfmpegCommand::frame_grab(path, timestamp)
        .build_command()
        .output()
        .map_err(|e| MediaError::decode(name, format!("failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::decode(
            name,
            format!("ffmpeg frame grab failed at {timestamp:.3}s: {}", stderr.trim()),
        ));
    }

    if output.stdout.is_empty() {
        return Ok(None);
    }

    image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
        .map(Some)
        .map_err(|e| MediaError::decode(name, format!("cannot decode frame at {timestamp:.3}s: {e}")))
}
